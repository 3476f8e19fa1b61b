use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Where a devotional came from. Only synced entries carry a `source_url`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DevotionalSource {
    Manual,
    Synced,
}

impl DevotionalSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            DevotionalSource::Manual => "manual",
            DevotionalSource::Synced => "synced",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "manual" => Some(DevotionalSource::Manual),
            "synced" => Some(DevotionalSource::Synced),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Devotional {
    pub id: i64,
    pub title: String,
    pub date: NaiveDate,
    pub key_verse: Option<String>,
    pub reference: Option<String>,
    pub body: String,
    pub hymn: Option<String>,
    pub prayer: Option<String>,
    pub quote: Option<String>,
    pub source: DevotionalSource,
    pub source_url: Option<String>,
    pub visible: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Content fields of a devotional, as produced by the extractor or an admin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewDevotional {
    pub title: String,
    pub date: NaiveDate,
    #[serde(default)]
    pub key_verse: Option<String>,
    #[serde(default)]
    pub reference: Option<String>,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub hymn: Option<String>,
    #[serde(default)]
    pub prayer: Option<String>,
    #[serde(default)]
    pub quote: Option<String>,
    #[serde(default, skip_deserializing)]
    pub source_url: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DevotionalFilter {
    #[default]
    All,
    Visible,
    Hidden,
    Synced,
    Manual,
}

impl DevotionalFilter {
    pub fn cycle(&self) -> Self {
        match self {
            DevotionalFilter::All => DevotionalFilter::Visible,
            DevotionalFilter::Visible => DevotionalFilter::Hidden,
            DevotionalFilter::Hidden => DevotionalFilter::Synced,
            DevotionalFilter::Synced => DevotionalFilter::Manual,
            DevotionalFilter::Manual => DevotionalFilter::All,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            DevotionalFilter::All => "All",
            DevotionalFilter::Visible => "Visible",
            DevotionalFilter::Hidden => "Hidden",
            DevotionalFilter::Synced => "Synced",
            DevotionalFilter::Manual => "Manual",
        }
    }

    pub fn matches(&self, devotional: &Devotional) -> bool {
        match self {
            DevotionalFilter::All => true,
            DevotionalFilter::Visible => devotional.visible,
            DevotionalFilter::Hidden => !devotional.visible,
            DevotionalFilter::Synced => devotional.source == DevotionalSource::Synced,
            DevotionalFilter::Manual => devotional.source == DevotionalSource::Manual,
        }
    }
}

/// Paging and filtering for list queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListQuery {
    pub visible: Option<bool>,
    pub source: Option<DevotionalSource>,
    pub page: u32,
    pub limit: u32,
}

impl ListQuery {
    pub const MAX_LIMIT: u32 = 100;

    pub fn new(visible: Option<bool>, source: Option<DevotionalSource>, page: u32, limit: u32) -> Self {
        Self {
            visible,
            source,
            page: page.max(1),
            limit: limit.clamp(1, Self::MAX_LIMIT),
        }
    }

    pub fn offset(&self) -> u32 {
        (self.page - 1) * self.limit
    }
}

/// Result of the "today" lookup. `entry` is `None` when nothing visible exists.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TodayDevotional {
    pub entry: Option<Devotional>,
    pub is_today: bool,
}
