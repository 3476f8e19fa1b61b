use crate::config::Config;
use crate::db::Repository;
use crate::error::{AppError, Result};
use crate::models::{Devotional, DevotionalFilter};
use crate::sync::{SyncService, SyncSummary};
use crate::tui::AppAction;

pub struct App {
    // Data
    pub devotionals: Vec<Devotional>,

    // UI State
    pub selected_index: usize,
    pub filter: DevotionalFilter,
    pub show_help: bool,
    pub status_message: Option<String>,

    // Sync runs on the next loop turn so the "Syncing..." status gets drawn first
    pub is_syncing: bool,

    // Services
    pub repository: Repository,
    sync: SyncService,
    feed_url: Option<String>,
}

impl App {
    pub async fn new(config: &Config) -> Result<Self> {
        let repository = Repository::new(&config.db_path).await?;
        let sync = SyncService::from_config(config)?;
        let devotionals = repository.get_all_devotionals().await?;

        Ok(Self {
            devotionals,
            selected_index: 0,
            filter: DevotionalFilter::All,
            show_help: false,
            status_message: None,
            is_syncing: false,
            repository,
            sync,
            feed_url: config.feed_url().ok().map(str::to_string),
        })
    }

    pub fn filtered_devotionals(&self) -> Vec<&Devotional> {
        self.devotionals
            .iter()
            .filter(|d| self.filter.matches(d))
            .collect()
    }

    pub fn selected_devotional(&self) -> Option<&Devotional> {
        let devotionals = self.filtered_devotionals();
        devotionals.get(self.selected_index).copied()
    }

    pub async fn handle_action(&mut self, action: AppAction) -> Result<bool> {
        match action {
            AppAction::Quit => return Ok(true),

            AppAction::MoveUp => {
                if self.selected_index > 0 {
                    self.selected_index -= 1;
                }
            }

            AppAction::MoveDown => {
                let len = self.filtered_devotionals().len();
                if len > 0 && self.selected_index < len - 1 {
                    self.selected_index += 1;
                }
            }

            AppAction::MoveToTop => {
                self.selected_index = 0;
            }

            AppAction::MoveToBottom => {
                self.selected_index = self.filtered_devotionals().len().saturating_sub(1);
            }

            AppAction::SyncFeed => {
                if self.feed_url.is_some() {
                    self.is_syncing = true;
                } else {
                    self.status_message = Some("feed_url is not configured".to_string());
                }
            }

            AppAction::ToggleVisible => {
                if let Some(devotional) = self.selected_devotional() {
                    let id = devotional.id;
                    let visible = !devotional.visible;
                    self.repository.set_visible(id, visible).await?;
                    self.reload_devotionals().await?;
                }
            }

            AppAction::DeleteDevotional => {
                if let Some(devotional) = self.selected_devotional() {
                    let id = devotional.id;
                    self.repository.delete_devotional(id).await?;
                    self.devotionals.retain(|d| d.id != id);
                    self.clamp_selection();
                }
            }

            AppAction::OpenInBrowser => {
                if let Some(url) = self.selected_devotional().and_then(|d| d.source_url.clone()) {
                    let _ = open::that(&url);
                }
            }

            AppAction::CycleFilter => {
                self.filter = self.filter.cycle();
                self.selected_index = 0;
            }

            AppAction::ShowHelp => {
                self.show_help = true;
            }

            AppAction::HideHelp => {
                self.show_help = false;
            }
        }

        Ok(false)
    }

    /// Runs a requested sync to completion and reports the outcome in the status line.
    pub async fn run_pending_sync(&mut self) -> Result<()> {
        if !self.is_syncing {
            return Ok(());
        }

        let Some(url) = self.feed_url.clone() else {
            self.is_syncing = false;
            return Ok(());
        };
        let outcome = self.sync.run(&self.repository, &url).await;

        self.status_message = Some(match outcome {
            Ok(summary) if summary.errors.is_empty() => summary.message,
            Ok(summary) => format!("{} | {} failed", summary.message, summary.errors.len()),
            Err(e) => {
                tracing::error!("Sync failed: {}", e);
                format!("Sync failed: {e}")
            }
        });

        self.reload_devotionals().await?;
        self.is_syncing = false;
        Ok(())
    }

    /// Headless sync for `renungan sync`.
    pub async fn sync_blocking(&mut self) -> Result<SyncSummary> {
        let url = self
            .feed_url
            .clone()
            .ok_or_else(|| AppError::Config("feed_url is not configured".to_string()))?;
        let summary = self.sync.run(&self.repository, &url).await?;
        self.reload_devotionals().await?;
        Ok(summary)
    }

    async fn reload_devotionals(&mut self) -> Result<()> {
        self.devotionals = self.repository.get_all_devotionals().await?;
        self.clamp_selection();
        Ok(())
    }

    fn clamp_selection(&mut self) {
        let len = self.filtered_devotionals().len();
        if len > 0 && self.selected_index >= len {
            self.selected_index = len - 1;
        }
    }
}
