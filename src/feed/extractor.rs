//! Turns the loosely structured HTML of a devotional post into a
//! [`NewDevotional`].
//!
//! Upstream posts are free text with a handful of conventional labels
//! ("Bacaan:", "Ayat Emas:", "Nyanyian:", "Doa:" ...). Each field has a
//! fallback: a field that cannot be located stays empty rather than failing
//! the item. Only a missing title or permalink makes an item unusable.

use std::sync::OnceLock;

use chrono::{FixedOffset, NaiveDate};
use regex::Regex;
use thiserror::Error;
use url::Url;

use crate::feed::FeedItem;
use crate::models::NewDevotional;

/// Wide enough that html2text never wraps a paragraph.
const TEXT_WIDTH: usize = 4096;

const QUOTE_CHARS: &[char] = &['"', '“', '”', '‘', '’', '«', '»'];

/// Scripture citation, e.g. `Yohanes 3:16`, `1 Korintus 13:4-7`, `Kisah Para Rasul 2:1-4, 12`.
const CITATION: &str = r"(?:[1-3]\s?)?[A-Z][A-Za-z]+\.?(?:\s[A-Z][a-z]+){0,2}\s+\d{1,3}(?::\d{1,3}(?:\s?[-–]\s?\d{1,3}(?::\d{1,3})?)?(?:,\s?\d{1,3}(?:[-–]\d{1,3})?)*)?";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExtractError {
    #[error("item has no title")]
    MissingTitle,

    #[error("item has no link")]
    MissingLink,

    #[error("invalid link {0:?}")]
    InvalidLink(String),
}

/// Fields recovered from the post body. Everything except `body` is optional.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DevotionalContent {
    pub key_verse: Option<String>,
    pub reference: Option<String>,
    pub body: String,
    pub hymn: Option<String>,
    pub prayer: Option<String>,
    pub quote: Option<String>,
    /// A long-form date found in the text, used when the feed has none.
    pub date_hint: Option<NaiveDate>,
}

pub struct ContentExtractor {
    offset: FixedOffset,
}

impl ContentExtractor {
    pub fn new(offset: FixedOffset) -> Self {
        Self { offset }
    }

    /// Builds a draft for one feed item.
    ///
    /// The date is the publication time in the local offset, else a date
    /// written in the post, else `fallback_date` (the local date of the sync run).
    pub fn extract(
        &self,
        item: &FeedItem,
        fallback_date: NaiveDate,
    ) -> Result<NewDevotional, ExtractError> {
        let title = item
            .title
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(ExtractError::MissingTitle)?
            .to_string();

        let link = item
            .link
            .as_deref()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .ok_or(ExtractError::MissingLink)?;
        if Url::parse(link).is_err() {
            return Err(ExtractError::InvalidLink(link.to_string()));
        }

        let content = parse_content(item.content.as_deref().unwrap_or_default(), &title);

        let date = match (item.published, content.date_hint) {
            (Some(published), _) => published.with_timezone(&self.offset).date_naive(),
            (None, Some(hint)) => hint,
            (None, None) => {
                tracing::warn!(
                    "No publication date for '{}', using sync date {}",
                    title,
                    fallback_date
                );
                fallback_date
            }
        };

        if content.body.is_empty() {
            tracing::debug!("No body text extracted for '{}'", title);
        }

        Ok(NewDevotional {
            title,
            date,
            key_verse: content.key_verse,
            reference: content.reference,
            body: content.body,
            hymn: content.hymn,
            prayer: content.prayer,
            quote: content.quote,
            source_url: Some(link.to_string()),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Reference,
    KeyVerse,
    Hymn,
    Quote,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Body,
    Prayer,
    /// A label stood alone; the next line is its value.
    Pending(Field),
}

struct TextLine {
    text: String,
    quoted: bool,
    para_start: bool,
}

/// Parses raw feed content (HTML or plain text) into devotional fields.
pub fn parse_content(raw: &str, title: &str) -> DevotionalContent {
    let lines = text_lines(raw);
    let mut content = DevotionalContent {
        date_hint: find_date(&lines),
        ..DevotionalContent::default()
    };
    let mut prayer = String::new();
    let mut mode = Mode::Body;

    for (index, line) in lines.iter().enumerate() {
        if index == 0 && line.text.eq_ignore_ascii_case(title.trim()) {
            continue;
        }

        if let Some(caps) = label_re().captures(&line.text) {
            let label = caps[1].to_lowercase();
            let rest = caps.get(2).map(|m| m.as_str().trim()).unwrap_or_default();
            mode = apply_label(&mut content, &mut prayer, &label, rest);
            continue;
        }

        match mode {
            Mode::Pending(field) => {
                fill_field(&mut content, field, &line.text);
                mode = Mode::Body;
            }
            Mode::Prayer => append_paragraph(&mut prayer, &line.text, line.para_start),
            Mode::Body => {
                if content.key_verse.is_none() && (line.quoted || starts_with_quote(&line.text)) {
                    let (verse, citation) = split_citation(&line.text);
                    if !verse.is_empty() && (line.quoted || citation.is_some()) {
                        content.key_verse = Some(verse);
                        if content.reference.is_none() {
                            content.reference = citation;
                        }
                        continue;
                    }
                }
                if content.hymn.is_none() && hymn_re().is_match(&line.text) {
                    content.hymn = Some(line.text.clone());
                    continue;
                }
                append_paragraph(&mut content.body, &line.text, line.para_start);
            }
        }
    }

    if !prayer.is_empty() {
        content.prayer = Some(prayer);
    }
    content
}

fn apply_label(content: &mut DevotionalContent, prayer: &mut String, label: &str, rest: &str) -> Mode {
    let field = if label.starts_with("bacaan") || matches!(label, "nas" | "nats") {
        Field::Reference
    } else if label.starts_with("ayat") {
        Field::KeyVerse
    } else if matches!(label, "nyanyian" | "pujian" | "kidung" | "lagu") {
        Field::Hymn
    } else if matches!(label, "kutipan" | "renungkan" | "quote") {
        Field::Quote
    } else if label == "doa" {
        if !rest.is_empty() {
            append_paragraph(prayer, rest, true);
        }
        return Mode::Prayer;
    } else {
        // "Renungan:" marks the start of the body proper
        if !rest.is_empty() {
            append_paragraph(&mut content.body, rest, true);
        }
        return Mode::Body;
    };

    if rest.is_empty() {
        return Mode::Pending(field);
    }

    // "Ayat Emas: Yohanes 3:16" with the verse text on the following line
    if field == Field::KeyVerse && is_bare_citation(rest) {
        if content.reference.is_none() {
            content.reference = Some(rest.to_string());
        }
        return Mode::Pending(Field::KeyVerse);
    }

    fill_field(content, field, rest);
    Mode::Body
}

fn fill_field(content: &mut DevotionalContent, field: Field, value: &str) {
    let value = value.trim();
    if value.is_empty() {
        return;
    }
    match field {
        Field::Reference => {
            let reference = citation_re()
                .find(value)
                .map(|m| m.as_str().trim().to_string())
                .unwrap_or_else(|| value.to_string());
            content.reference = Some(reference);
        }
        Field::KeyVerse => {
            let (verse, citation) = split_citation(value);
            if !verse.is_empty() {
                content.key_verse = Some(verse);
            }
            if content.reference.is_none() {
                content.reference = citation;
            }
        }
        Field::Hymn => content.hymn = Some(value.to_string()),
        Field::Quote => content.quote = Some(strip_quotes(value)),
    }
}

fn append_paragraph(target: &mut String, text: &str, para_start: bool) {
    if !target.is_empty() {
        target.push_str(if para_start { "\n\n" } else { "\n" });
    }
    target.push_str(text);
}

/// Splits `“verse text” (Yohanes 3:16)` or `verse text - Yohanes 3:16` into
/// the unquoted verse and its citation.
fn split_citation(text: &str) -> (String, Option<String>) {
    for re in [paren_citation_re(), dash_citation_re()] {
        if let Some(caps) = re.captures(text) {
            let citation = caps[2].trim();
            if is_bare_citation(citation) {
                return (strip_quotes(&caps[1]), Some(citation.to_string()));
            }
        }
    }
    (strip_quotes(text), None)
}

fn is_bare_citation(text: &str) -> bool {
    citation_re()
        .find(text.trim())
        .is_some_and(|m| m.start() == 0 && m.end() == text.trim().len())
}

fn strip_quotes(text: &str) -> String {
    text.trim().trim_matches(QUOTE_CHARS).trim().to_string()
}

fn starts_with_quote(text: &str) -> bool {
    text.starts_with(QUOTE_CHARS)
}

fn find_date(lines: &[TextLine]) -> Option<NaiveDate> {
    lines.iter().find_map(|line| {
        let caps = date_re().captures(&line.text)?;
        let day: u32 = caps[1].parse().ok()?;
        let month = month_number(&caps[2].to_lowercase())?;
        let year: i32 = caps[3].parse().ok()?;
        NaiveDate::from_ymd_opt(year, month, day)
    })
}

fn month_number(name: &str) -> Option<u32> {
    let month = match name {
        "januari" => 1,
        "februari" | "pebruari" => 2,
        "maret" => 3,
        "april" => 4,
        "mei" => 5,
        "juni" => 6,
        "juli" => 7,
        "agustus" => 8,
        "september" => 9,
        "oktober" => 10,
        "november" | "nopember" => 11,
        "desember" => 12,
        _ => return None,
    };
    Some(month)
}

/// Renders the content to plain text and normalises it into non-empty lines.
fn text_lines(raw: &str) -> Vec<TextLine> {
    let text = render_text(raw);
    let mut lines = Vec::new();
    let mut para_start = true;

    for line in text.lines() {
        let mut line = line.trim();
        let mut quoted = false;
        while let Some(rest) = line.strip_prefix('>') {
            quoted = true;
            line = rest.trim_start();
        }

        if footnote_re().is_match(line) || rule_re().is_match(line) {
            continue;
        }

        let line = link_ref_re().replace_all(line, "$1");
        let line = strong_re().replace_all(&line, "$1");
        let line = emphasis_re().replace_all(&line, "$1");
        let line = heading_re().replace(&line, "");
        let line = line.trim();

        if line.is_empty() {
            para_start = true;
            continue;
        }

        lines.push(TextLine {
            text: line.to_string(),
            quoted,
            para_start,
        });
        para_start = false;
    }

    lines
}

fn render_text(raw: &str) -> String {
    if !tag_re().is_match(raw) {
        return raw.to_string();
    }
    match html2text::from_read(raw.as_bytes(), TEXT_WIDTH) {
        Ok(text) => text,
        Err(e) => {
            tracing::debug!("Failed to convert HTML to text: {}", e);
            tag_re().replace_all(raw, "\n").into_owned()
        }
    }
}

fn compiled(cell: &'static OnceLock<Regex>, pattern: &str) -> &'static Regex {
    cell.get_or_init(|| Regex::new(pattern).expect("extractor pattern is valid"))
}

fn label_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    compiled(
        &RE,
        r"(?i)^(bacaan(?:\s+alkitab)?|nat?s|ayat\s+(?:emas|kunci|hafalan)|nyanyian|pujian|kidung|lagu|doa|kutipan|renungkan|quote|renungan)\s*(?:(?::|\s[-–—])\s*(.*))?$",
    )
}

fn citation_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    compiled(&RE, CITATION)
}

fn paren_citation_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    compiled(&RE, r"^(.*?)\s*[(\[]([^()\[\]]+)[)\]]\s*$")
}

fn dash_citation_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    compiled(&RE, r"^(.*\S)\s+[-–—]\s*([^-–—]+)$")
}

fn hymn_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    compiled(&RE, r"^(?:KJ|NKB|PKJ|KPKJ|GB|KPRI)\.?\s*\d{1,3}\b.{0,60}$")
}

fn date_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    compiled(
        &RE,
        r"(?i)\b(\d{1,2})\s+(januari|februari|pebruari|maret|april|mei|juni|juli|agustus|september|oktober|november|nopember|desember)\s+(\d{4})\b",
    )
}

fn tag_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    compiled(&RE, r"</?[a-zA-Z][^>]*>")
}

fn link_ref_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    compiled(&RE, r"\[([^\]]+)\]\[\d+\]")
}

fn footnote_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    compiled(&RE, r"^\[\d+\]:\s")
}

fn rule_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    compiled(&RE, r"^[-─━_=*]{3,}$")
}

fn strong_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    compiled(&RE, r"\*\*(.+?)\*\*")
}

fn emphasis_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    compiled(&RE, r"\*(\S(?:[^*]*\S)?)\*")
}

fn heading_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    compiled(&RE, r"^#{1,6}\s+")
}
