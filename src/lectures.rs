use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::storage::LectureFile;
use crate::viewer::DocumentViewer;

static GENERATED_SUFFIX: Lazy<Option<Regex>> = Lazy::new(|| Regex::new(r"\d+-\w+\.pdf$").ok());

const SIZE_UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum SortKey {
    #[default]
    #[serde(rename = "name")]
    Name,
    #[serde(rename = "date-newest")]
    DateNewest,
    #[serde(rename = "date-oldest")]
    DateOldest,
    #[serde(rename = "size-largest")]
    SizeLargest,
    #[serde(rename = "size-smallest")]
    SizeSmallest,
}

impl SortKey {
    pub const ALL: [SortKey; 5] = [
        SortKey::Name,
        SortKey::DateNewest,
        SortKey::DateOldest,
        SortKey::SizeLargest,
        SortKey::SizeSmallest,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SortKey::Name => "name",
            SortKey::DateNewest => "date-newest",
            SortKey::DateOldest => "date-oldest",
            SortKey::SizeLargest => "size-largest",
            SortKey::SizeSmallest => "size-smallest",
        }
    }

    fn compare(&self, a: &LectureFile, b: &LectureFile) -> Ordering {
        match self {
            SortKey::Name => a.name.to_lowercase().cmp(&b.name.to_lowercase()),
            SortKey::DateNewest => b.created_at.cmp(&a.created_at),
            SortKey::DateOldest => a.created_at.cmp(&b.created_at),
            SortKey::SizeLargest => b.size.cmp(&a.size),
            SortKey::SizeSmallest => a.size.cmp(&b.size),
        }
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SortKey::ALL
            .into_iter()
            .find(|key| key.as_str() == s.trim())
            .ok_or_else(|| format!("Unknown sort key '{}'", s))
    }
}

/// Name shown for a stored file: the generated `{digits}-{word}.pdf` tail is
/// removed and underscores become spaces. Falls back to the raw name when
/// nothing readable is left.
pub fn display_name(file_name: &str) -> String {
    let stripped = match GENERATED_SUFFIX.as_ref() {
        Some(suffix) => suffix.replace(file_name, "").replace('_', " "),
        None => file_name.replace('_', " "),
    };
    if stripped.trim().is_empty() {
        file_name.to_string()
    } else {
        stripped
    }
}

/// `1536` → `"1.5 KB"`; base 1024, at most two decimals.
pub fn format_size(bytes: u64) -> String {
    if bytes == 0 {
        return "0 B".to_string();
    }

    let mut unit = 0;
    let mut value = bytes as f64;
    while value >= 1024.0 && unit < SIZE_UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }

    let rounded = (value * 100.0).round() / 100.0;
    let text = format!("{:.2}", rounded);
    let text = text.trim_end_matches('0').trim_end_matches('.');
    format!("{} {}", text, SIZE_UNITS[unit])
}

/// Files of one subject with the current search, sort and open document.
/// Built fresh each time the subject page is entered.
#[derive(Debug, Clone)]
pub struct LectureLibrary {
    subject: String,
    files: Vec<LectureFile>,
    query: String,
    sort: SortKey,
    viewer: Option<DocumentViewer>,
}

impl LectureLibrary {
    pub fn new(subject: impl Into<String>, files: Vec<LectureFile>) -> Self {
        Self {
            subject: subject.into(),
            files,
            query: String::new(),
            sort: SortKey::default(),
            viewer: None,
        }
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn set_query(&mut self, query: impl Into<String>) {
        self.query = query.into();
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn set_sort(&mut self, sort: SortKey) {
        self.sort = sort;
    }

    pub fn sort(&self) -> SortKey {
        self.sort
    }

    /// Files matching the search (case-insensitive, on the display name) in
    /// the chosen order.
    pub fn visible(&self) -> Vec<&LectureFile> {
        let needle = self.query.trim().to_lowercase();
        let mut files = self
            .files
            .iter()
            .filter(|f| needle.is_empty() || display_name(&f.name).to_lowercase().contains(&needle))
            .collect::<Vec<_>>();
        files.sort_by(|a, b| self.sort.compare(a, b));
        files
    }

    /// Opens the `index`-th visible file in the viewer.
    pub fn open(&mut self, index: usize, total_pages: u32) -> Option<&mut DocumentViewer> {
        let file = self.visible().get(index).map(|f| (*f).clone())?;
        self.viewer = Some(DocumentViewer::open(file, total_pages));
        self.viewer.as_mut()
    }

    pub fn viewer(&self) -> Option<&DocumentViewer> {
        self.viewer.as_ref()
    }

    pub fn viewer_mut(&mut self) -> Option<&mut DocumentViewer> {
        self.viewer.as_mut()
    }

    pub fn close_viewer(&mut self) {
        self.viewer = None;
    }
}
