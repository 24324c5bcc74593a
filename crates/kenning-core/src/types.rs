use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Provenance and information weight of one line of a revision.
///
/// # Examples
///
/// ```
/// use chrono::{TimeZone, Utc};
/// use kenning_core::DiffLine;
///
/// let line = DiffLine {
///     author: "alice@example.com".into(),
///     timestamp: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
///     weight: 4,
/// };
/// assert_eq!(line.weight, 4);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiffLine {
    /// Developer who last wrote this line.
    pub author: String,
    /// When the line was written.
    pub timestamp: DateTime<Utc>,
    /// Information content of the line.
    pub weight: u32,
}

/// One atomic edit of a [`Difference`].
///
/// `line_begin1` indexes the old content, `line_begin2` the new content,
/// both 0-based.
///
/// # Examples
///
/// ```
/// use kenning_core::DiffChange;
///
/// // Two lines inserted at the top of the file.
/// let change = DiffChange::new(0, 2, 0, 0);
/// assert_eq!(change.inserted, 2);
/// assert!(!change.is_empty());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiffChange {
    /// Number of old lines removed.
    pub deleted: usize,
    /// Number of new lines added.
    pub inserted: usize,
    /// First affected line in the old content.
    pub line_begin1: usize,
    /// First affected line in the new content.
    pub line_begin2: usize,
}

impl DiffChange {
    /// Create a change in `(deleted, inserted, line_begin1, line_begin2)` order.
    pub fn new(deleted: usize, inserted: usize, line_begin1: usize, line_begin2: usize) -> Self {
        Self {
            deleted,
            inserted,
            line_begin1,
            line_begin2,
        }
    }

    /// Whether this change neither deletes nor inserts anything.
    pub fn is_empty(&self) -> bool {
        self.deleted == 0 && self.inserted == 0
    }
}

/// The line-level edit script between a revision and its predecessor.
///
/// Changes are sorted ascending by `line_begin1` and do not overlap.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Difference {
    /// Developer who made the edit.
    pub author: String,
    /// When the edit was made.
    pub timestamp: DateTime<Utc>,
    /// Ordered, non-overlapping edits.
    pub changes: Vec<DiffChange>,
}

impl Difference {
    /// Total number of old lines removed by this difference.
    pub fn total_deleted(&self) -> usize {
        self.changes.iter().map(|c| c.deleted).sum()
    }

    /// Total number of new lines added by this difference.
    pub fn total_inserted(&self) -> usize {
        self.changes.iter().map(|c| c.inserted).sum()
    }
}

/// One revision of a file together with its difference from the previous one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiffRevision {
    /// Revision identifier, e.g. a commit hash.
    pub id: String,
    /// Every line of the file as of this revision.
    pub content: Vec<DiffLine>,
    /// Edit script from the previous revision (or from an empty file).
    pub difference_with_previous: Difference,
}

impl DiffRevision {
    /// Author of the edit that produced this revision.
    pub fn author(&self) -> &str {
        &self.difference_with_previous.author
    }

    /// Timestamp of the edit that produced this revision.
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.difference_with_previous.timestamp
    }
}

/// A file's revision history, oldest to newest.
///
/// # Examples
///
/// ```
/// use kenning_core::DiffHistory;
///
/// let history = DiffHistory::default();
/// assert!(history.is_empty());
/// assert!(history.authors().is_empty());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiffHistory {
    /// Revisions in chronological order.
    pub revisions: Vec<DiffRevision>,
}

impl DiffHistory {
    /// Wrap an already ordered list of revisions.
    pub fn new(revisions: Vec<DiffRevision>) -> Self {
        Self { revisions }
    }

    /// Distinct revision authors, in order of first appearance.
    pub fn authors(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        self.revisions
            .iter()
            .map(DiffRevision::author)
            .filter(|author| seen.insert(*author))
            .map(str::to_string)
            .collect()
    }

    /// Number of revisions.
    pub fn len(&self) -> usize {
        self.revisions.len()
    }

    /// Whether the history has no revisions.
    pub fn is_empty(&self) -> bool {
        self.revisions.is_empty()
    }

    /// The newest revision, if any.
    pub fn last(&self) -> Option<&DiffRevision> {
        self.revisions.last()
    }
}

/// Per-developer knowledge level of a file, each in `[0, 1]`.
///
/// Ordering is left to the caller; [`CodeOwnerResult::ranked`] sorts by
/// level, highest first.
///
/// # Examples
///
/// ```
/// use kenning_core::CodeOwnerResult;
///
/// let mut result = CodeOwnerResult::default();
/// result.insert("bob", 0.25);
/// result.insert("alice", 0.75);
/// let ranked = result.ranked();
/// assert_eq!(ranked[0], ("alice", 0.75));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CodeOwnerResult {
    levels: BTreeMap<String, f64>,
}

impl CodeOwnerResult {
    /// Record the knowledge level of `developer`.
    pub fn insert(&mut self, developer: impl Into<String>, level: f64) {
        self.levels.insert(developer.into(), level);
    }

    /// Knowledge level of `developer`, if they appear in the history.
    pub fn get(&self, developer: &str) -> Option<f64> {
        self.levels.get(developer).copied()
    }

    /// Number of developers.
    pub fn len(&self) -> usize {
        self.levels.len()
    }

    /// Whether no developer is recorded.
    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    /// Developers sorted by knowledge level descending, ties by name.
    pub fn ranked(&self) -> Vec<(&str, f64)> {
        let mut ranked: Vec<(&str, f64)> = self
            .levels
            .iter()
            .map(|(dev, level)| (dev.as_str(), *level))
            .collect();
        ranked.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.0.cmp(b.0))
        });
        ranked
    }

    /// Iterate developers in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.levels.iter().map(|(dev, level)| (dev.as_str(), *level))
    }
}

/// Output format for CLI results.
///
/// # Examples
///
/// ```
/// use kenning_core::OutputFormat;
///
/// let fmt: OutputFormat = "json".parse().unwrap();
/// assert_eq!(fmt, OutputFormat::Json);
///
/// let fmt: OutputFormat = "md".parse().unwrap();
/// assert_eq!(fmt, OutputFormat::Markdown);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable tables and summaries.
    #[default]
    Text,
    /// Machine-readable JSON with camelCase keys.
    Json,
    /// Markdown-formatted output.
    Markdown,
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::Markdown => write!(f, "markdown"),
        }
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            "markdown" | "md" => Ok(OutputFormat::Markdown),
            other => Err(format!("unknown output format: {other}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn revision(id: &str, author: &str, changes: Vec<DiffChange>) -> DiffRevision {
        DiffRevision {
            id: id.into(),
            content: Vec::new(),
            difference_with_previous: Difference {
                author: author.into(),
                timestamp: Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap(),
                changes,
            },
        }
    }

    #[test]
    fn authors_are_distinct_in_first_appearance_order() {
        let history = DiffHistory::new(vec![
            revision("r1", "carol", vec![]),
            revision("r2", "alice", vec![]),
            revision("r3", "carol", vec![]),
            revision("r4", "bob", vec![]),
        ]);
        assert_eq!(history.authors(), vec!["carol", "alice", "bob"]);
    }

    #[test]
    fn difference_totals() {
        let rev = revision(
            "r1",
            "alice",
            vec![DiffChange::new(1, 2, 0, 0), DiffChange::new(3, 0, 5, 6)],
        );
        assert_eq!(rev.difference_with_previous.total_deleted(), 4);
        assert_eq!(rev.difference_with_previous.total_inserted(), 2);
    }

    #[test]
    fn ranked_breaks_ties_by_name() {
        let mut result = CodeOwnerResult::default();
        result.insert("zed", 0.5);
        result.insert("amy", 0.5);
        result.insert("kim", 0.9);
        let names: Vec<&str> = result.ranked().into_iter().map(|(d, _)| d).collect();
        assert_eq!(names, vec!["kim", "amy", "zed"]);
    }

    #[test]
    fn code_owner_result_serializes_as_map() {
        let mut result = CodeOwnerResult::default();
        result.insert("alice", 1.0);
        let json = serde_json::to_string(&result).unwrap();
        assert_eq!(json, r#"{"alice":1.0}"#);
    }

    #[test]
    fn history_uses_camel_case_json() {
        let history = DiffHistory::new(vec![revision("r1", "alice", vec![DiffChange::new(0, 1, 0, 0)])]);
        let json = serde_json::to_string(&history).unwrap();
        assert!(json.contains("differenceWithPrevious"));
        assert!(json.contains("lineBegin1"));
        let back: DiffHistory = serde_json::from_str(&json).unwrap();
        assert_eq!(back, history);
    }

    #[test]
    fn output_format_from_str() {
        assert_eq!("text".parse::<OutputFormat>().unwrap(), OutputFormat::Text);
        assert_eq!("JSON".parse::<OutputFormat>().unwrap(), OutputFormat::Json);
        assert_eq!(
            "markdown".parse::<OutputFormat>().unwrap(),
            OutputFormat::Markdown
        );
        assert!("sarif".parse::<OutputFormat>().is_err());
    }

    #[test]
    fn output_format_display() {
        assert_eq!(OutputFormat::Text.to_string(), "text");
        assert_eq!(OutputFormat::Json.to_string(), "json");
        assert_eq!(OutputFormat::Markdown.to_string(), "markdown");
    }
}
