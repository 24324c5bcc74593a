//! Immutable per-developer knowledge snapshots.

use chrono::{DateTime, Utc};
use kenning_core::DiffLine;
use serde::Serialize;

/// One line of the file together with a developer's knowledge of it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LineWithKnowledge {
    /// Provenance and weight of the line.
    pub line: DiffLine,
    /// How well the developer knows the line, in `[0, 1]`.
    pub knowledge: f64,
}

/// What one developer knows about every line of a file at a point in time.
///
/// States are values: every transition builds a new one. There is one entry
/// per line of the file as of [`KnowledgeState::as_of`].
///
/// # Examples
///
/// ```
/// use kenning_knowledge::KnowledgeState;
///
/// let state = KnowledgeState::initial("alice@example.com");
/// assert_eq!(state.line_count(), 0);
/// assert_eq!(state.total_knowledge_level(), 0.0);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KnowledgeState {
    developer: String,
    as_of: DateTime<Utc>,
    lines: Vec<LineWithKnowledge>,
}

impl KnowledgeState {
    /// The state before any revision: no lines, timestamped in the distant past.
    pub fn initial(developer: impl Into<String>) -> Self {
        Self::new(developer, DateTime::<Utc>::MIN_UTC, Vec::new())
    }

    /// Build a state from its parts.
    pub fn new(
        developer: impl Into<String>,
        as_of: DateTime<Utc>,
        lines: Vec<LineWithKnowledge>,
    ) -> Self {
        Self {
            developer: developer.into(),
            as_of,
            lines,
        }
    }

    /// Developer this state belongs to.
    pub fn developer(&self) -> &str {
        &self.developer
    }

    /// Point in time the state describes.
    pub fn as_of(&self) -> DateTime<Utc> {
        self.as_of
    }

    /// Lines in document order.
    pub fn lines(&self) -> &[LineWithKnowledge] {
        &self.lines
    }

    /// Number of lines in the file as of this state.
    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    /// Same lines at a new timestamp with every knowledge value mapped by `f`.
    pub fn map_knowledge(&self, as_of: DateTime<Utc>, f: impl Fn(f64) -> f64) -> Self {
        let lines = self
            .lines
            .iter()
            .map(|l| LineWithKnowledge {
                line: l.line.clone(),
                knowledge: f(l.knowledge),
            })
            .collect();
        Self::new(self.developer.clone(), as_of, lines)
    }

    /// Weighted average of line knowledge, weighted by line weight.
    ///
    /// A file whose lines all weigh nothing (including an empty file) has a
    /// level of 0.
    pub fn total_knowledge_level(&self) -> f64 {
        let (weighted, total) = self.lines.iter().fold((0.0, 0.0), |(weighted, total), l| {
            let w = f64::from(l.line.weight);
            (weighted + w * l.knowledge, total + w)
        });
        if total == 0.0 {
            0.0
        } else {
            weighted / total
        }
    }
}
