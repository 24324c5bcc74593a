//! Code owner estimation.
//!
//! Folds a file's history once per author and reduces each final state to a
//! single knowledge level. Authors are independent of each other.

use chrono::{DateTime, Utc};
use kenning_core::{CodeOwnerResult, DiffHistory, KenningError, KnowledgeConfig};
use tracing::{debug, info};

use crate::calculator::KnowledgeStateCalculator;
use crate::state::KnowledgeState;

/// Computes how well every author of a file still knows it.
///
/// # Examples
///
/// ```
/// use chrono::Utc;
/// use kenning_core::DiffHistory;
/// use kenning_knowledge::CodeOwnerFinder;
///
/// let finder = CodeOwnerFinder::default();
/// let result = finder.find(&DiffHistory::default(), Utc::now()).unwrap();
/// assert!(result.is_empty());
/// ```
#[derive(Debug, Clone, Default)]
pub struct CodeOwnerFinder {
    calculator: KnowledgeStateCalculator,
}

impl CodeOwnerFinder {
    /// Wrap a configured calculator.
    pub fn new(calculator: KnowledgeStateCalculator) -> Self {
        Self { calculator }
    }

    /// Build a finder from the `[knowledge]` configuration.
    ///
    /// # Errors
    ///
    /// Returns [`KenningError::Config`] for invalid tuning values.
    pub fn from_config(config: &KnowledgeConfig) -> Result<Self, KenningError> {
        Ok(Self::new(KnowledgeStateCalculator::from_config(config)?))
    }

    /// Final knowledge state of `developer`, decayed to `now`.
    ///
    /// # Errors
    ///
    /// See [`KnowledgeStateCalculator::fold`].
    pub fn knowledge_of(
        &self,
        developer: &str,
        history: &DiffHistory,
        now: DateTime<Utc>,
    ) -> Result<KnowledgeState, KenningError> {
        self.calculator.fold(developer, history, now)
    }

    /// Knowledge level of every author in `history` as of `now`.
    ///
    /// Either every author gets a level or the whole call fails.
    ///
    /// # Errors
    ///
    /// Propagates replay and ordering errors from the fold, and returns
    /// [`KenningError::Invariant`] if a level is not finite or leaves `[0, 1]`.
    pub fn find(
        &self,
        history: &DiffHistory,
        now: DateTime<Utc>,
    ) -> Result<CodeOwnerResult, KenningError> {
        let authors = history.authors();
        let mut result = CodeOwnerResult::default();

        for author in &authors {
            let state = self.knowledge_of(author, history, now)?;
            let level = checked_level(author, state.total_knowledge_level())?;
            debug!(developer = %author, level, "knowledge level");
            result.insert(author.clone(), level);
        }

        info!(
            revisions = history.len(),
            authors = authors.len(),
            "computed code owners"
        );
        Ok(result)
    }
}

fn checked_level(developer: &str, level: f64) -> Result<f64, KenningError> {
    if level.is_finite() && (0.0..=1.0).contains(&level) {
        Ok(level)
    } else {
        Err(KenningError::Invariant {
            developer: developer.to_string(),
            value: level,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use kenning_core::{DiffChange, DiffLine, DiffRevision, Difference};

    fn day(n: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2022, 3, 1, 0, 0, 0).unwrap() + Duration::days(n)
    }

    fn line(author: &str, at: DateTime<Utc>, weight: u32) -> DiffLine {
        DiffLine {
            author: author.into(),
            timestamp: at,
            weight,
        }
    }

    fn revision(
        id: &str,
        author: &str,
        at: DateTime<Utc>,
        content: Vec<DiffLine>,
        changes: Vec<DiffChange>,
    ) -> DiffRevision {
        DiffRevision {
            id: id.into(),
            content,
            difference_with_previous: Difference {
                author: author.into(),
                timestamp: at,
                changes,
            },
        }
    }

    /// Alice writes three lines, a half-life passes, Bob rewrites the middle one.
    fn alice_then_bob(weight: u32) -> DiffHistory {
        let created: Vec<DiffLine> = (0..3).map(|_| line("alice", day(0), weight)).collect();
        let mut edited = created.clone();
        edited[1] = line("bob", day(500), weight);
        DiffHistory::new(vec![
            revision("r1", "alice", day(0), created, vec![DiffChange::new(0, 3, 0, 0)]),
            revision("r2", "bob", day(500), edited, vec![DiffChange::new(1, 1, 1, 1)]),
        ])
    }

    #[test]
    fn sole_author_without_elapsed_time_knows_everything() {
        let at = day(0);
        let content = vec![line("alice", at, 4), line("alice", at, 0), line("alice", at, 7)];
        let history = DiffHistory::new(vec![revision(
            "r1",
            "alice",
            at,
            content,
            vec![DiffChange::new(0, 3, 0, 0)],
        )]);
        let result = CodeOwnerFinder::default().find(&history, at).unwrap();
        assert_eq!(result.get("alice"), Some(1.0));
    }

    #[test]
    fn half_life_then_foreign_edit() {
        let history = alice_then_bob(2);
        let finder = CodeOwnerFinder::default();

        let alice = finder.knowledge_of("alice", &history, day(500)).unwrap();
        let a: Vec<f64> = alice.lines().iter().map(|l| l.knowledge).collect();
        assert!((a[0] - 0.5).abs() < 1e-12);
        assert_eq!(a[1], 0.0);
        assert!((a[2] - 0.5).abs() < 1e-12);

        let bob = finder.knowledge_of("bob", &history, day(500)).unwrap();
        let b: Vec<f64> = bob.lines().iter().map(|l| l.knowledge).collect();
        assert_eq!(b[1], 1.0);
        assert!(b[0] > 0.0 && b[0] < 1.0);
        assert_eq!(b[0], b[2]);

        let result = finder.find(&history, day(500)).unwrap();
        assert_eq!(result.len(), 2);
        assert!((result.get("alice").unwrap() - 1.0 / 3.0).abs() < 1e-12);
        assert!(result.get("bob").unwrap() > result.get("alice").unwrap());
    }

    #[test]
    fn editor_of_one_line_gets_partial_neighbour_credit() {
        let finder = CodeOwnerFinder::default();
        for weight in [1, 2] {
            let history = alice_then_bob(weight);
            let bob = finder.knowledge_of("bob", &history, day(500)).unwrap();
            let k: Vec<f64> = bob.lines().iter().map(|l| l.knowledge).collect();
            assert_eq!(k[1], 1.0);
            for neighbour in [k[0], k[2]] {
                assert!(neighbour > 0.0 && neighbour < 1.0, "weight {weight}: {k:?}");
            }

            let level = finder.find(&history, day(500)).unwrap().get("bob").unwrap();
            assert!(level < 1.0, "weight {weight}: level {level}");
        }
    }

    #[test]
    fn neighbour_credit_decreases_with_distance() {
        let at = day(0);
        let created: Vec<DiffLine> = (0..7).map(|_| line("alice", at, 1)).collect();
        let mut edited = created.clone();
        edited[3] = line("bob", day(1), 1);
        let history = DiffHistory::new(vec![
            revision("r1", "alice", at, created, vec![DiffChange::new(0, 7, 0, 0)]),
            revision("r2", "bob", day(1), edited, vec![DiffChange::new(1, 1, 3, 3)]),
        ]);

        let bob = CodeOwnerFinder::default()
            .knowledge_of("bob", &history, day(1))
            .unwrap();
        let k: Vec<f64> = bob.lines().iter().map(|l| l.knowledge).collect();
        assert_eq!(k[3], 1.0);
        assert!(k[3] > k[2] && k[3] > k[4]);
        assert!(k[2] > k[1] && k[1] > k[0]);
        assert!(k[4] > k[5] && k[5] > k[6]);
    }

    #[test]
    fn empty_file_scores_zero() {
        let at = day(0);
        let history = DiffHistory::new(vec![
            revision("r1", "alice", at, vec![line("alice", at, 2)], vec![DiffChange::new(0, 1, 0, 0)]),
            revision("r2", "bob", day(3), vec![], vec![DiffChange::new(1, 0, 0, 0)]),
        ]);
        let result = CodeOwnerFinder::default().find(&history, day(3)).unwrap();
        assert_eq!(result.get("alice"), Some(0.0));
        assert_eq!(result.get("bob"), Some(0.0));
    }

    #[test]
    fn later_decay_lowers_every_level() {
        let history = alice_then_bob(3);
        let finder = CodeOwnerFinder::default();
        let now = finder.find(&history, day(500)).unwrap();
        let later = finder.find(&history, day(1500)).unwrap();
        for (dev, level) in later.iter() {
            assert!(level < now.get(dev).unwrap());
        }
    }

    #[test]
    fn failure_in_one_fold_fails_the_whole_call() {
        let mut history = alice_then_bob(2);
        history.revisions[1].content.pop();
        let err = CodeOwnerFinder::default().find(&history, day(600)).unwrap_err();
        assert!(matches!(err, KenningError::Replay { .. }));
    }

    #[test]
    fn invalid_levels_are_reported_not_clamped() {
        assert!(checked_level("alice", 0.5).is_ok());
        assert!(checked_level("alice", 1.0).is_ok());
        match checked_level("alice", f64::NAN) {
            Err(KenningError::Invariant { developer, .. }) => assert_eq!(developer, "alice"),
            other => panic!("expected invariant error, got {other:?}"),
        }
        assert!(checked_level("bob", 1.000_001).is_err());
        assert!(checked_level("bob", -0.1).is_err());
    }

    #[test]
    fn config_drives_strategies() {
        let config = KnowledgeConfig {
            oblivion: kenning_core::OblivionPolicy::Never,
            ..KnowledgeConfig::default()
        };
        let finder = CodeOwnerFinder::from_config(&config).unwrap();
        let result = finder.find(&alice_then_bob(2), day(5000)).unwrap();
        assert!((result.get("alice").unwrap() - 2.0 / 3.0).abs() < 1e-12);
    }
}
