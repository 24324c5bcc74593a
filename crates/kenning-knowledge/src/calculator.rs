//! Transitions between knowledge states.
//!
//! A developer's knowledge of a file evolves in two ways: it fades as time
//! passes, and it is rebuilt at every revision from the lines that survived,
//! the lines that were deleted, and the lines that were written. Both
//! transitions are pure functions from one [`KnowledgeState`] to the next.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use kenning_core::{DiffHistory, DiffRevision, KenningError, KnowledgeConfig};
use tracing::debug;

use crate::adder::LineKnowledgeAdder;
use crate::oblivion::{
    elapsed_days, oblivion_for, ExponentialOblivion, OblivionFunction, MILLIS_PER_DAY,
};
use crate::replay::{replay, LineEvent};
use crate::state::{KnowledgeState, LineWithKnowledge};

/// Evolves knowledge states across time and revisions.
///
/// # Examples
///
/// ```
/// use chrono::{TimeZone, Utc};
/// use kenning_core::{DiffChange, DiffHistory, DiffLine, DiffRevision, Difference};
/// use kenning_knowledge::KnowledgeStateCalculator;
///
/// let at = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
/// let line = DiffLine { author: "alice".into(), timestamp: at, weight: 2 };
/// let history = DiffHistory::new(vec![DiffRevision {
///     id: "r1".into(),
///     content: vec![line.clone(), line],
///     difference_with_previous: Difference {
///         author: "alice".into(),
///         timestamp: at,
///         changes: vec![DiffChange::new(0, 2, 0, 0)],
///     },
/// }]);
///
/// let calculator = KnowledgeStateCalculator::default();
/// let state = calculator.fold("alice", &history, at).unwrap();
/// assert_eq!(state.total_knowledge_level(), 1.0);
/// ```
#[derive(Debug, Clone)]
pub struct KnowledgeStateCalculator {
    oblivion: Arc<dyn OblivionFunction>,
    adder: LineKnowledgeAdder,
}

impl Default for KnowledgeStateCalculator {
    fn default() -> Self {
        Self::new(
            Arc::new(ExponentialOblivion::default()),
            LineKnowledgeAdder::default(),
        )
    }
}

impl KnowledgeStateCalculator {
    /// Compose a calculator from a forgetting policy and a knowledge adder.
    pub fn new(oblivion: Arc<dyn OblivionFunction>, adder: LineKnowledgeAdder) -> Self {
        Self { oblivion, adder }
    }

    /// Build the calculator described by `config`.
    ///
    /// # Errors
    ///
    /// Returns [`KenningError::Config`] for an invalid half-life.
    pub fn from_config(config: &KnowledgeConfig) -> Result<Self, KenningError> {
        Ok(Self::new(
            oblivion_for(config)?,
            LineKnowledgeAdder::new(config.spread_coefficient, config.foreign_writing_knowledge),
        ))
    }

    /// Decay every line of `state` by `days` and advance its timestamp accordingly.
    pub fn decay(&self, state: &KnowledgeState, days: f64) -> KnowledgeState {
        let millis = (days.max(0.0) * MILLIS_PER_DAY).round() as i64;
        let as_of = state
            .as_of()
            .checked_add_signed(chrono::Duration::milliseconds(millis))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        self.decay_with(state, days, as_of)
    }

    /// Decay `state` up to the instant `to`.
    ///
    /// # Errors
    ///
    /// Returns [`KenningError::OutOfOrder`] if `to` is earlier than the state.
    pub fn decay_to(
        &self,
        state: &KnowledgeState,
        to: DateTime<Utc>,
        label: &str,
    ) -> Result<KnowledgeState, KenningError> {
        if to < state.as_of() {
            return Err(KenningError::OutOfOrder {
                revision: label.to_string(),
                state: state.as_of().to_rfc3339(),
                revision_time: to.to_rfc3339(),
            });
        }
        if state.line_count() == 0 {
            return Ok(KnowledgeState::new(state.developer(), to, Vec::new()));
        }
        Ok(self.decay_with(state, elapsed_days(state.as_of(), to), to))
    }

    fn decay_with(&self, state: &KnowledgeState, days: f64, as_of: DateTime<Utc>) -> KnowledgeState {
        state.map_knowledge(as_of, |k| self.oblivion.decay(k, days).clamp(0.0, 1.0))
    }

    /// Fold `revision` into `state`: decay to the revision's timestamp,
    /// replay its difference, then credit the inserted lines.
    ///
    /// # Errors
    ///
    /// Returns [`KenningError::OutOfOrder`] if the revision predates the
    /// state, and [`KenningError::Replay`] if its difference does not fit
    /// the state's lines or does not produce the revision's line count.
    pub fn next(
        &self,
        state: &KnowledgeState,
        revision: &DiffRevision,
    ) -> Result<KnowledgeState, KenningError> {
        let decayed = self.decay_to(state, revision.timestamp(), &revision.id)?;

        let replayed = replay(decayed.line_count(), &revision.difference_with_previous).map_err(
            |e| KenningError::Replay {
                revision: revision.id.clone(),
                message: e.to_string(),
            },
        )?;
        if replayed.new_len() != revision.content.len() {
            return Err(KenningError::Replay {
                revision: revision.id.clone(),
                message: format!(
                    "replay produced {} lines but the revision has {}",
                    replayed.new_len(),
                    revision.content.len()
                ),
            });
        }

        let old = decayed.lines();
        let mut lines = Vec::with_capacity(replayed.new_len());
        for event in replayed.events() {
            match *event {
                LineEvent::Stayed { old: o, new: n } => lines.push(LineWithKnowledge {
                    line: revision.content[n].clone(),
                    knowledge: old[o].knowledge,
                }),
                LineEvent::Inserted { new: n } => lines.push(LineWithKnowledge {
                    line: revision.content[n].clone(),
                    knowledge: 0.0,
                }),
                LineEvent::Deleted { .. } => {}
            }
        }

        let rebuilt = KnowledgeState::new(decayed.developer(), decayed.as_of(), lines);
        let inserted = replayed.inserted();
        let next = self.adder.add(&rebuilt, &inserted, revision.author());

        debug!(
            developer = next.developer(),
            revision = %revision.id,
            author = revision.author(),
            lines = next.line_count(),
            inserted = inserted.len(),
            level = next.total_knowledge_level(),
            "applied revision"
        );
        Ok(next)
    }

    /// Fold the whole `history` for `developer`, then decay to `now`.
    ///
    /// # Errors
    ///
    /// Propagates the first error of [`KnowledgeStateCalculator::next`], and
    /// returns [`KenningError::OutOfOrder`] if `now` is earlier than the last
    /// revision.
    pub fn fold(
        &self,
        developer: &str,
        history: &DiffHistory,
        now: DateTime<Utc>,
    ) -> Result<KnowledgeState, KenningError> {
        let last = history
            .revisions
            .iter()
            .try_fold(KnowledgeState::initial(developer), |state, revision| {
                self.next(&state, revision)
            })?;
        self.decay_to(&last, now, "present")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use kenning_core::{DiffChange, DiffLine, Difference};

    use crate::oblivion::NeverForget;

    fn day(n: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2023, 1, 1, 0, 0, 0).unwrap() + Duration::days(n)
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

    fn line(author: &str, at: DateTime<Utc>, weight: u32) -> DiffLine {
        DiffLine {
            author: author.into(),
            timestamp: at,
            weight,
        }
    }

    fn creation(author: &str, at: DateTime<Utc>, weights: &[u32]) -> DiffRevision {
        revision(
            "r1",
            author,
            at,
            weights.iter().map(|w| line(author, at, *w)).collect(),
            vec![DiffChange::new(0, weights.len(), 0, 0)],
        )
    }

    #[test]
    fn creation_gives_full_knowledge_to_author() {
        let calc = KnowledgeStateCalculator::default();
        let state = calc
            .next(&KnowledgeState::initial("alice"), &creation("alice", day(0), &[3, 2, 4]))
            .unwrap();
        assert_eq!(state.line_count(), 3);
        assert!(state.lines().iter().all(|l| l.knowledge == 1.0));
        assert_eq!(state.as_of(), day(0));
    }

    #[test]
    fn decay_composes_across_steps() {
        let calc = KnowledgeStateCalculator::default();
        let state = calc
            .next(&KnowledgeState::initial("alice"), &creation("alice", day(0), &[3, 2]))
            .unwrap();

        let stepwise = calc.decay(&calc.decay(&state, 120.0), 80.0);
        let at_once = calc.decay(&state, 200.0);
        for (a, b) in stepwise.lines().iter().zip(at_once.lines()) {
            assert!((a.knowledge - b.knowledge).abs() < 1e-12);
        }
        assert_eq!(stepwise.as_of(), at_once.as_of());
        assert_eq!(at_once.as_of(), day(200));
    }

    #[test]
    fn stayed_lines_keep_decayed_knowledge() {
        let calc = KnowledgeStateCalculator::default();
        let first = creation("alice", day(0), &[2, 2, 2]);
        let mut content = first.content.clone();
        content.push(line("bob", day(500), 2));
        let append = revision("r2", "bob", day(500), content, vec![DiffChange::new(0, 1, 3, 3)]);

        let history = DiffHistory::new(vec![first, append]);
        let alice = calc.fold("alice", &history, day(500)).unwrap();
        let levels: Vec<f64> = alice.lines().iter().map(|l| l.knowledge).collect();
        for k in &levels[..3] {
            assert!((k - 0.5).abs() < 1e-12);
        }
        assert_eq!(levels[3], 0.0);
    }

    #[test]
    fn interleaved_changes_keep_knowledge_with_its_line() {
        let calc = KnowledgeStateCalculator::default();
        let old: Vec<DiffLine> = (1..=6).map(|w| line("alice", day(0), w)).collect();
        let state = KnowledgeState::new(
            "alice",
            day(0),
            old.iter()
                .zip([0.1, 0.2, 0.3, 0.4, 0.5, 0.6])
                .map(|(l, k)| LineWithKnowledge {
                    line: l.clone(),
                    knowledge: k,
                })
                .collect(),
        );

        // Drop line 1, insert before line 3, replace line 5.
        let content = vec![
            old[0].clone(),
            old[2].clone(),
            line("bob", day(0), 7),
            old[3].clone(),
            old[4].clone(),
            line("bob", day(0), 8),
        ];
        let rev = revision(
            "r2",
            "bob",
            day(0),
            content,
            vec![
                DiffChange::new(1, 0, 1, 1),
                DiffChange::new(0, 1, 3, 2),
                DiffChange::new(1, 1, 5, 5),
            ],
        );

        let alice = calc.next(&state, &rev).unwrap();
        assert_eq!(alice.line_count(), rev.content.len());
        let weights: Vec<u32> = alice.lines().iter().map(|l| l.line.weight).collect();
        assert_eq!(weights, vec![1, 3, 7, 4, 5, 8]);
        let k: Vec<f64> = alice.lines().iter().map(|l| l.knowledge).collect();
        assert_eq!(k, vec![0.1, 0.3, 0.0, 0.4, 0.5, 0.0]);

        let bob = calc
            .next(&KnowledgeState::new("bob", day(0), state.lines().to_vec()), &rev)
            .unwrap();
        assert_eq!(bob.line_count(), 6);
        assert_eq!(bob.lines()[2].knowledge, 1.0);
        assert_eq!(bob.lines()[5].knowledge, 1.0);
    }

    #[test]
    fn deleted_lines_disappear() {
        let calc = KnowledgeStateCalculator::default();
        let first = creation("alice", day(0), &[1, 1, 1]);
        let content = vec![first.content[0].clone(), first.content[2].clone()];
        let delete = revision("r2", "bob", day(1), content, vec![DiffChange::new(1, 0, 1, 1)]);

        let state = calc
            .fold("alice", &DiffHistory::new(vec![first, delete]), day(1))
            .unwrap();
        assert_eq!(state.line_count(), 2);
    }

    #[test]
    fn line_count_mismatch_aborts() {
        let calc = KnowledgeStateCalculator::default();
        let mut rev = creation("alice", day(0), &[1, 1]);
        rev.content.pop();
        let err = calc.next(&KnowledgeState::initial("alice"), &rev).unwrap_err();
        assert!(matches!(err, KenningError::Replay { .. }));
    }

    #[test]
    fn broken_difference_aborts() {
        let calc = KnowledgeStateCalculator::default();
        let rev = revision("bad", "alice", day(0), vec![], vec![DiffChange::new(2, 0, 0, 0)]);
        let err = calc.next(&KnowledgeState::initial("alice"), &rev).unwrap_err();
        match err {
            KenningError::Replay { revision, .. } => assert_eq!(revision, "bad"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn revisions_must_be_chronological() {
        let calc = KnowledgeStateCalculator::default();
        let state = calc
            .next(&KnowledgeState::initial("alice"), &creation("alice", day(10), &[1]))
            .unwrap();
        let older = revision("r0", "alice", day(5), state_content(&state), vec![]);
        let err = calc.next(&state, &older).unwrap_err();
        assert!(matches!(err, KenningError::OutOfOrder { .. }));
    }

    #[test]
    fn present_before_last_revision_is_rejected() {
        let calc = KnowledgeStateCalculator::default();
        let history = DiffHistory::new(vec![creation("alice", day(10), &[1])]);
        assert!(calc.fold("alice", &history, day(9)).is_err());
    }

    #[test]
    fn never_forget_keeps_knowledge() {
        let calc = KnowledgeStateCalculator::new(Arc::new(NeverForget), LineKnowledgeAdder::default());
        let history = DiffHistory::new(vec![creation("alice", day(0), &[2, 5])]);
        let state = calc.fold("alice", &history, day(10_000)).unwrap();
        assert_eq!(state.total_knowledge_level(), 1.0);
    }

    #[test]
    fn knowledge_stays_in_bounds_over_many_edits() {
        let calc = KnowledgeStateCalculator::default();
        let mut history = vec![creation("alice", day(0), &[3; 6])];
        // Alternate authors rewriting the middle line of a six-line file.
        for i in 1..20 {
            let author = if i % 2 == 0 { "alice" } else { "bob" };
            let mut content = history[i - 1].content.clone();
            content[3] = line(author, day(i as i64 * 30), 3);
            history.push(revision(
                &format!("r{}", i + 1),
                author,
                day(i as i64 * 30),
                content,
                vec![DiffChange::new(1, 1, 3, 3)],
            ));
        }
        let history = DiffHistory::new(history);

        for dev in ["alice", "bob"] {
            let mut state = KnowledgeState::initial(dev);
            for rev in &history.revisions {
                state = calc.next(&state, rev).unwrap();
                assert_eq!(state.line_count(), rev.content.len());
                assert!(state
                    .lines()
                    .iter()
                    .all(|l| (0.0..=1.0).contains(&l.knowledge)));
            }
        }
    }

    fn state_content(state: &KnowledgeState) -> Vec<DiffLine> {
        state.lines().iter().map(|l| l.line.clone()).collect()
    }
}
