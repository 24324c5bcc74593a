//! Knowledge injection for newly written lines.
//!
//! Writing a line teaches its author that line completely. Writing also
//! means reading the surrounding code, so part of the credit spreads to
//! neighbouring lines. The spread budget of an inserted line is its weight
//! times the writing knowledge times [`LineKnowledgeAdder::spread_coefficient`],
//! spent independently upwards and downwards. Walking away from the insertion,
//! each line consumes its own weight from what is left of the budget and is
//! credited with the slice of the triangular sum `1 + 2 + ... + remaining` it
//! consumed, relative to the triangular sum of the whole budget and per unit
//! of its weight. Closer lines therefore learn more than distant ones, and no
//! neighbour learns as much as the written line itself.

use tracing::trace;

use crate::state::{KnowledgeState, LineWithKnowledge};

/// Adds writing and reading knowledge for the lines inserted by a revision.
///
/// # Examples
///
/// ```
/// use kenning_knowledge::LineKnowledgeAdder;
///
/// let adder = LineKnowledgeAdder::default();
/// assert_eq!(adder.spread_coefficient(), 6.0);
/// assert_eq!(adder.foreign_writing_knowledge(), 0.0);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineKnowledgeAdder {
    spread_coefficient: f64,
    foreign_writing_knowledge: f64,
}

impl Default for LineKnowledgeAdder {
    fn default() -> Self {
        Self::new(Self::DEFAULT_SPREAD_COEFFICIENT, 0.0)
    }
}

impl LineKnowledgeAdder {
    /// Reference spread coefficient.
    pub const DEFAULT_SPREAD_COEFFICIENT: f64 = 6.0;

    /// Create an adder.
    ///
    /// `foreign_writing_knowledge` is the writing credit a developer receives
    /// for a line inserted by somebody else; it is clamped to `[0, 1]`.
    pub fn new(spread_coefficient: f64, foreign_writing_knowledge: f64) -> Self {
        Self {
            spread_coefficient: spread_coefficient.max(0.0),
            foreign_writing_knowledge: foreign_writing_knowledge.clamp(0.0, 1.0),
        }
    }

    /// Multiplier sizing the spread budget.
    pub fn spread_coefficient(&self) -> f64 {
        self.spread_coefficient
    }

    /// Writing credit for lines inserted by another developer.
    pub fn foreign_writing_knowledge(&self) -> f64 {
        self.foreign_writing_knowledge
    }

    /// Knowledge delta per line of `lines` caused by the insertions at
    /// `inserted`, as seen by `developer`, when `author` wrote them.
    ///
    /// Where several insertions credit the same line the largest credit
    /// wins; credits are never summed.
    pub fn deltas(
        &self,
        lines: &[LineWithKnowledge],
        inserted: &[usize],
        author: &str,
        developer: &str,
    ) -> Vec<f64> {
        let mut deltas = vec![0.0; lines.len()];
        let writing = if author == developer {
            1.0
        } else {
            self.foreign_writing_knowledge
        };
        if writing == 0.0 {
            return deltas;
        }

        for &index in inserted {
            let Some(line) = lines.get(index) else {
                continue;
            };
            propose(&mut deltas, index, writing);

            let budget = f64::from(line.line.weight) * writing * self.spread_coefficient;
            if budget <= 0.0 {
                continue;
            }
            spread(lines, (0..index).rev(), budget, writing, &mut deltas);
            spread(lines, index + 1..lines.len(), budget, writing, &mut deltas);
        }

        trace!(
            developer,
            author,
            inserted = inserted.len(),
            touched = deltas.iter().filter(|d| **d > 0.0).count(),
            "computed knowledge deltas"
        );
        deltas
    }

    /// Apply the deltas of [`LineKnowledgeAdder::deltas`] to `state`, which
    /// must already hold the revision's lines with inserted lines at 0.
    pub fn add(&self, state: &KnowledgeState, inserted: &[usize], author: &str) -> KnowledgeState {
        let deltas = self.deltas(state.lines(), inserted, author, state.developer());
        let lines = state
            .lines()
            .iter()
            .zip(deltas)
            .map(|(l, delta)| LineWithKnowledge {
                line: l.line.clone(),
                knowledge: (l.knowledge + delta).clamp(0.0, 1.0),
            })
            .collect();
        KnowledgeState::new(state.developer(), state.as_of(), lines)
    }
}

fn propose(deltas: &mut [f64], index: usize, delta: f64) {
    if delta > deltas[index] {
        deltas[index] = delta;
    }
}

fn triangular(n: f64) -> f64 {
    n * (n + 1.0) / 2.0
}

fn spread(
    lines: &[LineWithKnowledge],
    walk: impl Iterator<Item = usize>,
    budget: f64,
    writing: f64,
    deltas: &mut [f64],
) {
    let total = triangular(budget);
    let mut remaining = budget;
    for index in walk {
        if remaining <= 0.0 {
            break;
        }
        let weight = lines[index].line.weight;
        if weight == 0 {
            continue;
        }
        let weight = f64::from(weight);
        let consumed = weight.min(remaining);
        let share = (triangular(remaining) - triangular(remaining - consumed)) / total;
        propose(deltas, index, writing * share / weight);
        remaining -= consumed;
    }
}
