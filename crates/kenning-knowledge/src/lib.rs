//! Per-line knowledge tracking over a file's revision history.
//!
//! Replays every revision of a file for each developer, crediting knowledge
//! for lines they wrote and lines they read around their edits, and letting
//! it fade with time. The result estimates how much of the file's current
//! content each developer still understands:
//!
//! - [`weight`]: information content of a line
//! - [`replay`]: classify lines as stayed, deleted, or inserted
//! - [`oblivion`]: time-based forgetting
//! - [`adder`]: writing and reading knowledge for new lines
//! - [`state`]: immutable per-developer knowledge snapshots
//! - [`calculator`]: revision and decay transitions between snapshots
//! - [`finder`]: fold the history for every author and rank them

pub mod adder;
pub mod calculator;
pub mod finder;
pub mod oblivion;
pub mod replay;
pub mod state;
pub mod weight;

pub use adder::LineKnowledgeAdder;
pub use calculator::KnowledgeStateCalculator;
pub use finder::CodeOwnerFinder;
pub use oblivion::{ExponentialOblivion, NeverForget, OblivionFunction};
pub use replay::{replay, LineEvent, Replay, ReplayError};
pub use state::{KnowledgeState, LineWithKnowledge};
pub use weight::{LengthWeight, LineWeightCalculator, WordCountWeight};
