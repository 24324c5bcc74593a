//! Revision history extraction for a single file.
//!
//! Walks a git repository with git2, keeps every commit that changed the
//! file, diffs consecutive versions with libgit2's line diff, and carries
//! per-line authorship forward so the knowledge model can replay it.

pub mod diff;
pub mod mining;
