//! Line-level differences between two versions of a text.

use git2::{DiffOptions, Patch};
use kenning_core::{DiffChange, KenningError};

/// Compute the edit script turning `old` into `new` with libgit2's Myers
/// diff, one [`DiffChange`] per hunk, without context lines.
///
/// Lines are counted the way [`str::lines`] splits them, so the change
/// indices line up with `old.lines()` and `new.lines()`.
///
/// # Errors
///
/// Returns [`KenningError::Git`] if libgit2 fails to produce the patch.
///
/// # Examples
///
/// ```
/// use kenning_core::DiffChange;
/// use kenning_history::diff::line_changes;
///
/// let changes = line_changes("a\nb\nc\n", "a\nx\nc\n").unwrap();
/// assert_eq!(changes, vec![DiffChange::new(1, 1, 1, 1)]);
/// ```
pub fn line_changes(old: &str, new: &str) -> Result<Vec<DiffChange>, KenningError> {
    let mut opts = DiffOptions::new();
    opts.context_lines(0).interhunk_lines(0).force_text(true);

    let patch = Patch::from_buffers(old.as_bytes(), None, new.as_bytes(), None, Some(&mut opts))
        .map_err(|e| KenningError::Git(format!("failed to diff buffers: {e}")))?;

    let mut changes = Vec::with_capacity(patch.num_hunks());
    for hunk_idx in 0..patch.num_hunks() {
        let (hunk, _) = patch
            .hunk(hunk_idx)
            .map_err(|e| KenningError::Git(format!("failed to read hunk: {e}")))?;
        changes.push(to_change(
            hunk.old_start(),
            hunk.old_lines(),
            hunk.new_start(),
            hunk.new_lines(),
        ));
    }
    Ok(changes)
}

/// Hunk starts are 1-based, except that an empty side points at the line
/// after which the other side's lines go.
fn to_change(old_start: u32, old_lines: u32, new_start: u32, new_lines: u32) -> DiffChange {
    let begin = |start: u32, lines: u32| {
        if lines == 0 {
            start as usize
        } else {
            start.saturating_sub(1) as usize
        }
    };
    DiffChange::new(
        old_lines as usize,
        new_lines as usize,
        begin(old_start, old_lines),
        begin(new_start, new_lines),
    )
}
