//! Git history extraction via git2.
//!
//! Mines the revisions of one file, oldest first, and turns them into a
//! [`DiffHistory`] whose lines carry their author, write time, and weight.

use std::path::{Component, Path, PathBuf};

use chrono::{DateTime, Utc};
use git2::{ObjectType, Oid, Repository, Sort};
use kenning_core::{DiffHistory, DiffLine, DiffRevision, Difference, HistoryConfig, KenningError};
use kenning_knowledge::replay::{replay, LineEvent};
use kenning_knowledge::LineWeightCalculator;
use tracing::{debug, info};

use crate::diff::line_changes;

/// Options for history mining.
///
/// # Examples
///
/// ```
/// use kenning_history::mining::MiningOptions;
///
/// let opts = MiningOptions::default();
/// assert!(opts.branch.is_none());
/// assert_eq!(opts.max_revisions, 0);
/// ```
#[derive(Debug, Clone, Default)]
pub struct MiningOptions {
    /// Branch to walk (default: HEAD).
    pub branch: Option<String>,
    /// Keep only the newest N revisions; 0 keeps all.
    pub max_revisions: usize,
}

impl From<&HistoryConfig> for MiningOptions {
    fn from(config: &HistoryConfig) -> Self {
        Self {
            branch: config.branch.clone(),
            max_revisions: config.max_revisions,
        }
    }
}

/// A file's history together with its current text.
#[derive(Debug, Clone)]
pub struct MinedHistory {
    /// File path relative to the repository root.
    pub path: String,
    /// Revisions that changed the file, oldest first.
    pub history: DiffHistory,
    /// Text of the newest revision, one entry per line.
    pub lines: Vec<String>,
}

/// One version of the file as found in a commit.
#[derive(Debug, Clone)]
struct Snapshot {
    id: String,
    author: String,
    timestamp: DateTime<Utc>,
    text: String,
}

/// Mine the revision history of `file_path` in the repository at `repo_path`.
///
/// Follows first parents from HEAD (or `options.branch`) and keeps every
/// commit in which the file's content differs from the previously kept one,
/// including deletions, which appear as empty content. Commit timestamps are
/// clamped so they never go backwards along the walk.
///
/// `file_path` may be relative to the repository root or absolute inside
/// its working directory.
///
/// # Errors
///
/// Returns [`KenningError::Git`] if the repository cannot be opened or
/// walked, and [`KenningError::FileNotFound`] if no commit contains the file.
///
/// # Examples
///
/// ```no_run
/// use std::path::Path;
/// use kenning_history::mining::{mine_file_history, MiningOptions};
/// use kenning_knowledge::WordCountWeight;
///
/// let mined = mine_file_history(
///     Path::new("."),
///     Path::new("src/main.rs"),
///     &MiningOptions::default(),
///     &WordCountWeight,
/// )
/// .unwrap();
/// println!("{} revisions", mined.history.len());
/// ```
pub fn mine_file_history(
    repo_path: &Path,
    file_path: &Path,
    options: &MiningOptions,
    weigher: &dyn LineWeightCalculator,
) -> Result<MinedHistory, KenningError> {
    let repo = Repository::discover(repo_path)
        .map_err(|e| KenningError::Git(format!("failed to open repository: {e}")))?;
    let relative = relative_path(&repo, file_path)?;

    let mut snapshots = collect_snapshots(&repo, &relative, options)?;
    if snapshots.is_empty() {
        return Err(KenningError::FileNotFound(relative));
    }
    if options.max_revisions > 0 && snapshots.len() > options.max_revisions {
        snapshots.drain(..snapshots.len() - options.max_revisions);
    }

    let history = build_history(&snapshots, weigher)?;
    let lines = snapshots
        .last()
        .map(|s| s.text.lines().map(str::to_string).collect())
        .unwrap_or_default();

    let path = relative.to_string_lossy().replace('\\', "/");
    info!(
        path = %path,
        revisions = history.len(),
        authors = history.authors().len(),
        "mined file history"
    );

    Ok(MinedHistory {
        path,
        history,
        lines,
    })
}

fn relative_path(repo: &Repository, file_path: &Path) -> Result<PathBuf, KenningError> {
    if file_path.is_relative() {
        return Ok(file_path
            .components()
            .filter(|c| !matches!(c, Component::CurDir))
            .collect());
    }
    let workdir = repo
        .workdir()
        .ok_or_else(|| KenningError::Git("repository has no working directory".into()))?;
    let workdir = workdir.canonicalize()?;
    let absolute = file_path
        .canonicalize()
        .map_err(|_| KenningError::FileNotFound(file_path.to_path_buf()))?;
    absolute
        .strip_prefix(&workdir)
        .map(Path::to_path_buf)
        .map_err(|_| {
            KenningError::Git(format!(
                "{} is outside the repository at {}",
                file_path.display(),
                workdir.display()
            ))
        })
}

fn collect_snapshots(
    repo: &Repository,
    path: &Path,
    options: &MiningOptions,
) -> Result<Vec<Snapshot>, KenningError> {
    let mut revwalk = repo
        .revwalk()
        .map_err(|e| KenningError::Git(format!("failed to create revwalk: {e}")))?;
    revwalk
        .set_sorting(Sort::TOPOLOGICAL | Sort::TIME | Sort::REVERSE)
        .map_err(|e| KenningError::Git(format!("failed to set sorting: {e}")))?;

    if let Some(ref branch) = options.branch {
        let reference = repo
            .resolve_reference_from_short_name(branch)
            .map_err(|e| KenningError::Git(format!("failed to resolve branch '{branch}': {e}")))?;
        let oid = reference
            .target()
            .ok_or_else(|| KenningError::Git("branch has no target".into()))?;
        revwalk
            .push(oid)
            .map_err(|e| KenningError::Git(format!("failed to push oid: {e}")))?;
    } else {
        revwalk
            .push_head()
            .map_err(|e| KenningError::Git(format!("failed to push HEAD: {e}")))?;
    }
    revwalk
        .simplify_first_parent()
        .map_err(|e| KenningError::Git(format!("failed to simplify history: {e}")))?;

    let mut snapshots: Vec<Snapshot> = Vec::new();
    let mut previous_blob: Option<Oid> = None;
    let mut previous_time: Option<DateTime<Utc>> = None;

    for oid_result in revwalk {
        let oid = oid_result.map_err(|e| KenningError::Git(format!("revwalk error: {e}")))?;
        let commit = repo
            .find_commit(oid)
            .map_err(|e| KenningError::Git(format!("failed to find commit: {e}")))?;

        let blob = blob_at(&commit, path)?;
        if blob == previous_blob {
            continue;
        }
        previous_blob = blob;

        let text = match blob {
            Some(blob_id) => {
                let blob = repo
                    .find_blob(blob_id)
                    .map_err(|e| KenningError::Git(format!("failed to read blob: {e}")))?;
                String::from_utf8_lossy(blob.content()).into_owned()
            }
            None => String::new(),
        };

        let seconds = commit.time().seconds();
        let committed = DateTime::<Utc>::from_timestamp(seconds, 0)
            .ok_or_else(|| KenningError::Git(format!("commit {oid} has invalid time {seconds}")))?;
        let timestamp = previous_time.map_or(committed, |prev| prev.max(committed));
        previous_time = Some(timestamp);

        let signature = commit.author();
        let author = signature
            .email()
            .filter(|email| !email.is_empty())
            .or_else(|| signature.name())
            .unwrap_or("unknown")
            .to_string();

        let hash = oid.to_string();
        debug!(commit = %hash, author = %author, "file changed");
        snapshots.push(Snapshot {
            id: hash[..hash.len().min(8)].to_string(),
            author,
            timestamp,
            text,
        });
    }

    Ok(snapshots)
}

fn blob_at(commit: &git2::Commit, path: &Path) -> Result<Option<Oid>, KenningError> {
    let tree = commit
        .tree()
        .map_err(|e| KenningError::Git(format!("failed to get commit tree: {e}")))?;
    let entry = match tree.get_path(path) {
        Ok(entry) => entry,
        Err(e) if e.code() == git2::ErrorCode::NotFound => return Ok(None),
        Err(e) => return Err(KenningError::Git(format!("failed to look up path: {e}"))),
    };
    Ok((entry.kind() == Some(ObjectType::Blob)).then(|| entry.id()))
}

/// Diff consecutive snapshots and carry line provenance forward.
fn build_history(
    snapshots: &[Snapshot],
    weigher: &dyn LineWeightCalculator,
) -> Result<DiffHistory, KenningError> {
    let mut revisions = Vec::with_capacity(snapshots.len());
    let mut previous_text = "";
    let mut previous_content: Vec<DiffLine> = Vec::new();

    for snapshot in snapshots {
        let changes = line_changes(previous_text, &snapshot.text)?;
        let difference = Difference {
            author: snapshot.author.clone(),
            timestamp: snapshot.timestamp,
            changes,
        };

        let new_lines: Vec<&str> = snapshot.text.lines().collect();
        let replayed = replay(previous_content.len(), &difference).map_err(|e| {
            KenningError::Replay {
                revision: snapshot.id.clone(),
                message: e.to_string(),
            }
        })?;
        if replayed.new_len() != new_lines.len() {
            return Err(KenningError::Replay {
                revision: snapshot.id.clone(),
                message: format!(
                    "diff produced {} lines but the file has {}",
                    replayed.new_len(),
                    new_lines.len()
                ),
            });
        }

        let mut content = Vec::with_capacity(new_lines.len());
        for event in replayed.events() {
            match *event {
                LineEvent::Stayed { old, .. } => content.push(previous_content[old].clone()),
                LineEvent::Inserted { new } => content.push(DiffLine {
                    author: snapshot.author.clone(),
                    timestamp: snapshot.timestamp,
                    weight: weigher.weight(new_lines[new]),
                }),
                LineEvent::Deleted { .. } => {}
            }
        }

        revisions.push(DiffRevision {
            id: snapshot.id.clone(),
            content: content.clone(),
            difference_with_previous: difference,
        });
        previous_text = snapshot.text.as_str();
        previous_content = content;
    }

    Ok(DiffHistory::new(revisions))
}
