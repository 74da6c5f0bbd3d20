//! `git` invocation for the status provider.
//!
//! Every call runs under a timeout and every failure (git missing, not a
//! repository, non-zero exit, timeout) collapses to "no data". A call that
//! times out is dropped, which kills the child process.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;

use super::{DiffStats, VcsSnapshot, VcsStatus};

/// Default per-invocation timeout in milliseconds.
pub const DEFAULT_TIMEOUT_MS: u64 = 3000;

/// Status provider backed by the `git` CLI.
#[derive(Debug, Clone)]
pub struct GitProvider {
    timeout: Duration,
}

impl Default for GitProvider {
    fn default() -> Self {
        Self::new(Duration::from_millis(DEFAULT_TIMEOUT_MS))
    }
}

impl GitProvider {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    /// Run `git -C <cwd> <args>` and return stdout, or `None` on any failure.
    async fn run_git(&self, cwd: &Path, args: &[&str]) -> Option<String> {
        let mut command = Command::new("git");
        command
            .arg("-C")
            .arg(cwd)
            .args(args)
            .env("GIT_OPTIONAL_LOCKS", "0")
            .stdin(Stdio::null())
            .kill_on_drop(true);

        let output = match tokio::time::timeout(self.timeout, command.output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(err)) => {
                tracing::debug!(?err, ?args, "git could not be spawned");
                return None;
            }
            Err(_) => {
                tracing::warn!(?args, timeout = ?self.timeout, "git timed out, abandoning");
                return None;
            }
        };

        if !output.status.success() {
            tracing::debug!(
                ?args,
                code = ?output.status.code(),
                stderr = %String::from_utf8_lossy(&output.stderr).trim(),
                "git exited with failure"
            );
            return None;
        }
        Some(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    /// Whether `root` is inside a git work tree.
    pub async fn is_repository(&self, root: &Path) -> bool {
        self.run_git(root, &["rev-parse", "--is-inside-work-tree"])
            .await
            .is_some_and(|out| out.trim() == "true")
    }

    /// Absolute path of the work tree's top-level directory.
    pub async fn toplevel(&self, root: &Path) -> Option<PathBuf> {
        let out = self.run_git(root, &["rev-parse", "--show-toplevel"]).await?;
        let trimmed = out.trim();
        if trimmed.is_empty() {
            return None;
        }
        let path = PathBuf::from(trimmed);
        Some(path.canonicalize().unwrap_or(path))
    }

    /// Current branch name, or the short commit hash when detached.
    pub async fn branch_name(&self, root: &Path) -> Option<String> {
        let out = match self.run_git(root, &["symbolic-ref", "--short", "HEAD"]).await {
            Some(out) => out,
            None => self.run_git(root, &["rev-parse", "--short", "HEAD"]).await?,
        };
        let trimmed = out.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    }

    /// Status code per absolute path. An ignored directory is reported as one
    /// entry; its contents are not listed.
    pub async fn status_map(&self, root: &Path) -> HashMap<PathBuf, VcsStatus> {
        let Some(toplevel) = self.toplevel(root).await else {
            return HashMap::new();
        };
        match self
            .run_git(
                root,
                &[
                    "status",
                    "--porcelain",
                    "-z",
                    "--untracked-files=all",
                    "--ignored=matching",
                ],
            )
            .await
        {
            Some(out) => parse_status(&out, &toplevel),
            None => HashMap::new(),
        }
    }

    /// Added/removed counts per absolute path, staged and unstaged summed.
    pub async fn diff_stats(&self, root: &Path) -> HashMap<PathBuf, DiffStats> {
        let Some(toplevel) = self.toplevel(root).await else {
            return HashMap::new();
        };
        let (unstaged, staged) = tokio::join!(
            self.run_git(root, &["diff", "--numstat", "-z", "-M"]),
            self.run_git(root, &["diff", "--numstat", "-z", "-M", "--cached"]),
        );
        let mut stats = HashMap::new();
        for out in [unstaged, staged].into_iter().flatten() {
            merge_numstat(&out, &toplevel, &mut stats);
        }
        stats
    }

    /// Authoritative file list for eager construction: tracked files plus
    /// untracked files that are not ignored, relative to `root`.
    pub async fn tracked_files(&self, root: &Path) -> Option<Vec<PathBuf>> {
        let out = self
            .run_git(
                root,
                &["ls-files", "-z", "--cached", "--others", "--exclude-standard"],
            )
            .await?;
        let mut files: Vec<PathBuf> = out
            .split('\0')
            .filter(|entry| !entry.is_empty())
            .map(PathBuf::from)
            .collect();
        files.sort();
        files.dedup();
        Some(files)
    }

    /// One full poll: branch, statuses and diffs.
    pub async fn snapshot(&self, root: &Path) -> VcsSnapshot {
        if !self.is_repository(root).await {
            return VcsSnapshot::default();
        }
        let (branch, statuses, diffs) = tokio::join!(
            self.branch_name(root),
            self.status_map(root),
            self.diff_stats(root),
        );
        VcsSnapshot {
            is_repository: true,
            branch,
            statuses,
            diffs,
        }
    }
}

/// Parse `git status --porcelain -z` output into absolute-path keyed codes.
///
/// Rename and copy records carry the original path as an extra field, which
/// is skipped.
pub fn parse_status(output: &str, toplevel: &Path) -> HashMap<PathBuf, VcsStatus> {
    let mut statuses = HashMap::new();
    let mut fields = output.split('\0');
    while let Some(entry) = fields.next() {
        if entry.len() < 4 {
            continue;
        }
        let mut chars = entry.chars();
        let (Some(index), Some(worktree)) = (chars.next(), chars.next()) else {
            continue;
        };
        if matches!(index, 'R' | 'C') {
            fields.next();
        }
        let Some(status) = VcsStatus::from_porcelain(index, worktree) else {
            continue;
        };
        let path = entry[3..].trim_end_matches('/');
        if path.is_empty() {
            continue;
        }
        statuses.insert(toplevel.join(path), status);
    }
    statuses
}

/// Merge `git diff --numstat -z` output into `stats`, summing duplicates.
///
/// Each record is `added<TAB>removed<TAB>path<NUL>`; a rename leaves the path
/// empty and follows with `old<NUL>new<NUL>`, keyed here by the new path.
/// Binary files report `-` for both columns and count as zero.
pub fn merge_numstat(output: &str, toplevel: &Path, stats: &mut HashMap<PathBuf, DiffStats>) {
    let mut fields = output.split('\0');
    while let Some(record) = fields.next() {
        let mut parts = record.splitn(3, '\t');
        let (Some(added), Some(removed), Some(path)) = (parts.next(), parts.next(), parts.next())
        else {
            continue;
        };
        let path = if path.is_empty() {
            // old path
            fields.next();
            match fields.next() {
                Some(new) => new,
                None => continue,
            }
        } else {
            path
        };
        if path.is_empty() {
            continue;
        }
        let added = added.parse::<u64>().unwrap_or(0);
        let removed = removed.parse::<u64>().unwrap_or(0);
        *stats.entry(toplevel.join(path)).or_default() += DiffStats::new(added, removed);
    }
}
