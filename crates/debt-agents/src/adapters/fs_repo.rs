//! Filesystem repository snapshot.
//!
//! File discovery respects .gitignore through the `ignore` crate's walker;
//! history, blame, and diff shell out to `git` with the working directory
//! pinned to the snapshot root.

use std::path::{Path, PathBuf};
use std::process::Command;

use adjudication::ports::repo::{BlameEntry, CommitInfo, LogQuery, RepoError, RepoResult, RepoSnapshot};
use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use ignore::WalkBuilder;
use tracing::debug;

/// Extensions considered source files.
const SOURCE_EXTENSIONS: &[&str] = &[
    "rs", "ts", "tsx", "js", "jsx", "py", "go", "java", "rb", "cs", "php", "c", "cc", "cpp", "h",
    "hpp",
];

/// A repository checked out on the local filesystem.
pub struct LocalRepo {
    root: PathBuf,
}

impl LocalRepo {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    fn run_git(&self, args: &[&str]) -> RepoResult<String> {
        let output = Command::new("git")
            .args(args)
            .current_dir(&self.root)
            .output()
            .map_err(|e| RepoError::Access(format!("git {}: {e}", args.join(" "))))?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(RepoError::Access(format!(
                "git {}: {}",
                args.join(" "),
                stderr.trim()
            )));
        }
        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }

    fn absolute(&self, path: &str) -> PathBuf {
        self.root.join(path)
    }
}

#[async_trait]
impl RepoSnapshot for LocalRepo {
    async fn list_files(&self, _repo_id: &str) -> RepoResult<Vec<String>> {
        let walker = WalkBuilder::new(&self.root)
            .hidden(true)
            .git_ignore(true)
            .build();
        let mut files = Vec::new();
        for entry in walker.flatten() {
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
                continue;
            };
            if !SOURCE_EXTENSIONS.contains(&ext) {
                continue;
            }
            if let Ok(relative) = path.strip_prefix(&self.root) {
                files.push(relative.to_string_lossy().replace('\\', "/"));
            }
        }
        files.sort();
        debug!(count = files.len(), "listed source files");
        Ok(files)
    }

    async fn file_content(&self, _repo_id: &str, path: &str) -> RepoResult<String> {
        tokio::fs::read_to_string(self.absolute(path))
            .await
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => RepoError::NotFound(path.to_string()),
                _ => RepoError::Access(format!("{path}: {e}")),
            })
    }

    async fn log(&self, _repo_id: &str, query: LogQuery) -> RepoResult<Vec<CommitInfo>> {
        let limit = query.limit.unwrap_or(20).to_string();
        let mut args = vec![
            "log",
            "--pretty=format:%H%x1f%an%x1f%at%x1f%s",
            "-n",
            &limit,
        ];
        if let Some(file) = query.file.as_deref() {
            args.push("--");
            args.push(file);
        }
        let stdout = self.run_git(&args)?;
        let commits = stdout
            .lines()
            .filter_map(|line| {
                let mut parts = line.split('\x1f');
                let sha = parts.next()?.to_string();
                let author = parts.next()?.to_string();
                let epoch: i64 = parts.next()?.parse().ok()?;
                let message = parts.next().unwrap_or_default().to_string();
                Some(CommitInfo {
                    sha,
                    author,
                    date: Utc.timestamp_opt(epoch, 0).single()?,
                    message,
                })
            })
            .collect();
        Ok(commits)
    }

    async fn blame(
        &self,
        _repo_id: &str,
        path: &str,
        start_line: u32,
        end_line: u32,
    ) -> RepoResult<Vec<BlameEntry>> {
        let range = format!("{start_line},{end_line}");
        let stdout = self.run_git(&["blame", "--line-porcelain", "-L", &range, path])?;
        let mut entries = Vec::new();
        let mut line = start_line;
        let mut sha = String::new();
        for raw in stdout.lines() {
            if raw.len() >= 40 && raw.as_bytes()[..40].iter().all(u8::is_ascii_hexdigit) {
                sha = raw[..40].to_string();
            } else if let Some(author) = raw.strip_prefix("author ") {
                entries.push(BlameEntry {
                    line,
                    sha: sha.clone(),
                    author: author.to_string(),
                });
                line += 1;
            }
        }
        Ok(entries)
    }

    async fn diff(&self, _repo_id: &str, sha: &str) -> RepoResult<String> {
        self.run_git(&["show", "--stat", "--patch", sha])
    }

    async fn default_branch(&self, _repo_id: &str) -> RepoResult<String> {
        let stdout = self.run_git(&["symbolic-ref", "--short", "HEAD"])?;
        Ok(stdout.trim().to_string())
    }
}
