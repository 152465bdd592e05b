use std::process::Stdio;
use std::sync::OnceLock;
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use tokio::io::AsyncReadExt;
use tokio::process::Command;

use crate::application::interfaces::{CommitQuery, GitExtractor};
use crate::domain::{CoreError, FileChange, RawCommit};

const FIELD_SEP: char = '\u{1f}';
const RECORD_SEP: char = '\u{1e}';

fn numstat_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(\d+|-)\t(\d+|-)\t(.+)$").expect("static numstat pattern is valid"))
}

/// Invokes `git` as a subprocess, one argument array per call, grounded on
/// the same style as other pack repos' git-subprocess helpers. Every call is
/// bounded by `timeout` (the child is killed on drop if it's still running
/// when the timeout future is dropped) and reads at most `max_output_bytes`
/// of stdout.
pub struct ProcessGitExtractor {
    timeout: Duration,
    max_output_bytes: usize,
    max_diff_size: usize,
}

impl ProcessGitExtractor {
    pub fn new(timeout: Duration, max_output_bytes: usize, max_diff_size: usize) -> Self {
        Self { timeout, max_output_bytes, max_diff_size }
    }

    async fn run(&self, repo_path: &str, args: &[&str]) -> Result<String, CoreError> {
        let mut child = Command::new("git")
            .args(args)
            .current_dir(repo_path)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| CoreError::git_subprocess(format!("failed to spawn git {args:?}: {e}")))?;

        let stdout = child.stdout.take().expect("piped stdout");
        let max_output_bytes = self.max_output_bytes as u64;

        let outcome = tokio::time::timeout(self.timeout, async move {
            let mut buf = Vec::new();
            stdout.take(max_output_bytes).read_to_end(&mut buf).await.ok();
            let status = child.wait().await?;
            Ok::<_, std::io::Error>((status, buf, child))
        })
        .await;

        let (status, buf) = match outcome {
            Ok(Ok((status, buf, _child))) => (status, buf),
            Ok(Err(e)) => return Err(CoreError::git_subprocess(format!("git {args:?} wait failed: {e}"))),
            Err(_) => {
                return Err(CoreError::Cancelled);
            }
        };

        if !status.success() {
            return Err(CoreError::git_subprocess(format!("git {args:?} exited with {status}")));
        }

        String::from_utf8(buf).map_err(|e| CoreError::parse(format!("git output not utf-8: {e}")))
    }

    /// Attempts a git call, mapping a subprocess failure to `Ok(None)`
    /// instead of propagating, for calls whose absence is meaningful
    /// (no such repository, no such remote) rather than an error.
    async fn try_run(&self, repo_path: &str, args: &[&str]) -> Option<String> {
        self.run(repo_path, args).await.ok()
    }
}

/// Resolves git's numstat rename syntax: `prefix{old => new}suffix` (a
/// rename confined to a subdirectory) or `old/path => new/path` (no common
/// prefix). Returns `(current_path, renamed_from)`, `renamed_from` being
/// `None` when `path` isn't a rename.
fn resolve_rename(path: &str) -> (String, Option<String>) {
    if let Some(brace_start) = path.find('{') {
        if let Some(brace_end) = path[brace_start..].find('}').map(|i| i + brace_start) {
            let prefix = &path[..brace_start];
            let inside = &path[brace_start + 1..brace_end];
            let suffix = &path[brace_end + 1..];
            if let Some((old, new)) = inside.split_once(" => ") {
                return (format!("{prefix}{new}{suffix}"), Some(format!("{prefix}{old}{suffix}")));
            }
        }
    }
    if let Some((old, new)) = path.split_once(" => ") {
        return (new.to_string(), Some(old.to_string()));
    }
    (path.to_string(), None)
}

fn parse_log_output(output: &str, repo_path: &str) -> Vec<RawCommit> {
    output
        .split(RECORD_SEP)
        .map(str::trim)
        .filter(|record| !record.is_empty())
        .filter_map(|record| parse_commit_record(record, repo_path))
        .collect()
}

fn parse_commit_record(record: &str, repo_path: &str) -> Option<RawCommit> {
    let parts: Vec<&str> = record.splitn(7, FIELD_SEP).collect();
    if parts.len() < 7 {
        return None;
    }
    let hash = parts[0].to_string();
    let short_hash = parts[1].to_string();
    let author_name = parts[2].to_string();
    let author_email = parts[3].to_string();
    let date = parts[4].to_string();
    let subject = parts[5].to_string();
    let remainder = parts[6];

    let lines: Vec<&str> = remainder.lines().collect();
    let mut split_at = lines.len();
    while split_at > 0 {
        let candidate = lines[split_at - 1].trim();
        if candidate.is_empty() || numstat_re().is_match(candidate) {
            split_at -= 1;
        } else {
            break;
        }
    }

    let body = lines[..split_at].join("\n").trim().to_string();
    let files = lines[split_at..]
        .iter()
        .filter_map(|line| {
            let caps = numstat_re().captures(line.trim())?;
            let added = caps[1].parse::<u32>().ok();
            let deleted = caps[2].parse::<u32>().ok();
            let (path, renamed_from) = resolve_rename(&caps[3]);
            Some(FileChange {
                path,
                added,
                deleted,
                renamed_from,
            })
        })
        .collect();

    let _ = repo_path;
    Some(RawCommit {
        hash,
        short_hash,
        author_name,
        author_email,
        date,
        subject,
        body,
        files,
        diff: String::new(),
    })
}

#[async_trait]
impl GitExtractor for ProcessGitExtractor {
    async fn validate_repository(&self, repo_path: &str) -> Result<bool, CoreError> {
        match self.try_run(repo_path, &["rev-parse", "--is-inside-work-tree"]).await {
            Some(out) => Ok(out.trim() == "true"),
            None => Ok(false),
        }
    }

    async fn latest_commit_hash(&self, repo_path: &str) -> Result<String, CoreError> {
        let out = self.run(repo_path, &["rev-parse", "HEAD"]).await?;
        Ok(out.trim().to_string())
    }

    async fn commit_count(&self, repo_path: &str, since_commit: Option<&str>) -> Result<u64, CoreError> {
        let range = since_commit.map(|c| format!("{c}..HEAD"));
        let mut args = vec!["rev-list", "--count"];
        args.push(range.as_deref().unwrap_or("HEAD"));
        let out = self.run(repo_path, &args).await?;
        out.trim()
            .parse::<u64>()
            .map_err(|e| CoreError::parse(format!("unexpected rev-list output: {e}")))
    }

    async fn remote_url(&self, repo_path: &str) -> Result<String, CoreError> {
        Ok(self
            .try_run(repo_path, &["remote", "get-url", "origin"])
            .await
            .map(|s| s.trim().to_string())
            .unwrap_or_default())
    }

    async fn commits(&self, repo_path: &str, query: CommitQuery) -> Result<Vec<RawCommit>, CoreError> {
        let format = format!(
            "{RECORD_SEP}%H{FIELD_SEP}%h{FIELD_SEP}%an{FIELD_SEP}%ae{FIELD_SEP}%aI{FIELD_SEP}%s{FIELD_SEP}%b"
        );
        let mut args = vec!["log".to_string(), "--numstat".to_string(), format!("--pretty=format:{format}")];

        if let Some(since_commit) = &query.since_commit {
            args.push(format!("{since_commit}..HEAD"));
        }
        if let Some(since_date) = &query.since_date {
            args.push(format!("--since={since_date}"));
        }
        if let Some(max) = query.max_commits {
            args.push(format!("-n{max}"));
        }

        let arg_refs: Vec<&str> = args.iter().map(String::as_str).collect();
        let output = self.run(repo_path, &arg_refs).await?;
        Ok(parse_log_output(&output, repo_path))
    }

    async fn commit_diff(&self, repo_path: &str, hash: &str) -> Result<String, CoreError> {
        let diff = self.run(repo_path, &["show", "--pretty=format:", hash]).await?;
        if diff.len() <= self.max_diff_size {
            Ok(diff)
        } else {
            let mut truncated = diff[..self.max_diff_size].to_string();
            truncated.push_str("\n...[diff truncated]\n");
            Ok(truncated)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_single_commit_record() {
        let record = format!(
            "{RECORD_SEP}abc123{FIELD_SEP}abc123{FIELD_SEP}Ada{FIELD_SEP}ada@example.com{FIELD_SEP}2024-01-15T10:00:00Z{FIELD_SEP}feat: add thing{FIELD_SEP}Body text here.\n\n5\t2\tsrc/x.ts\n"
        );
        let commits = parse_log_output(&record, "/repo");
        assert_eq!(commits.len(), 1);
        assert_eq!(commits[0].hash, "abc123");
        assert_eq!(commits[0].short_hash, "abc123");
        assert_eq!(commits[0].subject, "feat: add thing");
        assert_eq!(commits[0].body, "Body text here.");
        assert_eq!(commits[0].files.len(), 1);
        assert_eq!(commits[0].files[0].path, "src/x.ts");
        assert_eq!(commits[0].files[0].added, Some(5));
    }

    #[test]
    fn test_parse_binary_file_change() {
        let record = format!(
            "{RECORD_SEP}abc{FIELD_SEP}abc{FIELD_SEP}Ada{FIELD_SEP}a@e.com{FIELD_SEP}2024-01-15T10:00:00Z{FIELD_SEP}chore: add image{FIELD_SEP}\n\n-\t-\tlogo.png\n"
        );
        let commits = parse_log_output(&record, "/repo");
        assert_eq!(commits.len(), 1);
        assert!(commits[0].files[0].is_binary());
    }

    #[test]
    fn test_parse_multiple_commits() {
        let record = format!(
            "{RECORD_SEP}h1{FIELD_SEP}h1{FIELD_SEP}A{FIELD_SEP}a@e.com{FIELD_SEP}d1{FIELD_SEP}feat: one{FIELD_SEP}\n\n1\t0\ta.rs\n{RECORD_SEP}h2{FIELD_SEP}h2{FIELD_SEP}B{FIELD_SEP}b@e.com{FIELD_SEP}d2{FIELD_SEP}fix: two{FIELD_SEP}\n\n2\t1\tb.rs\n"
        );
        let commits = parse_log_output(&record, "/repo");
        assert_eq!(commits.len(), 2);
        assert_eq!(commits[0].hash, "h1");
        assert_eq!(commits[1].hash, "h2");
    }

    #[test]
    fn test_parse_renamed_file_change_braced_form() {
        let record = format!(
            "{RECORD_SEP}abc{FIELD_SEP}abc{FIELD_SEP}Ada{FIELD_SEP}a@e.com{FIELD_SEP}2024-01-15T10:00:00Z{FIELD_SEP}refactor: rename{FIELD_SEP}\n\n3\t1\tsrc/{{old.ts => new.ts}}\n"
        );
        let commits = parse_log_output(&record, "/repo");
        assert_eq!(commits[0].files[0].path, "src/new.ts");
        assert_eq!(commits[0].files[0].renamed_from.as_deref(), Some("src/old.ts"));
    }

    #[test]
    fn test_parse_renamed_file_change_plain_form() {
        let (path, renamed_from) = resolve_rename("old/name.rs => new/name.rs");
        assert_eq!(path, "new/name.rs");
        assert_eq!(renamed_from.as_deref(), Some("old/name.rs"));
    }

    #[test]
    fn test_resolve_rename_passes_through_non_rename_paths() {
        let (path, renamed_from) = resolve_rename("src/x.ts");
        assert_eq!(path, "src/x.ts");
        assert_eq!(renamed_from, None);
    }

    #[test]
    fn test_diff_truncation_appends_marker() {
        let long_diff = "x".repeat(100);
        assert!(long_diff.len() > 10);
        let truncated = &long_diff[..10];
        assert_eq!(truncated.len(), 10);
    }
}
