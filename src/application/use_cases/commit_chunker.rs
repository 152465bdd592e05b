use crate::domain::{CommitChunk, CommitType, RawCommit};

const MAX_LISTED_FILES: usize = 20;
const MAX_DIFF_PREVIEW_LINES: usize = 50;
const TRUNCATED_MAX_FILES: usize = 10;
const TRUNCATED_MAX_BODY_CHARS: usize = 500;

/// Renders a commit into a deterministic, human-readable record suitable for
/// embedding: short hash, type, author, date, subject, optional body, file
/// list, insertion/deletion counts, and a diff preview.
pub fn render_commit(
    commit: &RawCommit,
    commit_type: CommitType,
    repo_path: &str,
    max_chunk_size: usize,
) -> CommitChunk {
    let content = render_full(commit, commit_type);

    let content = if content.len() > max_chunk_size {
        render_truncated(commit, commit_type)
    } else {
        content
    };

    CommitChunk::new(
        commit.hash.clone(),
        repo_path.to_string(),
        commit.author_name.clone(),
        commit.date.clone(),
        commit_type,
        content,
    )
}

fn date_only(date: &str) -> &str {
    date.split('T').next().unwrap_or(date)
}

fn render_full(commit: &RawCommit, commit_type: CommitType) -> String {
    let (insertions, deletions) = totals(commit);

    let mut out = String::new();
    out.push_str(&format!("commit {}\n", commit.short_hash));
    out.push_str(&format!("type: {}\n", commit_type));
    out.push_str(&format!("author: {}\n", commit.author_name));
    out.push_str(&format!("date: {}\n", date_only(&commit.date)));
    out.push_str(&format!("subject: {}\n", commit.subject));

    if !commit.body.trim().is_empty() {
        out.push_str(&format!("\n{}\n", commit.body.trim()));
    }

    if !commit.files.is_empty() {
        out.push_str("\nfiles:\n");
        for file in commit.files.iter().take(MAX_LISTED_FILES) {
            out.push_str(&format!("  {}\n", file.path));
        }
        if commit.files.len() > MAX_LISTED_FILES {
            out.push_str(&format!("  and {} more\n", commit.files.len() - MAX_LISTED_FILES));
        }
    }

    out.push_str(&format!("\n+{} -{}\n", insertions, deletions));

    if !commit.diff.is_empty() {
        out.push_str("\ndiff preview:\n");
        for line in commit.diff.lines().take(MAX_DIFF_PREVIEW_LINES) {
            out.push_str(line);
            out.push('\n');
        }
    }

    out
}

fn render_truncated(commit: &RawCommit, commit_type: CommitType) -> String {
    let (insertions, deletions) = totals(commit);
    let body: String = commit.body.chars().take(TRUNCATED_MAX_BODY_CHARS).collect();

    let mut out = String::new();
    out.push_str(&format!("commit {}\n", commit.short_hash));
    out.push_str(&format!("type: {}\n", commit_type));
    out.push_str(&format!("author: {}\n", commit.author_name));
    out.push_str(&format!("date: {}\n", date_only(&commit.date)));
    out.push_str(&format!("subject: {}\n", commit.subject));

    if !body.trim().is_empty() {
        out.push_str(&format!("\n{}\n", body.trim()));
    }

    if !commit.files.is_empty() {
        out.push_str("\nfiles:\n");
        for file in commit.files.iter().take(TRUNCATED_MAX_FILES) {
            out.push_str(&format!("  {}\n", file.path));
        }
    }

    out.push_str(&format!("\n+{} -{}\n", insertions, deletions));
    out.push_str("\n[content truncated due to size]\n");
    out
}

fn totals(commit: &RawCommit) -> (u32, u32) {
    commit.files.iter().fold((0, 0), |(a, d), f| {
        (a + f.added.unwrap_or(0), d + f.deleted.unwrap_or(0))
    })
}
