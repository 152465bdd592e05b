//! End-to-end tests exercising indexing and retrieval through the real
//! use-case orchestrators, against the filesystem and (for git tests) a
//! real `git` subprocess. Each test wires its own adapters with an
//! isolated snapshot directory so runs never touch `~/.codectx`.

use std::path::Path;
use std::process::Command;
use std::sync::Arc;
use std::time::Duration;

use codectx::application::interfaces::{Embedder, VectorStore};
use codectx::application::use_cases::{
    federate, ChunkingConfig, CodeIndexer, GitIndexer, HistorySearchFilter, IndexOptions, Retriever, SearchType,
};
use codectx::connector::adapter::{FsSnapshotStore, InMemoryVectorStore, MockEmbedder, ProcessGitExtractor, TreeSitterChunker};
use codectx::domain::{RetrievedItem, ResultType, SearchQuery, SearchResult};

struct Harness {
    code_indexer: CodeIndexer,
    git_indexer: GitIndexer,
    retriever: Retriever,
    vector_store: Arc<InMemoryVectorStore>,
    embedder: Arc<MockEmbedder>,
    _snapshot_dir: tempfile::TempDir,
}

fn harness() -> Harness {
    let vector_store = Arc::new(InMemoryVectorStore::new());
    let embedder = Arc::new(MockEmbedder::new(384));
    let snapshot_dir = tempfile::tempdir().unwrap();
    let snapshot_store = Arc::new(FsSnapshotStore::new(snapshot_dir.path()));
    let git = Arc::new(ProcessGitExtractor::new(Duration::from_secs(10), 16 * 1024 * 1024, 10 * 1024 * 1024));
    let syntax = Arc::new(TreeSitterChunker::new());
    let chunking = ChunkingConfig {
        chunk_size: 1500,
        chunk_overlap: 200,
        min_chunk_chars: 20,
        max_chunks_per_file: None,
    };

    let code_indexer = CodeIndexer::new(
        vector_store.clone(),
        embedder.clone(),
        snapshot_store.clone(),
        Some(syntax.clone()),
        chunking,
        32,
        3,
        None,
    );
    let git_indexer = GitIndexer::new(vector_store.clone(), embedder.clone(), snapshot_store, git, 32, 3);
    let retriever = Retriever::new(vector_store.clone(), embedder.clone());

    Harness {
        code_indexer,
        git_indexer,
        retriever,
        vector_store,
        embedder,
        _snapshot_dir: snapshot_dir,
    }
}

fn write(dir: &Path, relative: &str, content: &str) {
    let path = dir.join(relative);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(path, content).unwrap();
}

fn run_git(dir: &Path, args: &[&str]) {
    let status = Command::new("git")
        .args(args)
        .current_dir(dir)
        .env("GIT_AUTHOR_NAME", "Test")
        .env("GIT_AUTHOR_EMAIL", "test@example.com")
        .env("GIT_COMMITTER_NAME", "Test")
        .env("GIT_COMMITTER_EMAIL", "test@example.com")
        .status()
        .expect("git invocation failed");
    assert!(status.success(), "git {args:?} failed");
}

#[tokio::test]
async fn test_index_then_search_finds_indexed_function() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "src/lib.rs", "pub fn add(a: i32, b: i32) -> i32 {\n    a + b\n}\n");

    let harness = harness();
    let stats = harness
        .code_indexer
        .index_codebase(dir.path(), "code_test", &IndexOptions::default(), None, None)
        .await
        .unwrap();

    assert_eq!(stats.files_indexed, 1);
    assert!(stats.chunks_created >= 1);

    let query = SearchQuery::new("add two numbers").with_limit(5);
    let hits = harness.retriever.search("code_test", &query).await.unwrap();
    assert!(!hits.is_empty());
}

#[tokio::test]
async fn test_incremental_reindex_reflects_added_modified_and_deleted_files() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "a.rs", "pub fn a() {}\n");
    write(dir.path(), "b.rs", "pub fn b() {}\n");

    let harness = harness();
    harness
        .code_indexer
        .index_codebase(dir.path(), "reindex_test", &IndexOptions::default(), None, None)
        .await
        .unwrap();

    std::fs::remove_file(dir.path().join("b.rs")).unwrap();
    write(dir.path(), "a.rs", "pub fn a() {\n    1\n}\n");
    write(dir.path(), "c.rs", "pub fn c() {}\n");

    let changes = harness
        .code_indexer
        .reindex_changes(dir.path(), "reindex_test", &IndexOptions::default(), None)
        .await
        .unwrap();

    assert_eq!(changes.files_added, 1);
    assert_eq!(changes.files_modified, 1);
    assert_eq!(changes.files_deleted, 1);
}

#[tokio::test]
async fn test_git_history_index_and_search() {
    let dir = tempfile::tempdir().unwrap();
    run_git(dir.path(), &["init", "-q"]);
    write(dir.path(), "README.md", "hello\n");
    run_git(dir.path(), &["add", "."]);
    run_git(dir.path(), &["commit", "-q", "-m", "feat: add initial readme"]);
    write(dir.path(), "README.md", "hello world\n");
    run_git(dir.path(), &["add", "."]);
    run_git(dir.path(), &["commit", "-q", "-m", "fix: typo in readme"]);

    let harness = harness();
    let stats = harness
        .git_indexer
        .index_git_history(dir.path(), "git_test", None, None)
        .await
        .unwrap();

    assert_eq!(stats.commits_scanned, 2);
    assert_eq!(stats.commits_indexed, 2);

    let embedded = harness.embedder.embed("typo fix").await.unwrap();
    let hits = harness
        .vector_store
        .search("git_test", &embedded.vector, 5, None)
        .await
        .unwrap();
    assert!(!hits.is_empty());

    let filter = GitIndexer::build_history_filter(&HistorySearchFilter {
        commit_types: vec![codectx::domain::CommitType::Fix],
        authors: Vec::new(),
        date_from: None,
        date_to: None,
    })
    .unwrap();
    let filtered_hits = harness
        .vector_store
        .search("git_test", &embedded.vector, 5, filter)
        .await
        .unwrap();
    assert!(filtered_hits.iter().all(|hit| hit.point.payload.get("commit_hash").is_some()));
}

#[tokio::test]
async fn test_index_new_commits_only_adds_commits_after_last_snapshot() {
    let dir = tempfile::tempdir().unwrap();
    run_git(dir.path(), &["init", "-q"]);
    write(dir.path(), "a.txt", "1\n");
    run_git(dir.path(), &["add", "."]);
    run_git(dir.path(), &["commit", "-q", "-m", "chore: first"]);

    let harness = harness();
    harness
        .git_indexer
        .index_git_history(dir.path(), "new_commits_test", None, None)
        .await
        .unwrap();

    write(dir.path(), "a.txt", "2\n");
    run_git(dir.path(), &["add", "."]);
    run_git(dir.path(), &["commit", "-q", "-m", "chore: second"]);

    let new_stats = harness.git_indexer.index_new_commits(dir.path(), "new_commits_test").await.unwrap();
    assert_eq!(new_stats.commits_added, 1);
}

#[tokio::test]
async fn test_federated_search_merges_results_across_repos_with_rrf() {
    let dir_a = tempfile::tempdir().unwrap();
    let dir_b = tempfile::tempdir().unwrap();
    write(
        dir_a.path(),
        "a.rs",
        "pub fn handle_login(user: &str) -> bool {\n    !user.is_empty()\n}\n",
    );
    write(dir_b.path(), "b.rs", "pub fn handle_logout(user: &str) {\n    println!(\"{user}\");\n}\n");

    let harness = harness();
    harness
        .code_indexer
        .index_codebase(dir_a.path(), "fed_a", &IndexOptions::default(), None, None)
        .await
        .unwrap();
    harness
        .code_indexer
        .index_codebase(dir_b.path(), "fed_b", &IndexOptions::default(), None, None)
        .await
        .unwrap();

    let retriever = Arc::new(harness.retriever);
    let paths = vec!["fed_a".to_string(), "fed_b".to_string()];
    let results = federate(&paths, SearchType::Code, 10, move |collection, result_type, leg_limit| {
        let retriever = retriever.clone();
        let collection = collection.to_string();
        assert_eq!(result_type, ResultType::Code);
        Box::pin(async move {
            let query = SearchQuery::new("user login or logout").with_limit(leg_limit);
            let hits = retriever.search(&collection, &query).await?;
            Ok(hits
                .into_iter()
                .filter_map(|hit| {
                    let chunk = serde_json::from_value(hit.point.payload).ok()?;
                    Some(SearchResult::new(RetrievedItem::Code(chunk), hit.score, collection.clone()))
                })
                .collect())
        })
    })
    .await
    .unwrap();

    assert!(!results.is_empty());
    let repos: std::collections::HashSet<_> = results.iter().map(|r| r.repo_path().to_string()).collect();
    assert_eq!(repos.len(), 2, "federated search should surface hits from both repos");
}

#[tokio::test]
async fn test_indexing_counts_every_scanned_file() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "empty.rs", "");
    write(dir.path(), "lib.rs", "pub fn ok() -> i32 {\n    42\n}\n");

    let harness = harness();
    let stats = harness
        .code_indexer
        .index_codebase(dir.path(), "skip_test", &IndexOptions::default(), None, None)
        .await
        .unwrap();

    assert_eq!(stats.files_scanned, 2);
    assert!(stats.chunks_created >= 1);
}
