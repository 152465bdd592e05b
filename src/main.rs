//! codectx CLI - indexes codebases and git history into vector collections
//! and exposes retrieval tool calls for LLM coding agents.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use rmcp::ServiceExt;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use codectx::cli::Commands;
use codectx::config::CoreConfig;
use codectx::connector::adapter::mcp::CodectxMcpServer;
use codectx::connector::api::Container;
use codectx::domain::{RetrievedItem, SearchQuery};

/// codectx - code and git-history indexing, chunking and retrieval
#[derive(Parser)]
#[command(name = "codectx")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = CoreConfig::from_env().context("invalid configuration")?;
    let container = Arc::new(Container::new(config));

    match cli.command {
        Commands::Index { path, force, extensions } => {
            let path = PathBuf::from(path);
            let collection = container.code_collection_name(&path).await?;
            let options = codectx::application::use_cases::IndexOptions {
                force_reindex: force,
                extensions,
                ignore_patterns: Vec::new(),
            };
            let stats = container
                .code_indexer()
                .index_codebase(&path, &collection, &options, None, None)
                .await?;
            println!(
                "Indexed {} ({} files, {} chunks, {:?})",
                collection, stats.files_indexed, stats.chunks_created, stats.status
            );
            if !stats.errors.is_empty() {
                println!("  {} file(s) skipped:", stats.errors.len());
                for err in &stats.errors {
                    println!("    {err}");
                }
            }
        }

        Commands::ReindexChanges { path } => {
            let path = PathBuf::from(path);
            let collection = container.code_collection_name(&path).await?;
            let options = codectx::application::use_cases::IndexOptions::default();
            let stats = container
                .code_indexer()
                .reindex_changes(&path, &collection, &options, None)
                .await?;
            println!(
                "Reindexed {}: +{} ~{} -{} files, {} chunks added",
                collection, stats.files_added, stats.files_modified, stats.files_deleted, stats.chunks_added
            );
        }

        Commands::Search {
            path,
            query,
            limit,
            min_score,
            language,
            path_pattern,
            hybrid,
        } => {
            let repo_path = PathBuf::from(&path);
            let collection = container.code_collection_name(&repo_path).await?;

            let mut search_query = SearchQuery::new(&query).with_limit(limit).with_hybrid(hybrid);
            if let Some(score) = min_score {
                search_query = search_query.with_min_score(score);
            }
            if let Some(langs) = language {
                search_query = search_query.with_languages(langs);
            }
            if let Some(pattern) = path_pattern {
                search_query = search_query.with_path_pattern(pattern);
            }

            let hits = container.retriever().search(&collection, &search_query).await?;
            if hits.is_empty() {
                println!("No results found.");
            } else {
                println!("Found {} results:\n", hits.len());
                for (i, hit) in hits.iter().enumerate() {
                    let name = hit.point.payload.get("name").and_then(|v| v.as_str()).unwrap_or("");
                    let relative_path =
                        hit.point.payload.get("relative_path").and_then(|v| v.as_str()).unwrap_or("?");
                    let start = hit.point.payload.get("start_line").and_then(|v| v.as_u64()).unwrap_or(0);
                    let end = hit.point.payload.get("end_line").and_then(|v| v.as_u64()).unwrap_or(0);
                    println!("{}. {}:{}-{} (score: {:.3})", i + 1, relative_path, start, end, hit.score);
                    if !name.is_empty() {
                        println!("   {name}");
                    }
                }
            }
        }

        Commands::Status { path } => {
            let repo_path = PathBuf::from(path);
            let collection = container.code_collection_name(&repo_path).await?;
            let status = container.code_indexer().get_index_status(&collection).await?;
            println!("{collection}: {:?}", status.status);
            if let Some(count) = status.chunks_count {
                println!("  chunks: {count}");
            }
            if let Some(updated) = status.last_updated {
                println!("  last updated: {updated}");
            }
        }

        Commands::Clear { path } => {
            let repo_path = PathBuf::from(path);
            let collection = container.code_collection_name(&repo_path).await?;
            container.code_indexer().clear_index(&collection).await?;
            println!("Cleared {collection}");
        }

        Commands::List => {
            let names = container.snapshot_store().list().await?;
            if names.is_empty() {
                println!("No collections indexed.");
            } else {
                for name in names {
                    println!("{name}");
                }
            }
        }

        Commands::IndexGit { path, max_commits } => {
            let repo_path = PathBuf::from(path);
            let collection = container.git_collection_name(&repo_path).await?;
            let stats = container
                .git_indexer()
                .index_git_history(&repo_path, &collection, max_commits, None)
                .await?;
            println!(
                "Indexed {} commits into {} ({} scanned)",
                stats.commits_indexed, collection, stats.commits_scanned
            );
        }

        Commands::IndexNewCommits { path } => {
            let repo_path = PathBuf::from(path);
            let collection = container.git_collection_name(&repo_path).await?;
            let stats = container.git_indexer().index_new_commits(&repo_path, &collection).await?;
            println!("Indexed {} new commits into {}", stats.commits_added, collection);
        }

        Commands::SearchGit {
            path,
            query,
            limit,
            commit_type,
            author,
            since,
            until,
        } => {
            let repo_path = PathBuf::from(&path);
            let collection = container.git_collection_name(&repo_path).await?;

            let history_filter = codectx::application::use_cases::HistorySearchFilter {
                commit_types: commit_type
                    .unwrap_or_default()
                    .iter()
                    .map(|s| parse_commit_type(s))
                    .collect(),
                authors: author.unwrap_or_default(),
                date_from: since,
                date_to: until,
            };
            let filter = codectx::application::use_cases::GitIndexer::build_history_filter(&history_filter)?;

            let embedded = container.embedder().embed(&query).await?;
            let hits = container
                .vector_store()
                .search(&collection, &embedded.vector, limit, filter)
                .await?;

            if hits.is_empty() {
                println!("No results found.");
            } else {
                println!("Found {} results:\n", hits.len());
                for (i, hit) in hits.iter().enumerate() {
                    let hash = hit.point.payload.get("commit_hash").and_then(|v| v.as_str()).unwrap_or("?");
                    let subject = hit.point.payload.get("content").and_then(|v| v.as_str()).unwrap_or("");
                    let subject = subject.lines().next().unwrap_or("");
                    println!("{}. {} (score: {:.3})", i + 1, hash, hit.score);
                    println!("   {subject}");
                }
            }
        }

        Commands::GitStatus { path } => {
            let repo_path = PathBuf::from(path);
            let collection = container.git_collection_name(&repo_path).await?;
            if !container.vector_store().collection_exists(&collection).await? {
                println!("{collection}: not indexed");
            } else {
                let info = container.vector_store().get_collection_info(&collection).await?;
                println!("{collection}: ready ({} commits)", info.points_count);
            }
        }

        Commands::ClearGit { path } => {
            let repo_path = PathBuf::from(path);
            let collection = container.git_collection_name(&repo_path).await?;
            container.vector_store().delete_collection(&collection).await?;
            container.snapshot_store().delete(&collection).await?;
            println!("Cleared {collection}");
        }

        Commands::FederatedSearch {
            paths,
            query,
            search_type,
            limit,
        } => {
            let search_type = match search_type.as_str() {
                "code" => codectx::application::use_cases::SearchType::Code,
                "git" => codectx::application::use_cases::SearchType::Git,
                _ => codectx::application::use_cases::SearchType::Both,
            };

            let container = container.clone();
            let results = codectx::application::use_cases::federate(&paths, search_type, limit, move |repo_path, result_type, leg_limit| {
                let container = container.clone();
                let query = query.clone();
                let repo_path = repo_path.to_string();
                Box::pin(async move {
                    let path = PathBuf::from(&repo_path);
                    let search_query = SearchQuery::new(&query).with_limit(leg_limit);
                    match result_type {
                        codectx::domain::ResultType::Code => {
                            let collection = container.code_collection_name(&path).await?;
                            let hits = container.retriever().search(&collection, &search_query).await?;
                            Ok(hits
                                .into_iter()
                                .filter_map(|hit| {
                                    let chunk = serde_json::from_value(hit.point.payload).ok()?;
                                    Some(codectx::domain::SearchResult::new(
                                        RetrievedItem::Code(chunk),
                                        hit.score,
                                        repo_path.clone(),
                                    ))
                                })
                                .collect())
                        }
                        codectx::domain::ResultType::Commit => {
                            let collection = container.git_collection_name(&path).await?;
                            let hits = container.retriever().search(&collection, &search_query).await?;
                            Ok(hits
                                .into_iter()
                                .filter_map(|hit| {
                                    let commit = serde_json::from_value(hit.point.payload).ok()?;
                                    Some(codectx::domain::SearchResult::new(
                                        RetrievedItem::Commit(commit),
                                        hit.score,
                                        repo_path.clone(),
                                    ))
                                })
                                .collect())
                        }
                    }
                })
            })
            .await?;

            if results.is_empty() {
                println!("No results found.");
            } else {
                for (i, result) in results.iter().enumerate() {
                    println!("{}. {} ({:?}, score: {:.3})", i + 1, result.repo_path(), result.result_type(), result.score());
                }
            }
        }

        Commands::Mcp { http, public } => {
            let server = CodectxMcpServer::new(container.clone());
            match http {
                Some(port) => {
                    let bind_addr = if public {
                        format!("0.0.0.0:{port}")
                    } else {
                        format!("127.0.0.1:{port}")
                    };
                    info!("starting MCP server on http://{bind_addr}");
                    serve_http(server, &bind_addr).await?;
                }
                None => {
                    info!("starting MCP server on stdio");
                    let transport = rmcp::transport::io::stdio();
                    server.serve(transport).await.context("failed to start MCP server")?.waiting().await?;
                }
            }
        }
    }

    Ok(())
}

fn parse_commit_type(s: &str) -> codectx::domain::CommitType {
    use codectx::domain::CommitType;
    match s {
        "feat" => CommitType::Feat,
        "fix" => CommitType::Fix,
        "refactor" => CommitType::Refactor,
        "docs" => CommitType::Docs,
        "test" => CommitType::Test,
        "chore" => CommitType::Chore,
        "style" => CommitType::Style,
        "perf" => CommitType::Perf,
        "build" => CommitType::Build,
        "ci" => CommitType::Ci,
        "revert" => CommitType::Revert,
        _ => CommitType::Other,
    }
}

async fn serve_http(server: CodectxMcpServer, bind_addr: &str) -> Result<()> {
    use rmcp::transport::streamable_http_server::session::local::LocalSessionManager;
    use rmcp::transport::streamable_http_server::StreamableHttpService;

    let service = StreamableHttpService::new(
        move || Ok(server.clone()),
        LocalSessionManager::default().into(),
        Default::default(),
    );
    let router = axum::Router::new().nest_service("/mcp", service);
    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    axum::serve(listener, router).await?;
    Ok(())
}
