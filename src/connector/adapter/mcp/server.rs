use std::path::PathBuf;
use std::sync::Arc;

use rmcp::handler::server::tool::ToolRouter;
use rmcp::handler::server::wrapper::Parameters;
use rmcp::model::{
    CallToolResult, Content, Implementation, ProtocolVersion, ServerCapabilities, ServerInfo,
};
use rmcp::tool;
use rmcp::tool_handler;
use rmcp::tool_router;
use rmcp::ErrorData as McpError;
use rmcp::ServerHandler;

use crate::application::interfaces::{CollectionInfo, Distance, Hit};
use crate::application::use_cases::{
    ChangeStats, GitIndexStats, HistorySearchFilter, IndexOptions, IndexStats, IndexStatus,
    NewCommitStats, SearchType,
};
use crate::connector::api::Container;
use crate::domain::{CommitChunk, CommitType, CoreError, RetrievedItem, SearchQuery, SearchResult};

use super::tools::*;

/// Server-side maximum for the number of results a single search can return.
const MAX_LIMIT: usize = 100;

fn ok_json<T: serde::Serialize>(value: &T) -> Result<CallToolResult, McpError> {
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| McpError::internal_error(format!("failed to serialize result: {e}"), None))?;
    Ok(CallToolResult::success(vec![Content::text(json)]))
}

fn to_mcp_err(e: CoreError) -> McpError {
    McpError::internal_error(e.to_string(), None)
}

fn parse_commit_type(s: &str) -> CommitType {
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

fn hit_to_code_result(hit: Hit, repo_path: &str) -> Option<SearchResult> {
    let chunk = serde_json::from_value(hit.point.payload).ok()?;
    Some(SearchResult::new(RetrievedItem::Code(chunk), hit.score, repo_path))
}

fn hit_to_commit_result(hit: Hit, repo_path: &str) -> Option<SearchResult> {
    let commit: CommitChunk = serde_json::from_value(hit.point.payload).ok()?;
    Some(SearchResult::new(RetrievedItem::Commit(commit), hit.score, repo_path))
}

/// MCP server exposing code and git-history indexing and search.
#[derive(Clone)]
pub struct CodectxMcpServer {
    container: Arc<Container>,
    tool_router: ToolRouter<Self>,
}

#[tool_router]
impl CodectxMcpServer {
    pub fn new(container: Arc<Container>) -> Self {
        Self {
            container,
            tool_router: Self::tool_router(),
        }
    }

    // --- Collection management -------------------------------------------

    /// Creates a vector collection directly, for callers managing their own
    /// document ids and vectors instead of going through `index_codebase`.
    #[tool(name = "create_collection")]
    async fn create_collection(
        &self,
        params: Parameters<CreateCollectionInput>,
    ) -> Result<CallToolResult, McpError> {
        let input = params.0;
        self.container
            .vector_store()
            .create_collection(&input.name, input.vector_size, Distance::Cosine, input.enable_hybrid)
            .await
            .map_err(to_mcp_err)?;
        ok_json(&serde_json::json!({ "created": input.name }))
    }

    /// Lists every collection with a persisted snapshot.
    #[tool(name = "list_collections")]
    async fn list_collections(&self) -> Result<CallToolResult, McpError> {
        let names = self.container.snapshot_store().list().await.map_err(to_mcp_err)?;
        ok_json(&names)
    }

    #[tool(name = "get_collection_info")]
    async fn get_collection_info(
        &self,
        params: Parameters<CollectionNameInput>,
    ) -> Result<CallToolResult, McpError> {
        let info: CollectionInfo = self
            .container
            .vector_store()
            .get_collection_info(&params.0.name)
            .await
            .map_err(to_mcp_err)?;
        ok_json(&CollectionInfoOutput {
            points_count: info.points_count,
            vector_size: info.vector_size,
            hybrid_enabled: info.hybrid_enabled,
            distance: format!("{:?}", info.distance).to_lowercase(),
        })
    }

    #[tool(name = "delete_collection")]
    async fn delete_collection(
        &self,
        params: Parameters<CollectionNameInput>,
    ) -> Result<CallToolResult, McpError> {
        self.container
            .vector_store()
            .delete_collection(&params.0.name)
            .await
            .map_err(to_mcp_err)?;
        self.container.snapshot_store().delete(&params.0.name).await.map_err(to_mcp_err)?;
        ok_json(&serde_json::json!({ "deleted": params.0.name }))
    }

    /// Upserts raw `(id, vector, payload)` documents into a collection.
    #[tool(name = "add_documents")]
    async fn add_documents(
        &self,
        params: Parameters<AddDocumentsInput>,
    ) -> Result<CallToolResult, McpError> {
        let input = params.0;
        let points = input
            .documents
            .into_iter()
            .map(|doc| crate::domain::Point::new(doc.id, doc.vector, doc.payload))
            .collect();
        self.container
            .vector_store()
            .upsert(&input.collection, points)
            .await
            .map_err(to_mcp_err)?;
        ok_json(&serde_json::json!({ "upserted": true }))
    }

    #[tool(name = "delete_documents")]
    async fn delete_documents(
        &self,
        params: Parameters<DeleteDocumentsInput>,
    ) -> Result<CallToolResult, McpError> {
        let input = params.0;
        self.container
            .vector_store()
            .delete_points(&input.collection, &input.ids)
            .await
            .map_err(to_mcp_err)?;
        ok_json(&serde_json::json!({ "deleted": input.ids.len() }))
    }

    // --- Raw vector search --------------------------------------------------

    /// Dense-vector search against a collection, bypassing embedding —
    /// callers supply the query vector themselves.
    #[tool(name = "semantic_search")]
    async fn semantic_search(
        &self,
        params: Parameters<VectorSearchInput>,
    ) -> Result<CallToolResult, McpError> {
        let input = params.0;
        let hits = self
            .container
            .vector_store()
            .search(&input.collection, &input.vector, input.limit.min(MAX_LIMIT), None)
            .await
            .map_err(to_mcp_err)?;
        let outputs: Vec<SearchHitOutput> = hits
            .into_iter()
            .filter_map(|hit| hit_to_code_result(hit, &input.collection))
            .map(|r| SearchHitOutput::from(&r))
            .collect();
        ok_json(&outputs)
    }

    #[tool(name = "hybrid_search")]
    async fn hybrid_search(
        &self,
        params: Parameters<HybridVectorSearchInput>,
    ) -> Result<CallToolResult, McpError> {
        let input = params.0;
        let sparse = crate::domain::SparseVector::new(input.sparse_indices, input.sparse_values);
        let hits = self
            .container
            .vector_store()
            .hybrid_search(&input.collection, &input.vector, &sparse, input.limit.min(MAX_LIMIT), None)
            .await
            .map_err(to_mcp_err)?;
        let outputs: Vec<SearchHitOutput> = hits
            .into_iter()
            .filter_map(|hit| hit_to_code_result(hit, &input.collection))
            .map(|r| SearchHitOutput::from(&r))
            .collect();
        ok_json(&outputs)
    }

    // --- Code indexing -------------------------------------------------------

    #[tool(name = "index_codebase")]
    async fn index_codebase(
        &self,
        params: Parameters<IndexCodebaseInput>,
    ) -> Result<CallToolResult, McpError> {
        let input = params.0;
        let path = PathBuf::from(&input.path);
        let collection = self.container.code_collection_name(&path).await.map_err(to_mcp_err)?;
        let options = IndexOptions {
            force_reindex: input.force_reindex,
            extensions: input.extensions,
            ignore_patterns: input.ignore_patterns,
        };
        let stats: IndexStats = self
            .container
            .code_indexer()
            .index_codebase(&path, &collection, &options, None, None)
            .await
            .map_err(to_mcp_err)?;
        ok_json(&stats)
    }

    #[tool(name = "reindex_changes")]
    async fn reindex_changes(
        &self,
        params: Parameters<IndexCodebaseInput>,
    ) -> Result<CallToolResult, McpError> {
        let input = params.0;
        let path = PathBuf::from(&input.path);
        let collection = self.container.code_collection_name(&path).await.map_err(to_mcp_err)?;
        let options = IndexOptions {
            force_reindex: input.force_reindex,
            extensions: input.extensions,
            ignore_patterns: input.ignore_patterns,
        };
        let stats: ChangeStats = self
            .container
            .code_indexer()
            .reindex_changes(&path, &collection, &options, None)
            .await
            .map_err(to_mcp_err)?;
        ok_json(&stats)
    }

    /// Semantic search over an indexed codebase, identified by its path.
    #[tool(name = "search_code")]
    async fn search_code(&self, params: Parameters<CodeSearchInput>) -> Result<CallToolResult, McpError> {
        let input = params.0;
        let path = PathBuf::from(&input.path);
        let collection = self.container.code_collection_name(&path).await.map_err(to_mcp_err)?;

        let mut query = SearchQuery::new(&input.query).with_limit(input.limit.min(MAX_LIMIT));
        if let Some(score) = input.min_score {
            query = query.with_min_score(score);
        }
        if let Some(langs) = input.languages {
            query = query.with_languages(langs);
        }
        if let Some(pattern) = input.path_pattern {
            query = query.with_path_pattern(pattern);
        }
        query = query.with_hybrid(input.use_hybrid);

        let hits = self.container.retriever().search(&collection, &query).await.map_err(to_mcp_err)?;
        let outputs: Vec<SearchHitOutput> = hits
            .into_iter()
            .filter_map(|hit| hit_to_code_result(hit, &input.path))
            .map(|r| SearchHitOutput::from(&r))
            .collect();
        ok_json(&outputs)
    }

    #[tool(name = "get_index_status")]
    async fn get_index_status(&self, params: Parameters<PathInput>) -> Result<CallToolResult, McpError> {
        let path = PathBuf::from(&params.0.path);
        let collection = self.container.code_collection_name(&path).await.map_err(to_mcp_err)?;
        let status: IndexStatus = self
            .container
            .code_indexer()
            .get_index_status(&collection)
            .await
            .map_err(to_mcp_err)?;
        ok_json(&status)
    }

    #[tool(name = "clear_index")]
    async fn clear_index(&self, params: Parameters<PathInput>) -> Result<CallToolResult, McpError> {
        let path = PathBuf::from(&params.0.path);
        let collection = self.container.code_collection_name(&path).await.map_err(to_mcp_err)?;
        self.container.code_indexer().clear_index(&collection).await.map_err(to_mcp_err)?;
        ok_json(&serde_json::json!({ "cleared": collection }))
    }

    // --- Git history indexing ------------------------------------------------

    #[tool(name = "index_git_history")]
    async fn index_git_history(
        &self,
        params: Parameters<IndexGitHistoryInput>,
    ) -> Result<CallToolResult, McpError> {
        let input = params.0;
        let path = PathBuf::from(&input.path);
        let collection = self.container.git_collection_name(&path).await.map_err(to_mcp_err)?;
        let stats: GitIndexStats = self
            .container
            .git_indexer()
            .index_git_history(&path, &collection, input.max_commits, None)
            .await
            .map_err(to_mcp_err)?;
        ok_json(&stats)
    }

    #[tool(name = "search_git_history")]
    async fn search_git_history(
        &self,
        params: Parameters<SearchGitHistoryInput>,
    ) -> Result<CallToolResult, McpError> {
        let input = params.0;
        let path = PathBuf::from(&input.path);
        let collection = self.container.git_collection_name(&path).await.map_err(to_mcp_err)?;

        let history_filter = HistorySearchFilter {
            commit_types: input
                .commit_types
                .unwrap_or_default()
                .iter()
                .map(|s| parse_commit_type(s))
                .collect(),
            authors: input.authors.unwrap_or_default(),
            date_from: input.date_from,
            date_to: input.date_to,
        };
        let filter =
            crate::application::use_cases::GitIndexer::build_history_filter(&history_filter).map_err(to_mcp_err)?;

        let embedder = self.container.embedder();
        let embedded = embedder.embed(&input.query).await.map_err(to_mcp_err)?;
        let hits = self
            .container
            .vector_store()
            .search(&collection, &embedded.vector, input.limit.min(MAX_LIMIT), filter)
            .await
            .map_err(to_mcp_err)?;

        let outputs: Vec<SearchHitOutput> = hits
            .into_iter()
            .filter_map(|hit| hit_to_commit_result(hit, &input.path))
            .map(|r| SearchHitOutput::from(&r))
            .collect();
        ok_json(&outputs)
    }

    #[tool(name = "index_new_commits")]
    async fn index_new_commits(&self, params: Parameters<PathInput>) -> Result<CallToolResult, McpError> {
        let path = PathBuf::from(&params.0.path);
        let collection = self.container.git_collection_name(&path).await.map_err(to_mcp_err)?;
        let stats: NewCommitStats = self
            .container
            .git_indexer()
            .index_new_commits(&path, &collection)
            .await
            .map_err(to_mcp_err)?;
        ok_json(&stats)
    }

    #[tool(name = "get_git_index_status")]
    async fn get_git_index_status(&self, params: Parameters<PathInput>) -> Result<CallToolResult, McpError> {
        let path = PathBuf::from(&params.0.path);
        let collection = self.container.git_collection_name(&path).await.map_err(to_mcp_err)?;

        if !self
            .container
            .vector_store()
            .collection_exists(&collection)
            .await
            .map_err(to_mcp_err)?
        {
            return ok_json(&serde_json::json!({ "status": "not_indexed" }));
        }
        let info = self
            .container
            .vector_store()
            .get_collection_info(&collection)
            .await
            .map_err(to_mcp_err)?;
        let snapshot = self.container.snapshot_store().load(&collection).await.map_err(to_mcp_err)?;
        ok_json(&serde_json::json!({
            "status": "ready",
            "commits_count": info.points_count,
            "last_updated": snapshot.map(|s| s.timestamp),
        }))
    }

    #[tool(name = "clear_git_index")]
    async fn clear_git_index(&self, params: Parameters<PathInput>) -> Result<CallToolResult, McpError> {
        let path = PathBuf::from(&params.0.path);
        let collection = self.container.git_collection_name(&path).await.map_err(to_mcp_err)?;
        self.container.vector_store().delete_collection(&collection).await.map_err(to_mcp_err)?;
        self.container.snapshot_store().delete(&collection).await.map_err(to_mcp_err)?;
        ok_json(&serde_json::json!({ "cleared": collection }))
    }

    // --- Cross-cutting search ------------------------------------------------

    /// Semantic search scoped to one file or directory prefix within an
    /// already-indexed codebase — the query's surrounding context.
    #[tool(name = "contextual_search")]
    async fn contextual_search(
        &self,
        params: Parameters<ContextualSearchInput>,
    ) -> Result<CallToolResult, McpError> {
        let input = params.0;
        let path = PathBuf::from(&input.path);
        let collection = self.container.code_collection_name(&path).await.map_err(to_mcp_err)?;

        let query = SearchQuery::new(&input.query)
            .with_limit(input.limit.min(MAX_LIMIT))
            .with_path_pattern(input.context_path.clone());

        let hits = self.container.retriever().search(&collection, &query).await.map_err(to_mcp_err)?;
        let outputs: Vec<SearchHitOutput> = hits
            .into_iter()
            .filter_map(|hit| hit_to_code_result(hit, &input.path))
            .map(|r| SearchHitOutput::from(&r))
            .collect();
        ok_json(&outputs)
    }

    /// Searches code and/or git history across multiple repositories at
    /// once, fusing per-repo rankings with reciprocal rank fusion.
    #[tool(name = "federated_search")]
    async fn federated_search(
        &self,
        params: Parameters<FederatedSearchInput>,
    ) -> Result<CallToolResult, McpError> {
        let input = params.0;
        let search_type = match input.search_type.as_str() {
            "code" => SearchType::Code,
            "git" => SearchType::Git,
            _ => SearchType::Both,
        };

        let container = self.container.clone();
        let query_text = input.query.clone();
        let results = crate::application::use_cases::federate(
            &input.paths,
            search_type,
            input.limit.min(MAX_LIMIT),
            move |repo_path, result_type, leg_limit| {
                let container = container.clone();
                let query_text = query_text.clone();
                let repo_path = repo_path.to_string();
                Box::pin(async move {
                    let path = PathBuf::from(&repo_path);
                    let query = SearchQuery::new(&query_text).with_limit(leg_limit);
                    match result_type {
                        crate::domain::ResultType::Code => {
                            let collection = container.code_collection_name(&path).await?;
                            let hits = container.retriever().search(&collection, &query).await?;
                            Ok(hits.into_iter().filter_map(|h| hit_to_code_result(h, &repo_path)).collect())
                        }
                        crate::domain::ResultType::Commit => {
                            let collection = container.git_collection_name(&path).await?;
                            let hits = container.retriever().search(&collection, &query).await?;
                            Ok(hits.into_iter().filter_map(|h| hit_to_commit_result(h, &repo_path)).collect())
                        }
                    }
                })
            },
        )
        .await
        .map_err(to_mcp_err)?;

        let outputs: Vec<SearchHitOutput> = results.iter().map(SearchHitOutput::from).collect();
        ok_json(&outputs)
    }
}

#[tool_handler]
impl ServerHandler for CodectxMcpServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2024_11_05,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation::from_build_env(),
            instructions: Some(
                "Indexes codebases and git history into vector collections and exposes semantic, \
                 hybrid, contextual, and federated search over them. Index a path with \
                 index_codebase / index_git_history before searching it."
                    .into(),
            ),
        }
    }
}
