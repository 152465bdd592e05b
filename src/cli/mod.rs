use clap::Subcommand;

#[derive(Subcommand)]
pub enum Commands {
    /// Index (or full-reindex) a codebase's files into its collection
    Index {
        path: String,

        /// Force a full reindex, discarding the cached snapshot
        #[arg(short, long)]
        force: bool,

        /// Restrict indexing to these file extensions (e.g. rs, py)
        #[arg(short, long)]
        extensions: Option<Vec<String>>,
    },

    /// Incrementally reindex a codebase against its last snapshot
    ReindexChanges {
        path: String,
    },

    /// Semantic search over an indexed codebase
    Search {
        path: String,
        query: String,

        #[arg(long, default_value = "10")]
        limit: usize,

        #[arg(short, long)]
        min_score: Option<f32>,

        #[arg(short = 'L', long)]
        language: Option<Vec<String>>,

        #[arg(short, long)]
        path_pattern: Option<String>,

        /// Use hybrid (dense + sparse) search instead of dense-only
        #[arg(long)]
        hybrid: bool,
    },

    /// Show a codebase's index status
    Status {
        path: String,
    },

    /// Delete a codebase's collection and snapshot
    Clear {
        path: String,
    },

    /// List every collection with a persisted snapshot
    List,

    /// Index a repository's git commit history
    IndexGit {
        path: String,

        #[arg(long)]
        max_commits: Option<u32>,
    },

    /// Index only commits newer than the last git index run
    IndexNewCommits {
        path: String,
    },

    /// Search a repository's indexed git history
    SearchGit {
        path: String,
        query: String,

        #[arg(long, default_value = "10")]
        limit: usize,

        #[arg(long)]
        commit_type: Option<Vec<String>>,

        #[arg(long)]
        author: Option<Vec<String>>,

        #[arg(long)]
        since: Option<String>,

        #[arg(long)]
        until: Option<String>,
    },

    /// Show a repository's git-history index status
    GitStatus {
        path: String,
    },

    /// Delete a repository's git-history collection and snapshot
    ClearGit {
        path: String,
    },

    /// Search code and/or git history across multiple repositories at once
    FederatedSearch {
        /// Repository paths to search, comma-separated
        #[arg(value_delimiter = ',')]
        paths: Vec<String>,

        query: String,

        #[arg(long, default_value = "both")]
        search_type: String,

        #[arg(long, default_value = "10")]
        limit: usize,
    },

    /// Start the MCP (Model Context Protocol) server for integration with AI tools
    Mcp {
        /// Run as HTTP server on the given port instead of stdio
        #[arg(long)]
        http: Option<u16>,

        /// Bind to 0.0.0.0 instead of 127.0.0.1, exposing the server on all network interfaces
        #[arg(long)]
        public: bool,
    },
}
