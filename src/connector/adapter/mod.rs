mod fs_snapshot_store;
mod in_memory_vector_store;
pub mod mcp;
mod mock_embedder;
mod process_git_extractor;
mod treesitter_chunker;

pub use fs_snapshot_store::*;
pub use in_memory_vector_store::*;
pub use mock_embedder::*;
pub use process_git_extractor::*;
pub use treesitter_chunker::*;
