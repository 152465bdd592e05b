use crate::domain::{Chunk, ChunkKind, CoreError, Language};

/// Syntax-aware splitting strategy for one language. Implementations live in
/// the connector layer (tree-sitter); this trait keeps the orchestration
/// here free of a parser dependency.
pub trait SyntaxChunker: Send + Sync {
    fn supports(&self, language: Language) -> bool;

    /// Parses `content` into one chunk per function/method/class/interface
    /// definition. A parse failure returns `Err`, and the caller falls back
    /// to the character strategy for the whole file.
    fn chunk(
        &self,
        content: &str,
        file_path: &str,
        relative_path: &str,
        language: Language,
    ) -> Result<Vec<Chunk>, CoreError>;
}

#[derive(Debug, Clone)]
pub struct ChunkingConfig {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub min_chunk_chars: usize,
    pub max_chunks_per_file: Option<usize>,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1500,
            chunk_overlap: 200,
            min_chunk_chars: 20,
            max_chunks_per_file: None,
        }
    }
}

/// Splits `content` using the syntax-aware chunker when available, falling
/// back to the character-window splitter for unrecognized languages, parse
/// failures, and any syntax chunk that exceeds `config.chunk_size`.
pub fn chunk_file(
    syntax: Option<&dyn SyntaxChunker>,
    content: &str,
    file_path: &str,
    relative_path: &str,
    language: Language,
    config: &ChunkingConfig,
) -> Vec<Chunk> {
    let syntax_chunks = syntax
        .filter(|s| s.supports(language))
        .and_then(|s| s.chunk(content, file_path, relative_path, language).ok());

    let mut chunks = match syntax_chunks {
        Some(chunks) if !chunks.is_empty() => {
            let mut out = Vec::with_capacity(chunks.len());
            for chunk in chunks {
                if chunk.content().len() > config.chunk_size {
                    out.extend(split_oversized(&chunk, config));
                } else {
                    out.push(chunk);
                }
            }
            out
        }
        _ => fallback_chunk(content, file_path, relative_path, language, config),
    };

    chunks.retain(|c| c.content().chars().count() >= config.min_chunk_chars);

    chunks = chunks
        .into_iter()
        .enumerate()
        .map(|(index, chunk)| chunk.with_chunk_index(index as u32))
        .collect();

    if let Some(max) = config.max_chunks_per_file {
        chunks.truncate(max);
    }

    chunks
}

fn split_oversized(chunk: &Chunk, config: &ChunkingConfig) -> Vec<Chunk> {
    fallback_chunk(
        chunk.content(),
        chunk.file_path(),
        chunk.relative_path(),
        chunk.language(),
        config,
    )
    .into_iter()
    .map(|c| {
        let offset = chunk.start_line().saturating_sub(1);
        Chunk::new(
            c.content().to_string(),
            c.start_line() + offset,
            c.end_line() + offset,
            chunk.kind(),
            chunk.language(),
            chunk.file_path().to_string(),
            chunk.relative_path().to_string(),
            0,
        )
    })
    .collect()
}

const BREAK_SEARCH_FRACTION: f64 = 0.2;

/// Sliding character window with overlap. Before emitting a chunk, searches
/// backward from the nominal end for a break point — blank line, line
/// terminator, sentence terminator, word boundary, in that preference order
/// — within `BREAK_SEARCH_FRACTION` of `chunk_size`.
fn fallback_chunk(
    content: &str,
    file_path: &str,
    relative_path: &str,
    language: Language,
    config: &ChunkingConfig,
) -> Vec<Chunk> {
    if content.is_empty() {
        return Vec::new();
    }

    let bytes = content.as_bytes();
    let len = bytes.len();
    let look_back = ((config.chunk_size as f64) * BREAK_SEARCH_FRACTION) as usize;

    let mut chunks = Vec::new();
    let mut start = 0usize;

    while start < len {
        let nominal_end = (start + config.chunk_size).min(len);
        let end = if nominal_end >= len {
            len
        } else {
            find_break_point(content, start, nominal_end, look_back)
        };

        let slice = &content[start..end];
        if !slice.trim().is_empty() {
            let start_line = 1 + content[..start].matches('\n').count() as u32;
            let end_line = 1 + content[..end].matches('\n').count() as u32;
            chunks.push(Chunk::new(
                slice.to_string(),
                start_line,
                end_line,
                ChunkKind::Block,
                language,
                file_path.to_string(),
                relative_path.to_string(),
                0,
            ));
        }

        if end >= len {
            break;
        }
        start = end.saturating_sub(config.chunk_overlap);
        if start >= end {
            start = end;
        }
    }

    chunks
}

fn find_break_point(content: &str, start: usize, nominal_end: usize, look_back: usize) -> usize {
    let window_start = nominal_end.saturating_sub(look_back).max(start);
    let window = &content[window_start..nominal_end];

    if let Some(pos) = window.rfind("\n\n") {
        return window_start + pos + 2;
    }
    if let Some(pos) = window.rfind('\n') {
        return window_start + pos + 1;
    }
    if let Some(pos) = window.rfind(['.', '!', '?']) {
        return window_start + pos + 1;
    }
    if let Some(pos) = window.rfind(char::is_whitespace) {
        return window_start + pos + 1;
    }
    nominal_end
}
