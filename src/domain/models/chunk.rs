use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::Language;

/// The kind of code construct a chunk represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChunkKind {
    Function,
    Method,
    Class,
    Struct,
    Enum,
    Trait,
    Interface,
    Module,
    Constant,
    TypeDef,
    Block,
}

impl ChunkKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChunkKind::Function => "function",
            ChunkKind::Method => "method",
            ChunkKind::Class => "class",
            ChunkKind::Struct => "struct",
            ChunkKind::Enum => "enum",
            ChunkKind::Trait => "trait",
            ChunkKind::Interface => "interface",
            ChunkKind::Module => "module",
            ChunkKind::Constant => "constant",
            ChunkKind::TypeDef => "typedef",
            ChunkKind::Block => "block",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "function" => ChunkKind::Function,
            "method" => ChunkKind::Method,
            "class" => ChunkKind::Class,
            "struct" => ChunkKind::Struct,
            "enum" => ChunkKind::Enum,
            "trait" => ChunkKind::Trait,
            "interface" => ChunkKind::Interface,
            "module" => ChunkKind::Module,
            "constant" => ChunkKind::Constant,
            "typedef" => ChunkKind::TypeDef,
            _ => ChunkKind::Block,
        }
    }

    /// Declarations always represent at least one path through the code.
    pub fn has_complexity_floor(&self) -> bool {
        matches!(
            self,
            ChunkKind::Function | ChunkKind::Method | ChunkKind::Class | ChunkKind::Interface
        )
    }
}

impl std::fmt::Display for ChunkKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A unit of retrievable source code, produced by the chunker and enriched
/// by the metadata extractor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    id: String,
    content: String,
    start_line: u32,
    end_line: u32,
    kind: ChunkKind,
    name: Option<String>,
    language: Language,
    file_path: String,
    relative_path: String,
    file_extension: String,
    chunk_index: u32,
    complexity: u32,
}

impl Chunk {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        content: String,
        start_line: u32,
        end_line: u32,
        kind: ChunkKind,
        language: Language,
        file_path: String,
        relative_path: String,
        chunk_index: u32,
    ) -> Self {
        let file_extension = relative_path
            .rsplit('.')
            .next()
            .filter(|ext| *ext != relative_path)
            .unwrap_or("")
            .to_string();

        let id = compute_chunk_id(&relative_path, start_line, end_line, &content);

        Self {
            id,
            content,
            start_line,
            end_line,
            kind,
            name: None,
            language,
            file_path,
            relative_path,
            file_extension,
            chunk_index,
            complexity: 0,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_complexity(mut self, complexity: u32) -> Self {
        self.complexity = complexity;
        self
    }

    pub fn with_chunk_index(mut self, chunk_index: u32) -> Self {
        self.chunk_index = chunk_index;
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn start_line(&self) -> u32 {
        self.start_line
    }

    pub fn end_line(&self) -> u32 {
        self.end_line
    }

    pub fn kind(&self) -> ChunkKind {
        self.kind
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn language(&self) -> Language {
        self.language
    }

    pub fn file_path(&self) -> &str {
        &self.file_path
    }

    pub fn relative_path(&self) -> &str {
        &self.relative_path
    }

    pub fn file_extension(&self) -> &str {
        &self.file_extension
    }

    pub fn chunk_index(&self) -> u32 {
        self.chunk_index
    }

    pub fn complexity(&self) -> u32 {
        self.complexity
    }

    pub fn line_count(&self) -> u32 {
        self.end_line.saturating_sub(self.start_line) + 1
    }

    pub fn location(&self) -> String {
        format!("{}:{}-{}", self.relative_path, self.start_line, self.end_line)
    }

    pub fn preview(&self, max_lines: usize) -> String {
        self.content
            .lines()
            .take(max_lines)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// `"chunk_" + hex16(SHA256(path:start:end:content))`.
pub fn compute_chunk_id(path: &str, start: u32, end: u32, content: &str) -> String {
    let material = format!("{}:{}:{}:{}", path, start, end, content);
    let digest = Sha256::digest(material.as_bytes());
    format!("chunk_{}", hex16(&digest))
}

pub(crate) fn hex16(digest: &[u8]) -> String {
    digest[..8].iter().map(|b| format!("{:02x}", b)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_chunk() -> Chunk {
        Chunk::new(
            "fn add(a: i32, b: i32) -> i32 { a + b }".to_string(),
            10,
            12,
            ChunkKind::Function,
            Language::Rust,
            "/repo/src/lib.rs".to_string(),
            "src/lib.rs".to_string(),
            0,
        )
        .with_name("add")
    }

    #[test]
    fn test_chunk_creation() {
        let chunk = sample_chunk();
        assert_eq!(chunk.relative_path(), "src/lib.rs");
        assert_eq!(chunk.name(), Some("add"));
        assert_eq!(chunk.line_count(), 3);
        assert_eq!(chunk.file_extension(), "rs");
    }

    #[test]
    fn test_chunk_id_deterministic() {
        let a = sample_chunk();
        let b = sample_chunk();
        assert_eq!(a.id(), b.id());
        assert!(a.id().starts_with("chunk_"));
        assert_eq!(a.id().len(), "chunk_".len() + 16);
    }

    #[test]
    fn test_chunk_id_changes_with_content() {
        let a = compute_chunk_id("f.rs", 1, 2, "a");
        let b = compute_chunk_id("f.rs", 1, 2, "b");
        assert_ne!(a, b);
    }

    #[test]
    fn test_location_format() {
        let chunk = sample_chunk();
        assert_eq!(chunk.location(), "src/lib.rs:10-12");
    }

    #[test]
    fn test_complexity_floor_kinds() {
        assert!(ChunkKind::Function.has_complexity_floor());
        assert!(ChunkKind::Method.has_complexity_floor());
        assert!(ChunkKind::Class.has_complexity_floor());
        assert!(ChunkKind::Interface.has_complexity_floor());
        assert!(!ChunkKind::Block.has_complexity_floor());
    }
}
