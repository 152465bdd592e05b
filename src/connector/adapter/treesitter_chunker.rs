use std::sync::OnceLock;

use streaming_iterator::StreamingIterator;
use tree_sitter::{Language as TsLanguage, Parser, Query, QueryCursor};

use crate::application::use_cases::SyntaxChunker;
use crate::domain::{Chunk, ChunkKind, CoreError, Language};

/// Minimum byte length a matched node's trimmed text must reach to become its
/// own chunk; shorter matches (forward declarations, one-line getters) are
/// noise that the caller's fallback window would cover better anyway.
const MIN_NODE_CHARS: usize = 10;

fn get_ts_language(language: Language) -> Option<TsLanguage> {
    match language {
        Language::Rust => Some(tree_sitter_rust::LANGUAGE.into()),
        Language::Python => Some(tree_sitter_python::LANGUAGE.into()),
        Language::JavaScript => Some(tree_sitter_javascript::LANGUAGE.into()),
        Language::TypeScript => Some(tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into()),
        Language::Go => Some(tree_sitter_go::LANGUAGE.into()),
        Language::Java => Some(tree_sitter_java::LANGUAGE.into()),
        Language::C => Some(tree_sitter_c::LANGUAGE.into()),
        Language::Cpp => Some(tree_sitter_cpp::LANGUAGE.into()),
        Language::Unknown => None,
    }
}

fn get_query_patterns(language: Language) -> &'static str {
    match language {
        Language::Rust => {
            r#"
            (function_item name: (identifier) @name) @function
            (impl_item) @block
            (struct_item name: (type_identifier) @name) @struct
            (enum_item name: (type_identifier) @name) @enum
            (trait_item name: (type_identifier) @name) @trait
            (mod_item name: (identifier) @name) @module
            (const_item name: (identifier) @name) @constant
            (static_item name: (identifier) @name) @constant
            (type_item name: (type_identifier) @name) @typedef
            "#
        }
        Language::Python => {
            r#"
            (function_definition name: (identifier) @name) @function
            (class_definition name: (identifier) @name) @class
            "#
        }
        Language::JavaScript => {
            r#"
            (function_declaration name: (identifier) @name) @function
            (class_declaration name: (identifier) @name) @class
            (method_definition name: (property_identifier) @name) @method
            "#
        }
        Language::TypeScript => {
            r#"
            (function_declaration name: (identifier) @name) @function
            (class_declaration name: (identifier) @name) @class
            (method_definition name: (property_identifier) @name) @method
            (interface_declaration name: (type_identifier) @name) @interface
            (type_alias_declaration name: (type_identifier) @name) @typedef
            "#
        }
        Language::Go => {
            r#"
            (function_declaration name: (identifier) @name) @function
            (method_declaration name: (field_identifier) @name) @method
            (type_declaration (type_spec name: (type_identifier) @name)) @typedef
            "#
        }
        Language::Java => {
            r#"
            (class_declaration name: (identifier) @name) @class
            (interface_declaration name: (identifier) @name) @interface
            (enum_declaration name: (identifier) @name) @enum
            (method_declaration name: (identifier) @name) @method
            (constructor_declaration name: (identifier) @name) @method
            "#
        }
        Language::C => {
            r#"
            (function_definition declarator: (function_declarator declarator: (identifier) @name)) @function
            (struct_specifier name: (type_identifier) @name) @struct
            (enum_specifier name: (type_identifier) @name) @enum
            (type_definition declarator: (type_identifier) @name) @typedef
            "#
        }
        Language::Cpp => {
            r#"
            (function_definition declarator: (function_declarator declarator: (identifier) @name)) @function
            (function_definition declarator: (function_declarator declarator: (field_identifier) @name)) @method
            (class_specifier name: (type_identifier) @name) @class
            (struct_specifier name: (type_identifier) @name) @struct
            (union_specifier name: (type_identifier) @name) @struct
            (enum_specifier name: (type_identifier) @name) @enum
            (namespace_definition name: (identifier) @name) @module
            (alias_declaration name: (type_identifier) @name) @typedef
            "#
        }
        Language::Unknown => "",
    }
}

fn capture_to_chunk_kind(capture_name: &str) -> ChunkKind {
    match capture_name {
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

fn query_for(language: Language) -> Option<&'static Query> {
    static CACHE: OnceLock<std::sync::Mutex<std::collections::HashMap<Language, &'static Query>>> = OnceLock::new();
    let cache = CACHE.get_or_init(|| std::sync::Mutex::new(std::collections::HashMap::new()));
    let mut guard = cache.lock().expect("query cache lock poisoned");
    if let Some(query) = guard.get(&language) {
        return Some(*query);
    }
    let ts_language = get_ts_language(language)?;
    let patterns = get_query_patterns(language);
    let query = Query::new(&ts_language, patterns).ok()?;
    let leaked: &'static Query = Box::leak(Box::new(query));
    guard.insert(language, leaked);
    Some(leaked)
}

/// Chunks source files along syntactic boundaries (functions, classes,
/// types, ...) using tree-sitter, one grammar per supported language. Each
/// matched definition becomes a chunk named after its declared identifier;
/// anything the grammar's query doesn't capture is left for the caller's
/// sliding-window fallback to pick up.
#[derive(Default)]
pub struct TreeSitterChunker;

impl TreeSitterChunker {
    pub fn new() -> Self {
        Self
    }
}

impl SyntaxChunker for TreeSitterChunker {
    fn supports(&self, language: Language) -> bool {
        get_ts_language(language).is_some()
    }

    fn chunk(
        &self,
        content: &str,
        file_path: &str,
        relative_path: &str,
        language: Language,
    ) -> Result<Vec<Chunk>, CoreError> {
        let ts_language = get_ts_language(language)
            .ok_or_else(|| CoreError::parse(format!("no tree-sitter grammar for {}", language.as_str())))?;
        let query = query_for(language)
            .ok_or_else(|| CoreError::parse(format!("failed to compile query for {}", language.as_str())))?;

        let mut parser = Parser::new();
        parser
            .set_language(&ts_language)
            .map_err(|e| CoreError::parse(format!("failed to set tree-sitter language: {e}")))?;

        let tree = parser
            .parse(content, None)
            .ok_or_else(|| CoreError::parse("tree-sitter failed to parse file".to_string()))?;

        let capture_names: Vec<&str> = query.capture_names().to_vec();

        let mut cursor = QueryCursor::new();
        let bytes = content.as_bytes();
        let mut matches = cursor.matches(query, tree.root_node(), bytes);

        let mut chunks = Vec::new();
        let mut chunk_index = 0u32;

        while let Some(m) = matches.next() {
            let mut node_text: Option<(usize, usize, &str)> = None;
            let mut name_text: Option<String> = None;

            for capture in m.captures {
                let capture_name = capture_names[capture.index as usize];
                let text = capture.node.utf8_text(bytes).unwrap_or("");

                if capture_name == "name" {
                    name_text = Some(text.to_string());
                } else {
                    node_text = Some((capture.node.start_byte(), capture.node.end_byte(), capture_name));
                }
            }

            let Some((start_byte, end_byte, capture_name)) = node_text else {
                continue;
            };

            let node_content = &content[start_byte..end_byte];
            if node_content.trim().len() < MIN_NODE_CHARS {
                continue;
            }

            let start_line = 1 + content[..start_byte].matches('\n').count() as u32;
            let end_line = 1 + content[..end_byte].matches('\n').count() as u32;
            let kind = capture_to_chunk_kind(capture_name);

            let mut chunk = Chunk::new(
                node_content.to_string(),
                start_line,
                end_line,
                kind,
                language,
                file_path.to_string(),
                relative_path.to_string(),
                chunk_index,
            );
            if let Some(name) = name_text {
                chunk = chunk.with_name(name);
            }
            chunks.push(chunk);
            chunk_index += 1;
        }

        Ok(chunks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_supports_known_languages() {
        let chunker = TreeSitterChunker::new();
        assert!(chunker.supports(Language::Rust));
        assert!(chunker.supports(Language::Python));
        assert!(chunker.supports(Language::Java));
        assert!(chunker.supports(Language::C));
        assert!(!chunker.supports(Language::Unknown));
    }

    #[test]
    fn test_chunk_rust_function() {
        let chunker = TreeSitterChunker::new();
        let content = "fn add(a: i32, b: i32) -> i32 {\n    a + b\n}\n";
        let chunks = chunker.chunk(content, "src/lib.rs", "src/lib.rs", Language::Rust).unwrap();
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].kind(), ChunkKind::Function);
        assert_eq!(chunks[0].name(), Some("add"));
    }

    #[test]
    fn test_chunk_rust_struct_and_impl() {
        let chunker = TreeSitterChunker::new();
        let content = "struct Point {\n    x: i32,\n    y: i32,\n}\n\nimpl Point {\n    fn new() -> Self {\n        Point { x: 0, y: 0 }\n    }\n}\n";
        let chunks = chunker.chunk(content, "src/lib.rs", "src/lib.rs", Language::Rust).unwrap();
        assert!(chunks.iter().any(|c| c.kind() == ChunkKind::Struct && c.name() == Some("Point")));
        assert!(chunks.iter().any(|c| c.kind() == ChunkKind::Block));
    }

    #[test]
    fn test_chunk_python_class_and_function() {
        let chunker = TreeSitterChunker::new();
        let content = "def greet(name):\n    return f'hello {name}'\n\n\nclass Greeter:\n    def say(self):\n        pass\n";
        let chunks = chunker.chunk(content, "greet.py", "greet.py", Language::Python).unwrap();
        assert!(chunks.iter().any(|c| c.kind() == ChunkKind::Function && c.name() == Some("greet")));
        assert!(chunks.iter().any(|c| c.kind() == ChunkKind::Class && c.name() == Some("Greeter")));
    }

    #[test]
    fn test_chunk_typescript_interface() {
        let chunker = TreeSitterChunker::new();
        let content = "interface Shape {\n    area(): number;\n}\n";
        let chunks = chunker.chunk(content, "shape.ts", "shape.ts", Language::TypeScript).unwrap();
        assert!(chunks.iter().any(|c| c.kind() == ChunkKind::Interface && c.name() == Some("Shape")));
    }

    #[test]
    fn test_chunk_go_function() {
        let chunker = TreeSitterChunker::new();
        let content = "package main\n\nfunc Add(a int, b int) int {\n\treturn a + b\n}\n";
        let chunks = chunker.chunk(content, "main.go", "main.go", Language::Go).unwrap();
        assert!(chunks.iter().any(|c| c.kind() == ChunkKind::Function && c.name() == Some("Add")));
    }

    #[test]
    fn test_chunk_java_class() {
        let chunker = TreeSitterChunker::new();
        let content = "public class Greeter {\n    public String greet() {\n        return \"hi\";\n    }\n}\n";
        let chunks = chunker.chunk(content, "Greeter.java", "Greeter.java", Language::Java).unwrap();
        assert!(chunks.iter().any(|c| c.kind() == ChunkKind::Class && c.name() == Some("Greeter")));
        assert!(chunks.iter().any(|c| c.kind() == ChunkKind::Method && c.name() == Some("greet")));
    }

    #[test]
    fn test_chunk_c_function_and_struct() {
        let chunker = TreeSitterChunker::new();
        let content = "struct Point {\n    int x;\n    int y;\n};\n\nint add(int a, int b) {\n    return a + b;\n}\n";
        let chunks = chunker.chunk(content, "point.c", "point.c", Language::C).unwrap();
        assert!(chunks.iter().any(|c| c.kind() == ChunkKind::Struct && c.name() == Some("Point")));
        assert!(chunks.iter().any(|c| c.kind() == ChunkKind::Function && c.name() == Some("add")));
    }

    #[test]
    fn test_chunk_cpp_class() {
        let chunker = TreeSitterChunker::new();
        let content = "class Widget {\npublic:\n    void render();\n};\n";
        let chunks = chunker.chunk(content, "widget.cpp", "widget.cpp", Language::Cpp).unwrap();
        assert!(chunks.iter().any(|c| c.kind() == ChunkKind::Class && c.name() == Some("Widget")));
    }

    #[test]
    fn test_short_nodes_are_skipped() {
        let chunker = TreeSitterChunker::new();
        let content = "fn f(){}\n";
        let chunks = chunker.chunk(content, "src/lib.rs", "src/lib.rs", Language::Rust).unwrap();
        assert!(chunks.is_empty());
    }
}
