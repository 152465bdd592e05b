use std::path::Path;

use ignore::gitignore::GitignoreBuilder;
use ignore::overrides::OverrideBuilder;
use ignore::WalkBuilder;
use tracing::warn;

use crate::domain::{CoreError, Language};

/// Non-standard ignore-file names layered on top of `.gitignore` itself,
/// per spec §4.1's pattern-source ordering.
const EXTRA_IGNORE_FILES: &[&str] = &[".dockerignore", ".npmignore", ".contextignore"];

#[derive(Debug, Clone, Default)]
pub struct ScanOptions {
    pub extensions: Option<Vec<String>>,
    pub ignore_patterns: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct ScannedFile {
    pub absolute_path: std::path::PathBuf,
    pub relative_path: String,
    pub language: Language,
}

/// Enumerates candidate files under `root`, honoring layered ignore rules
/// and the supported-extension allow-list. Permission errors on
/// subdirectories are logged and skipped, never abort the walk.
pub fn scan(root: &Path, options: &ScanOptions) -> Result<Vec<ScannedFile>, CoreError> {
    if !root.exists() {
        return Err(CoreError::invalid_path(root.display().to_string()));
    }

    let mut overrides = OverrideBuilder::new(root);
    for pattern in &options.ignore_patterns {
        // Leading `!` in an override means "whitelist" in the `ignore` crate,
        // the opposite of gitignore's negation, so invert config patterns
        // (which are always exclusions) by prefixing `!`.
        if let Err(e) = overrides.add(&format!("!{pattern}")) {
            warn!("invalid ignore pattern {pattern}: {e}");
        }
    }
    let overrides = overrides
        .build()
        .map_err(|e| CoreError::invalid_filter(e.to_string()))?;

    let mut extra_gitignore = GitignoreBuilder::new(root);
    let mut has_extra_rules = false;
    for name in EXTRA_IGNORE_FILES {
        let path = root.join(name);
        if path.is_file() {
            if let Some(err) = extra_gitignore.add(&path) {
                warn!("failed to read {name}: {err}");
            } else {
                has_extra_rules = true;
            }
        }
    }
    let extra_gitignore = if has_extra_rules {
        Some(
            extra_gitignore
                .build()
                .map_err(|e| CoreError::invalid_filter(e.to_string()))?,
        )
    } else {
        None
    };

    let walker = WalkBuilder::new(root)
        .hidden(true)
        .follow_links(false)
        .git_ignore(true)
        .git_global(true)
        .git_exclude(true)
        .overrides(overrides)
        .build();

    let mut files = Vec::new();
    for entry in walker {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                warn!("error walking directory: {e}");
                continue;
            }
        };

        let path = entry.path();
        if !path.is_file() {
            continue;
        }

        if let Some(gi) = &extra_gitignore {
            if gi.matched(path, false).is_ignore() {
                continue;
            }
        }

        let language = Language::from_path(path);
        if let Some(allowed) = &options.extensions {
            let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
            if !allowed.iter().any(|a| a == ext) {
                continue;
            }
        } else if !language.is_known() {
            continue;
        }

        let relative_path = path
            .strip_prefix(root)
            .unwrap_or(path)
            .to_string_lossy()
            .replace('\\', "/");

        files.push(ScannedFile {
            absolute_path: path.to_path_buf(),
            relative_path,
            language,
        });
    }

    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_gitignore_honored() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(".gitignore"), "node_modules/\n").unwrap();
        fs::create_dir_all(dir.path().join("src")).unwrap();
        fs::create_dir_all(dir.path().join("node_modules/x")).unwrap();
        fs::write(dir.path().join("src/a.ts"), "export const a = 1;").unwrap();
        fs::write(dir.path().join("node_modules/x/y.js"), "module.exports = {};").unwrap();

        let files = scan(dir.path(), &ScanOptions::default()).unwrap();
        let relative: Vec<&str> = files.iter().map(|f| f.relative_path.as_str()).collect();

        assert_eq!(relative, vec!["src/a.ts"]);
    }

    #[test]
    fn test_unknown_extension_skipped() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("readme.txt"), "hello").unwrap();
        fs::write(dir.path().join("main.rs"), "fn main() {}").unwrap();

        let files = scan(dir.path(), &ScanOptions::default()).unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].relative_path, "main.rs");
    }

    #[test]
    fn test_missing_root_errors() {
        let result = scan(Path::new("/nonexistent/path/xyz"), &ScanOptions::default());
        assert!(result.is_err());
    }
}
