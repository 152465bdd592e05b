use std::collections::BTreeMap;

use crate::domain::FileHashDiff;

/// Diffs two file-hash maps into `{added, modified, deleted}`, per spec §4.2.
pub fn detect_changes(
    old: &BTreeMap<String, String>,
    new: &BTreeMap<String, String>,
) -> FileHashDiff {
    FileHashDiff::compute(old, new)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_changes_when_equal() {
        let mut map = BTreeMap::new();
        map.insert("a.rs".to_string(), "h1".to_string());
        let diff = detect_changes(&map, &map.clone());
        assert!(diff.is_empty());
    }

    #[test]
    fn test_add_modify_delete() {
        let mut old = BTreeMap::new();
        old.insert("a.ts".to_string(), "1".to_string());
        old.insert("b.ts".to_string(), "2".to_string());
        old.insert("c.ts".to_string(), "3".to_string());

        let mut new = BTreeMap::new();
        new.insert("a.ts".to_string(), "1!".to_string());
        new.insert("b.ts".to_string(), "2".to_string());
        new.insert("d.ts".to_string(), "4".to_string());

        let diff = detect_changes(&old, &new);
        assert_eq!(diff.added, vec!["d.ts".to_string()]);
        assert_eq!(diff.modified, vec!["a.ts".to_string()]);
        assert_eq!(diff.deleted, vec!["c.ts".to_string()]);
    }
}
