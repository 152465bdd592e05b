use std::sync::OnceLock;

use regex::Regex;

use crate::domain::CommitType;

/// Ordered `(type, pattern)` cascade; first match wins. Order is part of the
/// contract (e.g. `feat` matches before `fix` for `feat(fix): ...`).
fn cascade() -> &'static Vec<(CommitType, Regex)> {
    static CASCADE: OnceLock<Vec<(CommitType, Regex)>> = OnceLock::new();
    CASCADE.get_or_init(|| {
        [
            (CommitType::Revert, r"(?i)^revert(\(.+\))?:"),
            (CommitType::Feat, r"(?i)^feat(\(.+\))?:"),
            (CommitType::Fix, r"(?i)^fix(\(.+\))?:"),
            (CommitType::Refactor, r"(?i)^refactor(\(.+\))?:"),
            (CommitType::Docs, r"(?i)^docs(\(.+\))?:"),
            (CommitType::Test, r"(?i)^test(\(.+\))?:"),
            (CommitType::Chore, r"(?i)^chore(\(.+\))?:"),
            (CommitType::Style, r"(?i)^style(\(.+\))?:"),
            (CommitType::Perf, r"(?i)^perf(\(.+\))?:"),
            (CommitType::Build, r"(?i)^build(\(.+\))?:"),
            (CommitType::Ci, r"(?i)^ci(\(.+\))?:"),
        ]
        .into_iter()
        .map(|(kind, pattern)| (kind, Regex::new(pattern).expect("static cascade pattern is valid")))
        .collect()
    })
}

/// Classifies a commit by its conventional-commit prefix, testing the
/// subject line first, then falling back to `subject + " " + body`.
/// No match yields `CommitType::Other`.
pub fn classify_commit(subject: &str, body: &str) -> CommitType {
    for (kind, pattern) in cascade() {
        if pattern.is_match(subject) {
            return *kind;
        }
    }
    let combined = format!("{subject} {body}");
    for (kind, pattern) in cascade() {
        if pattern.is_match(&combined) {
            return *kind;
        }
    }
    CommitType::Other
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feat_before_fix_when_subject_mentions_both() {
        assert_eq!(classify_commit("feat(fix): add a thing", ""), CommitType::Feat);
    }

    #[test]
    fn test_plain_fix() {
        assert_eq!(classify_commit("fix: correct off-by-one", ""), CommitType::Fix);
    }

    #[test]
    fn test_no_match_is_other() {
        assert_eq!(classify_commit("wip stuff", ""), CommitType::Other);
    }

    #[test]
    fn test_body_fallback() {
        assert_eq!(
            classify_commit("quick patch", "this is a fix: for the race"),
            CommitType::Fix
        );
    }

    #[test]
    fn test_revert() {
        assert_eq!(classify_commit("revert: \"feat: add x\"", ""), CommitType::Revert);
    }
}
