use md5::{Digest, Md5};

/// Strips a leading `git@<host>:` or `https?://<host>/`, and a trailing
/// `.git`. Case is preserved — many providers are case-sensitive on path.
/// Empty input returns empty output.
pub fn normalize_remote_url(url: &str) -> String {
    if url.is_empty() {
        return String::new();
    }

    let stripped = if let Some(rest) = url.strip_prefix("git@") {
        rest.splitn(2, ':').nth(1).unwrap_or(rest)
    } else if let Some(rest) = url.strip_prefix("https://") {
        rest.splitn(2, '/').nth(1).unwrap_or(rest)
    } else if let Some(rest) = url.strip_prefix("http://") {
        rest.splitn(2, '/').nth(1).unwrap_or(rest)
    } else {
        url
    };

    stripped.strip_suffix(".git").unwrap_or(stripped).to_string()
}

fn hex8(identity: &str) -> String {
    let digest = Md5::digest(identity.as_bytes());
    digest[..4].iter().map(|b| format!("{:02x}", b)).collect()
}

/// `prefix + "_" + hex8(MD5(identity))`, where `identity` is the normalized
/// remote URL if non-empty, else the canonical absolute path. Two clones of
/// the same repo on different machines with the same remote resolve to the
/// same collection name.
pub fn collection_name(prefix: &str, remote_url: &str, canonical_path: &str) -> String {
    let normalized = normalize_remote_url(remote_url);
    let identity = if normalized.is_empty() {
        canonical_path
    } else {
        &normalized
    };
    format!("{prefix}_{}", hex8(identity))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_ssh_url() {
        assert_eq!(
            normalize_remote_url("git@github.com:owner/repo.git"),
            "owner/repo"
        );
    }

    #[test]
    fn test_normalize_https_url() {
        assert_eq!(
            normalize_remote_url("https://github.com/owner/repo.git"),
            "owner/repo"
        );
    }

    #[test]
    fn test_normalize_empty_is_empty() {
        assert_eq!(normalize_remote_url(""), "");
    }

    #[test]
    fn test_collection_name_stable_across_clones() {
        let a = collection_name("code", "git@github.com:owner/repo.git", "/home/alice/repo");
        let b = collection_name("code", "https://github.com/owner/repo.git", "/home/bob/repo");
        assert_eq!(a, b);
    }

    #[test]
    fn test_collection_name_falls_back_to_path() {
        let name = collection_name("code", "", "/home/alice/repo");
        assert!(name.starts_with("code_"));
    }
}
