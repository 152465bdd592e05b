use crate::domain::CoreError;

/// Process-wide defaults, read once at startup. Passed explicitly to
/// collaborators rather than stored as global state (spec §9).
#[derive(Debug, Clone)]
pub struct CoreConfig {
    pub vector_store_url: Option<String>,
    pub vector_store_key: Option<String>,
    pub embedding_provider: String,
    pub embedding_model: Option<String>,
    pub embedding_dimensions: Option<usize>,
    pub batch_size: usize,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub enable_hybrid_search: bool,
    pub http_port: Option<u16>,
    pub request_timeout_secs: u64,
    pub batch_retry_attempts: u32,
    pub max_chunks_per_file: Option<usize>,
    pub max_total_chunks: Option<usize>,
    pub max_diff_size: usize,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            vector_store_url: None,
            vector_store_key: None,
            embedding_provider: "mock".to_string(),
            embedding_model: None,
            embedding_dimensions: None,
            batch_size: 32,
            chunk_size: 1500,
            chunk_overlap: 200,
            enable_hybrid_search: false,
            http_port: None,
            request_timeout_secs: 30,
            batch_retry_attempts: 3,
            max_chunks_per_file: None,
            max_total_chunks: None,
            max_diff_size: 50 * 1024 * 1024,
        }
    }
}

fn env_var(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

fn parse_env<T: std::str::FromStr>(key: &str) -> Result<Option<T>, CoreError> {
    match env_var(key) {
        Some(raw) => raw
            .parse::<T>()
            .map(Some)
            .map_err(|_| CoreError::internal(format!("invalid value for {key}: {raw}"))),
        None => Ok(None),
    }
}

impl CoreConfig {
    /// Loads overrides from environment variables on top of the defaults.
    /// Non-numeric / out-of-range / negative values fail startup with an
    /// explanatory message (spec §6 Environment).
    pub fn from_env() -> Result<Self, CoreError> {
        let mut config = Self::default();

        if let Some(url) = env_var("CODECTX_VECTOR_STORE_URL") {
            config.vector_store_url = Some(url);
        }
        if let Some(key) = env_var("CODECTX_VECTOR_STORE_KEY") {
            config.vector_store_key = Some(key);
        }
        if let Some(provider) = env_var("CODECTX_EMBEDDING_PROVIDER") {
            config.embedding_provider = provider;
        }
        if let Some(model) = env_var("CODECTX_EMBEDDING_MODEL") {
            config.embedding_model = Some(model);
        }
        if let Some(dims) = parse_env::<usize>("CODECTX_EMBEDDING_DIMENSIONS")? {
            if dims == 0 {
                return Err(CoreError::internal("CODECTX_EMBEDDING_DIMENSIONS must be positive"));
            }
            config.embedding_dimensions = Some(dims);
        }
        if let Some(batch_size) = parse_env::<usize>("CODECTX_BATCH_SIZE")? {
            if batch_size == 0 {
                return Err(CoreError::internal("CODECTX_BATCH_SIZE must be positive"));
            }
            config.batch_size = batch_size;
        }
        if let Some(chunk_size) = parse_env::<usize>("CODECTX_CHUNK_SIZE")? {
            config.chunk_size = chunk_size;
        }
        if let Some(overlap) = parse_env::<usize>("CODECTX_CHUNK_OVERLAP")? {
            config.chunk_overlap = overlap;
        }
        if let Some(hybrid) = env_var("CODECTX_ENABLE_HYBRID_SEARCH") {
            config.enable_hybrid_search = matches!(hybrid.as_str(), "1" | "true" | "yes");
        }
        if let Some(port) = parse_env::<u16>("CODECTX_HTTP_PORT")? {
            config.http_port = Some(port);
        }
        if let Some(timeout) = parse_env::<u64>("CODECTX_REQUEST_TIMEOUT_SECS")? {
            config.request_timeout_secs = timeout;
        }
        if let Some(attempts) = parse_env::<u32>("CODECTX_BATCH_RETRY_ATTEMPTS")? {
            config.batch_retry_attempts = attempts;
        }
        if let Some(max) = parse_env::<usize>("CODECTX_MAX_CHUNKS_PER_FILE")? {
            config.max_chunks_per_file = Some(max);
        }
        if let Some(max) = parse_env::<usize>("CODECTX_MAX_TOTAL_CHUNKS")? {
            config.max_total_chunks = Some(max);
        }
        if let Some(max) = parse_env::<usize>("CODECTX_MAX_DIFF_SIZE")? {
            config.max_diff_size = max;
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = CoreConfig::default();
        assert_eq!(config.batch_size, 32);
        assert!(!config.enable_hybrid_search);
    }

    #[test]
    fn test_parse_env_rejects_non_numeric() {
        std::env::set_var("CODECTX_TEST_PARSE_ENV", "not-a-number");
        let result = parse_env::<usize>("CODECTX_TEST_PARSE_ENV");
        std::env::remove_var("CODECTX_TEST_PARSE_ENV");
        assert!(result.is_err());
    }
}
