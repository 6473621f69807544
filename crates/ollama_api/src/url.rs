/// Default base URL of a locally running Ollama server.
pub const DEFAULT_OLLAMA_BASE_URL: &str = "http://localhost:11434";

/// Normalize a server base URL.
///
/// Normalization rules:
/// 1) blank input falls back to [`DEFAULT_OLLAMA_BASE_URL`]
/// 2) trailing slashes are removed
/// 3) a trailing `/api` segment is removed so endpoints are not doubled
pub fn normalize_base_url(input: &str) -> String {
    let base = if input.trim().is_empty() {
        DEFAULT_OLLAMA_BASE_URL
    } else {
        input.trim()
    };

    let trimmed = base.trim_end_matches('/');
    trimmed
        .strip_suffix("/api")
        .unwrap_or(trimmed)
        .to_string()
}

/// Chat completion endpoint for a base URL.
pub fn chat_url(base_url: &str) -> String {
    format!("{}/api/chat", normalize_base_url(base_url))
}

/// Model listing endpoint for a base URL.
pub fn tags_url(base_url: &str) -> String {
    format!("{}/api/tags", normalize_base_url(base_url))
}
