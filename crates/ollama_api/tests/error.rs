use ollama_api::error::parse_error_message;
use ollama_api::OllamaApiError;
use reqwest::StatusCode;

#[test]
fn parse_error_message_reads_plain_error_string() {
    let body = r#"{"error":"model 'llama9' not found, try pulling it first"}"#;
    assert_eq!(
        parse_error_message(StatusCode::NOT_FOUND, body),
        "model 'llama9' not found, try pulling it first"
    );
}

#[test]
fn parse_error_message_reads_nested_message() {
    let body = r#"{"error":{"message":"invalid model"}}"#;
    assert_eq!(parse_error_message(StatusCode::BAD_REQUEST, body), "invalid model");
}

#[test]
fn parse_error_message_falls_back_to_raw_body() {
    assert_eq!(
        parse_error_message(StatusCode::INTERNAL_SERVER_ERROR, "raw failure text"),
        "raw failure text"
    );
    assert_eq!(
        parse_error_message(StatusCode::BAD_GATEWAY, r#"{"error":""}"#),
        r#"{"error":""}"#
    );
}

#[test]
fn parse_error_message_uses_status_reason_for_empty_body() {
    assert_eq!(
        parse_error_message(StatusCode::SERVICE_UNAVAILABLE, ""),
        "Service Unavailable"
    );
}

#[test]
fn status_error_display_includes_code_and_message() {
    let error = OllamaApiError::Status(StatusCode::NOT_FOUND, "model not found".to_string());
    assert_eq!(error.to_string(), "HTTP 404 Not Found model not found");
}
