use console_api::url::{execute_url, normalize_base_url, run_code_url, DEFAULT_BASE_URL};
use console_api::ConsoleApiError;

#[test]
fn normalize_falls_back_to_default_for_blank_input() {
    assert_eq!(normalize_base_url("  "), DEFAULT_BASE_URL);
}

#[test]
fn normalize_strips_trailing_slashes_and_api_suffix() {
    assert_eq!(
        normalize_base_url("http://127.0.0.1:8000/"),
        "http://127.0.0.1:8000"
    );
    assert_eq!(
        normalize_base_url("http://127.0.0.1:8000/api/"),
        "http://127.0.0.1:8000"
    );
    assert_eq!(
        normalize_base_url("https://console.example/prefix"),
        "https://console.example/prefix"
    );
}

#[test]
fn run_code_url_encodes_chat_id_segment() {
    let url = run_code_url("http://localhost:8000", "chat 1/2").expect("url");
    assert_eq!(
        url.as_str(),
        "http://localhost:8000/api/chats/chat%201%2F2/run_code"
    );
}

#[test]
fn run_code_url_rejects_blank_chat_id() {
    let error = run_code_url("http://localhost:8000", " ").expect_err("blank chat id");
    assert!(matches!(error, ConsoleApiError::InvalidBaseUrl(_)));
}

#[test]
fn execute_url_keeps_path_prefix() {
    let url = execute_url("https://console.example/prefix/").expect("url");
    assert_eq!(url.as_str(), "https://console.example/prefix/api/execute");
}

#[test]
fn execute_url_rejects_unparseable_base() {
    let error = execute_url("not a url").expect_err("invalid base");
    assert!(matches!(error, ConsoleApiError::InvalidBaseUrl(_)));
}
