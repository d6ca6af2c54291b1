//! Drives the client against a one-shot local HTTP endpoint.

use crucible_core::{complete_json, CollaboratorError, CompletionService};
use crucible_llm::{is_ollama_available, OllamaClient, OllamaConfig};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// Serve one request with `status` and `body`; yields the raw request text.
async fn serve_once(status: &'static str, body: String) -> (String, JoinHandle<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let host = format!("http://{}", listener.local_addr().unwrap());
    let handle = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut request = Vec::new();
        let mut buf = [0u8; 4096];
        loop {
            let n = socket.read(&mut buf).await.unwrap();
            request.extend_from_slice(&buf[..n]);
            let text = String::from_utf8_lossy(&request);
            if let Some(idx) = text.find("\r\n\r\n") {
                let len = text
                    .lines()
                    .find_map(|l| {
                        let l = l.to_ascii_lowercase();
                        l.strip_prefix("content-length:")
                            .and_then(|v| v.trim().parse::<usize>().ok())
                    })
                    .unwrap_or(0);
                if request.len() >= idx + 4 + len {
                    break;
                }
            }
            if n == 0 {
                break;
            }
        }
        let response = format!(
            "HTTP/1.1 {status}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
            body.len()
        );
        socket.write_all(response.as_bytes()).await.unwrap();
        String::from_utf8_lossy(&request).to_string()
    });
    (host, handle)
}

fn client_for(host: String) -> OllamaClient {
    OllamaClient::new(OllamaConfig {
        host,
        model: "test-model".to_string(),
        timeout_secs: 5,
        temperature: None,
    })
    .unwrap()
}

#[tokio::test]
async fn structured_completion_parses_json() {
    let body = serde_json::json!({
        "model": "test-model",
        "message": {"role": "assistant", "content": "{\"overall_score\": 72}"},
        "done": true
    })
    .to_string();
    let (host, server) = serve_once("200 OK", body).await;
    let client = client_for(host);

    let value: serde_json::Value = complete_json(&client, "score this plan").await.unwrap();
    assert_eq!(value["overall_score"], 72);

    let request = server.await.unwrap();
    assert!(request.starts_with("POST /api/chat"));
    assert!(request.contains("\"format\":\"json\""));
    assert!(request.contains("\"model\":\"test-model\""));
}

#[tokio::test]
async fn error_status_is_unreachable() {
    let (host, server) = serve_once("404 Not Found", r#"{"error":"model not found"}"#.to_string()).await;
    let client = client_for(host);

    let err = client.complete("hello", false).await.unwrap_err();
    assert!(matches!(err, CollaboratorError::Unreachable(_)));
    server.await.unwrap();
}

#[tokio::test]
async fn refused_connection_is_unreachable() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let host = format!("http://{}", listener.local_addr().unwrap());
    drop(listener);

    let client = client_for(host.clone());
    let err = client.complete("hello", false).await.unwrap_err();
    assert!(matches!(err, CollaboratorError::Unreachable(_)));

    let config = OllamaConfig {
        host,
        ..OllamaConfig::default()
    };
    assert!(!is_ollama_available(&config).await);
}
