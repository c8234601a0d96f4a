use std::sync::{Arc, Mutex};

use chrono::Utc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

use flag_core::model::SessionId;
use services::{ApiConfig, ApiError, HttpSessionApi, SessionApi};
use storage::repository::{AuthTokens, InMemoryTokenStore, TokenStore};

/// One-shot HTTP/1.1 server answering each connection with the next canned reply.
struct StubServer {
    base_url: String,
    requests: Arc<Mutex<Vec<String>>>,
    task: JoinHandle<()>,
}

impl StubServer {
    async fn start(replies: Vec<(u16, &'static str)>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base_url = format!("http://{}/api", listener.local_addr().unwrap());
        let requests = Arc::new(Mutex::new(Vec::new()));

        let seen = Arc::clone(&requests);
        let task = tokio::spawn(async move {
            for (status, body) in replies {
                let (mut stream, _) = listener.accept().await.unwrap();
                let request = read_request(&mut stream).await;
                seen.lock().unwrap().push(request);

                let response = format!(
                    "HTTP/1.1 {status} Stub\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                    body.len()
                );
                stream.write_all(response.as_bytes()).await.unwrap();
                stream.shutdown().await.unwrap();
            }
        });

        Self {
            base_url,
            requests,
            task,
        }
    }

    fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

impl Drop for StubServer {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Headers plus any `content-length` body, lowercased.
async fn read_request(stream: &mut TcpStream) -> String {
    let mut raw = Vec::new();
    let mut chunk = [0_u8; 1024];
    loop {
        let read = stream.read(&mut chunk).await.unwrap();
        if read == 0 {
            break;
        }
        raw.extend_from_slice(&chunk[..read]);

        let text = String::from_utf8_lossy(&raw).to_lowercase();
        let Some(header_end) = text.find("\r\n\r\n") else {
            continue;
        };
        let body_len = text[..header_end]
            .lines()
            .find_map(|line| line.strip_prefix("content-length:"))
            .and_then(|value| value.trim().parse::<usize>().ok())
            .unwrap_or(0);
        if raw.len() >= header_end + 4 + body_len {
            return text;
        }
    }
    String::from_utf8_lossy(&raw).to_lowercase()
}

fn client(server: &StubServer, tokens: Arc<dyn TokenStore>) -> HttpSessionApi {
    HttpSessionApi::new(ApiConfig::new(&server.base_url).unwrap(), tokens)
}

fn signed_in() -> Arc<InMemoryTokenStore> {
    Arc::new(InMemoryTokenStore::with_tokens(AuthTokens::new(
        "abc123",
        Some("refresh".into()),
        Utc::now(),
    )))
}

#[tokio::test]
async fn stored_token_is_sent_as_bearer() {
    let server = StubServer::start(vec![(
        200,
        r#"{"due_flags": 2, "total_flags": 9, "average_accuracy": 80.0, "box_distribution": {"box_1": 9}}"#,
    )])
    .await;
    let api = client(&server, signed_in());

    let stats = api.learning_stats().await.unwrap();
    assert_eq!(stats.due_flags, 2);
    assert_eq!(stats.box_distribution.total(), 9);

    let requests = server.requests();
    assert!(requests[0].starts_with("get /api/learn/stats/ "));
    assert!(requests[0].contains("authorization: bearer abc123"));
}

#[tokio::test]
async fn no_header_without_a_stored_token() {
    let server = StubServer::start(vec![(200, r#"{"count": 0, "due_flags": []}"#)]).await;
    let api = client(&server, Arc::new(InMemoryTokenStore::new()));

    let due = api.due_cards(10).await.unwrap();
    assert!(due.is_empty());

    let requests = server.requests();
    assert!(requests[0].starts_with("get /api/learn/due/?limit=10 "));
    assert!(!requests[0].contains("authorization:"));
}

#[tokio::test]
async fn unauthorized_clears_the_token_store() {
    let server = StubServer::start(vec![(401, r#"{"detail": "Token expired"}"#)]).await;
    let tokens = signed_in();
    let api = client(&server, tokens.clone());

    let err = api.due_cards(10).await.unwrap_err();
    assert!(matches!(err, ApiError::Unauthorized));
    assert_eq!(tokens.load_tokens().await.unwrap(), None);
}

#[tokio::test]
async fn error_body_message_is_surfaced() {
    let server = StubServer::start(vec![(400, r#"{"error": "No skips remaining"}"#)]).await;
    let tokens = signed_in();
    let api = client(&server, tokens.clone());

    let err = api.skip_question(SessionId::new(4)).await.unwrap_err();
    match err {
        ApiError::HttpStatus { status, message } => {
            assert_eq!(status.as_u16(), 400);
            assert_eq!(message, "No skips remaining");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(tokens.load_tokens().await.unwrap().is_some());
    assert!(server.requests()[0].starts_with("post /api/game/skip/?session_id=4 "));
}

#[tokio::test]
async fn review_posts_the_country_identity() {
    let server = StubServer::start(vec![(200, r#"{"status": "ok"}"#)]).await;
    let api = client(&server, signed_in());

    api.submit_review(flag_core::model::CountryId::new(31), false)
        .await
        .unwrap();

    let request = &server.requests()[0];
    assert!(request.starts_with("post /api/learn/review/ "));
    assert!(request.contains(r#""country_id":31"#));
    assert!(request.contains(r#""is_correct":false"#));
}
