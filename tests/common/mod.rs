//! Shared mock-server fixture for integration tests.
#![allow(dead_code)]

use std::io::{Read, Write};
use std::time::Duration;

use mockito::{Matcher, Mock, Server, ServerGuard};
use tokio::net::TcpListener;
use tokio::sync::Mutex;
use volcano_llm::{ApiMode, ConnectionBuilder, ConnectionDescriptor, Dispatcher, TransportConfig};

pub const TEST_KEY: &str = "sk-test-key";

/// Test fixture that manages a mock server
pub struct MockServerFixture {
    pub server: Mutex<ServerGuard>,
    pub base_url: String,
}

impl MockServerFixture {
    pub async fn new() -> Self {
        let server = Server::new_async().await;
        let base_url = server.url();
        Self {
            server: Mutex::new(server),
            base_url,
        }
    }

    /// Descriptor pointed at the mock server.
    pub fn descriptor(&self, mode: ApiMode) -> ConnectionDescriptor {
        ConnectionBuilder::new(mode)
            .endpoint_id("ep-test")
            .api_key(TEST_KEY)
            .custom_base_url(&self.base_url)
            .build()
            .expect("descriptor")
    }

    /// Chat response with the given content and usage.
    pub fn chat_body(content: &str, usage: (u64, u64, u64)) -> String {
        serde_json::json!({
            "id": "chatcmpl-test",
            "model": "doubao-test",
            "choices": [{
                "index": 0,
                "message": {"role": "assistant", "content": content},
                "finish_reason": "stop"
            }],
            "usage": {
                "prompt_tokens": usage.0,
                "completion_tokens": usage.1,
                "total_tokens": usage.2
            }
        })
        .to_string()
    }

    /// Create a mock for a JSON response to the chat path
    pub async fn mock_json_response(&self, status: usize, body: &str) -> Mock {
        let mut server = self.server.lock().await;
        server
            .mock("POST", "/chat/completions")
            .match_header("authorization", format!("Bearer {}", TEST_KEY).as_str())
            .with_status(status)
            .with_header("content-type", "application/json")
            .with_body(body)
            .create_async()
            .await
    }

    /// Create a successful chat mock that must be hit exactly `hits` times
    pub async fn mock_chat_expecting(&self, hits: usize, body: &str) -> Mock {
        let mut server = self.server.lock().await;
        server
            .mock("POST", "/chat/completions")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(body)
            .expect(hits)
            .create_async()
            .await
    }

    /// Create a mock that only answers when the body contains `partial`
    pub async fn mock_matching(&self, partial: serde_json::Value, body: &str) -> Mock {
        let mut server = self.server.lock().await;
        server
            .mock("POST", "/chat/completions")
            .match_body(Matcher::PartialJson(partial))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(body)
            .create_async()
            .await
    }

    /// Create a mock for a successful streaming response (SSE)
    pub async fn mock_sse_stream(&self, chunks: Vec<&str>) -> Mock {
        let body = chunks
            .iter()
            .map(|chunk| {
                if chunk.starts_with("data: ") {
                    format!("{}\n\n", chunk)
                } else {
                    format!("data: {}\n\n", chunk)
                }
            })
            .collect::<Vec<_>>()
            .join("");

        let mut server = self.server.lock().await;
        server
            .mock("POST", "/chat/completions")
            .match_header("accept", "text/event-stream")
            .match_body(Matcher::PartialJson(serde_json::json!({"stream": true})))
            .with_status(200)
            .with_header("content-type", "text/event-stream")
            .with_body(body)
            .create_async()
            .await
    }

    /// Create a mock for the model listing endpoint
    pub async fn mock_models(&self, status: usize, body: &str) -> Mock {
        let mut server = self.server.lock().await;
        server
            .mock("GET", "/models")
            .with_status(status)
            .with_header("content-type", "application/json")
            .with_body(body)
            .create_async()
            .await
    }
}

pub fn dispatcher_with_timeout(timeout: Duration) -> Dispatcher {
    Dispatcher::with_config(TransportConfig::default().with_timeout(timeout)).expect("dispatcher")
}

pub fn dispatcher() -> Dispatcher {
    dispatcher_with_timeout(Duration::from_secs(5))
}

/// A server that accepts connections and never answers. Returns its base URL.
pub async fn hanging_server() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((socket, _)) = listener.accept().await {
            held.push(socket);
        }
    });
    format!("http://{}", addr)
}

/// A server that answers every request with `head` (status line, headers and
/// any partial body) and then goes silent without closing. Returns its base URL.
pub fn stalling_server(head: &'static str) -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind");
    let addr = listener.local_addr().expect("addr");
    std::thread::spawn(move || {
        let mut held = Vec::new();
        for mut socket in listener.incoming().flatten() {
            let mut buf = [0u8; 8192];
            let _ = socket.read(&mut buf);
            let _ = socket.write_all(head.as_bytes());
            let _ = socket.flush();
            held.push(socket);
        }
    });
    format!("http://{}", addr)
}

/// A base URL nobody listens on.
pub async fn refused_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    drop(listener);
    format!("http://{}", addr)
}
