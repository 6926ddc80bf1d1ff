//! Helpers shared by the chat tests.

use std::sync::Mutex;
use std::time::Duration;

use serde_json::json;
use wiremock::matchers::method;
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::entity::KeywordTable;
use crate::error::Result;
use crate::tuling::TulingClient;

use super::round::{Chatbot, Outbound};

/// Keeps everything sent instead of posting it.
#[derive(Default)]
pub struct RecordingOutbound {
    sent: Mutex<Vec<String>>,
}

impl RecordingOutbound {
    pub fn sent(&self) -> Vec<String> {
        self.sent.lock().expect("not poisoned").clone()
    }
}

impl Outbound for RecordingOutbound {
    async fn send(&self, text: &str) -> Result<()> {
        self.sent.lock().expect("not poisoned").push(text.to_string());
        Ok(())
    }
}

/// A Tuling server answering every request with these text results.
pub async fn tuling_replying(texts: &[&str]) -> MockServer {
    let results: Vec<_> = texts
        .iter()
        .map(|text| json!({"resultType": "text", "values": {"text": text}}))
        .collect();
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "intent": {"code": 10004},
            "results": results
        })))
        .mount(&server)
        .await;
    server
}

pub fn chatbot(server: &MockServer) -> Chatbot {
    Chatbot::new(
        TulingClient::with_api_url(vec!["key-1".into()], server.uri()),
        KeywordTable::default_table().expect("default patterns compile"),
    )
    .with_relay_delay(Duration::ZERO)
}
