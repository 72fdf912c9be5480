use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::db::models::DecodedEvent;

use super::{summary_line, Notifier, NotifyError};

const TELEGRAM_API: &str = "https://api.telegram.org";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Serialize)]
struct SendMessage<'a> {
    chat_id: &'a str,
    text: String,
    disable_notification: bool,
}

#[derive(Deserialize)]
struct ApiResponse {
    ok: bool,
    description: Option<String>,
}

/// Posts a silent one-line message per event to a chat through the Bot API.
pub struct Telegram {
    client: Client,
    api_base: String,
    token: String,
    chat_id: String,
}

impl Telegram {
    pub fn new(token: String, chat_id: String) -> Result<Self, NotifyError> {
        Self::with_api_base(TELEGRAM_API, token, chat_id)
    }

    /// Same as [`Telegram::new`] against a different Bot API host.
    pub fn with_api_base(
        api_base: &str,
        token: String,
        chat_id: String,
    ) -> Result<Self, NotifyError> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;

        Ok(Self {
            client,
            api_base: api_base.trim_end_matches('/').to_string(),
            token,
            chat_id,
        })
    }

    fn send_message_url(&self) -> String {
        format!("{}/bot{}/sendMessage", self.api_base, self.token)
    }

    fn message<'a>(&'a self, event: &DecodedEvent) -> SendMessage<'a> {
        SendMessage {
            chat_id: &self.chat_id,
            text: summary_line(event),
            disable_notification: true,
        }
    }
}

#[async_trait]
impl Notifier for Telegram {
    fn platform_name(&self) -> &str {
        "telegram"
    }

    async fn send(&self, event: &DecodedEvent) -> Result<(), NotifyError> {
        let response = self
            .client
            .post(self.send_message_url())
            .json(&self.message(event))
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;

        // Gateways in front of the API answer with HTML; keep their body as the reason.
        let (ok, description) = match serde_json::from_str::<ApiResponse>(&text) {
            Ok(body) => {
                let description = body.description.unwrap_or_else(|| "no description".into());
                (body.ok, description)
            }
            Err(_) => (false, text),
        };

        if !status.is_success() || !ok {
            return Err(NotifyError::Rejected {
                status: status.as_u16(),
                description,
            });
        }

        tracing::debug!(
            tx = %event.transaction_hash,
            log_index = event.log_index,
            "Telegram message sent"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SEND_PATH: &str = "/bot123:abc/sendMessage";

    fn event() -> DecodedEvent {
        DecodedEvent {
            network: "mainnet".into(),
            contract_name: "Token".into(),
            address: "0x00".into(),
            block_hash: "0x01".into(),
            block_number: 1,
            transaction_hash: "0x02".into(),
            transaction_index: 0,
            log_index: 4,
            event_name: "Transfer".into(),
            arguments: vec!["a".into(), "b".into(), "5".into()],
        }
    }

    fn against(server: &mockito::ServerGuard) -> Telegram {
        Telegram::with_api_base(&server.url(), "123:abc".into(), "-100200".into()).unwrap()
    }

    #[test]
    fn builds_silent_send_message_request() {
        let telegram = Telegram::new("123:abc".into(), "-100200".into()).unwrap();
        assert_eq!(
            telegram.send_message_url(),
            "https://api.telegram.org/bot123:abc/sendMessage"
        );

        let body = serde_json::to_value(telegram.message(&event())).unwrap();
        assert_eq!(body["chat_id"], "-100200");
        assert_eq!(body["text"], "[mainnet] Token Transfer(a,b,5)");
        assert_eq!(body["disable_notification"], true);
        assert_eq!(telegram.platform_name(), "telegram");
    }

    #[tokio::test]
    async fn accepted_message_is_ok() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", SEND_PATH)
            .match_body(mockito::Matcher::PartialJson(serde_json::json!({
                "chat_id": "-100200",
                "text": "[mainnet] Token Transfer(a,b,5)",
                "disable_notification": true
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"ok":true,"result":{"message_id":1}}"#)
            .create_async()
            .await;

        against(&server).send(&event()).await.unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn error_status_is_rejected_with_api_description() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", SEND_PATH)
            .with_status(400)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"ok":false,"error_code":400,"description":"Bad Request: chat not found"}"#,
            )
            .create_async()
            .await;

        let err = against(&server).send(&event()).await.unwrap_err();
        match err {
            NotifyError::Rejected { status, description } => {
                assert_eq!(status, 400);
                assert_eq!(description, "Bad Request: chat not found");
            }
            other => panic!("expected Rejected, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn ok_false_body_is_rejected_even_with_success_status() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", SEND_PATH)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"ok":false,"description":"Forbidden: bot was blocked"}"#)
            .create_async()
            .await;

        let err = against(&server).send(&event()).await.unwrap_err();
        assert!(matches!(
            err,
            NotifyError::Rejected { status: 200, ref description }
                if description == "Forbidden: bot was blocked"
        ));
    }

    #[tokio::test]
    async fn non_json_error_body_is_rejected_with_raw_text() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", SEND_PATH)
            .with_status(502)
            .with_header("content-type", "text/html")
            .with_body("<html>502 Bad Gateway</html>")
            .create_async()
            .await;

        let err = against(&server).send(&event()).await.unwrap_err();
        assert!(matches!(
            err,
            NotifyError::Rejected { status: 502, ref description }
                if description == "<html>502 Bad Gateway</html>"
        ));
    }
}
