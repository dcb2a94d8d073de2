use std::path::Path;
use std::time::Duration;

use crate::config::TelegramConfig;
use crate::errors::{AppError, AppResult};
use crate::models::{ApiResponse, Message, Update};
use tracing;

/// Thin client over the Telegram Bot API: long-polls for updates and sends
/// text replies and document uploads.
pub struct TelegramService {
    client: reqwest::Client,
    base_url: String,
    poll_timeout_secs: u64,
}

impl TelegramService {
    pub fn new(config: &TelegramConfig) -> Self {
        // The HTTP timeout must outlast the server-side long-poll window.
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.poll_timeout_secs + 10))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            client,
            base_url: format!("https://api.telegram.org/bot{}", config.token),
            poll_timeout_secs: config.poll_timeout_secs,
        }
    }

    /// Long-polls for updates past `offset`. An empty list on timeout is the
    /// normal idle case, not an error.
    pub async fn get_updates(&self, offset: i64) -> AppResult<Vec<Update>> {
        let url = format!(
            "{}/getUpdates?timeout={}&offset={}",
            self.base_url, self.poll_timeout_secs, offset
        );
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| AppError::Telegram(format!("getUpdates: {}", e)))?;

        let envelope: ApiResponse<Vec<Update>> = response
            .json()
            .await
            .map_err(|e| AppError::Telegram(format!("getUpdates body: {}", e)))?;

        unwrap_envelope(envelope, "getUpdates")
    }

    pub async fn send_message(&self, chat_id: i64, text: &str) -> AppResult<()> {
        let url = format!("{}/sendMessage", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(&serde_json::json!({ "chat_id": chat_id, "text": text }))
            .send()
            .await
            .map_err(|e| AppError::Telegram(format!("sendMessage: {}", e)))?;

        let envelope: ApiResponse<Message> = response
            .json()
            .await
            .map_err(|e| AppError::Telegram(format!("sendMessage body: {}", e)))?;

        unwrap_envelope(envelope, "sendMessage").map(|_| ())
    }

    /// Uploads a local file as a document attachment.
    pub async fn send_document(
        &self,
        chat_id: i64,
        path: &Path,
        file_name: &str,
    ) -> AppResult<()> {
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| AppError::Telegram(format!("read {}: {}", path.display(), e)))?;

        let form = reqwest::multipart::Form::new()
            .text("chat_id", chat_id.to_string())
            .part(
                "document",
                reqwest::multipart::Part::bytes(bytes).file_name(file_name.to_string()),
            );

        let url = format!("{}/sendDocument", self.base_url);
        let response = self
            .client
            .post(&url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| AppError::Telegram(format!("sendDocument: {}", e)))?;

        let envelope: ApiResponse<Message> = response
            .json()
            .await
            .map_err(|e| AppError::Telegram(format!("sendDocument body: {}", e)))?;

        unwrap_envelope(envelope, "sendDocument").map(|_| ())
    }
}

fn unwrap_envelope<T>(envelope: ApiResponse<T>, method: &str) -> AppResult<T> {
    if !envelope.ok {
        let description = envelope
            .description
            .unwrap_or_else(|| "no description".to_string());
        tracing::error!("Telegram {} rejected: {}", method, description);
        return Err(AppError::Telegram(format!("{}: {}", method, description)));
    }
    envelope
        .result
        .ok_or_else(|| AppError::Telegram(format!("{}: ok response without result", method)))
}
