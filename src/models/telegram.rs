use serde::Deserialize;

// Minimal subset of the Telegram Bot API wire types; unknown fields are
// ignored by serde so API additions do not break deserialization.

/// Envelope every Bot API method returns.
#[derive(Debug, Deserialize)]
pub struct ApiResponse<T> {
    pub ok: bool,
    pub result: Option<T>,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Update {
    pub update_id: i64,
    pub message: Option<Message>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Message {
    pub message_id: i64,
    pub from: Option<TgUser>,
    pub chat: Chat,
    pub text: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct TgUser {
    pub id: i64,
    pub first_name: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Chat {
    pub id: i64,
}
