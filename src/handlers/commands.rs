use std::sync::Arc;

use crate::errors::{reply, AppError, AppResult};
use crate::models::{Command, Message, TgUser, Update};
use crate::services::{Artifact, LookupService, TelegramService, UserRegistry};
use tokio::time::{sleep, Duration};
use tracing;

const GRANT_USAGE: &str =
    "Please use /grant followed by the user id. Example: /grant 123456789";
const QUERY_USAGE: &str =
    "Please use /query followed by a single value. Example: /query 86914804168";

/// Everything a command handler needs, owned by the dispatcher loop and the
/// reset task rather than living in process-wide globals.
pub struct BotContext {
    pub registry: Arc<UserRegistry>,
    pub telegram: TelegramService,
    pub lookup: LookupService,
    pub admin_contact: String,
}

/// What a successfully handled command sends back to the chat.
#[derive(Debug)]
enum Outcome {
    Text(String),
    Document { artifact: Artifact, followup: String },
}

/// Polls Telegram for updates and handles them one at a time. Updates are
/// processed sequentially, so no two command handlers mutate state
/// concurrently; only the reset task runs alongside this loop.
pub async fn run_dispatcher(ctx: Arc<BotContext>) {
    tracing::info!("Dispatcher started");
    let mut offset: i64 = 0;

    loop {
        let updates = match ctx.telegram.get_updates(offset).await {
            Ok(updates) => updates,
            Err(e) => {
                tracing::error!("Polling failed: {}", e);
                sleep(Duration::from_secs(5)).await;
                continue;
            }
        };

        for update in updates {
            // Advance past this update even if handling it fails.
            offset = offset.max(update.update_id + 1);
            handle_update(&ctx, update).await;
        }
    }
}

async fn handle_update(ctx: &BotContext, update: Update) {
    let Some(message) = update.message else {
        return;
    };
    let Some(text) = message.text.as_deref() else {
        return;
    };
    let Some(command) = Command::parse(text) else {
        tracing::debug!("Ignoring non-command message in chat {}", message.chat.id);
        return;
    };
    let Some(user) = message.from.clone() else {
        return;
    };

    tracing::debug!("Handling /{} from user {}", command.name, user.id);
    match run_command(ctx, &user, &command).await {
        Ok(outcome) => deliver(ctx, &message, outcome).await,
        Err(e) => {
            tracing::warn!("/{} from user {} failed: {}", command.name, user.id, e);
            if let Some(text) = reply::render(&e) {
                send_text(ctx, message.chat.id, &text).await;
            }
        }
    }
}

async fn run_command(ctx: &BotContext, user: &TgUser, command: &Command) -> AppResult<Outcome> {
    match command.name.as_str() {
        "start" => Ok(handle_start(ctx, user)),
        "grant" => handle_grant(ctx, user, command),
        "query" => handle_query(ctx, user, command).await,
        other => {
            tracing::debug!("Unknown command /{} from user {}", other, user.id);
            Err(AppError::Usage(
                "Unknown command. Available: /start, /grant, /query",
            ))
        }
    }
}

fn handle_start(ctx: &BotContext, user: &TgUser) -> Outcome {
    Outcome::Text(format!(
        "{}, this is a members-only lookup bot. Your user id is {}. \
         Please send your id to {} to request access.",
        user.first_name, user.id, ctx.admin_contact
    ))
}

fn handle_grant(ctx: &BotContext, user: &TgUser, command: &Command) -> AppResult<Outcome> {
    if !ctx.registry.is_admin(user.id) {
        return Err(AppError::Permission);
    }
    if command.args.len() != 1 {
        return Err(AppError::Usage(GRANT_USAGE));
    }
    let target: i64 = command.args[0]
        .parse()
        .map_err(|_| AppError::Usage(GRANT_USAGE))?;

    ctx.registry.grant(user.id, target)?;
    Ok(Outcome::Text(format!("Id {} added successfully!", target)))
}

async fn handle_query(ctx: &BotContext, user: &TgUser, command: &Command) -> AppResult<Outcome> {
    if !ctx.registry.is_authorized(user.id) {
        return Err(AppError::Permission);
    }
    if command.args.len() != 1 {
        return Err(AppError::Usage(QUERY_USAGE));
    }

    // Reserve the quota slot up front so the ceiling is enforced before the
    // external call; a failed relay returns the slot.
    let remaining = ctx.registry.check_and_increment(user.id)?;
    match ctx.lookup.lookup(&command.args[0]).await {
        Ok(artifact) => {
            let limit = ctx.registry.daily_limit();
            Ok(Outcome::Document {
                artifact,
                followup: format!(
                    "You have {}/{} queries left for today. The counter resets at 00:00.",
                    remaining, limit
                ),
            })
        }
        Err(e) => {
            ctx.registry.release(user.id);
            Err(e)
        }
    }
}

async fn deliver(ctx: &BotContext, message: &Message, outcome: Outcome) {
    match outcome {
        Outcome::Text(text) => send_text(ctx, message.chat.id, &text).await,
        Outcome::Document { artifact, followup } => {
            let sent = ctx
                .telegram
                .send_document(message.chat.id, artifact.path(), &artifact.file_name())
                .await;
            // The artifact is dropped (and its file removed) either way.
            match sent {
                Ok(()) => send_text(ctx, message.chat.id, &followup).await,
                Err(e) => tracing::error!("Failed to deliver artifact: {}", e),
            }
        }
    }
}

async fn send_text(ctx: &BotContext, chat_id: i64, text: &str) {
    if let Err(e) = ctx.telegram.send_message(chat_id, text).await {
        tracing::error!("Failed to send reply to chat {}: {}", chat_id, e);
    }
}
