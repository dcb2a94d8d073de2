mod command;
mod snapshot;
mod telegram;

pub use command::Command;
pub use snapshot::{RegistryState, Snapshot};
pub use telegram::{ApiResponse, Chat, Message, TgUser, Update};
