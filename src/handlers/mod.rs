mod commands;

pub use commands::{run_dispatcher, BotContext};
