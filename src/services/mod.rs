mod backup;
mod lookup;
mod registry;
mod telegram;

pub use backup::BackupService;
pub use lookup::{Artifact, LookupService};
pub use registry::UserRegistry;
pub use telegram::TelegramService;
