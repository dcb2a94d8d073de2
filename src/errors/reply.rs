// Converts AppError into the text shown to the user in chat. Errors with no
// reply surface (Telegram itself failing) return None.
use crate::errors::AppError;

pub fn render(err: &AppError) -> Option<String> {
    match err {
        AppError::Permission => {
            Some("You do not have permission to use this command.".to_string())
        }

        AppError::Usage(hint) => Some((*hint).to_string()),

        AppError::QuotaExceeded => Some(
            "You have reached the daily query limit. The counter resets at 00:00.".to_string(),
        ),

        // External failures get a generic retry hint; details stay in the logs.
        AppError::External(_) => Some(
            "The lookup could not be completed. Please try again later. \
             Correct usage: /query 86914804168"
                .to_string(),
        ),

        AppError::Persistence(_) => {
            Some("An internal error occurred while saving state. Please try again.".to_string())
        }

        // Nothing useful to tell the user if we cannot reach Telegram anyway.
        AppError::Telegram(_) => None,
    }
}
