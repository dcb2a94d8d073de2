/// A parsed bot command: `/name arg1 arg2 ...`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    pub name: String,
    pub args: Vec<String>,
}

impl Command {
    /// Parses a message text into a command. Returns None for plain messages.
    /// A `@botname` suffix on the command (used in group chats) is stripped.
    pub fn parse(text: &str) -> Option<Command> {
        let mut parts = text.split_whitespace();
        let first = parts.next()?;
        let name = first.strip_prefix('/')?;
        if name.is_empty() {
            return None;
        }
        let name = match name.split_once('@') {
            Some((bare, _bot)) => bare,
            None => name,
        };
        Some(Command {
            name: name.to_lowercase(),
            args: parts.map(str::to_string).collect(),
        })
    }
}
