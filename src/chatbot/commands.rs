//! Bot command set.

use teloxide::utils::command::BotCommands;

/// Reply to `/start`.
pub const HELP_TEXT: &str = "Wah Gwan! (Hello!). Which date and Jamaican city would you like to travel to?
Example: Will Ochi be packed this weekend?

Quick commands:
/ochi - Check if Ocho Rios will be packed this weekend
/mobay - Check if Montego Bay will be packed this weekend
/negril - Check if Negril will be packed this weekend";

#[derive(BotCommands, Clone, Copy, Debug, PartialEq, Eq)]
#[command(rename_rule = "lowercase", description = "Supported commands:")]
pub enum Command {
    #[command(description = "Show help and quick commands.")]
    Start,
    #[command(description = "Check if Ocho Rios will be packed this weekend.")]
    Ochi,
    #[command(description = "Check if Montego Bay will be packed this weekend.")]
    Mobay,
    #[command(description = "Check if Negril will be packed this weekend.")]
    Negril,
}

impl Command {
    /// The canned question a quick command asks, if any.
    pub fn fixed_question(&self) -> Option<&'static str> {
        match self {
            Command::Start => None,
            Command::Ochi => Some("Will Ocho Rios be packed this weekend?"),
            Command::Mobay => Some("Will Montego Bay be packed this weekend?"),
            Command::Negril => Some("Will Negril be packed this weekend?"),
        }
    }
}
