//! Chat text → [`Command`].
//!
//! Commands look like `/roll`, `/sell Taipei` or `/roll@paybot`. Names are matched
//! case-insensitively; the square argument keeps its case.

use log::trace;

use crate::validation::normalize_square_arg;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Join,
    Start,
    Roll,
    Buy,
    Sell(String),
    Upgrade,
    Downgrade(String),
    Mortgage(String),
    Pay,
    Next,
    Info,
    Players,
    Board,
    Reset,
    Help,
    /// Recognized command with a bad or missing argument; carries the usage hint.
    Invalid(String),
    Unknown,
}

impl Command {
    /// Stable command word, used for metrics and debug logs.
    pub fn word(&self) -> &'static str {
        match self {
            Command::Join => "join",
            Command::Start => "start",
            Command::Roll => "roll",
            Command::Buy => "buy",
            Command::Sell(_) => "sell",
            Command::Upgrade => "upgrade",
            Command::Downgrade(_) => "downgrade",
            Command::Mortgage(_) => "mortgage",
            Command::Pay => "pay",
            Command::Next => "next",
            Command::Info => "info",
            Command::Players => "players",
            Command::Board => "board",
            Command::Reset => "reset",
            Command::Help => "help",
            Command::Invalid(_) => "invalid",
            Command::Unknown => "unknown",
        }
    }

    /// Whether running this command can change session state.
    pub fn mutates(&self) -> bool {
        !matches!(
            self,
            Command::Info
                | Command::Players
                | Command::Board
                | Command::Help
                | Command::Invalid(_)
                | Command::Unknown
        )
    }
}

pub const HELP_TEXT: &str = "Commands:\n\
/join - join the game\n\
/start - start the game\n\
/roll - roll the dice\n\
/buy - buy the property you are on\n\
/upgrade - upgrade the property you are on\n\
/sell <square> - sell a property\n\
/downgrade <square> - downgrade a property\n\
/mortgage <square> - mortgage a property\n\
/pay - pay your debt\n\
/next - end your turn\n\
/info - your cash and holdings\n\
/players - everyone's cash\n\
/board - the board\n\
/reset - reset the game (send twice)";

pub struct CommandParser {
    bot_name: Option<String>,
}

impl CommandParser {
    pub fn new() -> Self {
        CommandParser { bot_name: None }
    }

    /// Only accept `/cmd@name` suffixes that address this bot.
    pub fn with_bot_name(name: &str) -> Self {
        CommandParser {
            bot_name: Some(name.trim_start_matches('@').to_string()),
        }
    }

    pub fn parse(&self, raw: &str) -> Command {
        let trimmed = raw.trim();
        let Some(body) = trimmed.strip_prefix('/') else {
            return Command::Unknown;
        };
        let (head, rest) = match body.find(char::is_whitespace) {
            Some(i) => (&body[..i], &body[i..]),
            None => (body, ""),
        };
        let name = match head.split_once('@') {
            Some((name, target)) => {
                if let Some(bot) = &self.bot_name {
                    if !target.eq_ignore_ascii_case(bot) {
                        trace!("ignoring command addressed to @{}", target);
                        return Command::Unknown;
                    }
                }
                name
            }
            None => head,
        };
        let square = normalize_square_arg(rest);
        let needs_square = |ctor: fn(String) -> Command, usage: &str| match square.clone() {
            Some(sq) => ctor(sq),
            None => Command::Invalid(format!("Usage: {}", usage)),
        };

        let cmd = match name.to_ascii_lowercase().as_str() {
            "join" => Command::Join,
            "start" => Command::Start,
            "roll" => Command::Roll,
            "buy" => Command::Buy,
            "upgrade" => Command::Upgrade,
            "sell" => needs_square(Command::Sell, "/sell <square>"),
            "downgrade" => needs_square(Command::Downgrade, "/downgrade <square>"),
            "mortgage" => needs_square(Command::Mortgage, "/mortgage <square>"),
            "pay" => Command::Pay,
            "next" => Command::Next,
            "info" => Command::Info,
            "players" | "richlist" => Command::Players,
            "board" => Command::Board,
            "reset" => Command::Reset,
            "help" => Command::Help,
            _ => Command::Unknown,
        };
        trace!("parsed {:?} from '{}'", cmd, crate::logutil::escape_log(raw));
        cmd
    }
}

impl Default for CommandParser {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_commands() {
        let p = CommandParser::new();
        assert_eq!(p.parse("/roll"), Command::Roll);
        assert_eq!(p.parse("  /NEXT  "), Command::Next);
        assert_eq!(p.parse("/richlist"), Command::Players);
        assert_eq!(p.parse("/players"), Command::Players);
        assert_eq!(p.parse("roll"), Command::Unknown);
        assert_eq!(p.parse("/fly"), Command::Unknown);
    }

    #[test]
    fn square_arguments() {
        let p = CommandParser::new();
        assert_eq!(p.parse("/sell Taipei"), Command::Sell("Taipei".into()));
        assert_eq!(
            p.parse("/mortgage  Detention   Center"),
            Command::Mortgage("Detention Center".into())
        );
        assert_eq!(
            p.parse("/downgrade"),
            Command::Invalid("Usage: /downgrade <square>".into())
        );
    }

    #[test]
    fn bot_suffix() {
        let p = CommandParser::with_bot_name("@paybot");
        assert_eq!(p.parse("/roll@paybot"), Command::Roll);
        assert_eq!(p.parse("/sell@PayBot Tainan"), Command::Sell("Tainan".into()));
        assert_eq!(p.parse("/roll@otherbot"), Command::Unknown);
        assert_eq!(CommandParser::new().parse("/roll@any"), Command::Roll);
    }

    #[test]
    fn read_only_commands_do_not_mutate() {
        assert!(!Command::Info.mutates());
        assert!(!Command::Board.mutates());
        assert!(Command::Reset.mutates());
        assert!(Command::Sell("x".into()).mutates());
    }
}
