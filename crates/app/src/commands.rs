//! Line commands understood by the interactive loop.

use std::str::FromStr;

pub const HELP: &str = "\
commands:
  drag <dx> <dy>   release a drag with the given displacement
  like | pass      commit right / left on the top card
  tap              tap the top card
  refill           fetch a new deck
  status           show deck position and quota
  matches          list matches
  wallet           refresh the balance from the server
  credit <amount>  add purchased currency locally
  suspend          write state now
  help             show this text
  quit             flush and exit";

#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    Drag { dx: f64, dy: f64 },
    Like,
    Pass,
    Tap,
    Refill,
    Status,
    Matches,
    Wallet,
    Credit(u64),
    Suspend,
    Help,
    Quit,
}

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("empty command")]
    Empty,
    #[error("unknown command `{0}`, try `help`")]
    Unknown(String),
    #[error("usage: {0}")]
    Usage(&'static str),
}

impl FromStr for Command {
    type Err = ParseError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut parts = line.split_whitespace();
        let Some(head) = parts.next() else {
            return Err(ParseError::Empty);
        };
        let args: Vec<&str> = parts.collect();

        let command = match (head.to_ascii_lowercase().as_str(), args.as_slice()) {
            ("drag", [dx, dy]) => {
                let (Ok(dx), Ok(dy)) = (dx.parse::<f64>(), dy.parse::<f64>()) else {
                    return Err(ParseError::Usage("drag <dx> <dy>"));
                };
                if !dx.is_finite() || !dy.is_finite() {
                    return Err(ParseError::Usage("drag <dx> <dy>"));
                }
                Self::Drag { dx, dy }
            }
            ("drag", _) => return Err(ParseError::Usage("drag <dx> <dy>")),
            ("like" | "right", []) => Self::Like,
            ("pass" | "left", []) => Self::Pass,
            ("tap", []) => Self::Tap,
            ("refill", []) => Self::Refill,
            ("status", []) => Self::Status,
            ("matches", []) => Self::Matches,
            ("wallet", []) => Self::Wallet,
            ("credit", [amount]) => match amount.parse() {
                Ok(amount) => Self::Credit(amount),
                Err(_) => return Err(ParseError::Usage("credit <amount>")),
            },
            ("credit", _) => return Err(ParseError::Usage("credit <amount>")),
            ("suspend", []) => Self::Suspend,
            ("help" | "?", []) => Self::Help,
            ("quit" | "exit", []) => Self::Quit,
            (other, _) => return Err(ParseError::Unknown(other.to_string())),
        };
        Ok(command)
    }
}
