//! Stdin command parsing.

/// One line of user input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `send <room> <text>`
    Send { room: String, text: String },
    /// `read <room>`
    Read { room: String },
    /// `typing <room>`
    Typing { room: String },
    /// `stop <room>`
    Stop { room: String },
    /// `who <room>`
    Who { room: String },
    /// `online`
    Online,
    /// `status`
    Status,
    /// `quit`
    Quit,
}

const USAGE: &str = "commands: send <room> <text> | read <room> | typing <room> | stop <room> | who <room> | online | status | quit";

impl Command {
    /// Parses a line. Blank lines yield `Ok(None)`; anything unrecognized
    /// yields the usage text.
    pub fn parse(line: &str) -> Result<Option<Self>, &'static str> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(None);
        }

        let (verb, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
        let rest = rest.trim();
        let room = || {
            let room = rest.split_whitespace().next().ok_or(USAGE)?;
            Ok::<String, &'static str>(room.to_string())
        };

        let command = match verb {
            "send" => {
                let (room, text) = rest.split_once(char::is_whitespace).ok_or(USAGE)?;
                Self::Send {
                    room: room.to_string(),
                    text: text.trim().to_string(),
                }
            }
            "read" => Self::Read { room: room()? },
            "typing" => Self::Typing { room: room()? },
            "stop" => Self::Stop { room: room()? },
            "who" => Self::Who { room: room()? },
            "online" => Self::Online,
            "status" => Self::Status,
            "quit" | "exit" => Self::Quit,
            _ => return Err(USAGE),
        };
        Ok(Some(command))
    }
}
