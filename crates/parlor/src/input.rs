/// A line typed by the user.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Input {
    /// Text for the active assistant.
    Turn(String),
    /// `/use <label>`: switch to another assistant.
    Use(String),
    /// `/start`: let the assistant open the conversation.
    Start,
    /// `/clear`: forget the active conversation.
    Clear,
    /// `/list`: show the configured assistants.
    List,
    /// `/help`
    Help,
    /// `/quit`
    Quit,
    /// A command we don't know, or one missing its argument.
    Unknown(String),
}

impl Input {
    /// Help text listing the commands.
    pub const HELP: &'static str = "\
/use <label>  switch to another assistant
/start        let the assistant open the conversation
/clear        forget the conversation with the active assistant
/list         show the configured assistants
/quit         leave";

    /// Parses a line. Anything not starting with `/` is a turn.
    pub fn parse(line: &str) -> Self {
        let line = line.trim();
        let Some(command) = line.strip_prefix('/') else {
            return Self::Turn(line.to_owned());
        };
        let (name, arg) = match command.split_once(char::is_whitespace) {
            Some((name, arg)) => (name, arg.trim()),
            None => (command, ""),
        };
        match (name, arg) {
            ("use", "") => Self::Unknown(line.to_owned()),
            ("use", label) => Self::Use(label.to_owned()),
            ("start", _) => Self::Start,
            ("clear", _) => Self::Clear,
            ("list", _) => Self::List,
            ("help", _) => Self::Help,
            ("quit" | "exit", _) => Self::Quit,
            _ => Self::Unknown(line.to_owned()),
        }
    }
}
