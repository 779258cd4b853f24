use std::io::BufRead;
use std::sync::mpsc;
use std::thread;

use scrape_core::Msg;

pub const HELP: &str = "Commands: cancel, open, reset, start, quit";

/// Operator input read from stdin, one word per line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Start,
    Cancel,
    Open,
    Reset,
    Quit,
}

impl Command {
    pub fn parse(line: &str) -> Option<Command> {
        let word = line.trim().to_ascii_lowercase();
        match word.as_str() {
            "start" | "run" => Some(Command::Start),
            "cancel" | "stop" => Some(Command::Cancel),
            "open" => Some(Command::Open),
            "reset" | "clear" => Some(Command::Reset),
            "quit" | "exit" | "q" => Some(Command::Quit),
            _ => None,
        }
    }

    /// Core message for commands that map onto one; `Start` and `Quit` are
    /// handled by the loop.
    pub fn msg(self) -> Option<Msg> {
        match self {
            Command::Cancel => Some(Msg::CancelRequested),
            Command::Open => Some(Msg::OpenArtifactRequested),
            Command::Reset => Some(Msg::ResetRequested),
            Command::Start | Command::Quit => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    Command(Command),
    Unknown(String),
}

/// Reads stdin on a background thread. The channel disconnects at EOF.
pub fn spawn_stdin_reader() -> mpsc::Receiver<Input> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else { break };
            if line.trim().is_empty() {
                continue;
            }
            let input = match Command::parse(&line) {
                Some(command) => Input::Command(command),
                None => Input::Unknown(line.trim().to_string()),
            };
            if tx.send(input).is_err() {
                break;
            }
        }
    });
    rx
}
