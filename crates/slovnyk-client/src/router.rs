//! Verb wrappers over a [`Transport`].
//!
//! Each wrapper builds the fixed wire text for its verb and returns exactly
//! what the transport returned, including `""` for "nothing came back".

use slovnyk_protocol::{Command, Response};

use crate::Transport;

pub trait Router: Transport {
    /// Send a typed command and parse the reply once.
    fn request(&self, command: &Command) -> Response {
        if let Err(e) = command.validate() {
            tracing::warn!(verb = command.verb(), error = %e, "sending command with unsafe field");
        }
        Response::parse_reply(command, &self.send_command(&command.to_wire()))
    }

    fn translate(&self, word: &str) -> String {
        self.send_command(&format!("TRANSLATE|{word}|"))
    }

    fn add(&self, ukrainian: &str, english: &str) -> String {
        self.send_command(&format!("ADD|{ukrainian}|{english}"))
    }

    fn add_word(&self, word: &str, definition: &str) -> String {
        self.send_command(&format!("ADD_WORD|{word}|{definition}"))
    }

    fn delete_word(&self, headword: &str) -> String {
        self.send_command(&format!("DELETE|{headword}|"))
    }

    fn update_word(&self, headword: &str, definition: &str) -> String {
        self.send_command(&format!("UPDATE|{headword}|{definition}"))
    }

    fn random_word(&self) -> String {
        self.send_command("GET_RANDOM|")
    }
}

impl<T: Transport + ?Sized> Router for T {}
