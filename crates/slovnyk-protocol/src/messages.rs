//! Wire command grammar and the tagged response shape.
//!
//! Every response is classified exactly once by [`Response::parse`]; callers
//! match on the variant instead of re-checking for separators.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{ProtocolError, FIELD_SEPARATOR, NOT_FOUND};

// ============================================================================
// Commands
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Command {
    /// `TRANSLATE|<word>|`
    Translate { word: String },
    /// `ADD|<ukrainian>|<english>`
    Add { ukrainian: String, english: String },
    /// `ADD_WORD|<word>|<definition>`
    AddWord { word: String, definition: String },
    /// `DELETE|<headword>|`
    Delete { headword: String },
    /// `UPDATE|<headword>|<new_definition>`
    Update { headword: String, definition: String },
    /// `GET_RANDOM|`
    GetRandom,
}

impl Command {
    pub fn verb(&self) -> &'static str {
        match self {
            Command::Translate { .. } => "TRANSLATE",
            Command::Add { .. } => "ADD",
            Command::AddWord { .. } => "ADD_WORD",
            Command::Delete { .. } => "DELETE",
            Command::Update { .. } => "UPDATE",
            Command::GetRandom => "GET_RANDOM",
        }
    }

    /// Verbs answered with `headword|definition` rather than a status.
    pub fn is_lookup(&self) -> bool {
        matches!(self, Command::Translate { .. } | Command::GetRandom)
    }

    /// Wire text without the line terminator.
    pub fn to_wire(&self) -> String {
        let verb = self.verb();
        match self {
            Command::Translate { word } => format!("{verb}|{word}|"),
            Command::Add { ukrainian, english } => format!("{verb}|{ukrainian}|{english}"),
            Command::AddWord { word, definition } => format!("{verb}|{word}|{definition}"),
            Command::Delete { headword } => format!("{verb}|{headword}|"),
            Command::Update {
                headword,
                definition,
            } => format!("{verb}|{headword}|{definition}"),
            Command::GetRandom => format!("{verb}|"),
        }
    }

    /// Reject field values the unescaped grammar cannot carry.
    ///
    /// A line break anywhere ends the command early on the server side. A
    /// separator is tolerated only in the trailing free-text field, which the
    /// server reads to the end of the line.
    pub fn validate(&self) -> Result<(), ProtocolError> {
        let verb = self.verb();
        let (keyed, free): (Vec<(&'static str, &str)>, Option<(&'static str, &str)>) = match self {
            Command::Translate { word } => (vec![("word", word.as_str())], None),
            Command::Add { ukrainian, english } => {
                (vec![("ukrainian", ukrainian.as_str())], Some(("english", english.as_str())))
            }
            Command::AddWord { word, definition } => {
                (vec![("word", word.as_str())], Some(("definition", definition.as_str())))
            }
            Command::Delete { headword } => (vec![("headword", headword.as_str())], None),
            Command::Update {
                headword,
                definition,
            } => (vec![("headword", headword.as_str())], Some(("definition", definition.as_str()))),
            Command::GetRandom => (Vec::new(), None),
        };

        for &(field, value) in keyed.iter().chain(free.iter()) {
            if value.contains(['\n', '\r']) {
                return Err(ProtocolError::InvalidField {
                    verb,
                    field,
                    reason: "line break",
                });
            }
        }
        for &(field, value) in &keyed {
            if value.trim().is_empty() {
                return Err(ProtocolError::InvalidField {
                    verb,
                    field,
                    reason: "empty",
                });
            }
            if value.contains(FIELD_SEPARATOR) {
                return Err(ProtocolError::InvalidField {
                    verb,
                    field,
                    reason: "contains separator",
                });
            }
        }
        Ok(())
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_wire())
    }
}

// ============================================================================
// Responses
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Status {
    Success,
    Error,
    Added,
    Exists,
    Yes,
    No,
}

impl Status {
    /// Bare status tokens. Matching ignores ASCII case; the server is not
    /// consistent about it.
    pub fn from_token(token: &str) -> Option<Self> {
        match token.trim().to_ascii_uppercase().as_str() {
            "SUCCESS" => Some(Status::Success),
            "ERROR" => Some(Status::Error),
            "ADDED" => Some(Status::Added),
            "EXIST" | "EXISTS" => Some(Status::Exists),
            "YES" => Some(Status::Yes),
            "NO" => Some(Status::No),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Success => "Success",
            Status::Error => "Error",
            Status::Added => "ADDED",
            Status::Exists => "EXIST",
            Status::Yes => "YES",
            Status::No => "NO",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Response {
    /// Nothing came back: every attempt failed.
    Empty,
    /// `NOT_FOUND` (or the lowercase variants older servers sent).
    NotFound,
    /// `Success`, `ADDED`, ... optionally followed by `|detail`.
    Status {
        status: Status,
        detail: Option<String>,
    },
    /// `headword|definition`. The definition may itself contain separators.
    Entry {
        headword: String,
        definition: String,
    },
    /// A payload with no separator that is not a known token.
    Text(String),
}

impl Response {
    /// Classify the reply to `command`. Lookups (`TRANSLATE`, `GET_RANDOM`)
    /// answer with entries; the write verbs answer with statuses.
    pub fn parse_reply(command: &Command, raw: &str) -> Self {
        if command.is_lookup() {
            Self::parse_lookup(raw)
        } else {
            Self::parse(raw)
        }
    }

    /// Reply to a write verb. `Success|detail` and `Error|detail` are
    /// statuses only with the server's exact spelling.
    pub fn parse(raw: &str) -> Self {
        let text = raw.trim();
        if text.is_empty() {
            return Response::Empty;
        }
        if is_not_found_token(text) {
            return Response::NotFound;
        }

        match text.split_once(FIELD_SEPARATOR) {
            None => match Status::from_token(text) {
                Some(status) => Response::Status {
                    status,
                    detail: None,
                },
                None => Response::Text(text.to_string()),
            },
            Some((head, rest)) => {
                let head = head.trim();
                let rest = rest.trim();
                let status = match head {
                    "Success" => Some(Status::Success),
                    "Error" => Some(Status::Error),
                    _ => None,
                };
                match status {
                    Some(status) => Response::Status {
                        status,
                        detail: (!rest.is_empty()).then(|| rest.to_string()),
                    },
                    None => split_entry(text, head, rest),
                }
            }
        }
    }

    /// Reply to a lookup. Anything with a separator is `headword|definition`
    /// split on the first `|`, whatever the headword is. A bare `error` means
    /// the word is unknown.
    pub fn parse_lookup(raw: &str) -> Self {
        let text = raw.trim();
        if text.is_empty() {
            return Response::Empty;
        }
        if is_not_found_token(text) || text.eq_ignore_ascii_case("error") {
            return Response::NotFound;
        }
        match text.split_once(FIELD_SEPARATOR) {
            Some((head, rest)) => split_entry(text, head.trim(), rest.trim()),
            None => Response::Text(text.to_string()),
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Response::Empty)
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Response::NotFound)
    }

    pub fn status(&self) -> Option<Status> {
        match self {
            Response::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

fn is_not_found_token(text: &str) -> bool {
    text == NOT_FOUND || matches!(text.to_lowercase().as_str(), "not found" | "notfound")
}

fn split_entry(text: &str, head: &str, rest: &str) -> Response {
    if head.is_empty() {
        return Response::Text(text.to_string());
    }
    Response::Entry {
        headword: head.to_string(),
        definition: rest.to_string(),
    }
}
