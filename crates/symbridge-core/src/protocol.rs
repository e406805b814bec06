//! Line protocol spoken by the symbol menu firmware.
//!
//! Each line is plain text. Two prefixes carry meaning:
//!
//! - `SYMBOL_IDX:<symbol>` reports the highlighted catalog entry.
//! - `SYMBOL_SENT:<symbol>` reports a send action; `--` means "cleared".
//!
//! Anything else is ignored by the state logic.

use std::fmt;

pub const TRIGGER_SELECTION: &str = "SYMBOL_IDX:";
pub const TRIGGER_SEND: &str = "SYMBOL_SENT:";
/// Send payload meaning "nothing copied".
pub const CLEAR_SENTINEL: &str = "--";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Trigger {
    Selection,
    Send,
}

impl Trigger {
    /// Triggers in match priority order.
    pub const ALL: [Trigger; 2] = [Trigger::Selection, Trigger::Send];

    pub fn prefix(self) -> &'static str {
        match self {
            Trigger::Selection => TRIGGER_SELECTION,
            Trigger::Send => TRIGGER_SEND,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Trigger::Selection => "IDX",
            Trigger::Send => "SENT",
        }
    }
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendPayload {
    Clear,
    Symbol(String),
}

impl SendPayload {
    pub fn symbol(&self) -> Option<&str> {
        match self {
            SendPayload::Clear => None,
            SendPayload::Symbol(symbol) => Some(symbol),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    SelectionUpdate(String),
    Send(SendPayload),
    /// A recognized trigger without a payload token.
    Empty(Trigger),
    Unrecognized(String),
}

impl Message {
    pub fn trigger(&self) -> Option<Trigger> {
        match self {
            Message::SelectionUpdate(_) => Some(Trigger::Selection),
            Message::Send(_) => Some(Trigger::Send),
            Message::Empty(trigger) => Some(*trigger),
            Message::Unrecognized(_) => None,
        }
    }
}

/// Classifies one trimmed line.
pub fn interpret(line: &str) -> Message {
    for trigger in Trigger::ALL {
        if !line.starts_with(trigger.prefix()) {
            continue;
        }
        // Both prefixes end in ':', so the first colon is the trigger's own.
        let Some(payload) = extract_payload(line) else {
            return Message::Empty(trigger);
        };
        return match trigger {
            Trigger::Selection => Message::SelectionUpdate(payload.to_string()),
            Trigger::Send if payload == CLEAR_SENTINEL => Message::Send(SendPayload::Clear),
            Trigger::Send => Message::Send(SendPayload::Symbol(payload.to_string())),
        };
    }
    Message::Unrecognized(line.to_string())
}

/// First whitespace-delimited token after the first colon.
pub fn extract_payload(line: &str) -> Option<&str> {
    let (_, rhs) = line.split_once(':')?;
    first_token(rhs)
}

fn first_token(text: &str) -> Option<&str> {
    text.split_whitespace().next()
}
