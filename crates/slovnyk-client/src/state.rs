//! Exchange state machine -- one instance per `send_command` call.
//!
//! Idle → Connecting → Sending → Receiving → Done, with Failed reachable
//! from every state but Done and leading back into Connecting or Sending on
//! the next attempt. Every transition is logged.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExchangeState {
    Idle,
    Connecting,
    Sending,
    Receiving,
    Failed,
    Done,
}

impl ExchangeState {
    pub fn name(&self) -> &'static str {
        match self {
            ExchangeState::Idle => "idle",
            ExchangeState::Connecting => "connecting",
            ExchangeState::Sending => "sending",
            ExchangeState::Receiving => "receiving",
            ExchangeState::Failed => "failed",
            ExchangeState::Done => "done",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, ExchangeState::Done)
    }

    /// Whether `next` is a legal successor of `self`.
    pub fn can_advance(&self, next: ExchangeState) -> bool {
        use ExchangeState::*;
        matches!(
            (self, next),
            (Idle | Failed, Connecting)
                | (Idle | Failed | Connecting, Sending)
                | (Idle | Failed | Connecting | Sending | Receiving, Failed)
                | (Sending, Receiving)
                | (Receiving, Done)
        )
    }
}

/// Tracks the progress of a single request across its attempts.
#[derive(Debug)]
pub struct Exchange {
    verb: String,
    state: ExchangeState,
    attempt: u32,
    history: Vec<ExchangeState>,
}

impl Exchange {
    pub fn new(verb: impl Into<String>) -> Self {
        Self {
            verb: verb.into(),
            state: ExchangeState::Idle,
            attempt: 0,
            history: vec![ExchangeState::Idle],
        }
    }

    pub fn state(&self) -> ExchangeState {
        self.state
    }

    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    /// States visited so far, in order.
    pub fn history(&self) -> &[ExchangeState] {
        &self.history
    }

    pub fn begin_attempt(&mut self, attempt: u32) {
        self.attempt = attempt;
    }

    pub fn advance(&mut self, next: ExchangeState) {
        if !self.state.can_advance(next) {
            tracing::warn!(
                verb = %self.verb,
                attempt = self.attempt,
                from = self.state.name(),
                to = next.name(),
                "unexpected exchange transition"
            );
        }
        tracing::debug!(
            verb = %self.verb,
            attempt = self.attempt,
            from = self.state.name(),
            to = next.name(),
            "exchange transition"
        );
        self.state = next;
        self.history.push(next);
    }
}
