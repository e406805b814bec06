//! Connect/read/retry lifecycle around the device link.
//!
//! The lifecycle is a small state machine driven by [`LinkEvent`]s through the
//! [`TRANSITIONS`] table. Everything runs on the caller's thread: reads block up
//! to the link's own timeout and the retry countdown sleeps in short slices so
//! a pending [`CancelToken`] is observed promptly.

use crate::line_decoder::{DecodeIssue, LineDecoder};
use std::fmt;
use std::io::{self, Read};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

const READ_CHUNK_BYTES: usize = 256;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LinkError {
    /// The link could not be opened or was lost mid-session.
    #[error("link unavailable: {0}")]
    Unavailable(String),
    /// Any other failure while connected.
    #[error("{0}")]
    Unexpected(String),
    #[error("cancelled by user")]
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LinkState {
    Disconnected,
    Connecting,
    Connected,
    Retrying,
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LinkEvent {
    Connect,
    Opened,
    OpenFailed,
    LinkLost,
    Failed,
    ScheduleRetry,
    BackoffElapsed,
    Interrupted,
}

/// `(from, event, to)`. [`LinkEvent::Interrupted`] is accepted from every state.
pub const TRANSITIONS: &[(LinkState, LinkEvent, LinkState)] = &[
    (LinkState::Disconnected, LinkEvent::Connect, LinkState::Connecting),
    (LinkState::Connecting, LinkEvent::Opened, LinkState::Connected),
    (LinkState::Connecting, LinkEvent::OpenFailed, LinkState::Retrying),
    (LinkState::Connected, LinkEvent::LinkLost, LinkState::Disconnected),
    (LinkState::Connected, LinkEvent::Failed, LinkState::Disconnected),
    (LinkState::Disconnected, LinkEvent::ScheduleRetry, LinkState::Retrying),
    (LinkState::Retrying, LinkEvent::BackoffElapsed, LinkState::Connecting),
];

pub fn transition(from: LinkState, event: LinkEvent) -> Option<LinkState> {
    if from == LinkState::Cancelled {
        return None;
    }
    if event == LinkEvent::Interrupted {
        return Some(LinkState::Cancelled);
    }
    TRANSITIONS
        .iter()
        .find(|(state, on, _)| *state == from && *on == event)
        .map(|(_, _, to)| *to)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryReason {
    Unavailable,
    Unexpected(String),
}

impl RetryReason {
    fn from_error(err: &LinkError) -> Self {
        match err {
            LinkError::Unexpected(message) => RetryReason::Unexpected(first_line(message)),
            _ => RetryReason::Unavailable,
        }
    }
}

fn first_line(message: &str) -> String {
    message
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .unwrap_or("Unknown error")
        .to_string()
}

/// What the user should currently see on the status line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkStatus {
    Connecting { target: String },
    Connected,
    Retrying { reason: RetryReason, remaining_secs: u32 },
}

impl fmt::Display for LinkStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LinkStatus::Connecting { target } => write!(f, "Connecting to {target}..."),
            LinkStatus::Connected => Ok(()),
            LinkStatus::Retrying {
                reason: RetryReason::Unavailable,
                remaining_secs,
            } => write!(f, "Port unavailable. Retrying in {remaining_secs}s..."),
            LinkStatus::Retrying {
                reason: RetryReason::Unexpected(message),
                remaining_secs,
            } => write!(f, "Error: {message}. Retrying in {remaining_secs}s..."),
        }
    }
}

/// An open byte-stream link.
pub trait Link: Read {
    /// Drops whatever the device sent before we started listening.
    fn discard_input(&mut self) -> io::Result<()>;
}

pub trait LinkOpener {
    type Link: Link;

    /// Human readable address, e.g. `/dev/ttyACM0 @ 115200`.
    fn target(&self) -> String;

    fn open(&mut self) -> Result<Self::Link, LinkError>;
}

/// Receives decoded lines and status changes from the manager.
pub trait LineHandler {
    fn on_status(&mut self, status: &LinkStatus);

    fn on_line(&mut self, line: &str) -> Result<(), LinkError>;
}

#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Visible countdown length; one status update per second.
    pub countdown_secs: u32,
    /// Granularity at which cancellation is checked while waiting.
    pub poll: Duration,
}

impl RetryPolicy {
    pub fn new(countdown_secs: u32) -> Self {
        Self {
            countdown_secs: countdown_secs.max(1),
            ..Self::default()
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            countdown_secs: 5,
            poll: Duration::from_millis(100),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RetryState {
    /// Failed attempts since the last successful connect.
    pub attempts: u32,
    pub last_error: Option<LinkError>,
    pub sessions: u64,
}

pub struct ConnectionManager<O: LinkOpener> {
    opener: O,
    policy: RetryPolicy,
    cancel: CancelToken,
    decoder: LineDecoder,
    state: LinkState,
    retry: RetryState,
    sleep: fn(Duration),
}

impl<O: LinkOpener> ConnectionManager<O> {
    pub fn new(opener: O, policy: RetryPolicy, cancel: CancelToken) -> Self {
        Self {
            opener,
            policy,
            cancel,
            decoder: LineDecoder::default(),
            state: LinkState::Disconnected,
            retry: RetryState::default(),
            sleep: std::thread::sleep,
        }
    }

    pub fn with_sleep(mut self, sleep: fn(Duration)) -> Self {
        self.sleep = sleep;
        self
    }

    pub fn state(&self) -> LinkState {
        self.state
    }

    pub fn retry_state(&self) -> &RetryState {
        &self.retry
    }

    pub fn opener(&self) -> &O {
        &self.opener
    }

    /// Runs until cancelled. Link and decode failures never end the loop.
    pub fn run<H: LineHandler>(&mut self, handler: &mut H) {
        self.step(LinkEvent::Connect);
        loop {
            if self.cancel.is_cancelled() {
                self.step(LinkEvent::Interrupted);
                return;
            }

            handler.on_status(&LinkStatus::Connecting {
                target: self.opener.target(),
            });
            let link = match self.opener.open() {
                Ok(link) => link,
                Err(LinkError::Cancelled) => {
                    self.step(LinkEvent::Interrupted);
                    return;
                }
                Err(err) => {
                    warn!("link_open_failed: {err}");
                    self.step(LinkEvent::OpenFailed);
                    if !self.backoff(handler, err) {
                        return;
                    }
                    continue;
                }
            };

            self.step(LinkEvent::Opened);
            self.retry.attempts = 0;
            self.retry.sessions += 1;
            info!("link_connected: {}", self.opener.target());

            // The link is moved into the session and dropped on every exit path.
            let err = self.session(link, handler);
            if err == LinkError::Cancelled {
                self.step(LinkEvent::Interrupted);
                return;
            }
            match &err {
                LinkError::Unexpected(message) => {
                    warn!("link_session_failed: {message}");
                    self.step(LinkEvent::Failed);
                }
                _ => {
                    warn!("link_lost: {err}");
                    self.step(LinkEvent::LinkLost);
                }
            }
            self.step(LinkEvent::ScheduleRetry);
            if !self.backoff(handler, err) {
                return;
            }
        }
    }

    fn session<H: LineHandler>(&mut self, mut link: O::Link, handler: &mut H) -> LinkError {
        self.decoder.reset();
        if let Err(err) = link.discard_input() {
            return LinkError::Unavailable(err.to_string());
        }
        handler.on_status(&LinkStatus::Connected);

        let mut buf = [0u8; READ_CHUNK_BYTES];
        loop {
            if self.cancel.is_cancelled() {
                return LinkError::Cancelled;
            }
            let read = match link.read(&mut buf) {
                Ok(0) => return LinkError::Unavailable("link closed".to_string()),
                Ok(read) => read,
                Err(err) => match err.kind() {
                    io::ErrorKind::TimedOut
                    | io::ErrorKind::WouldBlock
                    | io::ErrorKind::Interrupted => continue,
                    _ => return LinkError::Unavailable(err.to_string()),
                },
            };

            let report = self.decoder.push_chunk(&buf[..read]);
            for issue in &report.issues {
                log_issue(issue);
            }
            for line in &report.lines {
                debug!("link_line: {line:?}");
                if let Err(err) = handler.on_line(line) {
                    return err;
                }
            }
        }
    }

    /// Shows the countdown and waits. Returns `false` if cancelled meanwhile.
    fn backoff<H: LineHandler>(&mut self, handler: &mut H, err: LinkError) -> bool {
        self.retry.attempts += 1;
        let reason = RetryReason::from_error(&err);
        self.retry.last_error = Some(err);

        for remaining_secs in (1..=self.policy.countdown_secs).rev() {
            if self.cancel.is_cancelled() {
                self.step(LinkEvent::Interrupted);
                return false;
            }
            handler.on_status(&LinkStatus::Retrying {
                reason: reason.clone(),
                remaining_secs,
            });
            if !self.wait(Duration::from_secs(1)) {
                self.step(LinkEvent::Interrupted);
                return false;
            }
        }
        self.step(LinkEvent::BackoffElapsed);
        true
    }

    fn wait(&self, total: Duration) -> bool {
        let mut left = total;
        while !left.is_zero() {
            if self.cancel.is_cancelled() {
                return false;
            }
            let slice = left.min(self.policy.poll.max(Duration::from_millis(1)));
            (self.sleep)(slice);
            left = left.saturating_sub(slice);
        }
        !self.cancel.is_cancelled()
    }

    fn step(&mut self, event: LinkEvent) {
        match transition(self.state, event) {
            Some(next) => {
                debug!("link_transition: {:?} -> {next:?} on {event:?}", self.state);
                self.state = next;
            }
            None => warn!("link_transition_rejected: {:?} on {event:?}", self.state),
        }
    }
}

fn log_issue(issue: &DecodeIssue) {
    match issue {
        DecodeIssue::InvalidUtf8 { .. } => debug!("line_decode_issue: {issue}"),
        DecodeIssue::Oversized { .. } => warn!("line_decode_issue: {issue}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_follows_connect_read_retry_cycle() {
        let mut state = LinkState::Disconnected;
        for (event, expected) in [
            (LinkEvent::Connect, LinkState::Connecting),
            (LinkEvent::OpenFailed, LinkState::Retrying),
            (LinkEvent::BackoffElapsed, LinkState::Connecting),
            (LinkEvent::Opened, LinkState::Connected),
            (LinkEvent::LinkLost, LinkState::Disconnected),
            (LinkEvent::ScheduleRetry, LinkState::Retrying),
            (LinkEvent::BackoffElapsed, LinkState::Connecting),
        ] {
            state = transition(state, event).expect("valid transition");
            assert_eq!(state, expected);
        }
    }

    #[test]
    fn interrupt_is_accepted_from_every_live_state() {
        for state in [
            LinkState::Disconnected,
            LinkState::Connecting,
            LinkState::Connected,
            LinkState::Retrying,
        ] {
            assert_eq!(
                transition(state, LinkEvent::Interrupted),
                Some(LinkState::Cancelled)
            );
        }
        assert_eq!(transition(LinkState::Cancelled, LinkEvent::Connect), None);
    }

    #[test]
    fn lost_link_never_jumps_straight_to_connecting() {
        assert_eq!(transition(LinkState::Connected, LinkEvent::BackoffElapsed), None);
        assert_eq!(transition(LinkState::Disconnected, LinkEvent::Opened), None);
    }

    #[test]
    fn status_text_matches_status_line() {
        let connecting = LinkStatus::Connecting {
            target: "/dev/ttyACM0 @ 115200".to_string(),
        };
        assert_eq!(connecting.to_string(), "Connecting to /dev/ttyACM0 @ 115200...");
        assert_eq!(LinkStatus::Connected.to_string(), "");
        let unavailable = LinkStatus::Retrying {
            reason: RetryReason::Unavailable,
            remaining_secs: 3,
        };
        assert_eq!(unavailable.to_string(), "Port unavailable. Retrying in 3s...");
    }

    #[test]
    fn unexpected_reason_keeps_first_message_line() {
        let reason =
            RetryReason::from_error(&LinkError::Unexpected("\nrender failed\ndetails".into()));
        assert_eq!(reason, RetryReason::Unexpected("render failed".to_string()));
        let blank = RetryReason::from_error(&LinkError::Unexpected(String::new()));
        let status = LinkStatus::Retrying {
            reason: blank,
            remaining_secs: 1,
        };
        assert_eq!(status.to_string(), "Error: Unknown error. Retrying in 1s...");
    }

    #[test]
    fn policy_clamps_countdown_to_at_least_one_second() {
        assert_eq!(RetryPolicy::new(0).countdown_secs, 1);
        assert_eq!(RetryPolicy::new(7).countdown_secs, 7);
    }

    #[test]
    fn cancel_token_is_shared_between_clones() {
        let token = CancelToken::new();
        let clone = token.clone();
        assert!(!token.is_cancelled());
        clone.cancel();
        assert!(token.is_cancelled());
    }
}
