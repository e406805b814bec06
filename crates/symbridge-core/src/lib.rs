//! Host-side mirror of a microcontroller symbol menu.
//!
//! The device reports its highlighted catalog entry and every "send" action as
//! plain text lines over a serial link. This crate decodes those lines, keeps a
//! small mirrored state, redraws a fixed-row terminal view and drives the
//! connect/read/retry lifecycle around the link. OS integrations (the serial
//! device itself, the clipboard) plug in through [`link::LinkOpener`] and
//! [`session::ClipboardBridge`].

pub mod catalog;
pub mod latch;
pub mod line_decoder;
pub mod link;
pub mod mirror;
pub mod protocol;
pub mod render;
pub mod session;

pub use catalog::{CatalogError, SymbolCatalog, DEFAULT_SYMBOLS};
pub use latch::{Latch, Measurement};
pub use line_decoder::{DecodeIssue, LineDecoder};
pub use link::{
    CancelToken, ConnectionManager, LineHandler, Link, LinkError, LinkEvent, LinkOpener, LinkState,
    LinkStatus, RetryPolicy, RetryReason, RetryState,
};
pub use mirror::{MirrorState, StateChange};
pub use protocol::{interpret, Message, SendPayload, Trigger};
pub use render::Renderer;
pub use session::{ClipboardBridge, ClipboardError, SymbolSession};
