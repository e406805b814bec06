use crate::latch::Latch;
use crate::link::{LineHandler, LinkError, LinkStatus};
use crate::mirror::MirrorState;
use crate::protocol::{interpret, Message};
use crate::render::{Renderer, ROW_DEBUG_CLASS, ROW_DEBUG_RAW};
use std::io::{self, Write};
use thiserror::Error;
use tracing::{debug, warn};

const LABEL_SELECTION: &str = "Menu update";
const LABEL_SEND: &str = "Menu + copy update";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClipboardError {
    #[error("clipboard error: {0}")]
    Clipboard(String),
    #[error("paste keystroke failed: {0}")]
    Paste(String),
}

/// Places a symbol on the host clipboard, optionally pasting it.
pub trait ClipboardBridge {
    fn deliver(&mut self, symbol: &str) -> Result<(), ClipboardError>;
}

/// Applies decoded lines to the mirror and keeps the view current.
pub struct SymbolSession<W: Write, C: ClipboardBridge> {
    renderer: Renderer<W>,
    state: MirrorState,
    clipboard: C,
    latch: Latch,
    debug: bool,
}

impl<W: Write, C: ClipboardBridge> SymbolSession<W, C> {
    pub fn new(renderer: Renderer<W>, clipboard: C) -> Self {
        let state = MirrorState::new(renderer.catalog());
        Self {
            renderer,
            state,
            clipboard,
            latch: Latch::new(),
            debug: false,
        }
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Clears the screen and draws the assumed boot state.
    pub fn start(&mut self) -> io::Result<()> {
        self.renderer.clear_screen()?;
        self.renderer.draw(&self.state)
    }

    pub fn handle_line(&mut self, line: &str) -> io::Result<()> {
        if self.debug {
            self.renderer
                .debug_row(ROW_DEBUG_RAW, &format!("RAW: {line:?}"))?;
        }

        let message = interpret(line);
        match &message {
            Message::SelectionUpdate(symbol) => {
                self.latch.start();
                let change = self.state.apply_selection(symbol);
                self.renderer.draw(&self.state)?;
                if let Some(measurement) = self.latch.stop(LABEL_SELECTION) {
                    self.renderer.draw_timing(&measurement)?;
                }
                if change.changed() {
                    debug!("selection_changed: {} -> {}", change.previous, change.current);
                }
            }
            Message::Send(payload) => {
                self.latch.start();
                let change = self.state.apply_send(payload);
                self.renderer.draw(&self.state)?;
                if let Some(measurement) = self.latch.stop(LABEL_SEND) {
                    self.renderer.draw_timing(&measurement)?;
                }
                if change.changed() {
                    debug!("copied_changed: {:?} -> {:?}", change.previous, change.current);
                }
                // Outside the measured interval.
                if let Some(symbol) = payload.symbol() {
                    if let Err(err) = self.clipboard.deliver(symbol) {
                        warn!("clipboard_deliver_failed: {err}");
                    }
                }
            }
            Message::Empty(trigger) => debug!("empty_payload: {trigger}"),
            Message::Unrecognized(_) => {}
        }

        if self.debug {
            let class = match message.trigger() {
                Some(trigger) => format!("{trigger} handled"),
                None => "Unknown message (ignored)".to_string(),
            };
            self.renderer.debug_row(ROW_DEBUG_CLASS, &class)?;
        }
        Ok(())
    }

    pub fn farewell(&mut self) -> io::Result<()> {
        self.renderer.farewell()
    }

    pub fn state(&self) -> &MirrorState {
        &self.state
    }

    pub fn renderer(&self) -> &Renderer<W> {
        &self.renderer
    }

    pub fn clipboard(&self) -> &C {
        &self.clipboard
    }
}

impl<W: Write, C: ClipboardBridge> LineHandler for SymbolSession<W, C> {
    fn on_status(&mut self, status: &LinkStatus) {
        if let Err(err) = self.renderer.status(&status.to_string()) {
            warn!("status_render_failed: {err}");
        }
    }

    fn on_line(&mut self, line: &str) -> Result<(), LinkError> {
        self.handle_line(line)
            .map_err(|err| LinkError::Unexpected(format!("render failed: {err}")))
    }
}
