//! Fixed-row terminal view.
//!
//! Every write positions the cursor on an absolute row and clears to the end
//! of that line first, so the view never scrolls and a shorter redraw never
//! leaves stale characters behind.

use crate::catalog::SymbolCatalog;
use crate::latch::Measurement;
use crate::mirror::MirrorState;
use crossterm::{
    cursor::MoveTo,
    queue,
    style::Print,
    terminal::{Clear, ClearType},
};
use std::io::{self, Write};

pub const ROW_LIBRARY: u16 = 0;
pub const ROW_COPIED: u16 = 1;
pub const ROW_TIMING: u16 = 2;
pub const ROW_STATUS: u16 = 3;
pub const ROW_DEBUG_RAW: u16 = 5;
pub const ROW_DEBUG_CLASS: u16 = 6;
const ROW_FAREWELL: u16 = 8;

pub const LIBRARY_LABEL: &str = "Symbol Library: ";
pub const COPIED_LABEL: &str = "Currently Copied Symbol: ";
pub const EMPTY_PLACEHOLDER: &str = "—";

pub struct Renderer<W: Write> {
    out: W,
    catalog: SymbolCatalog,
    show_timing: bool,
}

impl<W: Write> Renderer<W> {
    pub fn new(out: W, catalog: SymbolCatalog) -> Self {
        Self {
            out,
            catalog,
            show_timing: true,
        }
    }

    pub fn with_timing(mut self, show_timing: bool) -> Self {
        self.show_timing = show_timing;
        self
    }

    pub fn catalog(&self) -> &SymbolCatalog {
        &self.catalog
    }

    pub fn clear_screen(&mut self) -> io::Result<()> {
        queue!(self.out, Clear(ClearType::All), MoveTo(0, 0))?;
        self.out.flush()
    }

    pub fn draw(&mut self, state: &MirrorState) -> io::Result<()> {
        let library = library_line(&self.catalog, state.selection());
        let copied = copied_line(state.copied());
        self.put_row(ROW_LIBRARY, &library)?;
        self.put_row(ROW_COPIED, &copied)?;
        self.out.flush()
    }

    pub fn draw_timing(&mut self, measurement: &Measurement) -> io::Result<()> {
        if !self.show_timing {
            return Ok(());
        }
        self.put_row(ROW_TIMING, &measurement.to_string())?;
        self.out.flush()
    }

    /// Connection status line. An empty string clears it.
    pub fn status(&mut self, text: &str) -> io::Result<()> {
        self.put_row(ROW_STATUS, text)?;
        self.out.flush()
    }

    pub fn debug_row(&mut self, row: u16, text: &str) -> io::Result<()> {
        self.put_row(row, text)?;
        self.out.flush()
    }

    pub fn farewell(&mut self) -> io::Result<()> {
        queue!(self.out, MoveTo(0, ROW_FAREWELL), Print("Exiting.\r\n"))?;
        self.out.flush()
    }

    pub fn writer(&self) -> &W {
        &self.out
    }

    fn put_row(&mut self, row: u16, text: &str) -> io::Result<()> {
        queue!(
            self.out,
            MoveTo(0, row),
            Clear(ClearType::UntilNewLine),
            Print(text)
        )
    }
}

/// Row 1: every catalog symbol in order, the selected one bracketed.
pub fn library_line(catalog: &SymbolCatalog, selection: &str) -> String {
    let selected = catalog.position(selection);
    let symbols: Vec<String> = catalog
        .iter()
        .enumerate()
        .map(|(idx, symbol)| {
            if Some(idx) == selected {
                format!("[{symbol}]")
            } else {
                symbol.to_string()
            }
        })
        .collect();
    format!("{LIBRARY_LABEL}{}", symbols.join(" "))
}

/// Row 2: the last copied symbol or the empty placeholder.
pub fn copied_line(copied: Option<&str>) -> String {
    format!("{COPIED_LABEL}{}", copied.unwrap_or(EMPTY_PLACEHOLDER))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::SendPayload;
    use std::time::Duration;

    fn rendered(renderer: &Renderer<Vec<u8>>) -> String {
        String::from_utf8_lossy(renderer.writer()).to_string()
    }

    #[test]
    fn library_line_brackets_selection_at_its_position() {
        let catalog = SymbolCatalog::default();
        assert_eq!(
            library_line(&catalog, "∑"),
            "Symbol Library: π [∑] µ Ω ∫"
        );
        for (idx, symbol) in catalog.iter().enumerate() {
            let line = library_line(&catalog, symbol);
            assert_eq!(line.matches('[').count(), 1);
            let body = line.trim_start_matches(LIBRARY_LABEL);
            let tokens: Vec<&str> = body.split(' ').collect();
            assert_eq!(tokens[idx], format!("[{symbol}]"));
        }
    }

    #[test]
    fn unknown_selection_renders_without_brackets() {
        let catalog = SymbolCatalog::default();
        assert_eq!(library_line(&catalog, "λ"), "Symbol Library: π ∑ µ Ω ∫");
    }

    #[test]
    fn copied_line_uses_placeholder_when_empty() {
        assert_eq!(copied_line(None), "Currently Copied Symbol: —");
        assert_eq!(copied_line(Some("µ")), "Currently Copied Symbol: µ");
    }

    #[test]
    fn draw_positions_rows_and_clears_each_line() {
        let catalog = SymbolCatalog::default();
        let mut state = MirrorState::new(&catalog);
        state.apply_send(&SendPayload::Symbol("Ω".to_string()));
        let mut renderer = Renderer::new(Vec::new(), catalog);
        renderer.draw(&state).expect("draw");

        let out = rendered(&renderer);
        assert_eq!(
            out,
            "\x1b[1;1H\x1b[KSymbol Library: [π] ∑ µ Ω ∫\x1b[2;1H\x1b[KCurrently Copied Symbol: Ω"
        );
        assert!(!out.contains('\n'));
    }

    #[test]
    fn timing_row_respects_toggle() {
        let measurement = Measurement {
            label: "Menu update",
            elapsed: Duration::from_micros(500),
        };
        let mut shown = Renderer::new(Vec::new(), SymbolCatalog::default());
        shown.draw_timing(&measurement).expect("timing");
        assert_eq!(rendered(&shown), "\x1b[3;1H\x1b[KMenu update: 0.500 ms");

        let mut hidden = Renderer::new(Vec::new(), SymbolCatalog::default()).with_timing(false);
        hidden.draw_timing(&measurement).expect("timing");
        assert!(hidden.writer().is_empty());
    }

    #[test]
    fn status_writes_row_four() {
        let mut renderer = Renderer::new(Vec::new(), SymbolCatalog::default());
        renderer.status("").expect("status");
        assert_eq!(rendered(&renderer), "\x1b[4;1H\x1b[K");
    }
}
