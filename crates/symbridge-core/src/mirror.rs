use crate::catalog::SymbolCatalog;
use crate::protocol::SendPayload;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateChange<T> {
    pub previous: T,
    pub current: T,
}

impl<T: PartialEq> StateChange<T> {
    pub fn changed(&self) -> bool {
        self.previous != self.current
    }
}

/// Host copy of the device's selection and of the last copied symbol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MirrorState {
    selection: String,
    copied: Option<String>,
}

impl MirrorState {
    /// Starts on the first catalog entry until the device reports otherwise.
    pub fn new(catalog: &SymbolCatalog) -> Self {
        Self {
            selection: catalog.first().to_string(),
            copied: None,
        }
    }

    pub fn selection(&self) -> &str {
        &self.selection
    }

    pub fn copied(&self) -> Option<&str> {
        self.copied.as_deref()
    }

    /// No catalog check here; unknown symbols just render without a highlight.
    pub fn apply_selection(&mut self, symbol: &str) -> StateChange<String> {
        let previous = std::mem::replace(&mut self.selection, symbol.to_string());
        StateChange {
            previous,
            current: self.selection.clone(),
        }
    }

    pub fn apply_send(&mut self, payload: &SendPayload) -> StateChange<Option<String>> {
        let next = payload.symbol().map(str::to_string);
        let previous = std::mem::replace(&mut self.copied, next);
        StateChange {
            previous,
            current: self.copied.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_on_first_catalog_entry_with_nothing_copied() {
        let state = MirrorState::new(&SymbolCatalog::default());
        assert_eq!(state.selection(), "π");
        assert_eq!(state.copied(), None);
    }

    #[test]
    fn selection_accepts_symbols_outside_catalog() {
        let mut state = MirrorState::new(&SymbolCatalog::default());
        let change = state.apply_selection("λ");
        assert_eq!(change.previous, "π");
        assert_eq!(change.current, "λ");
        assert!(change.changed());
        assert_eq!(state.selection(), "λ");
    }

    #[test]
    fn send_sets_then_clears_copy() {
        let mut state = MirrorState::new(&SymbolCatalog::default());
        let change = state.apply_send(&SendPayload::Symbol("µ".to_string()));
        assert_eq!(change.previous, None);
        assert_eq!(change.current.as_deref(), Some("µ"));

        let change = state.apply_send(&SendPayload::Clear);
        assert_eq!(change.previous.as_deref(), Some("µ"));
        assert_eq!(change.current, None);
        assert_eq!(state.copied(), None);
    }

    #[test]
    fn repeated_send_is_idempotent() {
        let mut state = MirrorState::new(&SymbolCatalog::default());
        let payload = SendPayload::Symbol("Ω".to_string());
        state.apply_send(&payload);
        let after_first = state.clone();
        let change = state.apply_send(&payload);
        assert!(!change.changed());
        assert_eq!(state, after_first);
    }
}
