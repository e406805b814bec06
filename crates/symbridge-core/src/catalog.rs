use std::fmt;
use thiserror::Error;

/// Symbols in the device's menu enumeration order.
pub const DEFAULT_SYMBOLS: [&str; 5] = ["π", "∑", "µ", "Ω", "∫"];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CatalogError {
    #[error("symbol catalog must contain at least one symbol")]
    Empty,
    #[error("symbol catalog entry {index} is blank")]
    BlankEntry { index: usize },
}

/// Ordered symbol tokens shared out-of-band with the firmware.
///
/// The position of each token must equal the device's internal index, otherwise
/// the highlight lands on the wrong entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolCatalog {
    symbols: Vec<String>,
}

impl SymbolCatalog {
    pub fn new<I, S>(symbols: I) -> Result<Self, CatalogError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let symbols: Vec<String> = symbols.into_iter().map(Into::into).collect();
        if symbols.is_empty() {
            return Err(CatalogError::Empty);
        }
        if let Some(index) = symbols.iter().position(|symbol| symbol.trim().is_empty()) {
            return Err(CatalogError::BlankEntry { index });
        }
        Ok(Self { symbols })
    }

    /// First entry; the device is assumed to boot with it highlighted.
    pub fn first(&self) -> &str {
        &self.symbols[0]
    }

    pub fn position(&self, symbol: &str) -> Option<usize> {
        self.symbols.iter().position(|entry| entry == symbol)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.symbols.iter().map(String::as_str)
    }
}

impl Default for SymbolCatalog {
    fn default() -> Self {
        Self {
            symbols: DEFAULT_SYMBOLS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl fmt::Display for SymbolCatalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.symbols.join(" "))
    }
}
