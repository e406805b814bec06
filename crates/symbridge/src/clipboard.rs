use std::process::{Command, Output};
use symbridge_core::{ClipboardBridge, ClipboardError};

/// Program plus arguments that emit a paste keystroke into the focused app.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PasteCommand {
    program: String,
    args: Vec<String>,
}

impl PasteCommand {
    pub fn from_words(mut words: Vec<String>) -> Option<Self> {
        if words.is_empty() {
            return None;
        }
        let program = words.remove(0);
        Some(Self {
            program,
            args: words,
        })
    }

    pub fn platform_default() -> Option<Self> {
        let words: Vec<&str> = if cfg!(target_os = "macos") {
            vec![
                "osascript",
                "-e",
                "tell application \"System Events\" to keystroke \"v\" using command down",
            ]
        } else if cfg!(windows) {
            vec![
                "powershell",
                "-NoProfile",
                "-Command",
                "(New-Object -ComObject WScript.Shell).SendKeys('^v')",
            ]
        } else if cfg!(unix) {
            vec!["xdotool", "key", "--clearmodifiers", "ctrl+v"]
        } else {
            Vec::new()
        };
        Self::from_words(words.iter().map(|word| word.to_string()).collect())
    }

    pub fn run(&self) -> Result<(), ClipboardError> {
        let output = Command::new(&self.program)
            .args(&self.args)
            .output()
            .map_err(|err| ClipboardError::Paste(format!("{}: {err}", self.program)))?;
        if output.status.success() {
            return Ok(());
        }
        Err(ClipboardError::Paste(command_error(&self.program, &output)))
    }
}

fn command_error(program: &str, output: &Output) -> String {
    let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
    if stderr.is_empty() {
        format!("{program} exited with status {}", output.status)
    } else {
        stderr
    }
}

/// System clipboard via arboard, opened lazily and kept alive so the
/// contents survive on platforms where the owner must stay running.
#[derive(Default)]
pub struct SystemClipboard {
    inner: Option<arboard::Clipboard>,
    paste: Option<PasteCommand>,
}

impl SystemClipboard {
    pub fn new(paste: Option<PasteCommand>) -> Self {
        Self { inner: None, paste }
    }

    fn ensure(&mut self) -> Result<&mut arboard::Clipboard, ClipboardError> {
        let clipboard = match self.inner.take() {
            Some(clipboard) => clipboard,
            None => arboard::Clipboard::new()
                .map_err(|err| ClipboardError::Clipboard(err.to_string()))?,
        };
        Ok(self.inner.insert(clipboard))
    }
}

impl ClipboardBridge for SystemClipboard {
    fn deliver(&mut self, symbol: &str) -> Result<(), ClipboardError> {
        self.ensure()?
            .set_text(symbol.to_string())
            .map_err(|err| ClipboardError::Clipboard(err.to_string()))?;
        match &self.paste {
            Some(paste) => paste.run(),
            None => Ok(()),
        }
    }
}
