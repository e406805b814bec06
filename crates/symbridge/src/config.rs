use anyhow::{Context, Result};
use clap::Parser;
use serde::Deserialize;
use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};
use symbridge_core::SymbolCatalog;

const DEFAULT_BAUD: u32 = 115_200;
const DEFAULT_READ_TIMEOUT_MS: u64 = 200;
const DEFAULT_RETRY_SECS: u32 = 5;
const DEFAULT_LOG_DIR: &str = ".symbridge/logs";

#[derive(Parser, Debug, Default)]
#[command(
    name = "symbridge",
    about = "Mirror a serial symbol menu in the terminal and copy sent symbols to the clipboard"
)]
pub struct Args {
    /// Serial device path, e.g. /dev/ttyACM0 or COM3.
    #[arg(long, env = "SYMBRIDGE_PORT")]
    pub port: Option<String>,
    #[arg(long, env = "SYMBRIDGE_BAUD")]
    pub baud: Option<u32>,
    #[arg(long, env = "SYMBRIDGE_READ_TIMEOUT_MS")]
    pub read_timeout_ms: Option<u64>,
    /// Seconds to count down between connection attempts.
    #[arg(long, env = "SYMBRIDGE_RETRY_SECS")]
    pub retry_secs: Option<u32>,
    /// Send a paste keystroke after copying.
    #[arg(long, env = "SYMBRIDGE_PASTE")]
    pub paste: Option<bool>,
    /// Program and arguments that emit the paste keystroke.
    #[arg(long, env = "SYMBRIDGE_PASTE_COMMAND")]
    pub paste_command: Option<String>,
    /// Show the handling latency row.
    #[arg(long, env = "SYMBRIDGE_TIMING")]
    pub timing: Option<bool>,
    /// Show raw lines and their classification.
    #[arg(long, env = "SYMBRIDGE_DEBUG")]
    pub debug: Option<bool>,
    #[arg(long, env = "SYMBRIDGE_CONFIG")]
    pub config: Option<PathBuf>,
    #[arg(long, env = "SYMBRIDGE_LOG_DIR")]
    pub log_dir: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct FileConfig {
    pub port: Option<String>,
    pub baud: Option<u32>,
    pub read_timeout_ms: Option<u64>,
    pub retry_secs: Option<u32>,
    pub paste: Option<bool>,
    pub paste_command: Option<String>,
    pub timing: Option<bool>,
    pub debug: Option<bool>,
    pub catalog: Option<Vec<String>>,
    pub log_dir: Option<String>,
}

#[derive(Clone, Debug)]
pub struct RuntimeConfig {
    pub port: String,
    pub baud: u32,
    pub read_timeout: Duration,
    pub retry_secs: u32,
    pub paste: bool,
    pub paste_command: Option<Vec<String>>,
    pub timing: bool,
    pub debug: bool,
    pub catalog: SymbolCatalog,
    pub log_dir: String,
}

pub fn resolve(args: Args) -> Result<RuntimeConfig> {
    let path = args.config.clone().unwrap_or_else(default_config_path);
    let file = load_file_config(&path)?;
    merge(args, file)
}

pub fn load_file_config(path: &Path) -> Result<FileConfig> {
    if !path.exists() {
        return Ok(FileConfig::default());
    }
    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config {}", path.display()))?;
    toml::from_str(&contents).with_context(|| format!("Failed to parse config {}", path.display()))
}

/// Flags and env (already folded together by clap) win over the file, which
/// wins over built-in defaults.
pub fn merge(args: Args, file: FileConfig) -> Result<RuntimeConfig> {
    let catalog = match file.catalog {
        Some(symbols) => SymbolCatalog::new(symbols).context("Invalid catalog in config")?,
        None => SymbolCatalog::default(),
    };
    let paste_command = pick_text(args.paste_command, file.paste_command)
        .and_then(|command| split_command(&command));

    Ok(RuntimeConfig {
        port: pick_text(args.port, file.port).unwrap_or_else(default_port),
        baud: args.baud.or(file.baud).unwrap_or(DEFAULT_BAUD),
        read_timeout: Duration::from_millis(
            args.read_timeout_ms
                .or(file.read_timeout_ms)
                .unwrap_or(DEFAULT_READ_TIMEOUT_MS),
        ),
        retry_secs: args
            .retry_secs
            .or(file.retry_secs)
            .unwrap_or(DEFAULT_RETRY_SECS)
            .max(1),
        paste: args.paste.or(file.paste).unwrap_or(true),
        paste_command,
        timing: args.timing.or(file.timing).unwrap_or(true),
        debug: args.debug.or(file.debug).unwrap_or(false),
        catalog,
        log_dir: pick_text(args.log_dir, file.log_dir)
            .unwrap_or_else(|| DEFAULT_LOG_DIR.to_string()),
    })
}

fn pick_text(flag: Option<String>, file: Option<String>) -> Option<String> {
    flag.filter(|value| !value.trim().is_empty())
        .or_else(|| file.filter(|value| !value.trim().is_empty()))
}

fn split_command(command: &str) -> Option<Vec<String>> {
    let words: Vec<String> = command.split_whitespace().map(str::to_string).collect();
    if words.is_empty() {
        None
    } else {
        Some(words)
    }
}

fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("symbridge/config.toml")
}

fn default_port() -> String {
    if cfg!(target_os = "macos") {
        "/dev/cu.usbmodem0001".to_string()
    } else if cfg!(windows) {
        "COM3".to_string()
    } else {
        "/dev/ttyACM0".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_apply_when_nothing_is_set() {
        let config = merge(Args::default(), FileConfig::default()).expect("merge");
        assert_eq!(config.baud, 115_200);
        assert_eq!(config.read_timeout, Duration::from_millis(200));
        assert_eq!(config.retry_secs, 5);
        assert!(config.paste);
        assert!(config.timing);
        assert!(!config.debug);
        assert_eq!(config.paste_command, None);
        assert_eq!(config.catalog, SymbolCatalog::default());
        assert_eq!(config.log_dir, ".symbridge/logs");
        assert!(!config.port.is_empty());
    }

    #[test]
    fn flags_win_over_file() {
        let args = Args {
            port: Some("/dev/ttyUSB1".to_string()),
            baud: Some(9_600),
            paste: Some(false),
            ..Args::default()
        };
        let file = FileConfig {
            port: Some("/dev/ttyACM7".to_string()),
            baud: Some(57_600),
            retry_secs: Some(2),
            paste: Some(true),
            debug: Some(true),
            ..FileConfig::default()
        };
        let config = merge(args, file).expect("merge");
        assert_eq!(config.port, "/dev/ttyUSB1");
        assert_eq!(config.baud, 9_600);
        assert_eq!(config.retry_secs, 2);
        assert!(!config.paste);
        assert!(config.debug);
    }

    #[test]
    fn debug_flag_can_turn_off_file_setting() {
        let args = Args {
            debug: Some(false),
            ..Args::default()
        };
        let file = FileConfig {
            debug: Some(true),
            ..FileConfig::default()
        };
        assert!(!merge(args, file).expect("merge").debug);
    }

    #[test]
    fn blank_flag_falls_through_to_file() {
        let args = Args {
            port: Some("  ".to_string()),
            ..Args::default()
        };
        let file = FileConfig {
            port: Some("COM9".to_string()),
            ..FileConfig::default()
        };
        assert_eq!(merge(args, file).expect("merge").port, "COM9");
    }

    #[test]
    fn retry_secs_is_clamped_to_one() {
        let args = Args {
            retry_secs: Some(0),
            ..Args::default()
        };
        assert_eq!(merge(args, FileConfig::default()).expect("merge").retry_secs, 1);
    }

    #[test]
    fn paste_command_is_split_into_words() {
        let args = Args {
            paste_command: Some("xdotool key ctrl+shift+v".to_string()),
            ..Args::default()
        };
        let config = merge(args, FileConfig::default()).expect("merge");
        assert_eq!(
            config.paste_command,
            Some(vec![
                "xdotool".to_string(),
                "key".to_string(),
                "ctrl+shift+v".to_string()
            ])
        );
    }

    #[test]
    fn empty_catalog_is_rejected() {
        let file = FileConfig {
            catalog: Some(Vec::new()),
            ..FileConfig::default()
        };
        assert!(merge(Args::default(), file).is_err());
    }

    #[test]
    fn loads_toml_file() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        writeln!(
            file,
            "port = \"/dev/ttyACM3\"\nretry_secs = 3\ncatalog = [\"a\", \"b\"]\ntiming = false"
        )
        .expect("write");
        let loaded = load_file_config(file.path()).expect("load");
        assert_eq!(loaded.port.as_deref(), Some("/dev/ttyACM3"));
        assert_eq!(loaded.retry_secs, Some(3));
        assert_eq!(loaded.timing, Some(false));

        let config = merge(Args::default(), loaded).expect("merge");
        assert_eq!(config.catalog.to_string(), "a b");
        assert!(!config.timing);
    }

    #[test]
    fn missing_file_is_default_and_malformed_file_errors() {
        let dir = tempfile::tempdir().expect("temp dir");
        let missing = dir.path().join("absent.toml");
        assert_eq!(
            load_file_config(&missing).expect("missing"),
            FileConfig::default()
        );

        let broken = dir.path().join("broken.toml");
        fs::write(&broken, "port = [unterminated").expect("write");
        assert!(load_file_config(&broken).is_err());
    }

    #[test]
    fn parses_flags() {
        let args = Args::try_parse_from([
            "symbridge",
            "--port",
            "/dev/ttyACM1",
            "--baud",
            "9600",
            "--paste",
            "false",
            "--debug",
            "true",
        ])
        .expect("parse");
        assert_eq!(args.port.as_deref(), Some("/dev/ttyACM1"));
        assert_eq!(args.baud, Some(9_600));
        assert_eq!(args.paste, Some(false));
        assert_eq!(args.debug, Some(true));
    }
}
