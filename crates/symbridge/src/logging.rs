use std::{
    env,
    fs::{File, OpenOptions},
    io::{self, Write},
    path::PathBuf,
    sync::{Arc, Mutex},
};
use tracing_subscriber::{fmt::writer::BoxMakeWriter, EnvFilter};

/// Keeps the log file alive for the lifetime of the process.
pub struct LogGuard {
    path: PathBuf,
    file: Arc<Mutex<File>>,
}

impl LogGuard {
    pub fn path(&self) -> &PathBuf {
        &self.path
    }
}

struct FileWriter {
    file: Arc<Mutex<File>>,
}

impl Write for FileWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if let Ok(mut file) = self.file.lock() {
            let _ = file.write_all(buf);
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        if let Ok(mut file) = self.file.lock() {
            let _ = file.flush();
        }
        Ok(())
    }
}

/// Stdout belongs to the fixed-row view, so logs only ever go to a file.
/// Without a usable file no subscriber is installed.
pub fn init_logging(log_dir: &str, port: &str) -> Option<LogGuard> {
    let level = env::var("SYMBRIDGE_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let guard = match open_log_file(log_dir, port) {
        Ok(Some(guard)) => guard,
        Ok(None) => return None,
        Err(err) => {
            eprintln!("log_file_error: {err}");
            return None;
        }
    };
    let file = guard.file.clone();
    let make_writer = BoxMakeWriter::new(move || FileWriter { file: file.clone() });
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(false)
        .with_writer(make_writer)
        .finish();
    if tracing::subscriber::set_global_default(subscriber).is_err() {
        return None;
    }
    Some(guard)
}

fn open_log_file(log_dir: &str, port: &str) -> io::Result<Option<LogGuard>> {
    if log_dir.trim().is_empty() {
        return Ok(None);
    }
    let dir = PathBuf::from(log_dir);
    std::fs::create_dir_all(&dir)?;
    let path = dir.join(format!("symbridge-{}.log", sanitize_component(port)));
    let file = OpenOptions::new().create(true).append(true).open(&path)?;
    Ok(Some(LogGuard {
        path,
        file: Arc::new(Mutex::new(file)),
    }))
}

fn sanitize_component(input: &str) -> String {
    input
        .trim_start_matches('/')
        .chars()
        .map(|ch| if ch.is_ascii_alphanumeric() || ch == '-' || ch == '_' { ch } else { '_' })
        .collect()
}
