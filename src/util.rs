use anyhow::{Context, Result};
use std::fs::{self, File};
use std::io;
use std::path::Path;
use std::thread::sleep;
use std::time::Duration;

static INIT_ONCE: std::sync::Once = std::sync::Once::new();
pub fn init_tracing_once() {
    INIT_ONCE.call_once(|| {
        let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
        let _ = tracing_subscriber::fmt().with_env_filter(env_filter).with_writer(io::stderr).try_init();
    });
}

/// Transient errors worth retrying (sharing violations, AV scanners holding the file).
fn is_retriable_io_error(e: &io::Error) -> bool {
    if matches!(e.kind(), io::ErrorKind::Interrupted | io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut) {
        return true;
    }
    // Windows raw codes:
    //   5   = Access denied (often transient with AV)
    //   32  = Sharing violation
    //   33  = Lock violation
    matches!(e.raw_os_error(), Some(5) | Some(32) | Some(33))
}

/// Open a file with retries/backoff for transient errors.
pub fn open_with_backoff(path: &Path, tries: usize, delay_ms: u64) -> io::Result<File> {
    let mut last_err: Option<io::Error> = None;
    let tries = tries.max(1);
    for i in 0..tries {
        match File::open(path) {
            Ok(f) => return Ok(f),
            Err(e) if is_retriable_io_error(&e) => {
                last_err = Some(e);
                sleep(Duration::from_millis(delay_ms.saturating_mul((i + 1) as u64)));
                continue;
            }
            Err(e) => return Err(e),
        }
    }
    Err(last_err.unwrap_or_else(|| io::Error::new(io::ErrorKind::Other, "open failed")))
}

/// Create a file with retries/backoff for transient errors.
pub fn create_with_backoff(path: &Path, tries: usize, delay_ms: u64) -> io::Result<File> {
    let mut last_err: Option<io::Error> = None;
    let tries = tries.max(1);
    for i in 0..tries {
        match File::create(path) {
            Ok(f) => return Ok(f),
            Err(e) if is_retriable_io_error(&e) => {
                last_err = Some(e);
                sleep(Duration::from_millis(delay_ms.saturating_mul((i + 1) as u64)));
                continue;
            }
            Err(e) => return Err(e),
        }
    }
    Err(last_err.unwrap_or_else(|| io::Error::new(io::ErrorKind::Other, "create failed")))
}

/// Remove a file with retries/backoff for transient errors.
/// Succeeds if the file doesn't exist.
pub fn remove_with_backoff(path: &Path, tries: usize, delay_ms: u64) -> Result<()> {
    let mut last_err: Option<io::Error> = None;
    for i in 0..tries.max(1) {
        match fs::remove_file(path) {
            Ok(_) => return Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
            Err(e) if is_retriable_io_error(&e) => {
                last_err = Some(e);
                sleep(Duration::from_millis(delay_ms.saturating_mul((i + 1) as u64)));
                continue;
            }
            Err(e) => return Err(e).with_context(|| format!("remove {}", path.display())),
        }
    }
    Err(last_err.unwrap_or_else(|| io::Error::new(io::ErrorKind::Other, "remove failed")))
        .with_context(|| format!("remove (retries) {}", path.display()))
}

/// Promote a finished temp file to `dest`, replacing whatever was there.
/// Falls back to copy+remove when rename is refused (e.g. across devices).
pub fn replace_file_atomic_backoff(tmp: &Path, dest: &Path) -> Result<()> {
    let tries = 20usize;
    let delay_ms = 50u64;
    if dest.exists() {
        remove_with_backoff(dest, tries, delay_ms)?;
    }
    let mut last_err: Option<io::Error> = None;
    for i in 0..tries {
        match fs::rename(tmp, dest) {
            Ok(_) => return Ok(()),
            Err(e) if is_retriable_io_error(&e) => {
                last_err = Some(e);
                sleep(Duration::from_millis(delay_ms.saturating_mul((i + 1) as u64)));
            }
            Err(e) => {
                last_err = Some(e);
                break;
            }
        }
    }
    if let Err(e) = fs::copy(tmp, dest) {
        let first = last_err.map(|e| e.to_string()).unwrap_or_default();
        return Err(e).with_context(|| format!("replace {} -> {} (rename: {first})", tmp.display(), dest.display()));
    }
    remove_with_backoff(tmp, tries, delay_ms)
}
