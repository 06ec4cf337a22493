//! Opt-in file logging.
//!
//! Hosts give a plugin no console, so when `VESSEL_LOG_DIR` is set the first
//! engine instance routes `tracing` output to a timestamped file in that
//! directory and installs a panic hook that leaves a `.panic` report next to it.

use std::fs::{self, File};
use std::io::{self, Write as _};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, Once};
use std::time::{SystemTime, UNIX_EPOCH};

pub const LOG_DIR_ENV: &str = "VESSEL_LOG_DIR";

static INIT: Once = Once::new();

/// Installs file logging once per process. Without `VESSEL_LOG_DIR` this does
/// nothing.
pub fn init() {
    INIT.call_once(|| {
        let Some(dir) = std::env::var_os(LOG_DIR_ENV).filter(|dir| !dir.is_empty()) else {
            return;
        };
        if let Err(e) = install(Path::new(&dir)) {
            eprintln!("vessel-engine: file logging disabled: {}", e);
        }
    });
}

fn install(dir: &Path) -> io::Result<()> {
    let (path, file) = create_log_file(dir)?;
    let panic_path = path.with_extension("panic");

    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        if let Ok(mut report) = File::create(&panic_path) {
            let backtrace = std::backtrace::Backtrace::force_capture();
            let _ = writeln!(report, "{}\n{}", info, backtrace);
        }
        default_hook(info);
    }));

    let _ = tracing_subscriber::fmt()
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .try_init();

    tracing::info!("Logging to {}", path.display());
    Ok(())
}

fn create_log_file(dir: &Path) -> io::Result<(PathBuf, File)> {
    fs::create_dir_all(dir)?;
    let stamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs())
        .unwrap_or(0);
    let path = log_path(dir, stamp);
    let file = File::create(&path)?;
    Ok((path, file))
}

fn log_path(dir: &Path, stamp: u64) -> PathBuf {
    dir.join(format!("vessel-engine-{}.log", stamp))
}
