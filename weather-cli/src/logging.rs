use std::{
    fs::{self, OpenOptions},
    io,
    path::{Path, PathBuf},
    sync::Mutex,
};

use anyhow::Context;
use tracing_subscriber::{EnvFilter, Layer, layer::SubscriberExt, util::SubscriberInitExt};

const FILE_DIRECTIVES: &str = "info,weather_core=debug,weather_cli=debug";

/// Size at which the log file is rotated on startup.
const MAX_LOG_BYTES: u64 = 10 * 1024 * 1024;
/// Rotated files kept next to the log file: `<name>.1` (newest) to `<name>.5`.
const LOG_BACKUPS: u32 = 5;

/// Console verbosity when `RUST_LOG` is unset.
fn default_directives(debug: bool) -> &'static str {
    if debug { "weather_core=debug,weather_cli=debug" } else { "warn" }
}

fn backup_path(path: &Path, index: u32) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(format!(".{index}"));
    PathBuf::from(name)
}

/// Shifts `path` to `path.1` (and older backups up by one) once it reaches `max_bytes`.
/// The oldest backup beyond `backups` is dropped.
fn rotate_if_large(path: &Path, max_bytes: u64, backups: u32) -> io::Result<()> {
    let size = match fs::metadata(path) {
        Ok(meta) => meta.len(),
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(()),
        Err(err) => return Err(err),
    };
    if size < max_bytes {
        return Ok(());
    }

    if backups == 0 {
        return fs::remove_file(path);
    }

    let oldest = backup_path(path, backups);
    if oldest.exists() {
        fs::remove_file(&oldest)?;
    }
    for index in (1..backups).rev() {
        let from = backup_path(path, index);
        if from.exists() {
            fs::rename(&from, backup_path(path, index + 1))?;
        }
    }
    fs::rename(path, backup_path(path, 1))
}

/// Installs the global subscriber: stderr always, plus `log_file` with this crate at debug level.
pub fn init(debug: bool, log_file: Option<&Path>) -> anyhow::Result<()> {
    let console_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(debug)));

    let console = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(debug)
        .with_filter(console_filter);

    let file = match log_file {
        Some(path) => {
            rotate_if_large(path, MAX_LOG_BYTES, LOG_BACKUPS)
                .with_context(|| format!("Failed to rotate log file: {}", path.display()))?;

            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file: {}", path.display()))?;

            Some(
                tracing_subscriber::fmt::layer()
                    .with_writer(Mutex::new(file))
                    .with_ansi(false)
                    .with_filter(EnvFilter::new(FILE_DIRECTIVES)),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(console)
        .with(file)
        .try_init()
        .context("Failed to install logger")?;

    let mode = if debug { " in debug mode" } else { "" };
    tracing::debug!("Logging configured{mode}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_enables_crate_targets() {
        assert!(default_directives(true).contains("weather_core=debug"));
        assert_eq!(default_directives(false), "warn");
    }

    #[test]
    fn small_log_is_not_rotated() {
        let dir = tempfile::tempdir().expect("temp dir");
        let log = dir.path().join("weather.log");
        fs::write(&log, "short").expect("write succeeds");

        rotate_if_large(&log, 64, 2).expect("rotation succeeds");

        assert_eq!(fs::read_to_string(&log).expect("log kept"), "short");
        assert!(!backup_path(&log, 1).exists());
    }

    #[test]
    fn missing_log_is_fine() {
        let dir = tempfile::tempdir().expect("temp dir");
        rotate_if_large(&dir.path().join("absent.log"), 1, 2).expect("nothing to rotate");
    }

    #[test]
    fn large_log_shifts_backups_and_drops_oldest() {
        let dir = tempfile::tempdir().expect("temp dir");
        let log = dir.path().join("weather.log");
        fs::write(&log, "current run").expect("write succeeds");
        fs::write(backup_path(&log, 1), "previous").expect("write succeeds");
        fs::write(backup_path(&log, 2), "oldest").expect("write succeeds");

        rotate_if_large(&log, 4, 2).expect("rotation succeeds");

        assert!(!log.exists());
        let read = |index| fs::read_to_string(backup_path(&log, index)).expect("backup exists");
        assert_eq!(read(1), "current run");
        assert_eq!(read(2), "previous");
        assert!(!backup_path(&log, 3).exists());
    }

    #[test]
    fn init_writes_debug_line_to_log_file() {
        let dir = tempfile::tempdir().expect("temp dir");
        let log = dir.path().join("weather.log");

        init(true, Some(&log)).expect("logger installs");

        let written = fs::read_to_string(&log).expect("log written");
        assert!(written.contains("Logging configured in debug mode"));
    }
}
