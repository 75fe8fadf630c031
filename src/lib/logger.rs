use directories::ProjectDirs;
use log::LevelFilter;
use std::fs;
use std::io::Write;
use std::path::PathBuf;

use crate::{ConfigError, Result};

/// Initialize the logger with file and stderr output
///
/// Stdout is left to the report itself, so console logging goes to stderr.
///
/// # Arguments
///
/// * `verbose` - Enable debug level logging
/// * `quiet` - Suppress stderr output (logs still written to file)
///
/// # Platform-specific log locations
///
/// * **macOS**: `~/Library/Application Support/io.kube-allocated-resources.kube-allocated-resources/kube-allocated-resources.log`
/// * **Linux**: `~/.local/share/kube-allocated-resources/kube-allocated-resources.log`
/// * **Windows**: `C:\Users\<User>\AppData\Local\kube-allocated-resources\data\kube-allocated-resources.log`
///
pub fn init_logger(verbose: bool, quiet: bool) -> Result<()> {
    let log_level = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };

    let log_path = log_file_path()?;
    let log_file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .map_err(|e| ConfigError::FileError(format!("Failed to open log file: {}", e)))?;

    let mut builder = env_logger::Builder::new();
    builder
        .filter_level(log_level)
        .parse_default_env()
        .format_timestamp_secs();

    if quiet {
        builder.target(env_logger::Target::Pipe(Box::new(log_file)));
    } else {
        builder.target(env_logger::Target::Pipe(Box::new(TeeWriter {
            stderr: std::io::stderr(),
            file: log_file,
        })));
    }

    builder.init();
    log::debug!("Logging to: {}", log_path.display());

    Ok(())
}

fn log_file_path() -> Result<PathBuf> {
    let log_dir = match ProjectDirs::from("io", "kube-allocated-resources", "kube-allocated-resources")
    {
        Some(proj_dirs) => proj_dirs.data_local_dir().to_path_buf(),
        // Fallback to current directory if ProjectDirs fails
        None => std::env::current_dir().map_err(|e| {
            ConfigError::InvalidValue(format!("Failed to get current directory: {}", e))
        })?,
    };

    fs::create_dir_all(&log_dir).map_err(|e| {
        ConfigError::InvalidValue(format!("Failed to create log directory: {}", e))
    })?;
    Ok(log_dir.join("kube-allocated-resources.log"))
}

/// Writes every record to both stderr and the log file
struct TeeWriter {
    stderr: std::io::Stderr,
    file: fs::File,
}

impl Write for TeeWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.stderr.write_all(buf)?;
        self.file.write_all(buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.stderr.flush()?;
        self.file.flush()?;
        Ok(())
    }
}
