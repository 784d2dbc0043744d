/*
 * SPDX-License-Identifier: GPL-3.0-or-later
 * More licensing information can be found in the project LICENSE file
 * Author: Harshit Jain
 * Email: reach@harsh1998.dev
 */
use crate::config::Config;
use crate::error::AppError;
use chrono::Local;
use env_logger::{Builder, Env, Target};
use std::fs::{File, OpenOptions};
use std::io::{self, Write};

/// Log sink: every formatted record goes to stderr and, when configured, is
/// appended to the log file as well.
pub struct LogSink {
    file: Option<File>,
}

impl LogSink {
    pub fn new(file: Option<File>) -> Self {
        Self { file }
    }
}

impl Write for LogSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.write_all(buf)?;
        Ok(buf.len())
    }

    // Each record arrives as a single buffer; mirror it whole.
    fn write_all(&mut self, buf: &[u8]) -> io::Result<()> {
        io::stderr().lock().write_all(buf)?;
        if let Some(file) = self.file.as_mut() {
            file.write_all(buf)?;
        }
        Ok(())
    }

    fn flush(&mut self) -> io::Result<()> {
        io::stderr().flush()?;
        if let Some(file) = self.file.as_mut() {
            file.flush()?;
        }
        Ok(())
    }
}

/// Level used when `RUST_LOG` is unset.
pub fn default_level(config: &Config) -> &'static str {
    if config.verbose() {
        "debug"
    } else if config.quiet() {
        "error"
    } else {
        "info"
    }
}

/// Installs the global logger. `env_logger` serializes writes to the pipe
/// target, so lines from concurrent requests never interleave.
pub fn init_logging(config: &Config) -> Result<(), AppError> {
    let file = match config.log_file() {
        Some(path) => Some(
            OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .map_err(|e| {
                    AppError::Config(format!("cannot open log file {}: {e}", path.display()))
                })?,
        ),
        None => None,
    };

    let level = default_level(config);
    Builder::from_env(Env::default().default_filter_or(level))
        .format(|buf, record| {
            writeln!(
                buf,
                "[{} {:<5}] {}",
                Local::now().format("%Y-%m-%d %H:%M:%S%.3f"),
                record.level(),
                record.args()
            )
        })
        .target(Target::Pipe(Box::new(LogSink::new(file))))
        .try_init()
        .map_err(|e| AppError::Config(format!("logger already initialised: {e}")))?;

    log::debug!("Log level set to: {level}");
    Ok(())
}
