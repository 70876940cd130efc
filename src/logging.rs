// src/logging.rs
use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::Path;

use anyhow::{Context, Result};
use chrono::Local;
use log::{Level, LevelFilter};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Writes every record to both sinks.
struct Tee<A: Write, B: Write> {
    first: A,
    second: B,
}

impl<A: Write, B: Write> Write for Tee<A, B> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.first.write_all(buf)?;
        self.second.write_all(buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.first.flush()?;
        self.second.flush()
    }
}

/// Level names as they appear in the log, `WARNING` rather than `WARN`.
fn level_name(level: Level) -> &'static str {
    match level {
        Level::Error => "ERROR",
        Level::Warn => "WARNING",
        Level::Info => "INFO",
        Level::Debug => "DEBUG",
        Level::Trace => "TRACE",
    }
}

/// Installs the global logger: `[date time] [LEVEL]: message` on stderr, and appended
/// to `log_file` when one is given. `RUST_LOG` is read first, `level` wins.
pub fn init_logging(level: LevelFilter, log_file: Option<&Path>) -> Result<()> {
    let mut builder = env_logger::Builder::from_default_env();
    builder.filter_level(level).format(|buf, record| {
        writeln!(
            buf,
            "[{}] [{}]: {}",
            Local::now().format(TIMESTAMP_FORMAT),
            level_name(record.level()),
            record.args()
        )
    });
    if let Some(path) = log_file {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("cannot open log file {}", path.display()))?;
        builder.target(env_logger::Target::Pipe(Box::new(Tee {
            first: io::stderr(),
            second: file,
        })));
    }
    builder.try_init().context("logger already initialised")?;
    Ok(())
}
