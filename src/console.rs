//! Log output shared between the terminal and the spectator page.
//!
//! Every formatted log line goes to stderr and into a bounded in-memory
//! buffer; subscribers receive new lines as they are written. Nothing on
//! the subscriber side may log, or lines would feed back into themselves.

use chrono::Local;
use futures::channel::mpsc::{unbounded, UnboundedReceiver, UnboundedSender};
use log::Level;
use std::collections::VecDeque;
use std::io::{self, Write};
use std::sync::{Arc, Mutex, PoisonError};

/// Lines kept for spectators who connect late.
pub const CONSOLE_LINES: usize = 100;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Default)]
pub struct ConsoleBuffer {
    lines: Mutex<VecDeque<String>>,
    feed: Mutex<Option<UnboundedSender<String>>>,
}

impl ConsoleBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, line: impl Into<String>) {
        let line = line.into();
        {
            let mut lines = self.lines.lock().unwrap_or_else(PoisonError::into_inner);
            if lines.len() == CONSOLE_LINES {
                lines.pop_front();
            }
            lines.push_back(line.clone());
        }
        let mut feed = self.feed.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(sender) = feed.as_ref() {
            if sender.unbounded_send(line).is_err() {
                *feed = None;
            }
        }
    }

    pub fn snapshot(&self) -> Vec<String> {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .cloned()
            .collect()
    }

    /// Stream of lines pushed from now on. A new subscriber replaces the
    /// previous one.
    pub fn subscribe(&self) -> UnboundedReceiver<String> {
        let (sender, receiver) = unbounded();
        *self.feed.lock().unwrap_or_else(PoisonError::into_inner) = Some(sender);
        receiver
    }
}

/// `io::Write` sink for the logger: copies to stderr and splits into lines.
pub struct ConsoleWriter {
    console: Arc<ConsoleBuffer>,
    partial: Vec<u8>,
}

impl ConsoleWriter {
    pub fn new(console: Arc<ConsoleBuffer>) -> Self {
        Self {
            console,
            partial: Vec::new(),
        }
    }
}

impl Write for ConsoleWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        io::stderr().write_all(buf)?;
        self.partial.extend_from_slice(buf);
        while let Some(end) = self.partial.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.partial.drain(..=end).collect();
            let text = String::from_utf8_lossy(&line[..end]);
            self.console.push(text.trim_end_matches('\r'));
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        io::stderr().flush()
    }
}

pub fn level_tag(level: Level) -> &'static str {
    match level {
        Level::Error => "[ERROR] ",
        Level::Warn => "[WARNING] ",
        Level::Info => "",
        Level::Debug | Level::Trace => "[DEBUG] ",
    }
}

pub fn format_line(timestamp: &str, level: Level, message: &str) -> String {
    format!("{} {}{}", timestamp, level_tag(level), message)
}

/// Install the global logger. `RUST_LOG` still overrides the default filter.
pub fn init_logger(debug: bool, console: Arc<ConsoleBuffer>) {
    let default_filter = if debug { "info,bluechess=debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::new().default_filter_or(default_filter))
        .format(|buf, record| {
            let timestamp = Local::now().format(TIMESTAMP_FORMAT).to_string();
            writeln!(
                buf,
                "{}",
                format_line(&timestamp, record.level(), &record.args().to_string())
            )
        })
        .target(env_logger::Target::Pipe(Box::new(ConsoleWriter::new(console))))
        .init();
}
