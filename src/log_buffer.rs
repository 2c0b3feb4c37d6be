// src/log_buffer.rs

//! Bounded session log.
//!
//! Holds the rendered lines shown to the user (tool output plus front-end
//! messages) so they can be saved at the end of a session.

use std::collections::VecDeque;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::Local;

use crate::exec::{OutputEvent, OutputStream};

pub const DEFAULT_MAX_LINES: usize = 5000;

#[derive(Debug, Clone)]
pub struct LogBuffer {
    lines: VecDeque<String>,
    max_lines: usize,
    timestamps: bool,
}

impl Default for LogBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_LINES, true)
    }
}

impl LogBuffer {
    /// `max_lines` is clamped to at least 1.
    pub fn new(max_lines: usize, timestamps: bool) -> Self {
        Self {
            lines: VecDeque::new(),
            max_lines: max_lines.max(1),
            timestamps,
        }
    }

    /// Append a message and return the rendered line, or `None` if the
    /// message was blank and ignored.
    pub fn push(&mut self, message: &str) -> Option<&str> {
        if message.trim().is_empty() {
            return None;
        }

        let line = if self.timestamps {
            format!("[{}] {}", Local::now().format("%H:%M:%S"), message)
        } else {
            message.to_string()
        };

        while self.lines.len() >= self.max_lines {
            self.lines.pop_front();
        }
        self.lines.push_back(line);
        self.lines.back().map(String::as_str)
    }

    /// Render an output event: stderr lines get an `E ` marker, runner
    /// diagnostics a `! ` marker.
    pub fn push_event(&mut self, event: &OutputEvent) -> Option<&str> {
        match event.stream {
            OutputStream::Stdout => self.push(&event.text),
            OutputStream::Stderr => self.push(&format!("E {}", event.text)),
            OutputStream::Runner => self.push(&format!("! {}", event.text)),
        }
    }

    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.lines.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).with_context(|| format!("creating dir {:?}", parent))?;
        }
        let body = self.lines().collect::<Vec<_>>().join("\n");
        fs::write(path, body).with_context(|| format!("writing log to {:?}", path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_messages_are_ignored() {
        let mut log = LogBuffer::new(10, false);
        assert!(log.push("   ").is_none());
        assert!(log.is_empty());
    }

    #[test]
    fn oldest_lines_are_evicted() {
        let mut log = LogBuffer::new(2, false);
        log.push("a");
        log.push("b");
        log.push("c");
        assert_eq!(log.lines().collect::<Vec<_>>(), vec!["b", "c"]);
    }

    #[test]
    fn timestamps_prefix_lines() {
        let mut log = LogBuffer::new(10, true);
        let line = log.push("hello").unwrap().to_string();
        // "[HH:MM:SS] hello"
        assert_eq!(line.len(), "[00:00:00] hello".len());
        assert!(line.starts_with('[') && line.ends_with("] hello"));
    }

    #[test]
    fn events_are_marked_by_stream() {
        let mut log = LogBuffer::new(10, false);
        let ev = |stream, text: &str| OutputEvent {
            seq: 0,
            stream,
            text: text.to_string(),
        };
        log.push_event(&ev(OutputStream::Stdout, "out"));
        log.push_event(&ev(OutputStream::Stderr, "err"));
        log.push_event(&ev(OutputStream::Runner, "pipe broke"));
        assert_eq!(log.lines().collect::<Vec<_>>(), vec!["out", "E err", "! pipe broke"]);
    }

    #[test]
    fn save_joins_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logs/session.log");
        let mut log = LogBuffer::new(10, false);
        log.push("one");
        log.push("two");
        log.save(&path).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "one\ntwo");
    }
}
