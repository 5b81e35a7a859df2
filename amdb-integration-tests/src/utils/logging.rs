//! Testing utilities to work with logs.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::{
    collections::HashMap,
    io::Write,
    sync::{Arc, Mutex},
};
use tracing::Level;

/// Helper to collect events emitted by Tracing and later make assertions about
/// the collected events.
#[derive(Default)]
pub struct LogWatcher {
    /// The raw bytes received from Tracing. Should represent new-line separated JSON objects.
    buf: Arc<Mutex<Vec<u8>>>,

    /// Events parsed from [`buf`](Self::buf). Only complete lines are taken
    /// out of `buf`, so a partial write stays there until the rest arrives.
    events: Vec<TracingJsonEvent>,
}

impl LogWatcher {
    /// A writer to hand to `tracing_subscriber`. Everything written to it shows
    /// up in this watcher.
    pub fn writer(&self) -> LogWatcherWriter {
        LogWatcherWriter {
            buf: self.buf.clone(),
        }
    }

    /// Iterate over the events collected so far by this log watcher.
    pub fn events(&mut self) -> std::slice::Iter<TracingJsonEvent> {
        self.convert_events();
        self.events.iter()
    }

    /// Test if any event this logger received matches `predicate`.
    #[must_use = "LogWatcher::has does not make assertions alone, you probably want to wrap it in assert!()"]
    pub fn has<F>(&mut self, predicate: F) -> bool
    where
        F: FnMut(&TracingJsonEvent) -> bool,
    {
        self.events().any(predicate)
    }

    /// Move every complete line in `self.buf` into `self.events`.
    fn convert_events(&mut self) {
        let mut buf = self.buf.lock().expect("mutex was poisoned");

        let complete = match buf.iter().rposition(|b| *b == b'\n') {
            Some(idx) => idx + 1,
            None => return,
        };
        let lines: Vec<u8> = buf.drain(..complete).collect();
        let text = String::from_utf8(lines).expect("bad utf8");

        for line in text.lines().filter(|line| !line.trim().is_empty()) {
            let event: TracingJsonEvent = serde_json::from_str(line)
                .unwrap_or_else(|_| panic!("Bad JSON in log line: {}", line));
            self.events.push(event);
        }
    }
}

/// A handle that Tracing writes log lines through.
///
/// This is needed because Tracing consumes its writers. This type is split
/// off from the main [`LogWatcher`] and writes back into the parent's buffer.
#[derive(Clone)]
pub struct LogWatcherWriter {
    /// The handle to the parent log watcher's buffer.
    buf: Arc<Mutex<Vec<u8>>>,
}

impl Write for LogWatcherWriter {
    fn write(&mut self, new_bytes: &[u8]) -> std::io::Result<usize> {
        let mut buf = self
            .buf
            .lock()
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e.to_string()))?;
        buf.extend_from_slice(new_bytes);
        Ok(new_bytes.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

/// A deserialization of [`tracing_subscriber::fmt::format::Json`]'s output format.
#[derive(Debug, Deserialize, Serialize)]
pub struct TracingJsonEvent {
    /// The key-value fields logged on the event, usually including `message`.
    pub fields: HashMap<String, Value>,
    /// The level the event was emitted at.
    #[serde(with = "serde_with::rust::display_fromstr")]
    pub level: Level,
    /// The target of the event.
    pub target: String,
}

impl TracingJsonEvent {
    /// Test if the field named `field_name` is a string that contains `pat` as a
    /// substring.
    pub fn field_contains(&self, field_name: &str, pat: &str) -> bool {
        self.fields
            .get(field_name)
            .and_then(Value::as_str)
            .map_or(false, |value| value.contains(pat))
    }

    /// The field named `field_name`, if it is an unsigned integer.
    pub fn field_u64(&self, field_name: &str) -> Option<u64> {
        self.fields.get(field_name).and_then(Value::as_u64)
    }
}

#[cfg(test)]
mod tests {
    use super::LogWatcher;
    use std::io::Write;
    use tracing::Level;

    #[test]
    fn partial_lines_wait_for_the_rest() {
        let mut watcher = LogWatcher::default();
        let mut writer = watcher.writer();

        writer
            .write_all(br#"{"fields":{"message":"one"},"level":"INFO","target":"t"}"#)
            .unwrap();
        writer.write_all(b"\n{\"fields\":{\"message\":\"tw").unwrap();
        assert_eq!(watcher.events().count(), 1);

        writer
            .write_all(b"o\"},\"level\":\"WARN\",\"target\":\"t\"}\n")
            .unwrap();
        let levels: Vec<Level> = watcher.events().map(|e| e.level).collect();
        assert_eq!(levels, vec![Level::INFO, Level::WARN]);
        assert!(watcher.has(|e| e.field_contains("message", "two")));
    }
}
