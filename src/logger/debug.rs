//! Grouped development log
//!
//! Collects labelled values into named groups for one request and writes them
//! out when the request completes. Disabled instances drop everything, so
//! callers never need to check the development flag themselves.

use serde::Serialize;
use serde_json::Value;
use std::sync::Mutex;

#[derive(Debug, Clone, PartialEq)]
pub struct DebugEntry {
    /// Enclosing group names, outermost first
    pub groups: Vec<String>,
    pub label: String,
    pub value: Value,
}

#[derive(Debug, Default)]
struct DebugState {
    open_groups: Vec<String>,
    entries: Vec<DebugEntry>,
}

#[derive(Debug)]
pub struct DebugLog {
    enabled: bool,
    state: Mutex<DebugState>,
}

impl DebugLog {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            state: Mutex::new(DebugState::default()),
        }
    }

    pub const fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn group(&self, name: &str) {
        if !self.enabled {
            return;
        }
        if let Ok(mut state) = self.state.lock() {
            state.open_groups.push(name.to_string());
        }
    }

    pub fn group_end(&self) {
        if !self.enabled {
            return;
        }
        if let Ok(mut state) = self.state.lock() {
            state.open_groups.pop();
        }
    }

    /// Record a value under the currently open groups
    pub fn log<T: Serialize + ?Sized>(&self, value: &T, label: &str) {
        if !self.enabled {
            return;
        }
        let value = serde_json::to_value(value)
            .unwrap_or_else(|e| Value::String(format!("<unserializable: {e}>")));
        if let Ok(mut state) = self.state.lock() {
            let groups = state.open_groups.clone();
            state.entries.push(DebugEntry {
                groups,
                label: label.to_string(),
                value,
            });
        }
    }

    pub fn entries(&self) -> Vec<DebugEntry> {
        self.state
            .lock()
            .map(|s| s.entries.clone())
            .unwrap_or_default()
    }

    /// Render entries as log lines, one per entry
    pub fn lines(&self) -> Vec<String> {
        self.entries()
            .iter()
            .map(|entry| {
                format!(
                    "[DEBUG] {} | {}: {}",
                    entry.groups.join(" > "),
                    entry.label,
                    entry.value
                )
            })
            .collect()
    }

    /// Write all entries to the info log
    pub fn flush(&self) {
        for line in self.lines() {
            super::log_info(&line);
        }
    }
}
