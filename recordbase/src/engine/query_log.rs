//! Per-session statement log
//!
//! Disabled by default. While enabled, every statement an engine executes is
//! appended with its bound values, wall-clock duration and a UTC timestamp.
//! Recording happens after execution and never alters it.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::value::Value;

/// One executed statement
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryLogEntry {
    /// SQL text as sent to the engine
    pub sql: String,
    /// Values bound to the statement's placeholders
    pub bindings: Vec<Value>,
    /// Time spent executing
    pub elapsed: Duration,
    /// When execution finished
    pub executed_at: DateTime<Utc>,
}

/// Statement log owned by one execution context
///
/// Share it between engines by cloning the `Arc` it is handed out in.
#[derive(Debug, Default)]
pub struct QueryLog {
    enabled: AtomicBool,
    capacity: Option<usize>,
    entries: Mutex<VecDeque<QueryLogEntry>>,
}

impl QueryLog {
    /// Create a disabled, unbounded log
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a disabled log that keeps at most `capacity` entries
    ///
    /// When full, the oldest entry is dropped.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity: Some(capacity),
            ..Self::default()
        }
    }

    /// Start recording statements
    pub fn enable(&self) {
        self.enabled.store(true, Ordering::Release);
    }

    /// Stop recording statements; existing entries are kept
    pub fn disable(&self) {
        self.enabled.store(false, Ordering::Release);
    }

    /// Whether statements are being recorded
    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }

    /// Record an executed statement if the log is enabled
    pub fn record(&self, sql: &str, bindings: &[Value], elapsed: Duration) {
        if !self.is_enabled() {
            return;
        }
        let entry = QueryLogEntry {
            sql: sql.to_string(),
            bindings: bindings.to_vec(),
            elapsed,
            executed_at: Utc::now(),
        };

        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(capacity) = self.capacity {
            if capacity == 0 {
                return;
            }
            while entries.len() >= capacity {
                entries.pop_front();
            }
        }
        entries.push_back(entry);
    }

    /// Snapshot of the recorded statements, oldest first
    pub fn entries(&self) -> Vec<QueryLogEntry> {
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .cloned()
            .collect()
    }

    /// Drop every recorded statement
    pub fn flush(&self) {
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clear();
    }
}
