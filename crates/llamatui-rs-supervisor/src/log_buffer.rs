//! Bounded line buffer shared between the capture task and the renderer.

use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;

/// Maximum number of lines retained per server instance.
pub const LOG_CAPACITY: usize = 1000;

#[derive(Debug)]
struct Inner {
    lines: VecDeque<String>,
    capacity: usize,
    closed: bool,
}

/// Cloneable handle to a capped FIFO of captured output lines.
///
/// Once closed the buffer is empty and further appends are dropped, so a
/// capture task that outlives its instance cannot repopulate it.
#[derive(Debug, Clone)]
pub struct LogBuffer {
    inner: Arc<Mutex<Inner>>,
}

impl LogBuffer {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            inner: Arc::new(Mutex::new(Inner {
                lines: VecDeque::with_capacity(capacity),
                capacity,
                closed: false,
            })),
        }
    }

    /// Append a line, evicting the oldest one when full.
    pub fn push(&self, line: impl Into<String>) {
        let mut inner = self.inner.lock();
        if inner.closed {
            return;
        }
        if inner.lines.len() == inner.capacity {
            inner.lines.pop_front();
        }
        inner.lines.push_back(line.into());
    }

    /// Copy of every retained line, oldest first.
    pub fn snapshot(&self) -> Vec<String> {
        self.inner.lock().lines.iter().cloned().collect()
    }

    /// Copy of the newest `count` lines, oldest first.
    pub fn tail(&self, count: usize) -> Vec<String> {
        let inner = self.inner.lock();
        let skip = inner.lines.len().saturating_sub(count);
        inner.lines.iter().skip(skip).cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().lines.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.inner.lock().capacity
    }

    /// Drop all lines and refuse further appends.
    pub fn close(&self) {
        let mut inner = self.inner.lock();
        inner.closed = true;
        inner.lines.clear();
    }

    pub fn is_closed(&self) -> bool {
        self.inner.lock().closed
    }
}

impl Default for LogBuffer {
    fn default() -> Self {
        Self::new(LOG_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn evicts_oldest_lines_past_capacity() {
        let logs = LogBuffer::default();
        for idx in 0..1001 {
            logs.push(format!("line {idx}"));
        }
        assert_eq!(logs.len(), LOG_CAPACITY);
        let lines = logs.snapshot();
        assert_eq!(lines.first().map(String::as_str), Some("line 1"));
        assert_eq!(lines.last().map(String::as_str), Some("line 1000"));
    }

    #[test]
    fn tail_returns_newest_lines_in_order() {
        let logs = LogBuffer::new(10);
        for idx in 0..5 {
            logs.push(format!("{idx}"));
        }
        assert_eq!(logs.tail(2), vec!["3".to_string(), "4".to_string()]);
        assert_eq!(logs.tail(50).len(), 5);
        assert!(logs.tail(0).is_empty());
    }

    #[test]
    fn closed_buffer_stays_empty() {
        let logs = LogBuffer::new(4);
        logs.push("before");
        let reader = logs.clone();
        logs.close();
        logs.push("after");
        assert!(reader.is_closed());
        assert!(reader.is_empty());
        assert_eq!(reader.snapshot(), Vec::<String>::new());
    }

    #[test]
    fn zero_capacity_is_raised_to_one() {
        let logs = LogBuffer::new(0);
        logs.push("a");
        logs.push("b");
        assert_eq!(logs.capacity(), 1);
        assert_eq!(logs.snapshot(), vec!["b".to_string()]);
    }
}
