//! Report lines and the sinks they are written to.

use std::fmt;

/// Result of one completed task unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    pub id: u32,
    pub payload: Vec<u32>,
    pub sum: u32,
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}: sum({:?}) = {}", self.id, self.payload, self.sum)
    }
}

/// Destination for human-readable progress lines, in the order they happen.
pub trait Sink {
    fn emit(&self, line: &str);
}

pub struct StdoutSink;

impl Sink for StdoutSink {
    fn emit(&self, line: &str) {
        println!("{line}");
    }
}

/// Keeps every line in memory.
#[cfg(test)]
#[derive(Default)]
pub struct MemorySink {
    lines: std::cell::RefCell<Vec<String>>,
}

#[cfg(test)]
impl MemorySink {
    pub fn lines(&self) -> Vec<String> {
        self.lines.borrow().clone()
    }
}

#[cfg(test)]
impl Sink for MemorySink {
    fn emit(&self, line: &str) {
        self.lines.borrow_mut().push(line.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_line_format() {
        let report = Report {
            id: 3,
            payload: vec![12, 40],
            sum: 52,
        };
        assert_eq!(report.to_string(), "#3: sum([12, 40]) = 52");
    }
}
