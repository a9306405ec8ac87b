//! Ring buffer of timestamped signal activity, for post-mortem inspection of
//! a failed scenario.

#[derive(Debug, Clone)]
pub struct TraceEntry {
    pub t_ns: u64,
    pub kind: TraceKind,
    pub data: Vec<u8>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TraceKind {
    /// Input line drive (packed pin byte).
    In,
    /// Output word change (port0, port1).
    Out,
}

pub struct TraceStore {
    entries: Vec<TraceEntry>,
    max_entries: usize,
    filter_in: bool,
    filter_out: bool,
}

impl TraceStore {
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: Vec::new(),
            max_entries,
            filter_in: true,
            filter_out: true,
        }
    }

    pub fn set_filter(&mut self, show_in: bool, show_out: bool) {
        self.filter_in = show_in;
        self.filter_out = show_out;
    }

    pub fn push(&mut self, t_ns: u64, kind: TraceKind, data: Vec<u8>) {
        self.entries.push(TraceEntry { t_ns, kind, data });
        if self.entries.len() > self.max_entries {
            self.entries.remove(0);
        }
    }

    pub fn entries(&self) -> &[TraceEntry] {
        &self.entries
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn to_text(&self, show_timestamp: bool) -> String {
        let mut result = String::new();
        for entry in &self.entries {
            if (entry.kind == TraceKind::In && !self.filter_in)
                || (entry.kind == TraceKind::Out && !self.filter_out)
            {
                continue;
            }

            let prefix = match entry.kind {
                TraceKind::In => "IN:  ",
                TraceKind::Out => "OUT: ",
            };

            if show_timestamp {
                result.push_str(&format!("[{:>12} ns] ", entry.t_ns));
            }
            result.push_str(prefix);
            for byte in &entry.data {
                result.push_str(&format!("{byte:02X} "));
            }
            result.push('\n');
        }
        result
    }
}
