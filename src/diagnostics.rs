//! The mapping issue log.
//!
//! Anomalies found while merging (a hinted CID missing from its subfont, a donor glyph name that
//! does not parse as a CID, and so on) are recorded by kind. Each issue is optionally written as
//! a line, and a summary of counts per kind is appended when the log is finished.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use log::warn;
use unicode_general_category::{get_general_category, GeneralCategory};

/// Stable issue kinds.
pub mod kind {
    pub const CID_NAME_UNPARSED: &str = "cid_name_unparsed";
    pub const CID_MAP_MISSING: &str = "cid_map_missing";
    pub const CID_SLOT_MISSING_SUBFONT: &str = "cid_slot_missing_subfont";
    pub const CID_SLOT_NOT_FOUND: &str = "cid_slot_not_found";
    pub const FEATURE_TAG_MISSING: &str = "feature_tag_missing";
    pub const JP_NO_SOURCE: &str = "jp_no_source";
}

/// Collects mapping issues and writes them to a sink.
pub struct MapLog {
    out: Option<Box<dyn Write>>,
    verbose: bool,
    max_entries: usize,
    logged: usize,
    counts: BTreeMap<String, usize>,
}

impl MapLog {
    /// A log that only counts.
    pub fn disabled() -> MapLog {
        MapLog {
            out: None,
            verbose: false,
            max_entries: 0,
            logged: 0,
            counts: BTreeMap::new(),
        }
    }

    /// Create (or truncate) the log file at `path` and write its header.
    pub fn create(
        path: &Path,
        version: &str,
        verbose: bool,
        max_entries: usize,
    ) -> io::Result<MapLog> {
        let file = BufWriter::new(File::create(path)?);
        MapLog::with_writer(Box::new(file), version, verbose, max_entries)
    }

    /// Write the log to `out`. `max_entries` of 0 means no limit.
    pub fn with_writer(
        mut out: Box<dyn Write>,
        version: &str,
        verbose: bool,
        max_entries: usize,
    ) -> io::Result<MapLog> {
        let timestamp = chrono::Local::now().format("%Y-%m-%d %H:%M:%S");
        writeln!(out, "# mapping issues log ({}) {}", version, timestamp)?;
        Ok(MapLog {
            out: Some(out),
            verbose,
            max_entries,
            logged: 0,
            counts: BTreeMap::new(),
        })
    }

    /// Count an event without writing a line for it.
    pub fn count_event(&mut self, kind: &str) {
        *self.counts.entry(kind.to_owned()).or_insert(0) += 1;
    }

    /// Record an issue, writing a line for it if the log is verbose and not yet full.
    pub fn log_issue(&mut self, kind: &str, codepoint: Option<u32>, detail: &str) {
        self.count_event(kind);
        if !self.verbose || (self.max_entries > 0 && self.logged >= self.max_entries) {
            return;
        }
        let Some(out) = &mut self.out else {
            return;
        };

        let mut line = format!("[{}]", kind);
        if let Some(codepoint) = codepoint {
            line.push(' ');
            line.push_str(&format_codepoint(codepoint));
        }
        if !detail.is_empty() {
            line.push(' ');
            line.push_str(detail);
        }
        match writeln!(out, "{}", line) {
            Ok(()) => self.logged += 1,
            Err(err) => {
                warn!("unable to write mapping log, disabling it: {}", err);
                self.out = None;
            }
        }
    }

    /// Issue counts by kind.
    pub fn counts(&self) -> &BTreeMap<String, usize> {
        &self.counts
    }

    pub fn count(&self, kind: &str) -> usize {
        self.counts.get(kind).copied().unwrap_or(0)
    }

    /// Append the summary and flush. Returns the counts by kind.
    pub fn finish(mut self) -> io::Result<BTreeMap<String, usize>> {
        if let Some(mut out) = self.out.take() {
            writeln!(out)?;
            writeln!(out, "# summary")?;
            for (kind, count) in &self.counts {
                writeln!(out, "{}={}", kind, count)?;
            }
            out.flush()?;
        }
        Ok(self.counts)
    }
}

fn format_codepoint(codepoint: u32) -> String {
    match char::from_u32(codepoint).filter(|&ch| is_printable(ch)) {
        Some(ch) => {
            let name = glyph_names::glyph_name(codepoint);
            let name = name.as_deref().unwrap_or("UNKNOWN");
            format!("U+{:04X} '{}' {}", codepoint, ch, name)
        }
        None => format!("U+{:04X}", codepoint),
    }
}

fn is_printable(ch: char) -> bool {
    use GeneralCategory::*;

    ch == ' '
        || !matches!(
            get_general_category(ch),
            Control
                | Format
                | Surrogate
                | PrivateUse
                | Unassigned
                | LineSeparator
                | ParagraphSeparator
                | SpaceSeparator
        )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    /// A writer whose contents can be read after the log takes ownership of it.
    #[derive(Clone, Default)]
    struct SharedBuffer(Rc<RefCell<Vec<u8>>>);

    impl Write for SharedBuffer {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.borrow_mut().write(buf)
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl SharedBuffer {
        fn contents(&self) -> String {
            String::from_utf8(self.0.borrow().clone()).unwrap()
        }
    }

    #[test]
    fn test_log_lines_and_summary() {
        let buffer = SharedBuffer::default();
        let mut log = MapLog::with_writer(Box::new(buffer.clone()), "25w51e", true, 0).unwrap();
        log.log_issue(kind::CID_SLOT_NOT_FOUND, Some(0x0007), "");
        log.log_issue(kind::CID_SLOT_MISSING_SUBFONT, Some(0x3042), "slot=843");
        log.log_issue(kind::CID_NAME_UNPARSED, None, "name=foo");
        log.count_event(kind::JP_NO_SOURCE);
        let counts = log.finish().unwrap();

        let contents = buffer.contents();
        let lines = contents.lines().collect::<Vec<_>>();
        let header = regex::Regex::new(
            r"^# mapping issues log \(25w51e\) \d{4}-\d{2}-\d{2} \d{2}:\d{2}:\d{2}$",
        )
        .unwrap();
        assert!(header.is_match(lines[0]));
        assert_eq!(lines[1], "[cid_slot_not_found] U+0007");
        let issue = regex::Regex::new(r"^\[cid_slot_missing_subfont\] U\+3042 'あ' \S+ slot=843$")
            .unwrap();
        assert!(issue.is_match(lines[2]), "{}", lines[2]);
        assert_eq!(lines[3], "[cid_name_unparsed] name=foo");
        assert_eq!(
            &lines[4..],
            &[
                "",
                "# summary",
                "cid_name_unparsed=1",
                "cid_slot_missing_subfont=1",
                "cid_slot_not_found=1",
                "jp_no_source=1"
            ]
        );
        assert_eq!(counts.get(kind::JP_NO_SOURCE), Some(&1));
    }

    #[test]
    fn test_name_field_is_glyph_name() {
        let buffer = SharedBuffer::default();
        let mut log = MapLog::with_writer(Box::new(buffer.clone()), "v", true, 0).unwrap();
        log.log_issue(kind::CID_MAP_MISSING, Some(0x41), "");
        log.finish().unwrap();
        assert_eq!(buffer.contents().lines().nth(1), Some("[cid_map_missing] U+0041 'A' A"));
    }

    #[test]
    fn test_entry_limit() {
        let buffer = SharedBuffer::default();
        let mut log = MapLog::with_writer(Box::new(buffer.clone()), "v", true, 1).unwrap();
        log.log_issue(kind::CID_MAP_MISSING, Some(0x41), "");
        log.log_issue(kind::CID_MAP_MISSING, Some(0x42), "");
        assert_eq!(log.count(kind::CID_MAP_MISSING), 2);
        log.finish().unwrap();
        assert_eq!(buffer.contents().matches("[cid_map_missing]").count(), 1);
    }

    #[test]
    fn test_quiet_log_only_counts() {
        let mut log = MapLog::disabled();
        log.log_issue(kind::CID_MAP_MISSING, Some(0x41), "");
        assert_eq!(log.count(kind::CID_MAP_MISSING), 1);
    }
}
