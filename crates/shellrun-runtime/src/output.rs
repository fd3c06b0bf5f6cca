//! The `KEY=VALUE` output grammar spoken by lifecycle commands on stdout.
//!
//! One pair per line. The first `=` separates key from value, so values may
//! contain `=`. Keys must be non-empty; a repeated key overwrites the earlier
//! value. Whitespace-only lines are skipped. Anything else is rejected with the
//! offending line and its 1-based line number.

use crate::RuntimeError;
use shellrun_schema::OutputMap;
use std::fmt::Write as _;

pub fn parse_output(text: &str) -> Result<OutputMap, RuntimeError> {
    let mut output = OutputMap::new();
    for (idx, raw) in text.split('\n').enumerate() {
        let line = raw.strip_suffix('\r').unwrap_or(raw);
        if line.trim().is_empty() {
            continue;
        }
        match line.split_once('=') {
            Some((key, value)) if !key.is_empty() => {
                output.insert(key.to_owned(), value.to_owned());
            }
            _ => {
                return Err(RuntimeError::MalformedOutputLine {
                    line_number: idx + 1,
                    line: line.to_owned(),
                });
            }
        }
    }
    Ok(output)
}

/// Parse raw stdout bytes; invalid UTF-8 sequences are replaced.
pub fn parse_output_bytes(bytes: &[u8]) -> Result<OutputMap, RuntimeError> {
    parse_output(&String::from_utf8_lossy(bytes))
}

pub fn render_output(output: &OutputMap) -> String {
    let mut rendered = String::new();
    for (key, value) in output {
        let _ = writeln!(rendered, "{key}={value}");
    }
    rendered
}
