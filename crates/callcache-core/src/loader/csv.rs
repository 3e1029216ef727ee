//! Parser for the comma-separated call-sign dataset.
//!
//! The first line is a header and is skipped. Each remaining non-blank line
//! is split on commas outside double quotes; quote characters are not part
//! of the field value, and a doubled quote inside a quoted field yields one
//! literal quote. Fields are trimmed. Lines with fewer than three fields are
//! dropped. Only the first three fields are used.

use tracing::debug;

use crate::models::CallsignEntry;

const DELIMITER: char = ',';
const QUOTE: char = '"';

/// Minimum fields for a usable line: call sign, first name, last name.
const MIN_FIELDS: usize = 3;

/// Output of a parse: usable entries plus how many data lines were dropped.
#[derive(Debug, Default)]
pub struct ParsedDataset {
    pub entries: Vec<CallsignEntry>,
    pub skipped_lines: usize,
}

pub fn parse(text: &str) -> ParsedDataset {
    let mut parsed = ParsedDataset::default();

    for (index, line) in text.split('\n').enumerate().skip(1) {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let fields = parse_line(line);
        if fields.len() < MIN_FIELDS {
            debug!(line = index + 1, fields = fields.len(), "Skipping malformed callsign line");
            parsed.skipped_lines += 1;
            continue;
        }

        parsed
            .entries
            .push(CallsignEntry::new(&fields[0], &fields[1], &fields[2]));
    }

    parsed
}

/// Split one line into trimmed fields.
pub fn parse_line(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            QUOTE if in_quotes && chars.peek() == Some(&QUOTE) => {
                current.push(QUOTE);
                chars.next();
            }
            QUOTE => in_quotes = !in_quotes,
            DELIMITER if !in_quotes => {
                fields.push(current.trim().to_string());
                current.clear();
            }
            _ => current.push(c),
        }
    }

    fields.push(current.trim().to_string());
    fields
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_line_plain() {
        assert_eq!(parse_line("W1AW,Hiram,Maxim"), vec!["W1AW", "Hiram", "Maxim"]);
    }

    #[test]
    fn test_parse_line_quoted_delimiter() {
        let fields = parse_line(r#"W1AAA,"Smith, Jr.",John"#);
        assert_eq!(fields, vec!["W1AAA", "Smith, Jr.", "John"]);
    }

    #[test]
    fn test_parse_line_doubled_quote() {
        let fields = parse_line(r#"K1ABC,"Robert ""Bob""",Jones"#);
        assert_eq!(fields, vec!["K1ABC", r#"Robert "Bob""#, "Jones"]);
    }

    #[test]
    fn test_parse_line_trims_fields() {
        assert_eq!(parse_line(" W1AW , Hiram ,Maxim "), vec!["W1AW", "Hiram", "Maxim"]);
    }

    #[test]
    fn test_parse_skips_header_and_blank_lines() {
        let text = "callsign,first,last\n\nw1aw,Hiram,Maxim\r\n   \nk1abc,Jane,Doe,extra\n";
        let parsed = parse(text);
        assert_eq!(parsed.entries.len(), 2);
        assert_eq!(parsed.entries[0].call_sign, "W1AW");
        assert_eq!(parsed.entries[0].last_name, "Maxim");
        assert_eq!(parsed.entries[1].call_sign, "K1ABC");
        assert_eq!(parsed.skipped_lines, 0);
    }

    #[test]
    fn test_parse_drops_short_line_and_keeps_next() {
        let text = "callsign,first,last\nW1AAA,John\nK1ABC,Jane,Doe\n";
        let parsed = parse(text);
        assert_eq!(parsed.entries, vec![CallsignEntry::new("K1ABC", "Jane", "Doe")]);
        assert_eq!(parsed.skipped_lines, 1);
    }

    #[test]
    fn test_parse_header_only() {
        let parsed = parse("callsign,first,last");
        assert!(parsed.entries.is_empty());
        assert!(parse("").entries.is_empty());
    }
}
