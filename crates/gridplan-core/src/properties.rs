//! Line-oriented `key=value` property text.

use indexmap::IndexMap;

/// Parse line-oriented `key=value` text.
///
/// Blank lines and lines starting with `#` or `!` are skipped. The key ends
/// at the first unescaped `=`, `:` or whitespace. A trailing backslash joins
/// the next line. Later duplicates replace earlier values but keep the
/// position of the first occurrence.
pub fn parse_properties(text: &str) -> Vec<(String, String)> {
    let mut entries: IndexMap<String, String> = IndexMap::new();

    for line in logical_lines(text) {
        let (key, value) = split_entry(&line);
        if key.is_empty() {
            continue;
        }
        entries.insert(key, value);
    }

    entries.into_iter().collect()
}

fn logical_lines(text: &str) -> Vec<String> {
    let mut lines = Vec::new();
    let mut pending: Option<String> = None;

    for raw in text.lines() {
        let trimmed = raw.trim_start();
        let mut line = match pending.take() {
            Some(mut acc) => {
                acc.push_str(trimmed);
                acc
            }
            None => {
                if trimmed.is_empty() || trimmed.starts_with('#') || trimmed.starts_with('!') {
                    continue;
                }
                trimmed.to_string()
            }
        };

        let trailing = line.chars().rev().take_while(|c| *c == '\\').count();
        if trailing % 2 == 1 {
            line.pop();
            pending = Some(line);
        } else {
            lines.push(line);
        }
    }

    if let Some(rest) = pending {
        lines.push(rest);
    }
    lines
}

fn split_entry(line: &str) -> (String, String) {
    let mut key = String::new();
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                if let Some(next) = chars.next() {
                    key.push(unescape(next));
                }
            }
            '=' | ':' => break,
            c if c.is_whitespace() => {
                while chars.peek().is_some_and(|c| c.is_whitespace()) {
                    chars.next();
                }
                if chars.peek().is_some_and(|c| *c == '=' || *c == ':') {
                    chars.next();
                }
                break;
            }
            c => key.push(c),
        }
    }

    let mut value = String::new();
    let rest: String = chars.collect();
    let mut chars = rest.trim_start().chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(next) = chars.next() {
                value.push(unescape(next));
            }
        } else {
            value.push(c);
        }
    }

    (key, value.trim_end().to_string())
}

fn unescape(c: char) -> char {
    match c {
        't' => '\t',
        'n' => '\n',
        'r' => '\r',
        'f' => '\u{c}',
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn comments_separators_and_continuations() {
        let text = "# comment\n! also comment\n\n  a = 1\nb:2\nc 3\nd\\=x=4\ne=5\\\n   6\na=7\n";
        let entries = parse_properties(text);
        assert_eq!(
            entries,
            [
                ("a".to_string(), "7".to_string()),
                ("b".to_string(), "2".to_string()),
                ("c".to_string(), "3".to_string()),
                ("d=x".to_string(), "4".to_string()),
                ("e".to_string(), "56".to_string()),
            ]
        );
    }

    #[test]
    fn dangling_continuation_keeps_what_was_read() {
        let entries = parse_properties("a=1\\");
        assert_eq!(entries, [("a".to_string(), "1".to_string())]);
    }

    #[test]
    fn key_without_value() {
        let entries = parse_properties("lonely\n");
        assert_eq!(entries, [("lonely".to_string(), String::new())]);
    }
}
