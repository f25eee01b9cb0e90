//! Annotation syntax parser
//!
//! A comment line carries at most one annotation of the form
//! `@Name(key1=value1, key2=value2)`. Values may be wrapped in backticks
//! (verbatim), double quotes (with escapes) or left bare (trimmed).

use super::Annotation;

/// Split a raw comment (line or block) into its text lines without comment markers
pub fn strip_comment_markers(comment: &str) -> Vec<String> {
    let trimmed = comment.trim();
    if let Some(line) = trimmed.strip_prefix("//") {
        return vec![line.trim().to_string()];
    }

    let body = trimmed
        .strip_prefix("/*")
        .map(|rest| rest.strip_suffix("*/").unwrap_or(rest))
        .unwrap_or(trimmed);

    body.lines()
        .map(|line| {
            let line = line.trim();
            line.strip_prefix('*').unwrap_or(line).trim().to_string()
        })
        .collect()
}

/// Parse every annotation in a comment, one per line
pub fn parse_annotations(comment: &str) -> Vec<Annotation> {
    strip_comment_markers(comment)
        .iter()
        .filter_map(|line| parse_annotation(line))
        .collect()
}

/// Parse the first annotation found on a single comment line
pub fn parse_annotation(line: &str) -> Option<Annotation> {
    let bytes = line.as_bytes();
    let mut search_from = 0;

    while let Some(offset) = line[search_from..].find('@') {
        let at = search_from + offset;
        search_from = at + 1;

        if at > 0 {
            let prev = bytes[at - 1];
            if prev.is_ascii_alphanumeric() || prev == b'_' {
                continue;
            }
        }

        let name_start = at + 1;
        let name_len = line[name_start..]
            .bytes()
            .take_while(|b| b.is_ascii_alphanumeric() || *b == b'_')
            .count();
        if name_len == 0 || !bytes[name_start].is_ascii_alphabetic() {
            continue;
        }

        let open = name_start + name_len;
        if bytes.get(open) != Some(&b'(') {
            continue;
        }

        let Some(inner) = enclosed_params(&line[open + 1..]) else {
            continue;
        };

        let mut annotation = Annotation::new(&line[name_start..open]);
        for segment in split_top_level(inner) {
            let segment = segment.trim();
            if segment.is_empty() {
                continue;
            }
            match segment.split_once('=') {
                Some((key, value)) => annotation.insert(key.trim().to_string(), decode_value(value)),
                None => annotation.insert(segment.to_string(), "true".to_string()),
            }
        }
        return Some(annotation);
    }

    None
}

/// Return the text up to the `)` closing the parameter list, or None if unterminated
fn enclosed_params(rest: &str) -> Option<&str> {
    let mut scanner = QuoteState::default();
    let mut depth = 0usize;

    for (idx, ch) in rest.char_indices() {
        if scanner.consume(ch) {
            continue;
        }
        match ch {
            '(' | '[' | '{' => depth += 1,
            ']' | '}' => depth = depth.saturating_sub(1),
            ')' if depth == 0 => return Some(&rest[..idx]),
            ')' => depth -= 1,
            _ => {}
        }
    }
    None
}

/// Split on commas that are not inside quotes, backticks or brackets
fn split_top_level(inner: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut scanner = QuoteState::default();
    let mut depth = 0usize;
    let mut start = 0;

    for (idx, ch) in inner.char_indices() {
        if scanner.consume(ch) {
            continue;
        }
        match ch {
            '(' | '[' | '{' => depth += 1,
            ')' | ']' | '}' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                parts.push(&inner[start..idx]);
                start = idx + 1;
            }
            _ => {}
        }
    }
    parts.push(&inner[start..]);
    parts
}

fn decode_value(raw: &str) -> String {
    let value = raw.trim();

    if value.len() >= 2 && value.starts_with('`') && value.ends_with('`') {
        return value[1..value.len() - 1].to_string();
    }

    if let Some(quoted) = value.strip_prefix('"') {
        let mut out = String::with_capacity(quoted.len());
        let mut chars = quoted.chars();
        while let Some(ch) = chars.next() {
            match ch {
                '"' => break,
                '\\' => match chars.next() {
                    Some('n') => out.push('\n'),
                    Some('t') => out.push('\t'),
                    Some('r') => out.push('\r'),
                    Some(other) => out.push(other),
                    None => out.push('\\'),
                },
                other => out.push(other),
            }
        }
        return out;
    }

    value.to_string()
}

/// Tracks whether the scanner is inside a backtick or double-quoted span
#[derive(Default)]
struct QuoteState {
    backtick: bool,
    quote: bool,
    escaped: bool,
}

impl QuoteState {
    /// Feed one character; returns true when the character belongs to a quoted span
    fn consume(&mut self, ch: char) -> bool {
        if self.backtick {
            if ch == '`' {
                self.backtick = false;
            }
            return true;
        }
        if self.quote {
            if self.escaped {
                self.escaped = false;
            } else if ch == '\\' {
                self.escaped = true;
            } else if ch == '"' {
                self.quote = false;
            }
            return true;
        }
        match ch {
            '`' => {
                self.backtick = true;
                true
            }
            '"' => {
                self.quote = true;
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bare_values() {
        let ann = parse_annotation("@Pick(name=UserLite, fields=ID)").unwrap();
        assert_eq!(ann.name, "Pick");
        assert_eq!(ann.get("name"), Some("UserLite"));
        assert_eq!(ann.get("fields"), Some("ID"));
        assert_eq!(ann.param_count(), 2);
    }

    #[test]
    fn test_backtick_value_keeps_commas() {
        let ann = parse_annotation("@Pick(name=A, fields=`[ID, Name,Email]`)").unwrap();
        assert_eq!(ann.get("fields"), Some("[ID, Name,Email]"));
        assert_eq!(ann.get("name"), Some("A"));
    }

    #[test]
    fn test_double_quoted_escapes() {
        let ann = parse_annotation(r#"@Code(code=1, msg="say \"hi\", then go")"#).unwrap();
        assert_eq!(ann.get("msg"), Some(r#"say "hi", then go"#));
        assert_eq!(ann.get("code"), Some("1"));
    }

    #[test]
    fn test_parenthesis_inside_quotes() {
        let ann = parse_annotation(r#"@Code(msg="not found (user)", http=404)"#).unwrap();
        assert_eq!(ann.get("msg"), Some("not found (user)"));
        assert_eq!(ann.get("http"), Some("404"));
    }

    #[test]
    fn test_flag_without_value() {
        let ann = parse_annotation("@Mock(strict)").unwrap();
        assert_eq!(ann.get("strict"), Some("true"));
    }

    #[test]
    fn test_no_params() {
        let ann = parse_annotation("@Gsql()").unwrap();
        assert_eq!(ann.name, "Gsql");
        assert_eq!(ann.param_count(), 0);
    }

    #[test]
    fn test_email_is_not_annotation() {
        assert!(parse_annotation("contact admin@example(dot)com").is_none());
    }

    #[test]
    fn test_unterminated_is_ignored() {
        assert!(parse_annotation("@Pick(name=A, fields=`[A,B]`").is_none());
    }

    #[test]
    fn test_repeated_key_replaces() {
        let ann = parse_annotation("@Pick(name=A, name=B)").unwrap();
        assert_eq!(ann.get("name"), Some("B"));
        assert_eq!(ann.param_count(), 1);
    }

    #[test]
    fn test_block_comment_one_annotation_per_line() {
        let comment = "/*\n * @Pick(name=A, fields=`[ID]`)\n * @Pick(name=B, fields=`[Name]`)\n */";
        let anns = parse_annotations(comment);
        assert_eq!(anns.len(), 2);
        assert_eq!(anns[0].get("name"), Some("A"));
        assert_eq!(anns[1].get("name"), Some("B"));
    }

    #[test]
    fn test_go_gen_prefix() {
        let anns = parse_annotations("//go:gen:@Pick(source=example.com/m/user.User, name=Lite)");
        assert_eq!(anns.len(), 1);
        assert_eq!(anns[0].get("source"), Some("example.com/m/user.User"));
    }
}
