/// Escapes a TEXT value: backslash, semicolon, comma and line breaks.
///
/// A CRLF pair counts as one line break, as does a lone CR. Decoding
/// yields `\n` for each.
pub fn encode_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 8);
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\\' => out.push_str("\\\\"),
            ';' => out.push_str("\\;"),
            ',' => out.push_str("\\,"),
            '\n' => out.push_str("\\n"),
            '\r' => {
                if chars.peek() == Some(&'\n') {
                    chars.next();
                }
                out.push_str("\\n");
            }
            _ => out.push(c),
        }
    }
    out
}

/// Reverses [`encode_text`]. Any other backslash sequence is kept as is.
pub fn decode_text(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.peek() {
            Some('\\') => out.push('\\'),
            Some(';') => out.push(';'),
            Some(',') => out.push(','),
            Some('n' | 'N') => out.push('\n'),
            _ => {
                out.push('\\');
                continue;
            }
        }
        chars.next();
    }
    out
}

/// Splits a list value on commas that are not escaped.
pub fn split_list(value: &str) -> Vec<&str> {
    let mut items = vec![];
    let mut start = 0;
    let mut escaped = false;
    for (pos, c) in value.char_indices() {
        match c {
            '\\' if !escaped => escaped = true,
            ',' if !escaped => {
                items.push(&value[start..pos]);
                start = pos + 1;
            }
            _ => escaped = false,
        }
    }
    items.push(&value[start..]);
    items
}

pub fn encode_text_list<S: AsRef<str>>(items: &[S]) -> String {
    itertools::join(items.iter().map(|item| encode_text(item.as_ref())), ",")
}

pub fn decode_text_list(value: &str) -> Vec<String> {
    split_list(value)
        .into_iter()
        .filter(|item| !item.is_empty())
        .map(decode_text)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("hello, world", "hello\\, world")]
    #[case("line1\nline2", "line1\\nline2")]
    #[case("line1\r\nline2", "line1\\nline2")]
    #[case("back\\slash", "back\\\\slash")]
    #[case("semi;colon", "semi\\;colon")]
    #[case("plain: text", "plain: text")]
    fn escape(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(encode_text(input), expected);
    }

    #[rstest]
    #[case("a\\,b\\;c\\\\d\\ne", "a,b;c\\d\ne")]
    #[case("upper\\Nbreak", "upper\nbreak")]
    #[case("keep \\t and \\: as-is", "keep \\t and \\: as-is")]
    #[case("trailing\\", "trailing\\")]
    fn unescape(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(decode_text(input), expected);
    }

    #[test]
    fn escape_unescape_identity() {
        let text = "Meeting; agenda:\n1, 2 \\ 3";
        assert_eq!(decode_text(&encode_text(text)), text);
    }

    #[rstest]
    #[case("one\r\ntwo", "one\ntwo")]
    #[case("one\rtwo", "one\ntwo")]
    #[case("one\r\n\r\ntwo\r", "one\n\ntwo\n")]
    fn line_breaks_read_back_as_newline(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(decode_text(&encode_text(input)), expected);
    }

    #[test]
    fn list_respects_escaped_commas() {
        assert_eq!(
            decode_text_list("Work\\, urgent,Home,,"),
            vec!["Work, urgent".to_owned(), "Home".to_owned()]
        );
        assert_eq!(split_list("a\\\\,b"), vec!["a\\\\", "b"]);
    }
}
