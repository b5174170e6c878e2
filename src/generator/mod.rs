//! Text generation: content lines, parameter quoting and line folding.

use crate::{
    PARAM_DELIMITER, PARAM_NAME_DELIMITER, PARAM_QUOTE, PARAM_VALUE_DELIMITER, VALUE_DELIMITER,
    parser::{ContentLine, ContentLineParams},
};

mod ical;

/// Maximum line length in octets, not counting the CRLF.
const MAX_LINE_OCTETS: usize = 75;

pub trait Emitter {
    fn generate(&self) -> String;
}

impl<T: Emitter> Emitter for Vec<T> {
    fn generate(&self) -> String {
        self.iter().map(Emitter::generate).collect()
    }
}

impl<T: Emitter> Emitter for Option<T> {
    fn generate(&self) -> String {
        self.as_ref().map(Emitter::generate).unwrap_or_default()
    }
}

impl Emitter for ContentLineParams {
    fn generate(&self) -> String {
        let mut out = String::new();
        for (name, values) in self.iter() {
            out.push(PARAM_DELIMITER);
            out.push_str(name);
            out.push(PARAM_NAME_DELIMITER);
            out.push_str(&itertools::join(
                values.iter().map(|value| quote_param_value(value)),
                &PARAM_VALUE_DELIMITER.to_string(),
            ));
        }
        out
    }
}

impl Emitter for ContentLine {
    fn generate(&self) -> String {
        let line = format!(
            "{name}{params}{VALUE_DELIMITER}{value}",
            name = self.name,
            params = self.params.generate(),
            value = self.value
        );
        fold_line(&line)
    }
}

/// Quotes a parameter value if it contains a delimiter.
///
/// A double quote cannot appear inside a parameter value at all and is
/// replaced by a single quote.
pub fn quote_param_value(value: &str) -> String {
    let value = value.replace(PARAM_QUOTE, "'");
    if value.contains([VALUE_DELIMITER, PARAM_DELIMITER, PARAM_VALUE_DELIMITER]) {
        format!("{PARAM_QUOTE}{value}{PARAM_QUOTE}")
    } else {
        value
    }
}

/// Folds a logical line to the 75-octet limit and terminates it with CRLF.
///
/// Continuation lines start with a single space. Multi-octet characters are
/// never split.
pub fn fold_line(line: &str) -> String {
    if line.len() <= MAX_LINE_OCTETS {
        return format!("{line}\r\n");
    }

    let mut out = String::with_capacity(line.len() + (line.len() / MAX_LINE_OCTETS + 1) * 3);
    let mut rest = line;
    let mut limit = MAX_LINE_OCTETS;
    loop {
        if rest.len() <= limit {
            out.push_str(rest);
            out.push_str("\r\n");
            return out;
        }
        let mut end = limit;
        while !rest.is_char_boundary(end) {
            end -= 1;
        }
        let (head, tail) = rest.split_at(end);
        out.push_str(head);
        out.push_str("\r\n ");
        rest = tail;
        // Leading space of the continuation counts against the limit
        limit = MAX_LINE_OCTETS - 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ContentLineParser;
    use rstest::rstest;

    #[test]
    fn short_line() {
        assert_eq!(fold_line("SUMMARY:Short"), "SUMMARY:Short\r\n");
        let exact = "X".repeat(75);
        assert_eq!(fold_line(&exact), format!("{exact}\r\n"));
    }

    #[test]
    fn long_line_respects_octet_limit() {
        let line = format!("DESCRIPTION:{}", "0123456789".repeat(20));
        let folded = fold_line(&line);
        for physical in folded.split("\r\n").filter(|l| !l.is_empty()) {
            assert!(physical.len() <= 75, "{physical:?}");
        }
        let unfolded = folded.replace("\r\n ", "");
        assert_eq!(unfolded, format!("{line}\r\n"));
    }

    #[test]
    fn multi_octet_characters_are_not_split() {
        let line = format!("{}日本語日本語", "A".repeat(73));
        let folded = fold_line(&line);
        assert!(folded.starts_with(&format!("{}\r\n 日", "A".repeat(73))));
        assert_eq!(folded.replace("\r\n ", ""), format!("{line}\r\n"));
    }

    #[rstest]
    #[case("Simple", "Simple")]
    #[case("Doe, Jane", "\"Doe, Jane\"")]
    #[case("mailto:a@b", "\"mailto:a@b\"")]
    #[case("Has\"quote", "Has'quote")]
    fn param_quoting(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(quote_param_value(input), expected);
    }

    #[test]
    fn folded_content_line_reparses_identically() {
        let input = ContentLine::new("DESCRIPTION", "äöü ".repeat(40)).with_params(
            ContentLineParams::default()
                .with("ALTREP", "cid:part1.0001@example.org")
                .with("LANGUAGE", "de"),
        );
        let generated = input.generate();
        let parsed = ContentLineParser::from_slice(generated.as_bytes())
            .next()
            .unwrap()
            .unwrap();
        similar_asserts::assert_eq!(parsed, input);
    }
}
