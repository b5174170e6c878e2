//! Group content lines into nested `BEGIN`/`END` blocks.
//!
//! The parser is lenient below the top level. A content line that cannot be
//! read is left out and listed in [`RawComponent::skipped`]; the block keeps
//! its other lines. A block with a missing or stray `END` is still returned,
//! carrying the error in [`RawComponent::defect`], so that the caller can drop
//! that one block and keep its siblings. Only problems with the top-level
//! block itself end iteration with an error.

use crate::{
    ContentLineParser,
    parser::{ContentLine, ParserError},
};

/// A content line together with the line number it started on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawProperty {
    pub line: usize,
    pub content: ContentLine,
}

/// A component block as read from the input, before any interpretation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawComponent {
    /// Uppercased component name (`VEVENT`, `VALARM`, ...).
    pub name: String,
    /// Line of the `BEGIN` marker.
    pub line: usize,
    pub properties: Vec<RawProperty>,
    pub children: Vec<RawComponent>,
    /// Lines of this block that could not be read, with their line numbers.
    pub skipped: Vec<(usize, ParserError)>,
    /// First structural problem found inside this block.
    pub defect: Option<ParserError>,
}

impl RawComponent {
    fn new(name: String, line: usize) -> Self {
        Self {
            name,
            line,
            properties: vec![],
            children: vec![],
            skipped: vec![],
            defect: None,
        }
    }

    fn mark(&mut self, err: ParserError) {
        self.defect.get_or_insert(err);
    }

    pub fn get_property(&self, name: &str) -> Option<&RawProperty> {
        self.properties.iter().find(|prop| prop.content.name == name)
    }

    pub fn get_named_properties<'c>(
        &'c self,
        name: &'c str,
    ) -> impl Iterator<Item = &'c RawProperty> {
        self.properties
            .iter()
            .filter(move |prop| prop.content.name == name)
    }

    /// Lines skipped in this block and in every block nested in it.
    pub fn skipped_lines(&self) -> Vec<&(usize, ParserError)> {
        self.skipped
            .iter()
            .chain(self.children.iter().flat_map(Self::skipped_lines))
            .collect()
    }

    /// Drops line information, keeping the block for verbatim re-emission.
    pub fn to_opaque(&self) -> OpaqueComponent {
        OpaqueComponent {
            name: self.name.clone(),
            properties: self
                .properties
                .iter()
                .map(|prop| prop.content.clone())
                .collect(),
            children: self.children.iter().map(Self::to_opaque).collect(),
        }
    }
}

/// A component the codec does not interpret, kept so it can be written back.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OpaqueComponent {
    pub name: String,
    pub properties: Vec<ContentLine>,
    pub children: Vec<OpaqueComponent>,
}

impl OpaqueComponent {
    pub fn get_property(&self, name: &str) -> Option<&ContentLine> {
        self.properties.iter().find(|prop| prop.name == name)
    }
}

/// Reader returning top-level [`RawComponent`]s.
pub struct ComponentParser<'a> {
    line_parser: ContentLineParser<'a>,
    done: bool,
}

impl<'a> ComponentParser<'a> {
    pub fn from_slice(slice: &'a [u8]) -> Self {
        Self::new(ContentLineParser::from_slice(slice))
    }

    pub fn new(line_parser: ContentLineParser<'a>) -> Self {
        Self {
            line_parser,
            done: false,
        }
    }

    /// Read the next line and check it opens a component.
    fn check_header(&mut self) -> Result<Option<RawComponent>, ParserError> {
        let line = match self.line_parser.next() {
            Some(val) => val?,
            None => return Ok(None),
        };
        if line.name != "BEGIN" || line.value.is_empty() {
            return Err(ParserError::MissingHeader("VCALENDAR"));
        }
        Ok(Some(RawComponent::new(
            line.value.to_uppercase(),
            self.line_parser.line_number(),
        )))
    }

    fn parse_block(&mut self, root: RawComponent) -> Result<RawComponent, ParserError> {
        let mut stack = vec![root];

        loop {
            let Some(next) = self.line_parser.next() else {
                return Err(ParserError::NotComplete(stack.swap_remove(0).name));
            };
            let line_number = self.line_parser.line_number();
            let content = match next {
                Ok(content) => content,
                Err(err) if err.is_fatal() => return Err(err.into()),
                Err(err) => {
                    if let Some(current) = stack.last_mut() {
                        current.skipped.push((line_number, err.into()));
                    }
                    continue;
                }
            };

            match content.name.as_str() {
                "BEGIN" => stack.push(RawComponent::new(content.value.to_uppercase(), line_number)),
                "END" => {
                    let name = content.value.to_uppercase();
                    let Some(depth) = stack.iter().rposition(|comp| comp.name == name) else {
                        if let Some(current) = stack.last_mut() {
                            current.mark(ParserError::UnexpectedEnd(name));
                        }
                        continue;
                    };
                    // Close everything opened after the matching BEGIN
                    while stack.len() > depth + 1 {
                        if let Some(mut unclosed) = stack.pop() {
                            unclosed.mark(ParserError::MissingEnd(unclosed.name.clone()));
                            if let Some(parent) = stack.last_mut() {
                                parent.children.push(unclosed);
                            }
                        }
                    }
                    let Some(closed) = stack.pop() else {
                        continue;
                    };
                    match stack.last_mut() {
                        Some(parent) => parent.children.push(closed),
                        None => return Ok(closed),
                    }
                }
                _ => {
                    if let Some(current) = stack.last_mut() {
                        current.properties.push(RawProperty {
                            line: line_number,
                            content,
                        });
                    }
                }
            }
        }
    }

    /// Expect the input to hold exactly one top-level component.
    pub fn expect_one(mut self) -> Result<RawComponent, ParserError> {
        let item = self.next().ok_or(ParserError::EmptyInput)??;
        if self.next().is_some() {
            return Err(ParserError::TooManyComponents);
        }
        Ok(item)
    }
}

impl Iterator for ComponentParser<'_> {
    type Item = Result<RawComponent, ParserError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let result = match self.check_header() {
            Ok(Some(root)) => self.parse_block(root),
            Ok(None) => return None,
            Err(err) => Err(err),
        };
        self.done = result.is_err();
        Some(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::LineError;

    fn parse(input: &str) -> Result<RawComponent, ParserError> {
        ComponentParser::from_slice(input.as_bytes()).expect_one()
    }

    #[test]
    fn nested_blocks() {
        let root = parse(
            "BEGIN:VCALENDAR\r\nVERSION:2.0\r\nBEGIN:VEVENT\r\nUID:1\r\nBEGIN:VALARM\r\nACTION:DISPLAY\r\nEND:VALARM\r\nEND:VEVENT\r\nEND:VCALENDAR\r\n",
        )
        .unwrap();
        assert_eq!(root.name, "VCALENDAR");
        assert_eq!(root.properties.len(), 1);
        let event = &root.children[0];
        assert_eq!(event.name, "VEVENT");
        assert_eq!(event.line, 3);
        assert_eq!(event.get_property("UID").unwrap().line, 4);
        assert_eq!(event.children[0].name, "VALARM");
        assert!(event.defect.is_none());
    }

    #[test]
    fn unreadable_line_is_skipped() {
        let root = parse(
            "BEGIN:VCALENDAR\nBEGIN:VTODO\nUID:a\nnot a content line\nX-VENDOR;BROKENPARAM:x\nSUMMARY:kept\nEND:VTODO\nBEGIN:VTODO\nUID:b\nEND:VTODO\nEND:VCALENDAR\n",
        )
        .unwrap();
        assert_eq!(root.children.len(), 2);
        let todo = &root.children[0];
        assert!(todo.defect.is_none());
        assert_eq!(todo.properties.len(), 2);
        assert_eq!(todo.get_property("SUMMARY").unwrap().line, 6);
        let lines: Vec<_> = todo.skipped.iter().map(|(line, _)| *line).collect();
        assert_eq!(lines, vec![4, 5]);
        assert!(matches!(todo.skipped[0].1, ParserError::ContentLine(_)));
        assert!(root.children[1].skipped.is_empty());
        assert_eq!(root.skipped_lines().len(), 2);
    }

    #[test]
    fn control_character_spoils_one_line() {
        let root = parse(
            "BEGIN:VCALENDAR\nBEGIN:VEVENT\nUID:a\nDESCRIPTION:page\u{c}break\nEND:VEVENT\nEND:VCALENDAR\n",
        )
        .unwrap();
        let event = &root.children[0];
        assert!(event.defect.is_none());
        assert!(event.get_property("DESCRIPTION").is_none());
        assert_eq!(
            event.skipped,
            vec![(4, ParserError::Line(LineError::ControlCharacter(4)))]
        );
    }

    #[test]
    fn missing_inner_end() {
        let root = parse(
            "BEGIN:VCALENDAR\nBEGIN:VEVENT\nUID:a\nBEGIN:VALARM\nACTION:AUDIO\nEND:VEVENT\nEND:VCALENDAR\n",
        )
        .unwrap();
        let event = &root.children[0];
        assert!(event.defect.is_none());
        assert_eq!(
            event.children[0].defect,
            Some(ParserError::MissingEnd("VALARM".to_owned()))
        );
    }

    #[test]
    fn unexpected_end() {
        let root =
            parse("BEGIN:VCALENDAR\nBEGIN:VEVENT\nEND:VTODO\nEND:VEVENT\nEND:VCALENDAR\n").unwrap();
        assert_eq!(
            root.children[0].defect,
            Some(ParserError::UnexpectedEnd("VTODO".to_owned()))
        );
    }

    #[test]
    fn fatal_errors() {
        assert_eq!(parse(""), Err(ParserError::EmptyInput));
        assert_eq!(
            parse("VERSION:2.0\n"),
            Err(ParserError::MissingHeader("VCALENDAR"))
        );
        assert_eq!(
            parse("BEGIN:VCALENDAR\nBEGIN:VEVENT\nEND:VEVENT\n"),
            Err(ParserError::NotComplete("VCALENDAR".to_owned()))
        );
        assert_eq!(
            ComponentParser::from_slice(b"BEGIN:VCALENDAR\nSUMMARY:\xff\nEND:VCALENDAR\n")
                .expect_one(),
            Err(ParserError::Line(LineError::InvalidUtf8(2)))
        );
    }
}
