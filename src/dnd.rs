//! Single-incidence payloads for drag and drop and the clipboard.

use chrono::{NaiveDate, NaiveTime, TimeDelta};

use crate::{
    calendar::{CALENDAR, DocumentResolver, Transcoder},
    component::{EventEnd, Incidence, IncidenceKind, parse_component},
    generator::Emitter,
    parser::{ComponentParser, ParserError, RawComponent},
    types::{CalDateOrDateTime, CalDateTime, TzResolver},
    warning::{Warning, WarningKind, Warnings},
};

impl<R: TzResolver> Transcoder<R> {
    /// Encodes one incidence as a bare component block.
    pub fn encode_drag(&self, incidence: &Incidence) -> String {
        incidence.generate()
    }

    /// Decodes a dropped payload: either a bare incidence block or a
    /// `VCALENDAR` holding exactly one incidence.
    #[tracing::instrument(skip_all, fields(len = text.len()))]
    pub fn decode_drop(&self, text: &str) -> Result<(Incidence, Vec<Warning>), ParserError> {
        let root = ComponentParser::from_slice(text.as_bytes()).expect_one()?;
        let mut warnings = Warnings::default();
        let mut resolver = DocumentResolver::new(self.resolver());
        let block = if root.name == CALENDAR {
            if self.options().use_document_timezones {
                root.children
                    .iter()
                    .filter(|child| child.name == "VTIMEZONE")
                    .for_each(|timezone| resolver.define(timezone));
            }
            for (line, error) in &root.skipped {
                warnings.push(Warning::new(
                    Some(*line),
                    WarningKind::LineSkipped(error.clone()),
                ));
            }
            single_incidence(&root)?
        } else {
            &root
        };
        let incidence = parse_component(block, &resolver, &mut warnings)?;
        Ok((incidence, warnings.into_vec()))
    }

    /// Copies an incidence to clipboard text.
    pub fn copy_incidence(&self, incidence: &Incidence) -> String {
        self.serialize_document(std::slice::from_ref(incidence))
    }

    /// Pastes an incidence as a new one on `date`.
    ///
    /// The copy gets a fresh UID and is moved so that it starts (or, for a
    /// to-do with a due date, is due) on `date`, at `time` if one is given
    /// and the incidence is not all-day. Its length is kept.
    pub fn paste_event(
        &self,
        text: &str,
        date: NaiveDate,
        time: Option<NaiveTime>,
    ) -> Result<(Incidence, Vec<Warning>), ParserError> {
        let (mut incidence, warnings) = self.decode_drop(text)?;
        incidence.uid = uuid::Uuid::new_v4().to_string();
        incidence.sequence = 0;
        let now = CalDateTime::now_utc();
        incidence.dtstamp = Some(now.clone());
        incidence.created = Some(now);
        incidence.last_modified = None;

        let anchor = match &incidence.kind {
            IncidenceKind::Todo(todo) => todo.due.as_ref().or(incidence.dtstart.as_ref()),
            _ => incidence.dtstart.as_ref(),
        };
        let Some(anchor) = anchor else {
            return Ok((incidence, warnings));
        };
        let delta = moved(anchor, date, time).naive() - anchor.naive();
        tracing::debug!(uid = %incidence.uid, %delta, "pasting incidence");

        incidence.dtstart = incidence.dtstart.as_ref().map(|start| shift(start, delta));
        match &mut incidence.kind {
            IncidenceKind::Event(event) => {
                if let Some(EventEnd::DtEnd(end)) = &mut event.end {
                    *end = shift(end, delta);
                }
            }
            IncidenceKind::Todo(todo) => {
                todo.due = todo.due.as_ref().map(|due| shift(due, delta));
            }
            IncidenceKind::Journal => {}
        }
        Ok((incidence, warnings))
    }
}

fn single_incidence(root: &RawComponent) -> Result<&RawComponent, ParserError> {
    let mut incidences = root
        .children
        .iter()
        .filter(|child| IncidenceKind::from_component_name(&child.name).is_some());
    let first = incidences.next().ok_or(ParserError::EmptyInput)?;
    if incidences.next().is_some() {
        return Err(ParserError::TooManyComponents);
    }
    Ok(first)
}

/// `value` placed on `date`, keeping its form and zone.
fn moved(value: &CalDateOrDateTime, date: NaiveDate, time: Option<NaiveTime>) -> CalDateOrDateTime {
    match value {
        CalDateOrDateTime::Date(_) => CalDateOrDateTime::Date(date),
        CalDateOrDateTime::DateTime(dt) => CalDateTime {
            local: date.and_time(time.unwrap_or(dt.local.time())),
            tz: dt.tz.clone(),
        }
        .into(),
    }
}

fn shift(value: &CalDateOrDateTime, delta: TimeDelta) -> CalDateOrDateTime {
    match value {
        CalDateOrDateTime::Date(date) => {
            CalDateOrDateTime::Date(date.checked_add_signed(delta).unwrap_or(*date))
        }
        CalDateOrDateTime::DateTime(dt) => CalDateTime {
            local: dt.local.checked_add_signed(delta).unwrap_or(dt.local),
            tz: dt.tz.clone(),
        }
        .into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use similar_asserts::assert_eq;

    fn at(y: i32, m: u32, d: u32, h: u32) -> CalDateOrDateTime {
        CalDateOrDateTime::DateTime(CalDateTime::floating(
            NaiveDate::from_ymd_opt(y, m, d)
                .unwrap()
                .and_hms_opt(h, 0, 0)
                .unwrap(),
        ))
    }

    fn lunch() -> Incidence {
        let mut event = Incidence::new_event("lunch");
        event.dtstart = Some(at(2024, 4, 2, 12));
        event.event_mut().unwrap().end = Some(EventEnd::DtEnd(at(2024, 4, 2, 13)));
        event.summary = Some("Lunch".to_owned());
        event
    }

    #[test]
    fn drag_and_drop() {
        let transcoder = <Transcoder>::default();
        let text = transcoder.encode_drag(&lunch());
        assert!(text.starts_with("BEGIN:VEVENT\r\n"));
        let (dropped, warnings) = transcoder.decode_drop(&text).unwrap();
        assert_eq!(dropped, lunch());
        assert!(warnings.is_empty());

        let (dropped, _) = transcoder
            .decode_drop(&transcoder.copy_incidence(&lunch()))
            .unwrap();
        assert_eq!(dropped, lunch());
    }

    #[test]
    fn drop_errors() {
        let transcoder = <Transcoder>::default();
        assert_eq!(
            transcoder.decode_drop("").unwrap_err(),
            ParserError::EmptyInput
        );
        assert_eq!(
            transcoder
                .decode_drop("BEGIN:VEVENT\nUID:a\nEND:VEVENT\nBEGIN:VEVENT\nUID:b\nEND:VEVENT\n")
                .unwrap_err(),
            ParserError::TooManyComponents
        );
        assert_eq!(
            transcoder
                .decode_drop("BEGIN:VCALENDAR\nBEGIN:VEVENT\nUID:a\nEND:VEVENT\nBEGIN:VTODO\nUID:b\nEND:VTODO\nEND:VCALENDAR\n")
                .unwrap_err(),
            ParserError::TooManyComponents
        );
        assert_eq!(
            transcoder
                .decode_drop("BEGIN:VCALENDAR\nEND:VCALENDAR\n")
                .unwrap_err(),
            ParserError::EmptyInput
        );
    }

    #[test]
    fn paste_moves_and_keeps_length() {
        let transcoder = <Transcoder>::default();
        let text = transcoder.copy_incidence(&lunch());
        let date = NaiveDate::from_ymd_opt(2024, 5, 6).unwrap();

        let (pasted, _) = transcoder
            .paste_event(&text, date, NaiveTime::from_hms_opt(18, 0, 0))
            .unwrap();
        assert_ne!(pasted.uid, "lunch");
        assert!(uuid::Uuid::parse_str(&pasted.uid).is_ok());
        assert_eq!(pasted.dtstart, Some(at(2024, 5, 6, 18)));
        assert_eq!(
            pasted.event().unwrap().end,
            Some(EventEnd::DtEnd(at(2024, 5, 6, 19)))
        );
        assert_eq!(pasted.summary.as_deref(), Some("Lunch"));

        let (pasted, _) = transcoder.paste_event(&text, date, None).unwrap();
        assert_eq!(pasted.dtstart, Some(at(2024, 5, 6, 12)));
    }

    #[test]
    fn paste_all_day_todo() {
        let transcoder = <Transcoder>::default();
        let mut todo = Incidence::new_todo("t-1");
        todo.dtstart = Some(CalDateOrDateTime::Date(
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
        ));
        todo.todo_mut().unwrap().due = Some(CalDateOrDateTime::Date(
            NaiveDate::from_ymd_opt(2024, 1, 3).unwrap(),
        ));

        let (pasted, _) = transcoder
            .paste_event(
                &transcoder.encode_drag(&todo),
                NaiveDate::from_ymd_opt(2024, 2, 10).unwrap(),
                NaiveTime::from_hms_opt(9, 0, 0),
            )
            .unwrap();
        assert_eq!(
            pasted.todo().unwrap().due,
            Some(CalDateOrDateTime::Date(
                NaiveDate::from_ymd_opt(2024, 2, 10).unwrap()
            ))
        );
        assert_eq!(
            pasted.dtstart,
            Some(CalDateOrDateTime::Date(
                NaiveDate::from_ymd_opt(2024, 2, 8).unwrap()
            ))
        );
    }
}
