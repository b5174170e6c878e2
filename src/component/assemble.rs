//! Component assembler: raw blocks to typed incidences and back.

use std::collections::HashSet;

use crate::{
    component::{Alarm, EventEnd, Incidence, IncidenceKind},
    parser::{ContentLine, OpaqueComponent, ParserError, RawComponent, RawProperty},
    property::{FieldValue, Mapped, Status, map_in, map_out_all},
    types::{TzResolver, decode_text},
    warning::{Warning, WarningKind, Warnings},
};

/// Property that producers such as libical insert to flag bad input.
const PRODUCER_ERROR: &str = "X-LIC-ERROR";

/// Runs the property mapper over the lines of one component and gathers the
/// warnings it produces.
pub(crate) struct FieldReader<'r> {
    resolver: &'r dyn TzResolver,
    seen: HashSet<&'static str>,
    warnings: Vec<Warning>,
}

impl<'r> FieldReader<'r> {
    pub fn new(resolver: &'r dyn TzResolver) -> Self {
        Self {
            resolver,
            seen: HashSet::new(),
            warnings: vec![],
        }
    }

    pub fn warn(&mut self, line: Option<usize>, kind: WarningKind) {
        self.warnings.push(Warning::new(line, kind));
    }

    /// Records lines the parser could not read.
    pub fn skipped<'a>(&mut self, lines: impl IntoIterator<Item = &'a (usize, ParserError)>) {
        for (line, error) in lines {
            self.warn(Some(*line), WarningKind::LineSkipped(error.clone()));
        }
    }

    /// Maps one property. `None` means the value was undecodable and the
    /// property is dropped.
    pub fn read(&mut self, prop: &RawProperty) -> Option<Mapped> {
        let mut notes = vec![];
        let mapped = map_in(&prop.content, self.resolver, &mut notes);
        for note in notes {
            self.warn(Some(prop.line), note);
        }
        match mapped {
            Ok(Mapped::Unrecognized(content)) if content.name == PRODUCER_ERROR => {
                self.warn(
                    Some(prop.line),
                    WarningKind::ProducerError(decode_text(&content.value)),
                );
                Some(Mapped::Unrecognized(content))
            }
            Ok(mapped) => Some(mapped),
            Err(error) => {
                self.warn(
                    Some(prop.line),
                    WarningKind::MalformedValue {
                        property: prop.content.name.clone(),
                        error,
                    },
                );
                None
            }
        }
    }

    /// Records a single-valued property; warns if it was already given.
    pub fn once(&mut self, name: &'static str, line: usize) {
        if !self.seen.insert(name) {
            self.warn(Some(line), WarningKind::DuplicateProperty(name.to_owned()));
        }
    }

    pub fn into_warnings(self) -> Vec<Warning> {
        self.warnings
    }
}

/// Assembles an incidence from a `VEVENT`, `VTODO` or `VJOURNAL` block.
///
/// Field-level problems, unreadable lines included, are recorded in
/// `warnings` under the incidence's UID. The block as a whole is rejected
/// only if it is structurally broken, is not an incidence, or has no UID.
pub fn parse_component(
    raw: &RawComponent,
    resolver: &dyn TzResolver,
    warnings: &mut Warnings,
) -> Result<Incidence, ParserError> {
    if let Some(defect) = &raw.defect {
        return Err(defect.clone());
    }
    let kind = IncidenceKind::from_component_name(&raw.name)
        .ok_or_else(|| ParserError::InvalidComponent(raw.name.clone()))?;

    let mut incidence = Incidence::empty(kind);
    let mut reader = FieldReader::new(resolver);
    reader.skipped(&raw.skipped);
    let mut percent_given = false;

    for prop in &raw.properties {
        match reader.read(prop) {
            Some(Mapped::Field(field)) => {
                if apply(&mut incidence, field, prop.line, &mut reader, &mut percent_given) {
                    incidence.params.keep(&prop.content);
                } else {
                    incidence.extensions.push(prop.content.clone());
                }
            }
            Some(Mapped::Unrecognized(content)) => incidence.extensions.push(content),
            None => {}
        }
    }

    if let IncidenceKind::Todo(todo) = &mut incidence.kind
        && todo.completed.is_some()
        && !percent_given
    {
        todo.percent_complete = 100;
    }

    for child in &raw.children {
        match child.name.as_str() {
            "VALARM" if !matches!(incidence.kind, IncidenceKind::Journal) => {
                let mut alarm_reader = FieldReader::new(resolver);
                incidence.alarms.extend(Alarm::parse(child, &mut alarm_reader));
                reader.warnings.extend(alarm_reader.into_warnings());
            }
            _ => match &child.defect {
                Some(error) => reader.warn(
                    Some(child.line),
                    WarningKind::ComponentDropped {
                        component: child.name.clone(),
                        error: error.clone(),
                    },
                ),
                None => {
                    reader.skipped(child.skipped_lines());
                    incidence.extra_components.push(child.to_opaque());
                }
            },
        }
    }

    if incidence.uid.is_empty() {
        warnings.extend_for(None, reader.into_warnings());
        return Err(ParserError::MissingProperty("UID"));
    }
    warnings.extend_for(Some(&incidence.uid), reader.into_warnings());
    Ok(incidence)
}

/// Sets one field on the incidence. Returns false if the field does not
/// apply to this kind of incidence.
fn apply(
    incidence: &mut Incidence,
    field: FieldValue,
    line: usize,
    reader: &mut FieldReader,
    percent_given: &mut bool,
) -> bool {
    let name = field.name();
    match (field, &mut incidence.kind) {
        (FieldValue::Attendee(attendee), _) => incidence.attendees.push(attendee),
        (FieldValue::Attach(attachment), _) => incidence.attachments.push(attachment),
        (FieldValue::Categories(categories), _) => incidence.categories.extend(categories),
        (FieldValue::ExDate(dates), _) => incidence.exdates.extend(dates),
        (FieldValue::RDate(dates), _) => incidence.rdates.extend(dates),

        (FieldValue::DtEnd(end), IncidenceKind::Event(event)) => {
            set_end(&mut event.end, EventEnd::DtEnd(end), name, line, reader);
        }
        (FieldValue::Duration(duration), IncidenceKind::Event(event)) => {
            set_end(&mut event.end, EventEnd::Duration(duration), name, line, reader);
        }
        (FieldValue::Transp(transparency), IncidenceKind::Event(event)) => {
            reader.once(name, line);
            event.transparency = transparency;
        }
        (FieldValue::Due(due), IncidenceKind::Todo(todo)) => {
            reader.once(name, line);
            todo.due = Some(due);
        }
        (FieldValue::Priority(priority), IncidenceKind::Todo(todo)) => {
            reader.once(name, line);
            todo.priority = priority;
        }
        (FieldValue::Completed(completed), IncidenceKind::Todo(todo)) => {
            reader.once(name, line);
            if *percent_given && todo.percent_complete != 100 {
                reader.warn(Some(line), WarningKind::CompletionConflict);
            }
            todo.completed = Some(completed);
            todo.percent_complete = 100;
        }
        (FieldValue::PercentComplete(percent), IncidenceKind::Todo(todo)) => {
            reader.once(name, line);
            if todo.completed.is_some() && percent != 100 {
                reader.warn(Some(line), WarningKind::CompletionConflict);
                todo.completed = None;
            }
            todo.percent_complete = percent;
            *percent_given = true;
        }
        (FieldValue::DtEnd(_), _)
        | (FieldValue::Duration(_), _)
        | (FieldValue::Transp(_), _)
        | (FieldValue::Due(_), _)
        | (FieldValue::Priority(_), _)
        | (FieldValue::Completed(_), _)
        | (FieldValue::PercentComplete(_), _)
        | (FieldValue::Action(_), _)
        | (FieldValue::Trigger(_), _)
        | (FieldValue::Repeat(_), _) => return false,

        (field, _) => {
            reader.once(name, line);
            match field {
                FieldValue::Uid(uid) => incidence.uid = uid,
                FieldValue::Sequence(sequence) => incidence.sequence = sequence,
                FieldValue::DtStamp(dt) => incidence.dtstamp = Some(dt),
                FieldValue::Created(dt) => incidence.created = Some(dt),
                FieldValue::LastModified(dt) => incidence.last_modified = Some(dt),
                FieldValue::DtStart(start) => incidence.dtstart = Some(start),
                FieldValue::Summary(text) => incidence.summary = Some(text),
                FieldValue::Description(text) => incidence.description = Some(text),
                FieldValue::Location(text) => incidence.location = Some(text),
                FieldValue::Status(status) => incidence.status = status,
                FieldValue::Class(secrecy) => incidence.secrecy = secrecy,
                FieldValue::Organizer(organizer) => incidence.organizer = Some(organizer),
                FieldValue::RelatedTo(uid) => incidence.related_to = Some(uid),
                FieldValue::RRule(rule) => incidence.recurrence = Some(rule),
                _ => return false,
            }
        }
    }
    true
}

/// The later of `DTEND` and `DURATION` wins.
fn set_end(
    slot: &mut Option<EventEnd>,
    end: EventEnd,
    name: &'static str,
    line: usize,
    reader: &mut FieldReader,
) {
    let conflict = matches!(
        (&*slot, &end),
        (Some(EventEnd::DtEnd(_)), EventEnd::Duration(_))
            | (Some(EventEnd::Duration(_)), EventEnd::DtEnd(_))
    );
    if conflict {
        reader.warn(Some(line), WarningKind::EndAndDuration);
    } else {
        reader.once(name, line);
    }
    *slot = Some(end);
}

/// Serializes an incidence into its component block.
///
/// Properties are written in a fixed order, followed by the extension
/// properties, the alarms and the preserved sub-components.
pub fn serialize_component(incidence: &Incidence) -> OpaqueComponent {
    let mut properties: Vec<ContentLine> = vec![];
    let mut push = |field: FieldValue| {
        properties.extend(map_out_all(&field).into_iter().map(|mut line| {
            incidence.params.apply(&mut line);
            line
        }));
    };

    push(FieldValue::Uid(incidence.uid.clone()));
    if let Some(dt) = &incidence.dtstamp {
        push(FieldValue::DtStamp(dt.clone()));
    }
    if let Some(dt) = &incidence.created {
        push(FieldValue::Created(dt.clone()));
    }
    if let Some(dt) = &incidence.last_modified {
        push(FieldValue::LastModified(dt.clone()));
    }
    if incidence.sequence != 0 {
        push(FieldValue::Sequence(incidence.sequence));
    }
    if let Some(start) = &incidence.dtstart {
        push(FieldValue::DtStart(start.clone()));
    }
    match &incidence.kind {
        IncidenceKind::Event(event) => match &event.end {
            Some(EventEnd::DtEnd(end)) => push(FieldValue::DtEnd(end.clone())),
            Some(EventEnd::Duration(duration)) => push(FieldValue::Duration(*duration)),
            None => {}
        },
        IncidenceKind::Todo(todo) => {
            if let Some(due) = &todo.due {
                push(FieldValue::Due(due.clone()));
            }
            if let Some(completed) = &todo.completed {
                push(FieldValue::Completed(completed.clone()));
            }
            if todo.percent_complete != 0 {
                push(FieldValue::PercentComplete(todo.percent_complete));
            }
            if todo.priority != 0 {
                push(FieldValue::Priority(todo.priority));
            }
        }
        IncidenceKind::Journal => {}
    }
    if let Some(text) = &incidence.summary {
        push(FieldValue::Summary(text.clone()));
    }
    if let Some(text) = &incidence.description {
        push(FieldValue::Description(text.clone()));
    }
    if let Some(text) = &incidence.location {
        push(FieldValue::Location(text.clone()));
    }
    if !incidence.categories.is_empty() {
        push(FieldValue::Categories(incidence.categories.clone()));
    }
    if incidence.status != Status::None {
        push(FieldValue::Status(incidence.status));
    }
    push(FieldValue::Class(incidence.secrecy));
    if let IncidenceKind::Event(event) = &incidence.kind {
        push(FieldValue::Transp(event.transparency));
    }
    if let Some(organizer) = &incidence.organizer {
        push(FieldValue::Organizer(organizer.clone()));
    }
    for attendee in &incidence.attendees {
        push(FieldValue::Attendee(attendee.clone()));
    }
    for attachment in &incidence.attachments {
        push(FieldValue::Attach(attachment.clone()));
    }
    if let Some(parent) = &incidence.related_to {
        push(FieldValue::RelatedTo(parent.clone()));
    }
    if let Some(rule) = &incidence.recurrence {
        push(FieldValue::RRule(rule.clone()));
    }
    if !incidence.exdates.is_empty() {
        push(FieldValue::ExDate(incidence.exdates.clone()));
    }
    if !incidence.rdates.is_empty() {
        push(FieldValue::RDate(incidence.rdates.clone()));
    }
    properties.extend(incidence.extensions.iter().cloned());

    let children = incidence
        .alarms
        .iter()
        .map(Alarm::to_block)
        .chain(incidence.extra_components.iter().cloned())
        .collect();

    OpaqueComponent {
        name: incidence.kind.component_name().to_owned(),
        properties,
        children,
    }
}

