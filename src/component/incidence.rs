use chrono::Duration;

use crate::{
    component::Alarm,
    parser::{ContentLine, OpaqueComponent},
    property::{Attachment, Attendee, ExtraParams, Recurrence, Secrecy, Status, Transparency},
    types::{CalDateOrDateTime, CalDateTime},
};

/// How an event's end is given. `DTEND` and `DURATION` are exclusive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventEnd {
    DtEnd(CalDateOrDateTime),
    Duration(Duration),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventDetails {
    pub end: Option<EventEnd>,
    pub transparency: Transparency,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TodoDetails {
    pub due: Option<CalDateOrDateTime>,
    /// 0 to 100.
    pub percent_complete: u8,
    /// 0 is unspecified, 1 is the highest and 9 the lowest. Stored as given.
    pub priority: u8,
    pub completed: Option<CalDateTime>,
}

impl TodoDetails {
    pub fn is_completed(&self) -> bool {
        self.completed.is_some() || self.percent_complete == 100
    }

    /// Marks the to-do as done at `when`.
    pub fn complete(&mut self, when: CalDateTime) {
        self.completed = Some(when);
        self.percent_complete = 100;
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IncidenceKind {
    Event(EventDetails),
    Todo(TodoDetails),
    Journal,
}

impl IncidenceKind {
    pub fn component_name(&self) -> &'static str {
        match self {
            Self::Event(_) => "VEVENT",
            Self::Todo(_) => "VTODO",
            Self::Journal => "VJOURNAL",
        }
    }

    pub(crate) fn from_component_name(name: &str) -> Option<Self> {
        match name {
            "VEVENT" => Some(Self::Event(EventDetails::default())),
            "VTODO" => Some(Self::Todo(TodoDetails::default())),
            "VJOURNAL" => Some(Self::Journal),
            _ => None,
        }
    }
}

/// An event, to-do or journal entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Incidence {
    pub uid: String,
    /// Revision counter.
    pub sequence: u32,
    pub dtstamp: Option<CalDateTime>,
    pub created: Option<CalDateTime>,
    pub last_modified: Option<CalDateTime>,
    pub dtstart: Option<CalDateOrDateTime>,
    /// Line breaks are written as `\n`, so `\r\n` or a lone `\r` reads
    /// back as `\n`. The same holds for the other text fields.
    pub summary: Option<String>,
    pub description: Option<String>,
    pub location: Option<String>,
    pub categories: Vec<String>,
    pub status: Status,
    pub secrecy: Secrecy,
    pub organizer: Option<Attendee>,
    pub attendees: Vec<Attendee>,
    pub alarms: Vec<Alarm>,
    pub attachments: Vec<Attachment>,
    /// UID of the parent incidence.
    pub related_to: Option<String>,
    pub recurrence: Option<Recurrence>,
    pub exdates: Vec<CalDateOrDateTime>,
    pub rdates: Vec<CalDateOrDateTime>,
    /// Properties the codec does not interpret, written back unchanged.
    pub extensions: Vec<ContentLine>,
    /// Parameters such as `LANGUAGE` or `ALTREP` on interpreted properties.
    pub params: ExtraParams,
    /// Sub-components the codec does not interpret, written back unchanged.
    pub extra_components: Vec<OpaqueComponent>,
    pub kind: IncidenceKind,
}

impl Incidence {
    fn new(uid: impl Into<String>, kind: IncidenceKind) -> Self {
        Self {
            uid: uid.into(),
            sequence: 0,
            dtstamp: None,
            created: None,
            last_modified: None,
            dtstart: None,
            summary: None,
            description: None,
            location: None,
            categories: vec![],
            status: Status::default(),
            secrecy: Secrecy::default(),
            organizer: None,
            attendees: vec![],
            alarms: vec![],
            attachments: vec![],
            related_to: None,
            recurrence: None,
            exdates: vec![],
            rdates: vec![],
            extensions: vec![],
            params: ExtraParams::default(),
            extra_components: vec![],
            kind,
        }
    }

    pub fn new_event(uid: impl Into<String>) -> Self {
        Self::new(uid, IncidenceKind::Event(EventDetails::default()))
    }

    pub fn new_todo(uid: impl Into<String>) -> Self {
        Self::new(uid, IncidenceKind::Todo(TodoDetails::default()))
    }

    pub fn new_journal(uid: impl Into<String>) -> Self {
        Self::new(uid, IncidenceKind::Journal)
    }

    pub(crate) fn empty(kind: IncidenceKind) -> Self {
        Self::new(String::new(), kind)
    }

    pub fn is_event(&self) -> bool {
        matches!(self.kind, IncidenceKind::Event(_))
    }

    pub fn is_todo(&self) -> bool {
        matches!(self.kind, IncidenceKind::Todo(_))
    }

    pub fn event(&self) -> Option<&EventDetails> {
        match &self.kind {
            IncidenceKind::Event(details) => Some(details),
            _ => None,
        }
    }

    pub fn event_mut(&mut self) -> Option<&mut EventDetails> {
        match &mut self.kind {
            IncidenceKind::Event(details) => Some(details),
            _ => None,
        }
    }

    pub fn todo(&self) -> Option<&TodoDetails> {
        match &self.kind {
            IncidenceKind::Todo(details) => Some(details),
            _ => None,
        }
    }

    pub fn todo_mut(&mut self) -> Option<&mut TodoDetails> {
        match &mut self.kind {
            IncidenceKind::Todo(details) => Some(details),
            _ => None,
        }
    }

    pub fn has_recurrence(&self) -> bool {
        self.recurrence.is_some() || !self.rdates.is_empty()
    }

    /// Registers a semantically meaningful edit.
    pub fn touch(&mut self) {
        self.sequence = self.sequence.saturating_add(1);
        self.last_modified = Some(CalDateTime::now_utc());
    }
}
