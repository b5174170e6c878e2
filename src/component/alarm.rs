use chrono::Duration;

use crate::{
    component::assemble::FieldReader,
    parser::{ContentLine, OpaqueComponent, ParserError, RawComponent},
    property::{
        Attachment, AttachmentData, Attendee, ExtraParams, FieldValue, Mapped, Trigger, map_out,
    },
    warning::WarningKind,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AlarmAction {
    Display {
        description: String,
    },
    Audio {
        sound: Option<Attachment>,
    },
    Procedure {
        program: String,
        arguments: Option<String>,
    },
    Email {
        summary: String,
        description: String,
        recipients: Vec<Attendee>,
        attachments: Vec<Attachment>,
    },
}

impl AlarmAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Display { .. } => "DISPLAY",
            Self::Audio { .. } => "AUDIO",
            Self::Procedure { .. } => "PROCEDURE",
            Self::Email { .. } => "EMAIL",
        }
    }
}

/// Snooze settings: the alarm fires `count` more times, `interval` apart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlarmRepeat {
    pub count: u32,
    pub interval: Duration,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alarm {
    pub trigger: Trigger,
    pub action: AlarmAction,
    pub repeat: Option<AlarmRepeat>,
    pub extensions: Vec<ContentLine>,
    pub params: ExtraParams,
}

impl Alarm {
    pub fn display(trigger: Trigger, description: impl Into<String>) -> Self {
        Self {
            trigger,
            action: AlarmAction::Display {
                description: description.into(),
            },
            repeat: None,
            extensions: vec![],
            params: ExtraParams::default(),
        }
    }

    /// Assembles a `VALARM` block. Returns `None` and records why if the
    /// block does not describe a usable alarm.
    pub(crate) fn parse(raw: &RawComponent, reader: &mut FieldReader) -> Option<Self> {
        if let Some(defect) = &raw.defect {
            reader.warn(Some(raw.line), WarningKind::AlarmDropped(defect.to_string()));
            return None;
        }
        reader.skipped(&raw.skipped);
        for child in &raw.children {
            reader.warn(
                Some(child.line),
                WarningKind::ComponentDropped {
                    component: child.name.clone(),
                    error: ParserError::InvalidComponent("nested in VALARM".to_owned()),
                },
            );
        }

        let mut action = None;
        let mut trigger = None;
        let mut duration = None;
        let mut repeat = None;
        let mut summary = None;
        let mut description = None;
        let mut attendees = vec![];
        let mut attachments = vec![];
        let mut extensions = vec![];
        let mut params = ExtraParams::default();

        for prop in &raw.properties {
            let field = match reader.read(prop) {
                Some(Mapped::Field(field)) => field,
                Some(Mapped::Unrecognized(line)) => {
                    extensions.push(line);
                    continue;
                }
                None => continue,
            };
            match field {
                FieldValue::Attendee(attendee) => attendees.push(attendee),
                FieldValue::Attach(attachment) => attachments.push((prop, attachment)),
                FieldValue::Action(_)
                | FieldValue::Trigger(_)
                | FieldValue::Duration(_)
                | FieldValue::Repeat(_)
                | FieldValue::Summary(_)
                | FieldValue::Description(_) => {
                    reader.once(field.name(), prop.line);
                    params.keep(&prop.content);
                    match field {
                        FieldValue::Action(value) => action = Some(value),
                        FieldValue::Trigger(value) => trigger = Some(value),
                        FieldValue::Duration(value) => duration = Some(value),
                        FieldValue::Repeat(value) => repeat = Some((prop.line, value)),
                        FieldValue::Summary(value) => summary = Some(value),
                        FieldValue::Description(value) => description = Some(value),
                        _ => {}
                    }
                }
                _ => extensions.push(prop.content.clone()),
            }
        }

        let line = Some(raw.line);
        let Some(action) = action else {
            reader.warn(line, WarningKind::AlarmDropped("missing ACTION".to_owned()));
            return None;
        };
        let Some(trigger) = trigger else {
            reader.warn(line, WarningKind::AlarmDropped("missing TRIGGER".to_owned()));
            return None;
        };

        let repeat = match (repeat, duration) {
            (Some((_, 0)), _) | (None, None) => None,
            (Some((_, count)), Some(interval)) => Some(AlarmRepeat { count, interval }),
            (Some((repeat_line, count)), None) => {
                reader.warn(
                    Some(repeat_line),
                    WarningKind::MalformedValue {
                        property: "REPEAT".to_owned(),
                        error: crate::types::ValueError::malformed(
                            "REPEAT",
                            format!("{count} without DURATION"),
                        ),
                    },
                );
                None
            }
            (None, Some(interval)) => {
                let mut line = map_out(&FieldValue::Duration(interval));
                params.apply(&mut line);
                extensions.push(line);
                None
            }
        };

        let action = match action.as_str() {
            "DISPLAY" => AlarmAction::Display {
                description: description.take().unwrap_or_default(),
            },
            "AUDIO" => AlarmAction::Audio {
                sound: (!attachments.is_empty()).then(|| attachments.remove(0).1),
            },
            "PROCEDURE" => {
                let program = match attachments.first() {
                    Some((_, Attachment {
                        data: AttachmentData::Uri(program),
                        ..
                    })) => program.clone(),
                    _ => {
                        reader.warn(
                            line,
                            WarningKind::AlarmDropped(
                                "PROCEDURE alarm without a program".to_owned(),
                            ),
                        );
                        return None;
                    }
                };
                attachments.remove(0);
                AlarmAction::Procedure {
                    program,
                    arguments: description.take(),
                }
            }
            "EMAIL" => AlarmAction::Email {
                summary: summary.take().unwrap_or_default(),
                description: description.take().unwrap_or_default(),
                recipients: std::mem::take(&mut attendees),
                attachments: attachments
                    .drain(..)
                    .map(|(_, attachment)| attachment)
                    .collect(),
            },
            other => {
                reader.warn(line, WarningKind::AlarmDropped(format!("unknown action {other}")));
                return None;
            }
        };

        // Fields the action has no use for are kept as they were
        let unused = |field: FieldValue| {
            let mut line = map_out(&field);
            params.apply(&mut line);
            line
        };
        extensions.extend(attachments.into_iter().map(|(prop, _)| prop.content.clone()));
        extensions.extend(summary.map(|summary| unused(FieldValue::Summary(summary))));
        extensions.extend(
            description.map(|description| unused(FieldValue::Description(description))),
        );
        extensions.extend(
            attendees
                .into_iter()
                .map(|attendee| map_out(&FieldValue::Attendee(attendee))),
        );

        Some(Self {
            trigger,
            action,
            repeat,
            extensions,
            params,
        })
    }

    pub fn to_block(&self) -> OpaqueComponent {
        let mut properties = vec![
            map_out(&FieldValue::Action(self.action.as_str().to_owned())),
            self.trigger.to_content_line(),
        ];
        if let Some(repeat) = &self.repeat {
            properties.push(map_out(&FieldValue::Duration(repeat.interval)));
            properties.push(map_out(&FieldValue::Repeat(repeat.count)));
        }
        match &self.action {
            AlarmAction::Display { description } => {
                properties.push(map_out(&FieldValue::Description(description.clone())));
            }
            AlarmAction::Audio { sound } => {
                properties.extend(sound.as_ref().map(|sound| sound.to_content_line("ATTACH")));
            }
            AlarmAction::Procedure { program, arguments } => {
                properties.push(Attachment::uri(program.clone()).to_content_line("ATTACH"));
                properties.extend(
                    arguments
                        .as_ref()
                        .map(|arguments| map_out(&FieldValue::Description(arguments.clone()))),
                );
            }
            AlarmAction::Email {
                summary,
                description,
                recipients,
                attachments,
            } => {
                properties.push(map_out(&FieldValue::Summary(summary.clone())));
                properties.push(map_out(&FieldValue::Description(description.clone())));
                properties.extend(
                    recipients
                        .iter()
                        .map(|recipient| recipient.to_content_line("ATTENDEE")),
                );
                properties.extend(
                    attachments
                        .iter()
                        .map(|attachment| attachment.to_content_line("ATTACH")),
                );
            }
        }
        for line in &mut properties {
            self.params.apply(line);
        }
        properties.extend(self.extensions.iter().cloned());
        OpaqueComponent {
            name: "VALARM".to_owned(),
            properties,
            children: vec![],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        generator::Emitter, parser::ComponentParser, property::TriggerRelation,
        types::ChronoTzResolver,
    };
    use rstest::rstest;

    fn parse(input: &str) -> (Option<Alarm>, Vec<WarningKind>) {
        let raw = ComponentParser::from_slice(input.as_bytes())
            .expect_one()
            .unwrap();
        let mut reader = FieldReader::new(&ChronoTzResolver);
        let alarm = Alarm::parse(&raw, &mut reader);
        (
            alarm,
            reader
                .into_warnings()
                .into_iter()
                .map(|warning| warning.kind)
                .collect(),
        )
    }

    #[test]
    fn display_alarm() {
        let (alarm, warnings) = parse(
            "BEGIN:VALARM\r\nACTION:DISPLAY\r\nTRIGGER;RELATED=END:-PT15M\r\nDURATION:PT5M\r\nREPEAT:2\r\nDESCRIPTION:Wake up\r\nX-KDE-SNOOZE:1\r\nEND:VALARM\r\n",
        );
        assert!(warnings.is_empty());
        let alarm = alarm.unwrap();
        assert_eq!(
            alarm.trigger,
            Trigger::Relative {
                offset: -Duration::minutes(15),
                related: TriggerRelation::End
            }
        );
        assert_eq!(
            alarm.repeat,
            Some(AlarmRepeat {
                count: 2,
                interval: Duration::minutes(5)
            })
        );
        assert_eq!(alarm.extensions, vec![ContentLine::new("X-KDE-SNOOZE", "1")]);
        insta::assert_snapshot!(alarm.to_block().generate().replace("\r\n", "\n"), @r"
        BEGIN:VALARM
        ACTION:DISPLAY
        TRIGGER;RELATED=END:-PT15M
        DURATION:PT5M
        REPEAT:2
        DESCRIPTION:Wake up
        X-KDE-SNOOZE:1
        END:VALARM
        ");
    }

    #[test]
    fn parameters_are_kept() {
        let input = "BEGIN:VALARM\r\nACTION:DISPLAY\r\nTRIGGER;X-OFFSET-SOURCE=user:-PT10M\r\nDESCRIPTION;LANGUAGE=de:Aufwachen\r\nEND:VALARM\r\n";
        let (alarm, warnings) = parse(input);
        assert!(warnings.is_empty());
        similar_asserts::assert_eq!(alarm.unwrap().to_block().generate(), input);
    }

    #[test]
    fn email_alarm_roundtrip() {
        let input = "BEGIN:VALARM\r\nACTION:EMAIL\r\nTRIGGER;VALUE=DATE-TIME:20240301T080000Z\r\nSUMMARY:Reminder\r\nDESCRIPTION:Meeting soon\r\nATTENDEE:mailto:jane@example.com\r\nATTACH:http://example.com/agenda.pdf\r\nEND:VALARM\r\n";
        let (alarm, warnings) = parse(input);
        assert!(warnings.is_empty());
        let alarm = alarm.unwrap();
        let AlarmAction::Email { recipients, .. } = &alarm.action else {
            panic!("expected an email alarm");
        };
        assert_eq!(recipients[0].email, "jane@example.com");
        similar_asserts::assert_eq!(alarm.to_block().generate(), input);
    }

    #[test]
    fn procedure_alarm() {
        let (alarm, _) = parse(
            "BEGIN:VALARM\nACTION:PROCEDURE\nTRIGGER:-PT1H\nATTACH:file:///usr/bin/backup\nDESCRIPTION:--full\nEND:VALARM\n",
        );
        assert_eq!(
            alarm.unwrap().action,
            AlarmAction::Procedure {
                program: "file:///usr/bin/backup".to_owned(),
                arguments: Some("--full".to_owned())
            }
        );
    }

    #[rstest]
    #[case("BEGIN:VALARM\nTRIGGER:-PT5M\nEND:VALARM\n", "missing ACTION")]
    #[case("BEGIN:VALARM\nACTION:AUDIO\nEND:VALARM\n", "missing TRIGGER")]
    #[case("BEGIN:VALARM\nACTION:FIREWORKS\nTRIGGER:-PT5M\nEND:VALARM\n", "unknown action FIREWORKS")]
    #[case("BEGIN:VALARM\nACTION:PROCEDURE\nTRIGGER:-PT5M\nEND:VALARM\n", "PROCEDURE alarm without a program")]
    fn dropped(#[case] input: &str, #[case] reason: &str) {
        let (alarm, warnings) = parse(input);
        assert!(alarm.is_none());
        assert_eq!(warnings, vec![WarningKind::AlarmDropped(reason.to_owned())]);
    }

    #[test]
    fn repeat_without_duration_is_ignored() {
        let (alarm, warnings) =
            parse("BEGIN:VALARM\nACTION:AUDIO\nTRIGGER:-PT5M\nREPEAT:3\nEND:VALARM\n");
        let alarm = alarm.unwrap();
        assert_eq!(alarm.repeat, None);
        assert_eq!(alarm.action, AlarmAction::Audio { sound: None });
        assert!(matches!(
            warnings.as_slice(),
            [WarningKind::MalformedValue { property, .. }] if property == "REPEAT"
        ));
    }
}
