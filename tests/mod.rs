use calcodec::{CodecOptions, Transcoder, types::ChronoTzResolver};

fn transcoder() -> Transcoder {
    Transcoder::new(
        ChronoTzResolver,
        CodecOptions {
            product_id: "-//calcodec tests//EN".to_owned(),
            ..Default::default()
        },
    )
}

pub mod line {
    use calcodec::LineReader;
    use rstest::rstest;

    #[test]
    fn multioctet_line_wrapping() {
        let input = b"SUMMARY:Gr\xc3\r\n \xbcn";
        let line = LineReader::from_slice(input.as_slice())
            .next()
            .unwrap()
            .unwrap();
        assert_eq!(line.as_str(), "SUMMARY:Grün");
    }

    #[rstest]
    #[case(b"\xc3\r\n \x00")]
    #[case(b"\xc3\r\n ")]
    #[case(b"\xc3 \r\n \xbc")]
    fn invalid_lines(#[case] input: &[u8]) {
        assert!(LineReader::from_slice(input).next().unwrap().is_err());
    }
}

pub mod roundtrip {
    use crate::transcoder;
    use calcodec::{
        generator::Emitter, parse_component, serialize_component, types::ChronoTzResolver,
    };

    #[test_log::test]
    fn document_is_byte_identical() {
        let input = include_str!("./resources/ical_roundtrip.ics");
        let transcoder = transcoder();
        let doc = transcoder.parse_document(input).unwrap();
        assert!(doc.warnings.is_empty(), "{:?}", doc.warnings);
        similar_asserts::assert_eq!(
            transcoder.serialize_wrapped(&doc.wrapper, &doc.incidences),
            input
        );
    }

    #[test_log::test]
    fn other_producer_is_normalised() {
        let expected = include_str!("./resources/ical_roundtrip.ics");
        let input = include_str!("./resources/ical_scrambled.ics");
        let transcoder = transcoder();
        let doc = transcoder.parse_document(input).unwrap();
        assert!(doc.warnings.is_empty(), "{:?}", doc.warnings);
        similar_asserts::assert_eq!(
            transcoder.serialize_wrapped(&doc.wrapper, &doc.incidences),
            expected
        );
        assert_eq!(
            doc.incidences,
            transcoder.parse_document(expected).unwrap().incidences
        );
    }

    #[test]
    fn every_component_roundtrips() {
        let doc = transcoder()
            .parse_document(include_str!("./resources/ical_roundtrip.ics"))
            .unwrap();
        for incidence in &doc.incidences {
            let text = serialize_component(incidence).generate();
            let raw = calcodec::ComponentParser::from_slice(text.as_bytes())
                .expect_one()
                .unwrap();
            let mut warnings = calcodec::warning::Warnings::default();
            let parsed = parse_component(&raw, &ChronoTzResolver, &mut warnings).unwrap();
            similar_asserts::assert_eq!(&parsed, incidence);
            assert!(warnings.is_empty());
        }
    }

    #[test_log::test]
    fn parameters_on_known_properties_survive() {
        let input = "BEGIN:VEVENT\r\nUID:params-1\r\nDTSTART;TZID=Europe/Berlin;X-SOURCE=sync:20240301T100000\r\nSUMMARY;LANGUAGE=de:Hallo\r\nDESCRIPTION;ALTREP=\"cid:x@y\":Text\r\nCLASS:PUBLIC\r\nTRANSP:OPAQUE\r\nATTACH;X-FILENAME=a.pdf:http://e/a.pdf\r\nEND:VEVENT\r\n";
        let raw = calcodec::ComponentParser::from_slice(input.as_bytes())
            .expect_one()
            .unwrap();
        let mut warnings = calcodec::warning::Warnings::default();
        let incidence = parse_component(&raw, &ChronoTzResolver, &mut warnings).unwrap();
        assert!(warnings.is_empty());
        assert_eq!(incidence.summary.as_deref(), Some("Hallo"));
        assert_eq!(
            incidence
                .params
                .get("SUMMARY")
                .and_then(|params| params.get_param("LANGUAGE")),
            Some("de")
        );
        similar_asserts::assert_eq!(serialize_component(&incidence).generate(), input);
    }

    #[test]
    fn folded_lines_stay_within_limit() {
        let mut event = calcodec::Incidence::new_event("long");
        event.description = Some("Ünïcödé ".repeat(40));
        let text = transcoder().serialize_document(std::slice::from_ref(&event));
        assert!(text.split("\r\n").all(|line| line.len() <= 75));
        let doc = transcoder().parse_document(&text).unwrap();
        assert_eq!(doc.incidences, vec![event]);
    }
}

pub mod scenarios {
    use crate::transcoder;
    use calcodec::{
        WarningKind,
        component::EventEnd,
        parser::ParserError,
        property::RecurrenceEnd,
        types::{CalDateOrDateTime, ValueError},
    };
    use chrono::NaiveDate;

    #[test_log::test]
    fn floating_event() {
        let doc = transcoder()
            .parse_document(include_str!("./resources/floating_event.ics"))
            .unwrap();
        assert!(doc.warnings.is_empty());
        assert_eq!(doc.incidences.len(), 1);
        let event = &doc.incidences[0];
        assert_eq!(event.uid, "evt-1");
        assert!(event.is_event());
        assert_eq!(
            event.dtstart,
            Some(CalDateOrDateTime::Date(
                NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()
            ))
        );
        assert_eq!(event.event().unwrap().end, None);

        let text = transcoder().serialize_document(&doc.incidences);
        assert!(text.contains("\r\nDTSTART;VALUE=DATE:20240301\r\n"));
        let again = transcoder().parse_document(&text).unwrap();
        assert!(again.incidences[0].dtstart.as_ref().unwrap().is_date());
    }

    #[test_log::test]
    fn duplicate_uid_last_write_wins() {
        let doc = transcoder()
            .parse_document(include_str!("./resources/duplicate_uid.ics"))
            .unwrap();
        let uids: Vec<_> = doc.incidences.iter().map(|inc| inc.uid.as_str()).collect();
        assert_eq!(uids, vec!["t-1", "t-2"]);
        assert_eq!(doc.find("t-1").unwrap().todo().unwrap().percent_complete, 100);
        assert_eq!(doc.warnings.len(), 1);
        assert_eq!(doc.warnings[0].kind, WarningKind::DuplicateUid);
        assert_eq!(doc.warnings[0].uid.as_deref(), Some("t-1"));
    }

    #[test_log::test]
    fn malformed_duration_drops_the_field() {
        let doc = transcoder()
            .parse_document(include_str!("./resources/malformed_duration.ics"))
            .unwrap();
        let event = doc.find("evt-2").unwrap();
        assert_eq!(event.event().unwrap().end, None);
        assert_eq!(event.summary.as_deref(), Some("Dentist"));
        assert_eq!(doc.warnings.len(), 1);
        assert_eq!(doc.warnings[0].line, Some(7));
        assert!(matches!(
            &doc.warnings[0].kind,
            WarningKind::MalformedValue { property, error: ValueError::Malformed { .. } }
                if property == "DURATION"
        ));
    }

    #[test_log::test]
    fn related_to_builds_a_forest() {
        let doc = transcoder()
            .parse_document(include_str!("./resources/related_to.ics"))
            .unwrap();
        assert!(doc.warnings.is_empty());
        assert_eq!(doc.incidences.len(), 5);

        let children: Vec<_> = doc
            .children_of("move")
            .into_iter()
            .map(|inc| inc.uid.as_str())
            .collect();
        assert_eq!(children, vec!["pack-books"]);
        assert_eq!(doc.parent_of("buy-boxes").unwrap().uid, "pack-books");

        // Parent lives in another calendar
        let dangling = doc.find("call-bank").unwrap();
        assert_eq!(dangling.related_to.as_deref(), Some("finances"));
        assert!(doc.parent_of("call-bank").is_none());

        let sibling = doc.find("sibling-note").unwrap();
        assert_eq!(sibling.related_to, None);
        assert_eq!(sibling.extensions[0].name, "RELATED-TO");
        assert!(doc.parent_of("sibling-note").is_none());
    }

    #[test_log::test]
    fn relation_cycle_is_broken() {
        let doc = transcoder()
            .parse_document(include_str!("./resources/relation_cycle.ics"))
            .unwrap();
        assert_eq!(doc.parent_of("a").unwrap().uid, "b");
        assert!(doc.parent_of("b").is_none());
        assert_eq!(doc.warnings.len(), 1);
        assert_eq!(doc.warnings[0].kind, WarningKind::RelationCycle("a".to_owned()));
    }

    #[test_log::test]
    fn count_and_until_keeps_until() {
        let doc = transcoder()
            .parse_document(include_str!("./resources/count_and_until.ics"))
            .unwrap();
        assert_eq!(doc.warnings.len(), 1);
        assert_eq!(doc.warnings[0].kind, WarningKind::RecurrenceCountAndUntil);

        let event = doc.find("yoga").unwrap();
        let rule = event.recurrence.as_ref().unwrap();
        assert!(matches!(rule.end, RecurrenceEnd::Until(_)));
        assert_eq!(rule.encode(), "FREQ=WEEKLY;UNTIL=20240116T235959");
        assert_eq!(event.occurrences(100).unwrap().len(), 3);

        let text = transcoder().serialize_document(&doc.incidences);
        assert!(!text.contains("COUNT="));
    }

    #[test_log::test]
    fn legacy_producer() {
        let doc = transcoder()
            .parse_document(include_str!("./resources/legacy_producer.ics"))
            .unwrap();
        let kinds: Vec<_> = doc.warnings.iter().map(|warning| &warning.kind).collect();
        insta::assert_debug_snapshot!(kinds, @r#"
        [
            EndAndDuration,
            ProducerError(
                "No value for LOCATION property",
            ),
            UnknownTimezone {
                property: "DTSTART",
                tzid: "Mars/Olympus_Mons",
            },
            ComponentDropped {
                component: "VEVENT",
                error: MissingEnd(
                    "VEVENT",
                ),
            },
        ]
        "#);
        assert_eq!(doc.warnings[3].uid.as_deref(), Some("unterminated"));

        let outlook = doc.find("outlook-1").unwrap();
        assert_eq!(
            outlook.dtstart.as_ref().unwrap().tzid(),
            Some("W. Europe Standard Time")
        );
        assert_eq!(
            outlook.event().unwrap().end,
            Some(EventEnd::Duration(chrono::Duration::hours(2)))
        );
        let extensions: Vec<_> = outlook.extensions.iter().map(|prop| prop.name.as_str()).collect();
        assert_eq!(extensions, vec!["X-LIC-ERROR", "X-MICROSOFT-CDO-BUSYSTATUS"]);

        let rover = doc.find("unknown-zone").unwrap();
        let rover_start = rover.dtstart.as_ref().unwrap().timezone().unwrap();
        assert!(rover_start.is_floating());
        assert_eq!(rover_start.tzid(), Some("Mars/Olympus_Mons"));

        assert_eq!(doc.wrapper.get_property("METHOD").unwrap().value, "PUBLISH");
        assert_eq!(doc.wrapper.other_components[0].name, "VFREEBUSY");
        assert!(doc.find("unterminated").is_none());

        // The zone identifier survives a round trip as written
        let text = transcoder().serialize_wrapped(&doc.wrapper, &doc.incidences);
        assert!(text.contains("DTSTART;TZID=W. Europe Standard Time:20240410T140000\r\n"));
        assert!(text.contains("DTSTART;TZID=Mars/Olympus_Mons:20240411T080000\r\n"));
        assert!(text.contains("BEGIN:VFREEBUSY\r\n"));
        let again = transcoder().parse_document(&text).unwrap();
        assert_eq!(again.find("outlook-1"), Some(outlook));
        assert_eq!(again.find("unknown-zone"), Some(rover));
    }

    #[test]
    fn not_a_calendar() {
        assert_eq!(
            transcoder().parse_document("Hello, world").unwrap_err(),
            ParserError::ContentLine(calcodec::parser::ContentLineError::MissingName(1))
        );
        assert_eq!(
            transcoder()
                .parse_document("BEGIN:VCARD\nEND:VCARD\n")
                .unwrap_err(),
            ParserError::MissingHeader("VCALENDAR")
        );
    }
}

pub mod scheduling {
    use crate::transcoder;
    use calcodec::{Method, MessageValidity, scheduling::is_schedule_message};

    #[test_log::test]
    fn request_roundtrip() {
        let doc = transcoder()
            .parse_document(include_str!("./resources/ical_roundtrip.ics"))
            .unwrap();
        let event = doc.find("evt-weekly").unwrap();

        let text = transcoder().create_schedule_message(event, Method::Request);
        assert!(is_schedule_message(&text));
        let message = transcoder().parse_schedule_message(&text);
        assert_eq!(message.method, Some(Method::Request));
        assert_eq!(message.validity, MessageValidity::WellFormed);
        assert_eq!(message.incidence.as_ref(), Some(event));
    }

    #[test]
    fn document_is_not_a_message() {
        let input = include_str!("./resources/duplicate_uid.ics");
        assert!(!is_schedule_message(input));
        let message = transcoder().parse_schedule_message(input);
        assert!(matches!(
            message.validity,
            MessageValidity::Malformed(calcodec::scheduling::MalformedReason::MultipleIncidences(3))
        ));
    }
}

pub mod storage {
    use calcodec::Calendar;

    #[test_log::test]
    fn load_save_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("roundtrip.ics");
        std::fs::write(&path, include_str!("./resources/ical_roundtrip.ics")).unwrap();

        let mut calendar = Calendar::new();
        assert!(calendar.load(&path));
        assert_eq!(calendar.incidences().len(), 4);
        assert_eq!(calendar.children_of("t-parent")[0].uid, "t-child");
        assert!(calendar.save(&path));

        let mut reloaded = Calendar::new();
        assert!(reloaded.load(&path));
        similar_asserts::assert_eq!(reloaded.incidences(), calendar.incidences());
        assert_eq!(reloaded.wrapper().timezones.len(), 1);
    }
}
