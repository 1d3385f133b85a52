//! Tests for iCalendar parsing and serialization.

use ical_formatter::codec::{parse, serialize};
use ical_formatter::model::{Document, Event, Property};
use ical_formatter::FormatError;

const CALENDAR: &str = "BEGIN:VCALENDAR\r\n\
VERSION:2.0\r\n\
PRODID:-//Uni//Timetable//EN\r\n\
X-WR-CALNAME:My Timetable\r\n\
BEGIN:VTIMEZONE\r\n\
TZID:Europe/London\r\n\
BEGIN:STANDARD\r\n\
DTSTART:19701025T020000\r\n\
TZOFFSETFROM:+0100\r\n\
TZOFFSETTO:+0000\r\n\
END:STANDARD\r\n\
END:VTIMEZONE\r\n\
BEGIN:VEVENT\r\n\
UID:COMP1511-LEC-01@uni.example\r\n\
DTSTAMP:20251201T000000Z\r\n\
DTSTART;TZID=Europe/London:20260105T090000\r\n\
DTEND;TZID=Europe/London:20260105T100000\r\n\
SUMMARY:Lecture\\, week 1\r\n\
X-CUSTOM;X-PARAM=\"a;b\":keep me\r\n\
BEGIN:VALARM\r\n\
ACTION:DISPLAY\r\n\
TRIGGER:-PT15M\r\n\
END:VALARM\r\n\
END:VEVENT\r\n\
END:VCALENDAR\r\n";

fn parse_err_line(input: &str) -> usize {
    match parse(input) {
        Err(FormatError::Parse { line, .. }) => line,
        other => panic!("expected parse error, got {other:?}"),
    }
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

#[test]
fn parses_structure() {
    let doc = parse(CALENDAR).unwrap();

    assert_eq!(doc.property("PRODID"), Some("-//Uni//Timetable//EN"));
    assert_eq!(doc.components.len(), 1);
    assert_eq!(doc.components[0].name, "VTIMEZONE");
    assert_eq!(doc.components[0].components[0].name, "STANDARD");

    assert_eq!(doc.events.len(), 1);
    let event = &doc.events[0];
    assert_eq!(event.uid(), Some("COMP1511-LEC-01@uni.example"));
    assert_eq!(event.property("DTSTART").unwrap().param("TZID"), Some("Europe/London"));
    assert_eq!(event.components[0].name, "VALARM");
}

#[test]
fn values_are_kept_raw() {
    let doc = parse(CALENDAR).unwrap();
    let event = &doc.events[0];
    assert_eq!(event.value("SUMMARY"), Some("Lecture\\, week 1"));
    assert_eq!(event.property("X-CUSTOM").unwrap().param("X-PARAM"), Some("a;b"));
}

#[test]
fn accepts_bare_lf_and_folded_lines() {
    let input = "BEGIN:VCALENDAR\nBEGIN:VEVENT\nUID:a\nSUMMARY:Long\n  title\nEND:VEVENT\nEND:VCALENDAR\n";
    let doc = parse(input).unwrap();
    assert_eq!(doc.events[0].value("SUMMARY"), Some("Long title"));
}

#[test]
fn lowercase_names_are_normalised() {
    let input = "begin:vcalendar\r\nbegin:vevent\r\nuid:a\r\nend:vevent\r\nend:vcalendar\r\n";
    let doc = parse(input).unwrap();
    assert_eq!(doc.events[0].properties[0].name, "UID");
}

#[test]
fn structural_errors_carry_line_numbers() {
    assert_eq!(parse_err_line(""), 1);
    assert_eq!(parse_err_line("BEGIN:VEVENT\r\nEND:VEVENT\r\n"), 1);
    assert_eq!(
        parse_err_line("BEGIN:VCALENDAR\r\nBEGIN:VEVENT\r\nEND:VTODO\r\nEND:VCALENDAR\r\n"),
        3
    );
    assert_eq!(parse_err_line("BEGIN:VCALENDAR\r\nBEGIN:VEVENT\r\nUID:a\r\n"), 3);
    assert_eq!(
        parse_err_line("BEGIN:VCALENDAR\r\nEND:VCALENDAR\r\nBEGIN:VCALENDAR\r\n"),
        3
    );
    assert_eq!(parse_err_line("BEGIN:VCALENDAR\r\nno separator\r\nEND:VCALENDAR\r\n"), 2);
}

// ---------------------------------------------------------------------------
// Serialization
// ---------------------------------------------------------------------------

#[test]
fn round_trip_preserves_unknown_content() {
    let doc = parse(CALENDAR).unwrap();
    let text = serialize(&doc);
    assert_eq!(text, CALENDAR);
    assert_eq!(parse(&text).unwrap(), doc);
}

#[test]
fn serializes_with_crlf_and_quotes() {
    let doc = Document {
        events: vec![Event::new()
            .with("UID", "x")
            .with_property(Property::new("ATTENDEE", "mailto:a@b").with_param("CN", "Doe, Jane"))],
        ..Document::default()
    };

    let text = serialize(&doc);

    assert!(text.starts_with("BEGIN:VCALENDAR\r\nBEGIN:VEVENT\r\n"));
    assert!(text.contains("ATTENDEE;CN=\"Doe, Jane\":mailto:a@b\r\n"));
    assert!(text.ends_with("END:VEVENT\r\nEND:VCALENDAR\r\n"));
    assert!(!text.replace("\r\n", "").contains('\n'));
}

#[test]
fn long_values_fold_and_unfold() {
    let description = "word ".repeat(40);
    let doc = Document {
        events: vec![Event::new().with("DESCRIPTION", description.clone())],
        ..Document::default()
    };

    let text = serialize(&doc);
    assert!(text.split("\r\n").all(|line| line.len() <= 75));
    assert_eq!(parse(&text).unwrap().events[0].value("DESCRIPTION"), Some(description.as_str()));
}
