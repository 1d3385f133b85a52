//! Tests for custom event synthesis.

use ical_formatter::config::{
    ComparisonMethod, CustomEventTemplate, EventPredicate, ExtensionBundle, Quantifier,
};
use ical_formatter::details::ExtractedDetails;
use ical_formatter::model::{Document, Event};
use ical_formatter::synth::{escape_newlines, inject_custom_events, materialize, CustomUidStrategy};
use ical_formatter::FormatError;
use indexmap::IndexMap;

fn details(subject: &str) -> ExtractedDetails {
    ExtractedDetails {
        subject: subject.to_string(),
    }
}

fn template(conditions: Vec<EventPredicate>) -> CustomEventTemplate {
    let mut properties = IndexMap::new();
    properties.insert("SUMMARY".to_string(), "Revision session".to_string());
    properties.insert("UID".to_string(), "ignored".to_string());
    CustomEventTemplate {
        created: "20260101T000000Z".to_string(),
        start: "20260110T090000".to_string(),
        end: "20260110T100000".to_string(),
        timezone: Some("Europe/London".to_string()),
        properties,
        conditions,
    }
}

fn all_confirmed() -> EventPredicate {
    EventPredicate {
        quantifier: Quantifier::All,
        property_key: "status".to_string(),
        method: ComparisonMethod::Equals {
            value: "confirmed".to_string(),
            ignore_case: false,
        },
    }
}

fn bundle(templates: Vec<CustomEventTemplate>) -> ExtensionBundle {
    ExtensionBundle {
        escape_special_characters: false,
        custom_events: templates,
        uid_strategy: CustomUidStrategy::default(),
    }
}

fn document(statuses: &[&str]) -> Document {
    Document {
        events: statuses
            .iter()
            .enumerate()
            .map(|(i, s)| {
                Event::new()
                    .with("UID", format!("COMP1511-{i}"))
                    .with("STATUS", *s)
            })
            .collect(),
        ..Document::default()
    }
}

// ---------------------------------------------------------------------------
// Materialisation
// ---------------------------------------------------------------------------

#[test]
fn materialize_copies_timestamps_and_zone() {
    let event = materialize(&template(vec![]), &bundle(vec![]), &details("COMP1511")).unwrap();

    assert_eq!(event.created(), Some("20260101T000000Z"));
    let start = event.property("DTSTART").unwrap();
    assert_eq!(start.value, "20260110T090000");
    assert_eq!(start.param("TZID"), Some("Europe/London"));
    let end = event.property("DTEND").unwrap();
    assert_eq!(end.value, "20260110T100000");
    assert_eq!(end.param("TZID"), Some("Europe/London"));
    assert_eq!(event.value("SUMMARY"), Some("Revision session"));
}

#[test]
fn utc_template_times_are_moved_into_the_zone() {
    let mut tpl = template(vec![]);
    tpl.start = "20260710T080000Z".to_string();
    tpl.end = "20260710T090000Z".to_string();
    let event = materialize(&tpl, &bundle(vec![]), &details("COMP1511")).unwrap();

    // BST is UTC+1 in July.
    let start = event.property("DTSTART").unwrap();
    assert_eq!(start.value, "20260710T090000");
    assert_eq!(start.param("TZID"), Some("Europe/London"));
    let end = event.property("DTEND").unwrap();
    assert_eq!(end.value, "20260710T100000");
    assert_eq!(end.param("TZID"), Some("Europe/London"));
}

#[test]
fn unknown_template_zone_is_an_error() {
    let mut tpl = template(vec![]);
    tpl.timezone = Some("Mars/Olympus_Mons".to_string());
    assert!(matches!(
        materialize(&tpl, &bundle(vec![]), &details("X")),
        Err(FormatError::InvalidTimezone(_))
    ));
}

#[test]
fn template_properties_are_emitted_in_declaration_order() {
    let mut tpl = template(vec![]);
    tpl.properties
        .insert("LOCATION".to_string(), "Library".to_string());
    tpl.properties
        .insert("DESCRIPTION".to_string(), "Bring notes".to_string());
    let event = materialize(&tpl, &bundle(vec![]), &details("X")).unwrap();

    let names: Vec<&str> = event.properties.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(
        names,
        ["UID", "DTSTAMP", "DTSTART", "DTEND", "SUMMARY", "LOCATION", "DESCRIPTION"]
    );
}

#[test]
fn default_uid_is_md5_of_created_and_subject() {
    let event = materialize(&template(vec![]), &bundle(vec![]), &details("COMP1511")).unwrap();
    // md5("20260101T000000ZCOMP1511")
    assert_eq!(event.uid(), Some("custom_570c331e29d2b0eedd0afce0bd42c762"));
    assert_eq!(
        event.properties.iter().filter(|p| p.is_named("UID")).count(),
        1,
        "template UID must not be copied"
    );
}

#[test]
fn strategy_can_be_overridden() {
    let mut ext = bundle(vec![]);
    ext.uid_strategy = CustomUidStrategy::new(|created, d| format!("{}@{created}", d.subject));
    let event = materialize(&template(vec![]), &ext, &details("MATH1131")).unwrap();
    assert_eq!(event.uid(), Some("MATH1131@20260101T000000Z"));
}

#[test]
fn newline_escaping() {
    assert_eq!(escape_newlines("a\r\nb\nc"), "a\\nb\\nc");

    let mut tpl = template(vec![]);
    tpl.properties
        .insert("DESCRIPTION".to_string(), "Bring:\r\n- notes\n- pens".to_string());

    let mut ext = bundle(vec![]);
    let raw = materialize(&tpl, &ext, &details("X")).unwrap();
    assert_eq!(raw.value("DESCRIPTION"), Some("Bring:\r\n- notes\n- pens"));

    ext.escape_special_characters = true;
    let escaped = materialize(&tpl, &ext, &details("X")).unwrap();
    assert_eq!(escaped.value("DESCRIPTION"), Some("Bring:\\n- notes\\n- pens"));
}

#[test]
fn bad_template_timestamp_is_an_error() {
    let mut tpl = template(vec![]);
    tpl.start = "tomorrow".to_string();
    assert!(matches!(
        materialize(&tpl, &bundle(vec![]), &details("X")),
        Err(FormatError::InvalidDateTime { .. })
    ));
}

// ---------------------------------------------------------------------------
// Guarded injection
// ---------------------------------------------------------------------------

#[test]
fn injected_only_when_all_events_confirmed() {
    let ext = bundle(vec![template(vec![all_confirmed()])]);

    let mut confirmed = document(&["confirmed", "confirmed"]);
    assert_eq!(inject_custom_events(&mut confirmed, &ext, &details("COMP1511")).unwrap(), 1);
    assert_eq!(confirmed.events.len(), 3);
    assert_eq!(confirmed.events[2].value("SUMMARY"), Some("Revision session"));

    let mut mixed = document(&["confirmed", "cancelled"]);
    assert_eq!(inject_custom_events(&mut mixed, &ext, &details("COMP1511")).unwrap(), 0);
    assert_eq!(mixed.events.len(), 2);
}

#[test]
fn all_over_empty_document_injects() {
    let ext = bundle(vec![template(vec![all_confirmed()])]);
    let mut empty = Document::new();
    assert_eq!(inject_custom_events(&mut empty, &ext, &details("X")).unwrap(), 1);
}

#[test]
fn unguarded_templates_always_inject_in_order() {
    let mut second = template(vec![]);
    second.created = "20260102T000000Z".to_string();
    let ext = bundle(vec![template(vec![]), second]);

    let mut doc = document(&[]);
    assert_eq!(inject_custom_events(&mut doc, &ext, &details("X")).unwrap(), 2);
    assert_eq!(doc.events[0].created(), Some("20260101T000000Z"));
    assert_eq!(doc.events[1].created(), Some("20260102T000000Z"));
}

#[test]
fn later_templates_see_earlier_injections() {
    // The second template requires an existing "Revision session".
    let needs_revision = EventPredicate {
        quantifier: Quantifier::Any,
        property_key: "SUMMARY".to_string(),
        method: ComparisonMethod::StartsWith {
            value: "revision".to_string(),
            ignore_case: true,
        },
    };
    let mut follow_up = template(vec![needs_revision]);
    follow_up.properties.insert("SUMMARY".to_string(), "Exam".to_string());
    let ext = bundle(vec![template(vec![]), follow_up]);

    let mut doc = document(&["confirmed"]);
    assert_eq!(inject_custom_events(&mut doc, &ext, &details("X")).unwrap(), 2);
    assert_eq!(doc.events[2].value("SUMMARY"), Some("Exam"));
}
