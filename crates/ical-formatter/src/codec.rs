//! iCalendar text codec (RFC 5545 §3.1).
//!
//! The codec is deliberately shallow: it splits content lines into name,
//! parameters and raw value, and builds the component tree. Values are never
//! unescaped or re-escaped, so properties the pipeline does not touch come out
//! byte-for-byte as they went in (modulo line folding).

use crate::error::{FormatError, Result};
use crate::model::{Component, Document, Event, Param, Property};

/// Maximum content line length in octets, excluding the CRLF.
const MAX_LINE_OCTETS: usize = 75;

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

/// Parse an iCalendar document.
///
/// # Errors
/// Returns `FormatError::Parse` with the 1-based line number if the input is
/// not a single, properly nested `VCALENDAR`.
#[tracing::instrument(skip(input), fields(input_len = input.len()))]
pub fn parse(input: &str) -> Result<Document> {
    let lines = unfold(input);
    if lines.is_empty() {
        return Err(parse_error(1, "empty input"));
    }

    // Stack of open components; the bottom entry becomes the VCALENDAR.
    let mut stack: Vec<Component> = Vec::new();
    let mut root: Option<Component> = None;
    let mut last_line = 1;

    for (line_no, line) in lines {
        last_line = line_no;
        let property = parse_content_line(&line, line_no)?;

        if root.is_some() {
            return Err(parse_error(line_no, "content after END:VCALENDAR"));
        }

        if property.is_named("BEGIN") {
            let name = property.value.trim().to_ascii_uppercase();
            if stack.is_empty() && name != "VCALENDAR" {
                return Err(parse_error(line_no, format!("expected BEGIN:VCALENDAR, got BEGIN:{name}")));
            }
            stack.push(Component::new(&name));
        } else if property.is_named("END") {
            let name = property.value.trim().to_ascii_uppercase();
            let finished = stack
                .pop()
                .ok_or_else(|| parse_error(line_no, format!("END:{name} without BEGIN")))?;
            if finished.name != name {
                return Err(parse_error(
                    line_no,
                    format!("expected END:{}, got END:{name}", finished.name),
                ));
            }
            match stack.last_mut() {
                Some(parent) => parent.components.push(finished),
                None => root = Some(finished),
            }
        } else {
            let current = stack
                .last_mut()
                .ok_or_else(|| parse_error(line_no, "property outside of VCALENDAR"))?;
            current.properties.push(property);
        }
    }

    if let Some(open) = stack.last() {
        return Err(parse_error(last_line, format!("missing END:{}", open.name)));
    }
    let root = root.ok_or_else(|| parse_error(1, "missing BEGIN:VCALENDAR"))?;

    let mut document = Document {
        properties: root.properties,
        ..Document::default()
    };
    for child in root.components {
        if child.name == "VEVENT" {
            document.events.push(Event {
                properties: child.properties,
                components: child.components,
            });
        } else {
            document.components.push(child);
        }
    }

    tracing::debug!(
        events = document.events.len(),
        components = document.components.len(),
        "parsed calendar"
    );
    Ok(document)
}

fn parse_error(line: usize, message: impl Into<String>) -> FormatError {
    FormatError::Parse {
        line,
        message: message.into(),
    }
}

/// Join folded lines. Returns each logical line with the 1-based number of
/// the physical line it started on; blank lines are skipped.
fn unfold(input: &str) -> Vec<(usize, String)> {
    let mut logical: Vec<(usize, String)> = Vec::new();

    for (index, raw) in input.split('\n').enumerate() {
        let line = raw.strip_suffix('\r').unwrap_or(raw);
        if let Some(rest) = line.strip_prefix([' ', '\t']) {
            if let Some((_, previous)) = logical.last_mut() {
                previous.push_str(rest);
                continue;
            }
        }
        if !line.trim().is_empty() {
            logical.push((index + 1, line.to_string()));
        }
    }

    logical
}

/// Split `NAME;PARAM=a,"b;c":value` into a [`Property`].
fn parse_content_line(line: &str, line_no: usize) -> Result<Property> {
    let mut in_quotes = false;
    let mut value_start = None;
    let mut segments: Vec<&str> = Vec::new();
    let mut segment_start = 0;

    for (i, c) in line.char_indices() {
        match c {
            '"' => in_quotes = !in_quotes,
            ';' if !in_quotes => {
                segments.push(&line[segment_start..i]);
                segment_start = i + 1;
            }
            ':' if !in_quotes => {
                segments.push(&line[segment_start..i]);
                value_start = Some(i + 1);
                break;
            }
            _ => {}
        }
    }

    let value_start = value_start.ok_or_else(|| parse_error(line_no, "missing ':' separator"))?;
    let mut segments = segments.into_iter();
    let name = segments.next().unwrap_or_default().trim();
    if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
        return Err(parse_error(line_no, format!("invalid property name '{name}'")));
    }

    let params = segments
        .map(|segment| parse_param(segment, line_no))
        .collect::<Result<Vec<_>>>()?;

    Ok(Property {
        name: name.to_ascii_uppercase(),
        params,
        value: line[value_start..].to_string(),
    })
}

fn parse_param(segment: &str, line_no: usize) -> Result<Param> {
    let (name, raw_values) = segment
        .split_once('=')
        .ok_or_else(|| parse_error(line_no, format!("parameter '{segment}' has no value")))?;

    let mut values = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    for c in raw_values.chars() {
        match c {
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => values.push(std::mem::take(&mut current)),
            _ => current.push(c),
        }
    }
    if in_quotes {
        return Err(parse_error(line_no, "unclosed quote in parameter value"));
    }
    values.push(current);

    Ok(Param {
        name: name.trim().to_ascii_uppercase(),
        values,
    })
}

// ---------------------------------------------------------------------------
// Serialization
// ---------------------------------------------------------------------------

/// Serialize a document to iCalendar text with CRLF line endings.
pub fn serialize(document: &Document) -> String {
    let mut out = String::new();
    out.push_str(&fold_line("BEGIN:VCALENDAR"));
    for property in &document.properties {
        out.push_str(&serialize_property(property));
    }
    for component in &document.components {
        write_component(&mut out, &component.name, &component.properties, &component.components);
    }
    for event in &document.events {
        write_component(&mut out, "VEVENT", &event.properties, &event.components);
    }
    out.push_str(&fold_line("END:VCALENDAR"));
    out
}

fn write_component(out: &mut String, name: &str, properties: &[Property], children: &[Component]) {
    out.push_str(&fold_line(&format!("BEGIN:{name}")));
    for property in properties {
        out.push_str(&serialize_property(property));
    }
    for child in children {
        write_component(out, &child.name, &child.properties, &child.components);
    }
    out.push_str(&fold_line(&format!("END:{name}")));
}

/// Serialize one property as a folded, CRLF-terminated content line.
pub fn serialize_property(property: &Property) -> String {
    let mut line = property.name.clone();
    for param in &property.params {
        line.push(';');
        line.push_str(&param.name);
        line.push('=');
        let values: Vec<String> = param.values.iter().map(|v| quote_param_value(v)).collect();
        line.push_str(&values.join(","));
    }
    line.push(':');
    line.push_str(&property.value);
    fold_line(&line)
}

fn quote_param_value(value: &str) -> String {
    if value.contains([':', ';', ',']) {
        format!("\"{value}\"")
    } else {
        value.to_string()
    }
}

/// Fold a content line at 75 octets, never splitting a UTF-8 sequence.
/// Continuation lines start with a single space.
fn fold_line(line: &str) -> String {
    if line.len() <= MAX_LINE_OCTETS {
        return format!("{line}\r\n");
    }

    let mut out = String::with_capacity(line.len() + line.len() / MAX_LINE_OCTETS * 3 + 2);
    let mut rest = line;
    let mut budget = MAX_LINE_OCTETS;

    while rest.len() > budget {
        let mut cut = budget;
        while !rest.is_char_boundary(cut) {
            cut -= 1;
        }
        out.push_str(&rest[..cut]);
        out.push_str("\r\n ");
        rest = &rest[cut..];
        // The leading space of a continuation line counts against the limit.
        budget = MAX_LINE_OCTETS - 1;
    }
    out.push_str(rest);
    out.push_str("\r\n");
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fold_short_line_untouched() {
        assert_eq!(fold_line("SUMMARY:Short"), "SUMMARY:Short\r\n");
    }

    #[test]
    fn fold_long_line_respects_limit() {
        let line = "A".repeat(80);
        let folded = fold_line(&line);
        let parts: Vec<&str> = folded.split("\r\n").filter(|s| !s.is_empty()).collect();
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0].len(), 75);
        assert_eq!(parts[1], " AAAAA");
    }

    #[test]
    fn fold_never_splits_utf8() {
        let line = format!("{}日本語", "A".repeat(73));
        let folded = fold_line(&line);
        let unfolded = folded.replace("\r\n ", "").replace("\r\n", "");
        assert_eq!(unfolded, line);
    }

    #[test]
    fn content_line_with_quoted_params() {
        let prop =
            parse_content_line(r#"ATTENDEE;CN="Doe, Jane";ROLE=CHAIR:mailto:jane@example.com"#, 1)
                .unwrap();
        assert_eq!(prop.name, "ATTENDEE");
        assert_eq!(prop.param("CN"), Some("Doe, Jane"));
        assert_eq!(prop.param("ROLE"), Some("CHAIR"));
        assert_eq!(prop.value, "mailto:jane@example.com");
    }

    #[test]
    fn unfold_joins_continuations() {
        let lines = unfold("SUMMARY:Hello\r\n  World\r\nLOCATION:Here\r\n");
        assert_eq!(
            lines,
            vec![
                (1, "SUMMARY:Hello World".to_string()),
                (3, "LOCATION:Here".to_string())
            ]
        );
    }
}
