//! Document-level facts computed once, before any stage mutates the document.

use serde::Serialize;

use crate::model::Document;

/// Subject used when none can be extracted.
pub const UNKNOWN_SUBJECT: &str = "Unknown subject";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExtractedDetails {
    /// Token taken from the first event's UID, e.g. `COMP1511` from
    /// `COMP1511-LEC-01@uni.example`.
    pub subject: String,
}

impl Default for ExtractedDetails {
    fn default() -> Self {
        Self {
            subject: UNKNOWN_SUBJECT.to_string(),
        }
    }
}

/// Extract details from the document.
///
/// The subject is the part of the first event's UID before the first `-`,
/// ignoring any `@domain` suffix. An empty document or a UID without that
/// shape is not an error: a warning is logged and the subject falls back to
/// [`UNKNOWN_SUBJECT`].
pub fn extract_details(document: &Document) -> ExtractedDetails {
    let Some(first) = document.events.first() else {
        tracing::warn!("calendar has no events, cannot extract subject");
        return ExtractedDetails::default();
    };

    let uid = first.uid().unwrap_or_default();
    let local_part = uid.split('@').next().unwrap_or_default();
    match local_part.split_once('-') {
        Some((subject, _)) if !subject.trim().is_empty() => ExtractedDetails {
            subject: subject.trim().to_string(),
        },
        _ => {
            tracing::warn!(%uid, "first event UID has no subject token");
            ExtractedDetails::default()
        }
    }
}
