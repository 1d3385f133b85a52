//! The transformation pipeline.
//!
//! Stage order is fixed; a stage runs only when its sub-configuration is
//! present:
//!
//! 1. replace product identifier
//! 2. UID fixup (when `fixupFirst`)
//! 3. recurrence collapse
//! 4. field rewrite
//! 5. custom event injection
//! 6. UID fixup (when not `fixupFirst`)
//!
//! Document details are extracted once, before the first stage.

use crate::config::FormatterConfig;
use crate::details::{extract_details, ExtractedDetails};
use crate::error::Result;
use crate::model::Document;
use crate::recurrence::collapse_recurring;
use crate::rewrite::rewrite_fields;
use crate::synth::inject_custom_events;
use crate::uid::fixup_uids;

/// A configured pipeline. Cheap to build; holds no per-document state.
#[derive(Debug, Clone)]
pub struct Formatter {
    config: FormatterConfig,
}

impl Formatter {
    pub fn new(config: FormatterConfig) -> Self {
        Self { config }
    }

    /// Run every enabled stage over `document` and return it.
    ///
    /// The document is consumed: on failure nothing is handed back, so a
    /// half-transformed calendar can never be served.
    ///
    /// # Errors
    /// Fails when an enabled stage finds a required field missing (no `UID` or
    /// `DTSTART` during UID fixup), or when the configuration holds an invalid
    /// pattern, timestamp or timezone.
    #[tracing::instrument(skip_all, fields(events = document.events.len()))]
    pub fn transform(&self, mut document: Document) -> Result<Document> {
        let details = extract_details(&document);
        tracing::debug!(subject = %details.subject, "extracted details");

        self.run_stages(&mut document, &details)?;

        tracing::debug!(events = document.events.len(), "transform complete");
        Ok(document)
    }

    fn run_stages(&self, document: &mut Document, details: &ExtractedDetails) -> Result<()> {
        let config = &self.config;

        if let Some(product_id) = &config.replace_product_id {
            document.set_property("PRODID", product_id.clone());
        }

        if let Some(fixup) = config.uid_fixup.as_ref().filter(|f| f.fixup_first) {
            fixup_uids(&mut document.events, fixup)?;
        }

        if let Some(recurrence) = &config.recurrence {
            let events = std::mem::take(&mut document.events);
            document.events = collapse_recurring(events, recurrence);
        }

        if let Some(rewrite) = &config.field_rewrite {
            rewrite_fields(&mut document.events, rewrite)?;
        }

        if let Some(extensions) = &config.extensions {
            let injected = inject_custom_events(document, extensions, details)?;
            tracing::debug!(injected, "custom events");
        }

        if let Some(fixup) = config.uid_fixup.as_ref().filter(|f| !f.fixup_first) {
            fixup_uids(&mut document.events, fixup)?;
        }

        Ok(())
    }
}

/// Convenience wrapper around [`Formatter::transform`].
pub fn transform(document: Document, config: &FormatterConfig) -> Result<Document> {
    Formatter::new(config.clone()).transform(document)
}
