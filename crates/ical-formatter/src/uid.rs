//! UID fixup: recompute event identifiers from a prefix and the start time.

use md5::{Digest, Md5};
use regex::Regex;

use crate::config::{UidDerivation, UidFixupConfig, UidPrefix};
use crate::datetime::DateTimeValue;
use crate::error::{FormatError, Result};
use crate::model::Event;

enum Prefix {
    Literal(String),
    RegexReplace { re: Regex, replacement: String },
}

/// Derives new UIDs according to a [`UidFixupConfig`].
pub struct UidDeriver {
    prefix: Prefix,
    derivation: UidDerivation,
}

impl UidDeriver {
    /// # Errors
    /// Returns `FormatError::InvalidPattern` if the prefix regex does not
    /// compile.
    pub fn new(config: &UidFixupConfig) -> Result<Self> {
        let prefix = match &config.prefix {
            UidPrefix::Literal { value } => Prefix::Literal(value.clone()),
            UidPrefix::RegexReplace {
                pattern,
                replacement,
            } => Prefix::RegexReplace {
                re: Regex::new(pattern).map_err(|e| FormatError::invalid_pattern(pattern, e))?,
                replacement: replacement.clone(),
            },
        };
        Ok(Self {
            prefix,
            derivation: config.derivation,
        })
    }

    /// Compute the new identifier for an event whose current UID is
    /// `original` and which starts at `start`. Pure and deterministic.
    ///
    /// # Errors
    /// Returns `FormatError::InvalidTimezone` if `start` cannot be resolved to
    /// an instant.
    pub fn derive(&self, original: &str, start: &DateTimeValue) -> Result<String> {
        let prefix = match &self.prefix {
            Prefix::Literal(value) => value.clone(),
            Prefix::RegexReplace { re, replacement } => {
                re.replace_all(original, replacement.as_str()).into_owned()
            }
        };
        let hash = match self.derivation {
            UidDerivation::DtstartMd5 => start_hash(start)?,
        };
        Ok(prefix + &hash)
    }
}

/// MD5 (hex) of the start instant in epoch milliseconds, written as
/// lowercase hex text. Negative instants use their two's-complement form.
pub fn start_hash(start: &DateTimeValue) -> Result<String> {
    let millis = start.epoch_millis()?;
    Ok(md5_hex(&format!("{millis:x}")))
}

pub(crate) fn md5_hex(text: &str) -> String {
    hex::encode(Md5::digest(text.as_bytes()))
}

/// Rewrite the UID of every event.
///
/// # Errors
/// Every event must carry a non-empty `UID` and a parseable `DTSTART`;
/// otherwise the whole call fails and no event is left half-processed by the
/// caller (the pipeline discards the document).
pub fn fixup_uids(events: &mut [Event], config: &UidFixupConfig) -> Result<()> {
    let deriver = UidDeriver::new(config)?;

    for (index, event) in events.iter_mut().enumerate() {
        let original = event
            .uid()
            .filter(|uid| !uid.is_empty())
            .ok_or(FormatError::MissingProperty {
                index,
                property: "UID",
            })?
            .to_string();
        let start = event.start()?.ok_or(FormatError::MissingProperty {
            index,
            property: "DTSTART",
        })?;

        let uid = deriver.derive(&original, &start)?;
        tracing::trace!(%original, %uid, "derived uid");
        event.set_value("UID", uid);
    }

    Ok(())
}
