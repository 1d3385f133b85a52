//! Field rewriting: ordered value-transformation patterns over event
//! properties.

use std::borrow::Cow;
use std::collections::HashMap;

use regex::Regex;

use crate::config::{FieldRewriteConfig, RewriteFn, RewritePattern, Rewriter};
use crate::error::{FormatError, Result};
use crate::model::Event;

enum CompiledRewriter {
    Regex { re: Regex, replacement: String },
    Function(RewriteFn),
}

impl CompiledRewriter {
    fn new(rewriter: &Rewriter) -> Result<Self> {
        Ok(match rewriter {
            Rewriter::Regex {
                pattern,
                replacement,
            } => Self::Regex {
                re: Regex::new(pattern).map_err(|e| FormatError::invalid_pattern(pattern, e))?,
                replacement: replacement.clone(),
            },
            Rewriter::Function(f) => Self::Function(f.clone()),
        })
    }

    fn apply(&self, input: &str) -> String {
        match self {
            Self::Regex { re, replacement } => match re.replace_all(input, replacement.as_str()) {
                Cow::Borrowed(unchanged) => unchanged.to_string(),
                Cow::Owned(changed) => changed,
            },
            Self::Function(f) => f.call(input),
        }
    }
}

/// Applies a [`FieldRewriteConfig`] to events.
pub struct FieldRewriter<'a> {
    patterns: Vec<(&'a RewritePattern, CompiledRewriter)>,
}

impl<'a> FieldRewriter<'a> {
    /// # Errors
    /// Returns `FormatError::InvalidPattern` if a regex rewriter does not
    /// compile.
    pub fn new(config: &'a FieldRewriteConfig) -> Result<Self> {
        let patterns = config
            .patterns
            .iter()
            .map(|p| CompiledRewriter::new(&p.rewriter).map(|r| (p, r)))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { patterns })
    }

    /// Run every pattern, in declaration order, over one event.
    ///
    /// The first time a pattern mentions a property (as source or target) its
    /// current value is remembered; patterns pinned to the original value read
    /// that snapshot even after an earlier pattern rewrote the property.
    /// Missing values read as the empty string.
    pub fn rewrite(&self, event: &mut Event) {
        let mut originals: HashMap<String, String> = HashMap::new();

        for (pattern, rewriter) in &self.patterns {
            let source_key = pattern.source_key().to_ascii_uppercase();
            let target_key = pattern.property_key.to_ascii_uppercase();

            for key in [&source_key, &target_key] {
                if !originals.contains_key(key) {
                    let current = event.value(key).unwrap_or_default().to_string();
                    originals.insert(key.clone(), current);
                }
            }

            let source = if pattern.use_original_source_value {
                originals[&source_key].clone()
            } else {
                event.value(&source_key).unwrap_or_default().to_string()
            };

            event.set_value(&target_key, rewriter.apply(&source));
        }
    }
}

/// Rewrite every event with the configured patterns.
pub fn rewrite_fields(events: &mut [Event], config: &FieldRewriteConfig) -> Result<()> {
    let rewriter = FieldRewriter::new(config)?;
    for event in events.iter_mut() {
        rewriter.rewrite(event);
    }
    tracing::debug!(
        events = events.len(),
        patterns = config.patterns.len(),
        "rewrote fields"
    );
    Ok(())
}
