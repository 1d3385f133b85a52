//! Named transformation profiles.
//!
//! A profile couples a [`FormatterConfig`] with an optional upstream source
//! URL and an optional extension file. Profiles come from code
//! ([`ProfileRegistry::builtin`]) and from a JSON registry file whose entries
//! replace built-ins of the same name:
//!
//! ```json
//! {
//!   "uni": {
//!     "source": "https://timetable.example.edu/feed.ics",
//!     "extensionFile": "extensions/uni.json",
//!     "formatter": { "recurrence": { "requiredMatchingKeys": ["SUMMARY"], "frequency": "weekly" } }
//!   }
//! }
//! ```
//!
//! Unknown names and unreadable or malformed extension files are reported
//! here, before any document is transformed.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::config::{
    ExtensionBundle, FieldRewriteConfig, FormatterConfig, RecurrenceConfig, RewriteFn,
    RewritePattern, Rewriter, UidDerivation, UidFixupConfig, UidPrefix,
};
use crate::error::{FormatError, Result};
use crate::rule::Frequency;
use crate::synth::CustomUidStrategy;
use crate::uid::md5_hex;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Profile {
    /// Upstream calendar URL served by this profile.
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub formatter: FormatterConfig,
    /// JSON [`ExtensionBundle`] replacing `formatter.extensions`.
    #[serde(default)]
    pub extension_file: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct ProfileRegistry {
    profiles: BTreeMap<String, Profile>,
}

impl ProfileRegistry {
    /// Profiles defined in code.
    pub fn builtin() -> Self {
        let mut profiles = BTreeMap::new();
        profiles.insert("passthrough".to_string(), Profile::default());
        profiles.insert("timetable".to_string(), timetable_profile());
        Self { profiles }
    }

    /// Built-ins overlaid with the profiles in `json`. Relative extension file
    /// paths are kept as written.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let loaded: BTreeMap<String, Profile> = serde_json::from_str(json)?;
        let mut registry = Self::builtin();
        registry.profiles.extend(loaded);
        Ok(registry)
    }

    /// Built-ins overlaid with the profiles in the file at `path`. Relative
    /// extension file paths resolve against the file's directory.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| FormatError::ConfigFile {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        let mut registry = Self::from_json_str(&text).map_err(|e| FormatError::ConfigFile {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

        let base = path.parent().unwrap_or_else(|| Path::new(""));
        for profile in registry.profiles.values_mut() {
            if let Some(ext) = profile.extension_file.as_mut().filter(|p| p.is_relative()) {
                *ext = base.join(&*ext);
            }
        }
        tracing::info!(path = %path.display(), profiles = registry.profiles.len(), "loaded profiles");
        Ok(registry)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.profiles.keys().map(String::as_str)
    }

    pub fn get(&self, name: &str) -> Option<&Profile> {
        self.profiles.get(name)
    }

    /// Register or replace a profile.
    pub fn insert(&mut self, name: impl Into<String>, profile: Profile) {
        self.profiles.insert(name.into(), profile);
    }

    /// The formatter configuration for `name`, with its extension file (if
    /// any) loaded.
    pub fn resolve(&self, name: &str) -> Result<FormatterConfig> {
        self.resolve_with_extension(name, None)
    }

    /// Like [`resolve`](Self::resolve), with `extension` taking precedence
    /// over the profile's own extension file.
    pub fn resolve_with_extension(&self, name: &str, extension: Option<&Path>) -> Result<FormatterConfig> {
        let profile = self
            .get(name)
            .ok_or_else(|| FormatError::UnknownProfile(name.to_string()))?;

        let mut config = profile.formatter.clone();
        if let Some(path) = extension.or(profile.extension_file.as_deref()) {
            let mut bundle = load_extension(path)?;
            if let Some(existing) = &config.extensions {
                bundle.uid_strategy = existing.uid_strategy.clone();
            }
            config.extensions = Some(bundle);
        }
        Ok(config)
    }
}

impl Default for ProfileRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

/// Read an [`ExtensionBundle`] from a JSON file.
pub fn load_extension(path: &Path) -> Result<ExtensionBundle> {
    let config_error = |message: String| FormatError::ConfigFile {
        path: path.to_path_buf(),
        message,
    };
    let text = std::fs::read_to_string(path).map_err(|e| config_error(e.to_string()))?;
    let bundle: ExtensionBundle =
        serde_json::from_str(&text).map_err(|e| config_error(e.to_string()))?;
    tracing::debug!(path = %path.display(), custom_events = bundle.custom_events.len(), "loaded extension");
    Ok(bundle)
}

/// University-style timetable feeds: one `VEVENT` per class meeting, UIDs
/// like `COMP1511-LEC-01-20260105@uni`, summaries like `COMP1511 Lecture (A01)`.
fn timetable_profile() -> Profile {
    let collapse_whitespace =
        RewriteFn::new(|value| value.split_whitespace().collect::<Vec<_>>().join(" "));

    Profile {
        source: None,
        extension_file: None,
        formatter: FormatterConfig {
            replace_product_id: Some("-//ical-formatter//timetable//EN".to_string()),
            recurrence: Some(RecurrenceConfig {
                required_matching_keys: vec![
                    "SUMMARY".to_string(),
                    "LOCATION".to_string(),
                    "DESCRIPTION".to_string(),
                ],
                frequency: Frequency::Weekly,
            }),
            field_rewrite: Some(FieldRewriteConfig {
                patterns: vec![
                    RewritePattern {
                        property_key: "SUMMARY".to_string(),
                        source_key: None,
                        use_original_source_value: false,
                        rewriter: Rewriter::Regex {
                            pattern: r"\s*\([^)]*\)\s*$".to_string(),
                            replacement: String::new(),
                        },
                    },
                    RewritePattern {
                        property_key: "X-ORIGINAL-SUMMARY".to_string(),
                        source_key: Some("SUMMARY".to_string()),
                        use_original_source_value: true,
                        rewriter: Rewriter::Function(RewriteFn::new(str::to_string)),
                    },
                    RewritePattern {
                        property_key: "LOCATION".to_string(),
                        source_key: None,
                        use_original_source_value: false,
                        rewriter: Rewriter::Function(collapse_whitespace),
                    },
                ],
            }),
            uid_fixup: Some(UidFixupConfig {
                fixup_first: false,
                prefix: UidPrefix::RegexReplace {
                    pattern: r"^([^-@]+).*$".to_string(),
                    replacement: "$1-".to_string(),
                },
                derivation: UidDerivation::DtstartMd5,
            }),
            extensions: Some(ExtensionBundle {
                escape_special_characters: true,
                custom_events: Vec::new(),
                uid_strategy: CustomUidStrategy::new(|created, details| {
                    format!("{}-custom-{}", details.subject, md5_hex(created))
                }),
            }),
        },
    }
}
