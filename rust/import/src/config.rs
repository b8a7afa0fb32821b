// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Import settings loaded from environment variables or built in code.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;

/// What to do when two spatial containers share a qualified name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicateNamePolicy {
    /// Keep the first container, record the collision and continue
    #[default]
    KeepFirst,
    /// Abort the import
    Reject,
}

impl FromStr for DuplicateNamePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "keep_first" | "keep-first" | "first" => Ok(Self::KeepFirst),
            "reject" => Ok(Self::Reject),
            other => Err(format!("unknown duplicate name policy: {}", other)),
        }
    }
}

/// Import settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportSettings {
    /// IFC-SPF file to import.
    pub input: Option<PathBuf>,
    /// JSON diff snapshot restricting the import.
    pub diff: Option<PathBuf>,
    /// JSON schema metadata; the built-in IFC4 catalog when absent.
    pub schema: Option<PathBuf>,
    /// Re-root the import at the site instead of its surveyed position.
    pub ignore_site_coordinates: bool,
    /// Import curve geometry as edges.
    pub include_curves: bool,
    /// Handling of duplicate spatial container names.
    pub duplicate_names: DuplicateNamePolicy,
}

impl ImportSettings {
    /// Load settings from environment variables.
    pub fn from_env() -> Self {
        Self {
            input: std::env::var("IFC_IMPORT_INPUT").ok().map(PathBuf::from),
            diff: std::env::var("IFC_IMPORT_DIFF").ok().map(PathBuf::from),
            schema: std::env::var("IFC_IMPORT_SCHEMA").ok().map(PathBuf::from),
            ignore_site_coordinates: env_flag("IFC_IMPORT_IGNORE_SITE"),
            include_curves: env_flag("IFC_IMPORT_CURVES"),
            duplicate_names: std::env::var("IFC_IMPORT_DUPLICATE_NAMES")
                .ok()
                .and_then(|value| value.parse().ok())
                .unwrap_or_default(),
        }
    }

    pub fn with_input(mut self, input: impl Into<PathBuf>) -> Self {
        self.input = Some(input.into());
        self
    }

    pub fn with_diff(mut self, diff: impl Into<PathBuf>) -> Self {
        self.diff = Some(diff.into());
        self
    }

    pub fn with_schema(mut self, schema: impl Into<PathBuf>) -> Self {
        self.schema = Some(schema.into());
        self
    }

    pub fn with_ignore_site_coordinates(mut self, ignore: bool) -> Self {
        self.ignore_site_coordinates = ignore;
        self
    }

    pub fn with_include_curves(mut self, include: bool) -> Self {
        self.include_curves = include;
        self
    }

    pub fn with_duplicate_names(mut self, policy: DuplicateNamePolicy) -> Self {
        self.duplicate_names = policy;
        self
    }
}

fn env_flag(name: &str) -> bool {
    std::env::var(name)
        .map(|value| matches!(value.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = ImportSettings::default();
        assert!(settings.input.is_none());
        assert!(!settings.ignore_site_coordinates);
        assert_eq!(settings.duplicate_names, DuplicateNamePolicy::KeepFirst);
    }

    #[test]
    fn test_deserialize_partial() {
        let settings: ImportSettings =
            serde_json::from_str(r#"{"include_curves": true, "duplicate_names": "reject"}"#).unwrap();
        assert!(settings.include_curves);
        assert_eq!(settings.duplicate_names, DuplicateNamePolicy::Reject);
        assert!(settings.diff.is_none());
    }

    #[test]
    fn test_policy_from_str() {
        assert_eq!("Reject".parse(), Ok(DuplicateNamePolicy::Reject));
        assert_eq!("keep-first".parse(), Ok(DuplicateNamePolicy::KeepFirst));
        assert!("overwrite".parse::<DuplicateNamePolicy>().is_err());
    }

    #[test]
    fn test_from_env() {
        std::env::set_var("IFC_IMPORT_INPUT", "/tmp/model.ifc");
        std::env::set_var("IFC_IMPORT_IGNORE_SITE", "true");
        std::env::set_var("IFC_IMPORT_CURVES", "0");
        std::env::set_var("IFC_IMPORT_DUPLICATE_NAMES", "reject");

        let settings = ImportSettings::from_env();
        assert_eq!(settings.input, Some(PathBuf::from("/tmp/model.ifc")));
        assert!(settings.ignore_site_coordinates);
        assert!(!settings.include_curves);
        assert_eq!(settings.duplicate_names, DuplicateNamePolicy::Reject);

        for name in [
            "IFC_IMPORT_INPUT",
            "IFC_IMPORT_IGNORE_SITE",
            "IFC_IMPORT_CURVES",
            "IFC_IMPORT_DUPLICATE_NAMES",
        ] {
            std::env::remove_var(name);
        }
    }

    #[test]
    fn test_builder() {
        let settings = ImportSettings::default()
            .with_input("a.ifc")
            .with_diff("diff.json")
            .with_include_curves(true);
        assert_eq!(settings.input, Some(PathBuf::from("a.ifc")));
        assert_eq!(settings.diff, Some(PathBuf::from("diff.json")));
        assert!(settings.include_curves);
    }
}
