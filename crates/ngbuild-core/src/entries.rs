//! Global style/script entries.
//!
//! Configuration accepts either a bare input path or an object with a bundle
//! name and an `inject` flag. Both shapes are normalized once, here, into
//! [`NamedEntry`] buckets so nothing downstream has to switch on the shape.

use crate::error::{Error, Result};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// A style or script entry as written in configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum EntryOption {
    /// `"src/styles.css"`
    Path(String),
    /// `{ "input": "src/theme.css", "bundleName": "theme", "inject": false }`
    Object {
        input: String,
        #[serde(default, rename = "bundleName", skip_serializing_if = "Option::is_none")]
        bundle_name: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        inject: Option<bool>,
    },
}

/// One output bucket: all inputs that end up in the same bundle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamedEntry {
    /// Bundle name, used as the output file stem
    pub name: String,
    /// Inputs in configuration order
    pub inputs: Vec<PathBuf>,
    /// Whether the bundle is referenced from the index document
    pub initial: bool,
}

/// Group entry options into named buckets, preserving first-seen order.
///
/// Entries without a bundle name land in `default_name` when injected. A
/// non-injected entry without a name gets its own bucket named after the
/// input's file stem. A bucket is initial only if every entry in it is
/// injected.
pub fn normalize_entries(options: &[EntryOption], default_name: &str) -> Result<Vec<NamedEntry>> {
    let mut buckets: Vec<NamedEntry> = Vec::new();

    for option in options {
        let (input, bundle_name, inject) = match option {
            EntryOption::Path(input) => (input.as_str(), None, true),
            EntryOption::Object {
                input,
                bundle_name,
                inject,
            } => (input.as_str(), bundle_name.as_deref(), inject.unwrap_or(true)),
        };

        if input.trim().is_empty() {
            return Err(Error::InvalidEntry {
                name: bundle_name.unwrap_or(default_name).to_string(),
                reason: "input path is empty".to_string(),
            });
        }

        let name = match bundle_name {
            Some(name) => validate_name(name)?,
            None if inject => default_name.to_string(),
            None => file_stem(input)?,
        };

        match buckets.iter_mut().find(|bucket| bucket.name == name) {
            Some(bucket) => {
                bucket.inputs.push(PathBuf::from(input));
                bucket.initial &= inject;
            }
            None => buckets.push(NamedEntry {
                name,
                inputs: vec![PathBuf::from(input)],
                initial: inject,
            }),
        }
    }

    Ok(buckets)
}

fn validate_name(name: &str) -> Result<String> {
    let valid = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
    if valid {
        Ok(name.to_string())
    } else {
        Err(Error::InvalidEntry {
            name: name.to_string(),
            reason: "bundle names may only contain letters, digits, '-', '_' and '.'".to_string(),
        })
    }
}

fn file_stem(input: &str) -> Result<String> {
    Path::new(input)
        .file_stem()
        .map(|stem| stem.to_string_lossy().to_string())
        .ok_or_else(|| Error::InvalidEntry {
            name: input.to_string(),
            reason: "cannot derive a bundle name from the input path".to_string(),
        })
}
