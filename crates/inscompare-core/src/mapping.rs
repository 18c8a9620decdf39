//! Coverage mapping table
//!
//! Versioned lookup from raw coverage-name text to a canonical coverage
//! code. The table is built by an offline batch job; this crate only reads
//! it, so everything here is immutable once loaded.

use crate::error::{MappingError, Result, ResultExt};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Slot a coverage makes the compiler ask about
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotSensitivity {
    SurgeryMethod,
    CancerSubtypes,
}

/// One row of the mapping table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappingEntry {
    pub coverage_name: String,
    pub coverage_code: String,
    #[serde(default = "default_active")]
    pub active: bool,
    /// Rule version this row belongs to; `None` means the table's version.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rule_version: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sensitivity: Vec<SlotSensitivity>,
}

fn default_active() -> bool {
    true
}

impl MappingEntry {
    pub fn new(coverage_name: impl Into<String>, coverage_code: impl Into<String>) -> Self {
        Self {
            coverage_name: coverage_name.into(),
            coverage_code: coverage_code.into(),
            active: true,
            rule_version: None,
            sensitivity: Vec::new(),
        }
    }

    /// Mark the row as retired
    pub fn inactive(mut self) -> Self {
        self.active = false;
        self
    }

    pub fn for_rule_version(mut self, version: impl Into<String>) -> Self {
        self.rule_version = Some(version.into());
        self
    }

    pub fn sensitive_to(mut self, slot: SlotSensitivity) -> Self {
        if !self.sensitivity.contains(&slot) {
            self.sensitivity.push(slot);
        }
        self
    }

    pub fn normalized_name(&self) -> String {
        normalize_text(&self.coverage_name)
    }
}

/// Mapping table as produced by the offline pipeline
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappingTable {
    pub rule_version: String,
    #[serde(default)]
    pub entries: Vec<MappingEntry>,
}

impl MappingTable {
    pub fn new(rule_version: impl Into<String>) -> Self {
        Self {
            rule_version: rule_version.into(),
            entries: Vec::new(),
        }
    }

    pub fn with_entry(mut self, entry: MappingEntry) -> Self {
        self.entries.push(entry);
        self
    }

    /// Parse and validate a table from JSON text
    pub fn from_json_str(content: &str) -> Result<Self> {
        let table: Self = serde_json::from_str(content)?;
        table.validate()?;
        Ok(table)
    }

    /// Load a table from a JSON file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading mapping table {}", path.display()))?;
        Self::from_json_str(&content)
            .with_context(|| format!("parsing mapping table {}", path.display()))
    }

    pub fn validate(&self) -> std::result::Result<(), MappingError> {
        if self.rule_version.trim().is_empty() {
            return Err(MappingError::EmptyRuleVersion);
        }
        for (index, entry) in self.entries.iter().enumerate() {
            if entry.normalized_name().is_empty() {
                return Err(MappingError::EmptyCoverageName { index });
            }
            if entry.coverage_code.trim().is_empty() {
                return Err(MappingError::EmptyCoverageCode {
                    index,
                    name: entry.coverage_name.clone(),
                });
            }
        }
        Ok(())
    }

    /// Active and belonging to this table's rule version
    pub fn is_eligible(&self, entry: &MappingEntry) -> bool {
        entry.active
            && entry
                .rule_version
                .as_deref()
                .map_or(true, |v| v == self.rule_version)
    }

    /// Distinct normalized coverage names, in listed order
    pub fn normalized_names(&self) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        for entry in &self.entries {
            let name = entry.normalized_name();
            if !name.is_empty() && !names.contains(&name) {
                names.push(name);
            }
        }
        names
    }

    /// Every row whose normalized name equals `normalized_name`, in listed order
    pub fn entries_named<'a>(
        &'a self,
        normalized_name: &'a str,
    ) -> impl Iterator<Item = &'a MappingEntry> + 'a {
        self.entries
            .iter()
            .filter(move |e| e.normalized_name() == normalized_name)
    }
}

/// Case- and whitespace-insensitive form used for every lexical comparison
pub fn normalize_text(text: &str) -> String {
    normalize_with_breaks(text).0
}

/// Normalized text plus the byte offsets into it where whitespace was removed
pub(crate) fn normalize_with_breaks(text: &str) -> (String, Vec<usize>) {
    let mut normalized = String::with_capacity(text.len());
    let mut breaks: Vec<usize> = Vec::new();
    for c in text.chars() {
        if c.is_whitespace() {
            if breaks.last() != Some(&normalized.len()) {
                breaks.push(normalized.len());
            }
        } else {
            normalized.extend(c.to_lowercase());
        }
    }
    (normalized, breaks)
}
