//! Configuration for the contract resolution layer
//!
//! Everything that shapes compiler, adapter or source behavior is threaded
//! in through these values at construction time. Core logic never reads the
//! process environment.

use crate::error::{CompareError, Result, ResultExt};
use crate::query_compiler::{ComparisonFocus, SurgeryMethod};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Lowest insurer count a comparison can be built from
pub const MIN_COMPARABLE_INSURERS: usize = 2;

/// Main configuration
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CompareConfig {
    /// Query compiler policy
    pub compiler: CompilerPolicy,

    /// Premium adapter settings
    pub adapter: AdapterConfig,

    /// Where premium payloads come from
    pub source: SourceConfig,
}

impl CompareConfig {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_compiler(mut self, compiler: CompilerPolicy) -> Self {
        self.compiler = compiler;
        self
    }

    pub fn with_adapter(mut self, adapter: AdapterConfig) -> Self {
        self.adapter = adapter;
        self
    }

    pub fn with_source(mut self, source: SourceConfig) -> Self {
        self.source = source;
        self
    }

    /// Load configuration from a file (`.toml` as TOML, anything else as JSON)
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let config: Self = if is_toml(path) {
            toml::from_str(&content).with_context(|| format!("parsing {}", path.display()))?
        } else {
            serde_json::from_str(&content)
                .with_context(|| format!("parsing {}", path.display()))?
        };
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a file
    pub fn to_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let content = if is_toml(path) {
            toml::to_string_pretty(self)?
        } else {
            serde_json::to_string_pretty(self)?
        };
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        self.compiler.validate()?;
        self.adapter.validate()
    }
}

fn is_toml(path: &Path) -> bool {
    path.extension().and_then(|e| e.to_str()) == Some("toml")
}

/// Vocabulary and thresholds the query compiler resolves slots with
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompilerPolicy {
    /// Minimum distinct insurers; never below [`MIN_COMPARABLE_INSURERS`]
    pub min_insurers: usize,

    /// Endings that make a query token look like a coverage mention
    pub coverage_suffixes: Vec<String>,

    /// Extra query terms that make a query surgery-method sensitive. Empty by
    /// default: the mapping table's `surgery_method` flag decides.
    pub surgery_terms: Vec<String>,

    /// Query keyword → surgery method it implies
    pub surgery_method_keywords: BTreeMap<String, SurgeryMethod>,

    /// Terms that make a query cancer-subtype sensitive
    pub cancer_subtype_terms: Vec<String>,

    /// Subtypes a user may pick from
    pub cancer_subtype_options: Vec<String>,

    /// Query keyword → subtype it suggests
    pub cancer_subtype_keywords: BTreeMap<String, String>,

    /// Query keyword → comparison focus it implies
    pub focus_keywords: BTreeMap<String, ComparisonFocus>,

    /// Basis used when the user picked none
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_comparison_basis: Option<String>,
}

impl Default for CompilerPolicy {
    fn default() -> Self {
        Self {
            min_insurers: MIN_COMPARABLE_INSURERS,
            coverage_suffixes: strings(&["진단비", "수술비", "입원비", "치료비", "입원일당"]),
            surgery_terms: Vec::new(),
            surgery_method_keywords: BTreeMap::from([
                ("다빈치".to_string(), SurgeryMethod::Robotic),
                ("로봇".to_string(), SurgeryMethod::Robotic),
                ("복강경".to_string(), SurgeryMethod::Laparoscopic),
                ("개복".to_string(), SurgeryMethod::Open),
            ]),
            cancer_subtype_terms: strings(&["유사암", "소액암"]),
            cancer_subtype_options: strings(&[
                "thyroid",
                "carcinoma_in_situ",
                "borderline_tumor",
                "skin",
            ]),
            cancer_subtype_keywords: BTreeMap::from([
                ("갑상선".to_string(), "thyroid".to_string()),
                ("제자리암".to_string(), "carcinoma_in_situ".to_string()),
                ("경계성".to_string(), "borderline_tumor".to_string()),
                ("기타피부암".to_string(), "skin".to_string()),
            ]),
            focus_keywords: BTreeMap::from([
                ("보험료".to_string(), ComparisonFocus::Premium),
                ("가입금액".to_string(), ComparisonFocus::CoverageAmount),
                ("보장금액".to_string(), ComparisonFocus::CoverageAmount),
                ("보장조건".to_string(), ComparisonFocus::CoverageTerms),
                ("감액".to_string(), ComparisonFocus::CoverageTerms),
                ("면책".to_string(), ComparisonFocus::CoverageTerms),
            ]),
            default_comparison_basis: None,
        }
    }
}

impl CompilerPolicy {
    pub fn with_min_insurers(mut self, min: usize) -> Self {
        self.min_insurers = min;
        self
    }

    pub fn with_surgery_terms<I, S>(mut self, terms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.surgery_terms = terms.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_default_comparison_basis(mut self, basis: impl Into<String>) -> Self {
        self.default_comparison_basis = Some(basis.into());
        self
    }

    /// Effective insurer minimum
    pub fn required_insurers(&self) -> usize {
        self.min_insurers.max(MIN_COMPARABLE_INSURERS)
    }

    pub fn validate(&self) -> Result<()> {
        if self.min_insurers < MIN_COMPARABLE_INSURERS {
            return Err(CompareError::InvalidConfig(format!(
                "compiler.min_insurers must be at least {}, got {}",
                MIN_COMPARABLE_INSURERS, self.min_insurers
            )));
        }
        if self.cancer_subtype_options.is_empty() {
            return Err(CompareError::InvalidConfig(
                "compiler.cancer_subtype_options must not be empty".to_string(),
            ));
        }
        for (keyword, subtype) in &self.cancer_subtype_keywords {
            if !self.cancer_subtype_options.contains(subtype) {
                return Err(CompareError::InvalidConfig(format!(
                    "keyword '{}' maps to unknown cancer subtype '{}'",
                    keyword, subtype
                )));
            }
        }
        Ok(())
    }
}

/// Premium adapter settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdapterConfig {
    /// `returnCode` values that mean success
    pub success_codes: Vec<String>,

    /// How many nested wrappers may be peeled off one payload
    pub max_unwrap_depth: usize,
}

impl Default for AdapterConfig {
    fn default() -> Self {
        Self {
            success_codes: strings(&["0000", "0"]),
            max_unwrap_depth: 4,
        }
    }
}

impl AdapterConfig {
    pub fn with_success_codes<I, S>(mut self, codes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.success_codes = codes.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_max_unwrap_depth(mut self, depth: usize) -> Self {
        self.max_unwrap_depth = depth;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.success_codes.iter().all(|c| c.trim().is_empty()) {
            return Err(CompareError::InvalidConfig(
                "adapter.success_codes must contain at least one code".to_string(),
            ));
        }
        if self.max_unwrap_depth == 0 {
            return Err(CompareError::InvalidConfig(
                "adapter.max_unwrap_depth must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Premium payload source selection
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SourceConfig {
    /// Built-in deterministic payloads
    #[default]
    Fixture,
    /// Payload read from a JSON file
    File { path: PathBuf },
}

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}
