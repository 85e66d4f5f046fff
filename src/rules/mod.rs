//! Rule compilation and the per-model filter/transform engine
//!
//! Raw rules come from the configuration as plain strings. Compilation turns
//! them into immutable, ready-to-evaluate matchers once per model, keeping
//! the model definitions themselves untouched so they can be reused safely
//! across concurrent pipelines.
//!
//! Filters always run before transforms: a transformation can never change
//! what a filter matched.

use regex::{Regex, RegexBuilder};
use tracing::warn;

use crate::config::ModelConfig;
use crate::errors::{SourceError, SourceResult};
use crate::models::ChannelEntry;

/// An inclusion predicate on one field's value
#[derive(Debug, Clone)]
pub struct CompiledFilter {
    pub field: String,
    pub pattern: Regex,
}

/// A field rewrite: the first pattern match is replaced, with support for
/// back-references to captured groups
#[derive(Debug, Clone)]
pub struct CompiledTransform {
    pub field: String,
    pub pattern: Regex,
    pub replacement: String,
}

/// Compiled rules for one model, evaluated as the parser finalizes entries
#[derive(Debug, Clone, Default)]
pub struct ModelEngine {
    filters: Vec<CompiledFilter>,
    transforms: Vec<CompiledTransform>,
}

fn compile_pattern(field: &str, pattern: &str) -> SourceResult<Regex> {
    RegexBuilder::new(pattern)
        .case_insensitive(true)
        .build()
        .map_err(|e| SourceError::invalid_pattern(field, pattern, e))
}

impl ModelEngine {
    /// Compile a model's rules. An invalid pattern aborts the owning source.
    pub fn compile(model: &ModelConfig) -> SourceResult<Self> {
        let filters = model
            .filters
            .iter()
            .map(|rule| {
                Ok(CompiledFilter {
                    field: rule.field.clone(),
                    pattern: compile_pattern(&rule.field, &rule.pattern)?,
                })
            })
            .collect::<SourceResult<Vec<_>>>()?;

        let transforms = model
            .transforms
            .iter()
            .map(|rule| {
                Ok(CompiledTransform {
                    field: rule.field.clone(),
                    pattern: compile_pattern(&rule.field, &rule.pattern)?,
                    replacement: rule.replacement.clone(),
                })
            })
            .collect::<SourceResult<Vec<_>>>()?;

        Ok(Self {
            filters,
            transforms,
        })
    }

    /// Filter decision: no rules retains everything; otherwise the first
    /// rule whose target field matches retains the entry. A missing field is
    /// a non-match, not an error.
    pub fn is_retained(&self, entry: &ChannelEntry) -> bool {
        if self.filters.is_empty() {
            return true;
        }
        self.filters.iter().any(|filter| {
            entry
                .get(&filter.field)
                .is_some_and(|value| filter.pattern.is_match(value))
        })
    }

    /// Apply transformations in declared order. A rule targeting a field the
    /// entry does not carry is skipped; the entry's other fields stand.
    pub fn apply_transforms(&self, entry: &mut ChannelEntry) {
        for transform in &self.transforms {
            match entry.get(&transform.field) {
                Some(value) => {
                    let rewritten = transform
                        .pattern
                        .replace(value, transform.replacement.as_str())
                        .into_owned();
                    entry.set(transform.field.clone(), rewritten);
                }
                None => {
                    warn!(
                        "Transformation skipped: entry has no '{}' field",
                        transform.field
                    );
                }
            }
        }
    }

    /// Run the filter decision, then transforms on retained entries only
    pub fn evaluate(&self, mut entry: ChannelEntry) -> Option<ChannelEntry> {
        if !self.is_retained(&entry) {
            return None;
        }
        self.apply_transforms(&mut entry);
        Some(entry)
    }
}
