//! Include/exclude glob filters selecting which events activate a hook
//!
//! Patterns are compiled once when the hook model is built. A malformed
//! pattern is a load-time error, never a silent non-match.

use globset::{Glob, GlobSet, GlobSetBuilder};

use super::event::ExecutionEvent;

/// Errors compiling filter patterns
#[derive(Debug, thiserror::Error)]
pub enum FilterError {
    #[error("invalid filter pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: globset::Error,
    },
}

/// Why a filter accepted or rejected an event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterDecision {
    Included,
    /// An exclude pattern matched
    Excluded,
    /// The include set is non-empty and nothing in it matched
    NotIncluded,
}

impl FilterDecision {
    pub fn is_included(&self) -> bool {
        matches!(self, FilterDecision::Included)
    }
}

/// Compiled include/exclude rules
#[derive(Debug, Clone)]
pub struct Filter {
    include: GlobSet,
    exclude: GlobSet,
    include_patterns: Vec<String>,
    exclude_patterns: Vec<String>,
}

impl Default for Filter {
    fn default() -> Self {
        Self {
            include: GlobSet::empty(),
            exclude: GlobSet::empty(),
            include_patterns: Vec::new(),
            exclude_patterns: Vec::new(),
        }
    }
}

fn compile(patterns: &[String]) -> Result<GlobSet, FilterError> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = Glob::new(pattern).map_err(|source| FilterError::InvalidPattern {
            pattern: pattern.clone(),
            source,
        })?;
        builder.add(glob);
    }
    builder.build().map_err(|source| FilterError::InvalidPattern {
        pattern: patterns.join(","),
        source,
    })
}

impl Filter {
    /// Compile include and exclude pattern lists
    pub fn new<I, E, S, T>(include: I, exclude: E) -> Result<Self, FilterError>
    where
        I: IntoIterator<Item = S>,
        E: IntoIterator<Item = T>,
        S: Into<String>,
        T: Into<String>,
    {
        let include_patterns: Vec<String> = include.into_iter().map(Into::into).collect();
        let exclude_patterns: Vec<String> = exclude.into_iter().map(Into::into).collect();
        Ok(Self {
            include: compile(&include_patterns)?,
            exclude: compile(&exclude_patterns)?,
            include_patterns,
            exclude_patterns,
        })
    }

    /// Decide for an event name and optional platform tag.
    ///
    /// A pattern matches when it matches either value. Exclude wins.
    pub fn decide(&self, name: &str, platform: Option<&str>) -> FilterDecision {
        let hits = |set: &GlobSet| set.is_match(name) || platform.is_some_and(|p| set.is_match(p));

        if hits(&self.exclude) {
            return FilterDecision::Excluded;
        }
        if !self.include_patterns.is_empty() && !hits(&self.include) {
            return FilterDecision::NotIncluded;
        }
        FilterDecision::Included
    }

    /// Decide for an event
    pub fn evaluate(&self, event: &ExecutionEvent) -> FilterDecision {
        self.decide(&event.name, event.platform.as_deref())
    }

    pub fn include_patterns(&self) -> &[String] {
        &self.include_patterns
    }

    pub fn exclude_patterns(&self) -> &[String] {
        &self.exclude_patterns
    }

    /// True when the filter accepts every event
    pub fn is_empty(&self) -> bool {
        self.include_patterns.is_empty() && self.exclude_patterns.is_empty()
    }
}
