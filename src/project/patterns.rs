//! Include patterns selecting dependencies by name

use globset::{GlobBuilder, GlobMatcher};

use crate::project::ProjectError;

/// One or more glob patterns; a dependency matches when any pattern does.
///
/// An empty list or a `*` entry selects every dependency. Otherwise `*`
/// does not cross `/`, so `@scope/*` selects one scope.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Patterns(Vec<String>);

impl Patterns {
    /// Patterns selecting every dependency
    pub fn all() -> Self {
        Self::default()
    }

    fn selects_all(&self) -> bool {
        self.0.is_empty() || self.0.iter().any(|p| p == "*")
    }

    /// Compile into a matcher, rejecting invalid globs
    pub fn compile(&self) -> Result<PatternMatcher, ProjectError> {
        if self.selects_all() {
            return Ok(PatternMatcher { globs: None });
        }

        let globs = self
            .0
            .iter()
            .map(|pattern| {
                GlobBuilder::new(pattern)
                    .literal_separator(true)
                    .build()
                    .map(|glob| glob.compile_matcher())
                    .map_err(|source| ProjectError::InvalidPattern {
                        pattern: pattern.clone(),
                        source,
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(PatternMatcher { globs: Some(globs) })
    }

    /// Patterns matching everything any of `patterns` matches
    pub fn union<'a, I>(patterns: I) -> Self
    where
        I: IntoIterator<Item = &'a Patterns>,
    {
        let mut merged: Vec<String> = Vec::new();
        for p in patterns {
            if p.selects_all() {
                return Self::all();
            }
            for pattern in &p.0 {
                if !merged.contains(pattern) {
                    merged.push(pattern.clone());
                }
            }
        }
        Self(merged)
    }
}

impl From<&str> for Patterns {
    fn from(pattern: &str) -> Self {
        Self(vec![pattern.to_string()])
    }
}

impl From<String> for Patterns {
    fn from(pattern: String) -> Self {
        Self(vec![pattern])
    }
}

impl From<Vec<String>> for Patterns {
    fn from(patterns: Vec<String>) -> Self {
        Self(patterns)
    }
}

impl From<Vec<&str>> for Patterns {
    fn from(patterns: Vec<&str>) -> Self {
        Self(patterns.into_iter().map(str::to_string).collect())
    }
}

impl From<&[&str]> for Patterns {
    fn from(patterns: &[&str]) -> Self {
        Self(patterns.iter().map(|p| p.to_string()).collect())
    }
}

impl<const N: usize> From<[&str; N]> for Patterns {
    fn from(patterns: [&str; N]) -> Self {
        Self(patterns.iter().map(|p| p.to_string()).collect())
    }
}

/// Compiled [`Patterns`]
#[derive(Debug, Clone)]
pub struct PatternMatcher {
    /// `None` selects everything
    globs: Option<Vec<GlobMatcher>>,
}

impl PatternMatcher {
    pub fn is_match(&self, name: &str) -> bool {
        match &self.globs {
            None => true,
            Some(globs) => globs.iter().any(|glob| glob.is_match(name)),
        }
    }

    /// Names matching any pattern, in their original order
    pub fn select<'a, I>(&self, names: I) -> Vec<String>
    where
        I: IntoIterator<Item = &'a String>,
    {
        names
            .into_iter()
            .filter(|name| self.is_match(name))
            .cloned()
            .collect()
    }
}
