//! Minimal acceptable version resolution
//!
//! A threshold says how many "rungs" (distinct values at one version depth)
//! a dependency may lag behind the newest rung at that depth. Two strategies
//! turn a threshold policy into a concrete minimal version:
//!
//! - [`Strategy::Separate`]: cascades major → minor → patch, restricting each
//!   depth to versions that share the current version's coarser components.
//!   The first depth whose candidate is newer than the current version wins;
//!   when none does, there is no minimal version.
//! - [`Strategy::Numeral`]: counts back along a single axis over the whole
//!   version history and falls back to the current version itself.

use std::fmt;
use std::str::FromStr;

use semver::Version;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::version::error::PolicyError;

/// Version depth a threshold applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Level {
    Major,
    Minor,
    Patch,
}

impl Level {
    /// Coarsest first
    pub const ALL: [Level; 3] = [Level::Major, Level::Minor, Level::Patch];

    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Major => "major",
            Level::Minor => "minor",
            Level::Patch => "patch",
        }
    }

    /// Components of `version` up to and including this depth.
    fn rung_key(&self, version: &Version) -> (u64, u64, u64) {
        match self {
            Level::Major => (version.major, 0, 0),
            Level::Minor => (version.major, version.minor, 0),
            Level::Patch => (version.major, version.minor, version.patch),
        }
    }

    /// Whether `a` and `b` agree on every component coarser than this depth.
    fn shares_coarser(&self, a: &Version, b: &Version) -> bool {
        match self {
            Level::Major => true,
            Level::Minor => a.major == b.major,
            Level::Patch => a.major == b.major && a.minor == b.minor,
        }
    }
}

/// Allowed drift per version depth; `None` means no constraint at that depth
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Thresholds {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub major: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub minor: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub patch: Option<u64>,
}

impl Thresholds {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_major(mut self, threshold: u64) -> Self {
        self.major = Some(threshold);
        self
    }

    pub fn with_minor(mut self, threshold: u64) -> Self {
        self.minor = Some(threshold);
        self
    }

    pub fn with_patch(mut self, threshold: u64) -> Self {
        self.patch = Some(threshold);
        self
    }

    pub fn get(&self, level: Level) -> Option<u64> {
        match level {
            Level::Major => self.major,
            Level::Minor => self.minor,
            Level::Patch => self.patch,
        }
    }

    /// An empty policy means "require an exact match with latest", not
    /// "allow unlimited drift".
    pub fn is_empty(&self) -> bool {
        self.major.is_none() && self.minor.is_none() && self.patch.is_none()
    }
}

/// Shared signature of both resolution strategies
pub type ResolveFn = fn(&Version, &[Version], &Thresholds) -> Result<Option<Version>, PolicyError>;

/// Selects how thresholds are turned into a minimal version
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    /// Cascading major → minor → patch resolution
    #[default]
    Separate,
    /// Single-axis countback over the whole history
    Numeral,
}

impl Strategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Strategy::Separate => "separate",
            Strategy::Numeral => "numeral",
        }
    }

    pub fn resolver(&self) -> ResolveFn {
        match self {
            Strategy::Separate => cascading_minimal,
            Strategy::Numeral => single_axis_minimal,
        }
    }

    pub fn resolve(
        &self,
        current: &Version,
        available: &[Version],
        thresholds: &Thresholds,
    ) -> Result<Option<Version>, PolicyError> {
        (self.resolver())(current, available, thresholds)
    }
}

impl FromStr for Strategy {
    type Err = PolicyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "separate" => Ok(Strategy::Separate),
            "numeral" => Ok(Strategy::Numeral),
            other => Err(PolicyError::UnknownStrategy(other.to_string())),
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A threshold policy together with the strategy that interprets it
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Policy {
    #[serde(flatten)]
    pub thresholds: Thresholds,
    pub strategy: Strategy,
}

impl Policy {
    pub fn new(thresholds: Thresholds, strategy: Strategy) -> Self {
        Self {
            thresholds,
            strategy,
        }
    }

    /// Reject policies the strategy cannot interpret, whatever the data
    pub fn validate(&self) -> Result<(), PolicyError> {
        match self.strategy {
            Strategy::Separate => Ok(()),
            Strategy::Numeral => single_axis(&self.thresholds).map(|_| ()),
        }
    }

    pub fn minimal(
        &self,
        current: &Version,
        available: &[Version],
    ) -> Result<Option<Version>, PolicyError> {
        self.strategy.resolve(current, available, &self.thresholds)
    }
}

impl From<Thresholds> for Policy {
    fn from(thresholds: Thresholds) -> Self {
        Self::new(thresholds, Strategy::default())
    }
}

/// Cascading resolution.
///
/// Returns `None` when no depth yields a candidate newer than `current`.
/// Every `Some` result is an element of `available` strictly greater than
/// `current`.
pub fn cascading_minimal(
    current: &Version,
    available: &[Version],
    thresholds: &Thresholds,
) -> Result<Option<Version>, PolicyError> {
    let sorted = ascending(available);

    for level in Level::ALL {
        let Some(threshold) = thresholds.get(level) else {
            continue;
        };

        let restricted = sorted
            .iter()
            .copied()
            .filter(|v| level.shares_coarser(current, v));
        let rungs = collect_rungs(restricted, level);

        match pick_rung(&rungs, threshold) {
            Some(candidate) if candidate > current => {
                debug!(
                    "{} threshold {} selects {} for {}",
                    level.as_str(),
                    threshold,
                    candidate,
                    current
                );
                return Ok(Some(candidate.clone()));
            }
            _ => debug!(
                "{} threshold {} yields no constraint for {}",
                level.as_str(),
                threshold,
                current
            ),
        }
    }

    Ok(None)
}

/// Single-axis countback.
///
/// At most one threshold may be non-zero. Never returns
/// `None`: when the selected rung is not newer, `current` comes back
/// unchanged.
pub fn single_axis_minimal(
    current: &Version,
    available: &[Version],
    thresholds: &Thresholds,
) -> Result<Option<Version>, PolicyError> {
    let Some((level, threshold)) = single_axis(thresholds)? else {
        return Ok(Some(current.clone()));
    };

    let sorted = ascending(available);
    let rungs = collect_rungs(sorted.iter().copied(), level);

    let minimal = match pick_rung(&rungs, threshold) {
        Some(candidate) if candidate > current => candidate.clone(),
        _ => current.clone(),
    };

    Ok(Some(minimal))
}

/// Axis and threshold of a single-axis policy, `None` when nothing is defined.
///
/// The axis is the non-zero field, or the finest defined field when all
/// defined fields are zero.
fn single_axis(thresholds: &Thresholds) -> Result<Option<(Level, u64)>, PolicyError> {
    let non_zero: Vec<(Level, u64)> = Level::ALL
        .iter()
        .filter_map(|&level| {
            thresholds
                .get(level)
                .filter(|&t| t > 0)
                .map(|t| (level, t))
        })
        .collect();

    if non_zero.len() > 1 {
        return Err(PolicyError::TooManyThresholds {
            count: non_zero.len(),
        });
    }

    Ok(non_zero.first().copied().or_else(|| {
        Level::ALL
            .iter()
            .rev()
            .find(|&&level| thresholds.get(level).is_some())
            .map(|&level| (level, 0))
    }))
}

fn ascending(available: &[Version]) -> Vec<&Version> {
    let mut sorted: Vec<&Version> = available.iter().collect();
    sorted.sort();
    sorted.dedup();
    sorted
}

/// One representative (the oldest) per distinct rung, oldest rung first.
/// Expects ascending input.
fn collect_rungs<'a>(versions: impl Iterator<Item = &'a Version>, level: Level) -> Vec<&'a Version> {
    let mut rungs: Vec<&Version> = Vec::new();
    let mut last_key = None;

    for version in versions {
        let key = level.rung_key(version);
        if last_key != Some(key) {
            rungs.push(version);
            last_key = Some(key);
        }
    }

    rungs
}

/// `threshold` rungs back from the newest, clamped to the oldest rung.
fn pick_rung<'a>(rungs: &[&'a Version], threshold: u64) -> Option<&'a Version> {
    let newest = rungs.len().checked_sub(1)?;
    let back = usize::try_from(threshold).unwrap_or(usize::MAX);
    Some(rungs[newest.saturating_sub(back)])
}
