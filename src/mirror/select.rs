use std::time::Duration;

use thiserror::Error;

use super::{Mirror, ProbeOutcome};

/// Latency reported for a mirror that failed its probe. Larger than any
/// timeout-bounded measurement, and never used in the comparison itself.
pub const UNREACHABLE_LATENCY: Duration = Duration::MAX;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("no mirror is reachable; offline mode is enabled")]
pub struct Offline;

/// Picks the lowest-latency reachable mirror. Ties go to the earlier entry.
pub fn select_best<'a>(candidates: &[(&'a Mirror, &ProbeOutcome)]) -> Result<&'a Mirror, Offline> {
    select_position(candidates)
        .map(|position| candidates[position].0)
        .ok_or(Offline)
}

pub(super) fn select_position(candidates: &[(&Mirror, &ProbeOutcome)]) -> Option<usize> {
    candidates
        .iter()
        .enumerate()
        .filter(|(_, (mirror, _))| mirror.enabled && !mirror.is_auto())
        .filter_map(|(position, (_, outcome))| match outcome {
            ProbeOutcome::Reachable(latency) => Some((position, *latency)),
            ProbeOutcome::Unreachable(_) => None,
        })
        // min_by_key keeps the first of equal elements
        .min_by_key(|(_, latency)| *latency)
        .map(|(position, _)| position)
}
