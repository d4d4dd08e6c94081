use align_core::{ConfigError, Keypoint, Match, MatchConfig, PointCorrespondence};
use log::{debug, warn};

use crate::error::{MatchError, MatchResult, MatchSide};

/// A projective transform has eight degrees of freedom: four point pairs
pub const MIN_CORRESPONDENCES: usize = 4;

/// Keeps the lowest-distance fraction of a match set
#[derive(Debug, Clone, Copy)]
pub struct CorrespondenceFilter {
    good_match_percent: f64,
}

impl CorrespondenceFilter {
    /// `good_match_percent` must lie in `(0, 1]`
    pub fn new(good_match_percent: f64) -> MatchResult<Self> {
        if !(good_match_percent > 0.0 && good_match_percent <= 1.0) {
            return Err(ConfigError::InvalidMatchPercent(good_match_percent).into());
        }
        Ok(Self { good_match_percent })
    }

    pub fn from_config(cfg: &MatchConfig) -> MatchResult<Self> {
        Self::new(cfg.good_match_percent)
    }

    pub fn good_match_percent(&self) -> f64 {
        self.good_match_percent
    }

    /// Number of matches kept out of `count`
    pub fn retained_count(&self, count: usize) -> usize {
        (count as f64 * self.good_match_percent).floor() as usize
    }

    /// Stable-sort by ascending distance and keep `floor(count * fraction)`.
    ///
    /// Fails with `InsufficientMatches` when fewer than
    /// `MIN_CORRESPONDENCES` survive.
    pub fn filter(&self, mut matches: Vec<Match>) -> MatchResult<Vec<Match>> {
        let total = matches.len();
        matches.sort_by_key(|m| m.distance);
        matches.truncate(self.retained_count(total));

        if matches.len() < MIN_CORRESPONDENCES {
            warn!(
                "Filter: {} of {} matches retained, need {}",
                matches.len(),
                total,
                MIN_CORRESPONDENCES
            );
            return Err(MatchError::InsufficientMatches {
                retained: matches.len(),
                required: MIN_CORRESPONDENCES,
            });
        }

        debug!("Filter: kept {} of {} matches", matches.len(), total);
        Ok(matches)
    }
}

/// Shorthand for `CorrespondenceFilter::new(good_match_percent)?.filter(matches)`
pub fn filter_matches(matches: Vec<Match>, good_match_percent: f64) -> MatchResult<Vec<Match>> {
    CorrespondenceFilter::new(good_match_percent)?.filter(matches)
}

/// Resolve matches into point pairs: `src` from `query_kps`, `dst` from `train_kps`
pub fn correspondences(
    matches: &[Match],
    query_kps: &[Keypoint],
    train_kps: &[Keypoint],
) -> MatchResult<Vec<PointCorrespondence>> {
    matches
        .iter()
        .map(|m| {
            let src = query_kps.get(m.query_idx).ok_or(MatchError::IndexOutOfRange {
                side: MatchSide::Query,
                index: m.query_idx,
                len: query_kps.len(),
            })?;
            let dst = train_kps.get(m.train_idx).ok_or(MatchError::IndexOutOfRange {
                side: MatchSide::Train,
                index: m.train_idx,
                len: train_kps.len(),
            })?;
            Ok(PointCorrespondence::new(src.position(), dst.position()))
        })
        .collect()
}
