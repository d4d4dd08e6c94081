//! Descriptor matching and correspondence filtering.
//!
//! `BruteForceMatcher` pairs every query descriptor with its nearest train
//! descriptor under Hamming distance. `CorrespondenceFilter` keeps the best
//! fraction of those matches and refuses to hand fewer than
//! `MIN_CORRESPONDENCES` of them to the geometry stage.

pub mod error;
pub mod filter;
pub mod matcher;

pub use error::{MatchError, MatchResult, MatchSide};
pub use filter::{correspondences, filter_matches, CorrespondenceFilter, MIN_CORRESPONDENCES};
pub use matcher::BruteForceMatcher;
