use align_core::{hamming_distance, Descriptor, Match, MatchConfig};
use log::debug;
use rayon::prelude::*;

/// Exhaustive nearest-neighbour matcher for binary descriptors
#[derive(Debug, Clone, Copy, Default)]
pub struct BruteForceMatcher {
    cross_check: bool,
}

impl BruteForceMatcher {
    pub fn new(cross_check: bool) -> Self {
        Self { cross_check }
    }

    pub fn from_config(cfg: &MatchConfig) -> Self {
        Self::new(cfg.cross_check)
    }

    pub fn cross_check(&self) -> bool {
        self.cross_check
    }

    /// One match per query descriptor, in query order.
    ///
    /// Each query is paired with its nearest train descriptor; equal
    /// distances resolve to the lowest train index. With cross-checking
    /// enabled, a pair survives only if the query is also the nearest
    /// neighbour of its train descriptor. Either side empty yields no
    /// matches.
    pub fn match_descriptors(&self, query: &[Descriptor], train: &[Descriptor]) -> Vec<Match> {
        if query.is_empty() || train.is_empty() {
            return Vec::new();
        }

        let forward: Vec<Match> = query
            .par_iter()
            .enumerate()
            .filter_map(|(qi, q)| Self::nearest(q, train).map(|(ti, d)| Match::new(qi, ti, d)))
            .collect();

        let matches = if self.cross_check {
            let backward: Vec<Option<(usize, u32)>> = train.par_iter().map(|t| Self::nearest(t, query)).collect();
            forward
                .into_iter()
                .filter(|m| matches!(backward[m.train_idx], Some((qi, _)) if qi == m.query_idx))
                .collect()
        } else {
            forward
        };

        debug!(
            "Matcher: {} x {} descriptors -> {} matches (cross_check={})",
            query.len(),
            train.len(),
            matches.len(),
            self.cross_check
        );
        matches
    }

    /// Index and distance of the nearest descriptor in `set`; first wins on ties
    pub fn nearest(d: &Descriptor, set: &[Descriptor]) -> Option<(usize, u32)> {
        let mut best: Option<(usize, u32)> = None;
        for (i, other) in set.iter().enumerate() {
            let dist = hamming_distance(d, other);
            match best {
                Some((_, best_dist)) if dist >= best_dist => {}
                _ => {
                    best = Some((i, dist));
                    if dist == 0 {
                        break;
                    }
                }
            }
        }
        best
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use align_core::DESCRIPTOR_SIZE;
    use proptest::prelude::*;

    fn desc(fill: u8) -> Descriptor {
        [fill; DESCRIPTOR_SIZE]
    }

    /// Descriptor with the first `bits` bits set
    fn with_bits(bits: usize) -> Descriptor {
        let mut d = [0u8; DESCRIPTOR_SIZE];
        for i in 0..bits {
            d[i / 8] |= 1 << (i % 8);
        }
        d
    }

    #[test]
    fn test_empty_inputs() {
        let m = BruteForceMatcher::default();
        assert!(m.match_descriptors(&[], &[desc(0)]).is_empty());
        assert!(m.match_descriptors(&[desc(0)], &[]).is_empty());
    }

    #[test]
    fn test_nearest_neighbour() {
        let query = vec![with_bits(0), with_bits(100)];
        let train = vec![with_bits(90), with_bits(3), with_bits(256)];
        let matches = BruteForceMatcher::default().match_descriptors(&query, &train);
        assert_eq!(matches, vec![Match::new(0, 1, 3), Match::new(1, 0, 10)]);
    }

    #[test]
    fn test_ties_go_to_lowest_train_index() {
        let query = vec![with_bits(10)];
        let train = vec![with_bits(20), with_bits(0), with_bits(20)];
        // |10 - 20| == |10 - 0|: index 0 comes first
        let matches = BruteForceMatcher::default().match_descriptors(&query, &train);
        assert_eq!(matches, vec![Match::new(0, 0, 10)]);
    }

    #[test]
    fn test_many_queries_may_share_a_train() {
        let query = vec![with_bits(1), with_bits(2), with_bits(3)];
        let train = vec![with_bits(0), with_bits(200)];
        let matches = BruteForceMatcher::default().match_descriptors(&query, &train);
        assert_eq!(matches.len(), 3);
        assert!(matches.iter().all(|m| m.train_idx == 0));
    }

    #[test]
    fn test_cross_check_keeps_mutual_pairs_only() {
        let query = vec![with_bits(1), with_bits(2), with_bits(199)];
        let train = vec![with_bits(0), with_bits(200)];
        let matches = BruteForceMatcher::new(true).match_descriptors(&query, &train);
        assert_eq!(matches, vec![Match::new(0, 0, 1), Match::new(2, 1, 1)]);
    }

    proptest! {
        #[test]
        fn matches_are_true_nearest(
            query in prop::collection::vec(prop::array::uniform32(any::<u8>()), 1..20),
            train in prop::collection::vec(prop::array::uniform32(any::<u8>()), 1..20),
        ) {
            let matches = BruteForceMatcher::default().match_descriptors(&query, &train);
            prop_assert_eq!(matches.len(), query.len());
            for (qi, m) in matches.iter().enumerate() {
                prop_assert_eq!(m.query_idx, qi);
                prop_assert_eq!(m.distance, hamming_distance(&query[qi], &train[m.train_idx]));
                for (ti, t) in train.iter().enumerate() {
                    let d = hamming_distance(&query[qi], t);
                    prop_assert!(d > m.distance || (d == m.distance && ti >= m.train_idx));
                }
            }
        }
    }
}
