/// 256-bit binary descriptor = 32 bytes
pub const DESCRIPTOR_SIZE: usize = 32;
pub const DESCRIPTOR_BITS: usize = DESCRIPTOR_SIZE * 8;

pub type Descriptor = [u8; DESCRIPTOR_SIZE];

/// Key-point ≙ FAST corner + orientation (radians) with subpixel precision.
///
/// Coordinates are always expressed in the base (full resolution) image,
/// whatever pyramid level the corner was found on.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Keypoint {
    pub x: f32,
    pub y: f32,
    /// Diameter of the support region in base-image pixels
    pub scale: f32,
    pub angle: f32,
    pub response: f32,
    pub octave: usize,
}

impl Keypoint {
    pub fn position(&self) -> (f64, f64) {
        (self.x as f64, self.y as f64)
    }
}

/// Nearest-neighbour correspondence between two descriptor sets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Match {
    /// Index into the first (query / source) keypoint sequence
    pub query_idx: usize,
    /// Index into the second (train / target) keypoint sequence
    pub train_idx: usize,
    pub distance: u32,
}

impl Match {
    pub fn new(query_idx: usize, train_idx: usize, distance: u32) -> Self {
        Self {
            query_idx,
            train_idx,
            distance,
        }
    }
}

/// Point pair extracted from a retained match: `src` in image A, `dst` in image B
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointCorrespondence {
    pub src: (f64, f64),
    pub dst: (f64, f64),
}

impl PointCorrespondence {
    pub fn new(src: (f64, f64), dst: (f64, f64)) -> Self {
        Self { src, dst }
    }
}

/// Number of differing bits between two descriptors
#[inline]
pub fn hamming_distance(a: &Descriptor, b: &Descriptor) -> u32 {
    a.iter().zip(b.iter()).map(|(x, y)| (x ^ y).count_ones()).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_hamming_identical() {
        let d = [0xA5u8; DESCRIPTOR_SIZE];
        assert_eq!(hamming_distance(&d, &d), 0);
    }

    #[test]
    fn test_hamming_complement() {
        let a = [0x00u8; DESCRIPTOR_SIZE];
        let b = [0xFFu8; DESCRIPTOR_SIZE];
        assert_eq!(hamming_distance(&a, &b), DESCRIPTOR_BITS as u32);
    }

    #[test]
    fn test_hamming_single_bit() {
        let a = [0u8; DESCRIPTOR_SIZE];
        let mut b = a;
        b[17] = 0b0001_0000;
        assert_eq!(hamming_distance(&a, &b), 1);
    }

    proptest! {
        #[test]
        fn hamming_is_a_metric(
            a in prop::array::uniform32(any::<u8>()),
            b in prop::array::uniform32(any::<u8>()),
            c in prop::array::uniform32(any::<u8>()),
        ) {
            prop_assert_eq!(hamming_distance(&a, &b), hamming_distance(&b, &a));
            prop_assert!(hamming_distance(&a, &c) <= hamming_distance(&a, &b) + hamming_distance(&b, &c));
            prop_assert!(hamming_distance(&a, &b) <= DESCRIPTOR_BITS as u32);
        }
    }
}
