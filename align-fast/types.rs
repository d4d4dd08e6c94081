/// Corner candidate on a single pyramid level, before orientation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoredKeypoint {
    pub x: usize,
    pub y: usize,
    pub response: f32,
}

impl ScoredKeypoint {
    pub fn new(x: usize, y: usize, response: f32) -> Self {
        Self { x, y, response }
    }
}

/// Segment-test outcome for one pixel
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum CornerType {
    Bright,
    Dark,
    None,
}
