/// Bit helpers for the FAST segment test.
///
/// Circle pixel `i` maps to bit `i` of a `u16`; the circle wraps, so bit 15
/// is adjacent to bit 0.

/// Rotate-and-AND test for a run of at least `min_count` set bits on the circle
pub fn has_contiguous_arc(mask: u16, min_count: usize) -> bool {
    if min_count == 0 || min_count > 16 {
        return false;
    }
    if mask == u16::MAX {
        return true;
    }

    let mut run = mask;
    for i in 1..min_count {
        run &= mask.rotate_left(i as u32);
        if run == 0 {
            return false;
        }
    }

    run != 0
}
