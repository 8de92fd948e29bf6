//! Index helpers.

/// Wrap `index` into `0..len` using Euclidean remainder, so negative indices
/// count back from the end. Returns `-1` when `len` is zero.
///
/// ```
/// use arbor_fsm::cycle_index;
///
/// assert_eq!(cycle_index(3, 3), 0);
/// assert_eq!(cycle_index(-1, 3), 2);
/// assert_eq!(cycle_index(5, 0), -1);
/// ```
pub fn cycle_index(index: i64, len: usize) -> i64 {
    if len == 0 {
        return -1;
    }
    index.rem_euclid(len as i64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wraps_in_both_directions() {
        assert_eq!(cycle_index(0, 4), 0);
        assert_eq!(cycle_index(4, 4), 0);
        assert_eq!(cycle_index(9, 4), 1);
        assert_eq!(cycle_index(-4, 4), 0);
        assert_eq!(cycle_index(-5, 4), 3);
        assert_eq!(cycle_index(i64::MIN, 1), 0);
    }

    #[test]
    fn empty_length_has_no_index() {
        assert_eq!(cycle_index(0, 0), -1);
        assert_eq!(cycle_index(-7, 0), -1);
    }
}
