//! XOR distance calculations.
//!
//! Reference: spec.md Section 4.1 (ID and Distance)

use crate::domain::entities::{Distance, Id};

/// Calculate the XOR distance between two ids, as an unsigned 160-bit
/// integer. `xor_distance(a, b) == xor_distance(b, a)`.
pub fn xor_distance(a: &Id, b: &Id) -> Distance {
    a.distance(b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn symmetric() {
        let a = Id::from_array([0xaa; 20]);
        let b = Id::from_array([0x55; 20]);
        assert_eq!(xor_distance(&a, &b), xor_distance(&b, &a));
    }

    #[test]
    fn identity() {
        let a = Id::from_array([0x42; 20]);
        let zero = Id::zero();
        assert_eq!(xor_distance(&a, &a), xor_distance(&zero, &zero));
    }
}
