//! Write-authorization tokens for `get_peers`/`announce_peer`.
//!
//! Reference: spec.md Section 4.6 (Token Issuer)
//!
//! `token(node, skew) = SHA1(t + ip + port + secret)` where
//! `t = floor(now / 300) + skew` and the sum is computed over the full
//! 160-bit secret, not a projection of it. This construction is the
//! wire-compatible one the original deployment uses; spec.md Section 9
//! flags the summation-then-SHA1 scheme as cryptographically weak compared
//! to a keyed MAC, but preserves it rather than breaking compatibility. A
//! keyed-MAC redesign is noted there, not implemented here.

use std::net::Ipv4Addr;

use sha1::{Digest, Sha1};

use crate::domain::entities::Timestamp;

const WINDOW_SECS: u64 = 300;

/// Process-wide secret, generated once at startup and never rotated.
#[derive(Clone, Copy)]
pub struct TokenSecret([u8; 20]);

impl TokenSecret {
    pub fn new(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    pub fn generate(rng: &mut impl rand::RngCore) -> Self {
        let mut bytes = [0u8; 20];
        rng.fill_bytes(&mut bytes);
        Self(bytes)
    }

    /// Add `scalar` (`t + ip + port`) into the full 160-bit secret via
    /// carry-propagating addition, so every secret byte participates in the
    /// result rather than a lossy sum-of-bytes projection of it.
    fn wrapping_add_scalar(&self, scalar: u128) -> [u8; 20] {
        let mut out = self.0;
        let scalar_bytes = scalar.to_be_bytes();
        let mut carry = 0u16;
        for i in 0..16 {
            let sum = out[19 - i] as u16 + scalar_bytes[15 - i] as u16 + carry;
            out[19 - i] = sum as u8;
            carry = sum >> 8;
        }
        for byte in out[0..4].iter_mut().rev() {
            if carry == 0 {
                break;
            }
            let sum = *byte as u16 + carry;
            *byte = sum as u8;
            carry = sum >> 8;
        }
        out
    }
}

/// A 20-byte write-authorization token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token([u8; 20]);

impl Token {
    pub fn from_bytes(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }
}

fn time_window(now: Timestamp, skew: i64) -> i64 {
    (now.as_secs() / WINDOW_SECS) as i64 + skew
}

/// Issue a token for a querier at `addr:port`, valid for the 5-minute window
/// `t = floor(now/300) + skew`.
pub fn issue(secret: &TokenSecret, addr: Ipv4Addr, port: u16, now: Timestamp, skew: i64) -> Token {
    let t = time_window(now, skew);
    let ip = u32::from_le_bytes(addr.octets());
    let scalar = (t as i128 + ip as i128 + port as i128).max(0) as u128;
    let combined = secret.wrapping_add_scalar(scalar);
    let digest = Sha1::digest(combined);
    let mut out = [0u8; 20];
    out.copy_from_slice(&digest);
    Token(out)
}

/// Validate `token` against the current and previous 5-minute windows
/// (`skew ∈ {0, -1}`), giving 5-10 minutes of validity.
pub fn validate(secret: &TokenSecret, addr: Ipv4Addr, port: u16, now: Timestamp, token: &Token) -> bool {
    [0, -1]
        .iter()
        .any(|&skew| issue(secret, addr, port, now, skew) == *token)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secret() -> TokenSecret {
        TokenSecret::new([7u8; 20])
    }

    #[test]
    fn token_is_stable_within_window() {
        let addr = Ipv4Addr::new(10, 0, 0, 1);
        let now = Timestamp::new(1_000_000);
        let t1 = issue(&secret(), addr, 4000, now, 0);
        let t2 = issue(&secret(), addr, 4000, now.add_secs(10), 0);
        assert_eq!(t1, t2);
    }

    #[test]
    fn token_drifts_across_windows() {
        let addr = Ipv4Addr::new(10, 0, 0, 1);
        let now = Timestamp::new(1_000_000);
        let later = now.add_secs(WINDOW_SECS);
        let t1 = issue(&secret(), addr, 4000, now, 0);
        let t2 = issue(&secret(), addr, 4000, later, 0);
        assert_ne!(t1, t2);
    }

    #[test]
    fn validate_accepts_current_and_previous_window() {
        let addr = Ipv4Addr::new(10, 0, 0, 1);
        let now = Timestamp::new(1_000_000);
        let token = issue(&secret(), addr, 4000, now, 0);

        assert!(validate(&secret(), addr, 4000, now, &token));
        assert!(validate(
            &secret(),
            addr,
            4000,
            now.add_secs(WINDOW_SECS),
            &token
        ));
        assert!(!validate(
            &secret(),
            addr,
            4000,
            now.add_secs(2 * WINDOW_SECS),
            &token
        ));
    }

    #[test]
    fn validate_rejects_bad_token() {
        let addr = Ipv4Addr::new(10, 0, 0, 1);
        let now = Timestamp::new(1_000_000);
        let bad = Token::from_bytes([0u8; 20]);
        assert!(!validate(&secret(), addr, 4000, now, &bad));
    }

    #[test]
    fn validate_is_bound_to_the_querier_address() {
        let now = Timestamp::new(1_000_000);
        let token = issue(&secret(), Ipv4Addr::new(10, 0, 0, 1), 4000, now, 0);
        assert!(!validate(
            &secret(),
            Ipv4Addr::new(10, 0, 0, 2),
            4000,
            now,
            &token
        ));
    }
}
