//! 256-bit chain-work accumulation for the cash-DAA retarget.
//!
//! `bitcoin::pow::Target` gives us compact-bits encode/decode; the retarget
//! itself needs arithmetic on work values (`2^256 / (target + 1)`) that the
//! crate doesn't expose directly, so this is a small self-contained
//! fixed-width unsigned integer rather than a dependency on a generic bignum
//! crate for four operations.

use bitcoin::pow::Target;

/// A 256-bit unsigned integer, stored as four big-endian `u64` limbs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct U256([u64; 4]);

impl U256 {
    const ZERO: Self = Self([0; 4]);

    fn from_be_bytes(bytes: [u8; 32]) -> Self {
        let mut limbs = [0u64; 4];
        for (i, limb) in limbs.iter_mut().enumerate() {
            let chunk: [u8; 8] = bytes[i * 8..i * 8 + 8].try_into().expect("8-byte chunk");
            *limb = u64::from_be_bytes(chunk);
        }
        Self(limbs)
    }

    fn not(self) -> Self {
        Self([!self.0[0], !self.0[1], !self.0[2], !self.0[3]])
    }

    fn wrapping_add_one(self) -> Self {
        let mut limbs = self.0;
        for limb in limbs.iter_mut().rev() {
            let (sum, carry) = limb.overflowing_add(1);
            *limb = sum;
            if !carry {
                break;
            }
        }
        Self(limbs)
    }

    fn checked_sub(self, rhs: Self) -> Option<Self> {
        if self < rhs {
            return None;
        }
        let mut limbs = [0u64; 4];
        let mut borrow = 0i128;
        for i in (0..4).rev() {
            let diff = self.0[i] as i128 - rhs.0[i] as i128 - borrow;
            if diff < 0 {
                limbs[i] = (diff + (1i128 << 64)) as u64;
                borrow = 1;
            } else {
                limbs[i] = diff as u64;
                borrow = 0;
            }
        }
        Some(Self(limbs))
    }

    fn bit(&self, i: u32) -> bool {
        let limb = 3 - (i / 64) as usize;
        (self.0[limb] >> (i % 64)) & 1 == 1
    }

    fn shl1(&self) -> Self {
        let mut limbs = [0u64; 4];
        let mut carry = 0u64;
        for i in (0..4).rev() {
            limbs[i] = (self.0[i] << 1) | carry;
            carry = self.0[i] >> 63;
        }
        Self(limbs)
    }

    fn set_bit(mut self, i: u32) -> Self {
        let limb = 3 - (i / 64) as usize;
        self.0[limb] |= 1 << (i % 64);
        self
    }

    fn or_bit0(mut self, on: bool) -> Self {
        if on {
            self.0[3] |= 1;
        }
        self
    }

    /// Long division: `self / divisor`, schoolbook bit-by-bit.
    fn div(self, divisor: Self) -> Self {
        if divisor == Self::ZERO {
            return Self([u64::MAX; 4]);
        }
        let mut quotient = Self::ZERO;
        let mut remainder = Self::ZERO;
        for i in (0..256).rev() {
            remainder = remainder.shl1().or_bit0(self.bit(i));
            if remainder >= divisor {
                remainder = remainder.checked_sub(divisor).expect("remainder >= divisor");
                quotient = quotient.set_bit(i);
            }
        }
        quotient
    }

    fn mul_u32(self, rhs: u32) -> Self {
        let rhs = rhs as u64;
        let mut limbs = [0u64; 4];
        let mut carry = 0u128;
        for i in (0..4).rev() {
            let product = self.0[i] as u128 * rhs as u128 + carry;
            limbs[i] = product as u64;
            carry = product >> 64;
        }
        Self(limbs)
    }

    fn div_u32(self, rhs: u32) -> Self {
        let rhs = rhs as u128;
        let mut limbs = [0u64; 4];
        let mut remainder = 0u128;
        for i in 0..4 {
            let dividend = (remainder << 64) | self.0[i] as u128;
            limbs[i] = (dividend / rhs) as u64;
            remainder = dividend % rhs;
        }
        Self(limbs)
    }
}

/// Cumulative proof-of-work, the way a real header store tracks `nChainWork`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Work(U256);

impl Work {
    /// `(!target) / (target + 1) + 1`, the overflow-free way to compute
    /// `floor(2^256 / (target + 1))` within a 256-bit type.
    pub fn from_target(target: Target) -> Self {
        let target_bytes = target.to_le_bytes();
        let mut be = target_bytes;
        be.reverse();
        let target_u256 = U256::from_be_bytes(be);

        if target_u256 == U256::ZERO {
            return Self(U256([u64::MAX; 4]));
        }

        let divisor = target_u256.wrapping_add_one();
        let quotient = target_u256.not().div(divisor).wrapping_add_one();
        Self(quotient)
    }

    pub fn checked_sub(self, rhs: Self) -> Option<Self> {
        self.0.checked_sub(rhs.0).map(Self)
    }

    /// `self * numerator / denominator`, used to scale accumulated work by
    /// the clamped timespan ratio in both retarget algorithms.
    pub fn scale(self, numerator: u32, denominator: u32) -> Self {
        Self(self.0.mul_u32(numerator).div_u32(denominator))
    }

    /// `2^256 / self - 1`, clamped to `max_target`, the inverse of
    /// [`Work::from_target`] used to turn accumulated work back into a target.
    pub fn to_next_target(self, max_target: Target) -> Target {
        if self.0 == U256::ZERO {
            return max_target;
        }
        let next = self.0.not().div(self.0).wrapping_add_one();

        let max_bytes = {
            let mut le = max_target.to_le_bytes();
            le.reverse();
            U256::from_be_bytes(le)
        };

        let clamped = if next > max_bytes { max_bytes } else { next };
        let mut be = [0u8; 32];
        for (i, limb) in clamped.0.iter().enumerate() {
            be[i * 8..i * 8 + 8].copy_from_slice(&limb.to_be_bytes());
        }
        let mut le = be;
        le.reverse();
        Target::from_le_bytes(le)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn work_decreases_as_target_increases() {
        let easy = Target::from_consensus(0x1d00ffff);
        let hard = Target::from_consensus(0x1c00ffff);
        assert!(Work::from_target(hard) > Work::from_target(easy));
    }

    #[test]
    fn scale_by_one_is_identity() {
        let target = Target::from_consensus(0x1d00ffff);
        let work = Work::from_target(target);
        assert_eq!(work.scale(600, 600), work);
    }

    #[test]
    fn round_trip_through_next_target_is_close_to_original() {
        let target = Target::from_consensus(0x1d00ffff);
        let work = Work::from_target(target);
        let recovered = work.to_next_target(Target::MAX_ATTAINABLE_MAINNET);
        // Compact-bits precision loss means this is approximate, not exact.
        assert_eq!(recovered.to_compact_lossy().to_consensus() & 0xff000000, 0x1d000000);
    }
}
