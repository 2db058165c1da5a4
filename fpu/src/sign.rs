//! Sign injection. Pure bit operations, no flags, NaN payloads pass through.

use super::{binary32, binary64};

macro_rules! sign_injection {
    ($s:ident, $bits:ty, $fmt:ident) => {
        paste::paste! {
            /// Magnitude of `a` with the sign of `b`.
            #[must_use]
            pub fn [<fsgnj_ $s>](a: $bits, b: $bits) -> u64 {
                u64::from((a & !$fmt::SIGN) | (b & $fmt::SIGN))
            }

            /// Magnitude of `a` with the inverted sign of `b`.
            #[must_use]
            pub fn [<fsgnjn_ $s>](a: $bits, b: $bits) -> u64 {
                u64::from((a & !$fmt::SIGN) | (!b & $fmt::SIGN))
            }

            /// `a` with its sign xor'ed with the sign of `b`.
            #[must_use]
            pub fn [<fsgnjx_ $s>](a: $bits, b: $bits) -> u64 {
                u64::from(a ^ (b & $fmt::SIGN))
            }
        }
    };
}

sign_injection!(s, u32, binary32);
sign_injection!(d, u64, binary64);
