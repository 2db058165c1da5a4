//! Bit layout of the IEEE-754 interchange formats.

macro_rules! ieee_format {
    ($name:ident, $bits:ty, $exp_bits:expr, $frac_bits:expr) => {
        pub mod $name {
            pub const SIGN: $bits = 1 << ($exp_bits + $frac_bits);
            pub const EXP_MASK: $bits = ((1 << $exp_bits) - 1) << $frac_bits;
            pub const FRAC_MASK: $bits = (1 << $frac_bits) - 1;
            pub const QUIET_BIT: $bits = 1 << ($frac_bits - 1);
            pub const CANONICAL_NAN: $bits = EXP_MASK | QUIET_BIT;

            #[inline]
            #[must_use]
            pub fn is_negative(bits: $bits) -> bool {
                bits & SIGN != 0
            }

            #[inline]
            #[must_use]
            pub fn is_nan(bits: $bits) -> bool {
                bits & EXP_MASK == EXP_MASK && bits & FRAC_MASK != 0
            }

            #[inline]
            #[must_use]
            pub fn is_signaling_nan(bits: $bits) -> bool {
                is_nan(bits) && bits & QUIET_BIT == 0
            }

            /// Replace any NaN with the canonical quiet NaN.
            #[inline]
            #[must_use]
            pub fn canonicalize(bits: $bits) -> $bits {
                if is_nan(bits) {
                    CANONICAL_NAN
                } else {
                    bits
                }
            }
        }
    };
}

ieee_format!(binary32, u32, 8, 23);
ieee_format!(binary64, u64, 11, 52);
