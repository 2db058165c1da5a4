//! `fclass`.

use super::{binary32, binary64};

bitflags::bitflags! {
    /// One-hot classification mask returned by `fclass`.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct FloatClass: u64 {
        const NEG_INFINITY = 1 << 0;
        const NEG_NORMAL = 1 << 1;
        const NEG_SUBNORMAL = 1 << 2;
        const NEG_ZERO = 1 << 3;
        const POS_ZERO = 1 << 4;
        const POS_SUBNORMAL = 1 << 5;
        const POS_NORMAL = 1 << 6;
        const POS_INFINITY = 1 << 7;
        const SIGNALING_NAN = 1 << 8;
        const QUIET_NAN = 1 << 9;
    }
}

macro_rules! classify {
    ($name:ident, $bits:ty, $fmt:ident) => {
        #[must_use]
        pub fn $name(a: $bits) -> u64 {
            use $fmt::{EXP_MASK, FRAC_MASK, QUIET_BIT};

            let negative = $fmt::is_negative(a);
            let exp = a & EXP_MASK;
            let frac = a & FRAC_MASK;
            let class = if exp == EXP_MASK {
                if frac == 0 {
                    if negative {
                        FloatClass::NEG_INFINITY
                    } else {
                        FloatClass::POS_INFINITY
                    }
                } else if frac & QUIET_BIT != 0 {
                    FloatClass::QUIET_NAN
                } else {
                    FloatClass::SIGNALING_NAN
                }
            } else if exp == 0 {
                match (frac == 0, negative) {
                    (true, true) => FloatClass::NEG_ZERO,
                    (true, false) => FloatClass::POS_ZERO,
                    (false, true) => FloatClass::NEG_SUBNORMAL,
                    (false, false) => FloatClass::POS_SUBNORMAL,
                }
            } else if negative {
                FloatClass::NEG_NORMAL
            } else {
                FloatClass::POS_NORMAL
            };
            class.bits()
        }
    };
}

classify!(fclass_s, u32, binary32);
classify!(fclass_d, u64, binary64);
