//! Comparisons and min/max.
//!
//! `flt`/`fle` are signaling comparisons (any NaN raises invalid), `feq` is
//! quiet (only signaling NaNs raise invalid).

use super::{binary32, binary64, Context, ExceptionFlags};
use simple_soft_float::{F32, F64};
use std::cmp::Ordering;

macro_rules! compare {
    ($s:ident, $float:ty, $bits:ty, $fmt:ident) => {
        paste::paste! {
            impl Context {
                pub fn [<flt_ $s>](
                    &mut self,
                    a: $bits,
                    b: $bits,
                    fflags: Option<&mut ExceptionFlags>,
                ) -> u64 {
                    let (a, b) = (<$float>::from_bits(a), <$float>::from_bits(b));
                    let ord = self.with_flags(fflags, |st| a.compare_signaling(&b, Some(st)));
                    u64::from(ord == Some(Ordering::Less))
                }

                pub fn [<fle_ $s>](
                    &mut self,
                    a: $bits,
                    b: $bits,
                    fflags: Option<&mut ExceptionFlags>,
                ) -> u64 {
                    let (a, b) = (<$float>::from_bits(a), <$float>::from_bits(b));
                    let ord = self.with_flags(fflags, |st| a.compare_signaling(&b, Some(st)));
                    u64::from(matches!(ord, Some(Ordering::Less | Ordering::Equal)))
                }

                pub fn [<feq_ $s>](
                    &mut self,
                    a: $bits,
                    b: $bits,
                    fflags: Option<&mut ExceptionFlags>,
                ) -> u64 {
                    let (a, b) = (<$float>::from_bits(a), <$float>::from_bits(b));
                    let ord = self.with_flags(fflags, |st| a.compare_quiet(&b, Some(st)));
                    u64::from(ord == Some(Ordering::Equal))
                }

                /// Minimum. A single NaN operand yields the other operand,
                /// two NaNs yield the canonical NaN, and `-0` is less than `+0`.
                pub fn [<fmin_ $s>](
                    &mut self,
                    a: $bits,
                    b: $bits,
                    fflags: Option<&mut ExceptionFlags>,
                ) -> u64 {
                    let r = self.with_flags(fflags, |st| {
                        if $fmt::is_nan(a) && $fmt::is_nan(b) {
                            return $fmt::CANONICAL_NAN;
                        }
                        let (fa, fb) = (<$float>::from_bits(a), <$float>::from_bits(b));
                        let less = fa.compare_quiet(&fb, Some(&mut *st)) == Some(Ordering::Less);
                        if less
                            || (fa.compare_quiet(&fb, Some(&mut *st)) == Some(Ordering::Equal)
                                && $fmt::is_negative(a))
                            || $fmt::is_nan(b)
                        {
                            a
                        } else {
                            b
                        }
                    });
                    u64::from(r)
                }

                /// Maximum. A single NaN operand yields the other operand,
                /// two NaNs yield the canonical NaN, and `+0` is greater than `-0`.
                pub fn [<fmax_ $s>](
                    &mut self,
                    a: $bits,
                    b: $bits,
                    fflags: Option<&mut ExceptionFlags>,
                ) -> u64 {
                    let r = self.with_flags(fflags, |st| {
                        if $fmt::is_nan(a) && $fmt::is_nan(b) {
                            return $fmt::CANONICAL_NAN;
                        }
                        let (fa, fb) = (<$float>::from_bits(a), <$float>::from_bits(b));
                        let greater = fb.compare_quiet(&fa, Some(&mut *st)) == Some(Ordering::Less);
                        if greater
                            || (fb.compare_quiet(&fa, Some(&mut *st)) == Some(Ordering::Equal)
                                && $fmt::is_negative(b))
                            || $fmt::is_nan(b)
                        {
                            a
                        } else {
                            b
                        }
                    });
                    u64::from(r)
                }
            }
        }
    };
}

compare!(s, F32, u32, binary32);
compare!(d, F64, u64, binary64);
