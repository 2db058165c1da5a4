//! Conversions between floats and integers, and between the two float widths.

use super::{binary32, binary64, Context, ExceptionFlags, RoundingMode};
use simple_soft_float::{F32, F64};

/// Value written back by an invalid float to integer conversion.
fn saturate<T>(nan: bool, negative: bool, min: T, max: T) -> T {
    if nan || !negative {
        max
    } else {
        min
    }
}

macro_rules! convert {
    ($s:ident, $float:ty, $bits:ty, $fmt:ident) => {
        paste::paste! {
            impl Context {
                /// Convert to a signed 32-bit integer, sign-extended.
                pub fn [<fcvt_w_ $s>](
                    &mut self,
                    a: $bits,
                    rm: RoundingMode,
                    fflags: Option<&mut ExceptionFlags>,
                ) -> u64 {
                    let value = <$float>::from_bits(a);
                    let r = self
                        .with_rounding(rm, fflags, |rm, st| value.to_i32(true, rm, Some(st)))
                        .unwrap_or_else(|| {
                            saturate($fmt::is_nan(a), $fmt::is_negative(a), i32::MIN, i32::MAX)
                        });
                    i64::from(r) as u64
                }

                /// Convert to an unsigned 32-bit integer, zero-extended.
                pub fn [<fcvt_wu_ $s>](
                    &mut self,
                    a: $bits,
                    rm: RoundingMode,
                    fflags: Option<&mut ExceptionFlags>,
                ) -> u64 {
                    let value = <$float>::from_bits(a);
                    let r = self
                        .with_rounding(rm, fflags, |rm, st| value.to_u32(true, rm, Some(st)))
                        .unwrap_or_else(|| {
                            saturate($fmt::is_nan(a), $fmt::is_negative(a), 0, u32::MAX)
                        });
                    u64::from(r)
                }

                pub fn [<fcvt_l_ $s>](
                    &mut self,
                    a: $bits,
                    rm: RoundingMode,
                    fflags: Option<&mut ExceptionFlags>,
                ) -> u64 {
                    let value = <$float>::from_bits(a);
                    let r = self
                        .with_rounding(rm, fflags, |rm, st| value.to_i64(true, rm, Some(st)))
                        .unwrap_or_else(|| {
                            saturate($fmt::is_nan(a), $fmt::is_negative(a), i64::MIN, i64::MAX)
                        });
                    r as u64
                }

                pub fn [<fcvt_lu_ $s>](
                    &mut self,
                    a: $bits,
                    rm: RoundingMode,
                    fflags: Option<&mut ExceptionFlags>,
                ) -> u64 {
                    let value = <$float>::from_bits(a);
                    self.with_rounding(rm, fflags, |rm, st| value.to_u64(true, rm, Some(st)))
                        .unwrap_or_else(|| {
                            saturate($fmt::is_nan(a), $fmt::is_negative(a), 0, u64::MAX)
                        })
                }

                /// Convert from a signed 32-bit integer.
                pub fn [<fcvt_ $s _w>](
                    &mut self,
                    a: u32,
                    rm: RoundingMode,
                    fflags: Option<&mut ExceptionFlags>,
                ) -> u64 {
                    let r = self.with_rounding(rm, fflags, |rm, st| {
                        <$float>::from_i32(a as i32, rm, Some(st))
                    });
                    u64::from(r.into_bits())
                }

                pub fn [<fcvt_ $s _wu>](
                    &mut self,
                    a: u32,
                    rm: RoundingMode,
                    fflags: Option<&mut ExceptionFlags>,
                ) -> u64 {
                    let r = self.with_rounding(rm, fflags, |rm, st| {
                        <$float>::from_u32(a, rm, Some(st))
                    });
                    u64::from(r.into_bits())
                }

                pub fn [<fcvt_ $s _l>](
                    &mut self,
                    a: u64,
                    rm: RoundingMode,
                    fflags: Option<&mut ExceptionFlags>,
                ) -> u64 {
                    let r = self.with_rounding(rm, fflags, |rm, st| {
                        <$float>::from_i64(a as i64, rm, Some(st))
                    });
                    u64::from(r.into_bits())
                }

                pub fn [<fcvt_ $s _lu>](
                    &mut self,
                    a: u64,
                    rm: RoundingMode,
                    fflags: Option<&mut ExceptionFlags>,
                ) -> u64 {
                    let r = self.with_rounding(rm, fflags, |rm, st| {
                        <$float>::from_u64(a, rm, Some(st))
                    });
                    u64::from(r.into_bits())
                }
            }
        }
    };
}

convert!(s, F32, u32, binary32);
convert!(d, F64, u64, binary64);

impl Context {
    /// Narrow binary64 to binary32.
    ///
    /// Rounds with the current rounding mode, flags stay pending.
    pub fn fcvt_s_d(&mut self, a: u64) -> u64 {
        let value = F64::from_bits(a);
        let r: F32 =
            self.with_current_rounding(|rm, st| F32::convert_from_float(&value, rm, Some(st)));
        u64::from(binary32::canonicalize(r.into_bits()))
    }

    /// Widen binary32 to binary64 (always exact), flags stay pending.
    pub fn fcvt_d_s(&mut self, a: u32) -> u64 {
        let value = F32::from_bits(a);
        let r: F64 =
            self.with_current_rounding(|rm, st| F64::convert_from_float(&value, rm, Some(st)));
        binary64::canonicalize(r.into_bits())
    }
}
