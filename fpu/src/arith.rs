//! Rounded arithmetic: add, sub, mul, div, sqrt and the fused multiply-add family.

use super::{binary32, binary64, Context, ExceptionFlags, RoundingMode};
use simple_soft_float::{F32, F64};

macro_rules! arith {
    ($s:ident, $float:ty, $bits:ty, $fmt:ident) => {
        paste::paste! {
            impl Context {
                pub fn [<fadd_ $s>](
                    &mut self,
                    a: $bits,
                    b: $bits,
                    rm: RoundingMode,
                    fflags: Option<&mut ExceptionFlags>,
                ) -> u64 {
                    let (a, b) = (<$float>::from_bits(a), <$float>::from_bits(b));
                    let r = self.with_rounding(rm, fflags, |rm, st| a.add(&b, rm, Some(st)));
                    u64::from($fmt::canonicalize(r.into_bits()))
                }

                pub fn [<fsub_ $s>](
                    &mut self,
                    a: $bits,
                    b: $bits,
                    rm: RoundingMode,
                    fflags: Option<&mut ExceptionFlags>,
                ) -> u64 {
                    let (a, b) = (<$float>::from_bits(a), <$float>::from_bits(b));
                    let r = self.with_rounding(rm, fflags, |rm, st| a.sub(&b, rm, Some(st)));
                    u64::from($fmt::canonicalize(r.into_bits()))
                }

                pub fn [<fmul_ $s>](
                    &mut self,
                    a: $bits,
                    b: $bits,
                    rm: RoundingMode,
                    fflags: Option<&mut ExceptionFlags>,
                ) -> u64 {
                    let (a, b) = (<$float>::from_bits(a), <$float>::from_bits(b));
                    let r = self.with_rounding(rm, fflags, |rm, st| a.mul(&b, rm, Some(st)));
                    u64::from($fmt::canonicalize(r.into_bits()))
                }

                pub fn [<fdiv_ $s>](
                    &mut self,
                    a: $bits,
                    b: $bits,
                    rm: RoundingMode,
                    fflags: Option<&mut ExceptionFlags>,
                ) -> u64 {
                    let (a, b) = (<$float>::from_bits(a), <$float>::from_bits(b));
                    let r = self.with_rounding(rm, fflags, |rm, st| a.div(&b, rm, Some(st)));
                    u64::from($fmt::canonicalize(r.into_bits()))
                }

                pub fn [<fsqrt_ $s>](
                    &mut self,
                    a: $bits,
                    rm: RoundingMode,
                    fflags: Option<&mut ExceptionFlags>,
                ) -> u64 {
                    let a = <$float>::from_bits(a);
                    let r = self.with_rounding(rm, fflags, |rm, st| a.sqrt(rm, Some(st)));
                    u64::from($fmt::canonicalize(r.into_bits()))
                }

                /// `a * b + c` with a single rounding.
                pub fn [<fmadd_ $s>](
                    &mut self,
                    a: $bits,
                    b: $bits,
                    c: $bits,
                    rm: RoundingMode,
                    fflags: Option<&mut ExceptionFlags>,
                ) -> u64 {
                    let (a, b, c) = (
                        <$float>::from_bits(a),
                        <$float>::from_bits(b),
                        <$float>::from_bits(c),
                    );
                    let r = self.with_rounding(rm, fflags, |rm, st| {
                        a.fused_mul_add(&b, &c, rm, Some(st))
                    });
                    u64::from($fmt::canonicalize(r.into_bits()))
                }

                /// `a * b - c`
                pub fn [<fmsub_ $s>](
                    &mut self,
                    a: $bits,
                    b: $bits,
                    c: $bits,
                    rm: RoundingMode,
                    fflags: Option<&mut ExceptionFlags>,
                ) -> u64 {
                    self.[<fmadd_ $s>](a, b, c ^ $fmt::SIGN, rm, fflags)
                }

                /// `-(a * b) - c`
                pub fn [<fnmadd_ $s>](
                    &mut self,
                    a: $bits,
                    b: $bits,
                    c: $bits,
                    rm: RoundingMode,
                    fflags: Option<&mut ExceptionFlags>,
                ) -> u64 {
                    self.[<fmadd_ $s>](a ^ $fmt::SIGN, b, c ^ $fmt::SIGN, rm, fflags)
                }

                /// `-(a * b) + c`
                pub fn [<fnmsub_ $s>](
                    &mut self,
                    a: $bits,
                    b: $bits,
                    c: $bits,
                    rm: RoundingMode,
                    fflags: Option<&mut ExceptionFlags>,
                ) -> u64 {
                    self.[<fmadd_ $s>](a ^ $fmt::SIGN, b, c, rm, fflags)
                }
            }
        }
    };
}

arith!(s, F32, u32, binary32);
arith!(d, F64, u64, binary64);
