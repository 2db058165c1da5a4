#![allow(
    clippy::missing_panics_doc,
    clippy::missing_errors_doc,
    clippy::cast_possible_truncation,
    clippy::cast_possible_wrap,
    clippy::cast_sign_loss
)]

//! Software floating-point unit.
//!
//! Scalar RISC-V F and D instruction semantics on raw IEEE-754 bit patterns.
//! Results never depend on the floating-point behavior of the host.
//!
//! Every simulated core owns one [`Context`], which plays the role of the
//! hardware `fcsr` register: it remembers the last rounding mode and
//! accumulates exception flags. Operations that take an
//! `Option<&mut ExceptionFlags>` hand over (and clear) the accumulated flags
//! when given a location, and otherwise leave them pending for the next
//! operation to observe.

pub mod arith;
pub mod class;
pub mod compare;
pub mod convert;
pub mod format;
pub mod sign;

pub use class::{fclass_d, fclass_s, FloatClass};
pub use format::{binary32, binary64};
pub use sign::{fsgnj_d, fsgnj_s, fsgnjn_d, fsgnjn_s, fsgnjx_d, fsgnjx_s};

use simple_soft_float::{FPState, StatusFlags};

bitflags::bitflags! {
    /// IEEE-754 exception flags, laid out like the RISC-V `fflags` CSR.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ExceptionFlags: u32 {
        const INEXACT = 1 << 0;
        const UNDERFLOW = 1 << 1;
        const OVERFLOW = 1 << 2;
        const DIVIDE_BY_ZERO = 1 << 3;
        const INVALID = 1 << 4;
    }
}

impl Default for ExceptionFlags {
    fn default() -> Self {
        Self::empty()
    }
}

impl From<StatusFlags> for ExceptionFlags {
    fn from(status: StatusFlags) -> Self {
        let mut flags = Self::empty();
        flags.set(Self::INEXACT, status.contains(StatusFlags::INEXACT));
        flags.set(Self::UNDERFLOW, status.contains(StatusFlags::UNDERFLOW));
        flags.set(Self::OVERFLOW, status.contains(StatusFlags::OVERFLOW));
        flags.set(
            Self::DIVIDE_BY_ZERO,
            status.contains(StatusFlags::DIVISION_BY_ZERO),
        );
        flags.set(
            Self::INVALID,
            status.contains(StatusFlags::INVALID_OPERATION),
        );
        flags
    }
}

/// Rounding mode, encoded like the RISC-V `frm` field.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum RoundingMode {
    /// Round to nearest, ties to even
    #[default]
    Rne = 0,
    /// Round towards zero
    Rtz = 1,
    /// Round down (towards negative infinity)
    Rdn = 2,
    /// Round up (towards positive infinity)
    Rup = 3,
    /// Round to nearest, ties to max magnitude
    Rmm = 4,
}

#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("invalid rounding mode {0:#05b}")]
pub struct InvalidRoundingMode(pub u32);

impl TryFrom<u32> for RoundingMode {
    type Error = InvalidRoundingMode;

    fn try_from(frm: u32) -> Result<Self, Self::Error> {
        match frm {
            0 => Ok(Self::Rne),
            1 => Ok(Self::Rtz),
            2 => Ok(Self::Rdn),
            3 => Ok(Self::Rup),
            4 => Ok(Self::Rmm),
            other => Err(InvalidRoundingMode(other)),
        }
    }
}

/// Instruction `rm` field value that selects the dynamic rounding mode.
pub const DYNAMIC_ROUNDING: u32 = 0b111;

impl From<RoundingMode> for simple_soft_float::RoundingMode {
    fn from(mode: RoundingMode) -> Self {
        match mode {
            RoundingMode::Rne => Self::TiesToEven,
            RoundingMode::Rtz => Self::TowardZero,
            RoundingMode::Rdn => Self::TowardNegative,
            RoundingMode::Rup => Self::TowardPositive,
            RoundingMode::Rmm => Self::TiesToAway,
        }
    }
}

/// Floating-point status of one simulated hardware thread.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Context {
    rounding_mode: RoundingMode,
    pending: ExceptionFlags,
}

impl Context {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Rounding mode of the most recent rounding-sensitive operation.
    #[must_use]
    pub fn rounding_mode(&self) -> RoundingMode {
        self.rounding_mode
    }

    pub fn set_rounding_mode(&mut self, mode: RoundingMode) {
        self.rounding_mode = mode;
    }

    /// Decode an instruction `rm` field.
    ///
    /// [`DYNAMIC_ROUNDING`] resolves to the current rounding mode.
    pub fn decode_rounding(&self, rm: u32) -> Result<RoundingMode, InvalidRoundingMode> {
        if rm == DYNAMIC_ROUNDING {
            Ok(self.rounding_mode)
        } else {
            RoundingMode::try_from(rm)
        }
    }

    /// Flags accumulated since they were last taken.
    #[must_use]
    pub fn pending(&self) -> ExceptionFlags {
        self.pending
    }

    pub fn take_flags(&mut self) -> ExceptionFlags {
        std::mem::take(&mut self.pending)
    }

    pub fn raise(&mut self, flags: ExceptionFlags) {
        self.pending |= flags;
    }

    fn capture(&mut self, fflags: Option<&mut ExceptionFlags>) {
        if let Some(fflags) = fflags {
            *fflags = self.take_flags();
        }
    }

    /// Run a rounding-sensitive operation under `rm`.
    pub(crate) fn with_rounding<T>(
        &mut self,
        rm: RoundingMode,
        fflags: Option<&mut ExceptionFlags>,
        op: impl FnOnce(Option<simple_soft_float::RoundingMode>, &mut FPState) -> T,
    ) -> T {
        self.rounding_mode = rm;
        let mut state = FPState::default();
        let result = op(Some(rm.into()), &mut state);
        self.raise(state.status_flags.into());
        self.capture(fflags);
        result
    }

    /// Run an operation that does not round (comparisons, min/max).
    pub(crate) fn with_flags<T>(
        &mut self,
        fflags: Option<&mut ExceptionFlags>,
        op: impl FnOnce(&mut FPState) -> T,
    ) -> T {
        let mut state = FPState::default();
        let result = op(&mut state);
        self.raise(state.status_flags.into());
        self.capture(fflags);
        result
    }

    /// Run an operation under the current rounding mode, leaving its flags pending.
    pub(crate) fn with_current_rounding<T>(
        &mut self,
        op: impl FnOnce(Option<simple_soft_float::RoundingMode>, &mut FPState) -> T,
    ) -> T {
        let mut state = FPState::default();
        let result = op(Some(self.rounding_mode.into()), &mut state);
        self.raise(state.status_flags.into());
        result
    }
}
