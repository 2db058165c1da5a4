//! Device configuration registers.

use crate::config;
use strum::IntoEnumIterator;

#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("unknown configuration register {0:#05x}")]
pub struct UnknownRegister(pub u32);

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    strum::FromRepr,
    strum::EnumIter,
    strum::Display,
)]
#[repr(u32)]
pub enum Register {
    /// Low half of the kernel entry address
    StartupAddr0 = 0x001,
    /// High half of the kernel entry address
    StartupAddr1 = 0x002,
    /// Performance monitor class
    MpmClass = 0x003,
}

impl Register {
    #[must_use]
    pub fn addr(self) -> u32 {
        self as u32
    }
}

impl TryFrom<u32> for Register {
    type Error = UnknownRegister;

    fn try_from(addr: u32) -> Result<Self, Self::Error> {
        Self::from_repr(addr).ok_or(UnknownRegister(addr))
    }
}

/// Host-side copy of the configuration registers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registers {
    values: [u32; 3],
}

impl Registers {
    /// Register values loaded when a device opens.
    #[must_use]
    pub fn defaults(config: &config::Device) -> Self {
        let mut regs = Self { values: [0; 3] };
        regs.set(Register::StartupAddr0, config.startup_addr as u32);
        regs.set(Register::StartupAddr1, (config.startup_addr >> 32) as u32);
        regs.set(Register::MpmClass, 0);
        regs
    }

    fn index(reg: Register) -> usize {
        reg.addr() as usize - 1
    }

    #[must_use]
    pub fn get(&self, reg: Register) -> u32 {
        self.values[Self::index(reg)]
    }

    pub fn set(&mut self, reg: Register, value: u32) {
        self.values[Self::index(reg)] = value;
    }

    pub fn read(&self, addr: u32) -> Result<u32, UnknownRegister> {
        Ok(self.get(Register::try_from(addr)?))
    }

    /// Store `value` in the register at `addr` and return which one it was.
    pub fn write(&mut self, addr: u32, value: u32) -> Result<Register, UnknownRegister> {
        let reg = Register::try_from(addr)?;
        self.set(reg, value);
        Ok(reg)
    }

    /// Kernel entry address composed from both startup registers.
    #[must_use]
    pub fn startup_addr(&self) -> u64 {
        let lo = u64::from(self.get(Register::StartupAddr0));
        let hi = u64::from(self.get(Register::StartupAddr1));
        hi << 32 | lo
    }

    pub fn iter(&self) -> impl Iterator<Item = (Register, u32)> + '_ {
        Register::iter().map(|reg| (reg, self.get(reg)))
    }
}
