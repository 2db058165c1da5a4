//! Device capability queries.

use crate::{config, dcr::Registers};

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    strum::FromRepr,
    strum::EnumIter,
    strum::Display,
)]
#[repr(u32)]
pub enum Capability {
    Version = 0,
    NumThreads = 1,
    NumWarps = 2,
    NumCores = 3,
    CacheLineSize = 4,
    GlobalMemSize = 5,
    LocalMemSize = 6,
    KernelBaseAddr = 7,
    IsaFlags = 8,
    LocalMemAddr = 9,
}

impl Capability {
    /// Capability for a raw id.
    ///
    /// An unknown id is an integration bug and aborts the process.
    #[must_use]
    pub fn from_id(id: u32) -> Self {
        match Self::from_repr(id) {
            Some(cap) => cap,
            None => {
                log::error!("invalid capability id: {id}");
                std::process::abort();
            }
        }
    }

    #[must_use]
    pub fn query(self, config: &config::Device, regs: &Registers) -> u64 {
        match self {
            Self::Version => config.implementation_id,
            Self::NumThreads => config.num_threads,
            Self::NumWarps => config.num_warps,
            Self::NumCores => config.total_cores(),
            Self::CacheLineSize => config.cache_block_size,
            Self::GlobalMemSize => config.global_mem_size,
            Self::LocalMemSize => config.local_mem_size(),
            Self::KernelBaseAddr => regs.startup_addr(),
            Self::IsaFlags => config.isa_flags(),
            Self::LocalMemAddr => config.local_mem_base,
        }
    }
}
