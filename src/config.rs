use super::address;
use serde::{Deserialize, Serialize};

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("{name} ({value}) must be a power of two")]
    NotPowerOfTwo { name: &'static str, value: u64 },
    #[error("{name} ({value:#x}) is not aligned to the page size ({page_size})")]
    Misaligned {
        name: &'static str,
        value: address,
        page_size: u64,
    },
    #[error("global heap {start:#x}..{end:#x} is empty")]
    EmptyHeap { start: address, end: address },
    #[error("global heap end {end:#x} overlaps local memory at {local_base:#x}")]
    HeapOverlapsLocal { end: address, local_base: address },
    #[error("global heap end {end:#x} exceeds global memory size {size:#x}")]
    HeapExceedsMemory { end: address, size: u64 },
    #[error("local memory size 2^{0} does not fit the address space")]
    LocalMemSize(u32),
    #[error("local memory {base:#x}+{size:#x} wraps around the address space")]
    LocalMemOverflow { base: address, size: u64 },
    #[error("unsupported xlen {0}")]
    Xlen(u32),
    #[error("invalid isa extension {0:?}")]
    IsaExtension(char),
    #[error("at least one cluster, core, warp and thread is required")]
    EmptyTopology,
    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),
}

/// Topology and memory map of a simulated device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Device {
    pub implementation_id: u64,
    pub num_clusters: u64,
    pub num_cores: u64,
    pub num_warps: u64,
    pub num_threads: u64,
    pub xlen: u32,
    /// Standard ISA extension letters, e.g. `"imf"`.
    pub isa_extensions: String,
    /// Custom ISA extension word, reported in the upper half of the ISA flags.
    pub misa_ext: u32,
    pub cache_block_size: u64,
    pub page_size: u64,
    pub global_mem_size: u64,
    pub global_heap_start: address,
    pub global_heap_end: address,
    pub local_mem_base: address,
    pub local_mem_log2_size: u32,
    pub startup_addr: address,
}

impl Default for Device {
    fn default() -> Self {
        Self {
            implementation_id: 0,
            num_clusters: 1,
            num_cores: 1,
            num_warps: 4,
            num_threads: 4,
            xlen: 32,
            isa_extensions: "imf".to_string(),
            misa_ext: 0,
            cache_block_size: 64,
            page_size: 4096,
            global_mem_size: 0x1_0000_0000,
            global_heap_start: 0x0001_0000,
            global_heap_end: 0x8000_0000,
            local_mem_base: 0xff00_0000,
            local_mem_log2_size: 14,
            startup_addr: 0x8000_0000,
        }
    }
}

impl Device {
    pub fn from_reader(reader: impl std::io::Read) -> Result<Self, Error> {
        let config: Self = serde_yaml::from_reader(reader)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), Error> {
        for (name, value) in [
            ("page_size", self.page_size),
            ("cache_block_size", self.cache_block_size),
        ] {
            if !value.is_power_of_two() {
                return Err(Error::NotPowerOfTwo { name, value });
            }
        }
        for (name, value) in [
            ("global_heap_start", self.global_heap_start),
            ("global_heap_end", self.global_heap_end),
            ("local_mem_base", self.local_mem_base),
        ] {
            if value % self.page_size != 0 {
                return Err(Error::Misaligned {
                    name,
                    value,
                    page_size: self.page_size,
                });
            }
        }
        if self.global_heap_start >= self.global_heap_end {
            return Err(Error::EmptyHeap {
                start: self.global_heap_start,
                end: self.global_heap_end,
            });
        }
        if self.global_heap_end > self.local_mem_base {
            return Err(Error::HeapOverlapsLocal {
                end: self.global_heap_end,
                local_base: self.local_mem_base,
            });
        }
        if self.global_heap_end > self.global_mem_size {
            return Err(Error::HeapExceedsMemory {
                end: self.global_heap_end,
                size: self.global_mem_size,
            });
        }
        if self.local_mem_log2_size >= u64::BITS {
            return Err(Error::LocalMemSize(self.local_mem_log2_size));
        }
        if self
            .local_mem_base
            .checked_add(self.local_mem_size())
            .is_none()
        {
            return Err(Error::LocalMemOverflow {
                base: self.local_mem_base,
                size: self.local_mem_size(),
            });
        }
        if !matches!(self.xlen, 32 | 64) {
            return Err(Error::Xlen(self.xlen));
        }
        if let Some(ext) = self
            .isa_extensions
            .chars()
            .find(|c| !c.is_ascii_lowercase())
        {
            return Err(Error::IsaExtension(ext));
        }
        if [
            self.num_clusters,
            self.num_cores,
            self.num_warps,
            self.num_threads,
        ]
        .contains(&0)
        {
            return Err(Error::EmptyTopology);
        }
        Ok(())
    }

    #[must_use]
    pub fn total_cores(&self) -> u64 {
        self.num_cores * self.num_clusters
    }

    /// Size of the local memory range, `0` if it does not fit in 64 bits.
    #[must_use]
    pub fn local_mem_size(&self) -> u64 {
        1u64.checked_shl(self.local_mem_log2_size).unwrap_or(0)
    }

    #[must_use]
    pub fn global_heap_size(&self) -> u64 {
        self.global_heap_end - self.global_heap_start
    }

    /// Standard extensions as a `misa` bit vector (bit 0 is `a`).
    #[must_use]
    pub fn misa_std(&self) -> u64 {
        self.isa_extensions
            .bytes()
            .filter(u8::is_ascii_lowercase)
            .fold(0, |misa, c| misa | 1 << (c - b'a'))
    }

    #[must_use]
    pub fn isa_flags(&self) -> u64 {
        let mxl = u64::from(self.xlen.trailing_zeros().saturating_sub(4));
        (u64::from(self.misa_ext) << 32) | (mxl << 30) | self.misa_std()
    }
}
