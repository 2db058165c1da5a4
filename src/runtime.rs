use crate::{
    address,
    allocation::{self, Allocator},
    caps::Capability,
    config,
    dcr::{self, Registers},
    mem::{self, Ram},
    processor::{self, Processor},
    run::Run,
    sync::{Arc, Mutex},
};
use std::time::Duration;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("invalid device configuration")]
    Config(#[from] config::Error),
    #[error(transparent)]
    Allocation(#[from] allocation::Error),
    #[error(transparent)]
    UnknownRegister(#[from] dcr::UnknownRegister),
    #[error("invalid memory space {0}")]
    InvalidMemorySpace(u32),
    #[error("transfer of {size} bytes at {addr:#x} exceeds global memory ({limit:#x})")]
    OutOfBounds { addr: address, size: u64, limit: u64 },
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),
    #[error("failed to start run")]
    Spawn(#[source] std::io::Error),
}

impl Error {
    /// Status reported across the C ABI, which has a single failure code.
    #[must_use]
    pub fn status(&self) -> i32 {
        -1
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::FromRepr, strum::Display)]
#[repr(u32)]
pub enum MemorySpace {
    Global = 0,
    Local = 1,
}

impl TryFrom<u32> for MemorySpace {
    type Error = Error;

    fn try_from(kind: u32) -> Result<Self, Self::Error> {
        Self::from_repr(kind).ok_or(Error::InvalidMemorySpace(kind))
    }
}

/// Free and used bytes of one address space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MemInfo {
    pub free: u64,
    pub used: u64,
}

/// Polling interval of [`Device::wait`].
pub const WAIT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// A simulated accelerator.
pub struct Device {
    config: config::Device,
    ram: Arc<Mutex<Ram>>,
    global_mem: Allocator,
    local_mem: Allocator,
    regs: Registers,
    processor: Arc<Mutex<Box<dyn Processor>>>,
    run: Option<Run>,
    num_runs: usize,
}

impl std::fmt::Debug for Device {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Device")
            .field("config", &self.config)
            .field("global_mem", &self.global_mem)
            .field("local_mem", &self.local_mem)
            .field("regs", &self.regs)
            .field("run", &self.run)
            .finish_non_exhaustive()
    }
}

impl Device {
    /// Open a device with the default configuration and no cores.
    pub fn open() -> Result<Self, Error> {
        Self::with_processor(config::Device::default(), processor::Idle::default())
    }

    pub fn with_processor(
        config: config::Device,
        processor: impl Processor + 'static,
    ) -> Result<Self, Error> {
        config.validate()?;
        let global_mem = Allocator::new(
            config.global_heap_start,
            config.global_heap_size(),
            config.page_size,
            config.cache_block_size,
        );
        let local_mem = Allocator::new(
            config.local_mem_base,
            config.local_mem_size(),
            config.page_size,
            1,
        );
        let regs = Registers::defaults(&config);
        let mut processor: Box<dyn Processor> = Box::new(processor);
        for (reg, value) in regs.iter() {
            processor.write_dcr(reg.addr(), value);
        }
        log::debug!(
            "opened device: {} cores, {} warps, {} threads",
            config.total_cores(),
            config.num_warps,
            config.num_threads
        );
        Ok(Self {
            config,
            ram: Arc::new(Mutex::new(Ram::new())),
            global_mem,
            local_mem,
            regs,
            processor: Arc::new(Mutex::new(processor)),
            run: None,
            num_runs: 0,
        })
    }

    /// Close the device, blocking until the last run completed.
    pub fn close(mut self) {
        self.drain();
        log::debug!("closed device after {} runs", self.num_runs);
    }

    #[must_use]
    pub fn config(&self) -> &config::Device {
        &self.config
    }

    #[must_use]
    pub fn caps(&self, cap: Capability) -> u64 {
        cap.query(&self.config, &self.regs)
    }

    /// Query a capability by raw id, aborting the process on an unknown id.
    #[must_use]
    pub fn caps_raw(&self, id: u32) -> u64 {
        self.caps(Capability::from_id(id))
    }

    fn allocator(&self, space: MemorySpace) -> &Allocator {
        match space {
            MemorySpace::Global => &self.global_mem,
            MemorySpace::Local => &self.local_mem,
        }
    }

    pub fn mem_alloc(&mut self, size: u64, space: MemorySpace) -> Result<address, Error> {
        if size == 0 {
            return Err(Error::InvalidArgument("zero size allocation"));
        }
        let allocator = match space {
            MemorySpace::Global => &mut self.global_mem,
            MemorySpace::Local => &mut self.local_mem,
        };
        let addr = allocator.allocate(size)?;
        log::trace!("{space} alloc of {size} bytes at {addr:#x}");
        Ok(addr)
    }

    /// Release the region starting at `addr`. Freeing address zero does nothing.
    ///
    /// Addresses at or above the local memory base belong to local memory,
    /// everything below to global memory.
    pub fn mem_free(&mut self, addr: address) -> Result<(), Error> {
        if addr == 0 {
            return Ok(());
        }
        if addr >= self.config.local_mem_base {
            self.local_mem.release(addr)?;
        } else {
            self.global_mem.release(addr)?;
        }
        Ok(())
    }

    /// Bytes of device memory backed by host pages.
    #[must_use]
    pub fn resident_bytes(&self) -> u64 {
        self.ram.lock().num_pages() as u64 * mem::PAGE_SIZE
    }

    #[must_use]
    pub fn mem_info(&self, space: MemorySpace) -> MemInfo {
        let allocator = self.allocator(space);
        MemInfo {
            free: allocator.free(),
            used: allocator.allocated(),
        }
    }

    /// Bounds check a transfer, using its size rounded up to whole cache blocks.
    fn check_bounds(&self, addr: address, size: u64) -> Result<(), Error> {
        let limit = self.config.global_mem_size;
        let end = size
            .checked_next_multiple_of(self.config.cache_block_size)
            .and_then(|aligned| addr.checked_add(aligned));
        match end {
            Some(end) if end <= limit => Ok(()),
            _ => Err(Error::OutOfBounds { addr, size, limit }),
        }
    }

    pub fn upload(&mut self, dest: address, src: &[u8]) -> Result<(), Error> {
        self.check_bounds(dest, src.len() as u64)?;
        log::trace!("upload {} bytes to {dest:#x}", src.len());
        self.ram.lock().write(dest, src);
        Ok(())
    }

    pub fn download(&self, dest: &mut [u8], src: address) -> Result<(), Error> {
        self.check_bounds(src, dest.len() as u64)?;
        log::trace!("download {} bytes from {src:#x}", dest.len());
        self.ram.lock().read(src, dest);
        Ok(())
    }

    /// Write a program image to the kernel base address.
    pub fn upload_kernel_bytes(&mut self, image: &[u8]) -> Result<(), Error> {
        if image.is_empty() {
            return Err(Error::InvalidArgument("empty kernel image"));
        }
        let base = self.caps(Capability::KernelBaseAddr);
        self.upload(base, image)
    }

    /// Block until the in-flight run (if any) completed.
    fn drain(&mut self) {
        if let Some(run) = &mut self.run {
            run.wait();
        }
    }

    /// Launch a new run, after the previous one completed.
    pub fn start(&mut self) -> Result<(), Error> {
        self.drain();
        let id = self.num_runs;
        let ram = Arc::clone(&self.ram);
        let processor = Arc::clone(&self.processor);
        // replacing the previous run only drops a completed handle
        let run = Run::spawn(id, move || processor.lock().run(&ram)).map_err(Error::Spawn)?;
        self.run = Some(run);
        self.num_runs += 1;
        Ok(())
    }

    /// Wait up to `timeout_ms` milliseconds for the current run.
    ///
    /// Completion is polled once per second. Running out of time is not an
    /// error: the run keeps going and callers check [`Device::is_running`].
    pub fn wait(&mut self, timeout_ms: u64) -> Result<(), Error> {
        let Some(run) = &mut self.run else {
            return Ok(());
        };
        let mut remaining = timeout_ms / 1000;
        loop {
            if run.join(WAIT_POLL_INTERVAL) {
                break;
            }
            if remaining == 0 {
                log::warn!("run {} still running after {timeout_ms} ms", run.id());
                break;
            }
            remaining -= 1;
        }
        Ok(())
    }

    #[must_use]
    pub fn is_running(&mut self) -> bool {
        self.run.as_mut().is_some_and(Run::is_running)
    }

    /// Error of the last run, once it completed unsuccessfully.
    #[must_use]
    pub fn last_run_failure(&self) -> Option<&str> {
        self.run.as_ref().and_then(Run::failed)
    }

    /// Write a configuration register, after the in-flight run completed.
    pub fn write_register(&mut self, addr: u32, value: u32) -> Result<(), Error> {
        self.drain();
        let reg = self.regs.write(addr, value)?;
        self.processor.lock().write_dcr(addr, value);
        log::debug!("dcr {reg} ({addr:#05x}) = {value:#x}");
        Ok(())
    }

    pub fn read_register(&self, addr: u32) -> Result<u32, Error> {
        Ok(self.regs.read(addr)?)
    }
}
