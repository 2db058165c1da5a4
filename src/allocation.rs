use super::address;
use rangemap::{RangeMap, RangeSet};
use std::ops::Range;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("cannot allocate zero bytes")]
    ZeroSize,
    #[error("out of memory: cannot allocate {size} bytes ({free} bytes free)")]
    OutOfMemory { size: u64, free: u64 },
    #[error("address {0:#x} is not the start of an allocation")]
    NotAllocated(address),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Allocation {
    pub id: usize,
    pub start_addr: address,
    pub end_addr: address,
}

impl Allocation {
    #[must_use]
    pub fn num_bytes(&self) -> u64 {
        self.end_addr - self.start_addr
    }
}

impl std::fmt::Display for Allocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Allocation")
            .field("id", &self.id)
            .field("start_addr", &format_args!("{:#x}", self.start_addr))
            .field("end_addr", &format_args!("{:#x}", self.end_addr))
            .field("size", &human_bytes::human_bytes(self.num_bytes() as f64))
            .finish()
    }
}

/// Live regions of one address space.
#[derive(Default, Debug, Clone, PartialEq, Eq)]
pub struct Allocations(RangeMap<address, Allocation>);

impl std::ops::Deref for Allocations {
    type Target = RangeMap<address, Allocation>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl Allocations {
    pub fn insert(&mut self, id: usize, range: Range<address>) {
        assert!(
            !self.0.overlaps(&range),
            "overlapping memory allocation {:#x}..{:#x}",
            range.start,
            range.end,
        );
        let allocation = Allocation {
            id,
            start_addr: range.start,
            end_addr: range.end,
        };
        self.0.insert(range, allocation);
    }

    /// Remove the allocation starting exactly at `addr`.
    pub fn remove(&mut self, addr: address) -> Option<Allocation> {
        let allocation = self
            .0
            .get(&addr)
            .filter(|allocation| allocation.start_addr == addr)
            .cloned()?;
        self.0.remove(allocation.start_addr..allocation.end_addr);
        Some(allocation)
    }
}

fn align_up(value: u64, align: u64) -> Option<u64> {
    value.checked_next_multiple_of(align)
}

/// First-fit allocator over `[base, base + capacity)`.
///
/// Sizes are rounded up to `block_align` and regions start on a
/// `page_align` boundary.
#[derive(Debug, Clone)]
pub struct Allocator {
    capacity: u64,
    page_align: u64,
    block_align: u64,
    free: RangeSet<address>,
    allocations: Allocations,
    allocated: u64,
    next_id: usize,
}

impl Allocator {
    /// `capacity` is clamped to the end of the address space.
    #[must_use]
    pub fn new(base: address, capacity: u64, page_align: u64, block_align: u64) -> Self {
        debug_assert!(page_align.is_power_of_two());
        debug_assert!(block_align.is_power_of_two());
        let capacity = capacity.min(u64::MAX - base);
        let mut free = RangeSet::new();
        if capacity > 0 {
            free.insert(base..base + capacity);
        }
        Self {
            capacity,
            page_align,
            block_align,
            free,
            allocations: Allocations::default(),
            allocated: 0,
            next_id: 1,
        }
    }

    pub fn allocate(&mut self, size: u64) -> Result<address, Error> {
        if size == 0 {
            return Err(Error::ZeroSize);
        }
        let out_of_memory = Error::OutOfMemory {
            size,
            free: self.free(),
        };
        let size = align_up(size, self.block_align).ok_or(out_of_memory.clone())?;
        let region = self
            .free
            .iter()
            .find_map(|range| {
                let start = align_up(range.start, self.page_align)?;
                let end = start.checked_add(size)?;
                (end <= range.end).then_some(start..end)
            })
            .ok_or(out_of_memory)?;

        let id = self.next_id;
        self.next_id += 1;
        self.free.remove(region.clone());
        self.allocated += size;
        log::trace!(
            "allocated {} at {:#x}..{:#x}",
            human_bytes::human_bytes(size as f64),
            region.start,
            region.end
        );
        let start = region.start;
        self.allocations.insert(id, region);
        Ok(start)
    }

    pub fn release(&mut self, addr: address) -> Result<(), Error> {
        let allocation = self
            .allocations
            .remove(addr)
            .ok_or(Error::NotAllocated(addr))?;
        log::trace!("released {allocation}");
        self.allocated -= allocation.num_bytes();
        self.free.insert(allocation.start_addr..allocation.end_addr);
        Ok(())
    }

    #[must_use]
    pub fn free(&self) -> u64 {
        self.capacity - self.allocated
    }

    #[must_use]
    pub fn allocated(&self) -> u64 {
        self.allocated
    }

    #[must_use]
    pub fn allocations(&self) -> &Allocations {
        &self.allocations
    }
}
