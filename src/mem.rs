use super::address;
use std::collections::HashMap;

const PAGE_BITS: u32 = 12;
pub const PAGE_SIZE: u64 = 1 << PAGE_BITS;

/// Sparse byte-addressable backing store.
///
/// Pages are materialised on first write, bytes never written read as zero.
#[derive(Default)]
pub struct Ram {
    pages: HashMap<u64, Box<[u8]>>,
}

impl std::fmt::Debug for Ram {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ram")
            .field("num_pages", &self.num_pages())
            .field(
                "size",
                &human_bytes::human_bytes((self.num_pages() as u64 * PAGE_SIZE) as f64),
            )
            .finish()
    }
}

/// Split `[addr, addr + len)` into `(page, offset in page, offset in buffer, len)` chunks.
fn chunks(addr: address, len: usize) -> impl Iterator<Item = (u64, usize, usize, usize)> {
    let mut done = 0;
    std::iter::from_fn(move || {
        if done >= len {
            return None;
        }
        let current = addr.wrapping_add(done as u64);
        let offset = (current % PAGE_SIZE) as usize;
        let n = (PAGE_SIZE as usize - offset).min(len - done);
        let chunk = (current >> PAGE_BITS, offset, done, n);
        done += n;
        Some(chunk)
    })
}

impl Ram {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn read(&self, addr: address, data: &mut [u8]) {
        for (page, offset, pos, n) in chunks(addr, data.len()) {
            let dest = &mut data[pos..pos + n];
            match self.pages.get(&page) {
                Some(page) => dest.copy_from_slice(&page[offset..offset + n]),
                None => dest.fill(0),
            }
        }
    }

    pub fn write(&mut self, addr: address, data: &[u8]) {
        for (page, offset, pos, n) in chunks(addr, data.len()) {
            let page = self
                .pages
                .entry(page)
                .or_insert_with(|| vec![0; PAGE_SIZE as usize].into_boxed_slice());
            page[offset..offset + n].copy_from_slice(&data[pos..pos + n]);
        }
    }

    /// Number of pages that have been written to.
    #[must_use]
    pub fn num_pages(&self) -> usize {
        self.pages.len()
    }
}
