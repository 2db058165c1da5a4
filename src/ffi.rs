//! C interface.
//!
//! Every function returns `0` on success and `-1` on failure. Handles come
//! from [`gpu_dev_open`] and must not be used after [`gpu_dev_close`].

#![allow(clippy::missing_safety_doc)]

use crate::{runtime::Error, Device, MemorySpace};
use std::ffi::{c_int, c_void};

const OK: c_int = 0;
const FAILED: c_int = -1;

fn status(result: Result<(), Error>) -> c_int {
    match result {
        Ok(()) => OK,
        Err(err) => {
            log::debug!("{err}");
            err.status()
        }
    }
}

fn memory_space(kind: c_int) -> Result<MemorySpace, Error> {
    u32::try_from(kind)
        .map_err(|_| Error::InvalidMemorySpace(kind as u32))
        .and_then(MemorySpace::try_from)
}

#[no_mangle]
pub unsafe extern "C" fn gpu_dev_open(handle: *mut *mut Device) -> c_int {
    if handle.is_null() {
        return FAILED;
    }
    match Device::open() {
        Ok(device) => {
            *handle = Box::into_raw(Box::new(device));
            OK
        }
        Err(err) => err.status(),
    }
}

#[no_mangle]
pub unsafe extern "C" fn gpu_dev_close(handle: *mut Device) -> c_int {
    if handle.is_null() {
        return FAILED;
    }
    Box::from_raw(handle).close();
    OK
}

/// Aborts the process on an unknown capability id.
#[no_mangle]
pub unsafe extern "C" fn gpu_dev_caps(handle: *mut Device, caps_id: u32, value: *mut u64) -> c_int {
    let Some(device) = handle.as_ref() else {
        return FAILED;
    };
    let caps = device.caps_raw(caps_id);
    if value.is_null() {
        return FAILED;
    }
    *value = caps;
    OK
}

#[no_mangle]
pub unsafe extern "C" fn gpu_mem_alloc(
    handle: *mut Device,
    size: u64,
    kind: c_int,
    dev_addr: *mut u64,
) -> c_int {
    let Some(device) = handle.as_mut() else {
        return FAILED;
    };
    if dev_addr.is_null() {
        return FAILED;
    }
    status(memory_space(kind).and_then(|space| {
        *dev_addr = device.mem_alloc(size, space)?;
        Ok(())
    }))
}

#[no_mangle]
pub unsafe extern "C" fn gpu_mem_free(handle: *mut Device, dev_addr: u64) -> c_int {
    let Some(device) = handle.as_mut() else {
        return FAILED;
    };
    status(device.mem_free(dev_addr))
}

/// Either out-pointer may be null to skip that value.
#[no_mangle]
pub unsafe extern "C" fn gpu_mem_info(
    handle: *mut Device,
    kind: c_int,
    mem_free: *mut u64,
    mem_used: *mut u64,
) -> c_int {
    let Some(device) = handle.as_ref() else {
        return FAILED;
    };
    status(memory_space(kind).map(|space| {
        let info = device.mem_info(space);
        if let Some(mem_free) = mem_free.as_mut() {
            *mem_free = info.free;
        }
        if let Some(mem_used) = mem_used.as_mut() {
            *mem_used = info.used;
        }
    }))
}

#[no_mangle]
pub unsafe extern "C" fn gpu_copy_to_dev(
    handle: *mut Device,
    dev_addr: u64,
    host_ptr: *const c_void,
    size: u64,
) -> c_int {
    let Some(device) = handle.as_mut() else {
        return FAILED;
    };
    if host_ptr.is_null() {
        return FAILED;
    }
    let Ok(len) = usize::try_from(size) else {
        return FAILED;
    };
    let src = std::slice::from_raw_parts(host_ptr.cast::<u8>(), len);
    status(device.upload(dev_addr, src))
}

#[no_mangle]
pub unsafe extern "C" fn gpu_copy_from_dev(
    handle: *mut Device,
    host_ptr: *mut c_void,
    dev_addr: u64,
    size: u64,
) -> c_int {
    let Some(device) = handle.as_ref() else {
        return FAILED;
    };
    if host_ptr.is_null() {
        return FAILED;
    }
    let Ok(len) = usize::try_from(size) else {
        return FAILED;
    };
    let dest = std::slice::from_raw_parts_mut(host_ptr.cast::<u8>(), len);
    status(device.download(dest, dev_addr))
}

#[no_mangle]
pub unsafe extern "C" fn gpu_start(handle: *mut Device) -> c_int {
    let Some(device) = handle.as_mut() else {
        return FAILED;
    };
    status(device.start())
}

/// Never fails on timeout, see [`Device::wait`].
#[no_mangle]
pub unsafe extern "C" fn gpu_ready_wait(handle: *mut Device, timeout: u64) -> c_int {
    let Some(device) = handle.as_mut() else {
        return FAILED;
    };
    status(device.wait(timeout))
}

#[no_mangle]
pub unsafe extern "C" fn gpu_dcr_write(handle: *mut Device, addr: u32, value: u32) -> c_int {
    if gpu_ready_wait(handle, u64::MAX) != OK {
        return FAILED;
    }
    let Some(device) = handle.as_mut() else {
        return FAILED;
    };
    status(device.write_register(addr, value))
}

#[no_mangle]
pub unsafe extern "C" fn gpu_dcr_read(handle: *mut Device, addr: u32, value: *mut u64) -> c_int {
    let Some(device) = handle.as_ref() else {
        return FAILED;
    };
    if value.is_null() {
        return FAILED;
    }
    status(device.read_register(addr).map(|reg| {
        *value = u64::from(reg);
    }))
}
