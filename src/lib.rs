#![allow(
    non_camel_case_types,
    clippy::missing_panics_doc,
    clippy::missing_errors_doc,
    clippy::module_name_repetitions,
    clippy::cast_possible_truncation,
    clippy::cast_possible_wrap,
    clippy::cast_sign_loss
)]

//! Host runtime of a simulated RISC-V accelerator.
//!
//! A [`Device`] owns the device memory, one allocator per address space,
//! the configuration registers and the (at most one) in-flight [`Run`] of
//! the attached [`Processor`].

pub mod allocation;
pub mod caps;
pub mod config;
pub mod dcr;
pub mod ffi;
pub mod mem;
pub mod processor;
pub mod run;
pub mod runtime;
pub mod sync;

#[cfg(test)]
pub mod testing;

pub use fpu;

pub use caps::Capability;
pub use processor::Processor;
pub use run::Run;
pub use runtime::{Device, Error, MemorySpace};

pub type address = u64;
