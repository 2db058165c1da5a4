use crate::{mem::Ram, sync::Mutex};
use color_eyre::eyre;

/// The simulated core array a device drives.
///
/// Register writes only arrive between runs. `run` executes the configured
/// program to completion against device memory.
pub trait Processor: Send {
    fn write_dcr(&mut self, addr: u32, value: u32);

    fn run(&mut self, ram: &Mutex<Ram>) -> eyre::Result<()>;
}

/// A processor without cores: runs complete immediately.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Idle {
    pub dcrs: Vec<(u32, u32)>,
    pub num_runs: usize,
}

impl Processor for Idle {
    fn write_dcr(&mut self, addr: u32, value: u32) {
        self.dcrs.push((addr, value));
    }

    fn run(&mut self, _ram: &Mutex<Ram>) -> eyre::Result<()> {
        self.num_runs += 1;
        Ok(())
    }
}

impl<P> Processor for Box<P>
where
    P: Processor + ?Sized,
{
    fn write_dcr(&mut self, addr: u32, value: u32) {
        (**self).write_dcr(addr, value);
    }

    fn run(&mut self, ram: &Mutex<Ram>) -> eyre::Result<()> {
        (**self).run(ram)
    }
}
