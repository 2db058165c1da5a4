use clap::{Parser, Subcommand};
use color_eyre::eyre::{self, WrapErr};
use console::style;
use rvgpusim::{config, Capability, Device, MemorySpace};
use std::path::PathBuf;
use strum::IntoEnumIterator;

#[derive(Debug, Subcommand)]
enum Command {
    /// Print every device capability
    Caps,
    /// Print free and used bytes of both address spaces
    Mem,
}

#[derive(Debug, Parser)]
#[command(author, version, about = "simulated RISC-V accelerator runtime", long_about = None)]
struct Options {
    /// Device configuration (YAML)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

fn load_config(path: Option<&PathBuf>) -> eyre::Result<config::Device> {
    let Some(path) = path else {
        return Ok(config::Device::default());
    };
    let file = std::fs::File::open(path)
        .wrap_err_with(|| format!("failed to open {}", path.display()))?;
    let config = config::Device::from_reader(std::io::BufReader::new(file))
        .wrap_err_with(|| format!("invalid config {}", path.display()))?;
    Ok(config)
}

fn main() -> eyre::Result<()> {
    color_eyre::install()?;
    env_logger::init();

    let options = Options::parse();
    let config = load_config(options.config.as_ref())?;
    let device = Device::with_processor(config, rvgpusim::processor::Idle::default())?;

    match options.command {
        Command::Caps => {
            for cap in Capability::iter() {
                println!("{:>16} {:#x}", style(cap).cyan(), device.caps(cap));
            }
        }
        Command::Mem => {
            for space in [MemorySpace::Global, MemorySpace::Local] {
                let info = device.mem_info(space);
                println!(
                    "{:>8} free {:>10} used {:>10}",
                    style(space).cyan(),
                    human_bytes::human_bytes(info.free as f64),
                    human_bytes::human_bytes(info.used as f64),
                );
            }
            println!(
                "{:>8} {:>10}",
                style("resident").cyan(),
                human_bytes::human_bytes(device.resident_bytes() as f64),
            );
        }
    }
    device.close();
    Ok(())
}
