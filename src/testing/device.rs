use super::init_logging;
use super::processor::{Event, Faulty, Gated, VectorAdd, VectorAddArgs};
use crate::{
    config, dcr::Register, processor::Idle, runtime::MemInfo, Capability, Device, Error,
    MemorySpace,
};
use color_eyre::eyre;
use pretty_assertions_sorted as diff;
use proptest::prelude::*;
use std::time::{Duration, Instant};

const ABORT_CHILD: &str = "RVGPUSIM_TEST_ABORT_CHILD";

#[test]
fn open_uses_default_registers() -> eyre::Result<()> {
    init_logging();
    let device = Device::open()?;
    let config = config::Device::default();
    assert_eq!(
        device.read_register(Register::StartupAddr0.addr())?,
        config.startup_addr as u32
    );
    assert_eq!(
        device.read_register(Register::StartupAddr1.addr())?,
        (config.startup_addr >> 32) as u32
    );
    assert_eq!(device.read_register(Register::MpmClass.addr())?, 0);
    assert_eq!(device.caps(Capability::KernelBaseAddr), config.startup_addr);
    diff::assert_eq!(device.config(), &config);
    device.close();
    Ok(())
}

#[test]
fn processor_sees_default_registers() -> eyre::Result<()> {
    let (processor, _release, events) = Gated::new();
    let device = Device::with_processor(config::Device::default(), processor)?;
    let startup = config::Device::default().startup_addr;
    diff::assert_eq!(
        events.lock().clone(),
        vec![
            Event::Dcr(0x001, startup as u32),
            Event::Dcr(0x002, (startup >> 32) as u32),
            Event::Dcr(0x003, 0),
        ]
    );
    device.close();
    Ok(())
}

#[test]
fn invalid_config_is_rejected() {
    let config = config::Device {
        cache_block_size: 48,
        ..config::Device::default()
    };
    assert!(matches!(
        Device::with_processor(config, Idle::default()),
        Err(Error::Config(config::Error::NotPowerOfTwo { .. }))
    ));
}

#[test]
fn unrepresentable_local_range_is_rejected() {
    let wrapping = config::Device {
        local_mem_base: 0xffff_ffff_ffff_f000,
        ..config::Device::default()
    };
    assert!(matches!(
        Device::with_processor(wrapping, Idle::default()),
        Err(Error::Config(config::Error::LocalMemOverflow { .. }))
    ));

    let oversized = config::Device {
        local_mem_log2_size: 64,
        ..config::Device::default()
    };
    assert!(matches!(
        Device::with_processor(oversized, Idle::default()),
        Err(Error::Config(config::Error::LocalMemSize(64)))
    ));
}

#[test]
fn unknown_register_write_is_not_forwarded() -> eyre::Result<()> {
    let (processor, _release, events) = Gated::new();
    let mut device = Device::with_processor(config::Device::default(), processor)?;
    events.lock().clear();

    assert!(matches!(
        device.write_register(0x004, 9),
        Err(Error::UnknownRegister(_))
    ));
    assert!(events.lock().is_empty());

    device.write_register(Register::MpmClass.addr(), 9)?;
    diff::assert_eq!(events.lock().clone(), vec![Event::Dcr(0x003, 9)]);
    assert_eq!(device.read_register(Register::MpmClass.addr())?, 9);
    Ok(())
}

#[test]
fn num_cores_matches_topology() -> eyre::Result<()> {
    let config = config::Device {
        num_clusters: 4,
        num_cores: 8,
        ..config::Device::default()
    };
    let device = Device::with_processor(config, Idle::default())?;
    assert_eq!(device.caps(Capability::NumCores), 32);
    assert_eq!(device.caps_raw(3), 32);
    assert_eq!(device.caps_raw(1), 4);
    Ok(())
}

#[test]
fn unknown_capability_aborts() -> eyre::Result<()> {
    if std::env::var_os(ABORT_CHILD).is_some() {
        let device = Device::open()?;
        let value = device.caps_raw(42);
        println!("unexpected capability value {value}");
        return Ok(());
    }
    let status = std::process::Command::new(std::env::current_exe()?)
        .args(["--exact", "testing::device::unknown_capability_aborts"])
        .env(ABORT_CHILD, "1")
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null())
        .status()?;
    assert!(!status.success(), "child exited with {status}");
    Ok(())
}

#[test]
fn free_of_null_is_a_noop() -> eyre::Result<()> {
    let mut device = Device::open()?;
    let before = device.mem_info(MemorySpace::Global);
    for _ in 0..3 {
        device.mem_free(0)?;
    }
    assert_eq!(device.mem_info(MemorySpace::Global), before);
    Ok(())
}

#[test]
fn invalid_memory_requests() -> eyre::Result<()> {
    let mut device = Device::open()?;
    assert!(matches!(
        device.mem_alloc(0, MemorySpace::Global),
        Err(Error::InvalidArgument(_))
    ));
    assert!(matches!(
        MemorySpace::try_from(2),
        Err(Error::InvalidMemorySpace(2))
    ));
    let addr = device.mem_alloc(64, MemorySpace::Global)?;
    assert!(matches!(device.mem_free(addr + 4), Err(Error::Allocation(_))));
    device.mem_free(addr)?;
    assert!(matches!(device.mem_free(addr), Err(Error::Allocation(_))));
    let local = device.caps(Capability::LocalMemAddr);
    assert!(matches!(device.mem_free(local), Err(Error::Allocation(_))));
    Ok(())
}

#[test]
fn local_memory_info() -> eyre::Result<()> {
    let mut device = Device::open()?;
    let size = device.caps(Capability::LocalMemSize);
    let addr = device.mem_alloc(100, MemorySpace::Local)?;
    assert!(addr >= device.caps(Capability::LocalMemAddr));
    diff::assert_eq!(
        device.mem_info(MemorySpace::Local),
        MemInfo {
            free: size - 100,
            used: 100,
        }
    );
    // local memory is released by address range
    device.mem_free(addr)?;
    diff::assert_eq!(
        device.mem_info(MemorySpace::Local),
        MemInfo { free: size, used: 0 }
    );
    Ok(())
}

#[test]
fn uploads_materialise_pages() -> eyre::Result<()> {
    let mut device = Device::open()?;
    assert_eq!(device.resident_bytes(), 0);
    let addr = device.mem_alloc(3 * crate::mem::PAGE_SIZE, MemorySpace::Global)?;
    device.upload(addr + crate::mem::PAGE_SIZE - 4, &[7; 8])?;
    assert_eq!(device.resident_bytes(), 2 * crate::mem::PAGE_SIZE);

    let mut buf = [0xff; 8];
    device.download(&mut buf, addr + 2 * crate::mem::PAGE_SIZE)?;
    assert_eq!(buf, [0; 8]);
    assert_eq!(device.resident_bytes(), 2 * crate::mem::PAGE_SIZE);
    Ok(())
}

#[test]
fn transfer_bounds_use_block_rounded_size() -> eyre::Result<()> {
    let mut device = Device::open()?;
    let limit = device.caps(Capability::GlobalMemSize);
    let data = [0xab; 60];
    // 60 bytes fit below the limit, one 64 byte block does not
    assert!(matches!(
        device.upload(limit - 60, &data),
        Err(Error::OutOfBounds { .. })
    ));
    let mut buf = [0; 60];
    assert!(matches!(
        device.download(&mut buf, limit - 60),
        Err(Error::OutOfBounds { .. })
    ));
    device.upload(limit - 64, &data)?;
    device.download(&mut buf, limit - 64)?;
    assert_eq!(buf, data);
    assert!(matches!(
        device.upload(u64::MAX - 8, &data),
        Err(Error::OutOfBounds { .. })
    ));
    Ok(())
}

#[test]
fn alloc_upload_run_download() -> eyre::Result<()> {
    init_logging();
    let mut device = Device::open()?;
    let addr = device.mem_alloc(4096, MemorySpace::Global)?;
    let pattern: Vec<u8> = (0..4096u32).map(|i| (i * 7 % 251) as u8).collect();
    device.upload(addr, &pattern)?;

    device.start()?;
    device.wait(10_000)?;
    assert!(!device.is_running());

    let mut result = vec![0; 4096];
    device.download(&mut result, addr)?;
    assert_eq!(result, pattern);
    assert_eq!(device.mem_info(MemorySpace::Global).used, 4096);
    device.mem_free(addr)?;
    assert_eq!(device.mem_info(MemorySpace::Global).used, 0);
    device.close();
    Ok(())
}

#[test]
fn wait_without_run_returns_immediately() -> eyre::Result<()> {
    let (processor, _release, _events) = Gated::new();
    let mut device = Device::with_processor(config::Device::default(), processor)?;
    let start = Instant::now();
    device.wait(60_000)?;
    assert!(start.elapsed() < Duration::from_secs(1));
    assert!(!device.is_running());
    Ok(())
}

#[test]
fn wait_timeout_is_not_an_error() -> eyre::Result<()> {
    init_logging();
    let (processor, release, events) = Gated::new();
    let mut device = Device::with_processor(config::Device::default(), processor)?;
    device.start()?;

    // a zero timeout still polls once
    let start = Instant::now();
    device.wait(0)?;
    assert!(start.elapsed() >= Duration::from_secs(1));
    assert!(device.is_running());

    release.send(())?;
    device.wait(u64::MAX)?;
    assert!(!device.is_running());
    assert_eq!(events.lock().last(), Some(&Event::RunFinished));
    Ok(())
}

#[test]
fn write_register_waits_for_run() -> eyre::Result<()> {
    init_logging();
    let (processor, release, events) = Gated::new();
    let mut device = Device::with_processor(config::Device::default(), processor)?;
    device.start()?;

    let releaser = std::thread::spawn(move || {
        std::thread::sleep(Duration::from_millis(100));
        release.send(())
    });
    let mpm = Register::MpmClass.addr();
    device.write_register(mpm, 7)?;
    assert_eq!(device.read_register(mpm)?, 7);
    assert!(!device.is_running());
    releaser.join().expect("releaser thread")?;

    let events = events.lock().clone();
    diff::assert_eq!(
        events[3..].to_vec(),
        vec![Event::RunStarted, Event::RunFinished, Event::Dcr(mpm, 7)]
    );
    Ok(())
}

#[test]
fn start_serializes_runs() -> eyre::Result<()> {
    init_logging();
    let (processor, release, events) = Gated::new();
    let mut device = Device::with_processor(config::Device::default(), processor)?;
    release.send(())?;
    release.send(())?;
    device.start()?;
    device.start()?;
    device.wait(u64::MAX)?;
    let events = events.lock().clone();
    diff::assert_eq!(
        events[3..].to_vec(),
        vec![
            Event::RunStarted,
            Event::RunFinished,
            Event::RunStarted,
            Event::RunFinished,
        ]
    );
    device.close();
    Ok(())
}

#[test]
fn failed_run_is_reported() -> eyre::Result<()> {
    init_logging();
    let mut device = Device::with_processor(config::Device::default(), Faulty)?;
    device.start()?;
    device.wait(u64::MAX)?;
    assert_eq!(device.last_run_failure(), Some("illegal instruction"));

    // the device stays usable
    device.write_register(Register::MpmClass.addr(), 1)?;
    let addr = device.mem_alloc(8, MemorySpace::Global)?;
    device.upload(addr, &[1; 8])?;
    Ok(())
}

#[test]
fn vector_add_on_fpu_cores() -> eyre::Result<()> {
    init_logging();
    let config = config::Device {
        num_cores: 4,
        ..config::Device::default()
    };
    let processor = VectorAdd::new(4);
    let flags = std::sync::Arc::clone(&processor.flags);
    let mut device = Device::with_processor(config, processor)?;

    let n = 64u64;
    let a: Vec<f32> = (0..n).map(|i| i as f32 * 0.5).collect();
    let mut b: Vec<f32> = (0..n).map(|i| 1.0 / (i as f32 + 1.0)).collect();
    // one inexact sum on core 3
    b[3] = 2f32.powi(-30);

    let bytes = |v: &[f32]| -> Vec<u8> { v.iter().flat_map(|x| x.to_le_bytes()).collect() };
    let a_addr = device.mem_alloc(4 * n, MemorySpace::Global)?;
    let b_addr = device.mem_alloc(4 * n, MemorySpace::Global)?;
    let c_addr = device.mem_alloc(4 * n, MemorySpace::Global)?;
    device.upload(a_addr, &bytes(&a))?;
    device.upload(b_addr, &bytes(&b))?;

    let args = VectorAddArgs {
        count: n,
        a: a_addr,
        b: b_addr,
        c: c_addr,
        rm: u64::from(fpu::DYNAMIC_ROUNDING),
    };
    device.upload_kernel_bytes(&args.to_bytes())?;
    device.start()?;
    device.wait(u64::MAX)?;
    assert_eq!(device.last_run_failure(), None);

    let mut result = vec![0; 4 * n as usize];
    device.download(&mut result, c_addr)?;
    let result: Vec<u32> = result
        .chunks_exact(4)
        .map(|word| u32::from_le_bytes([word[0], word[1], word[2], word[3]]))
        .collect();
    let want: Vec<u32> = a.iter().zip(&b).map(|(x, y)| (x + y).to_bits()).collect();
    diff::assert_eq!(result, want);

    let flags = flags.lock().clone();
    assert_eq!(flags.len(), 4);
    assert!(flags[3].contains(fpu::ExceptionFlags::INEXACT));
    assert!(flags.iter().all(|f| !f.contains(fpu::ExceptionFlags::INVALID)));
    device.close();
    Ok(())
}

#[test]
fn vector_add_with_static_rounding_mode() -> eyre::Result<()> {
    init_logging();
    let mut device = Device::with_processor(config::Device::default(), VectorAdd::new(1))?;
    let one = 1f32.to_bits().to_le_bytes();
    let tiny = 2f32.powi(-30).to_bits().to_le_bytes();
    let a_addr = device.mem_alloc(4, MemorySpace::Global)?;
    let b_addr = device.mem_alloc(4, MemorySpace::Global)?;
    let c_addr = device.mem_alloc(4, MemorySpace::Global)?;
    device.upload(a_addr, &one)?;
    device.upload(b_addr, &tiny)?;

    let mut args = VectorAddArgs {
        count: 1,
        a: a_addr,
        b: b_addr,
        c: c_addr,
        rm: fpu::RoundingMode::Rup as u64,
    };
    device.upload_kernel_bytes(&args.to_bytes())?;
    device.start()?;
    device.wait(u64::MAX)?;
    assert_eq!(device.last_run_failure(), None);
    let mut sum = [0; 4];
    device.download(&mut sum, c_addr)?;
    assert_eq!(u32::from_le_bytes(sum), 0x3f80_0001);

    // reserved encodings fail the run
    args.rm = 5;
    device.upload_kernel_bytes(&args.to_bytes())?;
    device.start()?;
    device.wait(u64::MAX)?;
    assert_eq!(device.last_run_failure(), Some("invalid rounding mode 0b101"));
    Ok(())
}

#[test]
fn empty_kernel_image_is_rejected() -> eyre::Result<()> {
    let mut device = Device::open()?;
    assert!(matches!(
        device.upload_kernel_bytes(&[]),
        Err(Error::InvalidArgument(_))
    ));
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn alloc_free_restores_totals(
        sizes in proptest::collection::vec(1u64..0x4000, 1..4),
        local: bool,
    ) {
        let space = if local { MemorySpace::Local } else { MemorySpace::Global };
        let mut device = Device::open().map_err(|err| TestCaseError::fail(err.to_string()))?;
        let before = device.mem_info(space);
        let mut addrs = Vec::new();
        for size in sizes {
            match device.mem_alloc(size, space) {
                Ok(addr) => addrs.push(addr),
                Err(Error::Allocation(_)) => {}
                Err(err) => return Err(TestCaseError::fail(err.to_string())),
            }
        }
        for addr in addrs.into_iter().rev() {
            prop_assert!(device.mem_free(addr).is_ok());
        }
        prop_assert_eq!(device.mem_info(space), before);
    }

    #[test]
    fn upload_download_round_trip(
        offset in 0u64..0x1000_0000,
        data in proptest::collection::vec(any::<u8>(), 1..8192),
    ) {
        let mut device = Device::open().map_err(|err| TestCaseError::fail(err.to_string()))?;
        let addr = 0x1_0000 + offset;
        prop_assert!(device.upload(addr, &data).is_ok());
        let mut buf = vec![0; data.len()];
        prop_assert!(device.download(&mut buf, addr).is_ok());
        prop_assert_eq!(buf, data);
    }
}
