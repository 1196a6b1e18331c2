mod cli;

use anyhow::{Context as _, Result};
use clap::Parser;
use clctx::{CleanupPolicy, ComputeApi, ContextOptions, Environment, HostDevice, MemFlags, ProgramSource, run_clean};
use clctx_env::BackendKind;
use clctx_instrumentation::{AppConfig, init_tracing};
use tracing::{debug, info};

use crate::cli::{CliConfig, CliError, Command};

fn main() -> Result<()> {
    let cli = CliConfig::parse();
    cli.validate()?;

    let mut app_config = AppConfig::from_env()?;
    app_config.log_level = cli.log_level(app_config.log_level);
    let app_config = AppConfig::initialise(app_config)?;
    init_tracing(app_config)?;

    let options = ContextOptions::from_env()?;
    let backend = cli.resolve_backend()?;
    debug!(%backend, ?options, "starting");

    match backend {
        BackendKind::Host => execute(Environment::with_options(HostDevice::new(), options), &cli.command),
        BackendKind::OpenCl => open_opencl(options, &cli.command),
        BackendKind::Metal => open_metal(options, &cli.command),
    }
}

#[cfg(feature = "opencl")]
fn open_opencl(options: ContextOptions, command: &Command) -> Result<()> {
    let device = clctx::OpenClDevice::from_env()?;
    execute(Environment::with_options(device, options), command)
}

#[cfg(not(feature = "opencl"))]
fn open_opencl(_options: ContextOptions, _command: &Command) -> Result<()> {
    Err(CliError::BackendUnavailable {
        backend: BackendKind::OpenCl.to_string(),
        feature: "opencl",
    }
    .into())
}

#[cfg(all(feature = "metal", target_os = "macos"))]
fn open_metal(options: ContextOptions, command: &Command) -> Result<()> {
    let device = clctx::MetalDevice::system_default()?;
    execute(Environment::with_options(device, options), command)
}

#[cfg(not(all(feature = "metal", target_os = "macos")))]
fn open_metal(_options: ContextOptions, _command: &Command) -> Result<()> {
    Err(CliError::BackendUnavailable {
        backend: BackendKind::Metal.to_string(),
        feature: "metal",
    }
    .into())
}

fn execute<A: ComputeApi>(env: Environment<A>, command: &Command) -> Result<()> {
    match command {
        Command::Probe => {
            println!("{}", env.api().info());
            Ok(())
        }
        Command::Compile { path, kernels } => compile(&env, path, kernels),
        Command::Roundtrip { count } => roundtrip(&env, *count),
    }
}

fn compile<A: ComputeApi>(env: &Environment<A>, path: &std::path::Path, kernels: &[String]) -> Result<()> {
    let source = ProgramSource::from(path);
    let stats = run_clean(env, |ctx| {
        ctx.get_program(&source)?;
        for name in kernels {
            ctx.get_kernel(&source, name)?;
            info!(kernel = %name, "extracted kernel");
        }
        Ok(ctx.cache_stats())
    })
    .with_context(|| format!("failed to compile {}", path.display()))?;

    println!("compiled {} ({stats})", path.display());
    Ok(())
}

fn roundtrip<A: ComputeApi>(env: &Environment<A>, count: usize) -> Result<()> {
    let expected = (0..count).map(i32::try_from).collect::<Result<Vec<i32>, _>>()?;
    let actual = run_clean(env, |ctx| {
        let buffer = ctx.init_buffer(MemFlags::READ_WRITE, &expected, CleanupPolicy::Managed)?;
        ctx.read_buffer(&buffer, count, &[])
    })
    .context("buffer round trip failed")?;

    if let Some((index, (&wrote, &read))) = expected.iter().zip(&actual).enumerate().find(|(_, (wrote, read))| wrote != read) {
        return Err(CliError::RoundTripMismatch {
            index,
            expected: wrote,
            actual: read,
        }
        .into());
    }

    println!("round trip of {count} i32 elements ok");
    Ok(())
}
