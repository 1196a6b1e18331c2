use clap::Parser;
use clctx_env::{BACKEND, BackendKind, ContextEnvVar, EnvVarGuard};
use serial_test::serial;
use tracing::Level;

use super::*;

#[test]
fn test_compile_collects_repeated_kernels() {
    let config = CliConfig::try_parse_from(["clctx", "compile", "vec.cl", "--kernel", "add", "--kernel", "scale"]).unwrap();
    assert_eq!(
        config.command,
        Command::Compile {
            path: PathBuf::from("vec.cl"),
            kernels: vec!["add".to_string(), "scale".to_string()],
        }
    );
}

#[test]
fn test_roundtrip_default_count() {
    let config = CliConfig::try_parse_from(["clctx", "roundtrip"]).unwrap();
    assert_eq!(config.command, Command::Roundtrip { count: 1024 });
    assert!(config.validate().is_ok());
}

#[test]
fn test_roundtrip_rejects_zero_count() {
    let config = CliConfig::try_parse_from(["clctx", "roundtrip", "--count", "0"]).unwrap();
    assert!(matches!(config.validate(), Err(CliError::InvalidArgument(_))));
}

#[test]
fn test_roundtrip_rejects_count_beyond_i32_range() {
    let too_many = (MAX_ROUNDTRIP_COUNT as u64 + 1).to_string();
    let config = CliConfig::try_parse_from(["clctx", "roundtrip", "--count", too_many.as_str()]).unwrap();
    assert!(matches!(config.validate(), Err(CliError::InvalidArgument(msg)) if msg.contains("at most")));

    let limit = MAX_ROUNDTRIP_COUNT.to_string();
    let config = CliConfig::try_parse_from(["clctx", "roundtrip", "--count", limit.as_str()]).unwrap();
    assert!(config.validate().is_ok());
}

#[test]
fn test_global_flags_after_subcommand() {
    let config = CliConfig::try_parse_from(["clctx", "probe", "--backend", "opencl", "-vv"]).unwrap();
    assert_eq!(config.backend, Some(BackendChoice::Opencl));
    assert_eq!(config.verbose, 2);
    assert_eq!(config.log_level(Level::INFO), Level::TRACE);
}

#[test]
fn test_verbose_never_lowers_configured_level() {
    let config = CliConfig::try_parse_from(["clctx", "probe", "-v"]).unwrap();
    assert_eq!(config.log_level(Level::INFO), Level::DEBUG);
    assert_eq!(config.log_level(Level::TRACE), Level::TRACE);

    let quiet = CliConfig::try_parse_from(["clctx", "probe"]).unwrap();
    assert_eq!(quiet.log_level(Level::WARN), Level::WARN);
}

#[test]
#[serial]
fn test_backend_flag_wins_over_environment() {
    let _backend = BACKEND.set_guard(BackendKind::Metal);
    let config = CliConfig::try_parse_from(["clctx", "--backend", "host", "probe"]).unwrap();
    assert_eq!(config.resolve_backend().unwrap(), BackendKind::Host);

    let from_env = CliConfig::try_parse_from(["clctx", "probe"]).unwrap();
    assert_eq!(from_env.resolve_backend().unwrap(), BackendKind::Metal);
}

#[test]
#[serial]
fn test_malformed_backend_variable_is_a_config_error() {
    let _backend = EnvVarGuard::set(ContextEnvVar::Backend, "vulkan");
    let config = CliConfig::try_parse_from(["clctx", "probe"]).unwrap();
    assert!(matches!(config.resolve_backend(), Err(CliError::ConfigError(_))));
}

#[test]
#[serial]
fn test_backend_defaults_to_host_without_environment() {
    let _isolated = EnvVarGuard::isolate_context();
    let config = CliConfig::try_parse_from(["clctx", "roundtrip"]).unwrap();
    assert_eq!(config.resolve_backend().unwrap(), BackendKind::Host);
}
