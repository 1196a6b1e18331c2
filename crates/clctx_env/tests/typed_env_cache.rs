use std::{path::PathBuf, sync::OnceLock};

use clctx_env::{BACKEND, BackendKind, ContextEnvVar, DEVICE_TYPE, DeviceKind, EnvVarError, EnvVarGuard, Environment, KERNEL_DIR, METRICS_CONSOLE};
use serial_test::serial;

#[test]
#[serial]
fn get_cached_latches_first_value() {
    let _clear = EnvVarGuard::unset(ContextEnvVar::Backend);
    static CACHE: OnceLock<Option<BackendKind>> = OnceLock::new();

    {
        let _set = EnvVarGuard::set(ContextEnvVar::Backend, "opencl");
        assert_eq!(BACKEND.get_cached(&CACHE), Some(BackendKind::OpenCl));
    }

    {
        let _set = EnvVarGuard::set(ContextEnvVar::Backend, "metal");
        assert_eq!(BACKEND.get_cached(&CACHE), Some(BackendKind::OpenCl));
    }
}

#[test]
#[serial]
fn guards_restore_previous_state() {
    let _clear = EnvVarGuard::unset(ContextEnvVar::KernelDir);

    {
        let guard = KERNEL_DIR.set_guard(PathBuf::from("/opt/kernels"));
        assert_eq!(*guard, PathBuf::from("/opt/kernels"));
        assert_eq!(KERNEL_DIR.get().unwrap(), Some(PathBuf::from("/opt/kernels")));

        {
            let _inner = KERNEL_DIR.unset_guard();
            assert!(!Environment::is_set(ContextEnvVar::KernelDir));
        }
        assert_eq!(KERNEL_DIR.get().unwrap(), Some(PathBuf::from("/opt/kernels")));
    }

    assert_eq!(KERNEL_DIR.get().unwrap(), None);
}

#[test]
#[serial]
fn malformed_values_report_the_key_and_raw_value() {
    let _device = EnvVarGuard::set(ContextEnvVar::DeviceType, "quantum");

    match DEVICE_TYPE.get() {
        Err(EnvVarError::Parse { name, value, .. }) => {
            assert_eq!(name, "CLCTX_DEVICE_TYPE");
            assert_eq!(value, "quantum");
        }
        other => panic!("expected parse error, got {other:?}"),
    }

    let _device = EnvVarGuard::set(ContextEnvVar::DeviceType, " CPU ");
    assert_eq!(DEVICE_TYPE.get().unwrap(), Some(DeviceKind::Cpu));
}

#[test]
#[serial]
fn get_or_falls_back_only_when_absent() {
    let _clear = METRICS_CONSOLE.unset_guard();
    assert!(!METRICS_CONSOLE.get_or(false).unwrap());

    let _on = METRICS_CONSOLE.set_guard(true);
    assert!(METRICS_CONSOLE.get_or(false).unwrap());
}

#[test]
#[serial]
fn chained_guard_restores_in_reverse_order() {
    let _clear = EnvVarGuard::unset(ContextEnvVar::BuildOptions);

    {
        let guard = EnvVarGuard::set(ContextEnvVar::BuildOptions, "-DA=1")
            .and_set(ContextEnvVar::BuildOptions, "-DA=2")
            .and_set(ContextEnvVar::Backend, "host");
        assert_eq!(Environment::get(ContextEnvVar::BuildOptions).as_deref(), Some("-DA=2"));
        assert_eq!(guard.vars().count(), 3);
    }

    assert!(!Environment::is_set(ContextEnvVar::BuildOptions));
}

#[test]
#[serial]
fn isolate_context_clears_every_context_variable() {
    let _seed = EnvVarGuard::set(ContextEnvVar::Backend, "metal").and_set(ContextEnvVar::OpenClPlatform, "Intel");

    {
        let guard = EnvVarGuard::isolate_context();
        assert_eq!(guard.vars().count(), ContextEnvVar::ALL.len());
        assert!(ContextEnvVar::ALL.into_iter().all(|var| !Environment::is_set(var)));
        assert_eq!(BACKEND.get_or(BackendKind::default()).unwrap(), BackendKind::Host);
    }

    assert_eq!(BACKEND.get().unwrap(), Some(BackendKind::Metal));
    assert_eq!(Environment::get(ContextEnvVar::OpenClPlatform).as_deref(), Some("Intel"));
}
