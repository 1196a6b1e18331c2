use std::path::PathBuf;

use clctx_env::{BUILD_OPTIONS, ContextEnvVar, EnvVarGuard, KERNEL_DIR};
use serial_test::serial;

use crate::ContextOptions;

#[test]
#[serial]
fn options_read_environment() {
    let _options = BUILD_OPTIONS.set_guard("-DTILE=16".to_string());
    let _dir = KERNEL_DIR.set_guard(PathBuf::from("/opt/kernels"));

    let options = ContextOptions::from_env().unwrap();
    assert_eq!(options.build_options, "-DTILE=16");
    assert_eq!(options.kernel_dir, Some(PathBuf::from("/opt/kernels")));
}

#[test]
#[serial]
fn options_default_when_unset() {
    let _isolated = EnvVarGuard::isolate_context();

    assert_eq!(ContextOptions::from_env().unwrap(), ContextOptions::default());
}

#[test]
#[serial]
fn empty_kernel_dir_is_rejected() {
    let _dir = EnvVarGuard::set(ContextEnvVar::KernelDir, "   ");
    assert!(ContextOptions::from_env().is_err());
}
