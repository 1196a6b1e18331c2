//! Variables that configure backend selection and program compilation.

use std::{fmt, path::PathBuf, str::FromStr};

use super::EnvVar;
use super::value::{TypedEnvVar, format_display, parse_string};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ContextEnvVar {
    Backend,
    BuildOptions,
    KernelDir,
    OpenClPlatform,
    DeviceType,
}

impl ContextEnvVar {
    /// Every variable an execution context or backend reads.
    pub const ALL: [ContextEnvVar; 5] = [
        ContextEnvVar::Backend,
        ContextEnvVar::BuildOptions,
        ContextEnvVar::KernelDir,
        ContextEnvVar::OpenClPlatform,
        ContextEnvVar::DeviceType,
    ];

    pub const fn key(self) -> &'static str {
        match self {
            ContextEnvVar::Backend => "CLCTX_BACKEND",
            ContextEnvVar::BuildOptions => "CLCTX_BUILD_OPTIONS",
            ContextEnvVar::KernelDir => "CLCTX_KERNEL_DIR",
            ContextEnvVar::OpenClPlatform => "CLCTX_OPENCL_PLATFORM",
            ContextEnvVar::DeviceType => "CLCTX_DEVICE_TYPE",
        }
    }

    pub const fn into_env(self) -> EnvVar {
        EnvVar::Context(self)
    }
}

/// Native compute backend a process should open.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum BackendKind {
    /// In-process emulated device.
    #[default]
    Host,
    OpenCl,
    Metal,
}

impl FromStr for BackendKind {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "host" | "cpu-emulated" => Ok(Self::Host),
            "opencl" | "cl" => Ok(Self::OpenCl),
            "metal" | "mtl" => Ok(Self::Metal),
            other => Err(format!("unknown backend '{other}' (expected host, opencl or metal)")),
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Host => "host",
            Self::OpenCl => "opencl",
            Self::Metal => "metal",
        })
    }
}

/// Device class requested from a multi-device backend.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum DeviceKind {
    #[default]
    Gpu,
    Cpu,
    Accelerator,
    Any,
}

impl FromStr for DeviceKind {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "gpu" => Ok(Self::Gpu),
            "cpu" => Ok(Self::Cpu),
            "accelerator" | "accel" => Ok(Self::Accelerator),
            "any" | "all" | "default" => Ok(Self::Any),
            other => Err(format!("unknown device type '{other}'")),
        }
    }
}

impl fmt::Display for DeviceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Gpu => "gpu",
            Self::Cpu => "cpu",
            Self::Accelerator => "accelerator",
            Self::Any => "any",
        })
    }
}

/// `CLCTX_BACKEND`
pub const BACKEND: TypedEnvVar<BackendKind> = TypedEnvVar::new(ContextEnvVar::Backend.into_env(), BackendKind::from_str, format_display);

/// `CLCTX_BUILD_OPTIONS`: compiler flags handed to every program build.
pub const BUILD_OPTIONS: TypedEnvVar<String> = TypedEnvVar::new(ContextEnvVar::BuildOptions.into_env(), parse_string, format_display);

/// `CLCTX_KERNEL_DIR`: base directory for relative kernel source paths.
pub const KERNEL_DIR: TypedEnvVar<PathBuf> = TypedEnvVar::new(ContextEnvVar::KernelDir.into_env(), parse_dir, format_dir);

/// `CLCTX_OPENCL_PLATFORM`: case-insensitive substring of the platform name to prefer.
pub const OPENCL_PLATFORM: TypedEnvVar<String> =
    TypedEnvVar::new(ContextEnvVar::OpenClPlatform.into_env(), parse_string, format_display);

/// `CLCTX_DEVICE_TYPE`
pub const DEVICE_TYPE: TypedEnvVar<DeviceKind> = TypedEnvVar::new(ContextEnvVar::DeviceType.into_env(), DeviceKind::from_str, format_display);

fn parse_dir(value: &str) -> Result<PathBuf, String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err("directory is empty".to_string());
    }
    Ok(PathBuf::from(trimmed))
}

fn format_dir(path: &PathBuf) -> String {
    path.to_string_lossy().into_owned()
}
