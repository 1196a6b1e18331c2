//! Process environment helpers for the clctx execution context and its instrumentation.

pub mod environment;

pub use environment::{
    EnvVar, Environment, context::{
        BACKEND, BUILD_OPTIONS, BackendKind, ContextEnvVar, DEVICE_TYPE, DeviceKind, KERNEL_DIR, OPENCL_PLATFORM
    }, guard::EnvVarGuard, instrument::{InstrumentEnvVar, LOG_LEVEL, METRICS_CONSOLE, METRICS_JSONL_PATH}, value::{EnvVarError, TypedEnvVar, TypedEnvVarGuard}
};
