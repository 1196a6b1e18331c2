#![cfg(test)]

use std::{cell::Cell, rc::Rc};

use crate::{ContextError, ContextOptions, Environment, HostDevice};

mod cleanup_test;
mod nest_test;
mod options_test;
mod run_test;

pub(crate) const VEC_KERNELS: &str = r#"
__kernel void add(__global const int* a, __global const int* b, __global int* out) {
    size_t i = get_global_id(0);
    out[i] = a[i] + b[i];
}

kernel void scale(__global int* data, int factor) {
    data[get_global_id(0)] *= factor;
}
"#;

pub(crate) fn host_env() -> Environment<HostDevice> {
    Environment::new(HostDevice::new())
}

pub(crate) fn host_env_with(options: ContextOptions) -> Environment<HostDevice> {
    Environment::with_options(HostDevice::new(), options)
}

/// Release action that bumps `counter` each time it runs.
pub(crate) fn counting_action(counter: &Rc<Cell<u32>>) -> impl FnOnce() -> Result<(), ContextError> + 'static {
    let counter = Rc::clone(counter);
    move || {
        counter.set(counter.get() + 1);
        Ok(())
    }
}
