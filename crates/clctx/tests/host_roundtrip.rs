//! End-to-end computations against the emulated host device.

use clctx::{CleanupPolicy, Context, ContextError, ContextOptions, Environment, HostDevice, MemFlags, ProgramSource, run, run_clean};

const SAXPY: &str = r#"
__kernel void saxpy(float a, __global const float* x, __global float* y) {
    size_t i = get_global_id(0);
    y[i] = a * x[i] + y[i];
}
"#;

#[test]
fn full_computation_releases_everything() {
    let env = Environment::with_options(HostDevice::new(), ContextOptions::default().with_build_options("-cl-mad-enable"));
    let source = ProgramSource::source(SAXPY);

    let y = run_clean(&env, |ctx| {
        let kernel = ctx.get_kernel(&source, "saxpy")?;
        assert_eq!(kernel.name(), "saxpy");

        let x = ctx.init_buffer(MemFlags::READ_ONLY, &[1.0f32, 2.0, 3.0], CleanupPolicy::Managed)?;
        let y = ctx.init_buffer(MemFlags::READ_WRITE, &[0.5f32; 3], CleanupPolicy::Managed)?;
        assert_eq!(ctx.read_buffer(&x, 3, &[])?, vec![1.0, 2.0, 3.0]);
        ctx.read_buffer(&y, 3, &[])
    })
    .unwrap();

    assert_eq!(y, vec![0.5; 3]);
    let stats = env.api().stats();
    assert_eq!(stats.programs_built, 1);
    assert_eq!(stats.live_buffers(), 0);
    assert_eq!(stats.outstanding_events(), 0);
}

#[test]
fn caller_managed_registry_can_be_carried_between_runs() {
    let env = Environment::new(HostDevice::new());

    let (buffer_len, first) = run(&env, |ctx| {
        let buffer = ctx.alloc_buffer::<u32>(MemFlags::READ_WRITE, 8, CleanupPolicy::Managed)?;
        Ok(buffer.len())
    })
    .unwrap();
    assert_eq!(buffer_len, 8);

    let (_, second) = run(&env, |ctx| {
        ctx.adopt_cleanup(first);
        ctx.alloc_buffer::<u32>(MemFlags::READ_WRITE, 8, CleanupPolicy::Managed)?;
        assert_eq!(ctx.pending_cleanups(), 2);
        Ok(())
    })
    .unwrap();

    assert_eq!(env.api().stats().live_buffers(), 2);
    second.run_all().unwrap();
    assert_eq!(env.api().stats().live_buffers(), 0);
}

#[test]
fn independent_contexts_share_an_environment() {
    let env = Environment::new(HostDevice::new());
    let source = ProgramSource::source(SAXPY);

    let mut a = Context::new(env.clone());
    let mut b = Context::new(env.clone());
    a.get_kernel(&source, "saxpy").unwrap();
    b.get_kernel(&source, "saxpy").unwrap();

    // caches are per context
    assert_eq!(env.api().stats().programs_built, 2);

    let err: ContextError = a.get_kernel(&source, "missing").unwrap_err();
    assert!(a.failure().is_some());
    assert!(b.failure().is_none());
    assert!(err.to_string().contains("missing"));
}
