use std::panic::{AssertUnwindSafe, catch_unwind};

use super::host_env;
use crate::{CleanupPolicy, ContextError, ErrorKind, HostCall, MemFlags, run, run_checked, run_clean, run_leaky, run_or_abort};

fn fail(message: &str) -> ContextError {
    ContextError::NativeCall {
        call: "clEnqueueNDRangeKernel",
        message: message.to_string(),
    }
}

#[test]
fn run_returns_pending_cleanup_on_success() {
    let env = host_env();
    let (len, cleanup) = run(&env, |ctx| {
        let buffer = ctx.alloc_buffer::<i32>(MemFlags::READ_WRITE, 16, CleanupPolicy::Managed)?;
        Ok(buffer.len())
    })
    .unwrap();

    assert_eq!(len, 16);
    assert_eq!(cleanup.len(), 1);
    assert_eq!(env.api().stats().live_buffers(), 1);

    cleanup.run_all().unwrap();
    assert_eq!(env.api().stats().live_buffers(), 0);
}

#[test]
fn run_releases_resources_when_computation_fails() {
    let env = host_env();
    let err = run(&env, |ctx| {
        ctx.alloc_buffer::<i32>(MemFlags::READ_WRITE, 4, CleanupPolicy::Managed)?;
        ctx.alloc_buffer::<i32>(MemFlags::READ_WRITE, 4, CleanupPolicy::Managed)?;
        Err::<(), _>(fail("launch failed"))
    })
    .unwrap_err();

    assert!(err.to_string().contains("launch failed"));
    let stats = env.api().stats();
    assert_eq!(stats.buffers_created, 2);
    assert_eq!(stats.live_buffers(), 0);
}

#[test]
fn run_clean_sweeps_after_success() {
    let env = host_env();
    run_clean(&env, |ctx| {
        ctx.alloc_buffer::<u8>(MemFlags::READ_WRITE, 32, CleanupPolicy::Managed)?;
        ctx.alloc_buffer::<u8>(MemFlags::READ_WRITE, 32, CleanupPolicy::Managed)?;
        Ok(())
    })
    .unwrap();
    assert_eq!(env.api().stats().live_buffers(), 0);
}

#[test]
fn run_clean_reports_cleanup_failure() {
    let env = host_env();
    let err = run_clean(&env, |ctx| {
        ctx.alloc_buffer::<u8>(MemFlags::READ_WRITE, 32, CleanupPolicy::Managed)?;
        ctx.api().fail_next(HostCall::ReleaseMem);
        Ok(())
    })
    .unwrap_err();
    assert!(matches!(err, ContextError::NativeCall { call: "clReleaseMemObject", .. }));
}

#[test]
fn run_leaky_leaves_resources_allocated() {
    let env = host_env();
    let value = run_leaky(&env, |ctx| {
        ctx.alloc_buffer::<u8>(MemFlags::READ_WRITE, 8, CleanupPolicy::Managed)?;
        Ok(42)
    })
    .unwrap();

    assert_eq!(value, 42);
    let stats = env.api().stats();
    assert_eq!(stats.live_buffers(), 1);
    assert_eq!(stats.buffers_released, 0);
}

#[test]
fn run_checked_hands_back_registry_on_failure() {
    let env = host_env();
    let outcome = run_checked(&env, |ctx| {
        ctx.alloc_buffer::<f32>(MemFlags::READ_WRITE, 4, CleanupPolicy::Managed)?;
        Err::<(), _>(fail("bad launch"))
    });

    assert!(outcome.result.is_err());
    assert_eq!(outcome.cleanup.len(), 1);
    assert_eq!(env.api().stats().live_buffers(), 1);

    assert!(outcome.finish().is_err());
    assert_eq!(env.api().stats().live_buffers(), 0);
}

#[test]
fn run_checked_hands_back_registry_on_success() {
    let env = host_env();
    let outcome = run_checked(&env, |ctx| {
        let buffer = ctx.init_buffer(MemFlags::READ_WRITE, &[3u64, 4], CleanupPolicy::Managed)?;
        ctx.read_buffer(&buffer, 2, &[])
    });

    assert_eq!(outcome.cleanup.len(), 1);
    assert_eq!(outcome.finish().unwrap(), vec![3, 4]);
    assert_eq!(env.api().stats().live_buffers(), 0);
}

#[test]
fn swallowed_error_still_fails_the_run() {
    let env = host_env();
    let err = run(&env, |ctx| {
        let buffer = ctx.alloc_buffer::<i32>(MemFlags::READ_WRITE, 2, CleanupPolicy::Managed)?;
        let _ignored = ctx.read_buffer(&buffer, 3, &[]);
        Ok(())
    })
    .unwrap_err();

    match err {
        ContextError::Aborted { kind, cause } => {
            assert_eq!(kind, ErrorKind::Validation);
            assert!(cause.contains("requested 3 elements"));
        }
        other => panic!("expected aborted run, got {other:?}"),
    }
    assert_eq!(env.api().stats().live_buffers(), 0);
}

#[test]
fn run_or_abort_cleans_up_before_panicking() {
    let env = host_env();
    let result = catch_unwind(AssertUnwindSafe(|| {
        run_or_abort(&env, |ctx| {
            ctx.alloc_buffer::<i32>(MemFlags::READ_WRITE, 4, CleanupPolicy::Managed)?;
            Err::<(), _>(fail("device lost"))
        })
    }));

    assert!(result.is_err());
    assert_eq!(env.api().stats().live_buffers(), 0);
}

#[test]
fn run_or_abort_returns_value_on_success() {
    let env = host_env();
    let values = run_or_abort(&env, |ctx| {
        let buffer = ctx.init_buffer(MemFlags::READ_WRITE, &[1i32, 2, 3, 4], CleanupPolicy::Managed)?;
        ctx.read_buffer(&buffer, 4, &[])
    });
    assert_eq!(values, vec![1, 2, 3, 4]);
    assert_eq!(env.api().stats().live_buffers(), 0);
}
