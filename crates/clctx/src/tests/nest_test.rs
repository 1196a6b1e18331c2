use std::{cell::Cell, rc::Rc};

use super::{VEC_KERNELS, counting_action, host_env};
use crate::{CleanupPolicy, Context, ContextError, MemFlags, ProgramSource};

#[test]
fn nested_registry_is_disjoint_from_parent() {
    let parent_runs = Rc::new(Cell::new(0));
    let child_runs = Rc::new(Cell::new(0));
    let mut ctx = Context::new(host_env());
    let parent_key = ctx.register_cleanup(counting_action(&parent_runs));

    let (child_key, child) = ctx
        .nest(|ctx| {
            assert_eq!(ctx.pending_cleanups(), 0);
            Ok(ctx.register_cleanup(counting_action(&child_runs)))
        })
        .unwrap();

    assert!(child.contains(child_key));
    assert!(!child.contains(parent_key));
    assert!(!ctx.cleanup().contains(child_key));
    assert_eq!(ctx.pending_cleanups(), 1);

    ctx.sweep_cleanup().unwrap();
    assert_eq!(parent_runs.get(), 1);
    assert_eq!(child_runs.get(), 0);

    child.run_all().unwrap();
    assert_eq!(child_runs.get(), 1);
}

#[test]
fn nested_computation_shares_the_cache() {
    let env = host_env();
    let source = ProgramSource::source(VEC_KERNELS);
    let mut ctx = Context::new(env.clone());
    ctx.get_kernel(&source, "add").unwrap();

    let (_, child) = ctx.nest(|ctx| ctx.get_kernel(&source, "scale")).unwrap();
    child.run_all().unwrap();

    assert_eq!(env.api().stats().programs_built, 1);
    assert_eq!(ctx.cache_stats().kernels, 2);
}

#[test]
fn nested_failure_runs_child_cleanup_and_fails_parent() {
    let env = host_env();
    let parent_runs = Rc::new(Cell::new(0));
    let child_runs = Rc::new(Cell::new(0));
    let mut ctx = Context::new(env.clone());
    ctx.register_cleanup(counting_action(&parent_runs));

    let err = ctx
        .nest(|ctx| {
            ctx.register_cleanup(counting_action(&child_runs));
            ctx.alloc_buffer::<i32>(MemFlags::READ_WRITE, 4, CleanupPolicy::Managed)?;
            Err::<(), _>(ContextError::EventWait("queue flushed".to_string()))
        })
        .unwrap_err();

    assert!(matches!(err, ContextError::EventWait(_)));
    assert_eq!(child_runs.get(), 1);
    assert_eq!(env.api().stats().live_buffers(), 0);
    assert_eq!(parent_runs.get(), 0);
    assert_eq!(ctx.pending_cleanups(), 1);
    assert!(ctx.failure().unwrap().contains("queue flushed"));

    let refused = ctx.nest(|_| Ok(())).unwrap_err();
    assert!(matches!(refused, ContextError::Aborted { .. }));
    ctx.sweep_cleanup().unwrap();
    assert_eq!(parent_runs.get(), 1);
}

#[test]
fn adopted_actions_run_exactly_once_from_parent_sweep() {
    let child_runs = Rc::new(Cell::new(0));
    let mut ctx = Context::new(host_env());
    ctx.register_cleanup(counting_action(&child_runs));

    let (old_key, child) = ctx.nest(|ctx| Ok(ctx.register_cleanup(counting_action(&child_runs)))).unwrap();
    let moved = ctx.adopt_cleanup(child);
    assert_eq!(moved.len(), 1);
    assert_eq!(moved[0].0, old_key);

    ctx.run_cleanup(old_key).unwrap();
    assert_eq!(child_runs.get(), 0);

    ctx.sweep_cleanup().unwrap();
    assert_eq!(child_runs.get(), 2);
    ctx.sweep_cleanup().unwrap();
    assert_eq!(child_runs.get(), 2);
}

#[test]
fn nested_buffers_outlive_the_nest_until_released() {
    let env = host_env();
    let mut ctx = Context::new(env.clone());
    let (buffer, child) = ctx
        .nest(|ctx| ctx.init_buffer(MemFlags::READ_WRITE, &[10i32, 20, 30], CleanupPolicy::Managed))
        .unwrap();

    assert_eq!(ctx.read_buffer(&buffer, 3, &[]).unwrap(), vec![10, 20, 30]);
    assert!(child.contains(buffer.cleanup_key().unwrap()));
    child.run_all().unwrap();
    assert_eq!(env.api().stats().live_buffers(), 0);
}

#[test]
fn releasing_a_nested_buffer_disarms_its_child_entry() {
    let env = host_env();
    let mut ctx = Context::new(env.clone());
    let (buffer, child) = ctx
        .nest(|ctx| ctx.alloc_buffer::<u32>(MemFlags::READ_WRITE, 8, CleanupPolicy::Managed))
        .unwrap();

    ctx.release_buffer(buffer).unwrap();
    assert_eq!(env.api().stats().live_buffers(), 0);
    assert_eq!(child.len(), 1);

    child.run_all().unwrap();
    let stats = env.api().stats();
    assert_eq!(stats.buffers_released, 1);
    assert!(ctx.failure().is_none());
}

#[test]
fn releasing_an_adopted_buffer_skips_the_rekeyed_entry() {
    let env = host_env();
    let mut ctx = Context::new(env.clone());
    let (buffer, child) = ctx
        .nest(|ctx| ctx.alloc_buffer::<f32>(MemFlags::READ_WRITE, 4, CleanupPolicy::Managed))
        .unwrap();
    let moved = ctx.adopt_cleanup(child);
    assert_eq!(moved[0].0, buffer.cleanup_key().unwrap());

    ctx.release_buffer(buffer).unwrap();
    assert_eq!(ctx.pending_cleanups(), 1);

    ctx.sweep_cleanup().unwrap();
    assert_eq!(env.api().stats().buffers_released, 1);
    assert_eq!(env.api().stats().live_buffers(), 0);
    assert!(ctx.failure().is_none());
}

#[test]
fn release_after_sweep_is_a_no_op() {
    let env = host_env();
    let mut ctx = Context::new(env.clone());
    let (buffer, child) = ctx
        .nest(|ctx| ctx.alloc_buffer::<i64>(MemFlags::READ_WRITE, 2, CleanupPolicy::Managed))
        .unwrap();

    child.run_all().unwrap();
    ctx.release_buffer(buffer).unwrap();
    assert_eq!(env.api().stats().buffers_released, 1);
    assert!(ctx.failure().is_none());
}
