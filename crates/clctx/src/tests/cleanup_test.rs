use std::{cell::Cell, cell::RefCell, rc::Rc};

use super::counting_action;
use crate::{CleanupRegistry, ContextError};

#[test]
fn run_executes_once_and_second_run_is_noop() {
    let counter = Rc::new(Cell::new(0));
    let mut registry = CleanupRegistry::new();
    let key = registry.register(counting_action(&counter));

    registry.run(key).unwrap();
    registry.run(key).unwrap();

    assert_eq!(counter.get(), 1);
    assert!(!registry.contains(key));
}

#[test]
fn unregistered_action_is_not_swept() {
    let counter = Rc::new(Cell::new(0));
    let mut registry = CleanupRegistry::new();
    let key = registry.register(counting_action(&counter));

    let action = registry.unregister(key);
    assert!(action.is_some());
    registry.sweep().unwrap();

    assert_eq!(counter.get(), 0);
    assert!(registry.unregister(key).is_none());
}

#[test]
fn keys_from_another_registry_are_absent() {
    let counter = Rc::new(Cell::new(0));
    let mut first = CleanupRegistry::new();
    let mut second = CleanupRegistry::new();
    let key = first.register(counting_action(&counter));
    second.register(counting_action(&counter));

    assert_eq!(key.index(), 0);
    assert!(!second.contains(key));
    assert!(second.unregister(key).is_none());
    second.run(key).unwrap();
    assert_eq!(counter.get(), 0);

    first.sweep().unwrap();
    second.sweep().unwrap();
    assert_eq!(counter.get(), 2);
}

#[test]
fn key_counter_never_decreases() {
    let counter = Rc::new(Cell::new(0));
    let mut registry = CleanupRegistry::new();
    let first = registry.register(counting_action(&counter));
    registry.run(first).unwrap();
    let second = registry.register(counting_action(&counter));

    assert!(second.index() > first.index());
    assert_eq!(registry.next_index(), 2);
    assert!(registry.keys().all(|key| key.index() < registry.next_index()));
    registry.sweep().unwrap();
}

#[test]
fn sweep_runs_everything_newest_first_and_reports_first_error() {
    let order = Rc::new(RefCell::new(Vec::new()));
    let mut registry = CleanupRegistry::new();
    for label in ["a", "b", "c"] {
        let order = Rc::clone(&order);
        registry.register(move || {
            order.borrow_mut().push(label);
            if label == "a" || label == "b" {
                return Err(ContextError::NativeCall {
                    call: "clReleaseMemObject",
                    message: format!("release {label} failed"),
                });
            }
            Ok(())
        });
    }

    let err = registry.sweep().unwrap_err();
    assert_eq!(*order.borrow(), vec!["c", "b", "a"]);
    assert!(err.to_string().contains("release b failed"));
    assert!(registry.is_empty());
}

#[test]
fn absorb_rekeys_into_receiving_registry() {
    let counter = Rc::new(Cell::new(0));
    let mut parent = CleanupRegistry::new();
    let mut child = CleanupRegistry::new();
    parent.register(counting_action(&counter));
    let child_key = child.register(counting_action(&counter));

    let moved = parent.absorb(child);
    assert_eq!(moved.len(), 1);
    let (old, new) = moved[0];
    assert_eq!(old, child_key);
    assert_eq!(new.registry_id(), parent.id());
    assert_eq!(new.index(), 1);
    assert!(!parent.contains(old));
    assert!(parent.contains(new));

    parent.sweep().unwrap();
    assert_eq!(counter.get(), 2);
}

#[test]
fn discard_drops_without_running() {
    let counter = Rc::new(Cell::new(0));
    let mut registry = CleanupRegistry::new();
    registry.register(counting_action(&counter));
    registry.register(counting_action(&counter));

    assert_eq!(registry.discard(), 2);
    assert_eq!(counter.get(), 0);
}

#[test]
fn failed_action_is_removed_before_running() {
    let mut registry = CleanupRegistry::new();
    let key = registry.register(|| {
        Err(ContextError::NativeCall {
            call: "clReleaseMemObject",
            message: "boom".to_string(),
        })
    });

    assert!(registry.run(key).is_err());
    assert!(registry.run(key).is_ok());
    assert!(registry.is_empty());
}
