//! E2E tests for the combinators under concurrent settlement.
//!
//! Each scenario settles children from separate threads released by a
//! barrier, then checks that the derived promise settled exactly once with
//! the outcome its combinator allows.

#[macro_use]
mod common;

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use common::{init_test_logging, settle_concurrently, settlement_counter, Plan};
use settle::test_logging::{TestEvent, TestLogLevel, TestLogger};
use settle::{combinator, Error, ErrorKind, Outcome, Promise, PromiseConfig};

const ITERATIONS: usize = 200;

fn pending(n: usize) -> Vec<Promise<u32>> {
    (0..n).map(|_| Promise::new()).collect()
}

#[test]
fn e2e_all_concurrent_success() {
    init_test_logging();
    test_phase!("e2e_all_concurrent_success");

    for round in 0..ITERATIONS {
        let children = pending(8);
        let parent = combinator::join_all_values(&children);
        let calls = settlement_counter(&parent);

        let plans: Vec<Plan> = (0..8).map(Plan::Succeed).collect();
        settle_concurrently(&children, &plans);

        let expected: Vec<u32> = (0..8).collect();
        assert_with_log!(
            parent.value() == Some(&expected),
            "values keep child order",
            expected,
            (round, parent.value())
        );
        assert_with_log!(
            calls.load(Ordering::SeqCst) == 1,
            "parent settles once",
            1,
            calls.load(Ordering::SeqCst)
        );
    }
}

#[test]
fn e2e_all_concurrent_failure_and_last_success() {
    init_test_logging();
    test_phase!("e2e_all_concurrent_failure_and_last_success");

    // One child fails while the other completes the countdown. Whichever
    // lands first decides; the parent never settles twice.
    for _ in 0..ITERATIONS {
        let children = pending(2);
        let parent = Promise::new();
        let calls = settlement_counter(&parent);
        combinator::all(&parent, &children);

        settle_concurrently(
            &children,
            &[Plan::Succeed(1), Plan::Fail("concurrent".into())],
        );

        assert_with_log!(
            !parent.is_pending(),
            "parent decided",
            "settled",
            "pending"
        );
        assert_with_log!(
            calls.load(Ordering::SeqCst) == 1,
            "exactly once",
            1,
            calls.load(Ordering::SeqCst)
        );
        // The failing child always settles before all children succeeded,
        // so the countdown never reaches zero.
        assert_with_log!(
            parent.is_failure(),
            "failure wins",
            "failure",
            parent.outcome()
        );
    }
}

#[test]
fn e2e_all_many_concurrent_failures() {
    init_test_logging();
    test_phase!("e2e_all_many_concurrent_failures");

    for _ in 0..ITERATIONS {
        let children = pending(6);
        let parent = Promise::new();
        let calls = settlement_counter(&parent);
        combinator::all(&parent, &children);

        let plans: Vec<Plan> = (0..6).map(|i| Plan::Fail(format!("child-{i}"))).collect();
        settle_concurrently(&children, &plans);

        let message = parent.cause().and_then(Error::message).unwrap_or_default();
        assert_with_log!(
            message.starts_with("child-"),
            "cause comes from a child",
            "child-N",
            message
        );
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}

#[test]
fn e2e_any_first_wins_under_contention() {
    init_test_logging();
    test_phase!("e2e_any_first_wins_under_contention");

    for _ in 0..ITERATIONS {
        let children = pending(6);
        let parent = combinator::race(&children);
        let calls = settlement_counter(&parent);

        let plans: Vec<Plan> = (0..6)
            .map(|i| {
                if i % 2 == 0 {
                    Plan::Succeed(i)
                } else {
                    Plan::Fail(format!("child-{i}"))
                }
            })
            .collect();
        settle_concurrently(&children, &plans);

        // The winner is some child; its outcome must match one of the plans.
        let decided = match parent.outcome() {
            Some(Outcome::Ok(v)) => plans.contains(&Plan::Succeed(*v)),
            Some(Outcome::Err(e)) => plans.contains(&Plan::Fail(
                e.message().unwrap_or_default().to_string(),
            )),
            None => false,
        };
        assert_with_log!(decided, "winner matches a child", true, parent.outcome());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}

#[test]
fn e2e_map_over_concurrent_join() {
    init_test_logging();
    test_phase!("e2e_map_over_concurrent_join");

    let children = pending(4);
    let total = combinator::join_all_values(&children).map(|values| values.iter().sum::<u32>());
    let plans: Vec<Plan> = [10, 20, 30, 40].into_iter().map(Plan::Succeed).collect();
    settle_concurrently(&children, &plans);

    assert_eq!(total.value(), Some(&100));
}

#[test]
fn e2e_map_failure_passthrough_across_threads() {
    init_test_logging();
    test_phase!("e2e_map_failure_passthrough_across_threads");

    let source: Promise<u32> = Promise::new();
    let derived = source.map(|v| v + 1);
    let settler = source.clone();
    let handle = thread::spawn(move || settler.reject(Error::user("remote failure")));
    assert!(handle.join().expect("settler panicked"));

    let outcome = derived
        .wait_timeout(Duration::from_secs(5))
        .expect("derived settles");
    let cause = outcome.cause().expect("failure passes through");
    assert_eq!(cause.kind(), ErrorKind::User);
    assert_eq!(cause.message(), Some("remote failure"));
}

#[test]
fn e2e_nested_combinators_settle_once() {
    init_test_logging();
    test_phase!("e2e_nested_combinators_settle_once");

    let logger = Arc::new(TestLogger::new(TestLogLevel::Debug));

    let left = pending(3);
    let right = pending(3);
    let left_all = combinator::join_all(&left);
    let right_all = combinator::join_all(&right);
    let first = combinator::race(&[left_all.clone(), right_all.clone()]);
    let labelled = first.map(|()| "one side finished");

    for promise in [&left_all, &right_all, &first] {
        logger.watch(promise);
    }
    logger.watch(&labelled);
    logger.log(TestEvent::CombinatorStart {
        kind: "any",
        children: 2,
    });

    let mut all_children = left.clone();
    all_children.extend(right.iter().cloned());
    let plans: Vec<Plan> = (0..6).map(Plan::Succeed).collect();
    settle_concurrently(&all_children, &plans);

    for promise in [&left_all, &right_all, &first] {
        logger.assert_settled_once(promise.id().get());
    }
    logger.assert_settled_once(labelled.id().get());
    settle::assert_eq_log!(logger, labelled.value(), Some(&"one side finished"));
    logger.assert_no_errors();
}

#[test]
fn e2e_blocking_wait_on_join() {
    init_test_logging();
    test_phase!("e2e_blocking_wait_on_join");

    let children = pending(3);
    let parent = combinator::join_all(&children);

    let handles: Vec<_> = children
        .iter()
        .cloned()
        .enumerate()
        .map(|(i, child)| {
            thread::spawn(move || {
                thread::sleep(Duration::from_millis(2 * i as u64));
                child.resolve(u32::try_from(i).unwrap_or_default());
            })
        })
        .collect();

    let outcome = parent.wait();
    for handle in handles {
        handle.join().expect("settler panicked");
    }
    assert!(outcome.is_ok());
}

#[test]
fn e2e_settled_future_resolves_from_another_thread() {
    init_test_logging();
    test_phase!("e2e_settled_future_resolves_from_another_thread");

    let children = pending(2);
    let parent = combinator::race(&children);
    let settler = children[1].clone();
    let handle = thread::spawn(move || {
        thread::sleep(Duration::from_millis(5));
        settler.resolve(7);
    });

    let outcome = futures_lite::future::block_on(parent.settled());
    handle.join().expect("settler panicked");
    assert_eq!(outcome.value(), Some(&7));
}

#[test]
fn e2e_listener_panic_does_not_break_combinator() {
    init_test_logging();
    test_phase!("e2e_listener_panic_does_not_break_combinator");

    let children = pending(2);
    children[0].on_complete(|_| panic!("user listener bug"));
    let parent = combinator::join_all(&children);

    children[0].resolve(1);
    children[1].resolve(2);
    assert!(parent.is_success());
}

#[test]
fn e2e_reraised_listener_panic_does_not_strand_combinators() {
    init_test_logging();
    test_phase!("e2e_reraised_listener_panic_does_not_strand_combinators");

    let config = PromiseConfig::new().catch_listener_panics(false);
    let child: Promise<u32> = Promise::with_config(&config);
    child.on_complete(|_| panic!("user listener bug"));
    let joined = combinator::join_all(&[child.clone()]);
    let raced = combinator::race(&[child.clone()]);
    let mapped = child.map(|v| v * 2);

    let settler = child.clone();
    let handle = thread::spawn(move || settler.resolve(21));
    let panicked = handle.join().is_err();

    assert_with_log!(panicked, "panic reaches the settling thread", true, panicked);
    assert!(child.is_success());
    assert!(joined.is_success());
    assert_eq!(raced.value(), Some(&21));
    assert_eq!(mapped.value(), Some(&42));
}

#[test]
fn e2e_config_flows_to_derived_promises() {
    init_test_logging();
    test_phase!("e2e_config_flows_to_derived_promises");

    let config = PromiseConfig::new()
        .listener_warn_threshold(4)
        .catch_transform_panics(false);
    let children: Vec<Promise<u32>> = (0..2).map(|_| Promise::with_config(&config)).collect();

    let joined = combinator::join_all_values(&children);
    let raced = combinator::race(&children);
    let mapped = raced.map(|v| v * 2);

    for derived in [joined.config(), raced.config(), mapped.config()] {
        assert_eq!(derived.listener_warn_threshold, 4);
        assert!(!derived.catch_transform_panics);
    }
}
