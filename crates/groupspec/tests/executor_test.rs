use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::sync::Arc;

use groupspec::{
    build_suite, ExecutableTestGroup, TestCaseType, TestError, TestsGroup,
    TestsGroupNodeAccumulator, TestsGroupNodeExecutor, TreeNode,
};

type Log = Rc<RefCell<Vec<String>>>;

fn log() -> Log {
    Rc::new(RefCell::new(Vec::new()))
}

fn push(log: &Log, entry: &'static str) -> impl Fn() + 'static {
    let log = Rc::clone(log);
    move || log.borrow_mut().push(entry.to_string())
}

fn push_and_fail(log: &Log, entry: &'static str) -> impl Fn() -> Result<(), String> + 'static {
    let log = Rc::clone(log);
    move || {
        log.borrow_mut().push(entry.to_string());
        Err(format!("{entry} failed"))
    }
}

fn entries(log: &Log) -> Vec<String> {
    log.borrow().clone()
}

fn message(error: &TestError) -> Option<String> {
    error.thrown().and_then(|t| t.message()).map(str::to_string)
}

/// Drive every group the way a host would; returns `(test, outcome)` pairs.
fn drive(root: Rc<TreeNode<TestsGroup>>) -> Vec<(String, Option<Result<(), String>>)> {
    let executor = TestsGroupNodeExecutor::for_root(root);
    let mut outcomes = Vec::new();
    for group in executor.executable_test_groups() {
        drive_group(&group, &mut outcomes);
    }
    outcomes
}

fn drive_group(group: &ExecutableTestGroup, outcomes: &mut Vec<(String, Option<Result<(), String>>)>) {
    let before_alls_error = group.before_all()().err().map(Arc::new);
    for case in group.test_cases(before_alls_error) {
        let outcome = case.execute().map(|r| r.map_err(|e| e.to_string()));
        outcomes.push((case.description().to_string(), outcome));
    }
    let _ = group.after_all()();
}

// ============================================================================
// Aggregate counts
// ============================================================================

fn check_counts(node: &TreeNode<TestsGroup>) -> (usize, bool) {
    let mut total = node.value.test_cases().len();
    let mut focused = node
        .value
        .test_cases()
        .iter()
        .any(|t| t.test_type() == TestCaseType::Focused);
    for child in node.children().iter() {
        let (child_total, child_focused) = check_counts(child);
        total += child_total;
        focused |= child_focused;
    }
    assert_eq!(node.value.tests_in_tree(), total, "{}", node.value.description());
    assert_eq!(
        node.value.contains_focused_tests(),
        focused,
        "{}",
        node.value.description()
    );
    (total, focused)
}

#[test]
fn tests_in_tree_and_focus_flag_hold_at_every_node() {
    let root = build_suite("root", |ctx| {
        ctx.it("a", || {});
        ctx.describe("one", |ctx| {
            ctx.it("b", || {});
            ctx.describe("two", |ctx| {
                ctx.fit("c", || {});
                ctx.it_params("d %1", |_: &u8| {}).provided([1, 2]);
            });
            ctx.describe("empty", |_| {});
        });
        ctx.describe("three", |ctx| {
            ctx.it("e", || {});
        });
    });

    let (total, focused) = check_counts(&root);
    assert_eq!(total, 6);
    assert!(focused);
}

// ============================================================================
// Fixture ordering and error precedence
// ============================================================================

#[test]
fn each_fixtures_run_around_the_body_in_ancestor_order() {
    let calls = log();
    let root = build_suite("", |ctx| {
        ctx.describe("parent", |ctx| {
            ctx.before_each(push(&calls, "p1"));
            ctx.before_each(push(&calls, "p2"));
            ctx.after_each(push(&calls, "p-after1"));
            ctx.after_each(push(&calls, "p-after2"));

            ctx.describe("child", |ctx| {
                ctx.before_each(push(&calls, "c1"));
                ctx.before_each(push(&calls, "c2"));
                ctx.after_each(push(&calls, "c-after1"));
                ctx.after_each(push(&calls, "c-after2"));
                ctx.it("test", push(&calls, "body"));
            });
        });
    });

    let outcomes = drive(root);
    assert_eq!(outcomes, vec![("test".to_string(), Some(Ok(())))]);
    assert_eq!(
        entries(&calls),
        vec!["p1", "p2", "c1", "c2", "body", "c-after1", "c-after2", "p-after1", "p-after2"]
    );
}

#[test]
fn outermost_before_failure_wins_but_every_before_runs() {
    let calls = log();
    let child_ran = Rc::new(Cell::new(0));
    let root = build_suite("", |ctx| {
        ctx.describe("parent", |ctx| {
            ctx.before_each(push_and_fail(&calls, "p1"));
            ctx.describe("child", |ctx| {
                let child_ran = Rc::clone(&child_ran);
                ctx.before_each(move || -> Result<(), String> {
                    child_ran.set(child_ran.get() + 1);
                    Err("c1 failed".to_string())
                });
                ctx.after_each(push(&calls, "after"));
                ctx.it("test", push(&calls, "body"));
            });
        });
    });

    let outcomes = drive(root);
    assert_eq!(child_ran.get(), 1);
    assert_eq!(entries(&calls), vec!["p1", "after"]);
    assert_eq!(
        outcomes,
        vec![(
            "test".to_string(),
            Some(Err("before_each failed: p1 failed".to_string()))
        )]
    );
}

#[test]
fn innermost_after_failure_wins_and_outer_teardown_runs() {
    let calls = log();
    let root = build_suite("", |ctx| {
        ctx.describe("parent", |ctx| {
            ctx.after_each(push_and_fail(&calls, "outer after"));
            ctx.describe("child", |ctx| {
                ctx.after_each(push_and_fail(&calls, "inner after"));
                ctx.it("test", || {});
            });
        });
    });

    let outcomes = drive(root);
    assert_eq!(entries(&calls), vec!["inner after", "outer after"]);
    assert_eq!(
        outcomes[0].1,
        Some(Err("after_each failed: inner after failed".to_string()))
    );
}

#[test]
fn body_failure_takes_precedence_over_after_failure() {
    let calls = log();
    let root = build_suite("", |ctx| {
        ctx.describe("g", |ctx| {
            ctx.after_each(push_and_fail(&calls, "after"));
            ctx.it::<()>("test", || {
                panic!("body broke");
            });
        });
    });

    let outcomes = drive(root);
    assert_eq!(entries(&calls), vec!["after"]);
    assert_eq!(outcomes[0].1, Some(Err("body broke".to_string())));
}

#[test]
fn after_failure_is_reported_when_body_passes() {
    let calls = log();
    let root = build_suite("", |ctx| {
        ctx.describe("g", |ctx| {
            ctx.after_each(push_and_fail(&calls, "after"));
            ctx.it("test", || {});
        });
    });
    let outcomes = drive(root);
    assert_eq!(
        outcomes[0].1,
        Some(Err("after_each failed: after failed".to_string()))
    );
}

#[test]
fn all_fixtures_chain_across_ancestors() {
    let calls = log();
    let root = build_suite("", |ctx| {
        ctx.describe("outer", |ctx| {
            ctx.before_all(push(&calls, "outer before_all"));
            ctx.after_all(push(&calls, "outer after_all"));
            ctx.describe("inner", |ctx| {
                ctx.before_all(push(&calls, "inner before_all"));
                ctx.after_all(push(&calls, "inner after_all"));
                ctx.it("test", push(&calls, "body"));
            });
        });
    });

    drive(root);
    assert_eq!(
        entries(&calls),
        vec![
            "outer before_all",
            "inner before_all",
            "body",
            "inner after_all",
            "outer after_all"
        ]
    );
}

// ============================================================================
// before_all failures
// ============================================================================

#[test]
fn failing_before_all_fails_every_test_without_running_them() {
    let calls = log();
    let root = build_suite("", |ctx| {
        ctx.describe("g", |ctx| {
            ctx.before_all(push_and_fail(&calls, "setup"));
            ctx.before_all(push(&calls, "second setup"));
            ctx.after_all(push(&calls, "teardown"));
            ctx.before_each(push(&calls, "before_each"));
            ctx.it("one", push(&calls, "one"));
            ctx.it("two", push(&calls, "two"));
        });
    });

    let executor = TestsGroupNodeExecutor::for_root(root);
    let groups = executor.executable_test_groups();
    assert_eq!(groups.len(), 1);

    let error = groups[0].before_all()().unwrap_err();
    let error = Arc::new(error);
    let results: Vec<TestError> = groups[0]
        .test_cases(Some(Arc::clone(&error)))
        .iter()
        .map(|c| c.execute().unwrap().unwrap_err())
        .collect();
    assert!(groups[0].after_all()().is_ok());

    assert_eq!(results.len(), 2);
    for result in &results {
        match result {
            TestError::Upstream(source) => assert!(Arc::ptr_eq(source, &error)),
            other => panic!("expected upstream failure, got {other}"),
        }
        assert_eq!(message(result).as_deref(), Some("setup failed"));
    }
    assert_eq!(entries(&calls), vec!["setup", "second setup", "teardown"]);
}

// ============================================================================
// Focus / ignore filtering
// ============================================================================

#[test]
fn focused_tests_exclude_everything_else() {
    let calls = log();
    let root = build_suite("", |ctx| {
        ctx.describe("g", |ctx| {
            ctx.it("normal", push(&calls, "normal"));
            ctx.fit("focused", push(&calls, "focused"));
            ctx.xit("ignored", push(&calls, "ignored"));
        });
        ctx.describe("other", |ctx| {
            ctx.before_all(push(&calls, "other before_all"));
            ctx.it("unfocused", push(&calls, "unfocused"));
        });
    });

    let outcomes = drive(root);
    assert_eq!(
        outcomes,
        vec![
            ("normal".to_string(), None),
            ("focused".to_string(), Some(Ok(()))),
            ("ignored".to_string(), None),
            ("unfocused".to_string(), None),
        ]
    );
    // the all-skipped group pays no setup cost
    assert_eq!(entries(&calls), vec!["focused"]);
}

#[test]
fn ignored_tests_never_run_even_without_focus() {
    let calls = log();
    let mut acc = TestsGroupNodeAccumulator::new("g", TestCaseType::Normal);
    acc.add_positive_test("ignored", push(&calls, "ignored"), TestCaseType::Ignored);
    acc.add_positive_test("normal", push(&calls, "normal"), TestCaseType::Normal);

    let executor = TestsGroupNodeExecutor::new(acc.build(), false);
    let cases = executor.executable_test_cases(None);
    assert!(cases[0].is_skipped());
    assert!(cases[0].execute().is_none());
    assert!(matches!(cases[1].execute(), Some(Ok(()))));
    assert_eq!(entries(&calls), vec!["normal"]);
}

#[test]
fn ignored_group_is_discovered_but_nothing_runs() {
    let calls = log();
    let root = build_suite("", |ctx| {
        ctx.xdescribe("ignored", |ctx| {
            ctx.before_all(push(&calls, "before_all"));
            ctx.after_all(push(&calls, "after_all"));
            ctx.it("a", push(&calls, "a"));
            ctx.it("b", push(&calls, "b"));
            ctx.it("c", push(&calls, "c"));
        });
    });

    let executor = TestsGroupNodeExecutor::for_root(root);
    let groups = executor.executable_test_groups();
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].description(), "ignored");

    assert!(groups[0].before_all()().is_ok());
    let cases = groups[0].test_cases(None);
    assert_eq!(cases.len(), 3);
    assert!(cases.iter().all(|c| c.is_skipped()));
    assert!(groups[0].after_all()().is_ok());
    assert!(entries(&calls).is_empty());
}

// ============================================================================
// Discovery
// ============================================================================

#[test]
fn discovery_is_depth_first_and_skips_empty_subtrees() {
    let root = build_suite("", |ctx| {
        ctx.describe("a", |ctx| {
            ctx.it("a1", || {});
            ctx.describe("a-empty", |ctx| {
                ctx.describe("a-empty-nested", |_| {});
            });
            ctx.describe("a-only-children", |ctx| {
                ctx.describe("a-leaf", |ctx| {
                    ctx.it("leaf", || {});
                });
            });
        });
        ctx.describe("b", |ctx| {
            ctx.it("b1", || {});
        });
    });

    let executor = TestsGroupNodeExecutor::for_root(root);
    let paths: Vec<String> = executor
        .executable_test_groups()
        .iter()
        .map(|g| g.path().join(" > "))
        .collect();
    assert_eq!(paths, vec!["a", "a > a-only-children > a-leaf", "b"]);
}

// ============================================================================
// Scenarios
// ============================================================================

#[test]
fn math_scenario() {
    let init_log = Rc::new(Cell::new(0));
    let root = build_suite("", |ctx| {
        ctx.describe("Math", |ctx| {
            let init_log = Rc::clone(&init_log);
            ctx.before_all(move || init_log.set(init_log.get() + 1));
            ctx.it("adds", || assert!(1 + 2 == 3));
            ctx.it::<()>("fails", || {
                panic!("boom");
            });
        });
    });

    let executor = TestsGroupNodeExecutor::for_root(root);
    let groups = executor.executable_test_groups();
    assert_eq!(groups.len(), 1);

    let before_alls_error = groups[0].before_all()().err().map(Arc::new);
    assert!(before_alls_error.is_none());
    let cases = groups[0].test_cases(before_alls_error);
    assert_eq!(cases.len(), 2);

    assert!(matches!(cases[0].execute(), Some(Ok(()))));
    match cases[1].execute() {
        Some(Err(TestError::Body(thrown))) => {
            assert_eq!(thrown.message(), Some("boom"));
            assert_eq!(thrown.downcast_ref::<String>().map(String::as_str), Some("boom"));
        }
        other => panic!("unexpected outcome: {other:?}"),
    }
    assert!(groups[0].after_all()().is_ok());
    assert_eq!(init_log.get(), 1);
}

#[test]
fn parametrized_scenario() {
    let root = build_suite("", |ctx| {
        ctx.describe("params", |ctx| {
            ctx.it_params("accepts", |v: &i32| assert!(*v > 0))
                .provided([1, 2, 3]);
        });
    });

    let outcomes = drive(root);
    assert_eq!(
        outcomes,
        vec![
            ("accepts [1]".to_string(), Some(Ok(()))),
            ("accepts [2]".to_string(), Some(Ok(()))),
            ("accepts [3]".to_string(), Some(Ok(()))),
        ]
    );
}

// ============================================================================
// Exception tests
// ============================================================================

#[derive(Debug)]
struct Overdrawn {
    by: u32,
}

impl std::fmt::Display for Overdrawn {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "overdrawn by {}", self.by)
    }
}

impl std::error::Error for Overdrawn {}

fn withdraw(balance: u32, amount: u32) -> Result<u32, Overdrawn> {
    balance.checked_sub(amount).ok_or_else(|| Overdrawn {
        by: amount - balance,
    })
}

#[test]
fn exception_tests_check_type_and_every_predicate() {
    let root = build_suite("", |ctx| {
        ctx.describe("account", |ctx| {
            ctx.it_throws::<Overdrawn, _>("returned error", || withdraw(5, 8).map(|_| ()))
                .satisfying("by three", |e| e.by == 3)
                .with_message("overdrawn by 3")
                .without_cause();

            ctx.it_throws::<Overdrawn, ()>("panicked error", || {
                std::panic::panic_any(Overdrawn { by: 1 });
            })
            .satisfying("by one", |e| e.by == 1);

            ctx.it_throws::<Overdrawn, _>("rejected by predicate", || withdraw(1, 2).map(|_| ()))
                .satisfying("by one", |e| e.by == 1)
                .satisfying("by ten", |e| e.by == 10);

            ctx.it_throws::<Overdrawn, _>("nothing thrown", || withdraw(9, 2).map(|_| ()));

            ctx.it_throws::<Overdrawn, ()>("wrong type", || {
                panic!("not an overdraft");
            });
        });
    });

    let outcomes = drive(root);
    assert_eq!(outcomes[0], ("returned error".to_string(), Some(Ok(()))));
    assert_eq!(outcomes[1], ("panicked error".to_string(), Some(Ok(()))));

    let failure = |i: usize| match &outcomes[i].1 {
        Some(Err(msg)) => msg.clone(),
        other => panic!("expected failure for {}, got {other:?}", outcomes[i].0),
    };
    assert!(failure(2).contains("by ten"), "{}", failure(2));
    assert!(failure(3).contains("nothing was thrown"), "{}", failure(3));
    assert!(failure(4).contains("not an overdraft"), "{}", failure(4));
}

#[test]
fn exception_mismatch_is_an_expectation_error() {
    let mut acc = TestsGroupNodeAccumulator::new("g", TestCaseType::Normal);
    let _ = acc.add_exception_test::<String, _>("quiet", || {}, TestCaseType::Normal);
    let executor = TestsGroupNodeExecutor::for_root(acc.build());
    let cases = executor.executable_test_cases(None);
    assert!(matches!(
        cases[0].execute(),
        Some(Err(TestError::ExpectationMismatch(_)))
    ));
}

#[test]
fn parametrized_exception_tests_share_expectations() {
    let root = build_suite("", |ctx| {
        ctx.describe("withdraw", |ctx| {
            ctx.it_throws_params::<Overdrawn, _, _>("withdrawing %1 from 5", |amount: &u32| {
                withdraw(5, *amount).map(|_| ())
            })
            .provided([6, 7])
            .satisfying("overdrawn by at most two", |e| e.by <= 2);
        });
    });

    let outcomes = drive(root);
    assert_eq!(
        outcomes,
        vec![
            ("withdrawing 6 from 5".to_string(), Some(Ok(()))),
            ("withdrawing 7 from 5".to_string(), Some(Ok(()))),
        ]
    );
}

// ============================================================================
// Reporting counters
// ============================================================================

#[test]
fn ancestor_fixture_counts_cover_whole_subtree() {
    let root = build_suite("", |ctx| {
        ctx.describe("outer", |ctx| {
            ctx.before_all(|| {});
            ctx.after_all(|| {});
            ctx.after_all(|| {});
            ctx.describe("inner", |ctx| {
                ctx.before_all(|| {});
                ctx.describe("innermost", |ctx| {
                    ctx.it("t", || {});
                });
            });
        });
    });

    let outer = Rc::clone(&root.children()[0]);
    let inner = Rc::clone(&outer.children()[0]);
    let innermost = Rc::clone(&inner.children()[0]);
    assert_eq!(
        (outer.value.ancestor_before_alls(), outer.value.ancestor_after_alls()),
        (0, 0)
    );
    assert_eq!(
        (inner.value.ancestor_before_alls(), inner.value.ancestor_after_alls()),
        (1, 2)
    );
    assert_eq!(
        (
            innermost.value.ancestor_before_alls(),
            innermost.value.ancestor_after_alls()
        ),
        (2, 2)
    );
}
