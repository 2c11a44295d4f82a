//! Walks a frozen tree and hands runnable units to the host.
//!
//! Fixture chains run in two directions:
//!
//! ```text
//! before_all / before_each   root -> ... -> group   outermost failure reported
//! after_each / after_all     group -> ... -> root   innermost failure reported
//! ```
//!
//! Every fixture in every list always runs; within one list the first failure
//! is kept.

use std::rc::Rc;
use std::sync::Arc;

use crate::error::{invoke, FixtureKind, TestClosure, TestError};
use crate::group::TestsGroup;
use crate::test_case::SingleTestCase;
use crate::test_case_type::TestCaseType;
use crate::tree::TreeNode;

/// A deferred operation returning the failure it produced, if any.
pub type Executable = Box<dyn Fn() -> Result<(), TestError>>;

type Node = Rc<TreeNode<TestsGroup>>;

/// Executes the group held at one tree node.
#[derive(Clone)]
pub struct TestsGroupNodeExecutor {
    // keeps every ancestor alive while only weak parent links point upwards
    root: Node,
    node: Node,
    run_only_focused_tests: bool,
}

impl TestsGroupNodeExecutor {
    pub fn new(node: Node, run_only_focused_tests: bool) -> Self {
        let mut root = Rc::clone(&node);
        while let Some(parent) = root.parent() {
            root = parent;
        }
        TestsGroupNodeExecutor {
            root,
            node,
            run_only_focused_tests,
        }
    }

    /// An executor over a root node, running only focused tests when the tree
    /// contains any.
    pub fn for_root(root: Node) -> Self {
        let run_only_focused_tests = root.value.contains_focused_tests;
        Self::new(root, run_only_focused_tests)
    }

    pub fn node(&self) -> &Node {
        &self.node
    }

    pub fn run_only_focused_tests(&self) -> bool {
        self.run_only_focused_tests
    }

    fn child(&self, node: Node) -> Self {
        TestsGroupNodeExecutor {
            root: Rc::clone(&self.root),
            node,
            run_only_focused_tests: self.run_only_focused_tests,
        }
    }

    // ---- Discovery -----------------------------------------------------------

    /// One group per node with direct test cases, depth-first in registration
    /// order. Subtrees without any tests are never surfaced.
    pub fn executable_test_groups(&self) -> Vec<ExecutableTestGroup> {
        let mut groups = Vec::new();
        if !self.node.value.test_cases.is_empty() {
            groups.push(ExecutableTestGroup {
                executor: self.clone(),
            });
        }
        groups.extend(self.subgroup_executable_test_groups());
        groups
    }

    fn subgroup_executable_test_groups(&self) -> Vec<ExecutableTestGroup> {
        self.node
            .children()
            .iter()
            .filter(|child| child.value.tests_in_tree > 0)
            .flat_map(|child| self.child(Rc::clone(child)).executable_test_groups())
            .collect()
    }

    // ---- Test cases ----------------------------------------------------------

    /// One entry per direct test case. Ignored tests carry no executable.
    pub fn executable_test_cases(
        &self,
        before_alls_error: Option<Arc<TestError>>,
    ) -> Vec<ExecutableTestCase> {
        self.test_cases()
            .iter()
            .enumerate()
            .map(|(index, test_case)| {
                let run = if self.should_ignore_test(test_case) {
                    tracing::debug!(test = test_case.description(), "test is skipped");
                    None
                } else {
                    let executor = self.clone();
                    let before_alls_error = before_alls_error.clone();
                    let run: Executable = Box::new(move || match &before_alls_error {
                        Some(error) => Err(TestError::Upstream(Arc::clone(error))),
                        None => executor.run_single_test_case(index),
                    });
                    Some(run)
                };
                ExecutableTestCase {
                    description: test_case.description().to_string(),
                    test_type: test_case.test_type(),
                    labels: test_case.labels(),
                    run,
                }
            })
            .collect()
    }

    fn test_cases(&self) -> &[SingleTestCase] {
        &self.node.value.test_cases
    }

    fn should_ignore_test(&self, test_case: &SingleTestCase) -> bool {
        let test_type = test_case.test_type();
        test_type.is_ignored() || (self.run_only_focused_tests && !test_type.is_focused())
    }

    fn all_tests_in_group_are_ignored(&self) -> bool {
        self.test_cases().iter().all(|t| self.should_ignore_test(t))
    }

    fn run_single_test_case(&self, index: usize) -> Result<(), TestError> {
        let test_case = &self.test_cases()[index];

        let befores = invoke_ancestors_first(&self.node, FixtureKind::BeforeEach);
        // the body only runs when every before_each succeeded
        let outcome = befores.and_then(|()| test_case.exercise());
        let afters = invoke_ancestors_last(&self.node, FixtureKind::AfterEach);
        let result = outcome.and(afters);

        if let Err(error) = &result {
            tracing::debug!(test = test_case.description(), %error, "test failed");
        }
        result
    }

    // ---- All-tests fixtures --------------------------------------------------

    pub fn before_alls_executable(&self) -> Executable {
        let executor = self.clone();
        Box::new(move || {
            if executor.all_tests_in_group_are_ignored() {
                Ok(())
            } else {
                invoke_ancestors_first(&executor.node, FixtureKind::BeforeAll)
            }
        })
    }

    pub fn after_alls_executable(&self) -> Executable {
        let executor = self.clone();
        Box::new(move || {
            if executor.all_tests_in_group_are_ignored() {
                Ok(())
            } else {
                invoke_ancestors_last(&executor.node, FixtureKind::AfterAll)
            }
        })
    }
}

// ============================================================================
// Fixture chains
// ============================================================================

fn fixtures(group: &TestsGroup, kind: FixtureKind) -> &[TestClosure] {
    match kind {
        FixtureKind::BeforeAll => &group.before_alls,
        FixtureKind::BeforeEach => &group.befores,
        FixtureKind::AfterEach => &group.afters,
        FixtureKind::AfterAll => &group.after_alls,
    }
}

fn invoke_ancestors_first(node: &Node, kind: FixtureKind) -> Result<(), TestError> {
    let ancestors = match node.parent() {
        Some(parent) => invoke_ancestors_first(&parent, kind),
        None => Ok(()),
    };
    let own = invoke_fixtures(&node.value, kind);
    ancestors.and(own)
}

fn invoke_ancestors_last(node: &Node, kind: FixtureKind) -> Result<(), TestError> {
    let own = invoke_fixtures(&node.value, kind);
    let ancestors = match node.parent() {
        Some(parent) => invoke_ancestors_last(&parent, kind),
        None => Ok(()),
    };
    own.and(ancestors)
}

fn invoke_fixtures(group: &TestsGroup, kind: FixtureKind) -> Result<(), TestError> {
    let list = fixtures(group, kind);
    tracing::trace!(group = %group.description, %kind, count = list.len(), "invoking fixtures");

    let mut first_error = None;
    for fixture in list {
        if let Err(thrown) = invoke(fixture) {
            tracing::debug!(group = %group.description, %kind, %thrown, "fixture failed");
            if first_error.is_none() {
                first_error = Some(TestError::Fixture { kind, thrown });
            }
        }
    }
    first_error.map_or(Ok(()), Err)
}

// ============================================================================
// Runnable units handed to the host
// ============================================================================

/// A test case as seen by the host. `execute` is `None` for skipped tests.
pub struct ExecutableTestCase {
    description: String,
    test_type: TestCaseType,
    labels: Vec<String>,
    run: Option<Executable>,
}

impl ExecutableTestCase {
    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn test_type(&self) -> TestCaseType {
        self.test_type
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn is_skipped(&self) -> bool {
        self.run.is_none()
    }

    /// Run the test. `None` when the test is skipped.
    pub fn execute(&self) -> Option<Result<(), TestError>> {
        self.run.as_ref().map(|run| run())
    }
}

/// A group with at least one direct test case, ready for the host to drive:
/// call [`before_all`](Self::before_all) once, run the cases produced by
/// [`test_cases`](Self::test_cases), then call [`after_all`](Self::after_all).
pub struct ExecutableTestGroup {
    executor: TestsGroupNodeExecutor,
}

impl ExecutableTestGroup {
    pub fn description(&self) -> &str {
        &self.executor.node.value.description
    }

    /// Descriptions from the outermost named group down to this one.
    pub fn path(&self) -> Vec<String> {
        let mut path = Vec::new();
        let mut current = Some(Rc::clone(&self.executor.node));
        while let Some(node) = current {
            if !node.value.description.is_empty() {
                path.push(node.value.description.clone());
            }
            current = node.parent();
        }
        path.reverse();
        path
    }

    /// Executable groups found below this group, in discovery order.
    pub fn child_groups(&self) -> Vec<ExecutableTestGroup> {
        self.executor.subgroup_executable_test_groups()
    }

    pub fn test_cases(&self, before_alls_error: Option<Arc<TestError>>) -> Vec<ExecutableTestCase> {
        self.executor.executable_test_cases(before_alls_error)
    }

    pub fn before_all(&self) -> Executable {
        self.executor.before_alls_executable()
    }

    pub fn after_all(&self) -> Executable {
        self.executor.after_alls_executable()
    }

    pub fn executor(&self) -> &TestsGroupNodeExecutor {
        &self.executor
    }
}
