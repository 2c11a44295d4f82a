use std::cell::Cell;

use crate::error::TestClosure;
use crate::test_case::SingleTestCase;

/// The frozen contents of one group (a `describe` block).
///
/// Built once by [`TestsGroupNodeAccumulator::build`](crate::TestsGroupNodeAccumulator::build)
/// and read-only afterwards, apart from the ancestor fixture counters used for
/// reporting.
pub struct TestsGroup {
    pub(crate) description: String,
    pub(crate) before_alls: Vec<TestClosure>,
    pub(crate) befores: Vec<TestClosure>,
    pub(crate) test_cases: Vec<SingleTestCase>,
    pub(crate) afters: Vec<TestClosure>,
    pub(crate) after_alls: Vec<TestClosure>,
    pub(crate) tests_in_tree: usize,
    pub(crate) contains_focused_tests: bool,
    ancestor_before_alls: Cell<usize>,
    ancestor_after_alls: Cell<usize>,
}

impl TestsGroup {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        description: String,
        before_alls: Vec<TestClosure>,
        befores: Vec<TestClosure>,
        test_cases: Vec<SingleTestCase>,
        afters: Vec<TestClosure>,
        after_alls: Vec<TestClosure>,
        tests_in_subgroups: usize,
        contains_focused_tests: bool,
    ) -> Self {
        let tests_in_tree = tests_in_subgroups + test_cases.len();
        TestsGroup {
            description,
            before_alls,
            befores,
            test_cases,
            afters,
            after_alls,
            tests_in_tree,
            contains_focused_tests,
            ancestor_before_alls: Cell::new(0),
            ancestor_after_alls: Cell::new(0),
        }
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    /// Test cases registered directly in this group, in registration order.
    pub fn test_cases(&self) -> &[SingleTestCase] {
        &self.test_cases
    }

    /// Test cases in this group and every descendant group.
    pub fn tests_in_tree(&self) -> usize {
        self.tests_in_tree
    }

    pub fn contains_focused_tests(&self) -> bool {
        self.contains_focused_tests
    }

    pub fn before_all_count(&self) -> usize {
        self.before_alls.len()
    }

    pub fn before_each_count(&self) -> usize {
        self.befores.len()
    }

    pub fn after_each_count(&self) -> usize {
        self.afters.len()
    }

    pub fn after_all_count(&self) -> usize {
        self.after_alls.len()
    }

    /// `before_all` fixtures registered on all ancestor groups combined.
    pub fn ancestor_before_alls(&self) -> usize {
        self.ancestor_before_alls.get()
    }

    /// `after_all` fixtures registered on all ancestor groups combined.
    pub fn ancestor_after_alls(&self) -> usize {
        self.ancestor_after_alls.get()
    }

    pub(crate) fn increment_fixture_counts(&self, before_alls: usize, after_alls: usize) {
        self.ancestor_before_alls
            .set(self.ancestor_before_alls.get() + before_alls);
        self.ancestor_after_alls
            .set(self.ancestor_after_alls.get() + after_alls);
    }
}
