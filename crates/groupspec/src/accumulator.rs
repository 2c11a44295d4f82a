//! Mutable builder for one group, frozen into a [`TreeNode<TestsGroup>`].

use std::any::Any;
use std::cell::RefCell;
use std::fmt::Debug;
use std::rc::Rc;

use crate::error::{closure, IntoOutcome, TestClosure};
use crate::expectations::ThrowableExpectations;
use crate::group::TestsGroup;
use crate::params::{
    params_closure, ParametrizedExceptionTest1, ParametrizedPositiveTest1, ParametrizedTest,
    ParamsExpected1, ParamsExpectedException1,
};
use crate::test_case::{SingleTestCase, TestSettings};
use crate::test_case_type::TestCaseType;
use crate::tree::TreeNode;

/// Collects the fixtures, tests and subgroups of one group while its body is
/// being authored.
///
/// Every registered type is combined with the group's own type (see
/// [`TestCaseType::descendant_test_type`]) before it is stored. The
/// accumulator is consumed by [`build`](Self::build).
pub struct TestsGroupNodeAccumulator {
    description: String,
    test_case_type: TestCaseType,
    before_alls: Vec<TestClosure>,
    befores: Vec<TestClosure>,
    afters: Vec<TestClosure>,
    after_alls: Vec<TestClosure>,
    test_cases: Vec<SingleTestCase>,
    parametrized_tests: Vec<Box<dyn ParametrizedTest>>,
    subgroups: Vec<Rc<TreeNode<TestsGroup>>>,
    contains_focused_tests: bool,
}

impl TestsGroupNodeAccumulator {
    pub fn new(description: impl Into<String>, test_case_type: TestCaseType) -> Self {
        TestsGroupNodeAccumulator {
            description: description.into(),
            test_case_type,
            before_alls: Vec::new(),
            befores: Vec::new(),
            afters: Vec::new(),
            after_alls: Vec::new(),
            test_cases: Vec::new(),
            parametrized_tests: Vec::new(),
            subgroups: Vec::new(),
            contains_focused_tests: test_case_type.is_focused(),
        }
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn test_case_type(&self) -> TestCaseType {
        self.test_case_type
    }

    // ---- Fixtures ------------------------------------------------------------

    pub fn add_before_all<R: IntoOutcome>(&mut self, fixture: impl Fn() -> R + 'static) {
        self.before_alls.push(closure(fixture));
    }

    pub fn add_before_each<R: IntoOutcome>(&mut self, fixture: impl Fn() -> R + 'static) {
        self.befores.push(closure(fixture));
    }

    pub fn add_after_each<R: IntoOutcome>(&mut self, fixture: impl Fn() -> R + 'static) {
        self.afters.push(closure(fixture));
    }

    pub fn add_after_all<R: IntoOutcome>(&mut self, fixture: impl Fn() -> R + 'static) {
        self.after_alls.push(closure(fixture));
    }

    // ---- Tests ---------------------------------------------------------------

    pub fn add_positive_test<R: IntoOutcome>(
        &mut self,
        description: &str,
        body: impl Fn() -> R + 'static,
        test_case_type: TestCaseType,
    ) -> TestSettings {
        self.note_focus(test_case_type);
        let settings = TestSettings::new();
        self.test_cases.push(SingleTestCase::positive(
            description.to_string(),
            closure(body),
            self.descendant_test_type(test_case_type),
            settings.clone(),
        ));
        settings
    }

    pub fn add_exception_test<T: Any, R: IntoOutcome>(
        &mut self,
        description: &str,
        body: impl Fn() -> R + 'static,
        test_case_type: TestCaseType,
    ) -> ThrowableExpectations<T> {
        self.note_focus(test_case_type);
        let expectations = ThrowableExpectations::<T>::new();
        self.test_cases.push(SingleTestCase::exception(
            description.to_string(),
            closure(body),
            self.descendant_test_type(test_case_type),
            Rc::new(expectations.clone()),
        ));
        expectations
    }

    pub fn add_parametrized_positive_test1<P: Debug + 'static, R: IntoOutcome>(
        &mut self,
        description: &str,
        body: impl Fn(&P) -> R + 'static,
        test_case_type: TestCaseType,
    ) -> ParamsExpected1<P> {
        self.note_focus(test_case_type);
        let settings = TestSettings::new();
        let params = Rc::new(RefCell::new(Vec::new()));
        self.parametrized_tests
            .push(Box::new(ParametrizedPositiveTest1 {
                description: description.to_string(),
                body: params_closure(body),
                test_type: self.descendant_test_type(test_case_type),
                settings: settings.clone(),
                params: Rc::clone(&params),
            }));
        ParamsExpected1::new(params, settings)
    }

    pub fn add_parametrized_exception_test1<T: Any, P: Debug + 'static, R: IntoOutcome>(
        &mut self,
        description: &str,
        body: impl Fn(&P) -> R + 'static,
        test_case_type: TestCaseType,
    ) -> ParamsExpectedException1<T, P> {
        self.note_focus(test_case_type);
        let expectations = ThrowableExpectations::<T>::new();
        let params = Rc::new(RefCell::new(Vec::new()));
        self.parametrized_tests
            .push(Box::new(ParametrizedExceptionTest1 {
                description: description.to_string(),
                body: params_closure(body),
                test_type: self.descendant_test_type(test_case_type),
                expectations: expectations.clone(),
                params: Rc::clone(&params),
            }));
        ParamsExpectedException1::new(params, expectations)
    }

    // ---- Subgroups -----------------------------------------------------------

    /// A fresh accumulator for a nested group, typed relative to this one.
    pub fn subgroup_accumulator(
        &self,
        description: &str,
        test_case_type: TestCaseType,
    ) -> TestsGroupNodeAccumulator {
        TestsGroupNodeAccumulator::new(description, self.descendant_test_type(test_case_type))
    }

    /// Attach an already-built nested group.
    pub fn add_subgroup(&mut self, subgroup: Rc<TreeNode<TestsGroup>>) {
        self.subgroups.push(subgroup);
    }

    // ---- Build ---------------------------------------------------------------

    /// Freeze this group and its attached subgroups into an immutable tree.
    pub fn build(self) -> Rc<TreeNode<TestsGroup>> {
        let tests_in_subgroups: usize = self.subgroups.iter().map(|s| s.value.tests_in_tree).sum();
        let contains_focused_tests = self.contains_focused_tests
            || self.subgroups.iter().any(|s| s.value.contains_focused_tests);

        let mut test_cases = self.test_cases;
        for parametrized_test in self.parametrized_tests {
            test_cases.extend(parametrized_test.into_test_cases());
        }

        let before_all_count = self.before_alls.len();
        let after_all_count = self.after_alls.len();
        let group = TestsGroup::new(
            self.description,
            self.before_alls,
            self.befores,
            test_cases,
            self.afters,
            self.after_alls,
            tests_in_subgroups,
            contains_focused_tests,
        );
        tracing::debug!(
            group = %group.description,
            tests_in_tree = group.tests_in_tree,
            contains_focused_tests,
            "built tests group"
        );

        let node = TreeNode::new(group);
        for subgroup in self.subgroups {
            subgroup.walk(&mut |n| {
                n.value
                    .increment_fixture_counts(before_all_count, after_all_count)
            });
            node.attach(subgroup);
        }
        node
    }

    fn note_focus(&mut self, test_case_type: TestCaseType) {
        if test_case_type.is_focused() {
            self.contains_focused_tests = true;
        }
    }

    fn descendant_test_type(&self, test_case_type: TestCaseType) -> TestCaseType {
        self.test_case_type.descendant_test_type(test_case_type)
    }
}
