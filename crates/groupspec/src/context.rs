//! Closure-based authoring API: the `Context` handle, its thread-local builder, `build_suite()` and `run()`.

use std::any::Any;
use std::cell::RefCell;
use std::fmt::Debug;
use std::rc::Rc;

use crate::accumulator::TestsGroupNodeAccumulator;
use crate::error::IntoOutcome;
use crate::expectations::ThrowableExpectations;
use crate::group::TestsGroup;
use crate::params::{ParamsExpected1, ParamsExpectedException1};
use crate::runner::{self, RunConfig};
use crate::test_case::TestSettings;
use crate::test_case_type::TestCaseType;
use crate::tree::TreeNode;

// ============================================================================
// Thread-local suite builder
// ============================================================================

thread_local! {
    static BUILDER: RefCell<Option<SuiteBuilder>> = const { RefCell::new(None) };
}

/// A stack of open accumulators, outermost first.
pub(crate) struct SuiteBuilder {
    stack: Vec<TestsGroupNodeAccumulator>,
}

impl SuiteBuilder {
    fn new(name: &str) -> Self {
        SuiteBuilder {
            stack: vec![TestsGroupNodeAccumulator::new(name, TestCaseType::Normal)],
        }
    }

    fn push_group(&mut self, name: &str, test_case_type: TestCaseType) {
        let child = self.current_mut().subgroup_accumulator(name, test_case_type);
        self.stack.push(child);
    }

    fn pop_group(&mut self) {
        assert!(self.stack.len() > 1, "groupspec: unbalanced group push/pop");
        if let Some(group) = self.stack.pop() {
            let node = group.build();
            self.current_mut().add_subgroup(node);
        }
    }

    fn current_mut(&mut self) -> &mut TestsGroupNodeAccumulator {
        self.stack.last_mut().expect("groupspec: empty builder stack")
    }

    fn finish(mut self) -> Rc<TreeNode<TestsGroup>> {
        assert_eq!(
            self.stack.len(),
            1,
            "groupspec: unbalanced group push/pop at finalization"
        );
        self.stack
            .pop()
            .expect("groupspec: empty builder stack")
            .build()
    }
}

/// Access the thread-local builder's innermost open group.
fn with_group<R>(f: impl FnOnce(&mut TestsGroupNodeAccumulator) -> R) -> R {
    with_builder(|b| f(b.current_mut()))
}

fn with_builder<R>(f: impl FnOnce(&mut SuiteBuilder) -> R) -> R {
    BUILDER.with(|cell| {
        let mut opt = cell.borrow_mut();
        let builder = opt
            .as_mut()
            .expect("groupspec: Context used outside of groupspec::run() or build_suite()");
        f(builder)
    })
}

// ============================================================================
// Context: the user-facing handle
// ============================================================================

/// A lightweight handle for defining groups, tests and fixtures.
///
/// All methods delegate to a thread-local builder. `Context` is `Copy` so it
/// can be passed into nested closures without ceremony.
///
/// # Example
/// ```rust,no_run
/// fn main() {
///     groupspec::run(|ctx| {
///         ctx.describe("Calculator", |ctx| {
///             ctx.it("adds", || { assert_eq!(2 + 3, 5); });
///         });
///     });
/// }
/// ```
#[derive(Copy, Clone)]
pub struct Context;

impl Context {
    // ---- Describe / Context / When -------------------------------------------

    pub fn describe(&self, name: &str, body: impl FnOnce(Context)) {
        self.group(name, TestCaseType::Normal, body);
    }

    pub fn fdescribe(&self, name: &str, body: impl FnOnce(Context)) {
        self.group(name, TestCaseType::Focused, body);
    }

    pub fn xdescribe(&self, name: &str, body: impl FnOnce(Context)) {
        self.group(name, TestCaseType::Ignored, body);
    }

    pub fn context(&self, name: &str, body: impl FnOnce(Context)) {
        self.describe(name, body);
    }

    pub fn fcontext(&self, name: &str, body: impl FnOnce(Context)) {
        self.fdescribe(name, body);
    }

    pub fn xcontext(&self, name: &str, body: impl FnOnce(Context)) {
        self.xdescribe(name, body);
    }

    pub fn when(&self, name: &str, body: impl FnOnce(Context)) {
        self.describe(name, body);
    }

    /// Open a group of the given type, run `body` inside it, then freeze it
    /// into the enclosing group.
    pub fn group(&self, name: &str, test_case_type: TestCaseType, body: impl FnOnce(Context)) {
        with_builder(|b| b.push_group(name, test_case_type));
        body(Context);
        with_builder(|b| b.pop_group());
    }

    // ---- It ------------------------------------------------------------------

    /// Define a test case. Returns [`TestSettings`] for optional labels.
    ///
    /// The body fails by panicking (e.g. a failed `assert!`) or by returning
    /// `Err`.
    pub fn it<R: IntoOutcome>(&self, name: &str, body: impl Fn() -> R + 'static) -> TestSettings {
        with_group(|g| g.add_positive_test(name, body, TestCaseType::Normal))
    }

    pub fn fit<R: IntoOutcome>(&self, name: &str, body: impl Fn() -> R + 'static) -> TestSettings {
        with_group(|g| g.add_positive_test(name, body, TestCaseType::Focused))
    }

    pub fn xit<R: IntoOutcome>(&self, name: &str, body: impl Fn() -> R + 'static) -> TestSettings {
        with_group(|g| g.add_positive_test(name, body, TestCaseType::Ignored))
    }

    // ---- It throws -----------------------------------------------------------

    /// Define a test that must raise a `T`. The second type parameter is the
    /// body's return type and is normally left as `_`.
    ///
    /// ```rust,no_run
    /// # fn main() { groupspec::run(|ctx| {
    /// ctx.it_throws::<String, _>("divides by zero", || {
    ///     let divisor: i32 = "0".parse().unwrap();
    ///     let _ = 1 / divisor;
    /// })
    /// .with_message_containing("divide by zero");
    /// # }); }
    /// ```
    pub fn it_throws<T: Any, R: IntoOutcome>(
        &self,
        name: &str,
        body: impl Fn() -> R + 'static,
    ) -> ThrowableExpectations<T> {
        with_group(|g| g.add_exception_test(name, body, TestCaseType::Normal))
    }

    pub fn fit_throws<T: Any, R: IntoOutcome>(
        &self,
        name: &str,
        body: impl Fn() -> R + 'static,
    ) -> ThrowableExpectations<T> {
        with_group(|g| g.add_exception_test(name, body, TestCaseType::Focused))
    }

    pub fn xit_throws<T: Any, R: IntoOutcome>(
        &self,
        name: &str,
        body: impl Fn() -> R + 'static,
    ) -> ThrowableExpectations<T> {
        with_group(|g| g.add_exception_test(name, body, TestCaseType::Ignored))
    }

    // ---- Parametrized --------------------------------------------------------

    /// Define a test template over one parameter; supply values with
    /// [`ParamsExpected1::provided`]. `%1` in the name is replaced by each value.
    pub fn it_params<P: Debug + 'static, R: IntoOutcome>(
        &self,
        name: &str,
        body: impl Fn(&P) -> R + 'static,
    ) -> ParamsExpected1<P> {
        with_group(|g| g.add_parametrized_positive_test1(name, body, TestCaseType::Normal))
    }

    pub fn fit_params<P: Debug + 'static, R: IntoOutcome>(
        &self,
        name: &str,
        body: impl Fn(&P) -> R + 'static,
    ) -> ParamsExpected1<P> {
        with_group(|g| g.add_parametrized_positive_test1(name, body, TestCaseType::Focused))
    }

    pub fn xit_params<P: Debug + 'static, R: IntoOutcome>(
        &self,
        name: &str,
        body: impl Fn(&P) -> R + 'static,
    ) -> ParamsExpected1<P> {
        with_group(|g| g.add_parametrized_positive_test1(name, body, TestCaseType::Ignored))
    }

    pub fn it_throws_params<T: Any, P: Debug + 'static, R: IntoOutcome>(
        &self,
        name: &str,
        body: impl Fn(&P) -> R + 'static,
    ) -> ParamsExpectedException1<T, P> {
        with_group(|g| g.add_parametrized_exception_test1(name, body, TestCaseType::Normal))
    }

    pub fn fit_throws_params<T: Any, P: Debug + 'static, R: IntoOutcome>(
        &self,
        name: &str,
        body: impl Fn(&P) -> R + 'static,
    ) -> ParamsExpectedException1<T, P> {
        with_group(|g| g.add_parametrized_exception_test1(name, body, TestCaseType::Focused))
    }

    pub fn xit_throws_params<T: Any, P: Debug + 'static, R: IntoOutcome>(
        &self,
        name: &str,
        body: impl Fn(&P) -> R + 'static,
    ) -> ParamsExpectedException1<T, P> {
        with_group(|g| g.add_parametrized_exception_test1(name, body, TestCaseType::Ignored))
    }

    // ---- Fixtures ------------------------------------------------------------

    pub fn before_all<R: IntoOutcome>(&self, fixture: impl Fn() -> R + 'static) {
        with_group(|g| g.add_before_all(fixture));
    }

    pub fn before_each<R: IntoOutcome>(&self, fixture: impl Fn() -> R + 'static) {
        with_group(|g| g.add_before_each(fixture));
    }

    pub fn after_each<R: IntoOutcome>(&self, fixture: impl Fn() -> R + 'static) {
        with_group(|g| g.add_after_each(fixture));
    }

    pub fn after_all<R: IntoOutcome>(&self, fixture: impl Fn() -> R + 'static) {
        with_group(|g| g.add_after_all(fixture));
    }
}

// ============================================================================
// Entry points
// ============================================================================

/// Author a tree and return its frozen root without running anything.
///
/// ```rust
/// let root = groupspec::build_suite("Math", |ctx| {
///     ctx.it("adds", || assert_eq!(1 + 2, 3));
///     ctx.describe("division", |ctx| {
///         ctx.it("divides", || assert_eq!(6 / 2, 3));
///     });
/// });
/// assert_eq!(root.value.tests_in_tree(), 2);
/// ```
pub fn build_suite(name: &str, body: impl FnOnce(Context)) -> Rc<TreeNode<TestsGroup>> {
    let previous = BUILDER.with(|cell| cell.replace(Some(SuiteBuilder::new(name))));

    body(Context);

    let builder = BUILDER.with(|cell| cell.replace(previous));
    builder
        .expect("groupspec: builder missing after build_suite")
        .finish()
}

/// Build and run a suite.
///
/// This is the main entry point for groupspec. Call it from `fn main()` in a
/// test target with `harness = false`. Exits with status 1 when anything fails.
///
/// # Example
///
/// ```rust,no_run
/// fn main() {
///     groupspec::run(|ctx| {
///         ctx.describe("Calculator", |ctx| {
///             ctx.it("adds", || { assert_eq!(2 + 3, 5); });
///         });
///     });
/// }
/// ```
pub fn run(body: impl FnOnce(Context)) {
    let root = build_suite("", body);

    let config = RunConfig::from_env();
    let result = runner::run_tree(&root, &config);

    if result.failed > 0 {
        std::process::exit(1);
    }
}
