//! Single-parameter test templates, expanded into one test case per value
//! when the owning group is built.

use std::any::Any;
use std::cell::RefCell;
use std::fmt::Debug;
use std::rc::Rc;

use crate::error::{IntoOutcome, TestClosure, Thrown};
use crate::expectations::ThrowableExpectations;
use crate::test_case::{SingleTestCase, TestSettings};
use crate::test_case_type::TestCaseType;

/// A parameterized body: receives a reference to one provided value.
pub type TestClosureParams1<P> = Rc<dyn Fn(&P) -> Result<(), Thrown>>;

pub(crate) fn params_closure<P, R: IntoOutcome>(
    f: impl Fn(&P) -> R + 'static,
) -> TestClosureParams1<P> {
    Rc::new(move |p: &P| f(p).into_outcome())
}

/// Replace every `%1` in `template` with the value, or append the value when
/// the template has no placeholder.
pub fn param_description<P: Debug>(template: &str, value: &P) -> String {
    let rendered = format!("{value:?}");
    if template.contains("%1") {
        template.replace("%1", &rendered)
    } else {
        format!("{template} [{rendered}]")
    }
}

/// A registered template, expanded at build time.
pub(crate) trait ParametrizedTest {
    fn into_test_cases(self: Box<Self>) -> Vec<SingleTestCase>;
}

type Params<P> = Rc<RefCell<Vec<P>>>;

fn bind<P: 'static>(body: &TestClosureParams1<P>, value: P) -> TestClosure {
    let body = Rc::clone(body);
    Box::new(move || body(&value))
}

pub(crate) struct ParametrizedPositiveTest1<P> {
    pub(crate) description: String,
    pub(crate) body: TestClosureParams1<P>,
    pub(crate) test_type: TestCaseType,
    pub(crate) settings: TestSettings,
    pub(crate) params: Params<P>,
}

impl<P: Debug + 'static> ParametrizedTest for ParametrizedPositiveTest1<P> {
    fn into_test_cases(self: Box<Self>) -> Vec<SingleTestCase> {
        let values = self.params.take();
        values
            .into_iter()
            .map(|value| {
                SingleTestCase::positive(
                    param_description(&self.description, &value),
                    bind(&self.body, value),
                    self.test_type,
                    self.settings.clone(),
                )
            })
            .collect()
    }
}

pub(crate) struct ParametrizedExceptionTest1<T, P> {
    pub(crate) description: String,
    pub(crate) body: TestClosureParams1<P>,
    pub(crate) test_type: TestCaseType,
    pub(crate) expectations: ThrowableExpectations<T>,
    pub(crate) params: Params<P>,
}

impl<T: Any, P: Debug + 'static> ParametrizedTest for ParametrizedExceptionTest1<T, P> {
    fn into_test_cases(self: Box<Self>) -> Vec<SingleTestCase> {
        let values = self.params.take();
        values
            .into_iter()
            .map(|value| {
                SingleTestCase::exception(
                    param_description(&self.description, &value),
                    bind(&self.body, value),
                    self.test_type,
                    Rc::new(self.expectations.clone()),
                )
            })
            .collect()
    }
}

/// Handle returned by a parametrized positive test registration.
///
/// ```rust,no_run
/// # fn main() { groupspec::run(|ctx| {
/// ctx.it_params("squares %1 to a non-negative number", |n: &i64| {
///     assert!(n * n >= 0);
/// })
/// .provided([-2, 0, 3]);
/// # }); }
/// ```
pub struct ParamsExpected1<P> {
    params: Params<P>,
    settings: TestSettings,
}

impl<P> ParamsExpected1<P> {
    pub(crate) fn new(params: Params<P>, settings: TestSettings) -> Self {
        ParamsExpected1 { params, settings }
    }

    /// Supply parameter values. May be called more than once; values append.
    pub fn provided(self, values: impl IntoIterator<Item = P>) -> TestSettings {
        self.params.borrow_mut().extend(values);
        self.settings
    }
}

/// Handle returned by a parametrized exception test registration.
pub struct ParamsExpectedException1<T, P> {
    params: Params<P>,
    expectations: ThrowableExpectations<T>,
}

impl<T, P> ParamsExpectedException1<T, P> {
    pub(crate) fn new(params: Params<P>, expectations: ThrowableExpectations<T>) -> Self {
        ParamsExpectedException1 {
            params,
            expectations,
        }
    }

    /// Supply parameter values and continue with the shared expectations.
    pub fn provided(self, values: impl IntoIterator<Item = P>) -> ThrowableExpectations<T> {
        self.params.borrow_mut().extend(values);
        self.expectations
    }
}
