//! Single test cases: plain (positive) tests and exception tests.

use std::cell::RefCell;
use std::rc::Rc;

use crate::error::{invoke, TestClosure, TestError};
use crate::expectations::ThrownCheck;
use crate::test_case_type::TestCaseType;

/// Per-test settings handle returned when a positive test is registered.
///
/// ```rust,no_run
/// # fn main() { groupspec::run(|ctx| {
/// ctx.it("talks to the database", || { /* ... */ })
///     .labels(&["integration", "slow"]);
/// # }); }
/// ```
#[derive(Clone, Default)]
pub struct TestSettings {
    labels: Rc<RefCell<Vec<String>>>,
}

impl TestSettings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add labels for filtering via `GROUPSPEC_LABEL_FILTER`.
    pub fn labels(self, labels: &[&str]) -> Self {
        self.labels
            .borrow_mut()
            .extend(labels.iter().map(|s| s.to_string()));
        self
    }

    pub fn label_list(&self) -> Vec<String> {
        self.labels.borrow().clone()
    }
}

/// A test that passes when its body completes without raising.
pub struct PositiveTestCase {
    pub(crate) description: String,
    pub(crate) body: TestClosure,
    pub(crate) test_type: TestCaseType,
    pub(crate) settings: TestSettings,
}

/// A test that passes only when its body raises a value accepted by its
/// expectations.
pub struct ExceptionTestCase {
    pub(crate) description: String,
    pub(crate) body: TestClosure,
    pub(crate) test_type: TestCaseType,
    pub(crate) expectations: Rc<dyn ThrownCheck>,
}

pub enum SingleTestCase {
    Positive(PositiveTestCase),
    Exception(ExceptionTestCase),
}

impl SingleTestCase {
    pub(crate) fn positive(
        description: String,
        body: TestClosure,
        test_type: TestCaseType,
        settings: TestSettings,
    ) -> Self {
        SingleTestCase::Positive(PositiveTestCase {
            description,
            body,
            test_type,
            settings,
        })
    }

    pub(crate) fn exception(
        description: String,
        body: TestClosure,
        test_type: TestCaseType,
        expectations: Rc<dyn ThrownCheck>,
    ) -> Self {
        SingleTestCase::Exception(ExceptionTestCase {
            description,
            body,
            test_type,
            expectations,
        })
    }

    pub fn description(&self) -> &str {
        match self {
            SingleTestCase::Positive(t) => &t.description,
            SingleTestCase::Exception(t) => &t.description,
        }
    }

    pub fn test_type(&self) -> TestCaseType {
        match self {
            SingleTestCase::Positive(t) => t.test_type,
            SingleTestCase::Exception(t) => t.test_type,
        }
    }

    pub fn labels(&self) -> Vec<String> {
        match self {
            SingleTestCase::Positive(t) => t.settings.label_list(),
            SingleTestCase::Exception(_) => Vec::new(),
        }
    }

    /// Run the body once and judge the result.
    pub fn exercise(&self) -> Result<(), TestError> {
        match self {
            SingleTestCase::Positive(t) => invoke(&t.body).map_err(TestError::Body),
            SingleTestCase::Exception(t) => {
                let thrown = invoke(&t.body).err();
                t.expectations
                    .check(thrown.as_ref())
                    .map_err(TestError::ExpectationMismatch)
            }
        }
    }
}
