//! Captured failures and the error type returned by executables.

use std::any::Any;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use thiserror::Error;

// ============================================================================
// Thrown: a value raised by a closure
// ============================================================================

/// A value raised by a test body or fixture, either as a panic payload or as
/// the `Err` of a fallible closure.
pub struct Thrown {
    payload: Box<dyn Any + Send>,
    message: Option<String>,
}

impl Thrown {
    /// Wrap an error value returned from a fallible closure.
    pub fn new<E: Any + Send + fmt::Display>(error: E) -> Self {
        let message = Some(error.to_string());
        Thrown {
            payload: normalize(Box::new(error)),
            message,
        }
    }

    /// Wrap a raw panic payload.
    pub fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        let payload = normalize(payload);
        let message = payload.downcast_ref::<String>().cloned();
        Thrown { payload, message }
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.payload.downcast_ref::<T>()
    }

    pub fn is<T: Any>(&self) -> bool {
        self.payload.is::<T>()
    }

    /// The panic message, or the `Display` rendering of a returned error.
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }
}

/// `panic!("literal")` carries a `&'static str`; everything string-like is
/// stored as `String` so one expected type covers both panic forms.
fn normalize(payload: Box<dyn Any + Send>) -> Box<dyn Any + Send> {
    match payload.downcast::<&'static str>() {
        Ok(s) => Box::new(s.to_string()),
        Err(payload) => payload,
    }
}

impl fmt::Display for Thrown {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.message {
            Some(msg) => f.write_str(msg),
            None => f.write_str("panic with a non-string payload"),
        }
    }
}

impl fmt::Debug for Thrown {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Thrown")
            .field("message", &self.message)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Closure contract
// ============================================================================

/// Return types a test body or fixture may have.
pub trait IntoOutcome {
    fn into_outcome(self) -> Result<(), Thrown>;
}

impl IntoOutcome for () {
    fn into_outcome(self) -> Result<(), Thrown> {
        Ok(())
    }
}

impl<E: Any + Send + fmt::Display> IntoOutcome for Result<(), E> {
    fn into_outcome(self) -> Result<(), Thrown> {
        self.map_err(Thrown::new)
    }
}

/// A zero-argument test body or fixture.
pub type TestClosure = Box<dyn Fn() -> Result<(), Thrown>>;

/// Box a closure into a [`TestClosure`].
pub fn closure<R: IntoOutcome>(f: impl Fn() -> R + 'static) -> TestClosure {
    Box::new(move || f().into_outcome())
}

/// Invoke a closure, turning a panic into a [`Thrown`].
pub(crate) fn invoke(closure: &TestClosure) -> Result<(), Thrown> {
    match catch_unwind(AssertUnwindSafe(closure)) {
        Ok(outcome) => outcome,
        Err(payload) => Err(Thrown::from_panic(payload)),
    }
}

// ============================================================================
// TestError
// ============================================================================

/// Which fixture list a failing fixture belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FixtureKind {
    BeforeAll,
    BeforeEach,
    AfterEach,
    AfterAll,
}

impl fmt::Display for FixtureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FixtureKind::BeforeAll => "before_all",
            FixtureKind::BeforeEach => "before_each",
            FixtureKind::AfterEach => "after_each",
            FixtureKind::AfterAll => "after_all",
        })
    }
}

/// The failure reported for a fixture chain or a single test run.
#[derive(Debug, Error)]
pub enum TestError {
    /// A fixture raised.
    #[error("{kind} failed: {thrown}")]
    Fixture { kind: FixtureKind, thrown: Thrown },

    /// A plain test body raised.
    #[error("{0}")]
    Body(Thrown),

    /// An exception test threw nothing, the wrong type, or a value rejected
    /// by one of its expectations.
    #[error("{0}")]
    ExpectationMismatch(String),

    /// The group's `before_all` chain failed before the test could run.
    #[error("before_all failed for this group: {0}")]
    Upstream(#[source] Arc<TestError>),
}

impl TestError {
    /// The raised value behind this error, following upstream failures.
    pub fn thrown(&self) -> Option<&Thrown> {
        match self {
            TestError::Fixture { thrown, .. } | TestError::Body(thrown) => Some(thrown),
            TestError::ExpectationMismatch(_) => None,
            TestError::Upstream(source) => source.thrown(),
        }
    }
}
