//! Expectations attached to exception tests.

use std::any::{type_name, Any};
use std::cell::RefCell;
use std::error::Error;
use std::fmt::Display;
use std::marker::PhantomData;
use std::rc::Rc;

use crate::error::Thrown;

struct Predicate<T> {
    description: String,
    accepts: Box<dyn Fn(&T) -> bool>,
}

/// What an exception test expects to be thrown: a value of type `T` that
/// satisfies every registered predicate.
///
/// The handle is shared with the registered test, so predicates added after
/// registration (but before the group is built) still apply.
///
/// ```rust,no_run
/// # fn main() { groupspec::run(|ctx| {
/// ctx.it_throws::<String, ()>("rejects empty input", || {
///     panic!("input must not be empty");
/// })
/// .with_message_containing("empty");
/// # }); }
/// ```
pub struct ThrowableExpectations<T> {
    predicates: Rc<RefCell<Vec<Predicate<T>>>>,
    _expected: PhantomData<fn(&T)>,
}

impl<T> Clone for ThrowableExpectations<T> {
    fn clone(&self) -> Self {
        ThrowableExpectations {
            predicates: Rc::clone(&self.predicates),
            _expected: PhantomData,
        }
    }
}

impl<T: Any> Default for ThrowableExpectations<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Any> ThrowableExpectations<T> {
    pub fn new() -> Self {
        ThrowableExpectations {
            predicates: Rc::new(RefCell::new(Vec::new())),
            _expected: PhantomData,
        }
    }

    /// Require the thrown value to satisfy `accepts`.
    pub fn satisfying(self, description: &str, accepts: impl Fn(&T) -> bool + 'static) -> Self {
        self.predicates.borrow_mut().push(Predicate {
            description: description.to_string(),
            accepts: Box::new(accepts),
        });
        self
    }

    /// Check a caught value. `None` means the closure completed normally.
    pub fn check(&self, thrown: Option<&Thrown>) -> Result<(), String> {
        let expected = type_name::<T>();
        let thrown = thrown
            .ok_or_else(|| format!("expected `{expected}` to be thrown, but nothing was thrown"))?;
        let value = thrown.downcast_ref::<T>().ok_or_else(|| {
            format!("expected `{expected}` to be thrown, but a different value was thrown: {thrown}")
        })?;

        // first rejection in registration order is reported
        match self.predicates.borrow().iter().find(|p| !(p.accepts)(value)) {
            Some(rejected) => Err(format!(
                "thrown `{expected}` did not satisfy: {} (got: {thrown})",
                rejected.description
            )),
            None => Ok(()),
        }
    }

    pub fn len(&self) -> usize {
        self.predicates.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T: Any + Display> ThrowableExpectations<T> {
    pub fn with_message(self, message: &str) -> Self {
        let message = message.to_string();
        let description = format!("message is {message:?}");
        self.satisfying(&description, move |t| t.to_string() == message)
    }

    pub fn with_message_containing(self, fragment: &str) -> Self {
        let fragment = fragment.to_string();
        let description = format!("message contains {fragment:?}");
        self.satisfying(&description, move |t| t.to_string().contains(&fragment))
    }
}

impl<T: Any + Error> ThrowableExpectations<T> {
    pub fn without_cause(self) -> Self {
        self.satisfying("has no cause", |t| t.source().is_none())
    }

    pub fn with_cause_of<C: Error + 'static>(self) -> Self {
        let description = format!("caused by `{}`", type_name::<C>());
        self.satisfying(&description, |t| t.source().is_some_and(|s| s.is::<C>()))
    }
}

/// Type-erased view stored on an exception test case.
pub(crate) trait ThrownCheck {
    fn check(&self, thrown: Option<&Thrown>) -> Result<(), String>;
}

impl<T: Any> ThrownCheck for ThrowableExpectations<T> {
    fn check(&self, thrown: Option<&Thrown>) -> Result<(), String> {
        ThrowableExpectations::check(self, thrown)
    }
}
