//! # groupspec: execution core for describe/it style test trees
//!
//! Tests are authored as nested groups of test cases and fixtures. Each group
//! is collected by a [`TestsGroupNodeAccumulator`], frozen into an immutable
//! [`TreeNode<TestsGroup>`], and executed by a [`TestsGroupNodeExecutor`]
//! that applies focus/ignore filtering and runs fixtures in ancestor order.
//!
//! ## Quick example
//!
//! ```rust,no_run
//! fn main() {
//!     groupspec::run(|ctx| {
//!         ctx.describe("Calculator", |ctx| {
//!             ctx.before_each(|| { /* runs before every test below */ });
//!
//!             ctx.it("adds two numbers", || {
//!                 assert_eq!(2 + 3, 5);
//!             });
//!
//!             ctx.it_throws::<String, ()>("rejects overflow", || {
//!                 panic!("overflow");
//!             })
//!             .with_message("overflow");
//!
//!             ctx.it_params("doubles %1", |n: &i32| {
//!                 assert_eq!(n * 2, n + n);
//!             })
//!             .provided([1, 2, 3]);
//!         });
//!     });
//! }
//! ```
//!
//! ## Driving the core directly
//!
//! ```rust
//! use groupspec::{TestCaseType, TestsGroupNodeAccumulator, TestsGroupNodeExecutor};
//!
//! let mut group = TestsGroupNodeAccumulator::new("Math", TestCaseType::Normal);
//! group.add_positive_test("adds", || assert_eq!(1 + 2, 3), TestCaseType::Normal);
//! let root = group.build();
//!
//! let executor = TestsGroupNodeExecutor::for_root(root);
//! for group in executor.executable_test_groups() {
//!     let before_alls_error = group.before_all()().err().map(std::sync::Arc::new);
//!     for case in group.test_cases(before_alls_error) {
//!         assert!(matches!(case.execute(), Some(Ok(()))));
//!     }
//!     group.after_all()().unwrap();
//! }
//! ```
//!
//! ## Features
//!
//! - `googletest`: re-exports `googletest` matchers via `groupspec::matchers`

mod accumulator;
mod context;
mod error;
mod executor;
mod expectations;
mod group;
pub mod params;
pub mod runner;
mod test_case;
mod test_case_type;
pub mod tree;

pub use accumulator::TestsGroupNodeAccumulator;
pub use context::{build_suite, run, Context};
pub use error::{closure, FixtureKind, IntoOutcome, TestClosure, TestError, Thrown};
pub use executor::{Executable, ExecutableTestCase, ExecutableTestGroup, TestsGroupNodeExecutor};
pub use expectations::ThrowableExpectations;
pub use group::TestsGroup;
pub use params::{ParamsExpected1, ParamsExpectedException1};
pub use test_case::{ExceptionTestCase, PositiveTestCase, SingleTestCase, TestSettings};
pub use test_case_type::TestCaseType;
pub use tree::TreeNode;

/// Re-export of the [`googletest`] crate. Available with the `googletest` feature.
#[cfg(feature = "googletest")]
pub use googletest;

/// Composable matchers re-exported from [`googletest::prelude`].
#[cfg(feature = "googletest")]
pub mod matchers {
    pub use googletest::prelude::*;
}
