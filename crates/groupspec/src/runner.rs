//! Reference host: drives the executor and prints colored, indented output.
//!
//! Used with `harness = false` test targets:
//!
//! ```text
//! Calculator
//!   ✓ adds two numbers
//! Calculator > when negative
//!   ✓ handles negatives
//!   ✗ fails on overflow
//! ```

use std::rc::Rc;
use std::sync::Arc;
use std::time::Instant;

use crate::executor::{ExecutableTestCase, TestsGroupNodeExecutor};
use crate::group::TestsGroup;
use crate::test_case_type::TestCaseType;
use crate::tree::TreeNode;

const LABEL_FILTER_VAR: &str = "GROUPSPEC_LABEL_FILTER";
const FAIL_ON_FOCUS_VAR: &str = "GROUPSPEC_FAIL_ON_FOCUS";

// ============================================================================
// ANSI color helpers
// ============================================================================

fn use_color() -> bool {
    // Respect NO_COLOR env var (https://no-color.org/)
    if std::env::var("NO_COLOR").is_ok() {
        return false;
    }
    std::io::IsTerminal::is_terminal(&std::io::stdout())
}

fn paint(code: &str, s: &str) -> String {
    if use_color() {
        format!("\x1b[{code}m{s}\x1b[0m")
    } else {
        s.to_string()
    }
}

fn green(s: &str) -> String {
    paint("32", s)
}

fn red(s: &str) -> String {
    paint("31", s)
}

fn yellow(s: &str) -> String {
    paint("33", s)
}

fn bold(s: &str) -> String {
    paint("1", s)
}

fn dim(s: &str) -> String {
    paint("2", s)
}

// ============================================================================
// Configuration
// ============================================================================

/// Configuration parsed from command-line args and the environment.
#[derive(Debug, Clone, Default)]
pub struct RunConfig {
    /// Only run tests whose full path contains this.
    pub filter: Option<String>,
    /// Only list tests, don't run them.
    pub list: bool,
    /// Label filter expression, see [`matches_labels`].
    pub label_filter: Option<String>,
    /// Treat a tree with focused tests as a failed run.
    pub fail_on_focus: bool,
}

impl RunConfig {
    /// Parse from the process args (compatible with `cargo test -- <args>`)
    /// and the `GROUPSPEC_*` environment variables.
    pub fn from_env() -> Self {
        let mut config = Self::from_args(std::env::args().skip(1));
        config.label_filter = std::env::var(LABEL_FILTER_VAR)
            .ok()
            .filter(|f| !f.is_empty());
        config.fail_on_focus = std::env::var(FAIL_ON_FOCUS_VAR)
            .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
            .unwrap_or(false);
        config
    }

    /// Parse arguments only, without the binary name.
    pub fn from_args(args: impl IntoIterator<Item = String>) -> Self {
        let mut config = RunConfig::default();
        for arg in args {
            match arg.as_str() {
                "--list" => config.list = true,
                // ignored tests never run here; accepted for cargo compatibility
                "--include-ignored" | "--ignored" => {}
                a if !a.starts_with('-') => config.filter = Some(a.to_string()),
                _ => {}
            }
        }
        config
    }

    fn selects(&self, full_path: &str, labels: &[String]) -> bool {
        if let Some(f) = &self.filter {
            if !full_path.to_lowercase().contains(&f.to_lowercase()) {
                return false;
            }
        }
        match &self.label_filter {
            Some(filter) => matches_labels(filter, labels),
            None => true,
        }
    }
}

/// Check a test's labels against a filter expression.
///
/// Filter syntax:
/// - `integration`: matches if any label equals "integration"
/// - `!slow`: matches if no label equals "slow"
/// - `integration,smoke`: OR: matches if any label matches any filter term
/// - `integration+fast`: AND: matches if labels include all filter terms
pub fn matches_labels(filter: &str, labels: &[String]) -> bool {
    let has = |term: &str| labels.iter().any(|l| l == term);

    if filter.contains('+') {
        return filter.split('+').all(|term| has(term.trim()));
    }

    filter.split(',').any(|term| {
        let term = term.trim();
        match term.strip_prefix('!') {
            Some(negated) => !has(negated),
            None => has(term),
        }
    })
}

// ============================================================================
// Runner
// ============================================================================

/// Results from running a test tree.
#[derive(Debug, Default)]
pub struct RunResult {
    pub passed: usize,
    pub failed: usize,
    pub pending: usize,
    pub skipped: usize,
    pub failures: Vec<String>,
}

/// Run a frozen tree and print BDD-formatted output.
pub fn run_tree(root: &Rc<TreeNode<TestsGroup>>, config: &RunConfig) -> RunResult {
    let executor = TestsGroupNodeExecutor::for_root(Rc::clone(root));
    let mut result = RunResult::default();
    let start = Instant::now();

    if config.list {
        list_tree(&executor, config);
        return result;
    }

    if config.fail_on_focus && executor.run_only_focused_tests() {
        result.failed += 1;
        result.failures.push(format!(
            "focused tests detected but {FAIL_ON_FOCUS_VAR} is set. \
             Remove fit/fdescribe/fcontext before pushing."
        ));
    }

    println!();

    for group in executor.executable_test_groups() {
        let path = group.path();
        let prefix = path.join(" > ");
        let cases = group.test_cases(None);
        if !cases
            .iter()
            .any(|c| config.selects(&full_path(&prefix, c), c.labels()))
        {
            continue;
        }

        if !prefix.is_empty() {
            println!("{}", bold(&prefix));
        }

        let before_alls_error = group.before_all()().err().map(Arc::new);
        if let Some(error) = &before_alls_error {
            println!("  {}", red(&format!("before_all failed: {error}")));
        }

        for case in group.test_cases(before_alls_error) {
            let full_path = full_path(&prefix, &case);
            if !config.selects(&full_path, case.labels()) {
                continue;
            }
            report_case(&case, &full_path, &mut result);
        }

        if let Err(error) = group.after_all()() {
            println!("  {}", red(&format!("after_all failed: {error}")));
            result.failed += 1;
            result.failures.push(format!("{prefix} (after_all): {error}"));
        }
    }

    print_summary(&result, start.elapsed());

    result
}

fn full_path(prefix: &str, case: &ExecutableTestCase) -> String {
    if prefix.is_empty() {
        case.description().to_string()
    } else {
        format!("{prefix} > {}", case.description())
    }
}

fn report_case(case: &ExecutableTestCase, full_path: &str, result: &mut RunResult) {
    let name = case.description();

    let start = Instant::now();
    let Some(outcome) = case.execute() else {
        if case.test_type() == TestCaseType::Ignored {
            println!("  {} {}", yellow("-"), dim(name));
            result.pending += 1;
        } else {
            result.skipped += 1;
        }
        return;
    };

    let ms = start.elapsed().as_millis();
    let time_str = if ms > 100 {
        format!(" {}", dim(&format!("({ms}ms)")))
    } else {
        String::new()
    };

    match outcome {
        Ok(()) => {
            println!("  {} {}{}", green("✓"), name, time_str);
            result.passed += 1;
        }
        Err(error) => {
            println!("  {} {}{}", red("✗"), red(name), time_str);
            println!("    {}", red(&format!("Error: {error}")));
            result.failed += 1;
            result.failures.push(format!("{full_path}: {error}"));
        }
    }
}

fn print_summary(result: &RunResult, elapsed: std::time::Duration) {
    let elapsed_str = format!("{:.3}s", elapsed.as_secs_f64());

    let parts: Vec<String> = [
        (result.passed > 0).then(|| green(&format!("{} passed", result.passed))),
        (result.failed > 0).then(|| red(&format!("{} failed", result.failed))),
        (result.pending > 0).then(|| yellow(&format!("{} pending", result.pending))),
        (result.skipped > 0).then(|| dim(&format!("{} skipped", result.skipped))),
    ]
    .into_iter()
    .flatten()
    .collect();

    let summary = format!("{} ({})", parts.join(", "), dim(&elapsed_str));

    println!();
    if result.failed > 0 {
        println!("{}", red("FAIL"));
        println!("{summary}");
        println!();
        println!("Failures:");
        for (i, failure) in result.failures.iter().enumerate() {
            println!("  {}. {}", i + 1, failure);
        }
        println!();
    } else {
        println!("{}", green("PASS"));
        println!("{summary}");
    }
}

fn list_tree(executor: &TestsGroupNodeExecutor, config: &RunConfig) {
    for group in executor.executable_test_groups() {
        let prefix = group.path().join(" > ");
        for case in group.test_cases(None) {
            let full_path = full_path(&prefix, &case);
            if !config.selects(&full_path, case.labels()) {
                continue;
            }
            if case.test_type() == TestCaseType::Ignored {
                println!("{full_path} (pending)");
            } else {
                println!("{full_path}");
            }
        }
    }
}
