//! Assertion macros for results and run summaries.
//!
//! - [`crate::assert_result_ok!`] - assert a Result is Ok and extract the value
//! - [`crate::assert_contains_error!`] - assert the error message contains a pattern
//! - [`crate::assert_stage_state!`] - assert the final state of one stage in a
//!   [`RunSummary`](crate::pipeline::RunSummary)
//!
//! # Example
//!
//! ```rust
//! use pitchcrawl::{assert_contains_error, assert_result_ok};
//!
//! let result: Result<u32, String> = Ok(9);
//! assert_eq!(assert_result_ok!(result), 9);
//!
//! let result: Result<u32, String> = Err("no table with id results2024-202591_overall".into());
//! assert_contains_error!(result, "results2024");
//! ```

/// Assert that a Result is Ok and extract the value.
#[macro_export]
macro_rules! assert_result_ok {
    ($result:expr) => {
        match $result {
            Ok(value) => value,
            Err(e) => panic!(
                "Expected Ok, got Err: {:?}\n  at {}:{}:{}",
                e,
                file!(),
                line!(),
                column!()
            ),
        }
    };
}

/// Assert that a Result is Err and that its Display output contains
/// `$pattern`. Evaluates to the error.
#[macro_export]
macro_rules! assert_contains_error {
    ($result:expr, $pattern:expr) => {{
        let err = match $result {
            Ok(value) => panic!(
                "Expected Err, got Ok: {:?}\n  at {}:{}:{}",
                value,
                file!(),
                line!(),
                column!()
            ),
            Err(e) => e,
        };
        let message = err.to_string();
        assert!(
            message.contains($pattern),
            "Error '{}' does not contain '{}'\n  at {}:{}:{}",
            message,
            $pattern,
            file!(),
            line!(),
            column!()
        );
        err
    }};
}

/// Assert that `$stage` ended in `$state`. Evaluates to the stage report.
#[macro_export]
macro_rules! assert_stage_state {
    ($summary:expr, $stage:expr, $state:expr) => {{
        let report = match $summary.stage($stage) {
            Some(report) => report,
            None => panic!(
                "Stage {} missing from run summary\n  at {}:{}:{}",
                $stage,
                file!(),
                line!(),
                column!()
            ),
        };
        assert_eq!(
            report.state, $state,
            "Stage {} ended {} (expected {})\n  at {}:{}:{}",
            $stage,
            report.state,
            $state,
            file!(),
            line!(),
            column!()
        );
        report
    }};
}
