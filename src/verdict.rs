use std::fmt::Display;

use crate::devicefarm::{Counters, ExecutionResult};
use crate::poll::TestResultSnapshot;

/// Outcome reported to the CI host for a finished run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildVerdict {
    Success,
    Unstable,
    Failure,
}

impl Display for BuildVerdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BuildVerdict::Success => write!(f, "SUCCESS"),
            BuildVerdict::Unstable => write!(f, "UNSTABLE"),
            BuildVerdict::Failure => write!(f, "FAILURE"),
        }
    }
}

/// The result the verdict is derived from.
///
/// With `ignore_run_error`, an `ERRORED` run is judged on its counters instead. Any skipped
/// test then turns a result other than `ERRORED` into `SKIPPED`.
pub fn effective_result(
    result: Option<ExecutionResult>,
    counters: &Counters,
    ignore_run_error: bool,
) -> Option<ExecutionResult> {
    let mut result = result;

    if ignore_run_error && result == Some(ExecutionResult::Errored) {
        result = Some(if counters.skipped > 0 {
            ExecutionResult::Skipped
        } else if counters.stopped_or_zero() > 0 {
            ExecutionResult::Stopped
        } else if counters.failed > 0 {
            ExecutionResult::Failed
        } else if counters.warned > 0 {
            ExecutionResult::Warned
        } else {
            ExecutionResult::Passed
        });
    }

    if result != Some(ExecutionResult::Errored) && counters.skipped > 0 {
        result = Some(ExecutionResult::Skipped);
    }

    result
}

pub fn verdict(
    result: Option<ExecutionResult>,
    counters: &Counters,
    ignore_run_error: bool,
) -> BuildVerdict {
    match effective_result(result, counters, ignore_run_error) {
        Some(ExecutionResult::Passed) => BuildVerdict::Success,
        Some(ExecutionResult::Warned) => BuildVerdict::Unstable,
        _ => BuildVerdict::Failure,
    }
}

impl TestResultSnapshot {
    pub fn verdict(&self, ignore_run_error: bool) -> BuildVerdict {
        verdict(self.result, &self.counters, ignore_run_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use ExecutionResult::*;

    fn counters(failed: u32, warned: u32, skipped: u32, stopped: Option<u32>) -> Counters {
        Counters {
            passed: 10,
            warned,
            failed,
            errored: 0,
            skipped,
            stopped,
            total: 10 + warned + failed + skipped + stopped.unwrap_or(0),
        }
    }

    #[test]
    fn test_passed_run_succeeds() {
        let counters = counters(0, 0, 0, Some(0));
        assert_eq!(verdict(Some(Passed), &counters, false), BuildVerdict::Success);
    }

    #[test]
    fn test_ignored_error_is_judged_on_failures() {
        let counters = counters(2, 0, 0, Some(0));
        assert_eq!(effective_result(Some(Errored), &counters, true), Some(Failed));
        assert_eq!(verdict(Some(Errored), &counters, true), BuildVerdict::Failure);
    }

    #[test]
    fn test_skipped_tests_override_warned() {
        let counters = counters(0, 0, 3, None);
        assert_eq!(effective_result(Some(Warned), &counters, false), Some(Skipped));
        assert_eq!(verdict(Some(Warned), &counters, false), BuildVerdict::Failure);
    }

    #[rstest]
    #[case(counters(0, 0, 0, None), Passed, BuildVerdict::Success)]
    #[case(counters(0, 1, 0, None), Warned, BuildVerdict::Unstable)]
    #[case(counters(1, 1, 0, None), Failed, BuildVerdict::Failure)]
    #[case(counters(1, 1, 0, Some(2)), Stopped, BuildVerdict::Failure)]
    #[case(counters(1, 1, 4, Some(2)), Skipped, BuildVerdict::Failure)]
    fn test_ignored_error_precedence(
        #[case] counters: Counters,
        #[case] expected_result: ExecutionResult,
        #[case] expected_verdict: BuildVerdict,
    ) {
        assert_eq!(
            effective_result(Some(Errored), &counters, true),
            Some(expected_result)
        );
        assert_eq!(verdict(Some(Errored), &counters, true), expected_verdict);
    }

    #[test]
    fn test_errored_without_ignore_fails_even_with_skips() {
        let counters = counters(0, 0, 2, None);
        assert_eq!(effective_result(Some(Errored), &counters, false), Some(Errored));
        assert_eq!(verdict(Some(Errored), &counters, false), BuildVerdict::Failure);
    }

    #[test]
    fn test_no_result_fails() {
        let counters = counters(0, 0, 0, None);
        assert_eq!(verdict(None, &counters, false), BuildVerdict::Failure);
        assert_eq!(verdict(None, &counters, true), BuildVerdict::Failure);
    }

    #[test]
    fn test_any_skip_fails_unless_errored() {
        let results = [None, Some(Passed), Some(Warned), Some(Failed), Some(Skipped), Some(Stopped)];
        for result in results {
            for skipped in 1..4 {
                for ignore_run_error in [false, true] {
                    let counters = counters(skipped % 2, skipped, skipped, Some(skipped % 3));
                    assert_eq!(
                        verdict(result, &counters, ignore_run_error),
                        BuildVerdict::Failure,
                        "{result:?} with {counters:?}"
                    );
                }
            }
        }
    }

    #[test]
    fn test_verdict_is_idempotent() {
        let results = [None, Some(Passed), Some(Warned), Some(Failed), Some(Errored)];
        for result in results {
            for counters in [counters(0, 0, 0, None), counters(0, 2, 0, Some(1)), counters(1, 0, 1, None)] {
                for ignore_run_error in [false, true] {
                    let once = effective_result(result, &counters, ignore_run_error);
                    assert_eq!(effective_result(once, &counters, ignore_run_error), once);
                    assert_eq!(
                        verdict(result, &counters, ignore_run_error),
                        verdict(result, &counters, ignore_run_error)
                    );
                }
            }
        }
    }
}
