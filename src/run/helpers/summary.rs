use tabled::settings::object::{Columns, Rows};
use tabled::settings::{Alignment, Color, Modify, Style};
use tabled::{Table, Tabled};

use crate::poll::TestResultSnapshot;

#[derive(Tabled)]
struct CountersRow {
    #[tabled(rename = "Result")]
    result: String,
    #[tabled(rename = "Total")]
    total: u32,
    #[tabled(rename = "Passed")]
    passed: u32,
    #[tabled(rename = "Warned")]
    warned: u32,
    #[tabled(rename = "Failed")]
    failed: u32,
    #[tabled(rename = "Errored")]
    errored: u32,
    #[tabled(rename = "Skipped")]
    skipped: u32,
    #[tabled(rename = "Stopped")]
    stopped: String,
}

/// Renders the counters of a finished run as a one-row table.
pub fn build_counters_table(snapshot: &TestResultSnapshot) -> String {
    let counters = &snapshot.counters;
    let row = CountersRow {
        result: snapshot
            .result
            .map(|result| result.to_string())
            .unwrap_or_else(|| "-".to_string()),
        total: counters.total,
        passed: counters.passed,
        warned: counters.warned,
        failed: counters.failed,
        errored: counters.errored,
        skipped: counters.skipped,
        stopped: counters
            .stopped
            .map(|stopped| stopped.to_string())
            .unwrap_or_else(|| "-".to_string()),
    };

    let mut table = Table::new([row]);
    table
        .with(Style::rounded())
        .with(Modify::new(Rows::first()).with(Color::BOLD))
        .with(Modify::new(Columns::new(1..)).with(Alignment::right()));
    table.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::devicefarm::{Counters, ExecutionResult};

    #[test]
    fn test_counters_table() {
        let snapshot = TestResultSnapshot {
            run_id: "run".into(),
            run_name: "nightly".into(),
            status: "COMPLETED".into(),
            result: Some(ExecutionResult::Warned),
            counters: Counters {
                passed: 10,
                warned: 2,
                total: 12,
                ..Default::default()
            },
            console_url: None,
        };

        let table = console::strip_ansi_codes(&build_counters_table(&snapshot)).to_string();
        let lines: Vec<&str> = table.lines().collect();

        assert_eq!(lines.len(), 5);
        for header in ["Result", "Total", "Passed", "Warned", "Stopped"] {
            assert!(lines[1].contains(header), "missing {header} in {table}");
        }
        assert!(lines[3].contains("WARNED"));
        assert!(lines[3].contains("12"));
        assert!(lines[3].trim_end().ends_with("- │"));
    }
}
