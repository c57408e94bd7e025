//! # Transitions Subcommand
//!
//! Prints every `(status, trigger)` pair and its outcome, including the
//! pairs the state machine refuses. Useful for audits and for checking a
//! persisted request's status against what the dispatcher will accept.

use anyhow::Result;
use clap::Args;
use serde::Serialize;

use dispatch_state::{transition_table, RequestStatus, Trigger};

/// Arguments for the `dispatch transitions` subcommand.
#[derive(Args, Debug)]
pub struct TransitionsArgs {
    /// Emit the table as JSON.
    #[arg(long)]
    pub json: bool,

    /// Only print legal transitions.
    #[arg(long)]
    pub valid_only: bool,
}

#[derive(Debug, Serialize)]
struct Row {
    from: RequestStatus,
    trigger: Trigger,
    to: Option<RequestStatus>,
}

fn rows(valid_only: bool) -> Vec<Row> {
    transition_table()
        .into_iter()
        .filter(|(_, _, to)| !valid_only || to.is_some())
        .map(|(from, trigger, to)| Row { from, trigger, to })
        .collect()
}

/// Execute the transitions subcommand.
pub fn run_transitions(args: &TransitionsArgs) -> Result<u8> {
    let rows = rows(args.valid_only);
    if args.json {
        println!("{}", serde_json::to_string_pretty(&rows)?);
    } else {
        print!("{}", render(&rows));
    }
    Ok(0)
}

fn render(rows: &[Row]) -> String {
    let mut out = String::new();
    for row in rows {
        let outcome = match row.to {
            Some(to) => format!("-> {to}"),
            None => "(invalid)".to_string(),
        };
        out.push_str(&format!(
            "{:<12} {:<9} {}\n",
            row.from.as_str(),
            row.trigger.as_str(),
            outcome
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_table_includes_invalid_pairs() {
        let all = rows(false);
        assert_eq!(all.len(), RequestStatus::ALL.len() * Trigger::ALL.len());
        assert!(all.iter().any(|r| r.to.is_none()));
    }

    #[test]
    fn valid_only_has_ten_edges() {
        assert_eq!(rows(true).len(), 10);
    }

    #[test]
    fn text_rendering() {
        let text = render(&rows(false));
        assert!(text.contains("submitted    assign    -> assigned"), "{text}");
        assert!(text.contains("closed       reopen    (invalid)"), "{text}");
    }

    #[test]
    fn json_uses_snake_case_names() {
        let value = serde_json::to_value(rows(true)).unwrap();
        let edges = value.as_array().unwrap();
        assert!(edges.iter().any(|e| e["from"] == "in_progress"
            && e["trigger"] == "revert"
            && e["to"] == "confirmed"));
    }
}
