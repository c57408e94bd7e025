//! # SLA Subcommand
//!
//! Evaluates an assignment deadline against a clock reading: whole minutes
//! remaining (negative once overdue) and whether the window has lapsed.

use anyhow::Result;
use chrono::{DateTime, Utc};
use clap::Args;
use serde::Serialize;

use dispatch_state::{is_expired, remaining_minutes};

/// Arguments for the `dispatch sla` subcommand.
#[derive(Args, Debug)]
pub struct SlaArgs {
    /// Stamped deadline, RFC 3339 (e.g. "2026-02-10T09:15:00Z").
    #[arg(long)]
    pub deadline: DateTime<Utc>,

    /// Evaluate at this instant instead of the current time.
    #[arg(long)]
    pub now: Option<DateTime<Utc>>,

    /// Emit the evaluation as JSON.
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Serialize, PartialEq)]
struct SlaReport {
    deadline: DateTime<Utc>,
    now: DateTime<Utc>,
    remaining_minutes: i64,
    expired: bool,
}

impl SlaReport {
    fn evaluate(deadline: DateTime<Utc>, now: DateTime<Utc>) -> Self {
        Self {
            deadline,
            now,
            remaining_minutes: remaining_minutes(deadline, now),
            expired: is_expired(deadline, now),
        }
    }
}

/// Execute the sla subcommand.
pub fn run_sla(args: &SlaArgs) -> Result<u8> {
    let report = SlaReport::evaluate(args.deadline, args.now.unwrap_or_else(Utc::now));
    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("{}", render(&report));
    }
    Ok(0)
}

fn render(report: &SlaReport) -> String {
    if report.expired {
        format!(
            "EXPIRED: deadline {} passed ({} min)",
            report.deadline.to_rfc3339(),
            report.remaining_minutes
        )
    } else {
        format!(
            "OK: {} min remaining until {}",
            report.remaining_minutes,
            report.deadline.to_rfc3339()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(h: u32, m: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 2, 10, h, m, s).unwrap()
    }

    #[test]
    fn partial_minute_rounds_up() {
        let report = SlaReport::evaluate(at(9, 15, 0), at(9, 5, 30));
        assert_eq!(report.remaining_minutes, 10);
        assert!(!report.expired);
        assert!(render(&report).starts_with("OK: 10 min remaining"));
    }

    #[test]
    fn deadline_instant_is_expired() {
        let report = SlaReport::evaluate(at(9, 15, 0), at(9, 15, 0));
        assert_eq!(report.remaining_minutes, 0);
        assert!(report.expired);
        assert!(render(&report).starts_with("EXPIRED"));
    }

    #[test]
    fn overdue_is_negative() {
        let report = SlaReport::evaluate(at(9, 15, 0), at(9, 17, 0));
        assert_eq!(report.remaining_minutes, -2);
    }

    #[test]
    fn json_field_names() {
        let report = SlaReport::evaluate(at(9, 15, 0), at(9, 0, 0));
        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(value["remaining_minutes"], 15);
        assert_eq!(value["expired"], false);
        assert_eq!(value["deadline"], "2026-02-10T09:15:00Z");
    }
}
