//! # dispatch-cli — Operator Tooling for Service Dispatch
//!
//! Provides the `dispatch` command-line interface. Every subcommand runs
//! offline against the domain crates: nothing here talks to the API or
//! the database.
//!
//! ## Subcommands
//!
//! - `dispatch distance` — Great-circle distance between two points.
//! - `dispatch rank` — Rank a branch file by distance from a customer.
//! - `dispatch sla` — Remaining minutes and expiry for a deadline.
//! - `dispatch transitions` — The full (status, trigger) table.
//!
//! ```bash
//! dispatch distance --from 24.7136,46.6753 --to 24.7743,46.7386
//! dispatch rank --lat 24.71 --lng 46.67 --branches branches.yaml --partner 3
//! dispatch sla --deadline 2026-02-10T09:15:00Z
//! dispatch transitions --json
//! ```
//!
//! Handlers return an exit code: `0` on success, `1` when the command ran
//! but found nothing to report (e.g. no rankable branch).

pub mod distance;
pub mod rank;
pub mod sla;
pub mod transitions;

use std::path::Path;

use anyhow::{Context, Result};

use dispatch_core::Branch;

/// Load a branch list from a JSON or YAML file.
///
/// `.yaml` and `.yml` files are read as YAML; anything else as JSON.
pub fn load_branches(path: &Path) -> Result<Vec<Branch>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read branch file: {}", path.display()))?;
    let is_yaml = matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yaml") | Some("yml")
    );
    let branches = if is_yaml {
        serde_yaml::from_str(&content)
            .with_context(|| format!("invalid YAML in {}", path.display()))?
    } else {
        serde_json::from_str(&content)
            .with_context(|| format!("invalid JSON in {}", path.display()))?
    };
    Ok(branches)
}
