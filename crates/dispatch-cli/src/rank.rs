//! # Rank Subcommand
//!
//! Ranks a branch file by distance from a customer location, nearest
//! first, with the same tie-breaking the dispatcher uses (rounded
//! distance, then branch id). Branches with missing or out-of-range
//! coordinates are skipped and counted.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use dispatch_core::{GeoPoint, PartnerId};
use dispatch_geo::{rank_branches, RankedBranch};

use crate::load_branches;

/// Arguments for the `dispatch rank` subcommand.
#[derive(Args, Debug)]
pub struct RankArgs {
    /// Customer latitude.
    #[arg(long, allow_hyphen_values = true)]
    pub lat: f64,

    /// Customer longitude.
    #[arg(long, allow_hyphen_values = true)]
    pub lng: f64,

    /// JSON or YAML file holding a list of branches.
    #[arg(long)]
    pub branches: PathBuf,

    /// Only rank this partner's branches.
    #[arg(long)]
    pub partner: Option<i64>,

    /// Emit the ranking as JSON.
    #[arg(long)]
    pub json: bool,
}

/// Execute the rank subcommand.
pub fn run_rank(args: &RankArgs) -> Result<u8> {
    let customer = GeoPoint::new(args.lat, args.lng).context("invalid customer location")?;
    let mut candidates = load_branches(&args.branches)?;
    if let Some(partner) = args.partner {
        let partner = PartnerId::new(partner);
        candidates.retain(|b| b.partner_id == partner);
    }

    let ranked = rank_branches(&customer, &candidates);
    let excluded = candidates.len() - ranked.len();
    if excluded > 0 {
        tracing::warn!(excluded, "skipped branches without valid coordinates");
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&ranked)?);
    } else if ranked.is_empty() {
        println!("No rankable branches.");
    } else {
        print!("{}", render_table(&ranked));
    }

    Ok(if ranked.is_empty() { 1 } else { 0 })
}

fn render_table(ranked: &[RankedBranch]) -> String {
    let mut out = format!(
        "{:>4}  {:>8}  {:>8}  {:>10}  {:<6}  {}\n",
        "#", "branch", "partner", "km", "radius", "name"
    );
    for (i, r) in ranked.iter().enumerate() {
        out.push_str(&format!(
            "{:>4}  {:>8}  {:>8}  {:>10.1}  {:<6}  {}\n",
            i + 1,
            r.branch.id.get(),
            r.branch.partner_id.get(),
            r.distance_km,
            if r.within_service_radius { "in" } else { "out" },
            r.branch.name.as_deref().unwrap_or("-"),
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn write_branches(dir: &Path) -> PathBuf {
        let path = dir.join("branches.json");
        std::fs::write(
            &path,
            r#"[
                {"id": 3, "partner_id": 1, "lat": 0.5, "lng": 0.0, "service_radius_km": 10.0},
                {"id": 2, "partner_id": 1, "lat": 0.0288, "lng": 0.0, "service_radius_km": 5.0},
                {"id": 1, "partner_id": 2, "lat": 0.0289, "lng": 0.0, "service_radius_km": 5.0},
                {"id": 9, "partner_id": 2, "lat": 123.0, "lng": 0.0, "service_radius_km": 5.0}
            ]"#,
        )
        .unwrap();
        path
    }

    fn args(branches: PathBuf, partner: Option<i64>) -> RankArgs {
        RankArgs {
            lat: 0.0,
            lng: 0.0,
            branches,
            partner,
            json: true,
        }
    }

    #[test]
    fn table_lists_nearest_first_with_id_tiebreak() {
        let dir = tempfile::tempdir().unwrap();
        let candidates = load_branches(&write_branches(dir.path())).unwrap();
        let ranked = rank_branches(&GeoPoint::new(0.0, 0.0).unwrap(), &candidates);

        let table = render_table(&ranked);
        let rows: Vec<&str> = table.lines().skip(1).collect();
        assert_eq!(rows.len(), 3);
        // Branches 1 and 2 both round to 3.2 km; the lower id wins.
        assert!(rows[0].contains("       1         2"), "{table}");
        assert!(rows[1].contains("       2         1"), "{table}");
        assert!(rows[2].contains("out"), "{table}");
    }

    #[test]
    fn run_with_partner_filter() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_branches(dir.path());
        assert_eq!(run_rank(&args(path, Some(1))).unwrap(), 0);
    }

    #[test]
    fn run_without_candidates_exits_one() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_branches(dir.path());
        assert_eq!(run_rank(&args(path, Some(99))).unwrap(), 1);
    }

    #[test]
    fn invalid_customer_location_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut a = args(write_branches(dir.path()), None);
        a.lat = 91.0;
        assert!(run_rank(&a).is_err());
    }
}
