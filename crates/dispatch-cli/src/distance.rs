//! # Distance Subcommand
//!
//! Great-circle distance between two `LAT,LNG` points, rounded to one
//! decimal place the way branch ranking rounds it.

use anyhow::Result;
use clap::Args;

use dispatch_core::GeoPoint;
use dispatch_geo::{distance_km, haversine_km};

/// Arguments for the `dispatch distance` subcommand.
#[derive(Args, Debug)]
pub struct DistanceArgs {
    /// Origin as LAT,LNG (e.g. "24.7136,46.6753").
    #[arg(long, allow_hyphen_values = true)]
    pub from: GeoPoint,

    /// Destination as LAT,LNG.
    #[arg(long, allow_hyphen_values = true)]
    pub to: GeoPoint,

    /// Print the unrounded figure as well.
    #[arg(long)]
    pub precise: bool,
}

/// Execute the distance subcommand.
pub fn run_distance(args: &DistanceArgs) -> Result<u8> {
    println!("{}", render(args));
    Ok(0)
}

fn render(args: &DistanceArgs) -> String {
    let rounded = distance_km(&args.from, &args.to);
    if args.precise {
        format!(
            "{rounded:.1} km ({:.6} km unrounded)",
            haversine_km(&args.from, &args.to)
        )
    } else {
        format!("{rounded:.1} km")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(from: &str, to: &str, precise: bool) -> DistanceArgs {
        DistanceArgs {
            from: from.parse().unwrap(),
            to: to.parse().unwrap(),
            precise,
        }
    }

    #[test]
    fn one_degree_of_latitude() {
        assert_eq!(render(&args("0,0", "1,0", false)), "111.2 km");
    }

    #[test]
    fn same_point_is_zero() {
        assert_eq!(render(&args("24.7,46.6", "24.7,46.6", false)), "0.0 km");
    }

    #[test]
    fn precise_includes_unrounded() {
        let out = render(&args("0,0", "1,0", true));
        assert!(out.starts_with("111.2 km (111.19"), "{out}");
    }

    #[test]
    fn run_returns_success() {
        assert_eq!(run_distance(&args("-33.86,151.2", "51.5,-0.12", false)).unwrap(), 0);
    }
}
