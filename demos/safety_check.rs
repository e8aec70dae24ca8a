//! Example of assessing area safety around a user.
//!
//! Run with: cargo run --example safety_check

use chrono::{TimeDelta, Utc};
use crime_safety::geo_utils::{format_distance, nearest_point};
use crime_safety::{
    cutoff_for, filter_since, ClassifierConfig, DensityConfig, GpsPoint, IncidentReport,
    SafetyStrategy, TimeFilterOption, UserLocation,
};

fn main() {
    let now = Utc::now();

    // User in Quezon City
    let user = UserLocation::new(14.6760, 121.0437, now);

    // Incidents at increasing distance and age
    let incidents = vec![
        IncidentReport::new(14.6765, 121.0440, now - TimeDelta::hours(5)),
        IncidentReport::new(14.6780, 121.0450, now - TimeDelta::days(2)),
        IncidentReport::new(14.6720, 121.0400, now - TimeDelta::days(9)),
        IncidentReport::new(14.6850, 121.0500, now - TimeDelta::days(20)),
        IncidentReport::new(14.6900, 121.0600, now - TimeDelta::days(45)),
        IncidentReport::new(14.7000, 121.0700, now - TimeDelta::days(120)),
    ];

    println!("Area Safety Example\n");
    println!("User at ({}, {}), {} incidents loaded\n", user.latitude, user.longitude, incidents.len());

    if let Some(nearest) = nearest_point(&GpsPoint::new(user.latitude, user.longitude), &incidents) {
        println!(
            "Nearest incident: {} {}\n",
            format_distance(nearest.distance_km),
            nearest.direction
        );
    }

    for filter in TimeFilterOption::ALL {
        let cutoff = cutoff_for(filter, &now);
        let visible = filter_since(&incidents, cutoff, |i| Some(i.occurred_at));

        println!("{} ({} incidents):", filter.label(), visible.len());

        for strategy in [
            SafetyStrategy::Simple(ClassifierConfig::default()),
            SafetyStrategy::DensityWeighted(DensityConfig::default()),
        ] {
            match strategy.assess(Some(&user), &visible, now) {
                Ok(assessment) => println!(
                    "   {:<16} {:<8} {} [{}]",
                    strategy.name(),
                    assessment.level.as_str(),
                    assessment.message,
                    assessment.display_color
                ),
                Err(e) => println!("   {:<16} error: {}", strategy.name(), e),
            }
        }
        println!();
    }

    // Without a location fix nothing is classified
    let strategy = SafetyStrategy::default();
    if let Err(e) = strategy.assess(None, &incidents, now) {
        println!("No location: {}", e);
    }
}
