use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::path::Path;

use restore_core::{ModelSettings, RestoreError};
use restore_ts::{DemandClusterer, ProfileLibrary};

fn write_profile(root: &Path, name: &str, scale: f64) {
    let mut csv = String::from("day");
    for h in 0..24 {
        write!(csv, ",{h}").unwrap();
    }
    csv.push('\n');
    for d in 0..365 {
        write!(csv, "{d}").unwrap();
        for h in 0..24 {
            let winter = if d < 80 || d > 300 { 3.0 } else { 0.0 };
            let daytime = if (7..20).contains(&h) { 4.0 } else { 0.0 };
            write!(csv, ",{}", scale * (5.0 + winter + daytime)).unwrap();
        }
        csv.push('\n');
    }
    let path = root.join("elec_supply").join(name);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, csv).unwrap();
}

#[test]
fn every_year_matches_its_total() {
    let dir = tempfile::tempdir().unwrap();
    write_profile(dir.path(), "CH_2018.csv", 1.0);
    write_profile(dir.path(), "CH_2020.csv", 2.0);

    let clusterer = DemandClusterer::new(ProfileLibrary::new(dir.path()), 3).with_seed(0);
    let totals = BTreeMap::from([(2020, 58_000.0), (2021, 59_000.0), (2022, 60_500.0)]);
    let demand = clusterer.demand_by_year("CH", &totals).unwrap();

    assert_eq!(demand.len(), 3);
    for (year, total) in &totals {
        let d = &demand[year];
        let ratio_sum: f64 = d.ratios.iter().sum();
        assert!((ratio_sum - 1.0).abs() < 1e-9);
        assert!(((d.annual_total() - total) / total).abs() < 1e-6);
    }
    // 2021 and 2022 fall back to the earliest file, 2020 has its own
    assert_eq!(demand[&2021].ratios, demand[&2022].ratios);
}

#[test]
fn settings_without_library_disable_clustering() {
    let settings = ModelSettings::default();
    assert!(DemandClusterer::from_settings(&settings).is_none());

    let settings = ModelSettings {
        profiles_dir: Some("profiles".into()),
        representative_days: 4,
        hour_slice: 3,
        ..Default::default()
    };
    let clusterer = DemandClusterer::from_settings(&settings).unwrap();
    assert_eq!(clusterer.k(), 4);
}

#[test]
fn flat_zero_profile_reports_degenerate_clustering() {
    let dir = tempfile::tempdir().unwrap();
    write_profile(dir.path(), "CH_2020.csv", 0.0);
    let clusterer = DemandClusterer::new(ProfileLibrary::new(dir.path()), 2);
    let totals = BTreeMap::from([(2020, 100.0)]);
    let err = clusterer.demand_by_year("CH", &totals).unwrap_err();
    assert!(matches!(err, RestoreError::ClusteringDegenerate(_)));
}
