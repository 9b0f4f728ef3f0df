use std::fmt::Write as _;
use std::path::Path;

use restore_algo::library::expressions::total_annual_activity;
use restore_algo::pipeline::technology_sector;
use restore_algo::{build_model, DemandProfile, DemandSector, ModelAssembler};
use restore_core::{CellKey, ConfigStore, IncidenceBuilder, ModelSettings, Slice, TimeIndex};

fn write_profile(root: &Path, name: &str) {
    let mut csv = String::from("day");
    for h in 0..24 {
        write!(csv, ",{h}").unwrap();
    }
    csv.push('\n');
    for d in 0..365 {
        write!(csv, "{d}").unwrap();
        for h in 0..24 {
            let winter = if d < 80 || d > 300 { 3.0 } else { 0.0 };
            let evening = if (17..22).contains(&h) { 2.0 } else { 0.0 };
            let weekend = if d % 7 >= 5 { -1.5 } else { 0.0 };
            write!(csv, ",{}", 6.0 + winter + evening + weekend + (d % 3) as f64 * 0.1).unwrap();
        }
        csv.push('\n');
    }
    let path = root.join("elec_supply").join(name);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, csv).unwrap();
}

fn demand_store(totals: &[(i32, f64)]) -> ConfigStore {
    let mut store = ConfigStore::new();
    for &(year, total) in totals {
        store
            .insert("dem_elec", CellKey::annual("actual_demand", year), Some(total))
            .unwrap();
    }
    store
        .insert("dem_elec", CellKey::constant_fxe("input_efficiency", "elecsupply"), Some(1.0))
        .unwrap();
    store
        .insert("dem_elec", CellKey::constant("cost_variable_om"), Some(0.0))
        .unwrap();
    store
}

/// Annual demand implied by the fixed activity values.
fn fixed_annual(assembled: &restore_algo::AssembledModel<'_>, year: i32) -> f64 {
    let model = &assembled.model;
    total_annual_activity(model, "dem_elec", year)
        .unwrap()
        .eval(|v| model.vars().fixed_value(v))
}

#[test]
fn clustered_days_reweight_the_year() {
    let dir = tempfile::tempdir().unwrap();
    write_profile(dir.path(), "CH_2019.csv");

    let settings = ModelSettings {
        first_year: 2020,
        last_year: 2022,
        year_step: 2,
        representative_days: 3,
        hour_slice: 4,
        profiles_dir: Some(dir.path().to_path_buf()),
        ..Default::default()
    };
    let store = demand_store(&[(2020, 61_000.0), (2022, 64_000.0)]);
    let incidence = IncidenceBuilder::new().consumes("elecsupply", "dem_elec").build();
    let assembled = build_model(&store, incidence, &settings).unwrap();
    let time = assembled.model.time();

    assert_eq!(time.years(), &[2020, 2022]);
    assert_eq!(time.days().len(), 3);
    for year in [2020, 2022] {
        assert!((time.weight_sum(year) - 365.0).abs() < 1e-9);
    }
    assert!(((fixed_annual(&assembled, 2020) - 61_000.0) / 61_000.0).abs() < 1e-9);
    assert!(((fixed_annual(&assembled, 2022) - 64_000.0) / 64_000.0).abs() < 1e-9);
}

#[test]
fn without_profiles_demand_is_flat() {
    let settings = ModelSettings {
        representative_days: 2,
        hour_slice: 6,
        ..Default::default()
    };
    let store = demand_store(&[(2020, 8760.0)]);
    let incidence = IncidenceBuilder::new().consumes("elecsupply", "dem_elec").build();
    let assembled = build_model(&store, incidence, &settings).unwrap();

    let values: Vec<Option<f64>> = assembled
        .model
        .time()
        .slices()
        .map(|s| {
            let a = assembled.model.activity("dem_elec", &s).unwrap();
            assembled.model.vars().fixed_value(a)
        })
        .collect();
    assert_eq!(values.len(), 8);
    assert!(values.iter().all(|v| *v == Some(1.0)));
    assert!((fixed_annual(&assembled, 2020) - 8760.0).abs() < 1e-9);
}

#[test]
fn missing_total_is_reported_per_year() {
    let dir = tempfile::tempdir().unwrap();
    write_profile(dir.path(), "CH_2019.csv");
    let settings = ModelSettings {
        last_year: 2021,
        representative_days: 2,
        hour_slice: 6,
        profiles_dir: Some(dir.path().to_path_buf()),
        ..Default::default()
    };
    let store = demand_store(&[(2020, 1000.0)]);
    let incidence = IncidenceBuilder::new().consumes("elecsupply", "dem_elec").build();
    let err = build_model(&store, incidence, &settings).unwrap_err();
    assert!(err.is_configuration_error());
    assert!(err.to_string().contains("2021"), "{err}");
}

#[test]
fn daily_shape_spreads_one_day() {
    let mut shape = vec![0.0; 24];
    shape[19] = 0.5;
    shape[21] = 0.5;
    let store = demand_store(&[(2020, 3650.0)]);
    let incidence = IncidenceBuilder::new().consumes("elecsupply", "dem_elec").build();
    let time = TimeIndex::new(2020, 2020, 1, 6).unwrap();
    let demand = DemandSector::new().with_profile("dem_elec", DemandProfile::DailyShape(shape));
    let assembled = ModelAssembler::new(&store, time, incidence)
        .with_demand(demand)
        .assemble()
        .unwrap();
    let model = &assembled.model;

    let fixed = |hour| {
        let a = model.activity("dem_elec", &Slice::new(2020, 0, hour)).unwrap();
        model.vars().fixed_value(a).unwrap()
    };
    assert_eq!(fixed(0), 0.0);
    assert_eq!(fixed(12), 0.0);
    // 10 per day, all of it within the 18-24h slot
    assert!((fixed(18) - 10.0 / 6.0).abs() < 1e-12);
    assert!((fixed_annual(&assembled, 2020) - 3650.0).abs() < 1e-9);
}

#[test]
fn malformed_daily_shape_is_rejected() {
    let store = demand_store(&[(2020, 3650.0)]);
    let incidence = IncidenceBuilder::new().consumes("elecsupply", "dem_elec").build();
    let time = TimeIndex::new(2020, 2020, 1, 6).unwrap();
    let demand = DemandSector::new().with_profile("dem_elec", DemandProfile::DailyShape(vec![0.5; 24]));
    let err = ModelAssembler::new(&store, time, incidence)
        .with_demand(demand)
        .assemble()
        .unwrap_err();
    assert!(err.is_configuration_error());
}

#[test]
fn load_factor_files_reach_the_technologies() {
    let dir = tempfile::tempdir().unwrap();
    let mut csv = String::from("day");
    for h in 0..24 {
        write!(csv, ",{h}").unwrap();
    }
    csv.push('\n');
    for d in 0..2 {
        write!(csv, "{d}").unwrap();
        for h in 0..24 {
            let sun = if (8..16).contains(&h) { 0.5 + 0.2 * d as f64 } else { 0.0 };
            write!(csv, ",{sun}").unwrap();
        }
        csv.push('\n');
    }
    std::fs::create_dir_all(dir.path().join("lf_vre")).unwrap();
    std::fs::write(dir.path().join("lf_vre").join("conv_elec_pv.csv"), csv).unwrap();

    let settings = ModelSettings {
        profiles_dir: Some(dir.path().to_path_buf()),
        ..Default::default()
    };
    let store = demand_store(&[(2020, 1000.0)]);
    let incidence = IncidenceBuilder::new()
        .produces("elecsupply", "conv_elec_pv")
        .produces("elecsupply", "conv_elec_gas")
        .consumes("elecsupply", "dem_elec")
        .build();
    let sector = technology_sector(&store, &incidence, &settings).unwrap();

    let profiles = sector.load_factors();
    assert_eq!(profiles.len(), 1);
    let pv = &profiles["conv_elec_pv"];
    assert_eq!(pv.len(), 24);
    assert!((pv[10] - 0.6).abs() < 1e-12);
    assert_eq!(pv[20], 0.0);

    let without = ModelSettings::default();
    assert!(technology_sector(&store, &incidence, &without).unwrap().load_factors().is_empty());
}
