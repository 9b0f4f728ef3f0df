use std::fs;
use std::path::Path;

use restore_core::RestoreError;
use restore_io::{load_model_dir, parameter_files};

fn write(dir: &Path, name: &str, text: &str) {
    fs::write(dir.join(name), text).unwrap();
}

fn two_node_model(dir: &Path) {
    write(
        dir,
        "model.toml",
        "country = \"CH\"\nfirst_year = 2020\nlast_year = 2022\nrepresentative_days = 2\nhour_slice = 6\n",
    );
    write(dir, "FiE.csv", "entity,elecsupply\ndem_elec,1\n");
    write(dir, "FoE.csv", "entity,elecsupply\nconv_elec_gas,1\n");
    write(
        dir,
        "conv.csv",
        "kind,parameter,flow,year,conv_elec_gas\n\
         configuration,enable_capacity,,,1\n\
         annual,actual_capacity,,2020,10\n\
         constant,capacity_to_activity,,,8760\n",
    );
    write(
        dir,
        "dem.csv",
        "kind,parameter,flow,year,dem_elec\n\
         annual,actual_demand,,2020,100\n\
         annual,actual_demand,,2021,110\n\
         annual,actual_demand,,2022,120\n",
    );
}

#[test]
fn loads_complete_directory() {
    let dir = tempfile::tempdir().unwrap();
    two_node_model(dir.path());

    let files = parameter_files(dir.path()).unwrap();
    let names: Vec<_> = files
        .iter()
        .map(|p| p.file_name().unwrap().to_str().unwrap().to_string())
        .collect();
    assert_eq!(names, vec!["conv.csv", "dem.csv"]);

    let inputs = load_model_dir(dir.path()).unwrap();
    assert_eq!(inputs.settings.representative_days, 2);
    assert_eq!(inputs.store.len(), 2);
    assert_eq!(inputs.incidence.fie().len(), 1);
    assert_eq!(inputs.incidence.foe().len(), 1);
    assert_eq!(
        inputs.store.get_annual("dem_elec", "actual_demand", 2021).unwrap(),
        110.0
    );
    assert_eq!(
        inputs
            .store
            .get_const_fxe("conv_elec_gas", "output_efficiency", "elecsupply")
            .unwrap(),
        Some(1.0)
    );
}

#[test]
fn missing_incidence_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    two_node_model(dir.path());
    fs::remove_file(dir.path().join("FoE.csv")).unwrap();
    let err = load_model_dir(dir.path()).unwrap_err();
    assert!(format!("{err:#}").contains("FoE.csv"));
}

#[test]
fn conflicting_tables_are_rejected() {
    let dir = tempfile::tempdir().unwrap();
    two_node_model(dir.path());
    write(
        dir.path(),
        "zz_override.csv",
        "kind,parameter,flow,year,dem_elec\nannual,actual_demand,,2020,90\n",
    );
    let err = load_model_dir(dir.path()).unwrap_err();
    assert!(matches!(
        err.root_cause().downcast_ref::<RestoreError>(),
        Some(RestoreError::InvalidConfiguration { .. })
    ));
}
