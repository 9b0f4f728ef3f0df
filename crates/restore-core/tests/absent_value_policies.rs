//! Getter policies on the same (entity, parameter, year) pattern.

use restore_core::{CellKey, ConfigStore, RestoreError};

fn store_with_empty_cells() -> ConfigStore {
    let mut store = ConfigStore::new();
    store
        .insert("conv_elec_hydro", CellKey::annual("actual_activity", 2020), None)
        .unwrap();
    store
        .insert("conv_elec_hydro", CellKey::constant("actual_activity"), None)
        .unwrap();
    store
        .insert("conv_elec_hydro", CellKey::configuration("enable_capacity"), None)
        .unwrap();
    store
        .insert(
            "conv_elec_hydro",
            CellKey::constant_fxe("output_share_min", "elecsupply"),
            None,
        )
        .unwrap();
    store
}

#[test]
fn empty_annual_cell_raises_but_constant_is_absent() {
    let store = store_with_empty_cells();

    let err = store
        .get_annual("conv_elec_hydro", "actual_activity", 2020)
        .unwrap_err();
    match err {
        RestoreError::MissingRequiredValue { entity, parameter, year, flow } => {
            assert_eq!(entity, "conv_elec_hydro");
            assert_eq!(parameter, "actual_activity");
            assert_eq!(year, Some(2020));
            assert_eq!(flow, None);
        }
        other => panic!("unexpected error {other:?}"),
    }

    assert_eq!(store.get_const("conv_elec_hydro", "actual_activity"), None);
    assert_eq!(store.get("conv_elec_hydro", "actual_activity", 2020), None);
}

#[test]
fn empty_configuration_is_disabled_not_error() {
    let store = store_with_empty_cells();
    assert!(!store.check_cnf("conv_elec_hydro", "enable_capacity"));
    assert!(!store.check_cnf("conv_elec_hydro", "enable_import"));
    assert!(store
        .build_cnf_set(store.entities(), "enable_capacity")
        .is_empty());
}

#[test]
fn flow_lookup_distinguishes_key_from_cell() {
    let store = store_with_empty_cells();
    assert_eq!(
        store
            .get_fxe("conv_elec_hydro", "output_share_min", "elecsupply", 2020)
            .unwrap(),
        None
    );
    assert!(matches!(
        store.get_fxe("conv_elec_hydro", "output_share_min", "heat", 2020),
        Err(RestoreError::MissingRequiredValue { flow: Some(_), .. })
    ));
}
