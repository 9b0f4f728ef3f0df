//! Parameter table CSV reader.
//!
//! Layout (one file per entity group, any number of files):
//!
//! ```text
//! kind,parameter,flow,year,conv_elec_pv,conv_elec_hydro
//! configuration,enable_capacity,,,1,1
//! constant,lifetime,,,25,80
//! annual,actual_capacity,,2020,2.5,13.8
//! constant_fxe,output_efficiency,elecsupply,,1,0.9
//! ```
//!
//! An empty cell, `nan` or `NaN` is an empty value.

use std::io::Read;
use std::path::Path;

use anyhow::{bail, Context, Result};
use csv::{ReaderBuilder, StringRecord};
use restore_core::{CellKey, ConfigStore, ValueKind, Year};

const KEY_COLUMNS: [&str; 4] = ["kind", "parameter", "flow", "year"];

/// Parse one table cell into a value.
pub fn parse_cell(raw: &str) -> Result<Option<f64>> {
    let raw = raw.trim();
    if raw.is_empty() || raw.eq_ignore_ascii_case("nan") {
        return Ok(None);
    }
    let value: f64 = raw
        .parse()
        .with_context(|| format!("'{raw}' is not a number"))?;
    Ok(Some(value).filter(|v| !v.is_nan()))
}

fn parse_year(raw: &str) -> Result<Option<Year>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }
    // spreadsheets export years as 2020.0
    let value: f64 = raw.parse().with_context(|| format!("'{raw}' is not a year"))?;
    if value.fract() != 0.0 {
        bail!("'{raw}' is not a whole year");
    }
    Ok(Some(value as Year))
}

fn non_empty(raw: &str) -> Option<&str> {
    let raw = raw.trim();
    (!raw.is_empty()).then_some(raw)
}

/// Read a parameter table into `store`. Returns the number of cells stored.
///
/// Every entity column is declared in the store even if all its cells are
/// empty.
pub fn read_parameter_table<R: Read>(reader: R, store: &mut ConfigStore) -> Result<usize> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .flexible(false)
        .from_reader(reader);
    let headers = rdr.headers().context("reading table header")?.clone();
    check_key_columns(&headers)?;

    let entities: Vec<String> = headers
        .iter()
        .skip(KEY_COLUMNS.len())
        .map(|h| h.trim().to_string())
        .collect();
    if entities.iter().any(String::is_empty) {
        bail!("table header has an empty entity column");
    }
    for entity in &entities {
        store.declare_entity(entity);
    }

    let mut stored = 0;
    for (row_idx, record) in rdr.records().enumerate() {
        let record = record.with_context(|| format!("reading row {}", row_idx + 2))?;
        let line = row_idx + 2;
        let kind: ValueKind = record[0]
            .parse()
            .with_context(|| format!("row {line}: bad kind"))?;
        let parameter = non_empty(&record[1])
            .with_context(|| format!("row {line}: empty parameter name"))?;
        let flow = non_empty(&record[2]);
        let year = parse_year(&record[3]).with_context(|| format!("row {line}"))?;
        let key = CellKey { kind, parameter, flow, year };

        for (entity, raw) in entities.iter().zip(record.iter().skip(KEY_COLUMNS.len())) {
            let cell = parse_cell(raw)
                .with_context(|| format!("row {line}, entity '{entity}', parameter '{parameter}'"))?;
            store
                .insert(entity, key, cell)
                .with_context(|| format!("row {line}"))?;
            stored += 1;
        }
    }
    Ok(stored)
}

fn check_key_columns(headers: &StringRecord) -> Result<()> {
    for (idx, expected) in KEY_COLUMNS.iter().enumerate() {
        match headers.get(idx) {
            Some(found) if found.trim().eq_ignore_ascii_case(expected) => {}
            Some(found) => bail!("column {} must be '{expected}', found '{found}'", idx + 1),
            None => bail!("table header is missing the '{expected}' column"),
        }
    }
    Ok(())
}

/// Read a parameter table file into `store`.
pub fn load_parameter_file(path: &Path, store: &mut ConfigStore) -> Result<usize> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("opening parameter table '{}'", path.display()))?;
    read_parameter_table(file, store)
        .with_context(|| format!("parsing parameter table '{}'", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use restore_core::RestoreError;

    const TABLE: &str = "\
kind,parameter,flow,year,conv_elec_pv,conv_elec_hydro
configuration,enable_capacity,,,1,
constant,lifetime,,,25,80
annual,actual_capacity,,2020.0,2.5,13.8
annual,actual_capacity,,2021,,14
constant_fxe,output_efficiency,elecsupply,,1,0.9
";

    #[test]
    fn test_reads_all_kinds() {
        let mut store = ConfigStore::new();
        let stored = read_parameter_table(TABLE.as_bytes(), &mut store).unwrap();
        assert_eq!(stored, 10);
        assert!(store.check_cnf("conv_elec_pv", "enable_capacity"));
        assert!(!store.check_cnf("conv_elec_hydro", "enable_capacity"));
        assert_eq!(store.get_const("conv_elec_hydro", "lifetime"), Some(80.0));
        assert_eq!(store.get_annual("conv_elec_pv", "actual_capacity", 2020).unwrap(), 2.5);
        assert!(store.get_annual("conv_elec_pv", "actual_capacity", 2021).is_err());
        assert_eq!(
            store.get_const_fxe("conv_elec_hydro", "output_efficiency", "elecsupply").unwrap(),
            Some(0.9)
        );
    }

    #[test]
    fn test_cell_parsing() {
        assert_eq!(parse_cell(" 1.5 ").unwrap(), Some(1.5));
        assert_eq!(parse_cell("").unwrap(), None);
        assert_eq!(parse_cell("NaN").unwrap(), None);
        assert!(parse_cell("yes").is_err());
    }

    #[test]
    fn test_bad_header() {
        let mut store = ConfigStore::new();
        let err = read_parameter_table("param,kind,flow,year,a\n".as_bytes(), &mut store);
        assert!(err.is_err());
    }

    #[test]
    fn test_duplicate_definition_across_tables() {
        let mut store = ConfigStore::new();
        read_parameter_table(TABLE.as_bytes(), &mut store).unwrap();
        let again = "kind,parameter,flow,year,conv_elec_pv\nconstant,lifetime,,,30\n";
        let err = read_parameter_table(again.as_bytes(), &mut store).unwrap_err();
        let root = err.root_cause().downcast_ref::<RestoreError>();
        assert!(matches!(root, Some(RestoreError::InvalidConfiguration { .. })));
    }

    #[test]
    fn test_annual_row_without_year_rejected() {
        let mut store = ConfigStore::new();
        let table = "kind,parameter,flow,year,conv_x\nannual,actual_capacity,,,1\n";
        assert!(read_parameter_table(table.as_bytes(), &mut store).is_err());
    }
}
