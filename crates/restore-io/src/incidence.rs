//! FiE / FoE incidence table reader.
//!
//! Rows are entities, columns are flows. A non-empty cell connects the pair;
//! a numeric cell also carries the pair's constant efficiency.
//!
//! ```text
//! entity,natgas,elecsupply,heat
//! conv_chp,0.95,,
//! dem_elec,,1,
//! ```

use std::io::Read;
use std::path::Path;

use anyhow::{bail, Context, Result};
use csv::ReaderBuilder;
use restore_core::{ConfigStore, Direction, EntityId, FlowId, Incidence, IncidenceBuilder};
use tracing::debug;

/// One connected cell of an incidence table.
#[derive(Debug, Clone, PartialEq)]
pub struct Connection {
    pub flow: FlowId,
    pub entity: EntityId,
    pub efficiency: Option<f64>,
}

/// Parsed contents of `FiE.csv` or `FoE.csv`.
#[derive(Debug, Clone)]
pub struct IncidenceTable {
    pub direction: Direction,
    pub connections: Vec<Connection>,
}

impl IncidenceTable {
    /// Efficiency parameter seeded by this table's numeric cells.
    pub fn efficiency_parameter(&self) -> &'static str {
        match self.direction {
            Direction::Input => "input_efficiency",
            Direction::Output => "output_efficiency",
        }
    }
}

pub fn read_incidence_table<R: Read>(reader: R, direction: Direction) -> Result<IncidenceTable> {
    let mut rdr = ReaderBuilder::new().has_headers(true).from_reader(reader);
    let headers = rdr.headers().context("reading incidence header")?.clone();
    if headers.len() < 2 {
        bail!("incidence table needs an entity column and at least one flow column");
    }
    let flows: Vec<FlowId> = headers.iter().skip(1).map(|h| FlowId::new(h.trim())).collect();

    let mut connections = Vec::new();
    for (row_idx, record) in rdr.records().enumerate() {
        let line = row_idx + 2;
        let record = record.with_context(|| format!("reading incidence row {line}"))?;
        let entity = match record.get(0).map(str::trim) {
            Some(e) if !e.is_empty() => EntityId::new(e),
            _ => bail!("incidence row {line} has no entity id"),
        };
        for (flow, raw) in flows.iter().zip(record.iter().skip(1)) {
            let raw = raw.trim();
            if raw.is_empty() || raw.eq_ignore_ascii_case("nan") {
                continue;
            }
            // a non-numeric marker ("x") connects without an efficiency
            let efficiency = raw.parse::<f64>().ok().filter(|v| v.is_finite());
            if let Some(eff) = efficiency {
                if eff <= 0.0 {
                    bail!("incidence row {line}: efficiency of '{entity}' on '{flow}' must be positive, found {eff}");
                }
            }
            connections.push(Connection {
                flow: flow.clone(),
                entity: entity.clone(),
                efficiency,
            });
        }
    }
    Ok(IncidenceTable { direction, connections })
}

pub fn load_incidence_file(path: &Path, direction: Direction) -> Result<IncidenceTable> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("opening incidence table '{}'", path.display()))?;
    read_incidence_table(file, direction)
        .with_context(|| format!("parsing incidence table '{}'", path.display()))
}

/// Combine both tables into an [`Incidence`] and seed efficiencies.
///
/// Connected entities are declared in `store`. Numeric cells become
/// `input_efficiency` / `output_efficiency` flow constants unless the
/// parameter tables already define them.
pub fn build_incidence(tables: &[IncidenceTable], store: &mut ConfigStore) -> Incidence {
    let mut builder = IncidenceBuilder::new();
    for table in tables {
        for conn in &table.connections {
            store.declare_entity(conn.entity.as_str());
            if let Some(eff) = conn.efficiency {
                store.insert_default_fxe(
                    conn.entity.as_str(),
                    table.efficiency_parameter(),
                    conn.flow.as_str(),
                    eff,
                );
            }
            builder.connect(table.direction, conn.flow.clone(), conn.entity.clone());
        }
    }
    let incidence = builder.build();
    debug!(
        fie = incidence.fie().len(),
        foe = incidence.foe().len(),
        flows = incidence.flows().len(),
        "built incidence"
    );
    incidence
}

#[cfg(test)]
mod tests {
    use super::*;

    const FOE: &str = "\
entity,elecsupply,heat,natgas
conv_chp,0.4,0.45,
trd_gas,,,1
sto_unused,,,
";

    #[test]
    fn test_reads_connections_and_efficiencies() {
        let table = read_incidence_table(FOE.as_bytes(), Direction::Output).unwrap();
        assert_eq!(table.connections.len(), 3);
        assert_eq!(table.connections[0].efficiency, Some(0.4));
        assert!(table.connections.iter().all(|c| c.entity.as_str() != "sto_unused"));
    }

    #[test]
    fn test_marker_connects_without_efficiency() {
        let table = read_incidence_table("entity,elec\ndem_elec,x\n".as_bytes(), Direction::Input).unwrap();
        assert_eq!(table.connections.len(), 1);
        assert_eq!(table.connections[0].efficiency, None);
    }

    #[test]
    fn test_non_positive_efficiency_rejected() {
        assert!(read_incidence_table("entity,elec\nconv_x,0\n".as_bytes(), Direction::Output).is_err());
    }

    #[test]
    fn test_seeds_efficiency_without_override() {
        let mut store = ConfigStore::new();
        store
            .insert(
                "conv_chp",
                restore_core::CellKey::constant_fxe("output_efficiency", "heat"),
                Some(0.5),
            )
            .unwrap();
        let foe = read_incidence_table(FOE.as_bytes(), Direction::Output).unwrap();
        let fie = read_incidence_table("entity,natgas\nconv_chp,1\n".as_bytes(), Direction::Input).unwrap();
        let inc = build_incidence(&[fie, foe], &mut store);

        assert_eq!(inc.outputs_of("conv_chp").len(), 2);
        assert_eq!(inc.inputs_of("conv_chp").len(), 1);
        assert_eq!(store.get_const_fxe("conv_chp", "output_efficiency", "elecsupply").unwrap(), Some(0.4));
        assert_eq!(store.get_const_fxe("conv_chp", "output_efficiency", "heat").unwrap(), Some(0.5));
        assert_eq!(store.get_const_fxe("conv_chp", "input_efficiency", "natgas").unwrap(), Some(1.0));
        assert!(store.has_entity("trd_gas"));
    }
}
