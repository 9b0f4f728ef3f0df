//! Storage units
//!
//! Storage is modelled with the generic constraint set only: charging is an
//! input flow, discharging an output flow, and activity links the two.

use restore_core::RestoreResult;
use tracing::info;

use super::technology::configure_generic;
use super::{declare_sets, Sector};
use crate::library::{cost, LoadFactorProfiles};
use crate::model::{LinExpr, Model};

const PREFIXES: &[&str] = &["sto_"];
pub const SET_STORAGES: &str = "Stos";

#[derive(Debug, Clone, Default)]
pub struct StorageSector;

impl StorageSector {
    pub fn new() -> Self {
        Self
    }
}

impl Sector for StorageSector {
    fn name(&self) -> &str {
        "storage"
    }

    fn prefixes(&self) -> &[&str] {
        PREFIXES
    }

    fn configure(&self, model: &mut Model) -> RestoreResult<()> {
        let sets = declare_sets(self, model, SET_STORAGES)?;
        configure_generic(model, "sto", &sets, &LoadFactorProfiles::new())?;
        info!(entities = sets.entities.len(), "configured storage sector");
        Ok(())
    }

    fn cost(&self, model: &Model) -> RestoreResult<LinExpr> {
        match model.set(SET_STORAGES) {
            Some(stos) => cost::cost_combined(model, stos, model.time().years()),
            None => Ok(LinExpr::new()),
        }
    }
}
