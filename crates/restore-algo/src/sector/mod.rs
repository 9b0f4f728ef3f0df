//! # Sectors
//!
//! A sector claims the entities whose id starts with one of its prefixes,
//! declares its own named sets and calls into the
//! [`library`](crate::library) for its constraint blocks.
//!
//! | sector                 | prefixes          | sets                            |
//! |------------------------|-------------------|---------------------------------|
//! | [`DemandSector`]       | `dem_`            | `Dems`, `DemsFiE`               |
//! | [`TechnologySector`]   | `conv_`, `ext_`   | `Techs`, `TechsFiE`, `TechsFoE` |
//! | [`StorageSector`]      | `sto_`            | `Stos`, `StosFiE`, `StosFoE`    |
//! | [`TradeSector`]        | `trd_`            | `Trades`, `TradesImp`, ...      |
//!
//! Custom sectors implement [`Sector`] and are registered with
//! [`ModelAssembler::with_sector`](crate::ModelAssembler::with_sector).

pub mod demand;
pub mod storage;
pub mod technology;
pub mod trade;

use std::collections::BTreeSet;

use restore_core::{Direction, EntityId, FlowEntity, RestoreResult};

pub use demand::{DemandProfile, DemandSector};
pub use storage::StorageSector;
pub use technology::TechnologySector;
pub use trade::TradeSector;

use crate::model::{LinExpr, Model, SET_ENTITIES};

/// A group of entities configured together.
///
/// Sectors only read the configuration store and only register variables,
/// sets and blocks under their own names.
pub trait Sector: Send + Sync {
    /// Human-readable sector name, used in logs and summaries.
    fn name(&self) -> &str;

    /// Entity id prefixes this sector claims.
    fn prefixes(&self) -> &[&str];

    /// Declare sets, variables, constraint blocks and initial values.
    fn configure(&self, model: &mut Model) -> RestoreResult<()>;

    /// Contribution to the objective.
    fn cost(&self, model: &Model) -> RestoreResult<LinExpr>;

    fn claims(&self, entity: &EntityId) -> bool {
        self.prefixes().iter().any(|p| entity.has_prefix(p))
    }

    /// Claimed members of `Ents`.
    fn entities(&self, model: &Model) -> BTreeSet<EntityId> {
        model
            .set(SET_ENTITIES)
            .map(|ents| ents.iter().filter(|e| self.claims(e)).cloned().collect())
            .unwrap_or_default()
    }
}

/// Sets a sector declares for itself.
#[derive(Debug, Clone, Default)]
pub struct SectorSets {
    pub entities: BTreeSet<EntityId>,
    pub inputs: BTreeSet<FlowEntity>,
    pub outputs: BTreeSet<FlowEntity>,
}

/// Declare `{name}`, `{name}FiE` and `{name}FoE` for the sector's entities.
pub fn declare_sets<S: Sector + ?Sized>(sector: &S, model: &mut Model, name: &str) -> RestoreResult<SectorSets> {
    let entities = sector.entities(model);
    let inputs = model.incidence().subset(Direction::Input, &entities);
    let outputs = model.incidence().subset(Direction::Output, &entities);
    model.add_set(name, entities.clone())?;
    model.add_pair_set(&format!("{name}FiE"), inputs.clone())?;
    model.add_pair_set(&format!("{name}FoE"), outputs.clone())?;
    Ok(SectorSets {
        entities,
        inputs,
        outputs,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sector_object_safety() {
        // Compile-time check that Sector can be boxed
        fn accepts(_: &[Box<dyn Sector>]) {}
        let sectors: Vec<Box<dyn Sector>> = vec![
            Box::new(DemandSector::new()),
            Box::new(TechnologySector::new()),
            Box::new(StorageSector::new()),
            Box::new(TradeSector::new()),
        ];
        accepts(&sectors);
        assert_eq!(sectors[1].prefixes(), &["conv_", "ext_"]);
        assert!(sectors[3].claims(&EntityId::new("trd_elec_it")));
        assert!(!sectors[3].claims(&EntityId::new("conv_pv")));
    }
}
