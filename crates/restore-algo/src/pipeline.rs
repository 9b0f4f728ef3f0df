//! Settings-driven model construction
//!
//! ```text
//! ModelSettings ──▶ TimeIndex ──┐
//!        ├──▶ DemandClusterer ──┼──▶ ModelAssembler (default sectors) ──▶ AssembledModel
//!        │     (day weights +   │
//!        │      demand shapes)  │
//!        └──▶ ProfileLibrary ───┘
//!              (lf_vre/{entity}.csv load factors)
//! ```

use std::collections::BTreeMap;

use restore_core::{ConfigStore, EntityId, Incidence, ModelSettings, RestoreResult, TimeIndex, Year};
use restore_ts::{DemandClusterer, ProfileLibrary};
use tracing::{debug, info, warn};

use crate::assembler::{AssembledModel, ModelAssembler};
use crate::sector::{DemandProfile, DemandSector, Sector, TechnologySector};

/// Demand configuration for a run, re-weighting `time` when representative
/// days are clustered.
///
/// Without a profile library, or when the clustered entity is not configured,
/// every demand is flat and day weights stay equal.
pub fn demand_sector(store: &ConfigStore, settings: &ModelSettings, time: &mut TimeIndex) -> RestoreResult<DemandSector> {
    let Some(clusterer) = DemandClusterer::from_settings(settings) else {
        info!("no profile library configured; demand is flat");
        return Ok(DemandSector::new());
    };
    let entity = settings.clustering.entity.as_str();
    if !store.has_entity(entity) {
        warn!(entity, "clustered demand entity is not configured; demand is flat");
        return Ok(DemandSector::new());
    }

    let totals = time
        .years()
        .iter()
        .map(|&y| {
            store
                .get_annual(entity, &settings.clustering.total_parameter, y)
                .map(|total| (y, total))
        })
        .collect::<RestoreResult<BTreeMap<Year, f64>>>()?;
    let shapes = clusterer.demand_by_year(&settings.country, &totals)?;
    for (&year, shape) in &shapes {
        time.set_day_weights_from_ratios(year, &shape.ratios)?;
    }
    info!(
        entity,
        k = clusterer.k(),
        years = shapes.len(),
        "using clustered demand"
    );
    Ok(DemandSector::new().with_profile(entity, DemandProfile::Clustered(shapes)))
}

/// Technology configuration for a run: every technology with a load factor
/// file in the profile library gets an hourly maximum load factor profile.
pub fn technology_sector(
    store: &ConfigStore,
    incidence: &Incidence,
    settings: &ModelSettings,
) -> RestoreResult<TechnologySector> {
    let mut sector = TechnologySector::new();
    let Some(root) = settings.profiles_dir.as_ref() else {
        return Ok(sector);
    };
    let library = ProfileLibrary::new(root.clone());
    let mut entities: Vec<&EntityId> = store.entities().collect();
    let connected = incidence.entities();
    entities.extend(connected.iter());
    entities.sort();
    entities.dedup();
    entities.retain(|e| sector.claims(e));
    for entity in entities {
        if let Some(hourly) = library.load_factors(entity.as_str())? {
            debug!(entity = %entity, "using hourly load factor profile");
            sector = sector.with_load_factors(entity.clone(), hourly);
        }
    }
    if !sector.load_factors().is_empty() {
        info!(entities = sector.load_factors().len(), "loaded load factor profiles");
    }
    Ok(sector)
}

/// Build the full model from loaded inputs and settings.
pub fn build_model<'a>(
    store: &'a ConfigStore,
    incidence: Incidence,
    settings: &ModelSettings,
) -> RestoreResult<AssembledModel<'a>> {
    let mut time = settings.time_index()?;
    let demand = demand_sector(store, settings, &mut time)?;
    let technology = technology_sector(store, &incidence, settings)?;
    ModelAssembler::new(store, time, incidence)
        .with_configured(demand, technology)
        .assemble()
}
