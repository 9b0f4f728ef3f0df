//! Demand nodes
//!
//! Demand activity is not a decision: every slice of every year is fixed
//! from a profile, and the flow-in balance pulls the matching supply through
//! the network.
//!
//! ```text
//! Flat         a[y,d,h] = actual_demand[y] / 8760
//! Clustered    a[y,d,h] = demand_y[d][h / HL]              (representative days)
//! DailyShape   a[y,d,h] = actual_demand[y] / 365 · Σ_{h' in slice} share[h'] / HL
//! ```

use std::collections::BTreeMap;

use restore_core::{
    Direction, EntityId, RestoreError, RestoreResult, Slice, Year, HOURS_PER_DAY, HOURS_PER_YEAR,
};
use restore_ts::ClusteredDemand;
use tracing::{debug, info};

use super::{declare_sets, Sector};
use crate::library::flow::{flow_in_balance, ShareBound, ShareRule, ShareScope};
use crate::library::{add_share_rules, cost};
use crate::model::{LinExpr, Model, ACTIVITY};

const PREFIXES: &[&str] = &["dem_"];
pub const SET_DEMANDS: &str = "Dems";
pub const ACTUAL_DEMAND: &str = "actual_demand";

const SHAPE_TOLERANCE: f64 = 1e-6;

/// How an entity's annual demand is spread over the slices.
#[derive(Debug, Clone, PartialEq)]
pub enum DemandProfile {
    /// Evenly over all hours.
    Flat,
    /// Corrected representative-day shapes, one per model year.
    Clustered(BTreeMap<Year, ClusteredDemand>),
    /// A 24-value share of daily demand per hour, identical for every day.
    DailyShape(Vec<f64>),
}

impl DemandProfile {
    pub fn kind(&self) -> &'static str {
        match self {
            DemandProfile::Flat => "flat",
            DemandProfile::Clustered(_) => "clustered",
            DemandProfile::DailyShape(_) => "daily_shape",
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct DemandSector {
    profiles: BTreeMap<EntityId, DemandProfile>,
}

impl DemandSector {
    /// All demands flat.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_profile(mut self, entity: impl Into<EntityId>, profile: DemandProfile) -> Self {
        self.profiles.insert(entity.into(), profile);
        self
    }

    /// Configured profile; `None` means flat.
    pub fn profile(&self, entity: &str) -> Option<&DemandProfile> {
        self.profiles.get(entity)
    }

    /// Per-hour demand rate in one slice.
    fn slice_demand(&self, model: &Model, entity: &str, slice: &Slice) -> RestoreResult<f64> {
        let hl = model.time().hour_slice();
        match self.profile(entity) {
            None | Some(DemandProfile::Flat) => {
                Ok(model.store().get_annual(entity, ACTUAL_DEMAND, slice.year)? / HOURS_PER_YEAR)
            }
            Some(DemandProfile::Clustered(shapes)) => {
                let shape = shapes
                    .get(&slice.year)
                    .ok_or_else(|| RestoreError::missing_annual(entity, ACTUAL_DEMAND, slice.year))?;
                shape
                    .demand
                    .get(slice.day)
                    .and_then(|day| day.get(slice.hour / hl))
                    .copied()
                    .ok_or_else(|| {
                        RestoreError::invalid(
                            entity,
                            "demand_profile",
                            format!("clustered shape has no value for {slice}"),
                        )
                    })
            }
            Some(DemandProfile::DailyShape(shares)) => {
                let daily = model.store().get_annual(entity, ACTUAL_DEMAND, slice.year)? / 365.0;
                let share: f64 = shares[slice.hour..slice.hour + hl].iter().sum();
                Ok(daily * share / hl as f64)
            }
        }
    }

    fn validate(&self, model: &Model) -> RestoreResult<()> {
        let time = model.time();
        for (entity, profile) in &self.profiles {
            match profile {
                DemandProfile::Flat => {}
                DemandProfile::Clustered(shapes) => {
                    for (year, shape) in shapes {
                        if shape.slot_hours != time.hour_slice() || shape.demand.len() != time.days().len() {
                            return Err(RestoreError::invalid(
                                entity.as_str(),
                                "demand_profile",
                                format!(
                                    "{year}: {} days of {}h slots, model has {} days of {}h slots",
                                    shape.demand.len(),
                                    shape.slot_hours,
                                    time.days().len(),
                                    time.hour_slice()
                                ),
                            ));
                        }
                    }
                }
                DemandProfile::DailyShape(shares) => {
                    let sum: f64 = shares.iter().sum();
                    if shares.len() != HOURS_PER_DAY
                        || shares.iter().any(|s| *s < 0.0)
                        || (sum - 1.0).abs() > SHAPE_TOLERANCE
                    {
                        return Err(RestoreError::invalid(
                            entity.as_str(),
                            "demand_profile",
                            format!(
                                "daily shape needs 24 non-negative shares summing to 1, got {} summing to {sum}",
                                shares.len()
                            ),
                        ));
                    }
                }
            }
        }
        Ok(())
    }
}

impl Sector for DemandSector {
    fn name(&self) -> &str {
        "demand"
    }

    fn prefixes(&self) -> &[&str] {
        PREFIXES
    }

    fn configure(&self, model: &mut Model) -> RestoreResult<()> {
        self.validate(model)?;
        let sets = declare_sets(self, model, SET_DEMANDS)?;

        let keys = model.entity_slices(&sets.entities);
        model.add_block("dem_flow_in", keys, flow_in_balance)?;
        let share = ShareRule::new(Direction::Input, ShareScope::EntityTotal, ShareBound::Equal);
        add_share_rules(model, "dem", &sets.inputs, &sets.outputs, &[share])?;

        let years: Vec<Year> = model.time().years().to_vec();
        for entity in &sets.entities {
            for &year in &years {
                let slices: Vec<Slice> = model.time().slices_in(year).collect();
                for slice in slices {
                    let value = self.slice_demand(model, entity.as_str(), &slice)?;
                    let var = model.slice_var(ACTIVITY, entity.as_str(), &slice)?;
                    model.fix(var, value)?;
                }
            }
            let kind = self.profile(entity.as_str()).map_or("flat", DemandProfile::kind);
            debug!(entity = %entity, profile = kind, "fixed demand");
        }
        info!(entities = sets.entities.len(), "configured demand sector");
        Ok(())
    }

    fn cost(&self, model: &Model) -> RestoreResult<LinExpr> {
        match model.set(SET_DEMANDS) {
            Some(dems) => cost::cost_variable_om(model, dems, model.time().years()),
            None => Ok(LinExpr::new()),
        }
    }
}
