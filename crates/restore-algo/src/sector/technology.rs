//! Conversion and extraction technologies
//!
//! Besides the generic rule set, technologies carry two system-level capacity
//! requirements per output flow and optimised year:
//!
//! ```text
//! peak   Σ_e ctot[e]·η_out(e,f)·peak_ratio(e)        >= (1 + margin_f)·peak_capacity_demand_f
//! base   Σ_e ctot[e]·η_out(e,f)·lf_min(e) − imports   <= base_capacity_demand_f
//! ```
//!
//! `e` ranges over capacity-enabled technologies producing `f`, `imports`
//! over capacity-enabled trade links producing `f`. Flow-level parameters are
//! stored under the flow id. Each block skips flows without its parameter.

use std::collections::BTreeSet;

use restore_core::{Direction, EntityId, FlowId, RestoreError, RestoreResult, Year, HOURS_PER_DAY};
use tracing::{info, warn};

use super::{declare_sets, Sector, SectorSets, TradeSector};
use crate::library::activity::{LoadFactorProfiles, LF_MIN, LF_PROFILE};
use crate::library::flow::efficiency;
use crate::library::{self, cost, init, ShareRule};
use crate::model::{Constraint, LinExpr, Model, Outcome};

const PREFIXES: &[&str] = &["conv_", "ext_"];
pub const SET_TECHNOLOGIES: &str = "Techs";
pub const PEAK_MARGIN: &str = "peak_capacity_margin";
pub const PEAK_DEMAND: &str = "peak_capacity_demand";
pub const PEAK_RATIO: &str = "peak_ratio";
pub const BASE_DEMAND: &str = "base_capacity_demand";

/// Every generic rule: flow balance, all twelve shares, capacity lifecycle,
/// activity bounds and the combined cost, plus peak and base capacity.
#[derive(Debug, Clone, Default)]
pub struct TechnologySector {
    lf_profiles: LoadFactorProfiles,
}

impl TechnologySector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hour-of-day maximum load factors for one entity, replacing its
    /// `lf_max` in the hourly bound.
    pub fn with_load_factors(mut self, entity: impl Into<EntityId>, hourly: Vec<f64>) -> Self {
        self.lf_profiles.insert(entity.into(), hourly);
        self
    }

    pub fn load_factors(&self) -> &LoadFactorProfiles {
        &self.lf_profiles
    }

    fn validate(&self) -> RestoreResult<()> {
        for (entity, hourly) in &self.lf_profiles {
            if hourly.len() != HOURS_PER_DAY || hourly.iter().any(|v| !(0.0..=1.0).contains(v)) {
                return Err(RestoreError::invalid(
                    entity.as_str(),
                    LF_PROFILE,
                    format!("expected 24 load factors in [0, 1], got {}", hourly.len()),
                ));
            }
        }
        Ok(())
    }
}

impl Sector for TechnologySector {
    fn name(&self) -> &str {
        "technology"
    }

    fn prefixes(&self) -> &[&str] {
        PREFIXES
    }

    fn configure(&self, model: &mut Model) -> RestoreResult<()> {
        self.validate()?;
        let sets = declare_sets(self, model, SET_TECHNOLOGIES)?;
        configure_generic(model, "tech", &sets, &self.lf_profiles)?;

        let flows: BTreeSet<FlowId> = sets.outputs.iter().map(|(f, _)| f.clone()).collect();
        let keys = model.flow_optimised_years(&flows);
        model.add_block("tech_cap_peak", keys.clone(), cap_peak)?;
        model.add_block("tech_cap_base", keys, cap_base)?;
        info!(
            entities = sets.entities.len(),
            inputs = sets.inputs.len(),
            outputs = sets.outputs.len(),
            profiles = self.lf_profiles.len(),
            "configured technology sector"
        );
        Ok(())
    }

    fn cost(&self, model: &Model) -> RestoreResult<LinExpr> {
        match model.set(SET_TECHNOLOGIES) {
            Some(techs) => cost::cost_combined(model, techs, model.time().years()),
            None => Ok(LinExpr::new()),
        }
    }
}

/// Capacity-enabled producers of `flow`, technologies and trade links apart.
fn producers<'m>(model: &'m Model, flow: &str) -> (Vec<&'m str>, Vec<&'m str>) {
    let techs = model.set(SET_TECHNOLOGIES);
    let trade = TradeSector::new();
    let mut own = Vec::new();
    let mut imports = Vec::new();
    for e in model.incidence().producers_of(flow) {
        if !model.has_capacity(e.as_str()) {
            continue;
        }
        if techs.is_some_and(|t| t.contains(e)) {
            own.push(e.as_str());
        } else if trade.claims(e) {
            imports.push(e.as_str());
        }
    }
    (own, imports)
}

/// Firm capacity covers peak demand plus a margin. Imports do not count.
pub fn cap_peak(model: &Model, key: &(FlowId, Year)) -> RestoreResult<Outcome> {
    let (flow, year) = (key.0.as_str(), key.1);
    let Some(margin) = model.store().get_const(flow, PEAK_MARGIN) else {
        return Ok(Outcome::Skip);
    };
    let peak = model.store().get_annual(flow, PEAK_DEMAND, year)?;
    let (techs, _) = producers(model, flow);
    let mut firm = LinExpr::new();
    for e in techs {
        let eta = efficiency(model, Direction::Output, e, flow, year)?;
        let ratio = model.store().get_required(e, PEAK_RATIO, year)?;
        firm.add_term(model.capacity_total(e, year)?, eta * ratio);
    }
    Ok(Constraint::ge(firm, (1.0 + margin) * peak).into())
}

/// Must-run output, net of import capacity, stays below base demand.
pub fn cap_base(model: &Model, key: &(FlowId, Year)) -> RestoreResult<Outcome> {
    let (flow, year) = (key.0.as_str(), key.1);
    let Some(base) = model.store().get(flow, BASE_DEMAND, year) else {
        return Ok(Outcome::Skip);
    };
    let (techs, imports) = producers(model, flow);
    let mut must_run = LinExpr::new();
    let mut terms = 0;
    for e in techs {
        let Some(lf) = model.store().get(e, LF_MIN, year) else {
            continue;
        };
        let eta = efficiency(model, Direction::Output, e, flow, year)?;
        must_run.add_term(model.capacity_total(e, year)?, eta * lf);
        terms += 1;
    }
    if terms == 0 {
        warn!(flow, year, "base capacity requirement skipped: no producer has lf_min");
        return Ok(Outcome::Skip);
    }
    for e in imports {
        let eta = efficiency(model, Direction::Output, e, flow, year)?;
        must_run.add_term(model.capacity_total(e, year)?, -eta);
    }
    Ok(Constraint::le(must_run, base).into())
}

/// The full generic constraint set under `{label}_*` block names.
pub(crate) fn configure_generic(
    model: &mut Model,
    label: &str,
    sets: &SectorSets,
    profiles: &LoadFactorProfiles,
) -> RestoreResult<()> {
    library::add_flow_balance(model, label, &sets.entities)?;
    library::add_share_rules(model, label, &sets.inputs, &sets.outputs, &ShareRule::all())?;
    library::add_capacity_rules(model, label, &sets.entities)?;
    library::add_activity_rules(model, label, &sets.entities, profiles)?;
    init::init_activity(model, &sets.entities)?;
    init::init_capacity(model, &sets.entities)?;
    Ok(())
}
