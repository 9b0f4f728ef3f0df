//! Model assembly: sets, variables, global balance, sectors, objective
//!
//! ```text
//! ConfigStore ─┐
//! TimeIndex  ──┼──▶ ModelAssembler ──▶ sets ──▶ variables ──▶ c_io_balance
//! Incidence  ──┘          │
//!                         ├──▶ sector.configure()   (registration order)
//!                         └──▶ Σ sector.cost()      ──▶ AssembledModel
//! ```
//!
//! The global balance is the only constraint owned by the assembler:
//!
//! ```text
//! Σ_{(f,e) ∈ FoE} flow_out[f,e,s] == Σ_{(f,e) ∈ FiE} flow_in[f,e,s]    ∀ f, s
//! ```

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use restore_core::{
    ConfigStore, Direction, EntityId, FlowId, Incidence, RestoreResult, Slice, TimeIndex,
};
use serde::Serialize;
use tracing::{info, warn};

use crate::library::init::ENABLE_CAPACITY;
use crate::model::{
    Constraint, LinExpr, Model, Outcome, Resolution, ACTIVITY, CAPACITY_NEW, CAPACITY_RETIRED,
    CAPACITY_TOTAL, SET_CAPACITY, SET_ENTITIES,
};
use crate::sector::{DemandSector, Sector, StorageSector, TechnologySector, TradeSector};

pub const BALANCE_BLOCK: &str = "c_io_balance";

/// Wires the shared model and runs every registered sector.
pub struct ModelAssembler<'a> {
    store: &'a ConfigStore,
    time: TimeIndex,
    incidence: Incidence,
    sectors: Vec<Box<dyn Sector>>,
}

impl<'a> ModelAssembler<'a> {
    pub fn new(store: &'a ConfigStore, time: TimeIndex, incidence: Incidence) -> Self {
        Self {
            store,
            time,
            incidence,
            sectors: Vec::new(),
        }
    }

    /// Register a sector. Sectors run in registration order.
    pub fn with_sector(mut self, sector: Box<dyn Sector>) -> Self {
        self.sectors.push(sector);
        self
    }

    /// Technology, storage and trade, plus flat demand.
    pub fn with_default_sectors(self) -> Self {
        self.with_demand(DemandSector::new())
    }

    /// Default sectors with a specific demand configuration.
    pub fn with_demand(self, demand: DemandSector) -> Self {
        self.with_configured(demand, TechnologySector::new())
    }

    /// Default sectors with specific demand and technology configurations.
    pub fn with_configured(self, demand: DemandSector, technology: TechnologySector) -> Self {
        self.with_sector(Box::new(demand))
            .with_sector(Box::new(technology))
            .with_sector(Box::new(StorageSector::new()))
            .with_sector(Box::new(TradeSector::new()))
    }

    pub fn sectors(&self) -> impl Iterator<Item = &str> {
        self.sectors.iter().map(|s| s.name())
    }

    pub fn assemble(self) -> RestoreResult<AssembledModel<'a>> {
        let ModelAssembler {
            store,
            time,
            incidence,
            sectors,
        } = self;
        let mut model = Model::new(store, time, incidence);

        declare_sets(&mut model)?;
        declare_variables(&mut model)?;
        add_global_balance(&mut model)?;
        warn_unclaimed(&model, &sectors);

        let mut objective = LinExpr::new();
        let mut sector_costs = BTreeMap::new();
        for sector in &sectors {
            sector.configure(&mut model)?;
            let cost = sector.cost(&model)?;
            objective += cost.clone();
            sector_costs.insert(sector.name().to_string(), cost);
        }

        let assembled = AssembledModel {
            model,
            objective,
            sector_costs,
        };
        let summary = assembled.summary();
        info!(
            variables = summary.variables,
            fixed = summary.fixed_variables,
            constraints = summary.constraints,
            blocks = summary.blocks.len(),
            "assembled model"
        );
        Ok(assembled)
    }
}

/// `Ents` = every configured or connected entity, `Caps` = the subset with
/// `enable_capacity`. Store columns named after a flow carry flow-level
/// parameters and are not entities.
fn declare_sets(model: &mut Model) -> RestoreResult<()> {
    let flows = model.incidence().flows();
    let mut entities: BTreeSet<EntityId> = model
        .store()
        .entities()
        .filter(|e| !flows.contains(e.as_str()))
        .cloned()
        .collect();
    entities.extend(model.incidence().entities());
    let caps = model.store().build_cnf_set(&entities, ENABLE_CAPACITY);
    model.add_set(SET_ENTITIES, entities)?;
    model.add_set(SET_CAPACITY, caps)?;
    let fie = model.incidence().fie().clone();
    let foe = model.incidence().foe().clone();
    model.add_pair_set("FiE", fie)?;
    model.add_pair_set("FoE", foe)?;
    Ok(())
}

fn declare_variables(model: &mut Model) -> RestoreResult<()> {
    let ents = model.set(SET_ENTITIES).cloned().unwrap_or_default();
    let caps = model.set(SET_CAPACITY).cloned().unwrap_or_default();
    model.add_family(ACTIVITY, Resolution::Slice, &ents)?;
    model.add_family(CAPACITY_TOTAL, Resolution::Year, &caps)?;
    model.add_family(CAPACITY_NEW, Resolution::Year, &caps)?;
    model.add_family(CAPACITY_RETIRED, Resolution::Year, &caps)?;
    model.add_flow_families()
}

/// Per flow and slice, production equals consumption.
pub fn flow_balance(model: &Model, key: &(FlowId, Slice)) -> RestoreResult<Outcome> {
    let (flow, slice) = key;
    let side = |direction: Direction| -> RestoreResult<LinExpr> {
        model
            .incidence()
            .entities_of(flow.as_str(), direction)
            .iter()
            .map(|e| match direction {
                Direction::Input => model.flow_in(flow.as_str(), e.as_str(), slice),
                Direction::Output => model.flow_out(flow.as_str(), e.as_str(), slice),
            })
            .map(|v| v.map(LinExpr::from))
            .sum()
    };
    Ok(Constraint::eq(side(Direction::Output)?, side(Direction::Input)?).into())
}

fn add_global_balance(model: &mut Model) -> RestoreResult<()> {
    let keys: Vec<(FlowId, Slice)> = model
        .incidence()
        .flows()
        .into_iter()
        .flat_map(|f| model.time().slices().map(move |s| (f.clone(), s)))
        .collect();
    model.add_block(BALANCE_BLOCK, keys, flow_balance)?;
    Ok(())
}

fn warn_unclaimed(model: &Model, sectors: &[Box<dyn Sector>]) {
    let Some(ents) = model.set(SET_ENTITIES) else {
        return;
    };
    for entity in ents {
        if !sectors.iter().any(|s| s.claims(entity)) {
            warn!(entity = %entity, "entity is not claimed by any sector; its activity is unconstrained");
        }
    }
}

/// A fully built model ready for a solver.
#[derive(Debug)]
pub struct AssembledModel<'a> {
    pub model: Model<'a>,
    pub objective: LinExpr,
    /// Objective contribution per sector name.
    pub sector_costs: BTreeMap<String, LinExpr>,
}

impl AssembledModel<'_> {
    pub fn summary(&self) -> ModelSummary {
        let model = &self.model;
        ModelSummary {
            years: model.time().years().len(),
            days: model.time().days().len(),
            hours: model.time().hours().len(),
            sets: model.sets().map(|(k, v)| (k.to_string(), v)).collect(),
            pair_sets: model.pair_sets().map(|(k, v)| (k.to_string(), v)).collect(),
            variables: model.vars().len(),
            fixed_variables: model.vars().fixed_count(),
            constraints: model.constraint_count(),
            blocks: model
                .blocks()
                .iter()
                .map(|b| BlockSummary {
                    name: b.name.clone(),
                    constraints: b.len(),
                    skipped: b.skipped,
                })
                .collect(),
            objective_terms: self.objective.len(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct BlockSummary {
    pub name: String,
    pub constraints: usize,
    pub skipped: usize,
}

/// Set sizes and counts for reporting.
#[derive(Debug, Clone, Serialize)]
pub struct ModelSummary {
    pub years: usize,
    pub days: usize,
    pub hours: usize,
    pub sets: BTreeMap<String, usize>,
    pub pair_sets: BTreeMap<String, usize>,
    pub variables: usize,
    pub fixed_variables: usize,
    pub constraints: usize,
    pub blocks: Vec<BlockSummary>,
    pub objective_terms: usize,
}

impl fmt::Display for ModelSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "time: {} years × {} days × {} slices",
            self.years, self.days, self.hours
        )?;
        writeln!(f, "sets:")?;
        for (name, size) in self.sets.iter().chain(&self.pair_sets) {
            writeln!(f, "  {name:<16} {size:>8}")?;
        }
        writeln!(
            f,
            "variables: {} ({} fixed), constraints: {}, objective terms: {}",
            self.variables, self.fixed_variables, self.constraints, self.objective_terms
        )?;
        writeln!(f, "blocks:")?;
        for block in &self.blocks {
            writeln!(
                f,
                "  {:<32} {:>8} constraints {:>8} skipped",
                block.name, block.constraints, block.skipped
            )?;
        }
        Ok(())
    }
}
