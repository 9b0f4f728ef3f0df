//! # Symbolic Model
//!
//! The model is a plain symbol table: variables with bounds, named entity
//! sets, named `(flow, entity)` subsets and named constraint blocks. Nothing
//! here knows about a particular solver.
//!
//! ## Variable families
//!
//! ```text
//! family              index                 declared for
//! ─────────────────── ───────────────────── ─────────────────────
//! activity            (e, y, d, h)          Ents
//! capacity_total      (e, y)                Caps
//! capacity_new        (e, y)                Caps
//! capacity_retired    (e, y)                Caps
//! flow_in             (f, e, y, d, h)       FiE
//! flow_out            (f, e, y, d, h)       FoE
//! <sector families>   (e, y, d, h)          sector subset
//! ```
//!
//! Variables of one family are stored densely per key, addressed by
//! [`TimeIndex::slice_position`] or [`TimeIndex::year_position`].
//!
//! ## Blocks
//!
//! Every constraint belongs to a named block, e.g. `cap_transfer` or
//! `tech_flow_in`. Block names are unique across the whole model, so two
//! sectors can never register the same constraint.

pub mod expr;
pub mod vars;

use std::collections::{BTreeMap, BTreeSet, HashMap};

use restore_core::{
    ConfigStore, EntityId, FlowEntity, FlowId, Incidence, RestoreError, RestoreResult, Slice,
    TimeIndex, Year,
};
use tracing::debug;

pub use expr::{Constraint, LinExpr, Outcome, Sense};
pub use vars::{VarId, VarInfo, VariableRegistry};

pub const ACTIVITY: &str = "activity";
pub const CAPACITY_TOTAL: &str = "capacity_total";
pub const CAPACITY_NEW: &str = "capacity_new";
pub const CAPACITY_RETIRED: &str = "capacity_retired";
pub const FLOW_IN: &str = "flow_in";
pub const FLOW_OUT: &str = "flow_out";

/// Entity set names declared by the assembler.
pub const SET_ENTITIES: &str = "Ents";
pub const SET_CAPACITY: &str = "Caps";

/// How a family is indexed in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// One variable per (year, day, hour).
    Slice,
    /// One variable per year.
    Year,
}

/// Per-entity dense variable vectors.
#[derive(Debug, Clone)]
struct EntityFamily {
    resolution: Resolution,
    vars: HashMap<EntityId, Vec<VarId>>,
}

/// Per-(flow, entity) slice variables.
#[derive(Debug, Clone, Default)]
struct FlowFamily {
    vars: HashMap<FlowId, HashMap<EntityId, Vec<VarId>>>,
}

impl FlowFamily {
    fn get(&self, flow: &str, entity: &str) -> Option<&Vec<VarId>> {
        self.vars.get(flow)?.get(entity)
    }
}

/// Constraints generated by one rule over one key set.
#[derive(Debug, Clone)]
pub struct ConstraintBlock {
    pub name: String,
    pub constraints: Vec<Constraint>,
    /// Keys for which the rule returned [`Outcome::Skip`].
    pub skipped: usize,
}

impl ConstraintBlock {
    pub fn len(&self) -> usize {
        self.constraints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.constraints.is_empty()
    }
}

/// Renders a block key into the `[...]` part of a constraint name.
pub trait IndexLabel {
    fn label(&self) -> String;
}

impl IndexLabel for EntityId {
    fn label(&self) -> String {
        self.to_string()
    }
}

impl IndexLabel for (EntityId, Year) {
    fn label(&self) -> String {
        format!("{},{}", self.0, self.1)
    }
}

impl IndexLabel for (EntityId, Slice) {
    fn label(&self) -> String {
        format!("{},{}", self.0, self.1)
    }
}

impl IndexLabel for (FlowId, Year) {
    fn label(&self) -> String {
        format!("{},{}", self.0, self.1)
    }
}

impl IndexLabel for (FlowId, Slice) {
    fn label(&self) -> String {
        format!("{},{}", self.0, self.1)
    }
}

impl IndexLabel for (FlowId, EntityId, Year) {
    fn label(&self) -> String {
        format!("{},{},{}", self.0, self.1, self.2)
    }
}

impl IndexLabel for (FlowId, EntityId, Slice) {
    fn label(&self) -> String {
        format!("{},{},{}", self.0, self.1, self.2)
    }
}

/// The shared model every sector writes into.
#[derive(Debug)]
pub struct Model<'a> {
    store: &'a ConfigStore,
    time: TimeIndex,
    incidence: Incidence,
    vars: VariableRegistry,
    sets: BTreeMap<String, BTreeSet<EntityId>>,
    pair_sets: BTreeMap<String, BTreeSet<FlowEntity>>,
    families: BTreeMap<String, EntityFamily>,
    flow_in: FlowFamily,
    flow_out: FlowFamily,
    blocks: Vec<ConstraintBlock>,
}

impl<'a> Model<'a> {
    pub fn new(store: &'a ConfigStore, time: TimeIndex, incidence: Incidence) -> Self {
        Self {
            store,
            time,
            incidence,
            vars: VariableRegistry::new(),
            sets: BTreeMap::new(),
            pair_sets: BTreeMap::new(),
            families: BTreeMap::new(),
            flow_in: FlowFamily::default(),
            flow_out: FlowFamily::default(),
            blocks: Vec::new(),
        }
    }

    pub fn store(&self) -> &'a ConfigStore {
        self.store
    }

    pub fn time(&self) -> &TimeIndex {
        &self.time
    }

    pub fn incidence(&self) -> &Incidence {
        &self.incidence
    }

    pub fn vars(&self) -> &VariableRegistry {
        &self.vars
    }

    pub fn fix(&mut self, var: VarId, value: f64) -> RestoreResult<()> {
        self.vars.fix(var, value)
    }

    // ------------------------------------------------------------------
    // Sets
    // ------------------------------------------------------------------

    pub fn add_set(&mut self, name: &str, entities: BTreeSet<EntityId>) -> RestoreResult<()> {
        if self.sets.contains_key(name) {
            return Err(duplicate("set", name));
        }
        debug!(set = name, size = entities.len(), "declared entity set");
        self.sets.insert(name.to_string(), entities);
        Ok(())
    }

    pub fn set(&self, name: &str) -> Option<&BTreeSet<EntityId>> {
        self.sets.get(name)
    }

    pub fn add_pair_set(&mut self, name: &str, pairs: BTreeSet<FlowEntity>) -> RestoreResult<()> {
        if self.pair_sets.contains_key(name) {
            return Err(duplicate("pair set", name));
        }
        debug!(set = name, size = pairs.len(), "declared flow-entity set");
        self.pair_sets.insert(name.to_string(), pairs);
        Ok(())
    }

    pub fn pair_set(&self, name: &str) -> Option<&BTreeSet<FlowEntity>> {
        self.pair_sets.get(name)
    }

    pub fn sets(&self) -> impl Iterator<Item = (&str, usize)> {
        self.sets.iter().map(|(k, v)| (k.as_str(), v.len()))
    }

    pub fn pair_sets(&self) -> impl Iterator<Item = (&str, usize)> {
        self.pair_sets.iter().map(|(k, v)| (k.as_str(), v.len()))
    }

    /// Capacity-enabled entity (member of `Caps`).
    pub fn has_capacity(&self, entity: &str) -> bool {
        self.sets
            .get(SET_CAPACITY)
            .is_some_and(|caps| caps.contains(entity))
    }

    // ------------------------------------------------------------------
    // Variables
    // ------------------------------------------------------------------

    /// Declare a non-negative family over `entities`.
    pub fn add_family<'e, I>(&mut self, name: &str, resolution: Resolution, entities: I) -> RestoreResult<()>
    where
        I: IntoIterator<Item = &'e EntityId>,
    {
        if self.families.contains_key(name) {
            return Err(duplicate("variable family", name));
        }
        let mut family = EntityFamily {
            resolution,
            vars: HashMap::new(),
        };
        for entity in entities {
            let ids = match resolution {
                Resolution::Slice => self
                    .time
                    .slices()
                    .map(|s| self.vars.add_nonneg(format!("{name}[{entity},{s}]")))
                    .collect(),
                Resolution::Year => self
                    .time
                    .years()
                    .iter()
                    .map(|y| self.vars.add_nonneg(format!("{name}[{entity},{y}]")))
                    .collect(),
            };
            family.vars.insert(entity.clone(), ids);
        }
        debug!(family = name, entities = family.vars.len(), "declared variable family");
        self.families.insert(name.to_string(), family);
        Ok(())
    }

    /// Declare `flow_in` over FiE and `flow_out` over FoE.
    pub fn add_flow_families(&mut self) -> RestoreResult<()> {
        if !self.flow_in.vars.is_empty() || !self.flow_out.vars.is_empty() {
            return Err(duplicate("variable family", FLOW_IN));
        }
        let slices: Vec<Slice> = self.time.slices().collect();
        for (name, pairs) in [(FLOW_IN, self.incidence.fie().clone()), (FLOW_OUT, self.incidence.foe().clone())] {
            let mut family = FlowFamily::default();
            for (f, e) in &pairs {
                let ids = slices
                    .iter()
                    .map(|s| self.vars.add_nonneg(format!("{name}[{f},{e},{s}]")))
                    .collect();
                family.vars.entry(f.clone()).or_default().insert(e.clone(), ids);
            }
            if name == FLOW_IN {
                self.flow_in = family;
            } else {
                self.flow_out = family;
            }
        }
        Ok(())
    }

    pub fn has_family(&self, name: &str) -> bool {
        self.families.contains_key(name)
    }

    /// Whether `entity` has variables in `family`.
    pub fn in_family(&self, family: &str, entity: &str) -> bool {
        self.families
            .get(family)
            .is_some_and(|f| f.vars.contains_key(entity))
    }

    pub fn slice_var(&self, family: &str, entity: &str, slice: &Slice) -> RestoreResult<VarId> {
        self.families
            .get(family)
            .filter(|f| f.resolution == Resolution::Slice)
            .and_then(|f| f.vars.get(entity))
            .zip(self.time.slice_position(slice))
            .and_then(|(ids, pos)| ids.get(pos).copied())
            .ok_or_else(|| no_variable(family, entity, slice))
    }

    pub fn year_var(&self, family: &str, entity: &str, year: Year) -> RestoreResult<VarId> {
        self.families
            .get(family)
            .filter(|f| f.resolution == Resolution::Year)
            .and_then(|f| f.vars.get(entity))
            .zip(self.time.year_position(year))
            .and_then(|(ids, pos)| ids.get(pos).copied())
            .ok_or_else(|| no_variable(family, entity, year))
    }

    pub fn activity(&self, entity: &str, slice: &Slice) -> RestoreResult<VarId> {
        self.slice_var(ACTIVITY, entity, slice)
    }

    pub fn capacity_total(&self, entity: &str, year: Year) -> RestoreResult<VarId> {
        self.year_var(CAPACITY_TOTAL, entity, year)
    }

    pub fn capacity_new(&self, entity: &str, year: Year) -> RestoreResult<VarId> {
        self.year_var(CAPACITY_NEW, entity, year)
    }

    pub fn capacity_retired(&self, entity: &str, year: Year) -> RestoreResult<VarId> {
        self.year_var(CAPACITY_RETIRED, entity, year)
    }

    pub fn flow_in(&self, flow: &str, entity: &str, slice: &Slice) -> RestoreResult<VarId> {
        flow_var(&self.flow_in, &self.time, FLOW_IN, flow, entity, slice)
    }

    pub fn flow_out(&self, flow: &str, entity: &str, slice: &Slice) -> RestoreResult<VarId> {
        flow_var(&self.flow_out, &self.time, FLOW_OUT, flow, entity, slice)
    }

    // ------------------------------------------------------------------
    // Constraints
    // ------------------------------------------------------------------

    /// Evaluate `rule` for every key and register the resulting block.
    ///
    /// Constraints are named `{block}[{key}]` and kept in key order. The
    /// first rule error aborts the whole block.
    pub fn add_block<K, F>(&mut self, name: &str, keys: Vec<K>, rule: F) -> RestoreResult<usize>
    where
        K: IndexLabel + Send + Sync,
        F: Fn(&Model<'a>, &K) -> RestoreResult<Outcome> + Send + Sync,
    {
        if self.block(name).is_some() {
            return Err(duplicate("constraint block", name));
        }
        let outcomes = self.evaluate(&keys, &rule)?;

        let mut block = ConstraintBlock {
            name: name.to_string(),
            constraints: Vec::new(),
            skipped: 0,
        };
        for (key, outcome) in keys.iter().zip(outcomes) {
            match outcome {
                Outcome::Constrain(c) => block
                    .constraints
                    .push(c.named(format!("{name}[{}]", key.label()))),
                Outcome::Skip => block.skipped += 1,
            }
        }
        let added = block.constraints.len();
        debug!(block = name, added, skipped = block.skipped, "constraint block");
        self.blocks.push(block);
        Ok(added)
    }

    #[cfg(feature = "parallel")]
    fn evaluate<K, F>(&self, keys: &[K], rule: &F) -> RestoreResult<Vec<Outcome>>
    where
        K: Send + Sync,
        F: Fn(&Model<'a>, &K) -> RestoreResult<Outcome> + Send + Sync,
    {
        use rayon::prelude::*;
        keys.par_iter().map(|k| rule(self, k)).collect()
    }

    #[cfg(not(feature = "parallel"))]
    fn evaluate<K, F>(&self, keys: &[K], rule: &F) -> RestoreResult<Vec<Outcome>>
    where
        F: Fn(&Model<'a>, &K) -> RestoreResult<Outcome>,
    {
        keys.iter().map(|k| rule(self, k)).collect()
    }

    pub fn blocks(&self) -> &[ConstraintBlock] {
        &self.blocks
    }

    pub fn block(&self, name: &str) -> Option<&ConstraintBlock> {
        self.blocks.iter().find(|b| b.name == name)
    }

    pub fn constraints(&self) -> impl Iterator<Item = &Constraint> {
        self.blocks.iter().flat_map(|b| b.constraints.iter())
    }

    pub fn constraint_count(&self) -> usize {
        self.blocks.iter().map(ConstraintBlock::len).sum()
    }

    /// Cartesian `entities × slices` keys, in (entity, year, day, hour) order.
    pub fn entity_slices<'e, I>(&self, entities: I) -> Vec<(EntityId, Slice)>
    where
        I: IntoIterator<Item = &'e EntityId>,
    {
        entities
            .into_iter()
            .flat_map(|e| self.time.slices().map(move |s| (e.clone(), s)))
            .collect()
    }

    /// Like [`entity_slices`](Self::entity_slices) but without the first
    /// model year, whose activity is pinned to historical actuals.
    pub fn entity_optimised_slices<'e, I>(&self, entities: I) -> Vec<(EntityId, Slice)>
    where
        I: IntoIterator<Item = &'e EntityId>,
    {
        let y0 = self.time.first_year();
        entities
            .into_iter()
            .flat_map(|e| {
                self.time
                    .slices()
                    .filter(move |s| s.year > y0)
                    .map(move |s| (e.clone(), s))
            })
            .collect()
    }

    /// Cartesian `entities × years` keys.
    pub fn entity_years<'e, I>(&self, entities: I) -> Vec<(EntityId, Year)>
    where
        I: IntoIterator<Item = &'e EntityId>,
    {
        entities
            .into_iter()
            .flat_map(|e| self.time.years().iter().map(move |&y| (e.clone(), y)))
            .collect()
    }

    /// Cartesian `flows × optimised years` keys.
    pub fn flow_optimised_years<'f, I>(&self, flows: I) -> Vec<(FlowId, Year)>
    where
        I: IntoIterator<Item = &'f FlowId>,
    {
        flows
            .into_iter()
            .flat_map(|f| self.time.optimised_years().iter().map(move |&y| (f.clone(), y)))
            .collect()
    }

    /// `pairs × slices` keys.
    pub fn pair_slices<'p, I>(&self, pairs: I) -> Vec<(FlowId, EntityId, Slice)>
    where
        I: IntoIterator<Item = &'p FlowEntity>,
    {
        pairs
            .into_iter()
            .flat_map(|(f, e)| self.time.slices().map(move |s| (f.clone(), e.clone(), s)))
            .collect()
    }
}

fn flow_var(
    family: &FlowFamily,
    time: &TimeIndex,
    name: &str,
    flow: &str,
    entity: &str,
    slice: &Slice,
) -> RestoreResult<VarId> {
    family
        .get(flow, entity)
        .zip(time.slice_position(slice))
        .and_then(|(ids, pos)| ids.get(pos).copied())
        .ok_or_else(|| no_variable(name, &format!("{flow},{entity}"), slice))
}

fn duplicate(kind: &str, name: &str) -> RestoreError {
    RestoreError::invalid("model", name, format!("{kind} '{name}' is already declared"))
}

fn no_variable(family: &str, key: &str, at: impl std::fmt::Display) -> RestoreError {
    RestoreError::Other(format!("no {family} variable for {key} at {at}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use restore_core::IncidenceBuilder;

    fn tiny() -> (ConfigStore, TimeIndex, Incidence) {
        let incidence = IncidenceBuilder::new()
            .produces("elec", "conv_pv")
            .consumes("elec", "dem_elec")
            .build();
        let time = TimeIndex::new(2020, 2021, 2, 12).unwrap();
        (ConfigStore::new(), time, incidence)
    }

    #[test]
    fn test_dense_slice_lookup() {
        let (store, time, incidence) = tiny();
        let mut model = Model::new(&store, time, incidence);
        let ents: BTreeSet<EntityId> = model.incidence().entities();
        model.add_family(ACTIVITY, Resolution::Slice, &ents).unwrap();
        model.add_flow_families().unwrap();

        // activity: 2 entities × 8 slices, flows: 2 pairs × 8 slices
        assert_eq!(model.vars().len(), 16 + 16);
        let a = model.activity("conv_pv", &Slice::new(2021, 1, 12)).unwrap();
        assert_eq!(model.vars().name(a), "activity[conv_pv,2021/d1/h12]");
        assert!(model.activity("conv_pv", &Slice::new(2022, 0, 0)).is_err());
        assert!(model.flow_out("elec", "conv_pv", &Slice::new(2020, 0, 0)).is_ok());
        assert!(model.flow_in("elec", "conv_pv", &Slice::new(2020, 0, 0)).is_err());
    }

    #[test]
    fn test_duplicate_block_name_rejected() {
        let (store, time, incidence) = tiny();
        let mut model = Model::new(&store, time, incidence);
        let ents: BTreeSet<EntityId> = model.incidence().entities();
        model.add_family(ACTIVITY, Resolution::Slice, &ents).unwrap();

        let keys = model.entity_slices(&ents);
        let rule = |m: &Model, k: &(EntityId, Slice)| -> RestoreResult<Outcome> {
            Ok(Constraint::le(m.activity(&k.0, &k.1)?, 1.0).into())
        };
        assert_eq!(model.add_block("act_cap", keys.clone(), rule).unwrap(), 16);
        let err = model.add_block("act_cap", keys, rule).unwrap_err();
        assert!(err.is_configuration_error());
        assert_eq!(model.blocks().len(), 1);
    }

    #[test]
    fn test_skip_counted_not_stored() {
        let (store, time, incidence) = tiny();
        let mut model = Model::new(&store, time, incidence);
        let ents: BTreeSet<EntityId> = model.incidence().entities();
        let keys = model.entity_years(&ents);
        model
            .add_block("nothing", keys, |_, _| Ok(Outcome::Skip))
            .unwrap();
        let block = model.block("nothing").unwrap();
        assert!(block.is_empty());
        assert_eq!(block.skipped, 4);
    }

    #[test]
    fn test_duplicate_set_rejected() {
        let (store, time, incidence) = tiny();
        let mut model = Model::new(&store, time, incidence);
        model.add_set("Techs", BTreeSet::new()).unwrap();
        assert!(model.add_set("Techs", BTreeSet::new()).is_err());
    }
}
