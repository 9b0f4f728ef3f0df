//! Sparse flow × entity incidence
//!
//! Two relations connect flows and entities:
//!
//! ```text
//!            FiE                  FoE
//!   flow ──────────▶ entity ──────────▶ flow
//!  (natgas)         (conv_chp)        (elec, heat)
//! ```
//!
//! Both are stored as explicit pair sets rather than a dense matrix, since
//! almost every (flow, entity) combination is absent. `FxE` is their union.
//! Per-flow and per-entity indexes are built once so the constraint library
//! can sum over "all inputs of e" or "all producers into f" in O(degree).

use std::collections::{BTreeMap, BTreeSet};

use crate::ids::{EntityId, FlowId};

/// A (flow, entity) pair.
pub type FlowEntity = (FlowId, EntityId);

/// Direction of a connection relative to the entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Flow into entity (FiE).
    Input,
    /// Flow out of entity (FoE).
    Output,
}

/// Collects membership lists and builds an [`Incidence`].
#[derive(Debug, Clone, Default)]
pub struct IncidenceBuilder {
    fie: BTreeSet<FlowEntity>,
    foe: BTreeSet<FlowEntity>,
}

impl IncidenceBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// `entity` draws from `flow`.
    pub fn consumes(mut self, flow: impl Into<FlowId>, entity: impl Into<EntityId>) -> Self {
        self.fie.insert((flow.into(), entity.into()));
        self
    }

    /// `entity` produces into `flow`.
    pub fn produces(mut self, flow: impl Into<FlowId>, entity: impl Into<EntityId>) -> Self {
        self.foe.insert((flow.into(), entity.into()));
        self
    }

    pub fn connect(&mut self, direction: Direction, flow: FlowId, entity: EntityId) {
        match direction {
            Direction::Input => self.fie.insert((flow, entity)),
            Direction::Output => self.foe.insert((flow, entity)),
        };
    }

    /// Add a whole membership map `flow -> entities`. Flows with no members
    /// contribute nothing.
    pub fn with_membership<I, E>(mut self, direction: Direction, membership: I) -> Self
    where
        I: IntoIterator<Item = (FlowId, E)>,
        E: IntoIterator<Item = EntityId>,
    {
        for (flow, entities) in membership {
            for entity in entities {
                self.connect(direction, flow.clone(), entity);
            }
        }
        self
    }

    pub fn build(self) -> Incidence {
        Incidence::from_pairs(self.fie, self.foe)
    }
}

/// The FiE / FoE / FxE relation sets with lookup indexes.
#[derive(Debug, Clone, Default)]
pub struct Incidence {
    fie: BTreeSet<FlowEntity>,
    foe: BTreeSet<FlowEntity>,
    fxe: BTreeSet<FlowEntity>,
    inputs_by_entity: BTreeMap<EntityId, Vec<FlowId>>,
    outputs_by_entity: BTreeMap<EntityId, Vec<FlowId>>,
    consumers_by_flow: BTreeMap<FlowId, Vec<EntityId>>,
    producers_by_flow: BTreeMap<FlowId, Vec<EntityId>>,
}

impl Incidence {
    fn from_pairs(fie: BTreeSet<FlowEntity>, foe: BTreeSet<FlowEntity>) -> Self {
        let mut inc = Incidence {
            fxe: fie.union(&foe).cloned().collect(),
            ..Default::default()
        };
        for (f, e) in &fie {
            inc.inputs_by_entity.entry(e.clone()).or_default().push(f.clone());
            inc.consumers_by_flow.entry(f.clone()).or_default().push(e.clone());
        }
        for (f, e) in &foe {
            inc.outputs_by_entity.entry(e.clone()).or_default().push(f.clone());
            inc.producers_by_flow.entry(f.clone()).or_default().push(e.clone());
        }
        inc.fie = fie;
        inc.foe = foe;
        inc
    }

    pub fn fie(&self) -> &BTreeSet<FlowEntity> {
        &self.fie
    }

    pub fn foe(&self) -> &BTreeSet<FlowEntity> {
        &self.foe
    }

    pub fn fxe(&self) -> &BTreeSet<FlowEntity> {
        &self.fxe
    }

    pub fn pairs(&self, direction: Direction) -> &BTreeSet<FlowEntity> {
        match direction {
            Direction::Input => &self.fie,
            Direction::Output => &self.foe,
        }
    }

    /// Every flow with at least one connection, sorted.
    pub fn flows(&self) -> BTreeSet<FlowId> {
        self.fxe.iter().map(|(f, _)| f.clone()).collect()
    }

    /// Every connected entity, sorted.
    pub fn entities(&self) -> BTreeSet<EntityId> {
        self.fxe.iter().map(|(_, e)| e.clone()).collect()
    }

    pub fn inputs_of(&self, entity: &str) -> &[FlowId] {
        self.inputs_by_entity.get(entity).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn outputs_of(&self, entity: &str) -> &[FlowId] {
        self.outputs_by_entity.get(entity).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn consumers_of(&self, flow: &str) -> &[EntityId] {
        self.consumers_by_flow.get(flow).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn producers_of(&self, flow: &str) -> &[EntityId] {
        self.producers_by_flow.get(flow).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Flows connected to `entity` in `direction`.
    pub fn flows_of(&self, entity: &str, direction: Direction) -> &[FlowId] {
        match direction {
            Direction::Input => self.inputs_of(entity),
            Direction::Output => self.outputs_of(entity),
        }
    }

    /// Entities connected to `flow` in `direction`.
    pub fn entities_of(&self, flow: &str, direction: Direction) -> &[EntityId] {
        match direction {
            Direction::Input => self.consumers_of(flow),
            Direction::Output => self.producers_of(flow),
        }
    }

    pub fn contains(&self, direction: Direction, flow: &FlowId, entity: &EntityId) -> bool {
        self.pairs(direction).contains(&(flow.clone(), entity.clone()))
    }

    /// Pairs of `direction` whose entity is in `entities`, e.g. a sector's
    /// share of FiE.
    pub fn subset(&self, direction: Direction, entities: &BTreeSet<EntityId>) -> BTreeSet<FlowEntity> {
        self.pairs(direction)
            .iter()
            .filter(|(_, e)| entities.contains(e))
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.fxe.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fxe.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chp_system() -> Incidence {
        IncidenceBuilder::new()
            .consumes("natgas", "conv_chp")
            .produces("elec", "conv_chp")
            .produces("heat", "conv_chp")
            .produces("natgas", "trd_gas")
            .consumes("elec", "dem_elec")
            .build()
    }

    #[test]
    fn test_chp_has_one_input_two_outputs() {
        let inc = chp_system();
        assert_eq!(inc.inputs_of("conv_chp"), &[FlowId::new("natgas")]);
        assert_eq!(inc.outputs_of("conv_chp").len(), 2);
        assert!(inc.inputs_of("trd_gas").is_empty());
    }

    #[test]
    fn test_fxe_is_union() {
        let inc = chp_system();
        assert_eq!(inc.fie().len(), 2);
        assert_eq!(inc.foe().len(), 3);
        assert_eq!(inc.fxe().len(), 5);
        assert_eq!(inc.flows().len(), 3);
        assert_eq!(inc.entities().len(), 3);
    }

    #[test]
    fn test_same_flow_both_directions() {
        let inc = IncidenceBuilder::new()
            .consumes("elec", "sto_bat")
            .produces("elec", "sto_bat")
            .build();
        assert_eq!(inc.fie().len(), 1);
        assert_eq!(inc.foe().len(), 1);
        assert_eq!(inc.fxe().len(), 1);
    }

    #[test]
    fn test_duplicate_pairs_collapse() {
        let inc = IncidenceBuilder::new()
            .consumes("elec", "dem_elec")
            .consumes("elec", "dem_elec")
            .build();
        assert_eq!(inc.fie().len(), 1);
        assert_eq!(inc.consumers_of("elec").len(), 1);
    }

    #[test]
    fn test_subset_by_entities() {
        let inc = chp_system();
        let conv: BTreeSet<EntityId> = [EntityId::new("conv_chp")].into_iter().collect();
        assert_eq!(inc.subset(Direction::Output, &conv).len(), 2);
        assert_eq!(inc.subset(Direction::Input, &conv).len(), 1);
    }

    #[test]
    fn test_membership_map_drops_empty_flows() {
        let membership = vec![
            (FlowId::new("elec"), vec![EntityId::new("dem_elec")]),
            (FlowId::new("hydrogen"), vec![]),
        ];
        let inc = IncidenceBuilder::new()
            .with_membership(Direction::Input, membership)
            .build();
        assert_eq!(inc.flows().len(), 1);
        assert!(inc.consumers_of("hydrogen").is_empty());
    }
}
