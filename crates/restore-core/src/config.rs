//! Hierarchical parameter store
//!
//! Every entity owns five typed tables, one per value kind:
//!
//! ```text
//! kind            key                        example
//! ─────────────── ────────────────────────── ─────────────────────────────
//! annual          (parameter, year)          actual_capacity[2020]
//! annual_fxe      (parameter, flow, year)    output_share_max[heat, 2030]
//! constant        parameter                  lifetime
//! constant_fxe    (parameter, flow)          input_efficiency[natgas]
//! configuration   option                     enable_capacity
//! ```
//!
//! A cell is `Option<f64>`: `None` is an empty (NaN) cell in the source
//! table. The getters differ only in how they treat a missing key versus an
//! empty cell, and that difference decides whether a constraint is skipped or
//! the build aborts:
//!
//! | getter          | missing key           | empty cell            |
//! |-----------------|-----------------------|-----------------------|
//! | `get_annual`    | `MissingRequiredValue`| `MissingRequiredValue`|
//! | `get_const`     | `None`                | `None`                |
//! | `get`           | `None`                | `None`                |
//! | `get_fxe`       | `MissingRequiredValue`| `None`                |
//! | `find_fxe`      | `None`                | `None`                |
//! | `check_cnf`     | `false`               | `false`               |
//!
//! The store is built once at load time and only read afterwards, so sector
//! hooks can share `&ConfigStore` freely.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::str::FromStr;

use crate::error::{RestoreError, RestoreResult};
use crate::ids::{EntityId, FlowId, Year};

/// A table cell. `None` means the cell is empty.
pub type Cell = Option<f64>;

/// Row kind of a parameter table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    Annual,
    AnnualFxe,
    Constant,
    ConstantFxe,
    Configuration,
}

impl ValueKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValueKind::Annual => "annual",
            ValueKind::AnnualFxe => "annual_fxe",
            ValueKind::Constant => "constant",
            ValueKind::ConstantFxe => "constant_fxe",
            ValueKind::Configuration => "configuration",
        }
    }

    pub fn needs_flow(&self) -> bool {
        matches!(self, ValueKind::AnnualFxe | ValueKind::ConstantFxe)
    }

    pub fn needs_year(&self) -> bool {
        matches!(self, ValueKind::Annual | ValueKind::AnnualFxe)
    }
}

impl FromStr for ValueKind {
    type Err = RestoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "annual" => Ok(ValueKind::Annual),
            "annual_fxe" => Ok(ValueKind::AnnualFxe),
            "constant" => Ok(ValueKind::Constant),
            "constant_fxe" => Ok(ValueKind::ConstantFxe),
            "configuration" => Ok(ValueKind::Configuration),
            other => Err(RestoreError::Parse(format!("unknown value kind '{other}'"))),
        }
    }
}

/// Year-indexed series per parameter.
#[derive(Debug, Clone, Default)]
pub struct AnnualTable {
    series: HashMap<String, BTreeMap<Year, Cell>>,
}

impl AnnualTable {
    /// `None` when the key is absent, `Some(cell)` otherwise.
    pub fn lookup(&self, parameter: &str, year: Year) -> Option<Cell> {
        self.series.get(parameter)?.get(&year).copied()
    }

    fn insert(&mut self, parameter: &str, year: Year, cell: Cell) -> bool {
        self.series
            .entry(parameter.to_string())
            .or_default()
            .insert(year, cell)
            .is_none()
    }
}

/// Scalar per parameter.
#[derive(Debug, Clone, Default)]
pub struct ConstantTable {
    values: HashMap<String, Cell>,
}

impl ConstantTable {
    pub fn lookup(&self, parameter: &str) -> Option<Cell> {
        self.values.get(parameter).copied()
    }

    fn insert(&mut self, parameter: &str, cell: Cell) -> bool {
        self.values.insert(parameter.to_string(), cell).is_none()
    }
}

/// Configuration flags share the scalar layout.
pub type ConfigurationTable = ConstantTable;

/// Flow-specific scalar per parameter.
#[derive(Debug, Clone, Default)]
pub struct FlowConstantTable {
    values: HashMap<String, HashMap<FlowId, Cell>>,
}

impl FlowConstantTable {
    pub fn lookup(&self, parameter: &str, flow: &str) -> Option<Cell> {
        self.values.get(parameter)?.get(flow).copied()
    }

    fn contains(&self, parameter: &str, flow: &str) -> bool {
        self.lookup(parameter, flow).is_some()
    }

    fn insert(&mut self, parameter: &str, flow: &str, cell: Cell) -> bool {
        self.values
            .entry(parameter.to_string())
            .or_default()
            .insert(FlowId::new(flow), cell)
            .is_none()
    }
}

/// Flow-specific series per parameter.
#[derive(Debug, Clone, Default)]
pub struct FlowAnnualTable {
    series: HashMap<String, HashMap<FlowId, BTreeMap<Year, Cell>>>,
}

impl FlowAnnualTable {
    pub fn lookup(&self, parameter: &str, flow: &str, year: Year) -> Option<Cell> {
        self.series.get(parameter)?.get(flow)?.get(&year).copied()
    }

    fn contains_flow(&self, parameter: &str, flow: &str) -> bool {
        self.series
            .get(parameter)
            .map(|by_flow| by_flow.contains_key(flow))
            .unwrap_or(false)
    }

    fn insert(&mut self, parameter: &str, flow: &str, year: Year, cell: Cell) -> bool {
        self.series
            .entry(parameter.to_string())
            .or_default()
            .entry(FlowId::new(flow))
            .or_default()
            .insert(year, cell)
            .is_none()
    }
}

/// All parameter tables of one entity.
#[derive(Debug, Clone, Default)]
pub struct EntityParameters {
    pub annual: AnnualTable,
    pub annual_fxe: FlowAnnualTable,
    pub constant: ConstantTable,
    pub constant_fxe: FlowConstantTable,
    pub configuration: ConfigurationTable,
}

/// One cell address in a parameter table.
#[derive(Debug, Clone, Copy)]
pub struct CellKey<'a> {
    pub kind: ValueKind,
    pub parameter: &'a str,
    pub flow: Option<&'a str>,
    pub year: Option<Year>,
}

impl<'a> CellKey<'a> {
    pub fn annual(parameter: &'a str, year: Year) -> Self {
        Self { kind: ValueKind::Annual, parameter, flow: None, year: Some(year) }
    }

    pub fn annual_fxe(parameter: &'a str, flow: &'a str, year: Year) -> Self {
        Self { kind: ValueKind::AnnualFxe, parameter, flow: Some(flow), year: Some(year) }
    }

    pub fn constant(parameter: &'a str) -> Self {
        Self { kind: ValueKind::Constant, parameter, flow: None, year: None }
    }

    pub fn constant_fxe(parameter: &'a str, flow: &'a str) -> Self {
        Self { kind: ValueKind::ConstantFxe, parameter, flow: Some(flow), year: None }
    }

    pub fn configuration(option: &'a str) -> Self {
        Self { kind: ValueKind::Configuration, parameter: option, flow: None, year: None }
    }
}

/// Read-mostly store of every entity's parameters.
#[derive(Debug, Clone, Default)]
pub struct ConfigStore {
    entities: BTreeMap<EntityId, EntityParameters>,
}

impl ConfigStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an entity with empty tables. Re-declaring is a no-op.
    pub fn declare_entity(&mut self, entity: &str) {
        self.entities.entry(EntityId::new(entity)).or_default();
    }

    /// Store one cell, declaring the entity if needed.
    ///
    /// Fails when the key shape does not match the kind, or when the same
    /// cell was already defined.
    pub fn insert(&mut self, entity: &str, key: CellKey<'_>, cell: Cell) -> RestoreResult<()> {
        let cell = cell.filter(|v| !v.is_nan());
        let params = self.entities.entry(EntityId::new(entity)).or_default();
        let fresh = match (key.kind, key.flow, key.year) {
            (ValueKind::Annual, None, Some(year)) => params.annual.insert(key.parameter, year, cell),
            (ValueKind::AnnualFxe, Some(flow), Some(year)) => {
                params.annual_fxe.insert(key.parameter, flow, year, cell)
            }
            (ValueKind::Constant, None, None) => params.constant.insert(key.parameter, cell),
            (ValueKind::ConstantFxe, Some(flow), None) => {
                params.constant_fxe.insert(key.parameter, flow, cell)
            }
            (ValueKind::Configuration, None, None) => {
                params.configuration.insert(key.parameter, cell)
            }
            (kind, _, _) => {
                return Err(RestoreError::invalid(
                    entity,
                    key.parameter,
                    format!(
                        "'{}' rows need {} flow and {} year",
                        kind.as_str(),
                        if kind.needs_flow() { "a" } else { "no" },
                        if kind.needs_year() { "a" } else { "no" },
                    ),
                ))
            }
        };

        if fresh {
            Ok(())
        } else {
            Err(RestoreError::invalid(
                entity,
                key.parameter,
                format!("duplicate '{}' definition", key.kind.as_str()),
            ))
        }
    }

    /// Set a flow-specific constant only if the parameter has no flow-specific
    /// definition for this flow yet. Used to seed efficiencies from the
    /// incidence tables without overriding explicit rows.
    pub fn insert_default_fxe(&mut self, entity: &str, parameter: &str, flow: &str, value: f64) {
        let params = self.entities.entry(EntityId::new(entity)).or_default();
        if params.constant_fxe.contains(parameter, flow)
            || params.annual_fxe.contains_flow(parameter, flow)
        {
            return;
        }
        params.constant_fxe.insert(parameter, flow, Some(value).filter(|v| !v.is_nan()));
    }

    pub fn entities(&self) -> impl Iterator<Item = &EntityId> {
        self.entities.keys()
    }

    pub fn entities_with_prefix<'a>(&'a self, prefix: &'a str) -> impl Iterator<Item = &'a EntityId> {
        self.entities.keys().filter(move |e| e.has_prefix(prefix))
    }

    pub fn has_entity(&self, entity: &str) -> bool {
        self.entities.contains_key(entity)
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn parameters(&self, entity: &str) -> Option<&EntityParameters> {
        self.entities.get(entity)
    }

    /// Year-specific value that must exist.
    pub fn get_annual(&self, entity: &str, parameter: &str, year: Year) -> RestoreResult<f64> {
        self.parameters(entity)
            .and_then(|p| p.annual.lookup(parameter, year))
            .flatten()
            .ok_or_else(|| RestoreError::missing_annual(entity, parameter, year))
    }

    /// Optional scalar; `None` means "not configured".
    pub fn get_const(&self, entity: &str, parameter: &str) -> Option<f64> {
        self.parameters(entity)?.constant.lookup(parameter).flatten()
    }

    /// Optional year-dependent value: the annual cell, else the constant.
    pub fn get(&self, entity: &str, parameter: &str, year: Year) -> Option<f64> {
        let params = self.parameters(entity)?;
        params
            .annual
            .lookup(parameter, year)
            .flatten()
            .or_else(|| params.constant.lookup(parameter).flatten())
    }

    /// Like [`get`](Self::get) but a missing value is fatal.
    pub fn get_required(&self, entity: &str, parameter: &str, year: Year) -> RestoreResult<f64> {
        self.get(entity, parameter, year)
            .ok_or_else(|| RestoreError::missing_annual(entity, parameter, year))
    }

    /// Flow-specific value for a year.
    ///
    /// Resolves `annual_fxe[flow, year]`, then `constant_fxe[flow]`. A missing
    /// key in both tables is an error; a key with an empty cell is `None`.
    pub fn get_fxe(
        &self,
        entity: &str,
        parameter: &str,
        flow: &str,
        year: Year,
    ) -> RestoreResult<Option<f64>> {
        let params = self
            .parameters(entity)
            .ok_or_else(|| RestoreError::missing_fxe(entity, parameter, flow, Some(year)))?;
        if let Some(Some(value)) = params.annual_fxe.lookup(parameter, flow, year) {
            return Ok(Some(value));
        }
        match params.constant_fxe.lookup(parameter, flow) {
            Some(cell) => Ok(cell),
            None if params.annual_fxe.lookup(parameter, flow, year).is_some() => Ok(None),
            None => Err(RestoreError::missing_fxe(entity, parameter, flow, Some(year))),
        }
    }

    /// Optional flow-specific value: like [`get_fxe`](Self::get_fxe) but a
    /// missing key is also absent. Used for shares, which most entities never
    /// configure.
    pub fn find_fxe(&self, entity: &str, parameter: &str, flow: &str, year: Year) -> Option<f64> {
        let params = self.parameters(entity)?;
        params
            .annual_fxe
            .lookup(parameter, flow, year)
            .flatten()
            .or_else(|| params.constant_fxe.lookup(parameter, flow).flatten())
    }

    /// Flow-specific constant. Same policy as [`get_fxe`](Self::get_fxe).
    pub fn get_const_fxe(
        &self,
        entity: &str,
        parameter: &str,
        flow: &str,
    ) -> RestoreResult<Option<f64>> {
        self.parameters(entity)
            .and_then(|p| p.constant_fxe.lookup(parameter, flow))
            .ok_or_else(|| RestoreError::missing_fxe(entity, parameter, flow, None))
    }

    /// Whether a configuration option is set. Empty or missing means disabled.
    pub fn check_cnf(&self, entity: &str, option: &str) -> bool {
        self.get_cnf(entity, option).is_some()
    }

    /// Numeric value of a configuration option, e.g. `enable_year`.
    pub fn get_cnf(&self, entity: &str, option: &str) -> Option<f64> {
        self.parameters(entity)?.configuration.lookup(option).flatten()
    }

    /// Subset of `entities` with `option` enabled.
    pub fn build_cnf_set<'a, I>(&self, entities: I, option: &str) -> BTreeSet<EntityId>
    where
        I: IntoIterator<Item = &'a EntityId>,
    {
        entities
            .into_iter()
            .filter(|e| self.check_cnf(e.as_str(), option))
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> ConfigStore {
        let mut store = ConfigStore::new();
        store
            .insert("gen_coal", CellKey::annual("actual_capacity", 2000), Some(10.0))
            .unwrap();
        store
            .insert("gen_coal", CellKey::annual("actual_capacity", 2001), None)
            .unwrap();
        store.insert("gen_coal", CellKey::constant("lifetime"), Some(2.0)).unwrap();
        store.insert("gen_coal", CellKey::constant("ramp_rate"), None).unwrap();
        store
            .insert("gen_coal", CellKey::constant_fxe("output_efficiency", "elec"), Some(0.4))
            .unwrap();
        store
            .insert("gen_coal", CellKey::constant_fxe("output_share_max", "elec"), None)
            .unwrap();
        store
            .insert("gen_coal", CellKey::configuration("enable_capacity"), Some(1.0))
            .unwrap();
        store
            .insert("gen_coal", CellKey::configuration("enable_year"), None)
            .unwrap();
        store.declare_entity("dem_elec");
        store
    }

    #[test]
    fn test_get_annual_is_strict() {
        let store = store();
        assert_eq!(store.get_annual("gen_coal", "actual_capacity", 2000).unwrap(), 10.0);
        let empty = store.get_annual("gen_coal", "actual_capacity", 2001);
        assert!(matches!(empty, Err(RestoreError::MissingRequiredValue { .. })));
        let missing = store.get_annual("gen_coal", "actual_capacity", 1999);
        assert!(matches!(missing, Err(RestoreError::MissingRequiredValue { year: Some(1999), .. })));
    }

    #[test]
    fn test_get_const_returns_absent() {
        let store = store();
        assert_eq!(store.get_const("gen_coal", "lifetime"), Some(2.0));
        assert_eq!(store.get_const("gen_coal", "ramp_rate"), None);
        assert_eq!(store.get_const("gen_coal", "never_defined"), None);
        assert_eq!(store.get_const("unknown", "lifetime"), None);
    }

    #[test]
    fn test_get_falls_back_to_constant() {
        let mut store = store();
        store
            .insert("gen_coal", CellKey::annual("lifetime", 2005), Some(40.0))
            .unwrap();
        assert_eq!(store.get("gen_coal", "lifetime", 2005), Some(40.0));
        assert_eq!(store.get("gen_coal", "lifetime", 2006), Some(2.0));
        assert_eq!(store.get("gen_coal", "actual_capacity", 2001), None);
    }

    #[test]
    fn test_get_fxe_key_versus_cell() {
        let store = store();
        assert_eq!(store.get_fxe("gen_coal", "output_efficiency", "elec", 2000).unwrap(), Some(0.4));
        assert_eq!(store.get_fxe("gen_coal", "output_share_max", "elec", 2000).unwrap(), None);
        assert!(store.get_fxe("gen_coal", "output_efficiency", "heat", 2000).is_err());
        assert!(store.get_const_fxe("gen_coal", "input_efficiency", "elec").is_err());
        assert_eq!(store.find_fxe("gen_coal", "output_efficiency", "heat", 2000), None);
        assert_eq!(store.find_fxe("gen_coal", "output_efficiency", "elec", 2000), Some(0.4));
    }

    #[test]
    fn test_annual_fxe_overrides_constant() {
        let mut store = store();
        store
            .insert("gen_coal", CellKey::annual_fxe("output_efficiency", "elec", 2010), Some(0.45))
            .unwrap();
        assert_eq!(store.get_fxe("gen_coal", "output_efficiency", "elec", 2010).unwrap(), Some(0.45));
        assert_eq!(store.get_fxe("gen_coal", "output_efficiency", "elec", 2011).unwrap(), Some(0.4));
    }

    #[test]
    fn test_check_cnf_treats_empty_as_disabled() {
        let store = store();
        assert!(store.check_cnf("gen_coal", "enable_capacity"));
        assert!(!store.check_cnf("gen_coal", "enable_year"));
        assert!(!store.check_cnf("dem_elec", "enable_capacity"));
    }

    #[test]
    fn test_build_cnf_set() {
        let store = store();
        let all: Vec<EntityId> = store.entities().cloned().collect();
        let caps = store.build_cnf_set(&all, "enable_capacity");
        assert_eq!(caps.len(), 1);
        assert!(caps.contains("gen_coal"));
    }

    #[test]
    fn test_duplicate_cell_rejected() {
        let mut store = store();
        let err = store
            .insert("gen_coal", CellKey::constant("lifetime"), Some(3.0))
            .unwrap_err();
        assert!(matches!(err, RestoreError::InvalidConfiguration { .. }));
    }

    #[test]
    fn test_key_shape_validated() {
        let mut store = ConfigStore::new();
        let bad = CellKey { kind: ValueKind::Annual, parameter: "x", flow: None, year: None };
        assert!(store.insert("gen_coal", bad, Some(1.0)).is_err());
    }

    #[test]
    fn test_default_fxe_does_not_override() {
        let mut store = store();
        store.insert_default_fxe("gen_coal", "output_efficiency", "elec", 0.9);
        store.insert_default_fxe("gen_coal", "input_efficiency", "coal", 1.0);
        assert_eq!(store.get_const_fxe("gen_coal", "output_efficiency", "elec").unwrap(), Some(0.4));
        assert_eq!(store.get_const_fxe("gen_coal", "input_efficiency", "coal").unwrap(), Some(1.0));
    }

    #[test]
    fn test_nan_is_empty() {
        let mut store = ConfigStore::new();
        store.insert("sto_bat", CellKey::constant("lifetime"), Some(f64::NAN)).unwrap();
        assert_eq!(store.get_const("sto_bat", "lifetime"), None);
    }

    #[test]
    fn test_value_kind_parse() {
        assert_eq!("constant_fxe".parse::<ValueKind>().unwrap(), ValueKind::ConstantFxe);
        assert!("yearly".parse::<ValueKind>().is_err());
    }
}
