//! Variable registry: names, bounds and fixed values

use std::fmt;

use restore_core::{RestoreError, RestoreResult};
use serde::Serialize;

/// Dense handle into a [`VariableRegistry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct VarId(pub(crate) usize);

impl VarId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for VarId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "x{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VarInfo {
    pub name: String,
    pub lower: f64,
    pub upper: f64,
    pub fixed: Option<f64>,
}

impl VarInfo {
    /// Bounds the solver should see: a fixed value collapses both sides.
    pub fn effective_bounds(&self) -> (f64, f64) {
        match self.fixed {
            Some(v) => (v, v),
            None => (self.lower, self.upper),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct VariableRegistry {
    vars: Vec<VarInfo>,
}

impl VariableRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, name: impl Into<String>, lower: f64, upper: f64) -> VarId {
        let id = VarId(self.vars.len());
        self.vars.push(VarInfo {
            name: name.into(),
            lower,
            upper,
            fixed: None,
        });
        id
    }

    /// Non-negative, unbounded above.
    pub fn add_nonneg(&mut self, name: impl Into<String>) -> VarId {
        self.add(name, 0.0, f64::INFINITY)
    }

    /// Pin a variable. Re-fixing to the same value is a no-op; a different
    /// value means two initialisation paths disagree.
    pub fn fix(&mut self, id: VarId, value: f64) -> RestoreResult<()> {
        let info = self
            .vars
            .get_mut(id.0)
            .ok_or_else(|| RestoreError::Other(format!("unknown variable {id}")))?;
        if !value.is_finite() {
            return Err(RestoreError::invalid(
                info.name.clone(),
                "fixed_value",
                format!("{value} is not finite"),
            ));
        }
        match info.fixed {
            Some(existing) if (existing - value).abs() > 1e-9 * existing.abs().max(1.0) => {
                Err(RestoreError::invalid(
                    info.name.clone(),
                    "fixed_value",
                    format!("already fixed to {existing}, cannot fix to {value}"),
                ))
            }
            _ => {
                info.fixed = Some(value);
                Ok(())
            }
        }
    }

    pub fn get(&self, id: VarId) -> Option<&VarInfo> {
        self.vars.get(id.0)
    }

    pub fn name(&self, id: VarId) -> &str {
        self.vars.get(id.0).map(|v| v.name.as_str()).unwrap_or("?")
    }

    pub fn fixed_value(&self, id: VarId) -> Option<f64> {
        self.vars.get(id.0).and_then(|v| v.fixed)
    }

    pub fn iter(&self) -> impl Iterator<Item = (VarId, &VarInfo)> {
        self.vars.iter().enumerate().map(|(i, v)| (VarId(i), v))
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    pub fn fixed_count(&self) -> usize {
        self.vars.iter().filter(|v| v.fixed.is_some()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fix_same_value_twice() {
        let mut reg = VariableRegistry::new();
        let x = reg.add_nonneg("capacity_total[conv_pv,2020]");
        reg.fix(x, 2.5).unwrap();
        reg.fix(x, 2.5).unwrap();
        assert_eq!(reg.fixed_value(x), Some(2.5));
        assert_eq!(reg.get(x).unwrap().effective_bounds(), (2.5, 2.5));
    }

    #[test]
    fn test_fix_conflict_is_invalid() {
        let mut reg = VariableRegistry::new();
        let x = reg.add_nonneg("capacity_new[conv_pv,2020]");
        reg.fix(x, 0.0).unwrap();
        let err = reg.fix(x, 1.0).unwrap_err();
        assert!(err.is_configuration_error());
        assert!(err.to_string().contains("capacity_new[conv_pv,2020]"));
    }
}
