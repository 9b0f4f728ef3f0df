//! Flow balance and share rules
//!
//! ```text
//! inputs ──fin·η_in──▶ [ activity ] ──fout/η_out──▶ outputs
//! ```
//!
//! Input efficiency multiplies, output efficiency divides: both sides are
//! expressed in units of raw activity.

use restore_core::{Direction, EntityId, FlowId, RestoreError, RestoreResult, Slice, Year};

use crate::model::{Constraint, LinExpr, Model, Outcome, Sense, VarId};

pub const INPUT_EFFICIENCY: &str = "input_efficiency";
pub const OUTPUT_EFFICIENCY: &str = "output_efficiency";

/// Efficiency of one (entity, flow) connection. Must resolve and be positive.
pub fn efficiency(model: &Model, direction: Direction, entity: &str, flow: &str, year: Year) -> RestoreResult<f64> {
    let parameter = match direction {
        Direction::Input => INPUT_EFFICIENCY,
        Direction::Output => OUTPUT_EFFICIENCY,
    };
    let value = model
        .store()
        .get_fxe(entity, parameter, flow, year)?
        .ok_or_else(|| RestoreError::missing_fxe(entity, parameter, flow, Some(year)))?;
    if !(value.is_finite() && value > 0.0) {
        return Err(RestoreError::invalid(
            entity,
            parameter,
            format!("efficiency on '{flow}' must be positive, found {value}"),
        ));
    }
    Ok(value)
}

/// The `flow_in` or `flow_out` variable of a pair.
pub fn flow_var(model: &Model, direction: Direction, flow: &str, entity: &str, slice: &Slice) -> RestoreResult<VarId> {
    match direction {
        Direction::Input => model.flow_in(flow, entity, slice),
        Direction::Output => model.flow_out(flow, entity, slice),
    }
}

/// `Σ_f fin[f,e]·η_in(e,f)` or `Σ_f fout[f,e]/η_out(e,f)`, in activity units.
/// `None` when the entity has no connections on that side.
pub fn converted_flows(
    model: &Model,
    direction: Direction,
    entity: &str,
    slice: &Slice,
) -> RestoreResult<Option<LinExpr>> {
    let flows = model.incidence().flows_of(entity, direction);
    if flows.is_empty() {
        return Ok(None);
    }
    let mut expr = LinExpr::new();
    for flow in flows {
        let eta = efficiency(model, direction, entity, flow.as_str(), slice.year)?;
        let var = flow_var(model, direction, flow.as_str(), entity, slice)?;
        match direction {
            Direction::Input => expr.add_term(var, eta),
            Direction::Output => expr.add_term(var, 1.0 / eta),
        }
    }
    Ok(Some(expr))
}

/// `activity[e] == Σ_f fin[f,e]·η_in(e,f)`.
pub fn flow_in_balance(model: &Model, key: &(EntityId, Slice)) -> RestoreResult<Outcome> {
    let (entity, slice) = key;
    balance_against(model, Direction::Input, entity, slice, model.activity(entity, slice)?)
}

/// `activity[e] == Σ_f fout[f,e]/η_out(e,f)`.
pub fn flow_out_balance(model: &Model, key: &(EntityId, Slice)) -> RestoreResult<Outcome> {
    let (entity, slice) = key;
    balance_against(model, Direction::Output, entity, slice, model.activity(entity, slice)?)
}

/// Balance the converted flows of one side against an arbitrary variable,
/// e.g. a trade link's import or export activity.
pub fn balance_against(
    model: &Model,
    direction: Direction,
    entity: &str,
    slice: &Slice,
    target: VarId,
) -> RestoreResult<Outcome> {
    Ok(match converted_flows(model, direction, entity, slice)? {
        Some(flows) => Constraint::eq(target, flows).into(),
        None => Outcome::Skip,
    })
}

/// What a share is a fraction of.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShareScope {
    /// All entities' flows on the same flow bus (`flow_in_share_*`).
    FlowTotal,
    /// All flows of the same entity (`input_share_*`).
    EntityTotal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShareBound {
    Equal,
    Max,
    Min,
}

impl ShareBound {
    fn sense(self) -> Sense {
        match self {
            ShareBound::Equal => Sense::Eq,
            ShareBound::Max => Sense::Le,
            ShareBound::Min => Sense::Ge,
        }
    }

    fn suffix(self) -> &'static str {
        match self {
            ShareBound::Equal => "equal",
            ShareBound::Max => "max",
            ShareBound::Min => "min",
        }
    }
}

/// One of the twelve share constraint variants.
///
/// | side   | scope        | parameter                  |
/// |--------|--------------|----------------------------|
/// | Input  | FlowTotal    | `flow_in_share_{bound}`    |
/// | Output | FlowTotal    | `flow_out_share_{bound}`   |
/// | Input  | EntityTotal  | `input_share_{bound}`      |
/// | Output | EntityTotal  | `output_share_{bound}`     |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ShareRule {
    pub side: Direction,
    pub scope: ShareScope,
    pub bound: ShareBound,
}

impl ShareRule {
    pub const fn new(side: Direction, scope: ShareScope, bound: ShareBound) -> Self {
        Self { side, scope, bound }
    }

    pub fn all() -> Vec<ShareRule> {
        let mut rules = Vec::with_capacity(12);
        for side in [Direction::Input, Direction::Output] {
            for scope in [ShareScope::FlowTotal, ShareScope::EntityTotal] {
                for bound in [ShareBound::Equal, ShareBound::Max, ShareBound::Min] {
                    rules.push(ShareRule::new(side, scope, bound));
                }
            }
        }
        rules
    }

    /// All variants on one side.
    pub fn side(side: Direction) -> Vec<ShareRule> {
        Self::all().into_iter().filter(|r| r.side == side).collect()
    }

    pub fn parameter(&self) -> String {
        let stem = match (self.side, self.scope) {
            (Direction::Input, ShareScope::FlowTotal) => "flow_in_share",
            (Direction::Output, ShareScope::FlowTotal) => "flow_out_share",
            (Direction::Input, ShareScope::EntityTotal) => "input_share",
            (Direction::Output, ShareScope::EntityTotal) => "output_share",
        };
        format!("{stem}_{}", self.bound.suffix())
    }

    /// `value[f,e] {==,<=,>=} share·total`; skipped when the share is not
    /// configured for (entity, flow, year).
    pub fn apply(&self, model: &Model, key: &(FlowId, EntityId, Slice)) -> RestoreResult<Outcome> {
        let (flow, entity, slice) = key;
        let parameter = self.parameter();
        let Some(share) = model
            .store()
            .find_fxe(entity.as_str(), &parameter, flow.as_str(), slice.year)
        else {
            return Ok(Outcome::Skip);
        };
        if !(0.0..=1.0).contains(&share) {
            return Err(RestoreError::invalid(
                entity.as_str(),
                parameter,
                format!("share on '{flow}' must lie in [0, 1], found {share}"),
            ));
        }

        let value = flow_var(model, self.side, flow.as_str(), entity.as_str(), slice)?;
        let total: LinExpr = match self.scope {
            ShareScope::FlowTotal => model
                .incidence()
                .entities_of(flow.as_str(), self.side)
                .iter()
                .map(|e| flow_var(model, self.side, flow.as_str(), e.as_str(), slice).map(LinExpr::from))
                .sum::<RestoreResult<LinExpr>>()?,
            ShareScope::EntityTotal => model
                .incidence()
                .flows_of(entity.as_str(), self.side)
                .iter()
                .map(|f| flow_var(model, self.side, f.as_str(), entity.as_str(), slice).map(LinExpr::from))
                .sum::<RestoreResult<LinExpr>>()?,
        };
        Ok(Constraint::new(self.bound.sense(), value, total * share).into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_twelve_distinct_parameters() {
        let rules = ShareRule::all();
        assert_eq!(rules.len(), 12);
        let mut names: Vec<String> = rules.iter().map(ShareRule::parameter).collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), 12);
        assert!(names.contains(&"flow_in_share_equal".to_string()));
        assert!(names.contains(&"output_share_min".to_string()));
    }

    #[test]
    fn test_bound_senses() {
        assert_eq!(ShareBound::Max.sense(), Sense::Le);
        assert_eq!(ShareBound::Min.sense(), Sense::Ge);
        assert_eq!(ShareBound::Equal.sense(), Sense::Eq);
        assert_eq!(ShareRule::side(Direction::Output).len(), 6);
    }
}
