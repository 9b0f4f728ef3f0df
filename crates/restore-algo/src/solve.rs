//! Solver hand-off and solved values
//!
//! The symbolic model is translated to `good_lp` in one pass:
//!
//! | model                         | good_lp                                   |
//! |-------------------------------|-------------------------------------------|
//! | free variable `[lo, hi]`      | `variable().min(lo).max(hi)`              |
//! | fixed variable `= v`          | `variable()` + `constraint!(x == v)`      |
//! | `expr (==, <=, >=) 0`         | `constraint!(expr (==, <=, >=) 0.0)`      |
//! | objective                     | `minimise(objective).using(clarabel)`     |

use restore_core::{RestoreResult, Slice, Year};
use serde::{Deserialize, Serialize};

use crate::library::expressions::total_annual_activity;
use crate::model::{LinExpr, Model, Sense, VarId};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SolveOptions {
    /// Residual above which a constraint counts as violated when checking the
    /// returned point.
    pub tolerance: f64,
}

impl Default for SolveOptions {
    fn default() -> Self {
        Self { tolerance: 1e-6 }
    }
}

impl SolveOptions {
    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }
}

/// Solved values, indexed like the model's variable registry.
#[derive(Debug, Clone)]
pub struct ModelSolution<'m, 'a> {
    model: &'m Model<'a>,
    values: Vec<f64>,
    pub objective: f64,
    /// Largest constraint residual in the direction of violation.
    pub max_violation: f64,
}

impl<'m, 'a> ModelSolution<'m, 'a> {
    /// Wrap a value vector; the objective is evaluated from `objective`.
    pub fn from_values(model: &'m Model<'a>, objective: &LinExpr, values: Vec<f64>) -> Self {
        let lookup = |v: VarId| values.get(v.index()).copied();
        let objective = objective.eval(lookup);
        let max_violation = model
            .constraints()
            .map(|c| {
                let r = c.residual(lookup);
                match c.sense {
                    Sense::Eq => r.abs(),
                    Sense::Le => r.max(0.0),
                    Sense::Ge => (-r).max(0.0),
                }
            })
            .fold(0.0, f64::max);
        Self {
            model,
            values,
            objective,
            max_violation,
        }
    }

    pub fn value(&self, var: VarId) -> f64 {
        self.values.get(var.index()).copied().unwrap_or(0.0)
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn activity(&self, entity: &str, slice: &Slice) -> RestoreResult<f64> {
        Ok(self.value(self.model.activity(entity, slice)?))
    }

    pub fn capacity_total(&self, entity: &str, year: Year) -> RestoreResult<f64> {
        Ok(self.value(self.model.capacity_total(entity, year)?))
    }

    pub fn capacity_new(&self, entity: &str, year: Year) -> RestoreResult<f64> {
        Ok(self.value(self.model.capacity_new(entity, year)?))
    }

    pub fn capacity_retired(&self, entity: &str, year: Year) -> RestoreResult<f64> {
        Ok(self.value(self.model.capacity_retired(entity, year)?))
    }

    pub fn flow_in(&self, flow: &str, entity: &str, slice: &Slice) -> RestoreResult<f64> {
        Ok(self.value(self.model.flow_in(flow, entity, slice)?))
    }

    pub fn flow_out(&self, flow: &str, entity: &str, slice: &Slice) -> RestoreResult<f64> {
        Ok(self.value(self.model.flow_out(flow, entity, slice)?))
    }

    /// Weighted annual activity of an entity.
    pub fn annual_activity(&self, entity: &str, year: Year) -> RestoreResult<f64> {
        let expr = total_annual_activity(self.model, entity, year)?;
        Ok(expr.eval(|v| Some(self.value(v))))
    }

    /// Call `f(name, value)` for every variable in declaration order.
    pub fn visit<F>(&self, mut f: F)
    where
        F: FnMut(&str, f64),
    {
        for (id, info) in self.model.vars().iter() {
            f(&info.name, self.value(id));
        }
    }

    /// Variables whose magnitude exceeds `tol`.
    pub fn nonzero(&self, tol: f64) -> Vec<(&str, f64)> {
        self.model
            .vars()
            .iter()
            .map(|(id, info)| (info.name.as_str(), self.value(id)))
            .filter(|(_, v)| v.abs() > tol)
            .collect()
    }
}

#[cfg(feature = "solver-clarabel")]
pub use backend::solve;

#[cfg(feature = "solver-clarabel")]
mod backend {
    use good_lp::solvers::clarabel::clarabel;
    use good_lp::{constraint, variable, variables, Expression, Solution, SolverModel, Variable};
    use restore_core::{RestoreError, RestoreResult};
    use tracing::{info, warn};

    use super::{ModelSolution, SolveOptions};
    use crate::assembler::AssembledModel;
    use crate::model::{LinExpr, Sense};

    fn to_expression(expr: &LinExpr, vars: &[Variable]) -> Expression {
        let mut out = Expression::from(expr.constant_term());
        for (var, coef) in expr.terms() {
            out += coef * vars[var.index()];
        }
        out
    }

    /// Solve the assembled LP with Clarabel.
    pub fn solve<'m, 'a>(
        assembled: &'m AssembledModel<'a>,
        options: &SolveOptions,
    ) -> RestoreResult<ModelSolution<'m, 'a>> {
        let model = &assembled.model;
        let mut problem = variables!();
        let mut lp_vars: Vec<Variable> = Vec::with_capacity(model.vars().len());
        for (_, info) in model.vars().iter() {
            let mut def = variable();
            if info.fixed.is_none() {
                if info.lower.is_finite() {
                    def = def.min(info.lower);
                }
                if info.upper.is_finite() {
                    def = def.max(info.upper);
                }
            }
            lp_vars.push(problem.add(def));
        }

        let objective = to_expression(&assembled.objective, &lp_vars);
        let mut lp = problem.minimise(objective).using(clarabel);

        for (id, info) in model.vars().iter() {
            if let Some(value) = info.fixed {
                let x = lp_vars[id.index()];
                lp = lp.with(constraint!(x == value));
            }
        }
        for c in model.constraints() {
            let e = to_expression(&c.expr, &lp_vars);
            lp = match c.sense {
                Sense::Eq => lp.with(constraint!(e == 0.0)),
                Sense::Le => lp.with(constraint!(e <= 0.0)),
                Sense::Ge => lp.with(constraint!(e >= 0.0)),
            };
        }

        info!(
            variables = lp_vars.len(),
            constraints = model.constraint_count(),
            fixed = model.vars().fixed_count(),
            "solving with clarabel"
        );
        let solution = lp
            .solve()
            .map_err(|e| RestoreError::Solver(format!("LP solver failed: {e:?}")))?;

        let values: Vec<f64> = lp_vars.iter().map(|v| solution.value(*v)).collect();
        let result = ModelSolution::from_values(model, &assembled.objective, values);
        if result.max_violation > options.tolerance {
            warn!(
                max_violation = result.max_violation,
                tolerance = options.tolerance,
                "solution violates constraints beyond tolerance"
            );
        }
        info!(objective = result.objective, "solved");
        Ok(result)
    }
}
