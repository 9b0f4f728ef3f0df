//! Discounted cost terms
//!
//! | term              | parameter              | applies to    | multiplies        |
//! |-------------------|------------------------|---------------|-------------------|
//! | investment        | `cost_investment`      | Caps          | `cnew[e,y]`       |
//! | fixed O&M         | `cost_fixed_om_annual` | Caps          | `ctot[e,y]`       |
//! | variable O&M      | `cost_variable_om`     | all           | annual activity   |
//!
//! Every term is weighted by the discount factor of its year.

use std::collections::BTreeSet;

use restore_core::{EntityId, RestoreResult, Year};

use super::expressions::total_annual_activity;
use crate::model::{LinExpr, Model};

pub fn cost_investment(model: &Model, entities: &BTreeSet<EntityId>, years: &[Year]) -> RestoreResult<LinExpr> {
    let mut cost = LinExpr::new();
    for entity in entities.iter().filter(|e| model.has_capacity(e.as_str())) {
        for &year in years {
            let unit = model.store().get_required(entity.as_str(), "cost_investment", year)?;
            let df = model.time().discount_factor(year);
            cost.add_term(model.capacity_new(entity.as_str(), year)?, df * unit);
        }
    }
    Ok(cost)
}

pub fn cost_fixed_om(model: &Model, entities: &BTreeSet<EntityId>, years: &[Year]) -> RestoreResult<LinExpr> {
    let mut cost = LinExpr::new();
    for entity in entities.iter().filter(|e| model.has_capacity(e.as_str())) {
        for &year in years {
            let unit = model
                .store()
                .get_required(entity.as_str(), "cost_fixed_om_annual", year)?;
            let df = model.time().discount_factor(year);
            cost.add_term(model.capacity_total(entity.as_str(), year)?, df * unit);
        }
    }
    Ok(cost)
}

pub fn cost_variable_om(model: &Model, entities: &BTreeSet<EntityId>, years: &[Year]) -> RestoreResult<LinExpr> {
    let mut cost = LinExpr::new();
    for entity in entities {
        for &year in years {
            let unit = model.store().get_required(entity.as_str(), "cost_variable_om", year)?;
            let df = model.time().discount_factor(year);
            cost += total_annual_activity(model, entity.as_str(), year)? * (df * unit);
        }
    }
    Ok(cost)
}

/// Investment + fixed O&M + variable O&M.
pub fn cost_combined(model: &Model, entities: &BTreeSet<EntityId>, years: &[Year]) -> RestoreResult<LinExpr> {
    Ok(cost_investment(model, entities, years)?
        + cost_fixed_om(model, entities, years)?
        + cost_variable_om(model, entities, years)?)
}
