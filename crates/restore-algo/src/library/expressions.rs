//! Reusable annualised expressions

use restore_core::{RestoreResult, Slice, Year, HOURS_PER_YEAR};

use crate::model::{LinExpr, Model, VarId, ACTIVITY};

/// `Σ_d weight[y,d] · Σ_h HL · x[y,d,h]` for a per-slice variable lookup.
pub fn annual_sum<F>(model: &Model, year: Year, mut var: F) -> RestoreResult<LinExpr>
where
    F: FnMut(&Slice) -> RestoreResult<VarId>,
{
    let time = model.time();
    let hl = time.hour_slice() as f64;
    let mut expr = LinExpr::new();
    for slice in time.slices_in(year) {
        let weight = time.day_weight(year, slice.day) * hl;
        expr.add_term(var(&slice)?, weight);
    }
    Ok(expr)
}

pub fn total_annual_activity(model: &Model, entity: &str, year: Year) -> RestoreResult<LinExpr> {
    annual_sum(model, year, |s| model.slice_var(ACTIVITY, entity, s))
}

pub fn total_annual_inflow(model: &Model, flow: &str, entity: &str, year: Year) -> RestoreResult<LinExpr> {
    annual_sum(model, year, |s| model.flow_in(flow, entity, s))
}

pub fn total_annual_outflow(model: &Model, flow: &str, entity: &str, year: Year) -> RestoreResult<LinExpr> {
    annual_sum(model, year, |s| model.flow_out(flow, entity, s))
}

/// Activity one unit of capacity yields per hour, `capacity_to_activity / 8760`.
pub fn hourly_capacity_to_activity(model: &Model, entity: &str, year: Year) -> RestoreResult<f64> {
    Ok(model.store().get_required(entity, "capacity_to_activity", year)? / HOURS_PER_YEAR)
}
