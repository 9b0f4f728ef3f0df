//! Capacity lifecycle rules, keyed by `(entity, year)`
//!
//! ```text
//! ctot[y] = ctot[y-1] + cnew[y] - cret[y]        (y > enable_year)
//!
//! cret[y] = 0                                    no lifetime
//!         = initial_retired_capacity[y]          y - y0 <  lifetime
//!         = cnew[b]                              y - y0 >= lifetime
//!
//!   b = latest modelled year <= y - lifetime
//! ```
//!
//! With a year step that does not divide the lifetime, capacity retires in
//! the first modelled year at which it has reached its lifetime.
//!
//! All rules skip for entities outside `Caps`.

use restore_core::{EntityId, RestoreError, RestoreResult, Year};

use super::init::enable_year;
use crate::model::{Constraint, LinExpr, Model, Outcome};

pub const LIFETIME: &str = "lifetime";

/// `ctot[e,y] <= max_capacity_annual(e,y)`.
pub fn cap_max_annual(model: &Model, key: &(EntityId, Year)) -> RestoreResult<Outcome> {
    let (entity, year) = (key.0.as_str(), key.1);
    if !model.has_capacity(entity) {
        return Ok(Outcome::Skip);
    }
    match model.store().get(entity, "max_capacity_annual", year) {
        Some(max) => Ok(Constraint::le(model.capacity_total(entity, year)?, max).into()),
        None => Ok(Outcome::Skip),
    }
}

/// Continuity between consecutive modelled years.
pub fn cap_transfer(model: &Model, key: &(EntityId, Year)) -> RestoreResult<Outcome> {
    let (entity, year) = (key.0.as_str(), key.1);
    if !model.has_capacity(entity) || year <= enable_year(model, entity)? {
        return Ok(Outcome::Skip);
    }
    let Some(prev) = model.time().previous_year(year) else {
        return Ok(Outcome::Skip);
    };
    let rhs = LinExpr::from(model.capacity_total(entity, prev)?) + model.capacity_new(entity, year)?
        - model.capacity_retired(entity, year)?;
    Ok(Constraint::eq(model.capacity_total(entity, year)?, rhs).into())
}

/// Lifetime in whole years, `None` when capacity never ages out.
pub fn lifetime(model: &Model, entity: &str) -> RestoreResult<Option<i32>> {
    let Some(raw) = model.store().get_const(entity, LIFETIME) else {
        return Ok(None);
    };
    if raw.fract() != 0.0 || raw < 1.0 {
        return Err(RestoreError::invalid(
            entity,
            LIFETIME,
            format!("{raw} is not a positive whole number of years"),
        ));
    }
    Ok(Some(raw as i32))
}

/// Retirement: historical schedule while the initial stock is still within
/// its lifetime, then the capacity built in the latest modelled year at least
/// `lifetime` years earlier.
pub fn cap_retirement(model: &Model, key: &(EntityId, Year)) -> RestoreResult<Outcome> {
    let (entity, year) = (key.0.as_str(), key.1);
    if !model.has_capacity(entity) || year <= enable_year(model, entity)? {
        return Ok(Outcome::Skip);
    }
    let cret = model.capacity_retired(entity, year)?;
    let Some(lifetime) = lifetime(model, entity)? else {
        return Ok(Constraint::eq(cret, 0.0).into());
    };

    let elapsed = year - model.time().first_year();
    let rhs = if elapsed < lifetime {
        LinExpr::constant(model.store().get_annual(entity, "initial_retired_capacity", year)?)
    } else {
        match built_year(model, year, lifetime) {
            Some(built) => LinExpr::from(model.capacity_new(entity, built)?),
            None => LinExpr::constant(0.0),
        }
    };
    Ok(Constraint::eq(cret, rhs).into())
}

/// Latest modelled year whose new capacity reaches `lifetime` by `year`.
fn built_year(model: &Model, year: Year, lifetime: i32) -> Option<Year> {
    let cutoff = year - lifetime;
    model.time().years().iter().rev().copied().find(|&y| y <= cutoff)
}

/// `cnew[e,y] <= buildrate(e,y) · year_step`.
pub fn cap_buildrate(model: &Model, key: &(EntityId, Year)) -> RestoreResult<Outcome> {
    let (entity, year) = (key.0.as_str(), key.1);
    if !model.has_capacity(entity) {
        return Ok(Outcome::Skip);
    }
    let Some(rate) = model.store().get(entity, "buildrate", year) else {
        return Ok(Outcome::Skip);
    };
    if rate < 0.0 {
        return Err(RestoreError::invalid(entity, "buildrate", format!("{rate} is negative")));
    }
    let limit = rate * f64::from(model.time().year_step());
    Ok(Constraint::le(model.capacity_new(entity, year)?, limit).into())
}

/// `ctot[e,y] <= growthrate^year_step · ctot[e,y-step]`.
pub fn cap_growthrate(model: &Model, key: &(EntityId, Year)) -> RestoreResult<Outcome> {
    let (entity, year) = (key.0.as_str(), key.1);
    if !model.has_capacity(entity) || year <= enable_year(model, entity)? {
        return Ok(Outcome::Skip);
    }
    let Some(rate) = model.store().get(entity, "growthrate", year) else {
        return Ok(Outcome::Skip);
    };
    if rate < 0.0 {
        return Err(RestoreError::invalid(entity, "growthrate", format!("{rate} is negative")));
    }
    let Some(prev) = model.time().previous_year(year) else {
        return Ok(Outcome::Skip);
    };
    let factor = rate.powi(model.time().year_step() as i32);
    Ok(Constraint::le(
        model.capacity_total(entity, year)?,
        factor * model.capacity_total(entity, prev)?,
    )
    .into())
}
