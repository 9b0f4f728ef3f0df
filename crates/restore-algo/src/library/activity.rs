//! Activity bounds: ramping, load factors and annual ceilings
//!
//! Activity is a per-hour rate in every slice, so hourly bounds compare it to
//! `ctot · capacity_to_activity / 8760` and yearly bounds compare the
//! weighted annual sum to `ctot · capacity_to_activity`.
//!
//! Every rule skips years up to and including the entity's enable year,
//! where activity is historical.

use std::collections::BTreeMap;

use restore_core::{EntityId, RestoreError, RestoreResult, Slice, Year};

use super::expressions::{hourly_capacity_to_activity, total_annual_activity};
use super::init::enable_year;
use crate::model::{Constraint, LinExpr, Model, Outcome};

pub const RAMP_RATE: &str = "ramp_rate";
pub const LF_MIN: &str = "lf_min";
pub const LF_MAX: &str = "lf_max";
pub const LF_PROFILE: &str = "lf_profile";

/// Hour-of-day maximum load factors (24 values) per entity, e.g. capacity
/// factors of wind and solar.
pub type LoadFactorProfiles = BTreeMap<EntityId, Vec<f64>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RampDirection {
    Up,
    Down,
}

/// Bound the change between consecutive slices of a day by
/// `ramp_rate · HL · ctot · HourlyC2A`.
///
/// Skipped when the rate is unset or the effective rate is at least 1, and
/// at the first hour of a day.
pub fn ramp(model: &Model, key: &(EntityId, Slice), direction: RampDirection) -> RestoreResult<Outcome> {
    let (entity, slice) = (key.0.as_str(), key.1);
    if !model.has_capacity(entity) || slice.year <= enable_year(model, entity)? {
        return Ok(Outcome::Skip);
    }
    let Some(rate) = model.store().get(entity, RAMP_RATE, slice.year) else {
        return Ok(Outcome::Skip);
    };
    if rate < 0.0 {
        return Err(RestoreError::invalid(entity, RAMP_RATE, format!("{rate} is negative")));
    }
    let effective = rate * model.time().hour_slice() as f64;
    if effective >= 1.0 {
        return Ok(Outcome::Skip);
    }
    let Some(prev_hour) = model.time().previous_hour(slice.hour) else {
        return Ok(Outcome::Skip);
    };

    let now = model.activity(entity, &slice)?;
    let before = model.activity(entity, &Slice::new(slice.year, slice.day, prev_hour))?;
    let limit = effective
        * hourly_capacity_to_activity(model, entity, slice.year)?
        * model.capacity_total(entity, slice.year)?;
    let delta = match direction {
        RampDirection::Up => LinExpr::from(now) - before,
        RampDirection::Down => LinExpr::from(before) - now,
    };
    Ok(Constraint::le(delta, limit).into())
}

pub fn ramp_up(model: &Model, key: &(EntityId, Slice)) -> RestoreResult<Outcome> {
    ramp(model, key, RampDirection::Up)
}

pub fn ramp_down(model: &Model, key: &(EntityId, Slice)) -> RestoreResult<Outcome> {
    ramp(model, key, RampDirection::Down)
}

/// Annual activity ceiling from `max_activity_annual`.
pub fn act_max_annual(model: &Model, key: &(EntityId, Year)) -> RestoreResult<Outcome> {
    let (entity, year) = (key.0.as_str(), key.1);
    if year <= enable_year(model, entity)? {
        return Ok(Outcome::Skip);
    }
    match model.store().get(entity, "max_activity_annual", year) {
        Some(max) => Ok(Constraint::le(total_annual_activity(model, entity, year)?, max).into()),
        None => Ok(Outcome::Skip),
    }
}

/// Which side of the load factor band.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadFactor {
    Min,
    Max,
}

impl LoadFactor {
    pub fn parameter(self) -> &'static str {
        match self {
            LoadFactor::Min => LF_MIN,
            LoadFactor::Max => LF_MAX,
        }
    }

    fn factor(self, model: &Model, entity: &str, year: Year) -> RestoreResult<Option<f64>> {
        if !model.has_capacity(entity) || year <= enable_year(model, entity)? {
            return Ok(None);
        }
        let Some(lf) = model.store().get(entity, self.parameter(), year) else {
            return Ok(None);
        };
        if !(0.0..=1.0).contains(&lf) {
            return Err(RestoreError::invalid(
                entity,
                self.parameter(),
                format!("load factor must lie in [0, 1], found {lf}"),
            ));
        }
        Ok(Some(lf))
    }

    fn bound(self, activity: LinExpr, available: LinExpr) -> Constraint {
        match self {
            LoadFactor::Min => Constraint::ge(activity, available),
            LoadFactor::Max => Constraint::le(activity, available),
        }
    }

    /// `a[e,y,d,h] (>=|<=) lf · ctot[e,y] · HourlyC2A(e,y)`.
    pub fn hourly(self, model: &Model, key: &(EntityId, Slice)) -> RestoreResult<Outcome> {
        let (entity, slice) = (key.0.as_str(), key.1);
        let Some(lf) = self.factor(model, entity, slice.year)? else {
            return Ok(Outcome::Skip);
        };
        let c2a = hourly_capacity_to_activity(model, entity, slice.year)?;
        let available = (lf * c2a) * model.capacity_total(entity, slice.year)?;
        Ok(self
            .bound(model.activity(entity, &slice)?.into(), available)
            .into())
    }

    /// Annual activity `(>=|<=) lf · ctot[e,y] · capacity_to_activity(e,y)`.
    pub fn yearly(self, model: &Model, key: &(EntityId, Year)) -> RestoreResult<Outcome> {
        let (entity, year) = (key.0.as_str(), key.1);
        let Some(lf) = self.factor(model, entity, year)? else {
            return Ok(Outcome::Skip);
        };
        let c2a = model.store().get_required(entity, "capacity_to_activity", year)?;
        let available = (lf * c2a) * model.capacity_total(entity, year)?;
        Ok(self
            .bound(total_annual_activity(model, entity, year)?, available)
            .into())
    }
}

pub fn lf_min_hour(model: &Model, key: &(EntityId, Slice)) -> RestoreResult<Outcome> {
    LoadFactor::Min.hourly(model, key)
}

pub fn lf_max_hour(model: &Model, key: &(EntityId, Slice)) -> RestoreResult<Outcome> {
    LoadFactor::Max.hourly(model, key)
}

pub fn lf_min_year(model: &Model, key: &(EntityId, Year)) -> RestoreResult<Outcome> {
    LoadFactor::Min.yearly(model, key)
}

pub fn lf_max_year(model: &Model, key: &(EntityId, Year)) -> RestoreResult<Outcome> {
    LoadFactor::Max.yearly(model, key)
}

/// `a[e,y,d,h] <= lf(h) · ctot[e,y] · HourlyC2A(e,y)`, where `lf(h)` is the
/// mean of `profile` over the hours of the slice. Takes the place of `lf_max`
/// for entities with a profile.
pub fn lf_max_profile(model: &Model, key: &(EntityId, Slice), profile: &[f64]) -> RestoreResult<Outcome> {
    let (entity, slice) = (key.0.as_str(), key.1);
    if !model.has_capacity(entity) || slice.year <= enable_year(model, entity)? {
        return Ok(Outcome::Skip);
    }
    let hl = model.time().hour_slice();
    let hours = profile.get(slice.hour..slice.hour + hl).ok_or_else(|| {
        RestoreError::invalid(
            entity,
            LF_PROFILE,
            format!("{} hourly values do not cover hour {}", profile.len(), slice.hour),
        )
    })?;
    let lf = hours.iter().sum::<f64>() / hl as f64;
    let c2a = hourly_capacity_to_activity(model, entity, slice.year)?;
    let available = (lf * c2a) * model.capacity_total(entity, slice.year)?;
    Ok(LoadFactor::Max
        .bound(model.activity(entity, &slice)?.into(), available)
        .into())
}
