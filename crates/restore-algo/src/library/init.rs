//! Initial conditions from historical actuals
//!
//! Per capacity-enabled entity the years pass through three states:
//!
//! ```text
//!   y < enable_year        y == enable_year           y > enable_year
//! ┌──────────────┐      ┌──────────────────────┐     ┌──────────────────┐
//! │   disabled   │ ───▶ │    fixed-initial     │ ──▶ │       free       │
//! │ ctot=cnew=0  │      │ ctot=actual_capacity │     │ transfer, retire │
//! │ cret=0       │      │ cnew=cret=0          │     │ buildrate, ...   │
//! └──────────────┘      └──────────────────────┘     └──────────────────┘
//! ```

use restore_core::{EntityId, RestoreError, RestoreResult, Year, HOURS_PER_YEAR};
use tracing::debug;

use crate::model::{Model, ACTIVITY};

pub const ENABLE_YEAR: &str = "enable_year";
pub const ENABLE_CAPACITY: &str = "enable_capacity";

/// First year an entity exists in the model; defaults to the first model year.
pub fn enable_year(model: &Model, entity: &str) -> RestoreResult<Year> {
    let time = model.time();
    let Some(raw) = model.store().get_cnf(entity, ENABLE_YEAR) else {
        return Ok(time.first_year());
    };
    if raw.fract() != 0.0 {
        return Err(RestoreError::invalid(
            entity,
            ENABLE_YEAR,
            format!("{raw} is not a whole year"),
        ));
    }
    let year = raw as Year;
    if !time.contains_year(year) {
        return Err(RestoreError::invalid(
            entity,
            ENABLE_YEAR,
            format!(
                "{year} is not a modelled year in {}..={}",
                time.first_year(),
                time.last_year()
            ),
        ));
    }
    Ok(year)
}

/// Fix every slice of `family` for one (entity, year) to `value`.
pub fn fix_year_slices(model: &mut Model, family: &str, entity: &str, year: Year, value: f64) -> RestoreResult<()> {
    let vars = model
        .time()
        .slices_in(year)
        .map(|s| model.slice_var(family, entity, &s))
        .collect::<RestoreResult<Vec<_>>>()?;
    for var in vars {
        model.fix(var, value)?;
    }
    Ok(())
}

/// Pin activity in the first model year to `actual_activity / 8760` for
/// entities that exist from the start.
pub fn init_activity<'e, I>(model: &mut Model, entities: I) -> RestoreResult<()>
where
    I: IntoIterator<Item = &'e EntityId>,
{
    let y0 = model.time().first_year();
    for entity in entities {
        if enable_year(model, entity.as_str())? != y0 {
            continue;
        }
        let actual = model.store().get_annual(entity.as_str(), "actual_activity", y0)?;
        fix_year_slices(model, ACTIVITY, entity.as_str(), y0, actual / HOURS_PER_YEAR)?;
        debug!(entity = %entity, year = y0, actual, "fixed initial activity");
    }
    Ok(())
}

/// Pin capacity before and at the enable year. Entities outside `Caps` are
/// ignored.
pub fn init_capacity<'e, I>(model: &mut Model, entities: I) -> RestoreResult<()>
where
    I: IntoIterator<Item = &'e EntityId>,
{
    for entity in entities {
        let e = entity.as_str();
        if !model.has_capacity(e) {
            continue;
        }
        let enable = enable_year(model, e)?;
        let years: Vec<Year> = model.time().years().iter().copied().filter(|&y| y <= enable).collect();
        for year in years {
            let total = if year == enable {
                model.store().get_annual(e, "actual_capacity", year)?
            } else {
                0.0
            };
            let ctot = model.capacity_total(e, year)?;
            let cnew = model.capacity_new(e, year)?;
            let cret = model.capacity_retired(e, year)?;
            model.fix(ctot, total)?;
            model.fix(cnew, 0.0)?;
            model.fix(cret, 0.0)?;
        }
        debug!(entity = e, enable, "fixed initial capacity");
    }
    Ok(())
}
