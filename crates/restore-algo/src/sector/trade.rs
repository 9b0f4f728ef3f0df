//! Cross-border trade links
//!
//! A trade link splits its activity into imports and exports that share one
//! capacity:
//!
//! ```text
//!            aexp = Σ fin·η_in                aimp = Σ fout/η_out
//!  domestic ───────────────▶ [ trd_x ] ───────────────▶ domestic
//!                        a = aimp + aexp
//! ```
//!
//! Each link enables imports, exports or both through `enable_import` and
//! `enable_export`. The disabled side is fixed to zero; enabling neither is a
//! configuration error.

use std::collections::BTreeSet;

use restore_core::{Direction, EntityId, RestoreError, RestoreResult, Slice, Year, HOURS_PER_YEAR};
use tracing::info;

use super::{declare_sets, Sector};
use crate::library::expressions::annual_sum;
use crate::library::flow::{balance_against, ShareBound, ShareRule, ShareScope};
use crate::library::init::fix_year_slices;
use crate::library::{self, activity, capacity, cost, init};
use crate::model::{Constraint, LinExpr, Model, Outcome, Resolution};

const PREFIXES: &[&str] = &["trd_"];
pub const SET_TRADES: &str = "Trades";
pub const SET_IMPORTS: &str = "TradesImp";
pub const SET_EXPORTS: &str = "TradesExp";
pub const IMPORT_ACTIVITY: &str = "import_activity";
pub const EXPORT_ACTIVITY: &str = "export_activity";

#[derive(Debug, Clone, Default)]
pub struct TradeSector;

impl TradeSector {
    pub fn new() -> Self {
        Self
    }
}

/// `a == aimp + aexp`.
fn activity_split(model: &Model, key: &(EntityId, Slice)) -> RestoreResult<Outcome> {
    let (entity, slice) = (key.0.as_str(), &key.1);
    let imports = model.slice_var(IMPORT_ACTIVITY, entity, slice)?;
    let exports = model.slice_var(EXPORT_ACTIVITY, entity, slice)?;
    Ok(Constraint::eq(model.activity(entity, slice)?, LinExpr::from(imports) + exports).into())
}

/// Exports are what flows in: `aexp == Σ fin·η_in`.
fn export_balance(model: &Model, key: &(EntityId, Slice)) -> RestoreResult<Outcome> {
    let (entity, slice) = (key.0.as_str(), &key.1);
    let target = model.slice_var(EXPORT_ACTIVITY, entity, slice)?;
    balance_against(model, Direction::Input, entity, slice, target)
}

/// Imports are what flows out: `aimp == Σ fout/η_out`.
fn import_balance(model: &Model, key: &(EntityId, Slice)) -> RestoreResult<Outcome> {
    let (entity, slice) = (key.0.as_str(), &key.1);
    let target = model.slice_var(IMPORT_ACTIVITY, entity, slice)?;
    balance_against(model, Direction::Output, entity, slice, target)
}

/// Annual import or export ceiling from `max_activity_annual`, after the
/// enable year.
fn max_annual(model: &Model, key: &(EntityId, Year), family: &str, members: &str) -> RestoreResult<Outcome> {
    let (entity, year) = (key.0.as_str(), key.1);
    let enabled = model.set(members).is_some_and(|s| s.contains(entity));
    if !enabled || year <= init::enable_year(model, entity)? {
        return Ok(Outcome::Skip);
    }
    let Some(max) = model.store().get(entity, "max_activity_annual", year) else {
        return Ok(Outcome::Skip);
    };
    let total = annual_sum(model, year, |s| model.slice_var(family, entity, s))?;
    Ok(Constraint::le(total, max).into())
}

impl Sector for TradeSector {
    fn name(&self) -> &str {
        "trade"
    }

    fn prefixes(&self) -> &[&str] {
        PREFIXES
    }

    fn configure(&self, model: &mut Model) -> RestoreResult<()> {
        let sets = declare_sets(self, model, SET_TRADES)?;
        let imports = model.store().build_cnf_set(&sets.entities, "enable_import");
        let exports = model.store().build_cnf_set(&sets.entities, "enable_export");
        if let Some(idle) = sets
            .entities
            .iter()
            .find(|e| !imports.contains(*e) && !exports.contains(*e))
        {
            return Err(RestoreError::invalid(
                idle.as_str(),
                "enable_import",
                "trade link enables neither imports nor exports",
            ));
        }
        model.add_set(SET_IMPORTS, imports.clone())?;
        model.add_set(SET_EXPORTS, exports.clone())?;

        model.add_family(IMPORT_ACTIVITY, Resolution::Slice, &sets.entities)?;
        model.add_family(EXPORT_ACTIVITY, Resolution::Slice, &sets.entities)?;

        let slices = model.entity_slices(&sets.entities);
        let optimised = model.entity_optimised_slices(&sets.entities);
        let years = model.entity_years(&sets.entities);
        model.add_block("trd_act_split", slices.clone(), activity_split)?;
        model.add_block("trd_flow_in", optimised.clone(), export_balance)?;
        model.add_block("trd_flow_out", optimised, import_balance)?;
        library::add_share_rules(
            model,
            "trd",
            &sets.inputs,
            &sets.outputs,
            &[
                ShareRule::new(Direction::Input, ShareScope::FlowTotal, ShareBound::Max),
                ShareRule::new(Direction::Output, ShareScope::FlowTotal, ShareBound::Max),
            ],
        )?;
        model.add_block("trd_cap_max_annual", years.clone(), capacity::cap_max_annual)?;
        model.add_block("trd_cap_transfer", years.clone(), capacity::cap_transfer)?;
        model.add_block("trd_cap_retirement", years.clone(), capacity::cap_retirement)?;
        model.add_block("trd_cap_buildrate", years.clone(), capacity::cap_buildrate)?;
        model.add_block("trd_act_lf_min_hour", slices.clone(), activity::lf_min_hour)?;
        model.add_block("trd_act_lf_max_hour", slices, activity::lf_max_hour)?;
        model.add_block("trd_act_max_import_annual", years.clone(), |m, k| {
            max_annual(m, k, IMPORT_ACTIVITY, SET_IMPORTS)
        })?;
        model.add_block("trd_act_max_export_annual", years, |m, k| {
            max_annual(m, k, EXPORT_ACTIVITY, SET_EXPORTS)
        })?;

        init::init_capacity(model, &sets.entities)?;
        initialise_trade(model, &sets.entities, &imports, &exports)?;

        info!(
            entities = sets.entities.len(),
            imports = imports.len(),
            exports = exports.len(),
            "configured trade sector"
        );
        Ok(())
    }

    /// Investment and fixed O&M on the shared capacity, import cost minus
    /// export revenue.
    fn cost(&self, model: &Model) -> RestoreResult<LinExpr> {
        let Some(trades) = model.set(SET_TRADES) else {
            return Ok(LinExpr::new());
        };
        let years = model.time().years();
        let mut total = cost::cost_investment(model, trades, years)? + cost::cost_fixed_om(model, trades, years)?;
        for (members, family, parameter, sign) in [
            (SET_IMPORTS, IMPORT_ACTIVITY, "cost_import", 1.0),
            (SET_EXPORTS, EXPORT_ACTIVITY, "revenue_export", -1.0),
        ] {
            for entity in model.set(members).into_iter().flatten() {
                for &year in years {
                    let unit = model.store().get_annual(entity.as_str(), parameter, year)?;
                    let df = model.time().discount_factor(year);
                    let annual = annual_sum(model, year, |s| model.slice_var(family, entity.as_str(), s))?;
                    total += annual * (sign * df * unit);
                }
            }
        }
        Ok(total)
    }
}

/// Fix the disabled side to zero in every year, and the enabled sides to
/// their first-year actuals.
fn initialise_trade(
    model: &mut Model,
    entities: &BTreeSet<EntityId>,
    imports: &BTreeSet<EntityId>,
    exports: &BTreeSet<EntityId>,
) -> RestoreResult<()> {
    let years: Vec<Year> = model.time().years().to_vec();
    let y0 = model.time().first_year();
    for entity in entities {
        let e = entity.as_str();
        for (members, family, actual) in [
            (imports, IMPORT_ACTIVITY, "actual_import"),
            (exports, EXPORT_ACTIVITY, "actual_export"),
        ] {
            if members.contains(entity) {
                let value = model.store().get_annual(e, actual, y0)? / HOURS_PER_YEAR;
                fix_year_slices(model, family, e, y0, value)?;
            } else {
                for &year in &years {
                    fix_year_slices(model, family, e, year, 0.0)?;
                }
            }
        }
    }
    Ok(())
}
