//! # Constraint Library
//!
//! Rules shared by every sector. A rule takes the model and one index key
//! and returns an [`Outcome`](crate::model::Outcome): a constraint, or
//! `Skip` when the relevant parameter is not configured. Configuration
//! errors propagate as [`RestoreError`](restore_core::RestoreError).
//!
//! | module          | rules                                                  | key              |
//! |-----------------|--------------------------------------------------------|------------------|
//! | [`flow`]        | `flow_in_balance`, `flow_out_balance`, [`ShareRule`]   | (e, s), (f, e, s)|
//! | [`capacity`]    | max, transfer, retirement, buildrate, growthrate       | (e, y)           |
//! | [`activity`]    | ramp up/down, load factors, profiles, annual ceiling   | (e, s), (e, y)   |
//! | [`init`]        | `init_activity`, `init_capacity`                       | entity list      |
//! | [`cost`]        | investment, fixed O&M, variable O&M                    | entity list      |
//!
//! The `add_*` helpers below register the usual blocks for a sector under
//! `{prefix}_{rule}` names.

pub mod activity;
pub mod capacity;
pub mod cost;
pub mod expressions;
pub mod flow;
pub mod init;

use std::collections::BTreeSet;

use restore_core::{Direction, EntityId, FlowEntity, RestoreResult};

pub use activity::LoadFactorProfiles;
pub use flow::{ShareBound, ShareRule, ShareScope};

use crate::model::Model;

/// `{prefix}_flow_in` and `{prefix}_flow_out` over `entities`, optimised
/// years only: first-year flows are not tied to activity.
pub fn add_flow_balance(model: &mut Model, prefix: &str, entities: &BTreeSet<EntityId>) -> RestoreResult<()> {
    let keys = model.entity_optimised_slices(entities);
    model.add_block(&format!("{prefix}_flow_in"), keys.clone(), flow::flow_in_balance)?;
    model.add_block(&format!("{prefix}_flow_out"), keys, flow::flow_out_balance)?;
    Ok(())
}

/// One block per share rule, over the matching side of `pairs`.
pub fn add_share_rules(
    model: &mut Model,
    prefix: &str,
    inputs: &BTreeSet<FlowEntity>,
    outputs: &BTreeSet<FlowEntity>,
    rules: &[ShareRule],
) -> RestoreResult<()> {
    for rule in rules {
        let pairs = match rule.side {
            Direction::Input => inputs,
            Direction::Output => outputs,
        };
        let keys = model.pair_slices(pairs);
        let rule = *rule;
        model.add_block(
            &format!("{prefix}_{}", rule.parameter()),
            keys,
            move |m, k| rule.apply(m, k),
        )?;
    }
    Ok(())
}

/// Max capacity, transfer, retirement, buildrate and growthrate.
pub fn add_capacity_rules(model: &mut Model, prefix: &str, entities: &BTreeSet<EntityId>) -> RestoreResult<()> {
    let keys = model.entity_years(entities);
    model.add_block(&format!("{prefix}_cap_max_annual"), keys.clone(), capacity::cap_max_annual)?;
    model.add_block(&format!("{prefix}_cap_transfer"), keys.clone(), capacity::cap_transfer)?;
    model.add_block(&format!("{prefix}_cap_retirement"), keys.clone(), capacity::cap_retirement)?;
    model.add_block(&format!("{prefix}_cap_buildrate"), keys.clone(), capacity::cap_buildrate)?;
    model.add_block(&format!("{prefix}_cap_growthrate"), keys, capacity::cap_growthrate)?;
    Ok(())
}

/// Ramping, hourly and yearly load factors, and the annual ceiling. The
/// hourly maximum follows `profiles` where an entity has one.
pub fn add_activity_rules(
    model: &mut Model,
    prefix: &str,
    entities: &BTreeSet<EntityId>,
    profiles: &LoadFactorProfiles,
) -> RestoreResult<()> {
    let slices = model.entity_slices(entities);
    let years = model.entity_years(entities);
    model.add_block(&format!("{prefix}_act_ramp_up"), slices.clone(), activity::ramp_up)?;
    model.add_block(&format!("{prefix}_act_ramp_down"), slices.clone(), activity::ramp_down)?;
    model.add_block(&format!("{prefix}_act_lf_min_hour"), slices.clone(), activity::lf_min_hour)?;
    model.add_block(&format!("{prefix}_act_lf_max_hour"), slices, |m, k| match profiles.get(&k.0) {
        Some(profile) => activity::lf_max_profile(m, k, profile),
        None => activity::lf_max_hour(m, k),
    })?;
    model.add_block(&format!("{prefix}_act_lf_min_year"), years.clone(), activity::lf_min_year)?;
    model.add_block(&format!("{prefix}_act_lf_max_year"), years.clone(), activity::lf_max_year)?;
    model.add_block(&format!("{prefix}_act_max_annual"), years, activity::act_max_annual)?;
    Ok(())
}
