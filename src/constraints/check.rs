use super::types::{Constraint, RoleModel};
use super::ConstraintModel;
use crate::calendar::Timeline;
use crate::error::ModelBuildError;
use crate::model::{ConstraintKind, RoleConstraint, UnmetConstraint};

pub(super) fn validate(rc: &RoleConstraint) -> Result<(), ModelBuildError> {
    let invalid = |reason: &'static str| ModelBuildError::InvalidConstraint {
        role: rc.role.clone(),
        reason,
    };
    if rc.role.trim().is_empty() {
        return Err(invalid("role name cannot be empty"));
    }
    if rc.headcount == 0 {
        return Err(invalid("headcount must be >= 1"));
    }
    if let Some(h) = rc.max_hours {
        if !h.is_finite() || h <= 0.0 {
            return Err(invalid("max_hours must be > 0"));
        }
    }
    if let Some(h) = rc.min_rest_hours {
        if !h.is_finite() || h < 0.0 {
            return Err(invalid("min_rest_hours must be >= 0"));
        }
    }
    if rc.pool_size == Some(0) {
        return Err(invalid("pool_size must be >= 1"));
    }
    if let Some(active) = &rc.active {
        if active.end <= active.start {
            return Err(invalid("active window end must be after start"));
        }
    }
    Ok(())
}

/// Incohérences détectables sans recherche : capacité, effectif, heures, repos.
pub(super) fn structural(
    role: &RoleModel,
    rc: &RoleConstraint,
    timeline: &Timeline,
) -> Vec<UnmetConstraint> {
    let mut out = Vec::new();
    let g = timeline.granularity_minutes();
    let h = i64::from(role.headcount);
    let pool = i64::from(role.pool_size);

    if role.active_slots.is_empty() {
        out.push(UnmetConstraint::new(
            &role.name,
            ConstraintKind::Capacity,
            "no schedulable slot: the active window is entirely quiet",
        ));
        return out;
    }

    if h > role.active_slots.len() as i64 {
        out.push(UnmetConstraint::new(
            &role.name,
            ConstraintKind::Headcount,
            format!(
                "headcount {} exceeds the {} schedulable slot(s)",
                role.headcount,
                role.active_slots.len()
            ),
        ));
    } else if h > pool {
        out.push(UnmetConstraint::new(
            &role.name,
            ConstraintKind::Headcount,
            format!(
                "headcount {} exceeds the {} available worker(s)",
                role.headcount, role.pool_size
            ),
        ));
    }

    match role.max_slots {
        Some(0) => out.push(UnmetConstraint::new(
            &role.name,
            ConstraintKind::MaxHours,
            format!(
                "max_hours {} is shorter than one {g}-minute slot",
                rc.max_hours.unwrap_or_default()
            ),
        )),
        Some(m) => {
            let need = h * role.active_slots.len() as i64;
            let cap = pool * i64::from(m);
            if need > cap {
                out.push(UnmetConstraint::new(
                    &role.name,
                    ConstraintKind::MaxHours,
                    format!("needs {need} slot-units but the pool covers at most {cap}"),
                ));
            }
        }
        None => {}
    }

    // sans relève, chacun travaille tous les slots actifs : les trous
    // (heures calmes) deviennent des repos imposés
    if let Some(rest) = role.rest_slots {
        if h == pool {
            let short_gap = role
                .active_slots
                .windows(2)
                .map(|w| w[1] - w[0] - 1)
                .find(|gap| *gap > 0 && *gap < rest);
            if let Some(gap) = short_gap {
                out.push(UnmetConstraint::new(
                    &role.name,
                    ConstraintKind::MinRest,
                    format!(
                        "a {} min break is shorter than the {} h rest and no relief worker is available",
                        gap as i64 * i64::from(g),
                        rc.min_rest_hours.unwrap_or_default()
                    ),
                ));
            }
        }
    }

    out
}

/// Vérifie une affectation complète contre toutes les contraintes dures.
pub fn violations(model: &ConstraintModel, values: &[bool]) -> Vec<UnmetConstraint> {
    let mut out = Vec::new();
    let is_on = |cell: Option<usize>| cell.map_or(false, |v| values.get(v).copied().unwrap_or(false));

    for c in model.constraints() {
        let role = &model.roles()[c.role()].name;
        match c {
            Constraint::Headcount {
                slot,
                vars,
                required,
                ..
            } => {
                let n = vars.iter().filter(|v| values[**v]).count() as u32;
                if n != *required {
                    out.push(UnmetConstraint::new(
                        role,
                        ConstraintKind::Headcount,
                        format!("slot {slot}: {n} staffed, {required} required"),
                    ));
                }
            }
            Constraint::MaxHours {
                lane, max_slots, ..
            } => {
                let lane = &model.lanes()[*lane];
                let load = lane.cells.iter().filter(|c| is_on(**c)).count() as u32;
                if load > *max_slots {
                    out.push(UnmetConstraint::new(
                        role,
                        ConstraintKind::MaxHours,
                        format!("worker {}: {load} slots > {max_slots}", lane.worker),
                    ));
                }
            }
            Constraint::MinRest {
                lane, rest_slots, ..
            } => {
                let lane = &model.lanes()[*lane];
                let mut last_end: Option<usize> = None;
                for (i, cell) in lane.cells.iter().enumerate() {
                    if !is_on(*cell) {
                        continue;
                    }
                    let starts_span = i == 0 || !is_on(lane.cells[i - 1]);
                    if starts_span {
                        if let Some(end) = last_end {
                            let gap = i - end - 1;
                            if gap < *rest_slots {
                                out.push(UnmetConstraint::new(
                                    role,
                                    ConstraintKind::MinRest,
                                    format!(
                                        "worker {}: {gap} slot(s) of rest before slot {i}, {rest_slots} required",
                                        lane.worker
                                    ),
                                ));
                            }
                        }
                    }
                    last_end = Some(i);
                }
            }
        }
    }
    out
}
