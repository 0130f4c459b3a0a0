//! Traduction des contraintes par rôle et de la timeline en modèle formel :
//! variables booléennes (rôle, personne, slot), contraintes dures et planchers
//! de l'objectif.

mod check;
mod types;

pub use check::violations;
pub use types::{AssignmentVariable, Constraint, Lane, RoleBounds, RoleModel, VarId};

use crate::calendar::Timeline;
use crate::config::ObjectiveWeights;
use crate::error::{ConfigurationError, ModelBuildError};
use crate::model::RoleConstraint;
use std::collections::BTreeSet;
use tracing::{debug, info};

/// Modèle prêt pour le solveur ; lecture seule une fois la recherche lancée.
#[derive(Debug, Clone)]
pub struct ConstraintModel {
    timeline: Timeline,
    roles: Vec<RoleModel>,
    variables: Vec<AssignmentVariable>,
    lanes: Vec<Lane>,
    constraints: Vec<Constraint>,
    weights: ObjectiveWeights,
}

impl ConstraintModel {
    pub fn timeline(&self) -> &Timeline {
        &self.timeline
    }
    /// Rôles triés par nom (ordre de départage déterministe).
    pub fn roles(&self) -> &[RoleModel] {
        &self.roles
    }
    pub fn variables(&self) -> &[AssignmentVariable] {
        &self.variables
    }
    pub fn lanes(&self) -> &[Lane] {
        &self.lanes
    }
    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }
    pub fn weights(&self) -> ObjectiveWeights {
        self.weights
    }

    pub fn role_index(&self, name: &str) -> Option<usize> {
        self.roles.iter().position(|r| r.name == name)
    }

    /// Borne inférieure de l'objectif d'un rôle sachant Σ charge² courante.
    pub fn role_lower_bound(&self, role: usize, square_load: i64) -> i64 {
        let b = self.roles[role].bounds;
        self.weights.slots * b.units
            + self.weights.spans * b.min_spans
            + self.weights.balance * square_load.max(b.min_square_load)
    }

    /// Valeur de l'objectif d'un rôle pour une affectation complète.
    pub fn role_objective(&self, role: usize, values: &[bool]) -> i64 {
        self.role_objective_with(role, |v| values[v])
    }

    pub fn role_objective_with<F: Fn(VarId) -> bool>(&self, role: usize, is_on: F) -> i64 {
        let mut units = 0i64;
        let mut spans = 0i64;
        let mut square = 0i64;
        for lane in &self.lanes[self.roles[role].lanes.clone()] {
            let mut load = 0i64;
            let mut prev_on = false;
            for cell in &lane.cells {
                let on = cell.map_or(false, |v| is_on(v));
                if on {
                    load += 1;
                    if !prev_on {
                        spans += 1;
                    }
                }
                prev_on = on;
            }
            units += load;
            square += load * load;
        }
        self.weights.slots * units + self.weights.spans * spans + self.weights.balance * square
    }

    pub fn objective(&self, values: &[bool]) -> i64 {
        (0..self.roles.len())
            .map(|r| self.role_objective(r, values))
            .sum()
    }
}

/// Constructeur du modèle ; les poids de l'objectif sont fixés à la construction.
#[derive(Debug, Clone, Copy)]
pub struct ModelBuilder {
    weights: ObjectiveWeights,
    max_variables: u64,
}

impl Default for ModelBuilder {
    fn default() -> Self {
        Self::new(ObjectiveWeights::default())
    }
}

impl ModelBuilder {
    pub fn new(weights: ObjectiveWeights) -> Self {
        Self {
            weights,
            max_variables: 500_000,
        }
    }

    /// Plafond de Σ (personnes × slots de la timeline), au-delà duquel le
    /// modèle est refusé avant toute allocation.
    pub fn with_max_variables(mut self, max_variables: u64) -> Self {
        self.max_variables = max_variables;
        self
    }

    pub fn build(
        &self,
        role_constraints: &[RoleConstraint],
        timeline: &Timeline,
    ) -> Result<ConstraintModel, ModelBuildError> {
        let mut seen = BTreeSet::new();
        for rc in role_constraints {
            check::validate(rc)?;
            if !seen.insert(rc.role.as_str()) {
                return Err(ModelBuildError::DuplicateRole(rc.role.clone()));
            }
        }

        let mut sorted: Vec<&RoleConstraint> = role_constraints.iter().collect();
        sorted.sort_by(|a, b| a.role.cmp(&b.role));

        let mut roles = Vec::with_capacity(sorted.len());
        let mut unmet = Vec::new();
        for rc in &sorted {
            let role = plan_role(rc, timeline, self.max_variables)?;
            unmet.extend(check::structural(&role, rc, timeline));
            roles.push(role);
        }
        if !unmet.is_empty() {
            debug!(unmet = unmet.len(), "structurally unsatisfiable constraints");
            return Err(ModelBuildError::Unsatisfiable(unmet));
        }

        let variables_needed = roles
            .iter()
            .map(|r| u64::from(r.pool_size).saturating_mul(timeline.len() as u64))
            .fold(0u64, u64::saturating_add);
        if variables_needed > self.max_variables {
            return Err(ConfigurationError::TooManyVariables {
                variables: variables_needed,
                max_variables: self.max_variables,
            }
            .into());
        }

        let mut variables = Vec::new();
        let mut lanes = Vec::new();
        let mut constraints = Vec::new();

        for (r, role) in roles.iter_mut().enumerate() {
            let first_lane = lanes.len();
            for worker in 0..role.pool_size {
                lanes.push(Lane {
                    role: r,
                    worker,
                    cells: vec![None; timeline.len()],
                });
            }
            role.lanes = first_lane..lanes.len();

            for &slot in &role.active_slots {
                let mut vars = Vec::with_capacity(role.pool_size as usize);
                for lane in role.lanes.clone() {
                    let id = variables.len();
                    variables.push(AssignmentVariable {
                        role: r,
                        worker: lanes[lane].worker,
                        slot,
                        lane,
                    });
                    lanes[lane].cells[slot] = Some(id);
                    vars.push(id);
                }
                role.coverage.push(constraints.len());
                constraints.push(Constraint::Headcount {
                    role: r,
                    slot,
                    vars,
                    required: role.headcount,
                });
            }

            for lane in role.lanes.clone() {
                if let Some(max_slots) = role.max_slots {
                    constraints.push(Constraint::MaxHours {
                        role: r,
                        lane,
                        max_slots,
                    });
                }
                if let Some(rest_slots) = role.rest_slots {
                    constraints.push(Constraint::MinRest {
                        role: r,
                        lane,
                        rest_slots,
                    });
                }
            }

            role.bounds = bounds_for(role);
            debug!(
                role = %role.name,
                pool = role.pool_size,
                active = role.active_slots.len(),
                max_slots = ?role.max_slots,
                rest_slots = ?role.rest_slots,
                "role modelled"
            );
        }

        info!(
            roles = roles.len(),
            variables = variables.len(),
            constraints = constraints.len(),
            "constraint model built"
        );

        Ok(ConstraintModel {
            timeline: timeline.clone(),
            roles,
            variables,
            lanes,
            constraints,
            weights: self.weights,
        })
    }
}

fn plan_role(
    rc: &RoleConstraint,
    timeline: &Timeline,
    max_variables: u64,
) -> Result<RoleModel, ModelBuildError> {
    let g = f64::from(timeline.granularity_minutes());
    let active_slots: Vec<usize> = timeline
        .slots()
        .iter()
        .filter(|s| !s.quiet)
        .filter(|s| rc.active.as_ref().map_or(true, |w| w.overlaps(s.start, s.end)))
        .map(|s| s.index)
        .collect();

    let max_slots = rc
        .max_hours
        .map(|h| ((h * 60.0) / g + 1e-9).floor() as u32);
    // trou minimal (en slots) entre deux plages ; un seul slot de trou suffit
    // toujours quand le repos tient dans un slot
    let rest_slots = rc
        .min_rest_hours
        .map(|h| ((h * 60.0) / g - 1e-9).ceil().max(0.0) as usize)
        .filter(|r| *r >= 2);

    let pool_size = match rc.pool_size {
        Some(size) => size,
        None => {
            let stints = match max_slots {
                Some(m) if m > 0 => (active_slots.len() as u32).div_ceil(m).max(1),
                _ => 1,
            };
            let relief = u32::from(rest_slots.is_some());
            rc.headcount
                .checked_mul(stints + relief)
                .ok_or(ConfigurationError::TooManyVariables {
                    variables: u64::from(rc.headcount)
                        .saturating_mul(u64::from(stints + relief))
                        .saturating_mul(timeline.len() as u64),
                    max_variables,
                })?
        }
    };

    Ok(RoleModel {
        name: rc.role.clone(),
        headcount: rc.headcount,
        pool_size,
        max_slots,
        rest_slots,
        active_slots,
        lanes: 0..0,
        coverage: Vec::new(),
        bounds: RoleBounds::default(),
    })
}

fn bounds_for(role: &RoleModel) -> RoleBounds {
    let h = i64::from(role.headcount);
    let units = h * role.active_slots.len() as i64;
    let min_spans = role
        .segments()
        .iter()
        .map(|seg| {
            let len = seg.len() as i64;
            let longest = role.max_slots.map_or(len, |m| i64::from(m).min(len)).max(1);
            h.max((h * len + longest - 1) / longest)
        })
        .sum();
    let pool = i64::from(role.pool_size).max(1);
    RoleBounds {
        units,
        min_spans,
        min_square_load: (units * units + pool - 1) / pool,
    }
}
