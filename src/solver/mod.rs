//! Orchestrateur de résolution : propagation + branch-and-bound sous budget.
//!
//! Chaque rôle est une composante indépendante, résolue dans l'ordre des noms
//! avec une part équitable du temps et des décisions restants. Le budget est
//! contrôlé toutes les `check_interval` décisions, annulation comprise.

mod search;
mod state;
mod types;

pub use types::{CancelFlag, CancelOnDrop, Phase, RawAssignment};

use crate::config::SolverConfig;
use crate::constraints::ConstraintModel;
use crate::model::{ConstraintKind, SolverOutcome, SolverStatus, UnmetConstraint};
use search::{Limits, RoleResult, RoleSearch};
use state::Store;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};
use types::Stop;

/// Résultat complet : métadonnées + affectation gagnante (interne au cœur).
#[derive(Debug, Clone)]
pub struct Solution {
    pub outcome: SolverOutcome,
    pub assignment: RawAssignment,
}

#[derive(Debug, Clone, Copy)]
pub struct Solver {
    config: SolverConfig,
}

impl Solver {
    pub fn new(config: SolverConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    /// Résout avec le budget configuré, sans annulation externe.
    pub fn solve(&self, model: &ConstraintModel) -> Solution {
        self.solve_with(model, self.config.time_budget, &CancelFlag::default())
    }

    pub fn solve_with(
        &self,
        model: &ConstraintModel,
        time_budget: Duration,
        cancel: &CancelFlag,
    ) -> Solution {
        let started = Instant::now();
        let mut phase = Phase::Built;
        transition(&mut phase, Phase::Searching);

        let roles = model.roles().len();
        let mut decisions_left = self.config.max_decisions;
        let mut results: Vec<RoleResult> = Vec::with_capacity(roles);

        for role in 0..roles {
            let pending = (roles - role) as u32;
            if cancel.is_cancelled() {
                results.push(skipped(Stop::Cancelled));
                continue;
            }
            let share = time_budget.saturating_sub(started.elapsed()) / pending;
            let limits = Limits {
                // budget hors de portée d'un Instant : pas d'échéance
                deadline: Instant::now().checked_add(share),
                max_decisions: decisions_left.map(|d| d / u64::from(pending)),
                check_interval: self.config.check_interval,
            };

            let result = RoleSearch::new(Store::new(model), role).run(&limits, cancel);
            debug!(
                role = %model.roles()[role].name,
                stop = ?result.stop,
                decisions = result.decisions,
                objective = ?result.best.as_ref().map(|(o, _)| *o),
                "role searched"
            );
            if let Some(left) = decisions_left.as_mut() {
                *left = left.saturating_sub(result.decisions);
            }
            let infeasible = result.is_infeasible();
            results.push(result);
            if infeasible {
                break;
            }
        }

        let solution = combine(model, &results, started.elapsed());
        transition(&mut phase, phase_of(solution.outcome.status));
        info!(
            status = %solution.outcome.status,
            objective = ?solution.outcome.objective_value,
            decisions = solution.outcome.decisions,
            assigned = solution.assignment.assigned(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "solve finished"
        );
        solution
    }
}

fn transition(phase: &mut Phase, next: Phase) {
    let legal = matches!(
        (*phase, next),
        (Phase::Built, Phase::Searching)
            | (
                Phase::Searching,
                Phase::Optimal | Phase::Feasible | Phase::Infeasible | Phase::TimedOut
            )
    );
    assert!(legal, "illegal solver transition {phase:?} -> {next:?}");
    debug!(from = ?*phase, to = ?next, "solver phase");
    *phase = next;
}

fn phase_of(status: SolverStatus) -> Phase {
    match status {
        SolverStatus::Optimal => Phase::Optimal,
        SolverStatus::Feasible => Phase::Feasible,
        SolverStatus::Infeasible => Phase::Infeasible,
        SolverStatus::TimedOut => Phase::TimedOut,
    }
}

fn skipped(stop: Stop) -> RoleResult {
    RoleResult {
        stop,
        best: None,
        decisions: 0,
        conflicts: Default::default(),
        root_conflict: None,
    }
}

fn combine(model: &ConstraintModel, results: &[RoleResult], elapsed: Duration) -> Solution {
    let decisions = results.iter().map(|r| r.decisions).sum();
    let mut outcome = SolverOutcome {
        status: SolverStatus::Optimal,
        objective_value: None,
        unmet_constraints: Vec::new(),
        elapsed_seconds: elapsed.as_secs_f64(),
        decisions,
        notes: Vec::new(),
    };
    let mut assignment = RawAssignment::empty(model.variables().len());

    // l'infaisabilité prouvée n'est jamais dégradée en roster partiel
    let infeasible: Vec<(usize, &RoleResult)> = results
        .iter()
        .enumerate()
        .filter(|(_, r)| r.is_infeasible())
        .collect();
    if !infeasible.is_empty() {
        outcome.status = SolverStatus::Infeasible;
        for (role, result) in infeasible {
            outcome
                .unmet_constraints
                .extend(diagnose(&model.roles()[role].name, result));
        }
        warn!(unmet = outcome.unmet_constraints.len(), "roster proven infeasible");
        return Solution {
            outcome,
            assignment,
        };
    }

    let mut objective = None;
    for (role, result) in results.iter().enumerate() {
        let name = &model.roles()[role].name;
        match &result.best {
            Some((value, ones)) => {
                objective = Some(objective.unwrap_or(0) + value);
                for &v in ones {
                    assignment.set(v, true);
                }
            }
            None => outcome
                .notes
                .push(format!("role {name}: no feasible assignment found before the search stopped")),
        }
        match result.stop {
            Stop::Deadline => outcome
                .notes
                .push(format!("role {name}: time budget exhausted after {} decisions", result.decisions)),
            Stop::DecisionCap => outcome
                .notes
                .push(format!("role {name}: decision limit reached after {} decisions", result.decisions)),
            Stop::Cancelled => outcome.notes.push(format!("role {name}: search cancelled")),
            Stop::Exhausted | Stop::Bound => {}
        }
    }
    outcome.objective_value = objective;

    let budget_hit = results
        .iter()
        .any(|r| matches!(r.stop, Stop::Deadline | Stop::DecisionCap));
    let all_found = results.len() == model.roles().len() && results.iter().all(|r| r.best.is_some());
    outcome.status = if results.iter().all(RoleResult::is_optimal) && all_found {
        SolverStatus::Optimal
    } else if budget_hit || !all_found {
        SolverStatus::TimedOut
    } else {
        SolverStatus::Feasible
    };

    Solution {
        outcome,
        assignment,
    }
}

/// Contraintes responsables des échecs d'un rôle prouvé infaisable.
fn diagnose(role: &str, result: &RoleResult) -> Vec<UnmetConstraint> {
    if let Some(conflict) = result.root_conflict {
        return vec![UnmetConstraint::new(
            role,
            conflict.kind,
            format!("{} constraint fails before any branching", conflict.kind),
        )];
    }
    let mut tallies: Vec<(ConstraintKind, u64)> =
        result.conflicts.iter().map(|(k, n)| (*k, *n)).collect();
    tallies.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
    if tallies.is_empty() {
        tallies.push((ConstraintKind::Headcount, 0));
    }
    tallies
        .into_iter()
        .map(|(kind, n)| {
            UnmetConstraint::new(
                role,
                kind,
                format!("exhaustive search: no assignment satisfies the {kind} constraint(s) ({n} conflicts)"),
            )
        })
        .collect()
}
