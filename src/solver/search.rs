use super::state::{Store, Value};
use super::types::{CancelFlag, Conflict, Stop};
use crate::constraints::{Constraint, VarId};
use crate::model::ConstraintKind;
use std::collections::BTreeMap;
use std::time::Instant;
use tracing::{debug, trace};

/// Limites d'une composante (un rôle).
#[derive(Debug, Clone, Copy)]
pub(crate) struct Limits {
    pub deadline: Option<Instant>,
    pub max_decisions: Option<u64>,
    pub check_interval: u64,
}

#[derive(Debug)]
pub(crate) struct RoleResult {
    pub stop: Stop,
    /// (objectif, variables à 1) de la meilleure solution trouvée
    pub best: Option<(i64, Vec<VarId>)>,
    pub decisions: u64,
    pub conflicts: BTreeMap<ConstraintKind, u64>,
    pub root_conflict: Option<Conflict>,
}

impl RoleResult {
    pub fn is_infeasible(&self) -> bool {
        self.best.is_none() && self.stop == Stop::Exhausted
    }

    pub fn is_optimal(&self) -> bool {
        self.best.is_some() && matches!(self.stop, Stop::Exhausted | Stop::Bound)
    }
}

struct Frame {
    mark: usize,
    cov: usize,
    var: VarId,
    pristine: bool,
    right_done: bool,
}

/// Branch-and-bound en profondeur sur un rôle, pile explicite.
///
/// Les rôles ne partagent aucune contrainte : chacun est une composante
/// indépendante. Branche gauche `x = 1`, branche droite `x = 0` (ou, pour une
/// personne encore vierge, toutes les vierges à 0 sur ce slot).
pub(crate) struct RoleSearch<'m> {
    store: Store<'m>,
    role: usize,
    stack: Vec<Frame>,
    decisions: u64,
    conflicts: BTreeMap<ConstraintKind, u64>,
}

impl<'m> RoleSearch<'m> {
    pub fn new(store: Store<'m>, role: usize) -> Self {
        Self {
            store,
            role,
            stack: Vec::new(),
            decisions: 0,
            conflicts: BTreeMap::new(),
        }
    }

    pub fn run(mut self, limits: &Limits, cancel: &CancelFlag) -> RoleResult {
        let model = self.store.model();
        let role = self.role;
        let root_bound = model.role_lower_bound(role, 0);

        if let Err(conflict) = self.store.init_role(role) {
            self.tally(conflict);
            return RoleResult {
                stop: Stop::Exhausted,
                best: None,
                decisions: 0,
                conflicts: self.conflicts,
                root_conflict: Some(conflict),
            };
        }

        let interval = limits.check_interval.max(1);
        let mut next_check = interval;
        let mut best: Option<(i64, Vec<VarId>)> = None;

        let stop = loop {
            if self.decisions >= next_check {
                next_check = self.decisions + interval;
                if cancel.is_cancelled() {
                    break Stop::Cancelled;
                }
                if limits.deadline.is_some_and(|d| Instant::now() >= d) {
                    break Stop::Deadline;
                }
            }
            if limits.max_decisions.is_some_and(|cap| self.decisions >= cap) {
                break Stop::DecisionCap;
            }

            let pruned = best.as_ref().is_some_and(|(incumbent, _)| {
                model.role_lower_bound(role, self.store.role_square(role)) >= *incumbent
            });

            let failed = if pruned {
                true
            } else if let Some((cov, var)) = self.select() {
                self.decisions += 1;
                let lane = model.variables()[var].lane;
                self.stack.push(Frame {
                    mark: self.store.mark(),
                    cov,
                    var,
                    pristine: self.store.lane_load(lane) == 0,
                    right_done: false,
                });
                match self
                    .store
                    .fix(var, Value::One, ConstraintKind::Headcount)
                    .and_then(|_| self.store.propagate())
                {
                    Ok(()) => false,
                    Err(conflict) => {
                        self.tally(conflict);
                        true
                    }
                }
            } else {
                let objective = model.role_objective_with(role, |v| self.store.value(v) == Value::One);
                if best.as_ref().map_or(true, |(b, _)| objective < *b) {
                    debug!(
                        role = %model.roles()[role].name,
                        objective,
                        decisions = self.decisions,
                        "improved solution"
                    );
                    best = Some((objective, self.ones()));
                }
                if objective <= root_bound {
                    break Stop::Bound;
                }
                true
            };

            if failed && !self.backtrack() {
                break Stop::Exhausted;
            }
        };

        RoleResult {
            stop,
            best,
            decisions: self.decisions,
            conflicts: self.conflicts,
            root_conflict: None,
        }
    }

    /// Couverture la plus contrainte (marge libre - besoin minimale, puis slot
    /// le plus tôt), puis personne : continuité, vierge, moins chargée.
    fn select(&self) -> Option<(usize, VarId)> {
        let model = self.store.model();
        let mut chosen: Option<(u32, usize)> = None;
        for &cov in &model.roles()[self.role].coverage {
            let need = self.store.cov_need(cov);
            if need == 0 {
                continue;
            }
            let slack = self.store.cov_free(cov) - need;
            if chosen.map_or(true, |(best, _)| slack < best) {
                chosen = Some((slack, cov));
                if slack == 0 {
                    break;
                }
            }
        }
        let (_, cov) = chosen?;

        let Constraint::Headcount { vars, slot, .. } = &model.constraints()[cov]
        else {
            return None;
        };
        let var = vars
            .iter()
            .copied()
            .filter(|v| self.store.value(*v) == Value::Free)
            .min_by_key(|v| {
                let av = model.variables()[*v];
                let load = self.store.lane_load(av.lane);
                let continuing = *slot > 0 && self.store.is_on(av.lane, slot - 1);
                let class = if continuing {
                    0
                } else if load == 0 {
                    1
                } else {
                    2
                };
                (class, load, av.worker)
            });
        debug_assert!(var.is_some(), "coverage {cov} needs staff but has no free variable");
        var.map(|v| (cov, v))
    }

    /// Remonte jusqu'à la prochaine branche droite applicable.
    fn backtrack(&mut self) -> bool {
        while let Some(mut frame) = self.stack.pop() {
            self.store.undo_to(frame.mark);
            if frame.right_done {
                continue;
            }
            frame.right_done = true;
            let (cov, var, pristine) = (frame.cov, frame.var, frame.pristine);
            self.stack.push(frame);
            self.decisions += 1;

            let applied = if pristine {
                self.store.exclude_pristine(cov)
            } else {
                self.store.fix(var, Value::Zero, ConstraintKind::Headcount)
            };
            match applied.and_then(|_| self.store.propagate()) {
                Ok(()) => return true,
                Err(conflict) => self.tally(conflict),
            }
        }
        false
    }

    fn ones(&self) -> Vec<VarId> {
        let model = self.store.model();
        model.lanes()[model.roles()[self.role].lanes.clone()]
            .iter()
            .flat_map(|lane| lane.cells.iter().flatten().copied())
            .filter(|v| self.store.value(*v) == Value::One)
            .collect()
    }

    fn tally(&mut self, conflict: Conflict) {
        trace!(kind = %conflict.kind, decisions = self.decisions, "conflict");
        *self.conflicts.entry(conflict.kind).or_default() += 1;
    }
}
