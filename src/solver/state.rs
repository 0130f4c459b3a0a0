use super::types::Conflict;
use crate::constraints::{Constraint, ConstraintModel, VarId};
use crate::model::ConstraintKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Value {
    Free,
    Zero,
    One,
}

/// Domaines courants + trail pour le retour arrière, compteurs incrémentaux
/// par couverture, par lane et par rôle.
pub(crate) struct Store<'m> {
    model: &'m ConstraintModel,
    values: Vec<Value>,
    trail: Vec<VarId>,
    queue: Vec<VarId>,
    cov_of_var: Vec<usize>,
    cov_ones: Vec<u32>,
    cov_free: Vec<u32>,
    lane_load: Vec<u32>,
    lane_max: Vec<Option<u32>>,
    lane_rest: Vec<usize>,
    role_square: Vec<i64>,
}

impl<'m> Store<'m> {
    pub fn new(model: &'m ConstraintModel) -> Self {
        let n = model.variables().len();
        let nc = model.constraints().len();
        let nl = model.lanes().len();
        let mut cov_of_var = vec![usize::MAX; n];
        let mut cov_free = vec![0u32; nc];
        let mut lane_max = vec![None; nl];
        let mut lane_rest = vec![0usize; nl];

        for (i, c) in model.constraints().iter().enumerate() {
            match c {
                Constraint::Headcount { vars, .. } => {
                    for v in vars {
                        cov_of_var[*v] = i;
                    }
                    cov_free[i] = vars.len() as u32;
                }
                Constraint::MaxHours {
                    lane, max_slots, ..
                } => lane_max[*lane] = Some(*max_slots),
                Constraint::MinRest {
                    lane, rest_slots, ..
                } => lane_rest[*lane] = *rest_slots,
            }
        }

        Self {
            model,
            values: vec![Value::Free; n],
            trail: Vec::with_capacity(n),
            queue: Vec::new(),
            cov_of_var,
            cov_ones: vec![0; nc],
            cov_free,
            lane_load: vec![0; nl],
            lane_max,
            lane_rest,
            role_square: vec![0; model.roles().len()],
        }
    }

    pub fn model(&self) -> &'m ConstraintModel {
        self.model
    }

    pub fn value(&self, var: VarId) -> Value {
        self.values[var]
    }

    pub fn mark(&self) -> usize {
        self.trail.len()
    }

    pub fn lane_load(&self, lane: usize) -> u32 {
        self.lane_load[lane]
    }

    pub fn role_square(&self, role: usize) -> i64 {
        self.role_square[role]
    }

    /// Personnes encore requises sur une couverture.
    pub fn cov_need(&self, cov: usize) -> u32 {
        let (_, required) = coverage(self.model, cov);
        required.saturating_sub(self.cov_ones[cov])
    }

    pub fn cov_free(&self, cov: usize) -> u32 {
        self.cov_free[cov]
    }

    pub fn is_on(&self, lane: usize, slot: usize) -> bool {
        match self.model.lanes()[lane].cells.get(slot) {
            Some(Some(v)) => self.values[*v] == Value::One,
            _ => false,
        }
    }

    /// Hors horizon, sans variable ou fixé à zéro.
    fn is_off(&self, lane: usize, slot: usize) -> bool {
        match self.model.lanes()[lane].cells.get(slot) {
            Some(Some(v)) => self.values[*v] == Value::Zero,
            _ => true,
        }
    }

    pub fn undo_to(&mut self, mark: usize) {
        while self.trail.len() > mark {
            let Some(v) = self.trail.pop() else { break };
            let cov = self.cov_of_var[v];
            if self.values[v] == Value::One {
                let lane = self.model.variables()[v].lane;
                self.cov_ones[cov] -= 1;
                self.lane_load[lane] -= 1;
                let load = i64::from(self.lane_load[lane]);
                self.role_square[self.model.lanes()[lane].role] -= 2 * load + 1;
            }
            self.cov_free[cov] += 1;
            self.values[v] = Value::Free;
        }
        self.queue.clear();
    }

    /// Fixe une variable ; la propagation est différée à `propagate`.
    pub fn fix(&mut self, var: VarId, value: Value, cause: ConstraintKind) -> Result<(), Conflict> {
        debug_assert!(value != Value::Free);
        match self.values[var] {
            Value::Free => {}
            current if current == value => return Ok(()),
            _ => return Err(Conflict::new(cause)),
        }
        let cov = self.cov_of_var[var];
        self.values[var] = value;
        self.trail.push(var);
        self.cov_free[cov] -= 1;
        if value == Value::One {
            let lane = self.model.variables()[var].lane;
            let load = i64::from(self.lane_load[lane]);
            self.cov_ones[cov] += 1;
            self.lane_load[lane] += 1;
            self.role_square[self.model.lanes()[lane].role] += 2 * load + 1;
        }
        self.queue.push(var);
        Ok(())
    }

    pub fn propagate(&mut self) -> Result<(), Conflict> {
        while let Some(v) = self.queue.pop() {
            if let Err(conflict) = self.propagate_var(v) {
                self.queue.clear();
                return Err(conflict);
            }
        }
        Ok(())
    }

    /// Propagation initiale des couvertures d'un rôle (ex. effectif == vivier).
    pub fn init_role(&mut self, role: usize) -> Result<(), Conflict> {
        let model = self.model;
        for &cov in &model.roles()[role].coverage {
            self.check_coverage(cov)?;
        }
        self.propagate()
    }

    /// Branche droite symétrique : aucune personne encore vierge du rôle ne
    /// couvre ce slot (elles sont interchangeables).
    pub fn exclude_pristine(&mut self, cov: usize) -> Result<(), Conflict> {
        let model = self.model;
        let (vars, _) = coverage(model, cov);
        for &v in vars {
            if self.values[v] == Value::Free && self.lane_load[model.variables()[v].lane] == 0 {
                self.fix(v, Value::Zero, ConstraintKind::Headcount)?;
            }
        }
        Ok(())
    }

    fn propagate_var(&mut self, var: VarId) -> Result<(), Conflict> {
        let model = self.model;
        let av = model.variables()[var];
        self.check_coverage(self.cov_of_var[var])?;

        let lane = av.lane;
        let k = av.slot;
        let rest = self.lane_rest[lane];

        if self.values[var] == Value::One {
            if let Some(max) = self.lane_max[lane] {
                let load = self.lane_load[lane];
                if load > max {
                    return Err(Conflict::new(ConstraintKind::MaxHours));
                }
                if load == max {
                    for &cell in model.lanes()[lane].cells.iter().flatten() {
                        if self.values[cell] == Value::Free {
                            self.fix(cell, Value::Zero, ConstraintKind::MaxHours)?;
                        }
                    }
                }
            }
            if rest >= 2 {
                // fin de plage en k : repos sur [k+2, k+rest]
                if self.is_off(lane, k + 1) {
                    self.forbid(lane, k + 2, k + rest)?;
                }
                // début de plage en k : aucune fin sur [k-rest, k-2]
                if k >= 2 && self.is_off(lane, k - 1) {
                    self.forbid(lane, k.saturating_sub(rest), k - 2)?;
                }
            }
        } else if rest >= 2 {
            if k >= 1 && self.is_on(lane, k - 1) {
                self.forbid(lane, k + 1, k - 1 + rest)?;
            }
            if k >= 1 && self.is_on(lane, k + 1) {
                self.forbid(lane, (k + 1).saturating_sub(rest), k - 1)?;
            }
        }
        Ok(())
    }

    fn forbid(&mut self, lane: usize, from: usize, to: usize) -> Result<(), Conflict> {
        let model = self.model;
        let cells = &model.lanes()[lane].cells;
        let to = to.min(cells.len().saturating_sub(1));
        for slot in from..=to {
            if let Some(v) = cells.get(slot).copied().flatten() {
                self.fix(v, Value::Zero, ConstraintKind::MinRest)?;
            }
        }
        Ok(())
    }

    fn check_coverage(&mut self, cov: usize) -> Result<(), Conflict> {
        let model = self.model;
        let (vars, required) = coverage(model, cov);
        let ones = self.cov_ones[cov];
        let free = self.cov_free[cov];
        if ones > required || required - ones > free {
            return Err(Conflict::new(ConstraintKind::Headcount));
        }
        let need = required - ones;
        if free == 0 || (need != 0 && need != free) {
            return Ok(());
        }
        let fill = if need == 0 { Value::Zero } else { Value::One };
        for &v in vars {
            if self.values[v] == Value::Free {
                self.fix(v, fill, ConstraintKind::Headcount)?;
            }
        }
        Ok(())
    }
}

fn coverage(model: &ConstraintModel, cov: usize) -> (&[VarId], u32) {
    match &model.constraints()[cov] {
        Constraint::Headcount { vars, required, .. } => (vars, *required),
        other => unreachable!("constraint {cov} is not a coverage constraint: {other:?}"),
    }
}
