use crate::constraints::VarId;
use crate::model::ConstraintKind;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Drapeau d'annulation partagé avec l'appelant (déconnexion client, arrêt).
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Annule le drapeau au drop, sauf si désarmé.
#[derive(Debug)]
pub struct CancelOnDrop(Option<CancelFlag>);

impl CancelOnDrop {
    pub fn new(flag: CancelFlag) -> Self {
        Self(Some(flag))
    }
    pub fn disarm(mut self) {
        self.0 = None;
    }
}

impl Drop for CancelOnDrop {
    fn drop(&mut self) {
        if let Some(flag) = self.0.take() {
            flag.cancel();
        }
    }
}

/// Affectation brute gagnante : une valeur par variable du modèle.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RawAssignment {
    values: Vec<bool>,
}

impl RawAssignment {
    pub fn empty(variables: usize) -> Self {
        Self {
            values: vec![false; variables],
        }
    }
    pub fn get(&self, var: VarId) -> bool {
        self.values.get(var).copied().unwrap_or(false)
    }
    pub fn set(&mut self, var: VarId, on: bool) {
        self.values[var] = on;
    }
    pub fn values(&self) -> &[bool] {
        &self.values
    }
    pub fn len(&self) -> usize {
        self.values.len()
    }
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
    pub fn assigned(&self) -> usize {
        self.values.iter().filter(|v| **v).count()
    }
}

/// Cycle de vie d'une résolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Built,
    Searching,
    Optimal,
    Feasible,
    Infeasible,
    TimedOut,
}

/// Raison de fin de recherche d'une composante.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Stop {
    /// arbre entièrement exploré
    Exhausted,
    /// solution égale à la borne inférieure
    Bound,
    Deadline,
    DecisionCap,
    Cancelled,
}

/// Échec de propagation, attribué à une famille de contraintes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Conflict {
    pub kind: ConstraintKind,
}

impl Conflict {
    pub fn new(kind: ConstraintKind) -> Self {
        Self { kind }
    }
}
