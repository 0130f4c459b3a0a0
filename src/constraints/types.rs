use crate::model::ConstraintKind;
use std::ops::Range;

pub type VarId = usize;

/// Variable booléenne : la personne `worker` du rôle `role` travaille pendant `slot`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AssignmentVariable {
    pub role: usize,
    pub worker: u32,
    pub slot: usize,
    pub lane: usize,
}

/// Ligne de temps d'une personne : une cellule par slot de la timeline,
/// `None` là où aucune variable n'existe (slot calme ou hors sous-fenêtre).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lane {
    pub role: usize,
    pub worker: u32,
    pub cells: Vec<Option<VarId>>,
}

/// Contraintes dures, ensemble fermé.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Constraint {
    /// Σ vars == required
    Headcount {
        role: usize,
        slot: usize,
        vars: Vec<VarId>,
        required: u32,
    },
    /// Σ lane ≤ max_slots
    MaxHours {
        role: usize,
        lane: usize,
        max_slots: u32,
    },
    /// Deux plages d'une même lane séparées d'au moins `rest_slots` slots.
    MinRest {
        role: usize,
        lane: usize,
        rest_slots: usize,
    },
}

impl Constraint {
    pub fn kind(&self) -> ConstraintKind {
        match self {
            Constraint::Headcount { .. } => ConstraintKind::Headcount,
            Constraint::MaxHours { .. } => ConstraintKind::MaxHours,
            Constraint::MinRest { .. } => ConstraintKind::MinRest,
        }
    }

    pub fn role(&self) -> usize {
        match self {
            Constraint::Headcount { role, .. }
            | Constraint::MaxHours { role, .. }
            | Constraint::MinRest { role, .. } => *role,
        }
    }
}

/// Planchers de l'objectif pour un rôle, calculés à la construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RoleBounds {
    /// slots-personne à affecter (constant : couverture exacte)
    pub units: i64,
    pub min_spans: i64,
    /// Σ charge² minimale (répartition parfaitement uniforme)
    pub min_square_load: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RoleModel {
    pub name: String,
    pub headcount: u32,
    pub pool_size: u32,
    pub max_slots: Option<u32>,
    pub rest_slots: Option<usize>,
    pub active_slots: Vec<usize>,
    pub lanes: Range<usize>,
    /// Indices des contraintes `Headcount` du rôle, par slot croissant.
    pub coverage: Vec<usize>,
    pub bounds: RoleBounds,
}

impl RoleModel {
    /// Suites maximales de slots actifs consécutifs.
    pub fn segments(&self) -> Vec<Range<usize>> {
        let mut out: Vec<Range<usize>> = Vec::new();
        for &s in &self.active_slots {
            match out.last_mut() {
                Some(last) if last.end == s => last.end = s + 1,
                _ => out.push(s..s + 1),
            }
        }
        out
    }
}
