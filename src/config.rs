use crate::calendar::CalendarLimits;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Poids de l'objectif (minimisé) : taille du roster, fragmentation, équité.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectiveWeights {
    /// par slot affecté
    pub slots: i64,
    /// par plage de travail (span)
    pub spans: i64,
    /// par unité de Σ charge² (écart à une charge uniforme)
    pub balance: i64,
}

impl Default for ObjectiveWeights {
    fn default() -> Self {
        Self {
            slots: 1,
            spans: 10,
            balance: 1,
        }
    }
}

/// Options du solveur
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SolverConfig {
    pub time_budget: Duration,
    /// Nombre de décisions entre deux contrôles du budget et de l'annulation.
    pub check_interval: u64,
    /// Plafond déterministe de décisions, en plus du budget horaire.
    pub max_decisions: Option<u64>,
    pub weights: ObjectiveWeights,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            time_budget: Duration::from_secs(2),
            check_interval: 256,
            max_decisions: None,
            weights: ObjectiveWeights::default(),
        }
    }
}

/// Configuration du moteur, passée explicitement à la construction.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    pub default_timezone: String,
    pub max_horizon_days: u32,
    pub max_slots: usize,
    pub granularity_minutes: u32,
    /// Plafond de Σ (personnes × slots de la timeline) sur tous les rôles.
    pub max_variables: u64,
    pub solver: SolverConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_timezone: "UTC".to_string(),
            max_horizon_days: 28,
            max_slots: 28 * 24 * 4,
            granularity_minutes: 60,
            max_variables: 500_000,
            solver: SolverConfig::default(),
        }
    }
}

impl EngineConfig {
    pub fn calendar_limits(&self) -> CalendarLimits {
        CalendarLimits {
            max_horizon_days: self.max_horizon_days,
            max_slots: self.max_slots,
        }
    }
}
