//! Exécution concurrente des résolutions hors de l'exécuteur async.
//!
//! La recherche est purement CPU : chaque requête part sur
//! `tokio::task::spawn_blocking`, le nombre de résolutions simultanées est
//! borné par un sémaphore. Abandonner le futur renvoyé annule la recherche
//! associée au prochain contrôle de budget.

use crate::config::EngineConfig;
use crate::engine::Engine;
use crate::error::ScheduleError;
use crate::model::{ProposalRequest, ProposalResponse};
use crate::solver::{CancelFlag, CancelOnDrop};
use anyhow::anyhow;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{debug, info_span};
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct SolverPool {
    engine: Arc<Engine>,
    permits: Arc<Semaphore>,
    workers: usize,
}

impl SolverPool {
    /// Une résolution simultanée par cœur disponible.
    pub fn new(config: EngineConfig) -> Self {
        let workers = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        Self::with_workers(config, workers)
    }

    pub fn with_workers(config: EngineConfig, workers: usize) -> Self {
        let workers = workers.max(1);
        Self {
            engine: Arc::new(Engine::new(config)),
            permits: Arc::new(Semaphore::new(workers)),
            workers,
        }
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    pub async fn propose(&self, request: ProposalRequest) -> Result<ProposalResponse, ScheduleError> {
        self.propose_cancellable(request, CancelFlag::new()).await
    }

    pub async fn propose_cancellable(
        &self,
        request: ProposalRequest,
        cancel: CancelFlag,
    ) -> Result<ProposalResponse, ScheduleError> {
        let job = Uuid::new_v4();
        let guard = CancelOnDrop::new(cancel.clone());

        let permit = Arc::clone(&self.permits)
            .acquire_owned()
            .await
            .map_err(|e| anyhow!("solver pool closed: {e}"))?;
        debug!(%job, available = self.permits.available_permits(), "permit acquired");

        let engine = Arc::clone(&self.engine);
        let span = info_span!("job", %job);
        let result = tokio::task::spawn_blocking(move || {
            let _enter = span.enter();
            let _permit = permit;
            engine.propose_with_cancel(&request, &cancel)
        })
        .await
        .map_err(|e| anyhow!("solver job {job} failed: {e}"))?;

        guard.disarm();
        result
    }
}
