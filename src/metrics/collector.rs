//! # Collector de Métricas
//! src/metrics/collector.rs
//!
//! Contadores del servidor actualizados desde el accept loop y desde los
//! workers. Todo es atómico: registrar una métrica nunca toma un lock.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::OnceLock;
use std::time::Instant;

use serde::Serialize;

use crate::pool::PoolStats;

/// Fuente de estadísticas del pool; `None` cuando el pool ya no existe
pub type PoolStatsSource = Box<dyn Fn() -> Option<PoolStats> + Send + Sync>;

/// Collector de métricas thread-safe
pub struct ServerMetrics {
    start_time: Instant,

    /// Conexiones aceptadas por el listener
    accepted: AtomicU64,

    /// Conexiones rechazadas con 503 por pool saturado
    rejected: AtomicU64,

    /// Conexiones siendo atendidas ahora mismo
    active_connections: AtomicU64,

    /// Respuestas escritas con éxito
    requests: AtomicU64,

    /// Handlers que devolvieron error (respondidos con 503)
    handler_errors: AtomicU64,

    /// Requests malformados (conexión cerrada sin respuesta)
    protocol_errors: AtomicU64,

    /// Ocupación del pool de workers, si hay un servidor asociado
    pool_source: OnceLock<PoolStatsSource>,
}

/// Snapshot de métricas (para uso externo)
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub uptime_seconds: u64,
    pub connections: ConnectionCounters,
    pub requests: RequestCounters,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workers: Option<WorkerCounters>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConnectionCounters {
    pub accepted: u64,
    pub rejected: u64,
    pub active: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WorkerCounters {
    pub concurrency: usize,
    pub live: usize,
    pub idle: usize,
    pub busy: usize,
}

impl From<PoolStats> for WorkerCounters {
    fn from(stats: PoolStats) -> Self {
        Self {
            concurrency: stats.concurrency,
            live: stats.workers,
            idle: stats.idle,
            busy: stats.busy(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RequestCounters {
    pub served: u64,
    pub handler_errors: u64,
    pub protocol_errors: u64,
}

impl ServerMetrics {
    /// Crea un nuevo collector de métricas
    pub fn new() -> Self {
        Self {
            start_time: Instant::now(),
            accepted: AtomicU64::new(0),
            rejected: AtomicU64::new(0),
            active_connections: AtomicU64::new(0),
            requests: AtomicU64::new(0),
            handler_errors: AtomicU64::new(0),
            protocol_errors: AtomicU64::new(0),
            pool_source: OnceLock::new(),
        }
    }

    /// Asocia el pool de workers cuyas estadísticas entran en el snapshot
    ///
    /// Solo el primer pool asociado cuenta; retorna `false` si ya había uno.
    pub fn attach_pool<F>(&self, source: F) -> bool
    where
        F: Fn() -> Option<PoolStats> + Send + Sync + 'static,
    {
        self.pool_source.set(Box::new(source)).is_ok()
    }

    pub fn record_accepted(&self) {
        self.accepted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_rejected(&self) {
        self.rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_request(&self) {
        self.requests.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_handler_error(&self) {
        self.handler_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_protocol_error(&self) {
        self.protocol_errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Incrementa el contador de conexiones activas
    pub fn increment_active_connections(&self) {
        self.active_connections.fetch_add(1, Ordering::Relaxed);
    }

    /// Decrementa el contador de conexiones activas (nunca baja de 0)
    pub fn decrement_active_connections(&self) {
        let _ = self
            .active_connections
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |n| n.checked_sub(1));
    }

    pub fn active_connections(&self) -> u64 {
        self.active_connections.load(Ordering::Relaxed)
    }

    /// Obtiene un snapshot de las métricas
    pub fn get_snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            uptime_seconds: self.start_time.elapsed().as_secs(),
            connections: ConnectionCounters {
                accepted: self.accepted.load(Ordering::Relaxed),
                rejected: self.rejected.load(Ordering::Relaxed),
                active: self.active_connections(),
            },
            requests: RequestCounters {
                served: self.requests.load(Ordering::Relaxed),
                handler_errors: self.handler_errors.load(Ordering::Relaxed),
                protocol_errors: self.protocol_errors.load(Ordering::Relaxed),
            },
            workers: self
                .pool_source
                .get()
                .and_then(|source| source())
                .map(WorkerCounters::from),
        }
    }

    /// Obtiene las métricas actuales en formato JSON
    pub fn get_metrics_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&self.get_snapshot())
    }
}

impl Default for ServerMetrics {
    fn default() -> Self {
        Self::new()
    }
}
