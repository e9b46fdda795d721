//! # Sistema de Métricas
//! src/metrics/mod.rs
//!
//! Contadores de conexiones (aceptadas, rechazadas, activas) y de
//! requests (servidos, errores del handler, errores de protocolo).

pub mod collector;

pub use collector::{MetricsSnapshot, PoolStatsSource, ServerMetrics, WorkerCounters};
