//! # Pools
//! src/pool/mod.rs
//!
//! - `worker`: pool acotado de threads reutilizables con eliminación de
//!   workers inactivos
//! - `object`: pool de objetos (contextos y buffers) con acquire/release

pub mod object;
pub mod worker;

pub use object::ObjectPool;
pub use worker::{ConnHandler, PoolConfig, PoolStats, WorkerPool};
