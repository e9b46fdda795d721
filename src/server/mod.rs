//! # Módulo del Servidor HTTP
//! src/server/mod.rs
//!
//! Este módulo implementa el servidor TCP que:
//! 1. Acepta conexiones y las entrega al pool de workers
//! 2. Rechaza con 503 cuando el pool está lleno
//! 3. Atiende requests en pipeline sobre cada conexión
//! 4. Cierra la conexión ante cualquier error de parseo, timeout o handler

pub mod context;
pub mod reader;
pub mod tcp;

// Re-exportar para facilitar el uso
pub use context::RequestCtx;
pub use reader::{ConnReader, ReadBuffer};
pub use tcp::{run, HandlerFunc, Server, ServerConfig};
