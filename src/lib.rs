//! # poolserve
//! src/lib.rs
//!
//! Servidor HTTP/1.1 mínimo de archivos estáticos construido sobre
//! sockets bloqueantes y threads: un accept loop, un pool acotado de
//! workers que se reutilizan y se terminan cuando quedan inactivos, y
//! pools de contextos y buffers para no reservar memoria por conexión.
//!
//! ## Arquitectura
//!
//! El servidor está dividido en módulos especializados:
//! - `http`: codec HTTP/1.1 (parseo incremental y serialización)
//! - `pool`: pool de workers con reaper y pool genérico de objetos
//! - `server`: accept loop, loop de conexión con pipelining y deadlines
//! - `router`: rutas exactas, archivos estáticos y páginas de error
//! - `metrics`: contadores atómicos exportables como JSON
//! - `config`: CLI y variables de entorno
//! - `logging`: `tracing` y el `Logger` por componente
//! - `error`: errores de conexión y de handler
//!
//! ## Ejemplo de uso
//!
//! ```no_run
//! use std::net::TcpListener;
//! use std::sync::Arc;
//! use poolserve::logging::Logger;
//! use poolserve::metrics::ServerMetrics;
//! use poolserve::router::Router;
//! use poolserve::server::{Server, ServerConfig};
//!
//! let logger = Logger::new("server", false);
//! let mut router = Router::new(logger.named("router"));
//! router.load_static("./static", "/").unwrap();
//!
//! let server = Server::new(
//!     router.into_handler(),
//!     ServerConfig::default(),
//!     Arc::new(ServerMetrics::new()),
//!     logger,
//! );
//! server.serve(TcpListener::bind("127.0.0.1:65500").unwrap());
//! ```

pub mod config;
pub mod error;
pub mod http;
pub mod logging;
pub mod metrics;
pub mod pool;
pub mod router;
pub mod server;
