//! # Errores del servidor
//! src/error.rs
//!
//! Taxonomía de errores de una conexión. Ninguno de ellos sale del loop
//! de la conexión: el accept loop y las demás conexiones no se enteran.

use std::io;

use thiserror::Error;

use crate::http::ParseError;

/// Error devuelto por un handler
///
/// Cualquier valor hace que el servidor responda 503 y cierre.
#[derive(Debug, Error)]
pub enum HandlerError {
    #[error("handler I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("{0}")]
    Message(String),
}

/// Resultado de servir una conexión completa
#[derive(Debug, Error)]
pub enum ServeError {
    /// Error de transporte: deadline vencido, reset, EOF
    #[error("transport error: {0}")]
    Io(#[from] io::Error),

    /// El cliente violó el framing; no se escribe respuesta
    #[error("protocol error: {0}")]
    Parse(#[from] ParseError),

    /// El handler falló; ya se envió el 503
    #[error("handler error: {0}")]
    Handler(#[from] HandlerError),
}

impl ServeError {
    /// `true` para un cierre normal: el cliente se fue o quedó inactivo
    ///
    /// El pool de workers no registra estos casos.
    pub fn is_end_of_stream(&self) -> bool {
        match self {
            ServeError::Io(e) => is_end_of_stream(e),
            ServeError::Parse(ParseError::Io(e)) => is_end_of_stream(e),
            _ => false,
        }
    }
}

fn is_end_of_stream(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::UnexpectedEof | io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut
    )
}
