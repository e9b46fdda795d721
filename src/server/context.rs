//! # Contexto de conexión
//! src/server/context.rs
//!
//! Un `RequestCtx` por conexión activa, tomado de un pool. Vive toda la
//! conexión: el mismo `Request`/`Response` se resetea y reutiliza para
//! cada mensaje en pipeline.

use std::net::{SocketAddr, TcpStream};

use crate::http::{Request, Response};

/// Un contexto con más memoria reservada que esto no vuelve al pool
pub const MAX_RETAINED_CAPACITY: usize = 64 * 1024;

/// Estado de una conexión que ve el handler
#[derive(Debug, Default)]
pub struct RequestCtx {
    pub(crate) stream: Option<TcpStream>,

    /// Request actual, escrito solo por el codec
    pub req: Request,

    /// Response que llena el handler
    pub res: Response,

    /// Buffer de salida reutilizado entre respuestas
    pub(crate) out: Vec<u8>,
}

impl RequestCtx {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn attach(&mut self, stream: TcpStream) {
        self.stream = Some(stream);
    }

    /// Suelta el socket; al hacer drop del valor se cierra
    pub(crate) fn detach(&mut self) -> Option<TcpStream> {
        self.stream.take()
    }

    /// Dirección del cliente, si sigue conectado
    pub fn peer_addr(&self) -> Option<SocketAddr> {
        self.stream.as_ref().and_then(|s| s.peer_addr().ok())
    }

    /// Bytes reservados por los buffers de request, response y salida
    pub fn buffer_capacity(&self) -> usize {
        self.req.buffer_capacity() + self.res.buffer_capacity() + self.out.capacity()
    }

    /// `true` si el contexto puede volver al pool: sin socket y sin
    /// buffers inflados por un body grande
    pub fn is_reusable(&self) -> bool {
        self.stream.is_none() && self.buffer_capacity() <= MAX_RETAINED_CAPACITY
    }

    /// Resetea request y response, NO la conexión
    pub fn reset(&mut self) {
        self.req.reset();
        self.res.reset();
        self.out.clear();
    }
}
