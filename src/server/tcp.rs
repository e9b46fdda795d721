//! # Servidor TCP con pool de workers
//! src/server/tcp.rs
//!
//! El accept loop nunca procesa conexiones: las entrega al `WorkerPool`.
//! Si el pool está saturado responde un 503 fijo con un deadline corto y
//! cierra. Cada worker corre `serve_conn`, que atiende mensajes en
//! pipeline sobre la misma conexión hasta que algo falla:
//!
//! ```text
//! deadline ─► peek ─► parse ─► handler ─► write ─► reset ─┐
//!    ▲                                                     │
//!    └─────────────────────────────────────────────────────┘
//! ```

use std::io;
use std::net::{TcpListener, TcpStream};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use super::context::RequestCtx;
use super::reader::{write_all_before, ConnReader, ReadBuffer};
use crate::config::Config;
use crate::error::{HandlerError, ServeError};
use crate::http::{format_response, ParseError, StatusCode};
use crate::logging::Logger;
use crate::metrics::ServerMetrics;
use crate::pool::{ConnHandler, ObjectPool, PoolConfig, PoolStats, WorkerPool};

/// Función que atiende un mensaje: lee `ctx.req` y llena `ctx.res`
///
/// Un `Err` hace que se responda 503 y se cierre la conexión.
pub type HandlerFunc = Arc<dyn Fn(&mut RequestCtx) -> Result<(), HandlerError> + Send + Sync>;

/// Body del rechazo por saturación o fallo del handler
pub const UNAVAILABLE_BODY: &[u8] = b"503 Service Unavailable";

/// Pausa tras un accept fallido (evita girar en falso con EMFILE)
const ACCEPT_BACKOFF: Duration = Duration::from_millis(10);

/// Parámetros del servidor de conexiones
#[derive(Debug, Clone, Copy)]
pub struct ServerConfig {
    pub pool: PoolConfig,

    /// Deadline de lectura y escritura de cada ciclo request/response
    pub idle_timeout: Duration,

    /// Deadline de escritura del 503 por saturación
    pub reject_timeout: Duration,

    /// Máximo de contextos y buffers retenidos en sus pools
    pub pool_retain: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            pool: PoolConfig::default(),
            idle_timeout: Duration::from_secs(5),
            reject_timeout: Duration::from_millis(50),
            pool_retain: 1024,
        }
    }
}

impl ServerConfig {
    /// Crea la configuración desde el Config principal
    pub fn from_config(config: &Config) -> Self {
        Self {
            pool: PoolConfig {
                concurrency: config.concurrency,
                max_idle: Duration::from_millis(config.worker_idle_ms),
                sweep_interval: Duration::from_millis(config.sweep_interval_ms),
                ..PoolConfig::default()
            },
            idle_timeout: Duration::from_millis(config.idle_timeout_ms),
            reject_timeout: Duration::from_millis(config.reject_timeout_ms),
            pool_retain: config.pool_retain,
        }
    }
}

/// Estado compartido por el accept loop y todos los workers
struct ConnServer {
    handler: HandlerFunc,
    config: ServerConfig,
    contexts: ObjectPool<RequestCtx>,
    readers: ObjectPool<ReadBuffer>,
    unavailable: Vec<u8>,
    metrics: Arc<ServerMetrics>,
    logger: Logger,
}

/// Servidor HTTP/1.1 con pipelining y pool acotado de workers
pub struct Server {
    conn: Arc<ConnServer>,
    pool: WorkerPool<TcpStream>,
}

impl Server {
    pub fn new(
        handler: HandlerFunc,
        config: ServerConfig,
        metrics: Arc<ServerMetrics>,
        logger: Logger,
    ) -> Self {
        let unavailable = format_response(UNAVAILABLE_BODY, StatusCode::SERVICE_UNAVAILABLE, &[]);

        let conn = Arc::new(ConnServer {
            handler,
            config,
            contexts: ObjectPool::with_filter(
                config.pool_retain,
                RequestCtx::new,
                RequestCtx::is_reusable,
            ),
            readers: ObjectPool::new(config.pool_retain, ReadBuffer::new),
            unavailable,
            metrics,
            logger,
        });

        let worker_conn = Arc::clone(&conn);
        let conn_handler: ConnHandler<TcpStream> =
            Arc::new(move |stream: TcpStream| worker_conn.serve_conn(stream));
        let pool = WorkerPool::start(conn_handler, config.pool, logger.named("pool"));
        if !conn.metrics.attach_pool(pool.stats_reader()) {
            logger.debug(format_args!("metrics already report another worker pool"));
        }

        Self { conn, pool }
    }

    /// Ocupación actual del pool de workers
    pub fn pool_stats(&self) -> PoolStats {
        self.pool.stats()
    }

    /// Acepta conexiones para siempre
    ///
    /// Un accept fallido se registra y el loop sigue.
    pub fn serve(&self, listener: TcpListener) {
        let logger = self.conn.logger;

        if let Ok(addr) = listener.local_addr() {
            logger.info(format_args!(
                "accepting connections on {} (max {} workers)",
                addr,
                self.pool.config().concurrency
            ));
        }

        for stream in listener.incoming() {
            match stream {
                Ok(stream) => {
                    self.conn.metrics.record_accepted();
                    if let Err(stream) = self.pool.submit(stream) {
                        self.conn.reject(stream);
                    }
                }
                Err(e) => {
                    logger.debug(format_args!("error establishing connection: {}", e));
                    thread::sleep(ACCEPT_BACKOFF);
                }
            }
        }
    }
}

impl ConnServer {
    /// Responde 503 sin procesar nada y cierra
    fn reject(&self, stream: TcpStream) {
        self.metrics.record_rejected();
        self.logger.debug(format_args!(
            "pool saturated, dropping connection from {}",
            peer(&stream)
        ));

        let deadline = Instant::now() + self.config.reject_timeout;
        if let Err(e) = write_all_before(&stream, &self.unavailable, deadline) {
            self.logger.debug(format_args!("failed to write rejection: {}", e));
        }
    }

    /// Atiende una conexión completa; la cierra exactamente una vez
    fn serve_conn(&self, stream: TcpStream) -> Result<(), ServeError> {
        self.metrics.increment_active_connections();

        let mut ctx = self.contexts.acquire();
        ctx.attach(stream);
        let mut buffer = self.readers.acquire();

        let result = self.serve_loop(&mut ctx, &mut buffer);

        if let Err(e) = &result {
            if !e.is_end_of_stream() {
                self.logger.debug(format_args!(
                    "closing connection from {}: {}",
                    ctx.peer_addr().map_or_else(|| "unknown".to_string(), |a| a.to_string()),
                    e
                ));
            }
        }

        buffer.clear();
        self.readers.release(buffer);
        drop(ctx.detach());
        ctx.reset();
        self.contexts.release(ctx);

        self.metrics.decrement_active_connections();
        result
    }

    fn serve_loop(&self, ctx: &mut RequestCtx, buffer: &mut ReadBuffer) -> Result<(), ServeError> {
        let idle_timeout = self.config.idle_timeout;

        loop {
            // 1-3. Deadline, peek de vida y parse
            {
                let stream = connected(&ctx.stream)?;
                let mut reader = ConnReader::new(buffer, stream, Instant::now() + idle_timeout);
                reader.peek()?;
                if let Err(e) = ctx.req.read_from(&mut reader) {
                    if !matches!(e, ParseError::Io(_)) {
                        self.metrics.record_protocol_error();
                    }
                    return Err(e.into());
                }
            }

            // 4. Handler y respuesta
            if let Err(e) = (self.handler)(ctx) {
                self.metrics.record_handler_error();
                let deadline = Instant::now() + idle_timeout;
                // best-effort: la conexión se cierra igual
                let _ = write_all_before(connected(&ctx.stream)?, &self.unavailable, deadline);
                return Err(e.into());
            }

            self.logger.debug(format_args!(
                "{} {} -> {}",
                ctx.req.method(),
                ctx.req.path(),
                ctx.res.status()
            ));

            ctx.out.clear();
            ctx.res.write_to(&mut ctx.out);
            let stream = connected(&ctx.stream)?;
            write_all_before(stream, &ctx.out, Instant::now() + idle_timeout)?;
            self.metrics.record_request();

            // 5. Siguiente mensaje en la misma conexión
            ctx.reset();
        }
    }
}

fn connected(stream: &Option<TcpStream>) -> io::Result<&TcpStream> {
    stream
        .as_ref()
        .ok_or_else(|| io::Error::from(io::ErrorKind::NotConnected))
}

fn peer(stream: &TcpStream) -> String {
    stream
        .peer_addr()
        .map(|addr| addr.to_string())
        .unwrap_or_else(|_| "unknown".to_string())
}

/// Hace bind en la dirección del config y sirve para siempre
pub fn run(
    config: &Config,
    handler: HandlerFunc,
    metrics: Arc<ServerMetrics>,
    logger: Logger,
) -> io::Result<()> {
    let listener = TcpListener::bind(config.address())?;
    let server = Server::new(handler, ServerConfig::from_config(config), metrics, logger);
    server.serve(listener);
    Ok(())
}
