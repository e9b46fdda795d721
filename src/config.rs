//! # Configuración del Servidor
//! src/config.rs
//!
//! Este módulo define la configuración del servidor HTTP con soporte completo
//! para argumentos CLI y variables de entorno.
//!
//! ## Ejemplos de uso
//!
//! ### CLI
//! ```bash
//! ./poolserve --port 8080 \
//!   --static-dir ./public \
//!   --concurrency 1024 \
//!   --idle-timeout-ms 3000
//! ```
//!
//! ### Variables de entorno
//! ```bash
//! HTTP_PORT=8080 HTTP_HOST=0.0.0.0 STATIC_DIR=./public ./poolserve
//! ```

use clap::Parser;

use crate::logging::Logger;

/// Configuración del servidor HTTP/1.1
#[derive(Debug, Clone, Parser)]
#[command(name = "poolserve")]
#[command(about = "Servidor HTTP/1.1 de archivos estáticos con pool acotado de workers")]
#[command(version)]
pub struct Config {
    /// Puerto en el que escucha el servidor
    #[arg(short, long, default_value = "65500", env = "HTTP_PORT")]
    pub port: u16,

    /// Host/IP en el que escucha
    #[arg(long, default_value = "127.0.0.1", env = "HTTP_HOST")]
    pub host: String,

    // === Contenido ===

    /// Directorio de archivos estáticos
    #[arg(long = "static-dir", default_value = "./static", env = "STATIC_DIR")]
    pub static_dir: String,

    /// Prefijo de URL para los archivos estáticos (empieza y termina en `/`)
    #[arg(long, default_value = "/", env = "STATIC_PREFIX")]
    pub prefix: String,

    /// Ruta opcional que expone las métricas en JSON
    #[arg(long = "metrics-path", env = "METRICS_PATH")]
    pub metrics_path: Option<String>,

    // === Workers ===

    /// Máximo de workers vivos (conexiones atendidas a la vez)
    #[arg(long, default_value = "262144", env = "CONCURRENCY")]
    pub concurrency: usize,

    /// Tiempo inactivo tras el cual un worker se termina, en milisegundos
    #[arg(long = "worker-idle-ms", default_value = "2000", env = "WORKER_IDLE_MS")]
    pub worker_idle_ms: u64,

    /// Cada cuánto corre el reaper de workers, en milisegundos
    #[arg(long = "sweep-interval-ms", default_value = "2000", env = "SWEEP_INTERVAL_MS")]
    pub sweep_interval_ms: u64,

    /// Máximo de contextos y buffers retenidos para reutilizar
    #[arg(long = "pool-retain", default_value = "1024", env = "POOL_RETAIN")]
    pub pool_retain: usize,

    // === Timeouts ===

    /// Deadline de cada ciclo request/response en milisegundos
    #[arg(long = "idle-timeout-ms", default_value = "5000", env = "IDLE_TIMEOUT_MS")]
    pub idle_timeout_ms: u64,

    /// Deadline para escribir el 503 de saturación en milisegundos
    #[arg(long = "reject-timeout-ms", default_value = "50", env = "REJECT_TIMEOUT_MS")]
    pub reject_timeout_ms: u64,

    /// Activa el logging de debug por conexión
    #[arg(short, long, env = "HTTP_DEBUG")]
    pub debug: bool,
}

impl Config {
    /// Crea una nueva configuración parseando argumentos CLI
    pub fn new() -> Self {
        Config::parse()
    }

    /// Obtiene la dirección completa para bind (host:port)
    ///
    /// # Ejemplo
    /// ```rust
    /// use poolserve::config::Config;
    ///
    /// let config = Config::default();
    /// assert_eq!(config.address(), "127.0.0.1:65500");
    /// ```
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Valida la configuración
    ///
    /// Retorna errores si hay valores inválidos
    pub fn validate(&self) -> Result<(), String> {
        if self.concurrency == 0 {
            return Err("Concurrency must be >= 1".to_string());
        }
        if self.pool_retain == 0 {
            return Err("Pool retain must be >= 1".to_string());
        }

        // Validar timeouts
        if self.idle_timeout_ms == 0 {
            return Err("Idle timeout must be > 0".to_string());
        }
        if self.reject_timeout_ms == 0 {
            return Err("Reject timeout must be > 0".to_string());
        }
        if self.worker_idle_ms == 0 {
            return Err("Worker idle time must be > 0".to_string());
        }
        if self.sweep_interval_ms == 0 {
            return Err("Sweep interval must be > 0".to_string());
        }

        if !self.prefix.starts_with('/') || !self.prefix.ends_with('/') {
            return Err(format!(
                "Static prefix must start and end with '/': {}",
                self.prefix
            ));
        }
        if let Some(path) = &self.metrics_path {
            if !path.starts_with('/') {
                return Err(format!("Metrics path must start with '/': {}", path));
            }
        }

        Ok(())
    }

    /// Registra un resumen de la configuración efectiva
    pub fn log_summary(&self, logger: &Logger) {
        logger.info(format_args!("address:        {}", self.address()));
        logger.info(format_args!(
            "static:         {} -> {}",
            self.prefix, self.static_dir
        ));
        logger.info(format_args!(
            "workers:        max {} (idle {} ms, sweep {} ms)",
            self.concurrency, self.worker_idle_ms, self.sweep_interval_ms
        ));
        logger.info(format_args!(
            "timeouts:       idle {} ms, reject {} ms",
            self.idle_timeout_ms, self.reject_timeout_ms
        ));
        logger.info(format_args!("pool retain:    {}", self.pool_retain));
        match &self.metrics_path {
            Some(path) => logger.info(format_args!("metrics:        {}", path)),
            None => logger.info(format_args!("metrics:        disabled")),
        }
        if self.debug {
            logger.info(format_args!("debug logging:  enabled"));
        }
    }
}

impl Default for Config {
    /// Configuración por defecto
    fn default() -> Self {
        Self {
            port: 65500,
            host: "127.0.0.1".to_string(),
            static_dir: "./static".to_string(),
            prefix: "/".to_string(),
            metrics_path: None,
            concurrency: 256 * 1024,
            worker_idle_ms: 2_000,
            sweep_interval_ms: 2_000,
            pool_retain: 1024,
            idle_timeout_ms: 5_000,
            reject_timeout_ms: 50,
            debug: false,
        }
    }
}
