//! # poolserve - Entry Point
//! src/main.rs
//!
//! Punto de entrada del servidor HTTP/1.1.
//!
//! Parsea la configuración (CLI + entorno), carga el directorio estático
//! y sirve para siempre.

use std::process;
use std::sync::Arc;

use poolserve::config::Config;
use poolserve::logging::{init_tracing, Logger};
use poolserve::metrics::ServerMetrics;
use poolserve::router::Router;
use poolserve::server;

fn main() {
    let config = Config::new();

    init_tracing(config.debug);
    let logger = Logger::new("main", config.debug);

    if let Err(e) = config.validate() {
        logger.error(format_args!("invalid configuration: {}", e));
        process::exit(1);
    }
    config.log_summary(&logger);

    let metrics = Arc::new(ServerMetrics::new());

    let mut router = Router::new(logger.named("router"));
    if let Err(e) = router.load_static(&config.static_dir, &config.prefix) {
        logger.warn(format_args!(
            "could not load static dir {}: {}",
            config.static_dir, e
        ));
    }
    if let Some(path) = &config.metrics_path {
        router.register_metrics(path, Arc::clone(&metrics));
    }

    if let Err(e) = server::run(&config, router.into_handler(), metrics, logger.named("server")) {
        logger.error(format_args!("failed to bind {}: {}", config.address(), e));
        process::exit(1);
    }
}
