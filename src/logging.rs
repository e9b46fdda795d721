//! # Logging
//! src/logging.rs
//!
//! Inicialización de `tracing` y el `Logger` que cada componente recibe
//! al construirse. No hay un flag global de debug: el switch viaja dentro
//! del `Logger` que se pasa explícitamente al pool, al servidor y al router.

use std::fmt;

use tracing_subscriber::EnvFilter;

/// Instala el subscriber de `tracing` una sola vez al arrancar
///
/// `RUST_LOG` tiene prioridad; si no existe se usa `debug` o `info`
/// según el flag. Llamarlo dos veces no es un error (se ignora).
pub fn init_tracing(debug: bool) {
    let default_level = if debug { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_names(true)
        .try_init();
}

/// Handle de logging de un componente
///
/// Los mensajes de debug solo se emiten si el switch está activo. Emitir
/// nunca bloquea ni falla.
#[derive(Debug, Clone, Copy)]
pub struct Logger {
    component: &'static str,
    debug: bool,
}

impl Logger {
    pub fn new(component: &'static str, debug: bool) -> Self {
        Self { component, debug }
    }

    /// Logger sin mensajes de debug
    pub fn quiet(component: &'static str) -> Self {
        Self::new(component, false)
    }

    /// Mismo switch, otro componente
    pub fn named(&self, component: &'static str) -> Self {
        Self::new(component, self.debug)
    }

    pub fn component(&self) -> &'static str {
        self.component
    }

    pub fn is_debug(&self) -> bool {
        self.debug
    }

    pub fn debug(&self, args: fmt::Arguments<'_>) {
        if self.debug {
            tracing::debug!(component = self.component, "{}", args);
        }
    }

    pub fn info(&self, args: fmt::Arguments<'_>) {
        tracing::info!(component = self.component, "{}", args);
    }

    pub fn warn(&self, args: fmt::Arguments<'_>) {
        tracing::warn!(component = self.component, "{}", args);
    }

    pub fn error(&self, args: fmt::Arguments<'_>) {
        tracing::error!(component = self.component, "{}", args);
    }
}
