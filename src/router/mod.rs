//! # Sistema de Routing
//! src/router/mod.rs
//!
//! Este módulo implementa el router que mapea paths HTTP a handlers específicos.
//!
//! ## Arquitectura
//!
//! ```text
//! RequestCtx → Router → HandlerFunc → ctx.res
//! ```
//!
//! El router examina el path del request y lo dirige al handler apropiado:
//! - path desconocido → handler de `<prefix>404.html`
//! - método distinto al registrado → handler de `<prefix>501.html`
//!
//! Si esas páginas no se cargaron se responde un texto plano fijo.

pub mod static_files;

use std::collections::HashMap;
use std::io;
use std::path::Path;
use std::sync::Arc;

use crate::error::HandlerError;
use crate::http::StatusCode;
use crate::logging::Logger;
use crate::metrics::ServerMetrics;
use crate::server::{HandlerFunc, RequestCtx};

const NOT_FOUND_PAGE: &str = "404.html";
const NOT_IMPLEMENTED_PAGE: &str = "501.html";

struct RouteEntry {
    method: String,
    handler: HandlerFunc,
}

/// Router que mapea paths a handlers
pub struct Router {
    /// Mapa de path → handler
    routes: HashMap<String, RouteEntry>,

    /// Prefijo bajo el que se buscan las páginas de error
    fallback_prefix: String,

    logger: Logger,
}

impl Router {
    /// Crea un nuevo router vacío
    pub fn new(logger: Logger) -> Self {
        Self {
            routes: HashMap::new(),
            fallback_prefix: "/".to_string(),
            logger,
        }
    }

    /// Registra una ruta con su handler
    ///
    /// Registrar dos veces el mismo path reemplaza el anterior.
    ///
    /// # Ejemplo
    /// ```
    /// use std::sync::Arc;
    /// use poolserve::error::HandlerError;
    /// use poolserve::logging::Logger;
    /// use poolserve::router::Router;
    /// use poolserve::server::RequestCtx;
    ///
    /// let mut router = Router::new(Logger::quiet("router"));
    /// let hello = |ctx: &mut RequestCtx| -> Result<(), HandlerError> {
    ///     ctx.res.set_body(b"hello");
    ///     Ok(())
    /// };
    /// router.register("/hello", "GET", Arc::new(hello));
    /// assert_eq!(router.len(), 1);
    /// ```
    pub fn register(&mut self, path: &str, method: &str, handler: HandlerFunc) {
        self.routes.insert(
            path.to_string(),
            RouteEntry {
                method: method.to_string(),
                handler,
            },
        );
    }

    /// Cantidad de rutas registradas
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    pub fn contains(&self, path: &str) -> bool {
        self.routes.contains_key(path)
    }

    /// Encuentra y ejecuta el handler apropiado para el request de `ctx`
    pub fn handle(&self, ctx: &mut RequestCtx) -> Result<(), HandlerError> {
        match self.routes.get(ctx.req.path()) {
            Some(entry) if entry.method == ctx.req.method() => (entry.handler)(ctx),
            Some(_) => self.fallback(ctx, NOT_IMPLEMENTED_PAGE, StatusCode::NOT_IMPLEMENTED),
            None => self.fallback(ctx, NOT_FOUND_PAGE, StatusCode::NOT_FOUND),
        }
    }

    fn fallback(
        &self,
        ctx: &mut RequestCtx,
        page: &str,
        status: StatusCode,
    ) -> Result<(), HandlerError> {
        let path = format!("{}{}", self.fallback_prefix, page);
        if let Some(entry) = self.routes.get(&path) {
            return (entry.handler)(ctx);
        }

        let body = status.to_string();
        ctx.res.set_data(body.as_bytes(), status);
        Ok(())
    }

    /// Registra cada archivo servible de `dir` bajo `prefix`
    ///
    /// `prefix` debe empezar y terminar en `/`. Las páginas de error se
    /// buscan a partir de ahora bajo ese mismo prefijo. Devuelve cuántas
    /// rutas se registraron.
    pub fn load_static(&mut self, dir: impl AsRef<Path>, prefix: &str) -> io::Result<usize> {
        let root = dir.as_ref();
        let mut registered = 0;

        for file in static_files::collect_files(root, &self.logger)? {
            let Some(content_type) = static_files::content_type_for(&file) else {
                continue;
            };
            let Some(route) = static_files::route_for(root, &file, prefix) else {
                continue;
            };
            let name = file.file_name().and_then(|n| n.to_str()).unwrap_or_default();
            let status = static_files::status_for(name);

            self.logger
                .debug(format_args!("static {} -> {}", route, file.display()));
            self.register(
                &route,
                "GET",
                static_files::file_handler(file.clone(), content_type, status),
            );
            registered += 1;
        }

        self.fallback_prefix = prefix.to_string();
        self.logger.info(format_args!(
            "loaded {} static routes from {}",
            registered,
            root.display()
        ));
        Ok(registered)
    }

    /// Expone el snapshot de métricas como JSON en `path`
    pub fn register_metrics(&mut self, path: &str, metrics: Arc<ServerMetrics>) {
        let handler: HandlerFunc =
            Arc::new(move |ctx: &mut RequestCtx| -> Result<(), HandlerError> {
                let json = metrics
                    .get_metrics_json()
                    .map_err(|e| HandlerError::Message(format!("metrics serialization: {}", e)))?;
                ctx.res.set_content_type("application/json");
                ctx.res.set_data(json.as_bytes(), StatusCode::OK);
                Ok(())
            });
        self.register(path, "GET", handler);
    }

    /// Convierte el router en el handler del servidor
    pub fn into_handler(self) -> HandlerFunc {
        let router = Arc::new(self);
        Arc::new(move |ctx: &mut RequestCtx| router.handle(ctx))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn text_handler(body: &'static str) -> HandlerFunc {
        Arc::new(move |ctx: &mut RequestCtx| -> Result<(), HandlerError> {
            ctx.res.set_body(body.as_bytes());
            Ok(())
        })
    }

    fn request(method: &str, target: &str) -> RequestCtx {
        let mut ctx = RequestCtx::new();
        ctx.req.set_method(method);
        ctx.req.set_target(target);
        ctx
    }

    fn router() -> Router {
        Router::new(Logger::quiet("router"))
    }

    #[test]
    fn test_router_creation() {
        let router = router();
        assert!(router.is_empty());
    }

    #[test]
    fn test_route_found() {
        let mut router = router();
        router.register("/test", "GET", text_handler("ok"));

        let mut ctx = request("GET", "/test?x=1");
        router.handle(&mut ctx).unwrap();

        assert_eq!(ctx.res.status(), StatusCode::OK);
        assert_eq!(ctx.res.body(), b"ok");
    }

    #[test]
    fn test_route_not_found_builtin() {
        let router = router();

        let mut ctx = request("GET", "/nonexistent");
        router.handle(&mut ctx).unwrap();

        assert_eq!(ctx.res.status(), StatusCode::NOT_FOUND);
        assert_eq!(ctx.res.body(), b"404 Not Found");
    }

    #[test]
    fn test_method_mismatch_builtin() {
        let mut router = router();
        router.register("/test", "GET", text_handler("ok"));

        let mut ctx = request("POST", "/test");
        router.handle(&mut ctx).unwrap();

        assert_eq!(ctx.res.status(), StatusCode::NOT_IMPLEMENTED);
        assert_eq!(ctx.res.body(), b"501 Not Implemented");
    }

    #[test]
    fn test_registered_error_pages() {
        let mut router = router();
        router.register("/404.html", "GET", text_handler("custom missing"));
        router.register("/501.html", "GET", text_handler("custom method"));
        router.register("/only-get", "GET", text_handler("ok"));

        let mut ctx = request("GET", "/missing");
        router.handle(&mut ctx).unwrap();
        assert_eq!(ctx.res.body(), b"custom missing");

        let mut ctx = request("DELETE", "/only-get");
        router.handle(&mut ctx).unwrap();
        assert_eq!(ctx.res.body(), b"custom method");
    }

    #[test]
    fn test_handler_error_propagates() {
        let mut router = router();
        router.register(
            "/fail",
            "GET",
            Arc::new(|_ctx: &mut RequestCtx| -> Result<(), HandlerError> {
                Err(HandlerError::Message("nope".into()))
            }),
        );

        let mut ctx = request("GET", "/fail");
        assert!(router.handle(&mut ctx).is_err());
    }

    #[test]
    fn test_load_static() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("css")).unwrap();
        fs::write(dir.path().join("index.html"), "<h1>home</h1>").unwrap();
        fs::write(dir.path().join("404.html"), "<h1>lost</h1>").unwrap();
        fs::write(dir.path().join("css/site.css"), "body{}").unwrap();
        fs::write(dir.path().join("logo.png"), [0u8; 4]).unwrap();

        let mut router = router();
        let count = router.load_static(dir.path(), "/static/").unwrap();

        assert_eq!(count, 3);
        assert!(router.contains("/static/index.html"));
        assert!(router.contains("/static/css/site.css"));
        assert!(!router.contains("/static/logo.png"));

        let mut ctx = request("GET", "/static/css/site.css");
        router.handle(&mut ctx).unwrap();
        assert_eq!(ctx.res.content_type(), "text/css");
        assert_eq!(ctx.res.body(), b"body{}");

        let mut ctx = request("GET", "/static/nope.html");
        router.handle(&mut ctx).unwrap();
        assert_eq!(ctx.res.status(), StatusCode::NOT_FOUND);
        assert_eq!(ctx.res.body(), b"<h1>lost</h1>");
    }

    #[cfg(unix)]
    #[test]
    fn test_load_static_survives_broken_entry() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("js")).unwrap();
        fs::write(dir.path().join("index.html"), "home").unwrap();
        fs::write(dir.path().join("js/app.js"), "app").unwrap();
        std::os::unix::fs::symlink(dir.path().join("gone"), dir.path().join("dead.html")).unwrap();

        let mut router = router();
        assert_eq!(router.load_static(dir.path(), "/").unwrap(), 2);
        assert!(router.contains("/index.html"));
        assert!(router.contains("/js/app.js"));
        assert!(!router.contains("/dead.html"));
    }

    #[test]
    fn test_load_static_missing_dir() {
        let dir = tempfile::tempdir().unwrap();
        let mut router = router();
        assert!(router.load_static(dir.path().join("absent"), "/").is_err());
    }

    #[test]
    fn test_metrics_route() {
        let metrics = Arc::new(ServerMetrics::new());
        metrics.record_accepted();

        let mut router = router();
        router.register_metrics("/metrics", Arc::clone(&metrics));

        let mut ctx = request("GET", "/metrics");
        router.handle(&mut ctx).unwrap();

        assert_eq!(ctx.res.content_type(), "application/json");
        let value: serde_json::Value = serde_json::from_slice(ctx.res.body()).unwrap();
        assert_eq!(value["connections"]["accepted"], 1);
    }

    #[test]
    fn test_into_handler() {
        let mut router = router();
        router.register("/a", "GET", text_handler("a"));
        let handler = router.into_handler();

        let mut ctx = request("GET", "/a");
        handler(&mut ctx).unwrap();
        assert_eq!(ctx.res.body(), b"a");
    }
}
