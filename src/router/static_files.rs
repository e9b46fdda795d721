//! # Archivos estáticos
//! src/router/static_files.rs
//!
//! Recorre un directorio y arma un handler por archivo. El contenido se
//! lee en cada request, así un cambio en disco se ve sin reiniciar.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use walkdir::WalkDir;

use crate::error::HandlerError;
use crate::http::StatusCode;
use crate::logging::Logger;
use crate::server::{HandlerFunc, RequestCtx};

/// Content-Type según la extensión; `None` si no se sirve
pub fn content_type_for(path: &Path) -> Option<&'static str> {
    match path.extension()?.to_str()? {
        "html" => Some("text/html"),
        "css" => Some("text/css"),
        "js" => Some("text/javascript"),
        "json" => Some("application/json"),
        _ => None,
    }
}

/// Las páginas de error responden con su propio status
pub fn status_for(name: &str) -> StatusCode {
    match name {
        "404.html" => StatusCode::NOT_FOUND,
        "501.html" => StatusCode::NOT_IMPLEMENTED,
        "503.html" => StatusCode::SERVICE_UNAVAILABLE,
        _ => StatusCode::OK,
    }
}

/// Todos los archivos bajo `root`, recursivo, en orden estable
///
/// Sigue symlinks. Una entrada ilegible se salta y se registra; solo un
/// `root` inaccesible es error.
pub fn collect_files(root: &Path, logger: &Logger) -> io::Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    for entry in WalkDir::new(root).follow_links(true).sort_by_file_name() {
        match entry {
            Ok(entry) if entry.file_type().is_file() => files.push(entry.into_path()),
            Ok(_) => {}
            Err(e) if e.depth() == 0 => return Err(e.into()),
            Err(e) => logger.warn(format_args!("skipping static entry: {}", e)),
        }
    }

    Ok(files)
}

/// Ruta HTTP de un archivo: `prefix` + path relativo con `/`
pub fn route_for(root: &Path, file: &Path, prefix: &str) -> Option<String> {
    let relative = file.strip_prefix(root).ok()?;
    let parts: Vec<&str> = relative
        .components()
        .map(|c| c.as_os_str().to_str())
        .collect::<Option<_>>()?;
    Some(format!("{}{}", prefix, parts.join("/")))
}

/// Handler que sirve `path` con el content-type y status dados
///
/// Un error de lectura se propaga y el servidor responde 503.
pub fn file_handler(path: PathBuf, content_type: &'static str, status: StatusCode) -> HandlerFunc {
    Arc::new(move |ctx: &mut RequestCtx| -> Result<(), HandlerError> {
        let content = fs::read(&path)?;
        ctx.res.set_content_type(content_type);
        ctx.res.set_data(&content, status);
        Ok(())
    })
}
