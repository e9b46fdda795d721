//! # Construcción de Respuestas HTTP
//!
//! El handler llena un `Response` mutable (status, content type, headers,
//! body) y el codec lo convierte a bytes al momento de escribir. Igual
//! que el `Request`, se reutiliza entre mensajes de una misma conexión.
//!
//! ## Formato en el cable
//!
//! ```text
//! HTTP/1.1 200 OK\r\n
//! Server: poolserve/0.1.0\r\n
//! Content-Length: 5\r\n
//! Content-Type: text/plain\r\n
//! X-Custom: value\r\n
//! \r\n
//! hello
//! ```
//!
//! ## Ejemplo de uso
//!
//! ```
//! use poolserve::http::{Response, StatusCode};
//!
//! let mut response = Response::new();
//! response.set_content_type("text/html");
//! response.set_data(b"<h1>hola</h1>", StatusCode::OK);
//!
//! let bytes = response.to_bytes();
//! assert!(bytes.starts_with(b"HTTP/1.1 200 OK\r\n"));
//! ```

use super::request::CONTENT_LENGTH;
use super::StatusCode;
use std::collections::HashMap;

/// Valor fijo del header `Server`
pub const SERVER_NAME: &str = concat!("poolserve/", env!("CARGO_PKG_VERSION"));

/// Content type usado si el handler no fijó ninguno
pub const DEFAULT_CONTENT_TYPE: &str = "text/plain";

const CONTENT_TYPE: &str = "Content-Type";
const SERVER: &str = "Server";

/// Representa una respuesta HTTP/1.1
#[derive(Debug, Clone, Default)]
pub struct Response {
    /// `None` mientras el handler no fije un código (se envía 200)
    status: Option<StatusCode>,

    /// Vacío mientras el handler no lo fije (se envía text/plain)
    content_type: String,

    headers: HashMap<String, String>,

    body: Vec<u8>,
}

impl Response {
    /// Crea una respuesta vacía
    pub fn new() -> Self {
        Self::default()
    }

    /// Vacía la respuesta para el siguiente mensaje
    pub fn reset(&mut self) {
        self.status = None;
        self.content_type.clear();
        self.headers.clear();
        self.body.clear();
    }

    pub fn set_status(&mut self, status: StatusCode) {
        self.status = Some(status);
    }

    pub fn set_content_type(&mut self, content_type: &str) {
        self.content_type.clear();
        self.content_type.push_str(content_type);
    }

    /// Agrega un header a la respuesta
    ///
    /// Si el header ya existe, se sobrescribe. `Server` y `Content-Length`
    /// los decide el codec y se ignoran al serializar.
    pub fn add_header(&mut self, name: &str, value: &str) {
        self.headers.insert(name.to_string(), value.to_string());
    }

    /// Reemplaza el body (copia)
    pub fn set_body(&mut self, body: &[u8]) {
        self.body.clear();
        self.body.extend_from_slice(body);
    }

    /// Fija body y status de una sola vez
    pub fn set_data(&mut self, body: &[u8], status: StatusCode) {
        self.set_body(body);
        self.set_status(status);
    }

    /// Código de estado efectivo (200 si nunca se fijó)
    pub fn status(&self) -> StatusCode {
        self.status.unwrap_or_default()
    }

    /// Content type efectivo (text/plain si nunca se fijó)
    pub fn content_type(&self) -> &str {
        if self.content_type.is_empty() {
            DEFAULT_CONTENT_TYPE
        } else {
            &self.content_type
        }
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(|s| s.as_str())
    }

    pub fn headers(&self) -> &HashMap<String, String> {
        &self.headers
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Bytes reservados por el body (no se liberan al hacer `reset`)
    pub fn buffer_capacity(&self) -> usize {
        self.body.capacity()
    }

    /// Serializa la respuesta completa al final de `out`
    ///
    /// Genera:
    /// - Status line: `HTTP/1.1 200 OK\r\n`
    /// - `Server` fijo y `Content-Length` calculado del body final
    /// - `Content-Type` (salvo que el handler lo haya puesto como header)
    /// - Resto de headers en orden no especificado
    /// - Línea vacía y body
    pub fn write_to(&self, out: &mut Vec<u8>) {
        let status = self.status();

        out.reserve(128 + self.body.len());
        out.extend_from_slice(b"HTTP/1.1 ");
        out.extend_from_slice(status.as_u16().to_string().as_bytes());
        out.push(b' ');
        out.extend_from_slice(status.reason_phrase().as_bytes());
        out.extend_from_slice(b"\r\n");

        push_header(out, SERVER, SERVER_NAME);
        push_header(out, CONTENT_LENGTH, &self.body.len().to_string());
        if !self.headers.contains_key(CONTENT_TYPE) {
            push_header(out, CONTENT_TYPE, self.content_type());
        }

        for (name, value) in &self.headers {
            if name == SERVER || name == CONTENT_LENGTH {
                continue;
            }
            push_header(out, name, value);
        }

        out.extend_from_slice(b"\r\n");
        out.extend_from_slice(&self.body);
    }

    /// Convierte la respuesta a bytes listos para enviar por el socket
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        self.write_to(&mut out);
        out
    }
}

fn push_header(out: &mut Vec<u8>, name: &str, value: &str) {
    out.extend_from_slice(name.as_bytes());
    out.extend_from_slice(b": ");
    out.extend_from_slice(value.as_bytes());
    out.extend_from_slice(b"\r\n");
}

/// Arma una respuesta completa de una sola vez
///
/// Se usa para payloads fijos como el 503 de rechazo.
///
/// # Ejemplo
/// ```
/// use poolserve::http::{format_response, StatusCode};
///
/// let bytes = format_response(b"503 Service Unavailable", StatusCode::SERVICE_UNAVAILABLE, &[]);
/// assert!(bytes.starts_with(b"HTTP/1.1 503 Service Unavailable\r\n"));
/// ```
pub fn format_response(body: &[u8], status: StatusCode, headers: &[(&str, &str)]) -> Vec<u8> {
    let mut response = Response::new();
    response.set_data(body, status);
    for (name, value) in headers {
        response.add_header(name, value);
    }
    response.to_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::request::read_line;
    use std::io::{BufRead, Read};

    /// Lee una respuesta como lo haría un cliente: status line, headers
    /// y body delimitado por Content-Length.
    fn read_response<R: BufRead>(reader: &mut R) -> (String, HashMap<String, String>, Vec<u8>) {
        let mut line = Vec::new();
        assert!(read_line(reader, &mut line).unwrap());
        let status_line = String::from_utf8(line.clone()).unwrap();

        let mut headers = HashMap::new();
        while read_line(reader, &mut line).unwrap() && !line.is_empty() {
            let text = String::from_utf8(line.clone()).unwrap();
            let (name, value) = text.split_once(": ").unwrap();
            headers.insert(name.to_string(), value.to_string());
        }

        let length: usize = headers["Content-Length"].parse().unwrap();
        let mut body = vec![0u8; length];
        reader.read_exact(&mut body).unwrap();
        (status_line, headers, body)
    }

    #[test]
    fn test_defaults() {
        let response = Response::new();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.content_type(), "text/plain");
        assert!(response.headers().is_empty());
        assert!(response.body().is_empty());
    }

    #[test]
    fn test_to_bytes() {
        let mut response = Response::new();
        response.add_header("X-Custom", "value");
        response.set_body(b"Test");

        let text = String::from_utf8(response.to_bytes()).unwrap();

        assert!(text.starts_with("HTTP/1.1 200 OK\r\n"));
        assert!(text.contains(&format!("\r\nServer: {}\r\n", SERVER_NAME)));
        assert!(text.contains("\r\nContent-Length: 4\r\n"));
        assert!(text.contains("\r\nContent-Type: text/plain\r\n"));
        assert!(text.contains("\r\nX-Custom: value\r\n"));
        assert!(text.ends_with("\r\n\r\nTest"));
    }

    #[test]
    fn test_header_order_is_fixed_prefix() {
        let mut response = Response::new();
        response.set_data(b"x", StatusCode::NOT_FOUND);
        let text = String::from_utf8(response.to_bytes()).unwrap();

        let lines: Vec<&str> = text.split("\r\n").collect();
        assert_eq!(lines[0], "HTTP/1.1 404 Not Found");
        assert!(lines[1].starts_with("Server: "));
        assert_eq!(lines[2], "Content-Length: 1");
    }

    #[test]
    fn test_caller_content_length_is_ignored() {
        let mut response = Response::new();
        response.add_header("Content-Length", "999");
        response.add_header("Server", "spoofed");
        response.set_body(b"abc");

        let text = String::from_utf8(response.to_bytes()).unwrap();
        assert_eq!(text.matches("Content-Length").count(), 1);
        assert!(text.contains("Content-Length: 3\r\n"));
        assert!(!text.contains("spoofed"));
    }

    #[test]
    fn test_content_type_header_wins_over_field() {
        let mut response = Response::new();
        response.add_header("Content-Type", "application/json");
        let text = String::from_utf8(response.to_bytes()).unwrap();

        assert_eq!(text.matches("Content-Type").count(), 1);
        assert!(text.contains("Content-Type: application/json\r\n"));
    }

    #[test]
    fn test_unknown_status_phrase() {
        let mut response = Response::new();
        response.set_status(StatusCode::from_u16(418));
        assert!(response.to_bytes().starts_with(b"HTTP/1.1 418 Unknown\r\n"));
    }

    #[test]
    fn test_framing_matches_body() {
        let body = b"hello, http!\r\n\r\nwith a fake blank line".to_vec();
        let mut response = Response::new();
        response.set_data(&body, StatusCode::OK);

        let bytes = response.to_bytes();
        let mut reader: &[u8] = &bytes;
        let (status_line, headers, parsed_body) = read_response(&mut reader);

        assert_eq!(status_line, "HTTP/1.1 200 OK");
        assert_eq!(headers["Content-Length"], body.len().to_string());
        assert_eq!(parsed_body, body);
        assert!(reader.is_empty());
    }

    #[test]
    fn test_empty_body_response() {
        let text = String::from_utf8(Response::new().to_bytes()).unwrap();
        assert!(text.contains("Content-Length: 0\r\n"));
        assert!(text.ends_with("\r\n\r\n"));
    }

    #[test]
    fn test_reset_is_idempotent() {
        let mut response = Response::new();
        response.set_content_type("text/html");
        response.add_header("X-A", "1");
        response.set_data(b"body", StatusCode::NOT_FOUND);

        for _ in 0..2 {
            response.reset();
            assert_eq!(response.status(), StatusCode::OK);
            assert_eq!(response.content_type(), DEFAULT_CONTENT_TYPE);
            assert!(response.headers().is_empty());
            assert!(response.body().is_empty());
        }
    }

    #[test]
    fn test_format_response() {
        let bytes = format_response(
            b"503 Service Unavailable",
            StatusCode::SERVICE_UNAVAILABLE,
            &[("Retry-After", "1")],
        );
        let mut reader: &[u8] = &bytes;
        let (status_line, headers, body) = read_response(&mut reader);

        assert_eq!(status_line, "HTTP/1.1 503 Service Unavailable");
        assert_eq!(headers["Retry-After"], "1");
        assert_eq!(body, b"503 Service Unavailable");
    }
}
