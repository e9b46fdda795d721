//! # Parsing de Requests HTTP/1.1
//! src/http/request.rs
//!
//! Este módulo implementa un parser HTTP/1.1 incremental que lee
//! directamente de un `BufRead`. Solo consume los bytes de UN mensaje,
//! así que los bytes de un segundo request enviado en pipeline quedan
//! en el buffer para la siguiente llamada.
//!
//! ## Formato de un Request HTTP/1.1
//!
//! ```text
//! GET /path?param1=value1&param2=value2 HTTP/1.1\r\n
//! Host: localhost:65500\r\n
//! Content-Length: 5\r\n
//! \r\n
//! hello
//! ```
//!
//! ## Componentes
//!
//! 1. **Request Line**: `METHOD /path?query HTTP/1.1` (exactamente 3 tokens)
//! 2. **Headers**: Pares `Name: Value` (separador exacto `": "`)
//! 3. **Empty Line**: `\r\n` que separa headers del body
//! 4. **Body**: exactamente `Content-Length` bytes, si el header existe
//!
//! El `Request` vive dentro del contexto de la conexión y se reutiliza
//! entre mensajes: `reset()` lo vacía sin liberar la memoria reservada.

use std::collections::HashMap;
use std::io::{self, BufRead, Read};
use std::mem;

use thiserror::Error;

/// Única versión de protocolo aceptada en la request line
pub const HTTP_VERSION: &str = "HTTP/1.1";

/// Header que delimita el body
pub const CONTENT_LENGTH: &str = "Content-Length";

/// Longitud máxima de una línea (request line o header), sin el CRLF
pub const MAX_LINE_LEN: usize = 8 * 1024;

/// Errores que pueden ocurrir durante el parsing
///
/// Cualquiera de ellos cierra la conexión sin escribir respuesta.
#[derive(Debug, Error)]
pub enum ParseError {
    /// El stream terminó antes del primer byte de la request line
    #[error("connection closed before a request line")]
    UnexpectedEof,

    /// La request line no tiene exactamente 3 tokens
    #[error("invalid request line format")]
    InvalidRequestLine,

    /// Versión HTTP distinta de HTTP/1.1
    #[error("invalid HTTP version: {0}")]
    InvalidHttpVersion(String),

    /// Header sin el separador `": "`
    #[error("invalid header: {0}")]
    InvalidHeader(String),

    /// Línea más larga que `MAX_LINE_LEN`
    #[error("line exceeds {} bytes", MAX_LINE_LEN)]
    LineTooLong,

    /// Bytes que no son UTF-8 en la cabecera del mensaje
    #[error("request head is not valid UTF-8")]
    InvalidUtf8,

    /// El stream terminó antes de completar el body declarado
    #[error("short body: expected {expected} bytes, read {read}")]
    ShortBody { expected: usize, read: usize },

    /// Error de I/O del socket (timeout, reset, etc.)
    #[error("I/O error while parsing: {0}")]
    Io(#[from] io::Error),
}

/// Representa un request HTTP/1.1 parseado
#[derive(Debug, Clone, Default)]
pub struct Request {
    /// Método HTTP tal cual llegó (ej: "GET")
    method: String,

    /// Path de la petición sin query string (ej: "/index.html")
    path: String,

    /// Query parameters parseados (ej: {"a": "c"})
    params: HashMap<String, String>,

    /// Headers HTTP (ej: {"Host": "localhost:65500"})
    headers: HashMap<String, String>,

    /// Body, presente solo si hubo `Content-Length`
    body: Vec<u8>,

    /// Buffer de líneas reutilizado entre mensajes
    scratch: Vec<u8>,
}

impl Request {
    /// Crea un request vacío
    pub fn new() -> Self {
        Self::default()
    }

    /// Parsea UN request desde el reader, sobrescribiendo este `Request`
    ///
    /// # Ejemplo
    ///
    /// ```
    /// use poolserve::http::Request;
    ///
    /// let mut raw: &[u8] = b"GET /abc/cde?a=c&b=d HTTP/1.1\r\nHost: x\r\n\r\n";
    /// let mut request = Request::new();
    /// request.read_from(&mut raw).unwrap();
    ///
    /// assert_eq!(request.path(), "/abc/cde");
    /// assert_eq!(request.param("a"), Some("c"));
    /// assert_eq!(request.header("Host"), Some("x"));
    /// ```
    pub fn read_from<R: BufRead>(&mut self, reader: &mut R) -> Result<(), ParseError> {
        let mut line = mem::take(&mut self.scratch);
        let result = self.parse_message(reader, &mut line);
        self.scratch = line;
        result
    }

    fn parse_message<R: BufRead>(
        &mut self,
        reader: &mut R,
        line: &mut Vec<u8>,
    ) -> Result<(), ParseError> {
        // 1. Request line
        if !read_line(reader, line)? {
            return Err(ParseError::UnexpectedEof);
        }
        let (method, target) = parse_request_line(as_text(line)?)?;
        self.set_method(method);
        self.set_target(target);

        // 2. Headers hasta la línea vacía. Un EOF limpio también termina
        //    el bloque: el cliente cerró su lado tras una cabecera completa.
        while read_line(reader, line)? {
            if line.is_empty() {
                break;
            }
            let text = as_text(line)?;
            let (name, value) = text
                .split_once(": ")
                .ok_or_else(|| ParseError::InvalidHeader(text.to_string()))?;
            self.add_header(name, value);
        }

        // 3. Body
        let declared = self
            .header(CONTENT_LENGTH)
            .and_then(|value| value.parse::<usize>().ok());
        if let Some(expected) = declared {
            self.body.clear();
            let read = reader
                .by_ref()
                .take(expected as u64)
                .read_to_end(&mut self.body)?;
            if read < expected {
                return Err(ParseError::ShortBody { expected, read });
            }
        }

        Ok(())
    }

    /// Vacía el request para el siguiente mensaje de la misma conexión
    pub fn reset(&mut self) {
        self.method.clear();
        self.path.clear();
        self.params.clear();
        self.headers.clear();
        self.body.clear();
    }

    /// Bytes reservados por los buffers de body y de líneas
    ///
    /// `reset` no los libera; sirve para decidir si vale la pena
    /// conservar el request en un pool.
    pub fn buffer_capacity(&self) -> usize {
        self.body.capacity() + self.scratch.capacity()
    }

    /// Guarda el método (copia)
    pub fn set_method(&mut self, method: &str) {
        self.method.clear();
        self.method.push_str(method);
    }

    /// Separa el request target en path y query parameters
    ///
    /// Ejemplo: "/abc/cde?a=c&b=d"
    /// Resultado: path "/abc/cde", params {"a": "c", "b": "d"}
    ///
    /// Los pares sin `=` se descartan y una clave repetida se queda con
    /// el último valor.
    pub fn set_target(&mut self, target: &str) {
        let (path, query) = match target.split_once('?') {
            Some((path, query)) => (path, Some(query)),
            None => (target, None),
        };

        self.path.clear();
        self.path.push_str(path);

        let Some(query) = query else {
            return;
        };
        for pair in query.split('&') {
            if let Some((key, value)) = pair.split_once('=') {
                self.params.insert(key.to_string(), value.to_string());
            }
        }
    }

    /// Agrega un header; si ya existía se sobrescribe
    pub fn add_header(&mut self, name: &str, value: &str) {
        self.headers.insert(name.to_string(), value.to_string());
    }

    /// Reemplaza el body (copia)
    pub fn set_body(&mut self, body: &[u8]) {
        self.body.clear();
        self.body.extend_from_slice(body);
    }

    // === Métodos públicos para acceder a los campos ===

    /// Obtiene el método HTTP del request
    pub fn method(&self) -> &str {
        &self.method
    }

    /// Obtiene el path del request
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Obtiene todos los query parameters
    pub fn params(&self) -> &HashMap<String, String> {
        &self.params
    }

    /// Obtiene un query parameter específico
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(|s| s.as_str())
    }

    /// Obtiene todos los headers
    pub fn headers(&self) -> &HashMap<String, String> {
        &self.headers
    }

    /// Obtiene un header específico (coincidencia exacta)
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(|s| s.as_str())
    }

    /// Obtiene el body del request
    pub fn body(&self) -> &[u8] {
        &self.body
    }
}

/// Lee una línea terminada en CRLF y la deja en `line` sin el delimitador
///
/// Retorna `Ok(false)` si el stream terminó sin entregar ningún byte. Si
/// termina a mitad de línea, lo leído se entrega como la última línea.
/// Un `\n` suelto no cierra la línea.
pub(crate) fn read_line<R: BufRead>(
    reader: &mut R,
    line: &mut Vec<u8>,
) -> Result<bool, ParseError> {
    line.clear();
    loop {
        let budget = (MAX_LINE_LEN + 2).saturating_sub(line.len());
        if budget == 0 {
            return Err(ParseError::LineTooLong);
        }

        let read = reader.by_ref().take(budget as u64).read_until(b'\n', line)?;

        if line.ends_with(b"\r\n") {
            line.truncate(line.len() - 2);
            return Ok(true);
        }
        if read == 0 {
            return Ok(!line.is_empty());
        }
        if !line.ends_with(b"\n") && line.len() < MAX_LINE_LEN + 2 {
            // read_until se detuvo sin delimitador: fin del stream
            return Ok(true);
        }
    }
}

fn as_text(line: &[u8]) -> Result<&str, ParseError> {
    std::str::from_utf8(line).map_err(|_| ParseError::InvalidUtf8)
}

/// Parsea la request line
///
/// Formato: `GET /path?query HTTP/1.1`
fn parse_request_line(line: &str) -> Result<(&str, &str), ParseError> {
    let mut parts = line.split(' ');
    let (Some(method), Some(target), Some(version), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Err(ParseError::InvalidRequestLine);
    };

    if version != HTTP_VERSION {
        return Err(ParseError::InvalidHttpVersion(version.to_string()));
    }

    Ok((method, target))
}
