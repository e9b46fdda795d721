//! # Módulo HTTP
//!
//! Codec mínimo de HTTP/1.1 implementado desde cero, sin librerías de
//! alto nivel:
//!
//! - Parsing incremental de requests desde un `BufRead` (soporta pipelining)
//! - Serialización de responses con framing por `Content-Length`
//! - Códigos de estado y frases de razón
//!
//! No hay chunked transfer encoding, ni `Expect: 100-continue`, ni TLS.
//!
//! ### Formato de Request
//!
//! ```text
//! GET /path?query=value HTTP/1.1\r\n
//! Header-Name: Header-Value\r\n
//! \r\n
//! ```
//!
//! ### Formato de Response
//!
//! ```text
//! HTTP/1.1 200 OK\r\n
//! Server: poolserve/0.1.0\r\n
//! Content-Length: 12\r\n
//! Content-Type: application/json\r\n
//! \r\n
//! {"ok": true}
//! ```

pub mod request;   // Parsing de HTTP requests
pub mod response;  // Construcción de HTTP responses
pub mod status;    // Códigos de estado HTTP

// Re-exportamos los tipos principales para facilitar su uso
pub use request::{ParseError, Request};
pub use response::{format_response, Response};
pub use status::StatusCode;
