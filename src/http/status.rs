//! # Códigos de Estado HTTP
//!
//! Este módulo define los códigos de estado que usa el servidor.
//! A diferencia de un enum cerrado, el código es un número libre: los
//! handlers pueden responder con cualquier valor y el codec solo conoce
//! la frase de razón de unos pocos.
//!
//! - **2xx**: Éxito (200 OK)
//! - **4xx**: Error del cliente (404)
//! - **5xx**: Error del servidor (501, 503)

/// Código de estado HTTP
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StatusCode(u16);

impl StatusCode {
    /// 200 OK - La petición fue exitosa
    pub const OK: StatusCode = StatusCode(200);

    /// 404 Not Found - Ruta o recurso no encontrado
    pub const NOT_FOUND: StatusCode = StatusCode(404);

    /// 501 Not Implemented - Método no soportado por la ruta
    pub const NOT_IMPLEMENTED: StatusCode = StatusCode(501);

    /// 503 Service Unavailable - Pool saturado o fallo del handler
    pub const SERVICE_UNAVAILABLE: StatusCode = StatusCode(503);

    /// Crea un código a partir de su valor numérico
    pub const fn from_u16(code: u16) -> Self {
        StatusCode(code)
    }

    /// Convierte el código a su valor numérico
    ///
    /// # Ejemplo
    /// ```
    /// use poolserve::http::StatusCode;
    /// assert_eq!(StatusCode::OK.as_u16(), 200);
    /// ```
    pub fn as_u16(&self) -> u16 {
        self.0
    }

    /// Retorna el texto de razón (reason phrase) asociado al código
    ///
    /// Cualquier código fuera de la tabla se anuncia como "Unknown".
    ///
    /// # Ejemplo
    /// ```
    /// use poolserve::http::StatusCode;
    /// assert_eq!(StatusCode::OK.reason_phrase(), "OK");
    /// assert_eq!(StatusCode::from_u16(418).reason_phrase(), "Unknown");
    /// ```
    pub fn reason_phrase(&self) -> &'static str {
        match self.0 {
            200 => "OK",
            404 => "Not Found",
            501 => "Not Implemented",
            503 => "Service Unavailable",
            _ => "Unknown",
        }
    }
}

impl Default for StatusCode {
    fn default() -> Self {
        StatusCode::OK
    }
}

impl From<u16> for StatusCode {
    fn from(code: u16) -> Self {
        StatusCode(code)
    }
}

impl std::fmt::Display for StatusCode {
    /// Formato: "200 OK"
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.0, self.reason_phrase())
    }
}
