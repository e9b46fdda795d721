//! # Lectura y escritura con deadline
//! src/server/reader.rs
//!
//! `ReadBuffer` es el buffer que se toma del pool por conexión.
//! `ConnReader` lo combina con el socket y un deadline ABSOLUTO: antes de
//! cada `read` recalcula cuánto tiempo queda, así un cliente que manda
//! un byte cada tanto no logra estirar el plazo.

use std::io::{self, BufRead, Read, Write};
use std::net::TcpStream;
use std::time::{Duration, Instant};

/// Tamaño del buffer de lectura por conexión
pub const READ_BUFFER_SIZE: usize = 4096;

/// Buffer de lectura reutilizable entre conexiones
#[derive(Debug)]
pub struct ReadBuffer {
    buf: Box<[u8]>,
    pos: usize,
    filled: usize,
}

impl ReadBuffer {
    pub fn new() -> Self {
        Self::with_capacity(READ_BUFFER_SIZE)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: vec![0; capacity.max(1)].into_boxed_slice(),
            pos: 0,
            filled: 0,
        }
    }

    /// Descarta los bytes pendientes (antes de volver al pool)
    pub fn clear(&mut self) {
        self.pos = 0;
        self.filled = 0;
    }

    /// Bytes leídos del socket y todavía no consumidos
    pub fn buffered(&self) -> &[u8] {
        &self.buf[self.pos..self.filled]
    }
}

impl Default for ReadBuffer {
    fn default() -> Self {
        Self::new()
    }
}

/// Lector con buffer sobre un socket prestado
pub struct ConnReader<'a> {
    buffer: &'a mut ReadBuffer,
    stream: &'a TcpStream,
    deadline: Instant,
}

impl<'a> ConnReader<'a> {
    pub fn new(buffer: &'a mut ReadBuffer, stream: &'a TcpStream, deadline: Instant) -> Self {
        Self { buffer, stream, deadline }
    }

    /// Mira el próximo byte sin consumirlo
    ///
    /// Solo sirve para detectar si el cliente sigue vivo: falla con
    /// `UnexpectedEof` si cerró y con `TimedOut`/`WouldBlock` si venció
    /// el deadline.
    pub fn peek(&mut self) -> io::Result<u8> {
        loop {
            match self.fill_buf() {
                Ok(bytes) => {
                    return bytes
                        .first()
                        .copied()
                        .ok_or_else(|| io::Error::from(io::ErrorKind::UnexpectedEof));
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
    }
}

impl Read for ConnReader<'_> {
    fn read(&mut self, out: &mut [u8]) -> io::Result<usize> {
        let available = self.fill_buf()?;
        let n = available.len().min(out.len());
        out[..n].copy_from_slice(&available[..n]);
        self.consume(n);
        Ok(n)
    }
}

impl BufRead for ConnReader<'_> {
    fn fill_buf(&mut self) -> io::Result<&[u8]> {
        if self.buffer.pos >= self.buffer.filled {
            self.buffer.clear();
            let remaining = remaining_until(self.deadline)?;
            self.stream.set_read_timeout(Some(remaining))?;
            let mut stream = self.stream;
            self.buffer.filled = stream.read(&mut self.buffer.buf)?;
        }
        Ok(self.buffer.buffered())
    }

    fn consume(&mut self, amt: usize) {
        self.buffer.pos = (self.buffer.pos + amt).min(self.buffer.filled);
    }
}

/// Escribe todo `bytes` antes de `deadline`
pub fn write_all_before(stream: &TcpStream, mut bytes: &[u8], deadline: Instant) -> io::Result<()> {
    let mut writer = stream;
    while !bytes.is_empty() {
        let remaining = remaining_until(deadline)?;
        stream.set_write_timeout(Some(remaining))?;
        match writer.write(bytes) {
            Ok(0) => return Err(io::Error::from(io::ErrorKind::WriteZero)),
            Ok(n) => bytes = &bytes[n..],
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(())
}

/// Tiempo que queda hasta el deadline; `TimedOut` si ya pasó
fn remaining_until(deadline: Instant) -> io::Result<Duration> {
    deadline
        .checked_duration_since(Instant::now())
        .filter(|remaining| !remaining.is_zero())
        .ok_or_else(|| io::Error::from(io::ErrorKind::TimedOut))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::Request;
    use std::net::TcpListener;
    use std::thread;

    /// Par de sockets conectados por loopback: (cliente, servidor)
    fn socket_pair() -> (TcpStream, TcpStream) {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
        let client = TcpStream::connect(listener.local_addr().unwrap()).unwrap();
        let (server, _) = listener.accept().unwrap();
        (client, server)
    }

    fn soon() -> Instant {
        Instant::now() + Duration::from_secs(5)
    }

    #[test]
    fn test_peek_does_not_consume() {
        let (mut client, server) = socket_pair();
        client.write_all(b"GET / HTTP/1.1\r\n\r\n").unwrap();

        let mut buffer = ReadBuffer::new();
        let mut reader = ConnReader::new(&mut buffer, &server, soon());

        assert_eq!(reader.peek().unwrap(), b'G');
        assert_eq!(reader.peek().unwrap(), b'G');

        let mut request = Request::new();
        request.read_from(&mut reader).unwrap();
        assert_eq!(request.method(), "GET");
    }

    #[test]
    fn test_peek_reports_eof() {
        let (client, server) = socket_pair();
        drop(client);

        let mut buffer = ReadBuffer::new();
        let mut reader = ConnReader::new(&mut buffer, &server, soon());
        let err = reader.peek().unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }

    #[test]
    fn test_deadline_expires() {
        let (_client, server) = socket_pair();

        let mut buffer = ReadBuffer::new();
        let deadline = Instant::now() + Duration::from_millis(100);
        let mut reader = ConnReader::new(&mut buffer, &server, deadline);

        let started = Instant::now();
        let err = reader.peek().unwrap_err();
        assert!(matches!(
            err.kind(),
            io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut
        ));
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[test]
    fn test_expired_deadline_fails_without_reading() {
        let (mut client, server) = socket_pair();
        client.write_all(b"x").unwrap();

        let mut buffer = ReadBuffer::new();
        let past = Instant::now() - Duration::from_millis(1);
        let mut reader = ConnReader::new(&mut buffer, &server, past);
        assert_eq!(reader.peek().unwrap_err().kind(), io::ErrorKind::TimedOut);
    }

    #[test]
    fn test_trickling_peer_cannot_extend_deadline() {
        let (mut client, server) = socket_pair();

        let writer = thread::spawn(move || {
            for _ in 0..20 {
                if client.write_all(b"a").is_err() {
                    break;
                }
                thread::sleep(Duration::from_millis(50));
            }
        });

        let mut buffer = ReadBuffer::with_capacity(1);
        let deadline = Instant::now() + Duration::from_millis(300);
        let mut reader = ConnReader::new(&mut buffer, &server, deadline);

        let mut line = Vec::new();
        let started = Instant::now();
        assert!(reader.read_until(b'\n', &mut line).is_err());
        assert!(started.elapsed() < Duration::from_millis(900));

        drop(reader);
        drop(server);
        writer.join().unwrap();
    }

    #[test]
    fn test_leftover_bytes_survive_between_readers() {
        let (mut client, server) = socket_pair();
        client
            .write_all(b"GET /a HTTP/1.1\r\n\r\nGET /b HTTP/1.1\r\n\r\n")
            .unwrap();
        thread::sleep(Duration::from_millis(50));

        let mut buffer = ReadBuffer::new();
        let mut request = Request::new();

        {
            let mut reader = ConnReader::new(&mut buffer, &server, soon());
            request.read_from(&mut reader).unwrap();
        }
        assert_eq!(request.path(), "/a");

        request.reset();
        {
            let mut reader = ConnReader::new(&mut buffer, &server, soon());
            request.read_from(&mut reader).unwrap();
        }
        assert_eq!(request.path(), "/b");
    }

    #[test]
    fn test_clear_drops_pending_bytes() {
        let (mut client, server) = socket_pair();
        client.write_all(b"pending").unwrap();

        let mut buffer = ReadBuffer::new();
        {
            let mut reader = ConnReader::new(&mut buffer, &server, soon());
            reader.peek().unwrap();
        }
        assert!(!buffer.buffered().is_empty());

        buffer.clear();
        assert!(buffer.buffered().is_empty());
    }

    #[test]
    fn test_write_all_before() {
        let (mut client, server) = socket_pair();
        write_all_before(&server, b"hello", soon()).unwrap();

        let mut got = [0u8; 5];
        client.read_exact(&mut got).unwrap();
        assert_eq!(&got, b"hello");
    }

    #[test]
    fn test_write_after_deadline_fails() {
        let (_client, server) = socket_pair();
        let past = Instant::now() - Duration::from_millis(1);
        let err = write_all_before(&server, b"late", past).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::TimedOut);
    }
}
