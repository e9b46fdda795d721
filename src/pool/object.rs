//! # Pool de objetos reutilizables
//! src/pool/object.rs
//!
//! Pool acotado con `acquire`/`release` explícitos. Se usa para los
//! contextos de conexión y los buffers de lectura: cada conexión toma uno
//! al empezar y lo devuelve al cerrarse.
//!
//! El pool puede descartar un objeto en vez de retenerlo (cuando ya tiene
//! `max_retained`), así que nadie debe asumir que `acquire` devuelve la
//! misma instancia que se liberó antes. También descarta los objetos que
//! no pasan el filtro de retención (por ejemplo, buffers que crecieron
//! demasiado).

use std::sync::{Mutex, MutexGuard, PoisonError};

/// Pool thread-safe de objetos del tipo `T`
pub struct ObjectPool<T> {
    items: Mutex<Vec<T>>,
    max_retained: usize,
    factory: fn() -> T,
    keep: fn(&T) -> bool,
}

fn keep_all<T>(_item: &T) -> bool {
    true
}

impl<T> ObjectPool<T> {
    /// Crea un pool vacío que retiene como máximo `max_retained` objetos
    pub fn new(max_retained: usize, factory: fn() -> T) -> Self {
        Self::with_filter(max_retained, factory, keep_all::<T>)
    }

    /// Como `new`, pero solo retiene los objetos para los que `keep` es `true`
    pub fn with_filter(max_retained: usize, factory: fn() -> T, keep: fn(&T) -> bool) -> Self {
        Self {
            items: Mutex::new(Vec::new()),
            max_retained,
            factory,
            keep,
        }
    }

    /// Toma un objeto retenido o crea uno nuevo
    pub fn acquire(&self) -> T {
        let reused = self.lock().pop();
        reused.unwrap_or_else(self.factory)
    }

    /// Devuelve un objeto al pool
    ///
    /// Retorna `false` si el objeto se descartó: el pool estaba lleno o
    /// el filtro de retención lo rechazó.
    pub fn release(&self, item: T) -> bool {
        if !(self.keep)(&item) {
            return false;
        }
        let mut items = self.lock();
        if items.len() >= self.max_retained {
            return false;
        }
        items.push(item);
        true
    }

    /// Número de objetos retenidos en este momento
    pub fn retained(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<T>> {
        self.items.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_acquire_creates_when_empty() {
        let pool: ObjectPool<Vec<u8>> = ObjectPool::new(4, Vec::new);
        let item = pool.acquire();
        assert!(item.is_empty());
        assert_eq!(pool.retained(), 0);
    }

    #[test]
    fn test_release_retains_up_to_limit() {
        let pool: ObjectPool<Vec<u8>> = ObjectPool::new(2, Vec::new);

        assert!(pool.release(Vec::new()));
        assert!(pool.release(Vec::new()));
        assert!(!pool.release(Vec::new()));
        assert_eq!(pool.retained(), 2);

        let _a = pool.acquire();
        assert_eq!(pool.retained(), 1);
    }

    #[test]
    fn test_zero_retention_discards_everything() {
        let pool: ObjectPool<String> = ObjectPool::new(0, String::new);
        assert!(!pool.release(String::from("x")));
        assert_eq!(pool.retained(), 0);
    }

    #[test]
    fn test_filter_drops_grown_items() {
        let pool: ObjectPool<Vec<u8>> =
            ObjectPool::with_filter(4, Vec::new, |buf: &Vec<u8>| buf.capacity() <= 1024);

        let mut big = pool.acquire();
        big.reserve(64 * 1024);
        big.clear();
        assert!(!pool.release(big));
        assert_eq!(pool.retained(), 0);

        assert!(pool.release(Vec::with_capacity(16)));
        assert!(pool.acquire().capacity() <= 1024);
    }

    #[test]
    fn test_concurrent_use() {
        use std::sync::Arc;
        use std::thread;

        let pool: Arc<ObjectPool<Vec<u8>>> = Arc::new(ObjectPool::new(8, Vec::new));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let pool = Arc::clone(&pool);
                thread::spawn(move || {
                    for _ in 0..100 {
                        let item = pool.acquire();
                        pool.release(item);
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }
        assert!(pool.retained() <= 8);
    }
}
