//! # Pool de Workers
//! src/pool/worker.rs
//!
//! Conjunto acotado de threads reutilizables. Cada worker es un loop
//! bloqueado sobre su propio buzón de capacidad 1:
//!
//! ```text
//! submit(conn) ──► idle.pop() ──► buzón del worker ──► handler(conn)
//!        │                                               │
//!        └─► (sin idle y workers < límite) spawn          ▼
//!        └─► (saturado) Err(conn)            idle.push(slot, last_used)
//! ```
//!
//! Un reaper en segundo plano despierta cada `sweep_interval` y manda el
//! mensaje `Shutdown` a los workers inactivos por más de `max_idle`.
//!
//! ## Invariantes
//!
//! - `workers <= concurrency` en todo momento.
//! - La lista `idle` solo crece por el final y cada slot se sella con
//!   `Instant::now()` DENTRO del lock, así que está ordenada por
//!   `last_used` ascendente. El reaper depende de eso para la búsqueda
//!   binaria.
//! - Nunca se hace I/O ni se envía a un buzón con el lock tomado.

use std::sync::mpsc::{self, Receiver, SyncSender, TrySendError};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::thread;
use std::time::{Duration, Instant};

use crate::error::ServeError;
use crate::logging::Logger;

/// Función que atiende una conexión completa
///
/// La conexión se consume: al terminar el handler queda cerrada.
pub type ConnHandler<C> = Arc<dyn Fn(C) -> Result<(), ServeError> + Send + Sync>;

/// Límite por defecto de workers simultáneos
pub const DEFAULT_CONCURRENCY: usize = 256 * 1024;

/// Intervalo por defecto del reaper y umbral de inactividad
pub const DEFAULT_MAX_IDLE: Duration = Duration::from_secs(2);

/// Stack de cada worker; con cientos de miles de workers los 2 MiB por
/// defecto de std no entran en memoria
pub const DEFAULT_STACK_SIZE: usize = 256 * 1024;

/// Configuración del pool
#[derive(Debug, Clone, Copy)]
pub struct PoolConfig {
    /// Máximo de workers vivos (y por lo tanto de conexiones en proceso)
    pub concurrency: usize,

    /// Un worker inactivo más tiempo que esto se elimina
    pub max_idle: Duration,

    /// Cada cuánto despierta el reaper
    pub sweep_interval: Duration,

    /// Tamaño del stack de cada thread worker, en bytes
    pub stack_size: usize,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            max_idle: DEFAULT_MAX_IDLE,
            sweep_interval: DEFAULT_MAX_IDLE,
            stack_size: DEFAULT_STACK_SIZE,
        }
    }
}

/// Foto del estado del pool
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolStats {
    pub concurrency: usize,
    pub workers: usize,
    pub idle: usize,
}

impl PoolStats {
    /// Workers que no están en la lista idle
    pub fn busy(&self) -> usize {
        self.workers.saturating_sub(self.idle)
    }
}

enum Message<C> {
    Serve(C),
    Shutdown,
}

/// Identidad de un worker inactivo: su buzón y cuándo quedó libre
struct WorkerSlot<C> {
    id: u64,
    sender: SyncSender<Message<C>>,
    last_used: Instant,
}

struct PoolState<C> {
    workers: usize,
    idle: Vec<WorkerSlot<C>>,
    next_id: u64,
}

struct Shared<C> {
    handler: ConnHandler<C>,
    config: PoolConfig,
    state: Mutex<PoolState<C>>,
    logger: Logger,
}

impl<C> Shared<C> {
    fn lock(&self) -> MutexGuard<'_, PoolState<C>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn stats(&self) -> PoolStats {
        let state = self.lock();
        PoolStats {
            concurrency: self.config.concurrency,
            workers: state.workers,
            idle: state.idle.len(),
        }
    }

    fn reap(&self) -> usize {
        let Some(critical) = Instant::now().checked_sub(self.config.max_idle) else {
            return 0;
        };

        let stale: Vec<WorkerSlot<C>> = {
            let mut state = self.lock();
            // `idle` está ordenada por last_used: los vencidos son un prefijo
            let expired = state.idle.partition_point(|slot| slot.last_used < critical);
            if expired == 0 {
                return 0;
            }
            state.idle.drain(..expired).collect()
        };

        for slot in &stale {
            // buzón vacío (el worker estaba idle): nunca bloquea
            if slot.sender.try_send(Message::Shutdown).is_err() {
                self.logger
                    .debug(format_args!("worker {} already gone while reaping", slot.id));
            }
        }

        self.logger
            .debug(format_args!("reaped {} idle workers", stale.len()));
        stale.len()
    }
}

/// Descuenta al worker cuando su thread termina, incluso por panic
struct WorkerExit<'a, C> {
    shared: &'a Shared<C>,
    id: u64,
}

impl<C> Drop for WorkerExit<'_, C> {
    fn drop(&mut self) {
        let mut state = self.shared.lock();
        state.workers = state.workers.saturating_sub(1);
        drop(state);
        self.shared
            .logger
            .debug(format_args!("worker {} stopped", self.id));
    }
}

/// Pool acotado de workers reutilizables
pub struct WorkerPool<C> {
    shared: Arc<Shared<C>>,
}

impl<C: Send + 'static> WorkerPool<C> {
    /// Registra el handler y el límite, y lanza el reaper
    pub fn start(handler: ConnHandler<C>, config: PoolConfig, logger: Logger) -> Self {
        let shared = Arc::new(Shared {
            handler,
            config,
            state: Mutex::new(PoolState {
                workers: 0,
                idle: Vec::new(),
                next_id: 0,
            }),
            logger,
        });

        Self::spawn_reaper(Arc::downgrade(&shared), config.sweep_interval, logger);

        Self { shared }
    }

    /// Entrega la conexión a un worker libre o a uno nuevo
    ///
    /// Nunca bloquea. Si el pool está saturado devuelve la conexión en
    /// `Err` para que el llamador la rechace.
    pub fn submit(&self, conn: C) -> Result<(), C> {
        let assigned = {
            let mut state = self.shared.lock();
            if let Some(slot) = state.idle.pop() {
                Assigned::Idle(slot.sender)
            } else if state.workers < self.shared.config.concurrency {
                state.workers += 1;
                state.next_id += 1;
                Assigned::Spawn(state.next_id)
            } else {
                return Err(conn);
            }
        };

        let sender = match assigned {
            Assigned::Idle(sender) => sender,
            Assigned::Spawn(id) => match self.spawn_worker(id) {
                Some(sender) => sender,
                None => return Err(conn),
            },
        };

        match sender.try_send(Message::Serve(conn)) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(message)) | Err(TrySendError::Disconnected(message)) => {
                match message {
                    Message::Serve(conn) => Err(conn),
                    Message::Shutdown => Ok(()),
                }
            }
        }
    }

    /// Elimina los workers inactivos por más de `max_idle`
    ///
    /// Retorna cuántos workers se mandaron a terminar.
    pub fn reap(&self) -> usize {
        self.shared.reap()
    }

    pub fn stats(&self) -> PoolStats {
        self.shared.stats()
    }

    /// Lector de estadísticas que no mantiene vivo al pool
    ///
    /// Devuelve `None` una vez que el pool y todos sus workers terminaron.
    pub fn stats_reader(&self) -> impl Fn() -> Option<PoolStats> + Send + Sync + 'static {
        let shared = Arc::downgrade(&self.shared);
        move || shared.upgrade().map(|shared| shared.stats())
    }

    pub fn config(&self) -> PoolConfig {
        self.shared.config
    }

    fn spawn_worker(&self, id: u64) -> Option<SyncSender<Message<C>>> {
        let (sender, receiver) = mpsc::sync_channel(1);
        let shared = Arc::clone(&self.shared);
        let own_sender = sender.clone();

        let spawned = thread::Builder::new()
            .name(format!("worker-{}", id))
            .stack_size(self.shared.config.stack_size)
            .spawn(move || Self::worker_loop(&shared, id, own_sender, receiver));

        match spawned {
            Ok(_) => {
                self.shared.logger.debug(format_args!("worker {} started", id));
                Some(sender)
            }
            Err(e) => {
                let mut state = self.shared.lock();
                state.workers = state.workers.saturating_sub(1);
                drop(state);
                self.shared
                    .logger
                    .warn(format_args!("failed to spawn worker {}: {}", id, e));
                None
            }
        }
    }

    /// Loop principal del worker
    fn worker_loop(
        shared: &Shared<C>,
        id: u64,
        sender: SyncSender<Message<C>>,
        receiver: Receiver<Message<C>>,
    ) {
        let _exit = WorkerExit { shared, id };

        while let Ok(Message::Serve(conn)) = receiver.recv() {
            if let Err(e) = (shared.handler)(conn) {
                if !e.is_end_of_stream() {
                    shared
                        .logger
                        .debug(format_args!("worker {}: error serving connection: {}", id, e));
                }
            }

            let mut state = shared.lock();
            state.idle.push(WorkerSlot {
                id,
                sender: sender.clone(),
                last_used: Instant::now(),
            });
        }
    }

    fn spawn_reaper(shared: Weak<Shared<C>>, interval: Duration, logger: Logger) {
        let spawned = thread::Builder::new()
            .name("pool-reaper".to_string())
            .spawn(move || loop {
                thread::sleep(interval);
                // Sin pool ni workers vivos ya no hay nada que limpiar
                let Some(shared) = shared.upgrade() else {
                    break;
                };
                shared.reap();
            });

        if let Err(e) = spawned {
            logger.warn(format_args!("idle reaper not started: {}", e));
        }
    }
}

enum Assigned<C> {
    Idle(SyncSender<Message<C>>),
    Spawn(u64),
}
