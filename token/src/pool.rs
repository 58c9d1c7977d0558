//! Bounded pool of reusable token instances.
//!
//! The pool hands out shared handles from an available set, grows lazily
//! from a template up to a fixed ceiling, and blocks callers once every
//! instance is checked out. At every instant
//! `available + used == current_size <= max_size`.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex, RwLock};
use pwt_map::ConcurrentMap;

use crate::error::PoolError;
use crate::instance::TokenInstance;

/// Condvar wait state shared by the pool and its cancel tokens.
#[derive(Debug, Default)]
struct WaitState {
    lock: Mutex<()>,
    cv: Condvar,
}

/// Sticky cancellation handle for [`TokenInstancePool::get_cancellable`].
///
/// Cloning yields another handle to the same flag. Once cancelled, every
/// wait through this token fails immediately, including waits started
/// after the cancellation.
#[derive(Debug, Clone)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
    wait: Arc<WaitState>,
}

impl CancelToken {
    /// Cancel every current and future wait on this token.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
        let _guard = self.wait.lock.lock();
        self.wait.cv.notify_all();
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Fixed-ceiling pool of [`TokenInstance`] handles cloned from a template.
#[derive(Debug)]
pub struct TokenInstancePool {
    template: TokenInstance,
    max_size: usize,
    current_size: AtomicUsize,
    available: ConcurrentMap<usize, Arc<TokenInstance>>,
    used: ConcurrentMap<usize, Arc<TokenInstance>>,
    // Shared for get/put, exclusive for copy_algorithm. Never held while
    // sleeping on the condvar.
    gate: RwLock<()>,
    wait: Arc<WaitState>,
}

fn identity(instance: &Arc<TokenInstance>) -> usize {
    Arc::as_ptr(instance) as usize
}

impl TokenInstancePool {
    /// Build a pool over clones of `template`, pre-filling half the
    /// ceiling.
    ///
    /// A zero `max_size` is raised to 1 so `get` can always be satisfied.
    #[must_use]
    pub fn new(template: TokenInstance, max_size: usize) -> Self {
        let max_size = max_size.max(1);
        let available = ConcurrentMap::new();
        let prefill = max_size / 2;
        for _ in 0..prefill {
            let instance = Arc::new(template.clone());
            available.store(identity(&instance), instance);
        }
        tracing::debug!(max_size, prefill, "token pool created");
        Self {
            template,
            max_size,
            current_size: AtomicUsize::new(prefill),
            available,
            used: ConcurrentMap::new(),
            gate: RwLock::new(()),
            wait: Arc::new(WaitState::default()),
        }
    }

    /// Check out an instance, blocking while the pool is saturated.
    pub fn get(&self) -> Arc<TokenInstance> {
        loop {
            if let Some(instance) = self.try_acquire() {
                return instance;
            }
            let mut guard = self.wait.lock.lock();
            // Recheck under the wait lock: a put between the failed
            // acquire and this point must not be slept through.
            if let Some(instance) = self.try_acquire() {
                return instance;
            }
            self.wait.cv.wait(&mut guard);
        }
    }

    /// Check out an instance, giving up after `timeout`.
    ///
    /// # Errors
    ///
    /// [`PoolError::Timeout`] when the pool stays saturated past the
    /// deadline.
    pub fn get_timeout(&self, timeout: Duration) -> Result<Arc<TokenInstance>, PoolError> {
        let deadline = Instant::now() + timeout;
        loop {
            if let Some(instance) = self.try_acquire() {
                return Ok(instance);
            }
            let mut guard = self.wait.lock.lock();
            if let Some(instance) = self.try_acquire() {
                return Ok(instance);
            }
            if self.wait.cv.wait_until(&mut guard, deadline).timed_out() {
                // One last look so a wakeup racing the deadline still wins.
                return self.try_acquire().ok_or(PoolError::Timeout);
            }
        }
    }

    /// Check out an instance, giving up when `token` is cancelled.
    ///
    /// # Errors
    ///
    /// [`PoolError::Cancelled`] once the token is cancelled, including
    /// for waits started after the cancellation.
    pub fn get_cancellable(&self, token: &CancelToken) -> Result<Arc<TokenInstance>, PoolError> {
        loop {
            if token.is_cancelled() {
                return Err(PoolError::Cancelled);
            }
            if let Some(instance) = self.try_acquire() {
                return Ok(instance);
            }
            let mut guard = self.wait.lock.lock();
            if token.is_cancelled() {
                return Err(PoolError::Cancelled);
            }
            if let Some(instance) = self.try_acquire() {
                return Ok(instance);
            }
            self.wait.cv.wait(&mut guard);
        }
    }

    /// A cancel token wired to this pool's wait state.
    #[must_use]
    pub fn cancel_token(&self) -> CancelToken {
        CancelToken {
            cancelled: Arc::new(AtomicBool::new(false)),
            wait: Arc::clone(&self.wait),
        }
    }

    /// Return a previously checked-out instance.
    ///
    /// Handles not currently in the used set are ignored, so a foreign
    /// handle or a second put of the same handle is a harmless no-op.
    pub fn put(&self, instance: &Arc<TokenInstance>) {
        let key = identity(instance);
        {
            // The gate covers only the used->available move. Waiters take
            // the gate inside try_acquire while holding the wait mutex, so
            // holding it across the lock below would invert that order and
            // wedge against a queued gate writer.
            let _gate = self.gate.read();
            let Some(returned) = self.used.take(&key) else {
                tracing::warn!(key, "put of a handle the pool does not hold, ignored");
                return;
            };
            self.available.store(key, returned);
        }
        // Notify under the wait lock so the wakeup cannot land between a
        // waiter's predicate check and its sleep.
        let _guard = self.wait.lock.lock();
        self.wait.cv.notify_one();
    }

    /// Broadcast a clone of `source`'s algorithm to every idle instance.
    ///
    /// Checked-out instances are skipped; they pick up the new material
    /// only if the broadcast is repeated after they come back.
    pub fn copy_algorithm(&self, source: &TokenInstance) {
        let _gate = self.gate.write();
        self.template.copy_algorithm(source);
        self.available.range(|_, instance| {
            instance.copy_algorithm(source);
        });
        tracing::debug!(count = self.available.len(), "algorithm broadcast to idle instances");
    }

    #[must_use]
    pub fn max_size(&self) -> usize {
        self.max_size
    }

    #[must_use]
    pub fn current_size(&self) -> usize {
        self.current_size.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn available_size(&self) -> usize {
        self.available.len()
    }

    #[must_use]
    pub fn used_size(&self) -> usize {
        self.used.len()
    }

    fn try_acquire(&self) -> Option<Arc<TokenInstance>> {
        let _gate = self.gate.read();
        if let Some((key, instance)) = self.available.pair_begin() {
            self.used.store(key, Arc::clone(&instance));
            tracing::debug!(key, "instance checked out");
            return Some(instance);
        }
        self.try_grow()
    }

    /// Mint a new instance if the ceiling allows. The compare-exchange
    /// claims a slot before the clone is built, so concurrent growers can
    /// never push `current_size` past `max_size`.
    fn try_grow(&self) -> Option<Arc<TokenInstance>> {
        let mut current = self.current_size.load(Ordering::SeqCst);
        loop {
            if current >= self.max_size {
                return None;
            }
            match self.current_size.compare_exchange(
                current,
                current + 1,
                Ordering::SeqCst,
                Ordering::SeqCst,
            ) {
                Ok(_) => break,
                Err(observed) => current = observed,
            }
        }
        let instance = Arc::new(self.template.clone());
        self.used.store(identity(&instance), Arc::clone(&instance));
        tracing::debug!(size = current + 1, "pool grew by one instance");
        Some(instance)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    fn pool(max: usize) -> TokenInstancePool {
        TokenInstancePool::new(TokenInstance::new().unwrap(), max)
    }

    #[test]
    fn prefills_half_the_ceiling() {
        let pool = pool(8);
        assert_eq!(pool.max_size(), 8);
        assert_eq!(pool.current_size(), 4);
        assert_eq!(pool.available_size(), 4);
        assert_eq!(pool.used_size(), 0);
    }

    #[test]
    fn zero_ceiling_is_raised_to_one() {
        let pool = pool(0);
        assert_eq!(pool.max_size(), 1);
        let handle = pool.get();
        pool.put(&handle);
    }

    #[test]
    fn get_grows_to_the_ceiling_and_no_further() {
        let pool = pool(4);
        let handles: Vec<_> = (0..4).map(|_| pool.get()).collect();
        assert_eq!(pool.current_size(), 4);
        assert_eq!(pool.used_size(), 4);
        assert_eq!(pool.available_size(), 0);
        assert!(matches!(
            pool.get_timeout(Duration::from_millis(50)),
            Err(PoolError::Timeout)
        ));
        for handle in &handles {
            pool.put(handle);
        }
        assert_eq!(pool.available_size(), 4);
    }

    #[test]
    fn put_of_a_foreign_handle_is_ignored() {
        let pool = pool(2);
        let foreign = Arc::new(TokenInstance::new().unwrap());
        pool.put(&foreign);
        assert_eq!(pool.available_size(), 1);
        assert_eq!(pool.used_size(), 0);
    }

    #[test]
    fn double_put_is_ignored() {
        let pool = pool(2);
        let handle = pool.get();
        pool.put(&handle);
        pool.put(&handle);
        assert_eq!(pool.available_size() + pool.used_size(), pool.current_size());
    }

    #[test]
    fn cancel_is_sticky() {
        let pool = pool(1);
        let _held = pool.get();
        let token = pool.cancel_token();
        token.cancel();
        assert!(matches!(pool.get_cancellable(&token), Err(PoolError::Cancelled)));
        assert!(matches!(pool.get_cancellable(&token), Err(PoolError::Cancelled)));
    }

    #[test]
    fn broadcast_reaches_idle_instances() {
        let pool = pool(4);
        let checked_out = pool.get();
        let source = TokenInstance::new().unwrap();
        pool.copy_algorithm(&source);

        let signed = source.encode().unwrap();
        let idle = pool.get();
        assert!(idle.is_token_valid(&signed));
        assert!(!checked_out.is_token_valid(&signed));
    }
}
