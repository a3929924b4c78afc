//! Transmit lock abstraction
//!
//! A scheduler port implements [`TransmitLock`] on top of its own mutex. The
//! crate ships [`SpinTransmitLock`] for bare-metal builds without a scheduler
//! and for host tests.

use core::hint::spin_loop;

use spin::Mutex;

/// How long a caller is willing to wait for the transmit lock.
///
/// Scheduler mutexes usually take a tick count where `0` means "block until
/// available" and a negative value means "do not block". The enum spells
/// both out so call sites cannot confuse them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitPolicy {
    /// Block until the lock becomes available.
    Forever,
    /// Fail with [`LockError::WouldBlock`] if the lock is held.
    NoWait,
    /// Retry for a bounded number of ticks, then fail with [`LockError::Timeout`].
    Ticks(u32),
}

impl Default for WaitPolicy {
    fn default() -> Self {
        Self::Forever
    }
}

/// Error type for transmit lock operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockError {
    /// The lock is held and the caller asked not to wait.
    WouldBlock,
    /// The wait budget ran out before the lock was released.
    Timeout,
    /// The scheduler could not create the lock.
    CreateFailed,
}

impl core::fmt::Display for LockError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::WouldBlock => write!(f, "lock held, caller would block"),
            Self::Timeout => write!(f, "timed out waiting for lock"),
            Self::CreateFailed => write!(f, "lock creation failed"),
        }
    }
}

/// Exclusive lock guarding the transmitter.
///
/// Implementations need not be reentrant: the driver acquires the lock
/// once per logical write and never while already holding it.
pub trait TransmitLock {
    /// Create a new, unlocked instance.
    fn create() -> Result<Self, LockError>
    where
        Self: Sized;

    /// Acquire the lock according to `wait`.
    fn acquire(&self, wait: WaitPolicy) -> Result<(), LockError>;

    /// Release the lock.
    ///
    /// # Safety
    /// The caller must currently hold the lock through a successful
    /// [`TransmitLock::acquire`].
    unsafe fn release(&self);
}

/// RAII ownership of a [`TransmitLock`].
///
/// The lock is released when the guard goes out of scope.
pub struct TransmitGuard<'a, L: TransmitLock> {
    lock: &'a L,
}

impl<'a, L: TransmitLock> TransmitGuard<'a, L> {
    /// Acquire `lock` with the given wait policy.
    pub fn acquire(lock: &'a L, wait: WaitPolicy) -> Result<Self, LockError> {
        lock.acquire(wait)?;
        Ok(Self { lock })
    }
}

impl<L: TransmitLock> Drop for TransmitGuard<'_, L> {
    fn drop(&mut self) {
        // SAFETY: A guard only exists after a successful acquire
        unsafe { self.lock.release() }
    }
}

/// Spinning implementation of [`TransmitLock`] backed by `spin::Mutex`.
///
/// One tick of [`WaitPolicy::Ticks`] is one failed acquisition attempt.
pub struct SpinTransmitLock {
    inner: Mutex<()>,
}

impl SpinTransmitLock {
    /// Create an unlocked instance in const context.
    pub const fn new() -> Self {
        Self {
            inner: Mutex::new(()),
        }
    }

    /// Returns true if some caller currently holds the lock.
    pub fn is_locked(&self) -> bool {
        self.inner.is_locked()
    }

    fn try_take(&self) -> bool {
        match self.inner.try_lock() {
            Some(guard) => {
                // Ownership is tracked by TransmitGuard, not by spin's guard
                core::mem::forget(guard);
                true
            }
            None => false,
        }
    }
}

impl Default for SpinTransmitLock {
    fn default() -> Self {
        Self::new()
    }
}

impl TransmitLock for SpinTransmitLock {
    fn create() -> Result<Self, LockError> {
        Ok(Self::new())
    }

    fn acquire(&self, wait: WaitPolicy) -> Result<(), LockError> {
        match wait {
            WaitPolicy::Forever => {
                core::mem::forget(self.inner.lock());
                Ok(())
            }
            WaitPolicy::NoWait => {
                if self.try_take() {
                    Ok(())
                } else {
                    Err(LockError::WouldBlock)
                }
            }
            WaitPolicy::Ticks(ticks) => {
                if self.try_take() {
                    return Ok(());
                }
                for _ in 0..ticks {
                    spin_loop();
                    if self.try_take() {
                        return Ok(());
                    }
                }
                Err(LockError::Timeout)
            }
        }
    }

    unsafe fn release(&self) {
        // SAFETY: Caller holds the lock, whose spin guard was forgotten in acquire
        unsafe { self.inner.force_unlock() }
    }
}
