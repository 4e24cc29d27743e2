//! Reader/writer gate around a session handle.
//!
//! Operations hold a shared token for their whole duration. Release takes
//! the exclusive side, so it waits for in-flight operations, tears the
//! session down once, and leaves the gate permanently closed.

use crate::error::{SdkError, SdkResult};
use parking_lot::{RwLock, RwLockReadGuard};
use std::ops::Deref;
use std::sync::atomic::{AtomicBool, Ordering};

#[derive(Debug)]
enum GateState<S> {
    Open(S),
    Released,
}

/// Guards a session value `S` against use after release.
#[derive(Debug)]
pub(crate) struct Gate<S> {
    state: RwLock<GateState<S>>,
    // Mirrors `state`; readable without the lock.
    released: AtomicBool,
}

/// Shared token proving the session is open.
///
/// Release blocks until every token is dropped.
pub(crate) struct SessionGuard<'a, S> {
    _guard: RwLockReadGuard<'a, GateState<S>>,
    session: S,
}

impl<S: Copy> Gate<S> {
    /// Creates an open gate.
    pub(crate) fn new(session: S) -> Self {
        Self {
            state: RwLock::new(GateState::Open(session)),
            released: AtomicBool::new(false),
        }
    }

    /// Acquires a shared token.
    ///
    /// New tokens queue behind a pending release, so a steady stream of
    /// operations cannot starve `release`. Tokens must not be nested.
    pub(crate) fn enter(&self) -> SdkResult<SessionGuard<'_, S>> {
        let guard = self.state.read();
        match *guard {
            GateState::Open(session) => Ok(SessionGuard {
                _guard: guard,
                session,
            }),
            GateState::Released => Err(SdkError::ContextClosed),
        }
    }

    /// Closes the gate, running `teardown` on the session the first time.
    ///
    /// Returns true if this call performed the teardown.
    pub(crate) fn release(&self, teardown: impl FnOnce(S)) -> bool {
        let mut state = self.state.write();
        match std::mem::replace(&mut *state, GateState::Released) {
            GateState::Open(session) => {
                self.released.store(true, Ordering::Release);
                teardown(session);
                true
            }
            GateState::Released => false,
        }
    }

    /// Returns true once the gate is closed.
    ///
    /// Does not take the lock, so it is safe to call while holding a token
    /// on this or any other gate.
    pub(crate) fn is_released(&self) -> bool {
        self.released.load(Ordering::Acquire)
    }
}

impl<S> Deref for SessionGuard<'_, S> {
    type Target = S;

    fn deref(&self) -> &S {
        &self.session
    }
}
