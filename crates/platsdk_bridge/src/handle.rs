//! Ownership of entity handles.
//!
//! Every identity, contract and document wraps an [`OwnedHandle`]. The
//! handle is destroyed exactly once: by an explicit release, or by `Drop`
//! when the owner forgets to release it.

use crate::error::{SdkError, SdkResult};
use crate::native::{NativeCore, RawHandle};
use std::fmt;
use std::sync::Arc;
use tracing::{trace, warn};

/// Kind of native entity behind a handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    /// An identity.
    Identity,
    /// A data contract.
    DataContract,
    /// A document.
    Document,
}

impl EntityKind {
    /// Name used in error messages.
    pub fn name(self) -> &'static str {
        match self {
            EntityKind::Identity => "identity",
            EntityKind::DataContract => "data contract",
            EntityKind::Document => "document",
        }
    }

    fn destroy(self, core: &dyn NativeCore, raw: RawHandle) {
        match self {
            EntityKind::Identity => core.identity_destroy(raw),
            EntityKind::DataContract => core.data_contract_destroy(raw),
            EntityKind::Document => core.document_handle_destroy(raw),
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    Live(RawHandle),
    /// Never had a handle (materialized from search results).
    Detached,
    Released,
}

/// A native handle owned by one host entity.
pub(crate) struct OwnedHandle {
    kind: EntityKind,
    slot: Slot,
    core: Arc<dyn NativeCore>,
}

impl OwnedHandle {
    pub(crate) fn new(core: Arc<dyn NativeCore>, kind: EntityKind, raw: RawHandle) -> Self {
        trace!(%kind, ?raw, "handle acquired");
        Self {
            kind,
            slot: Slot::Live(raw),
            core,
        }
    }

    pub(crate) fn detached(core: Arc<dyn NativeCore>, kind: EntityKind) -> Self {
        Self {
            kind,
            slot: Slot::Detached,
            core,
        }
    }

    pub(crate) fn is_live(&self) -> bool {
        matches!(self.slot, Slot::Live(_))
    }

    pub(crate) fn is_detached(&self) -> bool {
        self.slot == Slot::Detached
    }

    pub(crate) fn is_released(&self) -> bool {
        self.slot == Slot::Released
    }

    /// Returns the live handle for `operation`.
    pub(crate) fn require(&self, operation: &str) -> SdkResult<RawHandle> {
        match self.slot {
            Slot::Live(raw) => Ok(raw),
            Slot::Detached => Err(SdkError::HandleMissing {
                entity: self.kind.name(),
                operation: operation.to_string(),
            }),
            Slot::Released => Err(self.released(operation)),
        }
    }

    /// Returns the live handle for an info read.
    pub(crate) fn require_info(&self) -> SdkResult<RawHandle> {
        match self.slot {
            Slot::Live(raw) => Ok(raw),
            Slot::Detached => Err(SdkError::NoHandle {
                entity: self.kind.name(),
            }),
            Slot::Released => Err(self.released("get info for")),
        }
    }

    /// Returns the live handle of an argument, or a validation error.
    pub(crate) fn require_argument(&self, message: &str) -> SdkResult<RawHandle> {
        match self.slot {
            Slot::Live(raw) => Ok(raw),
            Slot::Detached | Slot::Released => Err(SdkError::validation(message)),
        }
    }

    fn released(&self, operation: &str) -> SdkError {
        SdkError::HandleReleased {
            entity: self.kind.name(),
            operation: operation.to_string(),
        }
    }

    /// Destroys the handle if it is live. Later calls do nothing.
    ///
    /// Returns true if a native handle was destroyed.
    pub(crate) fn release(&mut self) -> bool {
        match std::mem::replace(&mut self.slot, Slot::Released) {
            Slot::Live(raw) => {
                trace!(kind = %self.kind, ?raw, "handle released");
                self.kind.destroy(&*self.core, raw);
                true
            }
            Slot::Detached | Slot::Released => false,
        }
    }
}

impl Drop for OwnedHandle {
    fn drop(&mut self) {
        if let Slot::Live(raw) = self.slot {
            warn!(kind = %self.kind, ?raw, "handle dropped without release, reclaiming");
            self.slot = Slot::Released;
            self.kind.destroy(&*self.core, raw);
        }
    }
}

impl fmt::Debug for OwnedHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OwnedHandle")
            .field("kind", &self.kind)
            .field("slot", &self.slot)
            .finish_non_exhaustive()
    }
}

/// Common lifecycle of host entities backed by a native handle.
pub trait PlatformEntity {
    /// Returns the entity kind.
    fn kind(&self) -> EntityKind;

    /// Returns true while the entity holds a live native handle.
    fn has_handle(&self) -> bool;

    /// Returns true once the entity has been released.
    fn is_released(&self) -> bool;

    /// Releases the native handle. Releasing twice is a no-op.
    fn release(&mut self);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::mock::MockCore;

    fn live(mock: &Arc<MockCore>, kind: EntityKind) -> OwnedHandle {
        let raw = mock.register_opaque();
        OwnedHandle::new(mock.clone(), kind, raw)
    }

    #[test]
    fn release_destroys_once() {
        let mock = Arc::new(MockCore::new());
        let mut h = live(&mock, EntityKind::Document);

        assert!(h.release());
        assert!(!h.release());
        drop(h);

        let stats = mock.stats();
        assert_eq!(stats.handles_destroyed, 1);
        assert_eq!(stats.double_frees, 0);
    }

    #[test]
    fn drop_reclaims_live_handle() {
        let mock = Arc::new(MockCore::new());
        drop(live(&mock, EntityKind::Identity));
        assert_eq!(mock.stats().handles_destroyed, 1);
        assert_eq!(mock.live_handles(), 0);
    }

    #[test]
    fn detached_never_calls_native() {
        let mock = Arc::new(MockCore::new());
        let mut h = OwnedHandle::detached(mock.clone(), EntityKind::Document);

        let err = h.require("put").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::HandleMissing);
        assert_eq!(
            err.to_string(),
            "cannot put document without handle - document was created from search results"
        );
        assert!(matches!(h.require_info(), Err(SdkError::NoHandle { .. })));

        assert!(!h.release());
        drop(h);
        assert_eq!(mock.stats().handles_destroyed, 0);
    }

    #[test]
    fn released_handle_is_no_longer_usable() {
        let mock = Arc::new(MockCore::new());
        let mut h = live(&mock, EntityKind::DataContract);
        h.release();

        let err = h.require("put").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidState);
        assert!(err.to_string().contains("no longer usable"));
        assert_eq!(
            h.require_argument("data contract is required")
                .unwrap_err()
                .to_string(),
            "data contract is required"
        );
    }
}
