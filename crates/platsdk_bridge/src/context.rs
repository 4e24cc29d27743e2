//! SDK session.

use crate::config::{Network, SdkConfig};
use crate::contract::Contracts;
use crate::document::Documents;
use crate::error::{SdkError, SdkResult};
use crate::gate::{Gate, SessionGuard};
use crate::handle::EntityKind;
use crate::identity::Identities;
use crate::marshal::host_string;
use crate::mock::MockCore;
use crate::native::{NativeCore, RawHandle, ResultDataType};
use crate::result::expect_handle;
use crate::runtime::initialize;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

struct SdkInner {
    core: Arc<dyn NativeCore>,
    gate: Gate<RawHandle>,
    config: SdkConfig,
}

impl SdkInner {
    fn teardown(&self, session: RawHandle) {
        self.core.sdk_destroy(session);
    }
}

impl Drop for SdkInner {
    fn drop(&mut self) {
        let core = &self.core;
        self.gate.release(|session| {
            warn!(?session, "SDK dropped without close, reclaiming session");
            core.sdk_destroy(session);
        });
    }
}

/// An open session with the native core.
///
/// Cheap to clone; clones share one session. Entities created through a
/// session keep it alive. Operations on a closed session fail with
/// [`ErrorKind::ContextClosed`](crate::ErrorKind::ContextClosed) without
/// reaching the core.
///
/// All methods may be called from several threads at once. [`Sdk::close`]
/// waits for in-flight operations to finish.
#[derive(Clone)]
pub struct Sdk {
    inner: Arc<SdkInner>,
}

impl Sdk {
    /// Opens a session on `core`.
    ///
    /// The configuration is validated before the core is called.
    pub fn open(core: Arc<dyn NativeCore>, config: SdkConfig) -> SdkResult<Self> {
        config.validate()?;
        initialize(&*core);

        let addresses = host_string(&config.joined_endpoints(), "endpoint list")?;
        let raw = config.to_raw(&addresses);
        let session = expect_handle(
            &*core,
            core.sdk_create(&raw),
            ResultDataType::SessionHandle,
            "failed to create SDK",
        )?;

        debug!(
            network = ?config.network,
            endpoints = config.endpoints.len(),
            "SDK session opened"
        );
        Ok(Self {
            inner: Arc::new(SdkInner {
                core,
                gate: Gate::new(session),
                config,
            }),
        })
    }

    /// Opens a session on a fresh in-process [`MockCore`].
    pub fn mock(config: SdkConfig) -> SdkResult<Self> {
        Self::open(Arc::new(MockCore::new()), config)
    }

    /// Closes the session.
    ///
    /// Waits for in-flight operations, then destroys the native session.
    /// Closing again does nothing.
    pub fn close(&self) {
        if self.inner.gate.release(|session| self.inner.teardown(session)) {
            debug!("SDK session closed");
        }
    }

    /// Returns true once the session is closed.
    pub fn is_closed(&self) -> bool {
        self.inner.gate.is_released()
    }

    /// Session configuration.
    pub fn config(&self) -> &SdkConfig {
        &self.inner.config
    }

    /// Configured network.
    pub fn network(&self) -> Network {
        self.inner.config.network
    }

    /// Identity operations.
    pub fn identities(&self) -> Identities<'_> {
        Identities::new(self)
    }

    /// Data contract operations.
    pub fn contracts(&self) -> Contracts<'_> {
        Contracts::new(self)
    }

    /// Document operations.
    pub fn documents(&self) -> Documents<'_> {
        Documents::new(self)
    }

    /// Acquires a shared token on the session.
    pub(crate) fn enter(&self) -> SdkResult<SessionGuard<'_, RawHandle>> {
        self.inner.gate.enter()
    }

    /// Checks that an argument entity owned by `owner` may be passed to a
    /// call on this session. The caller holds a token on `self`.
    pub(crate) fn accept_argument(&self, owner: &Sdk, kind: EntityKind) -> SdkResult<()> {
        if Arc::ptr_eq(&self.inner, &owner.inner) {
            return Ok(());
        }
        if owner.is_closed() {
            return Err(SdkError::ContextClosed);
        }
        Err(SdkError::validation(format!("{kind} belongs to a different SDK session")))
    }

    pub(crate) fn core(&self) -> &dyn NativeCore {
        &*self.inner.core
    }

    pub(crate) fn core_arc(&self) -> Arc<dyn NativeCore> {
        Arc::clone(&self.inner.core)
    }
}

impl fmt::Debug for Sdk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sdk")
            .field("network", &self.inner.config.network)
            .field("closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}
