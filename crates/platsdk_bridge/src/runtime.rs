//! Process-wide native initialization.

use crate::native::NativeCore;
use std::sync::OnceLock;
use tracing::debug;

static INITIALIZED: OnceLock<()> = OnceLock::new();

/// Runs the native core's one-time initialization.
///
/// Only the first call in the process reaches the core; later calls return
/// immediately. [`Sdk::open`](crate::Sdk::open) calls this implicitly.
pub fn initialize(core: &dyn NativeCore) {
    INITIALIZED.get_or_init(|| {
        core.init();
        debug!("native core initialized");
    });
}

/// Returns true once [`initialize`] has run.
pub fn is_initialized() -> bool {
    INITIALIZED.get().is_some()
}
