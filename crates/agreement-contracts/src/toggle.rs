//! Process-wide switch for requirement and ensure instrumentation.
//!
//! The switch is consulted when a contract is woven, never when a woven
//! function runs: flipping it affects only contracts defined afterwards.

use std::sync::atomic::{AtomicBool, Ordering};

use tracing::debug;

static AGREEMENT_ENABLED: AtomicBool = AtomicBool::new(true);

/// Turn contract instrumentation on or off for contracts woven from now on.
///
/// Returns the previous setting.
pub fn set_agreement_enabling(enabled: bool) -> bool {
    let previous = AGREEMENT_ENABLED.swap(enabled, Ordering::AcqRel);
    debug!(previous, enabled, "agreement instrumentation toggled");
    previous
}

/// Current setting of the switch
pub fn agreement_enabled() -> bool {
    AGREEMENT_ENABLED.load(Ordering::Acquire)
}
