//! Capability node names consulted through the [`Player`] abstraction.
//!
//! The host's permission system owns the actual grants; this crate only
//! agrees on the names. Command capabilities come in a `use.` form for
//! everyone and an `admin.` form that also passes the owner check.
//!
//! [`Player`]: crate::plot::enforcer::Player

/// Lets a player cross into and log into plots that deny them.
pub const ADMIN_BYPASS_DENY: &str = "plotward.admin.bypassdeny";

/// Node gating a command for regular players, e.g. `plotward.use.add`.
pub fn use_node(action: &str) -> String {
    format!("plotward.use.{action}")
}

/// Admin counterpart of [`use_node`]; also bypasses the owner check on
/// plot-mutating commands.
pub fn admin_node(action: &str) -> String {
    format!("plotward.admin.{action}")
}
