//! Plot data model, spatial lookup, and access enforcement.
//!
//! The engine is three layers: [`types::Plot`] holds one parcel's record and
//! its membership/denial rules, [`index::PlotIndex`] is the authoritative
//! in-memory registry with the grid arithmetic, and
//! [`enforcer::AccessEnforcer`] turns move/join signals into verdicts. The
//! [`storage`] layer persists records and hydrates the index at startup;
//! [`commands`] is the player-facing surface and [`expiry`] the lifecycle
//! sweep.

pub mod commands;
pub mod enforcer;
pub mod errors;
pub mod expiry;
pub mod index;
pub mod perms;
pub mod storage;
pub mod types;

pub use commands::{CommandProcessor, PlotCommand};
pub use enforcer::{AccessEnforcer, JoinOutcome, MoveOutcome, Player};
pub use errors::PlotError;
pub use expiry::{find_expired, sweep, ExpiredPlotInfo, SweepStats};
pub use index::{GridSettings, PlotIndex};
pub use storage::{PlotStore, PlotStoreBuilder};
pub use types::{AccessLevel, BlockPos, Plot, PlotId, Position, PLOT_SCHEMA_VERSION, WILDCARD};
