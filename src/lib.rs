//! # Plotward - Plot Ownership and Access Enforcement
//!
//! Plotward manages land-parcel ("plot") ownership, membership, and access
//! control for partitioned virtual-world grids, as a library consumed by a
//! game server's event and command glue.
//!
//! ## Features
//!
//! - **Plot Records**: Owner, members with access levels, denial lists with
//!   wildcard rules, sale state, finished/expiry lifecycle, likes, and
//!   per-plugin metadata namespaces.
//! - **Grid Lookup**: Pure coordinate arithmetic from configured plot and
//!   path dimensions, resolving any world coordinate to its grid cell and
//!   any cell to its bounds and home position.
//! - **Access Enforcement**: Move signals against a denying plot are held in
//!   place (look direction preserved); a denied login is relocated to the
//!   plot's home. Admins bypass with a single capability.
//! - **Persistence**: Sled-backed plot store with schema-versioned records
//!   and startup hydration into the in-memory index.
//! - **Commands**: The player-facing claim/add/deny/sell/... surface, with
//!   capability and ownership gates.
//! - **Expiry Sweep**: Periodic reclamation of overdue unfinished claims.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use plotward::config::Config;
//! use plotward::plot::{AccessEnforcer, PlotStoreBuilder};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load("config.toml").await?;
//!     let store = PlotStoreBuilder::new(&config.storage.data_dir).open()?;
//!     let index = store.load_index(&config)?;
//!
//!     let enforcer = AccessEnforcer::new(&index);
//!     // Wire `enforcer.handle_move` / `enforcer.handle_join` into the
//!     // host's movement and login events.
//!     let _ = enforcer;
//!     Ok(())
//! }
//! ```
//!
//! ## Module Organization
//!
//! - [`plot`] - The engine: entities, index, enforcer, storage, commands
//! - [`config`] - Configuration management (worlds, storage, logging)
//! - [`logutil`] - Log sanitization for player-supplied strings
//!
//! ## Architecture
//!
//! ```text
//! host signals (move / join)      commands (claim / add / deny / ...)
//!         |                                   |
//!         v                                   v
//!   AccessEnforcer ---reads--> PlotIndex <--mutates-- CommandProcessor
//!                                  | ^
//!                                  v | load / persist
//!                              PlotStore (sled)
//! ```
//!
//! The index is the single authoritative view the enforcer reads; a cache
//! miss there means "no plot here", never "not loaded yet". Everything that
//! creates or destroys plots writes through both the store and the index.

pub mod config;
pub mod logutil;
pub mod plot;

pub use plot::{
    AccessEnforcer, AccessLevel, BlockPos, CommandProcessor, GridSettings, JoinOutcome,
    MoveOutcome, Player, Plot, PlotCommand, PlotError, PlotId, PlotIndex, PlotStore,
    PlotStoreBuilder, Position,
};
