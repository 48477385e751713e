use std::collections::BTreeMap;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::plot::errors::PlotError;
use crate::plot::types::{BlockPos, Plot, PlotId, Position};

/// Grid dimensions for one plot world. Plots are laid out on a square grid
/// with period `plot_size + path_width`: each cell starts with the plot
/// interior and ends with the path strip leading to the next cell.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct GridSettings {
    pub plot_size: u32,
    pub path_width: u32,
    /// Top of the terrain the generator builds plots on.
    pub ground_level: i32,
    pub build_height: i32,
}

impl Default for GridSettings {
    fn default() -> Self {
        Self {
            plot_size: 32,
            path_width: 7,
            ground_level: 64,
            build_height: 255,
        }
    }
}

impl GridSettings {
    /// Grid period in blocks.
    pub fn pitch(&self) -> i32 {
        (self.plot_size + self.path_width) as i32
    }

    /// The cell containing block column (bx, bz). Total: every coordinate
    /// belongs to exactly one cell, path strips included. Whether a plot
    /// interior covers the coordinate is a separate question (`contains`).
    pub fn cell_at(&self, bx: i32, bz: i32) -> PlotId {
        let pitch = self.pitch();
        PlotId::new(bx.div_euclid(pitch), bz.div_euclid(pitch))
    }

    /// Corner columns of `id`'s interior: bottom at the cell origin, top
    /// `plot_size - 1` blocks further on each axis.
    pub fn bounds(&self, id: PlotId) -> (BlockPos, BlockPos) {
        let pitch = self.pitch();
        let bottom = BlockPos::new(id.x * pitch, 0, id.z * pitch);
        let top = BlockPos::new(
            bottom.x + self.plot_size as i32 - 1,
            self.build_height,
            bottom.z + self.plot_size as i32 - 1,
        );
        (bottom, top)
    }

    /// True when block column (bx, bz) lies inside `id`'s interior, path
    /// strips excluded.
    pub fn contains(&self, id: PlotId, bx: i32, bz: i32) -> bool {
        let (bottom, top) = self.bounds(id);
        bx >= bottom.x && bx <= top.x && bz >= bottom.z && bz <= top.z
    }

    /// Canonical teleport target: the middle of the plot floor, one block
    /// above ground, looking straight ahead.
    pub fn home(&self, id: PlotId) -> Position {
        let (bottom, _) = self.bounds(id);
        let half = (self.plot_size / 2) as i32;
        Position::new(
            (bottom.x + half) as f64,
            (self.ground_level + 1) as f64,
            (bottom.z + half) as f64,
        )
    }
}

struct WorldPlots {
    grid: GridSettings,
    plots: BTreeMap<PlotId, Plot>,
}

/// Authoritative registry of loaded plots, world by world.
///
/// Whatever is indexed here is the truth the enforcer acts on: claims and
/// database loads insert, deletion evicts, and lookups never fall through to
/// storage. One owner holds the index mutably; the enforcer and other
/// readers borrow it shared.
#[derive(Default)]
pub struct PlotIndex {
    worlds: BTreeMap<String, WorldPlots>,
}

impl PlotIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare `name` a plot world with the given grid. World names compare
    /// case-insensitively. Re-registering replaces the grid but keeps the
    /// loaded plots.
    pub fn register_world(&mut self, name: &str, grid: GridSettings) {
        let key = name.to_lowercase();
        match self.worlds.get_mut(&key) {
            Some(world) => world.grid = grid,
            None => {
                debug!("registered plot world '{}' (pitch {})", key, grid.pitch());
                self.worlds.insert(
                    key,
                    WorldPlots {
                        grid,
                        plots: BTreeMap::new(),
                    },
                );
            }
        }
    }

    pub fn is_plot_world(&self, name: &str) -> bool {
        self.worlds.contains_key(&name.to_lowercase())
    }

    pub fn grid(&self, world: &str) -> Option<&GridSettings> {
        self.worlds.get(&world.to_lowercase()).map(|w| &w.grid)
    }

    /// The cell a position falls in. `None` only for unregistered worlds;
    /// inside a plot world every coordinate has a cell.
    pub fn plot_id_at(&self, world: &str, pos: &Position) -> Option<PlotId> {
        self.grid(world)
            .map(|grid| grid.cell_at(pos.block_x(), pos.block_z()))
    }

    pub fn plot(&self, world: &str, id: PlotId) -> Option<&Plot> {
        self.worlds
            .get(&world.to_lowercase())
            .and_then(|w| w.plots.get(&id))
    }

    pub fn plot_mut(&mut self, world: &str, id: PlotId) -> Option<&mut Plot> {
        self.worlds
            .get_mut(&world.to_lowercase())
            .and_then(|w| w.plots.get_mut(&id))
    }

    /// The claimed plot whose interior covers `pos`, if any. Positions on a
    /// path strip resolve to no plot even when the neighboring cell is
    /// claimed.
    pub fn plot_at(&self, world: &str, pos: &Position) -> Option<&Plot> {
        let w = self.worlds.get(&world.to_lowercase())?;
        let (bx, bz) = (pos.block_x(), pos.block_z());
        let id = w.grid.cell_at(bx, bz);
        if !w.grid.contains(id, bx, bz) {
            return None;
        }
        w.plots.get(&id)
    }

    pub fn plot_at_mut(&mut self, world: &str, pos: &Position) -> Option<&mut Plot> {
        let w = self.worlds.get_mut(&world.to_lowercase())?;
        let (bx, bz) = (pos.block_x(), pos.block_z());
        let id = w.grid.cell_at(bx, bz);
        if !w.grid.contains(id, bx, bz) {
            return None;
        }
        w.plots.get_mut(&id)
    }

    /// Make a plot visible to lookups. Replaces any previous record at the
    /// same cell.
    pub fn insert(&mut self, plot: Plot) -> Result<(), PlotError> {
        let Some(world) = self.worlds.get_mut(plot.world()) else {
            return Err(PlotError::NotPlotWorld(plot.world().to_string()));
        };
        debug!("indexed plot {} in '{}'", plot.id(), plot.world());
        world.plots.insert(plot.id(), plot);
        Ok(())
    }

    /// Drop a plot from the registry. The collaborator that destroys a plot
    /// must call this so stale records stop answering lookups.
    pub fn evict(&mut self, world: &str, id: PlotId) -> Option<Plot> {
        let w = self.worlds.get_mut(&world.to_lowercase())?;
        let removed = w.plots.remove(&id);
        if removed.is_some() {
            debug!("evicted plot {} from '{}'", id, world.to_lowercase());
        }
        removed
    }

    pub fn plot_home(&self, world: &str, id: PlotId) -> Option<Position> {
        self.grid(world).map(|grid| grid.home(id))
    }

    /// Loaded plots of one world in PlotId order. Empty for unknown worlds.
    pub fn plots(&self, world: &str) -> impl Iterator<Item = &Plot> {
        self.worlds
            .get(&world.to_lowercase())
            .into_iter()
            .flat_map(|w| w.plots.values())
    }

    pub fn plot_count(&self, world: &str) -> usize {
        self.worlds
            .get(&world.to_lowercase())
            .map_or(0, |w| w.plots.len())
    }

    pub fn total_plots(&self) -> usize {
        self.worlds.values().map(|w| w.plots.len()).sum()
    }

    pub fn world_names(&self) -> impl Iterator<Item = &str> {
        self.worlds.keys().map(|k| k.as_str())
    }
}
