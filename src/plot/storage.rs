use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use log::{debug, info, warn};
use sled::IVec;

use crate::config::Config;
use crate::plot::errors::PlotError;
use crate::plot::index::PlotIndex;
use crate::plot::types::{Plot, PlotId, PLOT_SCHEMA_VERSION};

const TREE_PLOTS: &str = "plots";

/// Helper builder so tests can easily create throwaway stores with custom paths.
pub struct PlotStoreBuilder {
    path: PathBuf,
    temporary: bool,
}

impl PlotStoreBuilder {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            temporary: false,
        }
    }

    /// Back the store with a throwaway database sled deletes on drop
    /// (useful for targeted tests). The builder's path is ignored; sled
    /// picks a unique temp location.
    pub fn temporary(mut self) -> Self {
        self.temporary = true;
        self
    }

    pub fn open(self) -> Result<PlotStore, PlotError> {
        PlotStore::open_with_options(self.path, self.temporary)
    }
}

/// Sled-backed persistence for plot records.
///
/// The store is the durable side of the registry; [`PlotIndex`] stays the
/// authoritative view the enforcer reads. `load_index` replays every stored
/// record into a fresh index at startup, and command flows write through
/// both.
pub struct PlotStore {
    db: sled::Db,
    plots: sled::Tree,
}

impl PlotStore {
    /// Open (or create) the plot store rooted at `path`.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, PlotError> {
        Self::open_with_options(path.as_ref().to_path_buf(), false)
    }

    fn open_with_options(path: PathBuf, temporary: bool) -> Result<Self, PlotError> {
        let db = if temporary {
            sled::Config::new().temporary(true).open()?
        } else {
            std::fs::create_dir_all(&path)?;
            sled::open(&path)?
        };
        let plots = db.open_tree(TREE_PLOTS)?;
        Ok(Self { db, plots })
    }

    fn plot_key(world: &str, id: PlotId) -> Vec<u8> {
        format!("plots:{}:{}", world.to_lowercase(), id).into_bytes()
    }

    fn world_prefix(world: &str) -> Vec<u8> {
        format!("plots:{}:", world.to_lowercase()).into_bytes()
    }

    fn serialize<T: serde::Serialize>(value: &T) -> Result<Vec<u8>, PlotError> {
        Ok(bincode::serialize(value)?)
    }

    fn deserialize<T: serde::de::DeserializeOwned>(bytes: IVec) -> Result<T, PlotError> {
        Ok(bincode::deserialize::<T>(&bytes)?)
    }

    /// Insert or update a plot record. A plot persisted for the first time
    /// gets its `internal_id` assigned here, from sled's id allocator.
    pub fn put_plot(&self, plot: &mut Plot) -> Result<(), PlotError> {
        if !plot.is_persisted() {
            let assigned = self.db.generate_id()? as i64 + 1;
            plot.assign_internal_id(assigned);
            debug!(
                "assigned internal id {} to plot {} in '{}'",
                assigned,
                plot.id(),
                plot.world()
            );
        }
        plot.schema_version = PLOT_SCHEMA_VERSION;
        let key = Self::plot_key(plot.world(), plot.id());
        let bytes = Self::serialize(plot)?;
        self.plots.insert(key, bytes)?;
        self.plots.flush()?;
        Ok(())
    }

    /// Fetch one plot record by world and grid id.
    pub fn get_plot(&self, world: &str, id: PlotId) -> Result<Plot, PlotError> {
        let key = Self::plot_key(world, id);
        let Some(bytes) = self.plots.get(&key)? else {
            return Err(PlotError::NotFound(format!("plot: {} in {}", id, world)));
        };
        let record: Plot = Self::deserialize(bytes)?;
        if record.schema_version != PLOT_SCHEMA_VERSION {
            return Err(PlotError::SchemaMismatch {
                entity: "plot",
                expected: PLOT_SCHEMA_VERSION,
                found: record.schema_version,
            });
        }
        Ok(record)
    }

    /// Remove one plot record. Returns whether a record was present.
    pub fn delete_plot(&self, world: &str, id: PlotId) -> Result<bool, PlotError> {
        let key = Self::plot_key(world, id);
        let removed = self.plots.remove(key)?.is_some();
        self.plots.flush()?;
        Ok(removed)
    }

    /// All stored plots of one world, in key order.
    pub fn plots_in_world(&self, world: &str) -> Result<Vec<Plot>, PlotError> {
        let mut out = Vec::new();
        for entry in self.plots.scan_prefix(Self::world_prefix(world)) {
            let (_, bytes) = entry?;
            out.push(Self::deserialize(bytes)?);
        }
        Ok(out)
    }

    pub fn plot_count(&self, world: &str) -> Result<usize, PlotError> {
        let mut count = 0;
        for entry in self.plots.scan_prefix(Self::world_prefix(world)) {
            entry?;
            count += 1;
        }
        Ok(count)
    }

    /// Distinct world names appearing in stored records.
    pub fn world_names(&self) -> Result<Vec<String>, PlotError> {
        let mut worlds = BTreeSet::new();
        for entry in self.plots.scan_prefix(b"plots:") {
            let (key, _) = entry?;
            let text = String::from_utf8_lossy(&key);
            if let Some(rest) = text.strip_prefix("plots:") {
                if let Some((world, _)) = rest.split_once(':') {
                    worlds.insert(world.to_string());
                }
            }
        }
        Ok(worlds.into_iter().collect())
    }

    /// Build the startup index: register every configured world, then hydrate
    /// each one's stored plots. A record that fails to decode is logged and
    /// skipped so one corrupt row cannot keep the engine down.
    pub fn load_index(&self, config: &Config) -> Result<PlotIndex, PlotError> {
        let mut index = PlotIndex::new();
        for (name, world) in &config.worlds {
            index.register_world(name, world.grid());
        }

        for name in index.world_names().map(str::to_string).collect::<Vec<_>>() {
            let mut loaded = 0usize;
            for entry in self.plots.scan_prefix(Self::world_prefix(&name)) {
                let (key, bytes) = entry?;
                match Self::deserialize::<Plot>(bytes) {
                    Ok(plot) if plot.schema_version == PLOT_SCHEMA_VERSION => {
                        index.insert(plot)?;
                        loaded += 1;
                    }
                    Ok(plot) => {
                        warn!(
                            "skipping plot record {} (schema {} != {})",
                            String::from_utf8_lossy(&key),
                            plot.schema_version,
                            PLOT_SCHEMA_VERSION
                        );
                    }
                    Err(err) => {
                        warn!(
                            "skipping undecodable plot record {}: {}",
                            String::from_utf8_lossy(&key),
                            err
                        );
                    }
                }
            }
            info!("loaded {} plots for world '{}'", loaded, name);
        }
        Ok(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plot::index::GridSettings;
    use crate::plot::types::BlockPos;
    use tempfile::TempDir;
    use uuid::Uuid;

    fn sample_plot(world: &str, id: PlotId) -> Plot {
        let grid = GridSettings::default();
        let (bottom, top) = grid.bounds(id);
        Plot::new(world, id, bottom, top)
    }

    #[test]
    fn store_round_trip_plot() {
        let dir = TempDir::new().expect("tempdir");
        let store = PlotStoreBuilder::new(dir.path()).open().expect("store");

        let mut plot = sample_plot("plotworld", PlotId::new(2, -1)).with_owner("alice", Uuid::new_v4());
        plot.add_denied("mallory");
        assert!(!plot.is_persisted());

        store.put_plot(&mut plot).expect("put");
        assert!(plot.is_persisted());

        let fetched = store.get_plot("plotworld", PlotId::new(2, -1)).expect("get");
        assert_eq!(fetched, plot);
        assert_eq!(fetched.schema_version, PLOT_SCHEMA_VERSION);
        assert!(fetched.is_denied("mallory"));
    }

    #[test]
    fn internal_ids_are_assigned_once_and_distinct() {
        let store = PlotStoreBuilder::new("ignored").temporary().open().expect("store");

        let mut a = sample_plot("plotworld", PlotId::new(0, 0));
        let mut b = sample_plot("plotworld", PlotId::new(1, 0));
        store.put_plot(&mut a).expect("put a");
        store.put_plot(&mut b).expect("put b");
        assert_ne!(a.internal_id(), b.internal_id());

        let first = a.internal_id();
        a.set_for_sale(true);
        store.put_plot(&mut a).expect("update a");
        assert_eq!(a.internal_id(), first);
    }

    #[test]
    fn missing_plot_is_not_found() {
        let store = PlotStoreBuilder::new("ignored").temporary().open().expect("store");
        assert!(matches!(
            store.get_plot("plotworld", PlotId::new(9, 9)),
            Err(PlotError::NotFound(_))
        ));
    }

    #[test]
    fn delete_and_world_scans() {
        let store = PlotStoreBuilder::new("ignored").temporary().open().expect("store");
        for id in [PlotId::new(0, 0), PlotId::new(0, 1)] {
            store.put_plot(&mut sample_plot("alpha", id)).expect("put");
        }
        store
            .put_plot(&mut sample_plot("beta", PlotId::new(0, 0)))
            .expect("put");

        assert_eq!(store.plot_count("alpha").unwrap(), 2);
        assert_eq!(store.world_names().unwrap(), vec!["alpha", "beta"]);

        assert!(store.delete_plot("alpha", PlotId::new(0, 0)).unwrap());
        assert!(!store.delete_plot("alpha", PlotId::new(0, 0)).unwrap());
        assert_eq!(store.plots_in_world("alpha").unwrap().len(), 1);
    }

    #[test]
    fn records_survive_reopen() {
        let dir = TempDir::new().expect("tempdir");
        {
            let store = PlotStoreBuilder::new(dir.path()).open().expect("store");
            store
                .put_plot(&mut sample_plot("plotworld", PlotId::new(3, 3)))
                .expect("put");
        }
        let store = PlotStoreBuilder::new(dir.path()).open().expect("reopen");
        store
            .get_plot("plotworld", PlotId::new(3, 3))
            .expect("plot persists");
    }
}
