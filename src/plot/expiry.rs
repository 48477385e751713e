//! Expired-plot sweep.
//!
//! Worlds can put a day limit on unfinished claims (`days_to_expiration` in
//! the config). The sweep walks every indexed plot and reclaims the ones
//! whose expiry date has passed, skipping finished builds and protected
//! plots. It is meant to run periodically (cron, or the `sweep` CLI
//! command); a dry run reports without deleting anything.

use chrono::NaiveDate;
use log::{debug, info};

use crate::plot::errors::PlotError;
use crate::plot::index::PlotIndex;
use crate::plot::storage::PlotStore;
use crate::plot::types::PlotId;

/// Counters for one sweep pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepStats {
    pub scanned: usize,
    pub expired: usize,
    pub skipped_protected: usize,
    pub skipped_finished: usize,
    pub removed: usize,
}

/// One expired plot, as reported to an admin before or during a sweep.
#[derive(Debug, Clone)]
pub struct ExpiredPlotInfo {
    pub world: String,
    pub id: PlotId,
    pub owner: String,
    pub expired_date: NaiveDate,
    pub protected: bool,
    pub finished: bool,
}

impl ExpiredPlotInfo {
    /// Whether the sweep would actually delete this plot.
    pub fn sweepable(&self) -> bool {
        !self.protected && !self.finished
    }

    /// Format a compact one-line summary.
    pub fn summary_line(&self) -> String {
        let disposition = if self.protected {
            "kept (protected)"
        } else if self.finished {
            "kept (finished)"
        } else {
            "sweepable"
        };
        format!(
            "{}:{} | Owner: {} | Expired: {} | {}",
            self.world, self.id, self.owner, self.expired_date, disposition
        )
    }
}

/// Every indexed plot whose expiry date has passed as of `today`, including
/// the ones the sweep would keep, most overdue first.
pub fn find_expired(index: &PlotIndex, today: NaiveDate) -> Vec<ExpiredPlotInfo> {
    let mut results = Vec::new();
    for world in index.world_names() {
        for plot in index.plots(world) {
            let Some(expired_date) = plot.expired_date() else {
                continue;
            };
            if !plot.is_expired(today) {
                continue;
            }
            results.push(ExpiredPlotInfo {
                world: world.to_string(),
                id: plot.id(),
                owner: plot.owner_display().to_string(),
                expired_date,
                protected: plot.is_protected(),
                finished: plot.is_finished(),
            });
        }
    }
    results.sort_by(|a, b| a.expired_date.cmp(&b.expired_date));
    results
}

/// Reclaim expired plots: delete their records from the store and evict
/// them from the index. With `dry_run` the pass only counts.
pub fn sweep(
    store: &PlotStore,
    index: &mut PlotIndex,
    today: NaiveDate,
    dry_run: bool,
) -> Result<SweepStats, PlotError> {
    let mut stats = SweepStats::default();
    let mut to_remove: Vec<(String, PlotId)> = Vec::new();

    for world in index.world_names() {
        for plot in index.plots(world) {
            stats.scanned += 1;
            if !plot.is_expired(today) {
                continue;
            }
            stats.expired += 1;
            if plot.is_protected() {
                stats.skipped_protected += 1;
                debug!("sweep keeping protected plot {} in '{}'", plot.id(), world);
                continue;
            }
            if plot.is_finished() {
                stats.skipped_finished += 1;
                debug!("sweep keeping finished plot {} in '{}'", plot.id(), world);
                continue;
            }
            to_remove.push((world.to_string(), plot.id()));
        }
    }

    if dry_run {
        info!(
            "expiry sweep (dry run): {} scanned, {} expired, {} would be removed",
            stats.scanned,
            stats.expired,
            to_remove.len()
        );
        return Ok(stats);
    }

    for (world, id) in to_remove {
        store.delete_plot(&world, id)?;
        index.evict(&world, id);
        stats.removed += 1;
        info!("expiry sweep reclaimed plot {} in '{}'", id, world);
    }

    info!(
        "expiry sweep complete: {} scanned, {} expired, {} removed ({} protected, {} finished kept)",
        stats.scanned, stats.expired, stats.removed, stats.skipped_protected, stats.skipped_finished
    );
    Ok(stats)
}
