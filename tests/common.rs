//! Test utilities & fixtures shared by the integration tests.
#![allow(dead_code)] // Each test binary uses a different slice of the fixtures.

use std::collections::HashSet;

use plotward::config::{Config, WorldConfig};
use plotward::plot::{GridSettings, Player, Plot, PlotId, PlotIndex, Position};
use uuid::Uuid;

/// The grid the scenario tests assume: 16-block plots, 7-block paths,
/// ground at 64. Plot (0;0) spans (0,0)..(15,15) with home (8, 65, 8).
pub fn test_grid() -> GridSettings {
    GridSettings {
        plot_size: 16,
        path_width: 7,
        ground_level: 64,
        build_height: 255,
    }
}

/// A config declaring "plotworld" with [`test_grid`] dimensions and a
/// 30-day claim expiry.
pub fn test_config() -> Config {
    let mut config = Config::default();
    config.worlds.clear();
    config.worlds.insert(
        "plotworld".to_string(),
        WorldConfig {
            plot_size: 16,
            path_width: 7,
            ground_level: 64,
            build_height: 255,
            days_to_expiration: 30,
        },
    );
    config
}

/// An index with "plotworld" registered and no plots claimed.
pub fn empty_index() -> PlotIndex {
    let mut index = PlotIndex::new();
    index.register_world("plotworld", test_grid());
    index
}

/// A claimable plot record for the given cell of "plotworld".
pub fn plot_at(id: PlotId) -> Plot {
    let (bottom, top) = test_grid().bounds(id);
    Plot::new("plotworld", id, bottom, top)
}

/// In-memory stand-in for the host's player handle.
pub struct FakePlayer {
    pub name: String,
    pub uuid: Uuid,
    pub world: String,
    pub location: Position,
    pub capabilities: HashSet<String>,
}

impl FakePlayer {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            uuid: Uuid::new_v4(),
            world: "plotworld".to_string(),
            location: Position::new(5.0, 64.0, 5.0),
            capabilities: HashSet::new(),
        }
    }

    pub fn at(mut self, pos: Position) -> Self {
        self.location = pos;
        self
    }

    pub fn with_capability(mut self, cap: &str) -> Self {
        self.capabilities.insert(cap.to_string());
        self
    }

    /// Grant the plain `use.` node for every player command.
    pub fn with_use_commands(mut self) -> Self {
        for action in [
            "claim", "dispose", "home", "info", "add", "remove", "deny", "undeny", "like",
            "sell", "finish", "name",
        ] {
            self.capabilities.insert(format!("plotward.use.{}", action));
        }
        self
    }
}

impl Player for FakePlayer {
    fn name(&self) -> &str {
        &self.name
    }

    fn id(&self) -> Uuid {
        self.uuid
    }

    fn world(&self) -> &str {
        &self.world
    }

    fn location(&self) -> Position {
        self.location
    }

    fn has_capability(&self, capability: &str) -> bool {
        self.capabilities.contains(capability)
    }

    fn set_location(&mut self, pos: Position) {
        self.location = pos;
    }
}
