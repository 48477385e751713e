use log::debug;
use uuid::Uuid;

use crate::logutil::escape_log;
use crate::plot::index::PlotIndex;
use crate::plot::perms;
use crate::plot::types::{Plot, Position};

/// Host-side view of a connected player. Adapters around the engine's own
/// player handle implement this; tests use a plain fake.
pub trait Player {
    fn name(&self) -> &str;
    /// Stable identity that survives renames.
    fn id(&self) -> Uuid;
    fn world(&self) -> &str;
    fn location(&self) -> Position;
    fn has_capability(&self, capability: &str) -> bool;
    fn set_location(&mut self, pos: Position);
}

/// Verdict on a movement signal. `Rewrite` carries the position the host
/// should substitute for the event's destination.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MoveOutcome {
    Allow,
    Rewrite(Position),
}

/// Verdict on a join signal. `Relocate` carries the plot home the player
/// must be moved to (via [`Player::set_location`]).
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum JoinOutcome {
    Allow,
    Relocate(Position),
}

/// Evaluates move and join signals against the plot registry.
///
/// Read-only: it never touches a plot or the index, it only answers what
/// the host should do with the player. Players holding
/// [`perms::ADMIN_BYPASS_DENY`] short-circuit before any plot lookup.
pub struct AccessEnforcer<'a> {
    index: &'a PlotIndex,
}

impl<'a> AccessEnforcer<'a> {
    pub fn new(index: &'a PlotIndex) -> Self {
        Self { index }
    }

    /// Denial lookup with both stored identifier forms: display name and
    /// UUID string (legacy rows use either).
    fn denies(plot: &Plot, player: &dyn Player) -> bool {
        plot.is_denied(player.name()) || plot.is_denied(&player.id().to_string())
    }

    /// Evaluate one movement from `from` to `to` in the player's current
    /// world. A denied destination is held: the rewrite keeps `from`'s
    /// coordinates but takes over `to`'s yaw and pitch, so the player stays
    /// put yet keeps looking where they turned.
    pub fn handle_move(&self, player: &dyn Player, from: &Position, to: &Position) -> MoveOutcome {
        if !self.index.is_plot_world(player.world())
            || player.has_capability(perms::ADMIN_BYPASS_DENY)
        {
            return MoveOutcome::Allow;
        }

        let Some(plot) = self.index.plot_at(player.world(), to) else {
            return MoveOutcome::Allow;
        };

        if Self::denies(plot, player) {
            debug!(
                "holding {} at the edge of plot {} in '{}'",
                escape_log(player.name()),
                plot.id(),
                player.world()
            );
            let mut held = *from;
            held.yaw = to.yaw;
            held.pitch = to.pitch;
            return MoveOutcome::Rewrite(held);
        }

        MoveOutcome::Allow
    }

    /// Evaluate a login at the player's current location. Logging out inside
    /// a plot and getting denied in the meantime must not leave the player
    /// standing there, so the verdict is the plot's home position.
    pub fn handle_join(&self, player: &dyn Player) -> JoinOutcome {
        if !self.index.is_plot_world(player.world())
            || player.has_capability(perms::ADMIN_BYPASS_DENY)
        {
            return JoinOutcome::Allow;
        }

        let at = player.location();
        let Some(plot) = self.index.plot_at(player.world(), &at) else {
            return JoinOutcome::Allow;
        };

        if Self::denies(plot, player) {
            if let Some(home) = self.index.plot_home(player.world(), plot.id()) {
                debug!(
                    "join by {} lands on denying plot {}, relocating to home",
                    escape_log(player.name()),
                    plot.id()
                );
                return JoinOutcome::Relocate(home);
            }
        }

        JoinOutcome::Allow
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plot::index::GridSettings;
    use crate::plot::types::{Plot, PlotId};
    use std::collections::HashSet;

    struct FakePlayer {
        name: String,
        id: Uuid,
        world: String,
        location: Position,
        capabilities: HashSet<String>,
    }

    impl FakePlayer {
        fn new(name: &str) -> Self {
            Self {
                name: name.to_string(),
                id: Uuid::new_v4(),
                world: "plotworld".to_string(),
                location: Position::new(40.0, 64.0, 40.0),
                capabilities: HashSet::new(),
            }
        }

        fn at(mut self, pos: Position) -> Self {
            self.location = pos;
            self
        }

        fn with_capability(mut self, cap: &str) -> Self {
            self.capabilities.insert(cap.to_string());
            self
        }
    }

    impl Player for FakePlayer {
        fn name(&self) -> &str {
            &self.name
        }

        fn id(&self) -> Uuid {
            self.id
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

    fn world_with_denying_plot(denied: &str) -> PlotIndex {
        let grid = GridSettings {
            plot_size: 16,
            path_width: 7,
            ground_level: 64,
            build_height: 255,
        };
        let mut index = PlotIndex::new();
        index.register_world("plotworld", grid);
        let (bottom, top) = grid.bounds(PlotId::new(0, 0));
        let mut plot = Plot::new("plotworld", PlotId::new(0, 0), bottom, top);
        plot.add_denied(denied);
        index.insert(plot).unwrap();
        index
    }

    #[test]
    fn move_into_denying_plot_is_held() {
        let index = world_with_denying_plot("alice");
        let enforcer = AccessEnforcer::new(&index);
        let alice = FakePlayer::new("alice");

        let from = Position::new(5.0, 64.0, 5.0).facing(90.0, 0.0);
        let to = Position::new(6.0, 64.0, 5.0).facing(45.0, 10.0);

        match enforcer.handle_move(&alice, &from, &to) {
            MoveOutcome::Rewrite(held) => {
                assert_eq!((held.x, held.y, held.z), (5.0, 64.0, 5.0));
                assert_eq!((held.yaw, held.pitch), (45.0, 10.0));
            }
            MoveOutcome::Allow => panic!("denied player should be held"),
        }
    }

    #[test]
    fn denial_by_uuid_string_also_holds() {
        let alice = FakePlayer::new("alice");
        let index = world_with_denying_plot(&alice.id().to_string());
        let enforcer = AccessEnforcer::new(&index);

        let from = Position::new(30.0, 64.0, 5.0);
        let to = Position::new(10.0, 64.0, 5.0);
        assert!(matches!(
            enforcer.handle_move(&alice, &from, &to),
            MoveOutcome::Rewrite(_)
        ));
    }

    #[test]
    fn bypass_capability_short_circuits() {
        let index = world_with_denying_plot("*");
        let enforcer = AccessEnforcer::new(&index);
        let admin = FakePlayer::new("root")
            .with_capability(perms::ADMIN_BYPASS_DENY)
            .at(Position::new(5.0, 64.0, 5.0));

        let from = Position::new(30.0, 64.0, 5.0);
        let to = Position::new(5.0, 64.0, 5.0);
        assert_eq!(enforcer.handle_move(&admin, &from, &to), MoveOutcome::Allow);
        assert_eq!(enforcer.handle_join(&admin), JoinOutcome::Allow);
    }

    #[test]
    fn moves_outside_plot_worlds_and_on_paths_pass() {
        let index = world_with_denying_plot("alice");
        let enforcer = AccessEnforcer::new(&index);

        let mut wanderer = FakePlayer::new("alice");
        wanderer.world = "wilderness".to_string();
        let from = Position::new(0.0, 64.0, 0.0);
        let to = Position::new(5.0, 64.0, 5.0);
        assert_eq!(
            enforcer.handle_move(&wanderer, &from, &to),
            MoveOutcome::Allow
        );

        // Path strips are free even for denied players.
        let alice = FakePlayer::new("alice");
        let onto_path = Position::new(18.0, 64.0, 5.0);
        assert_eq!(
            enforcer.handle_move(&alice, &from, &onto_path),
            MoveOutcome::Allow
        );
    }

    #[test]
    fn join_inside_denying_plot_relocates_home() {
        let index = world_with_denying_plot("*");
        let enforcer = AccessEnforcer::new(&index);
        let alice = FakePlayer::new("alice").at(Position::new(5.0, 64.0, 5.0));

        match enforcer.handle_join(&alice) {
            JoinOutcome::Relocate(home) => {
                assert_eq!((home.x, home.y, home.z), (8.0, 65.0, 8.0));
            }
            JoinOutcome::Allow => panic!("denied player should be relocated"),
        }
    }

    #[test]
    fn join_elsewhere_is_untouched() {
        let index = world_with_denying_plot("*");
        let enforcer = AccessEnforcer::new(&index);
        // Past the plot interior, on the path.
        let alice = FakePlayer::new("alice").at(Position::new(18.0, 64.0, 18.0));
        assert_eq!(enforcer.handle_join(&alice), JoinOutcome::Allow);
    }
}
