//! Player-facing plot commands.
//!
//! The host's chat glue tokenizes a line into a [`PlotCommand`] and hands it
//! to a [`CommandProcessor`], which runs the full gate chain: capability,
//! plot world, plot at the player's feet, owner-or-admin for mutations. All
//! user-visible text lives here; the engine below only returns data and
//! errors.

use chrono::Utc;
use log::{debug, info};

use crate::config::Config;
use crate::logutil::escape_log;
use crate::plot::enforcer::Player;
use crate::plot::errors::PlotError;
use crate::plot::index::PlotIndex;
use crate::plot::perms;
use crate::plot::storage::PlotStore;
use crate::plot::types::{AccessLevel, Plot, PlotId};

/// One parsed plot command.
#[derive(Debug, Clone, PartialEq)]
pub enum PlotCommand {
    /// Claim the unowned plot the player stands on.
    Claim,
    /// Delete the plot the player stands on.
    Dispose,
    /// Teleport to the plot's home position.
    Home,
    /// Describe the plot the player stands on.
    Info,
    /// Grant a player (or `*`) entry and build rights.
    Add(String),
    /// Revoke a member entry.
    Remove(String),
    /// Bar a player (or `*`) from the plot.
    Deny(String),
    /// Lift a denial.
    Undeny(String),
    /// Like the plot, once per player.
    Like,
    /// Put the plot up for sale at a price; `None` ends the sale.
    Sell(Option<f64>),
    /// Toggle the finished flag.
    Finish,
    /// Label the plot.
    Name(String),
    /// Toggle sweep protection (admin).
    Protect,
    /// Anything unrecognized, kept for the reply.
    Unknown(String),
}

impl PlotCommand {
    /// Tokenize one input line. Verbs are case-insensitive; a missing
    /// required argument degrades to `Unknown` so the reply can explain.
    pub fn parse(input: &str) -> PlotCommand {
        let mut tokens = input.split_whitespace();
        let Some(verb) = tokens.next() else {
            return PlotCommand::Unknown(String::new());
        };
        let rest: Vec<&str> = tokens.collect();
        let arg = || rest.first().map(|s| s.to_string());

        match verb.to_lowercase().as_str() {
            "claim" => PlotCommand::Claim,
            "dispose" => PlotCommand::Dispose,
            "home" => PlotCommand::Home,
            "info" => PlotCommand::Info,
            "add" => match arg() {
                Some(target) => PlotCommand::Add(target),
                None => PlotCommand::Unknown(input.to_string()),
            },
            "remove" => match arg() {
                Some(target) => PlotCommand::Remove(target),
                None => PlotCommand::Unknown(input.to_string()),
            },
            "deny" => match arg() {
                Some(target) => PlotCommand::Deny(target),
                None => PlotCommand::Unknown(input.to_string()),
            },
            "undeny" => match arg() {
                Some(target) => PlotCommand::Undeny(target),
                None => PlotCommand::Unknown(input.to_string()),
            },
            "like" => PlotCommand::Like,
            "sell" => match rest.first() {
                Some(&"stop") => PlotCommand::Sell(None),
                Some(raw) => match raw.parse::<f64>() {
                    Ok(price) if price > 0.0 => PlotCommand::Sell(Some(price)),
                    _ => PlotCommand::Unknown(input.to_string()),
                },
                None => PlotCommand::Unknown(input.to_string()),
            },
            "finish" => PlotCommand::Finish,
            "name" => {
                if rest.is_empty() {
                    PlotCommand::Unknown(input.to_string())
                } else {
                    PlotCommand::Name(rest.join(" "))
                }
            }
            "protect" => PlotCommand::Protect,
            _ => PlotCommand::Unknown(input.to_string()),
        }
    }

    /// The capability node suffix this command is gated on.
    fn action(&self) -> &'static str {
        match self {
            PlotCommand::Claim => "claim",
            PlotCommand::Dispose => "dispose",
            PlotCommand::Home => "home",
            PlotCommand::Info => "info",
            PlotCommand::Add(_) => "add",
            PlotCommand::Remove(_) => "remove",
            PlotCommand::Deny(_) => "deny",
            PlotCommand::Undeny(_) => "undeny",
            PlotCommand::Like => "like",
            PlotCommand::Sell(_) => "sell",
            PlotCommand::Finish => "finish",
            PlotCommand::Name(_) => "name",
            PlotCommand::Protect => "protect",
            PlotCommand::Unknown(_) => "info",
        }
    }
}

/// Runs plot commands against one index/store pair.
///
/// Mutations write through: the in-memory plot is changed first, then the
/// same record is persisted, so the index the enforcer reads never lags the
/// store.
pub struct CommandProcessor<'a> {
    index: &'a mut PlotIndex,
    store: &'a PlotStore,
    config: &'a Config,
}

impl<'a> CommandProcessor<'a> {
    pub fn new(index: &'a mut PlotIndex, store: &'a PlotStore, config: &'a Config) -> Self {
        Self {
            index,
            store,
            config,
        }
    }

    /// Parse and execute one input line.
    pub fn run(&mut self, player: &mut dyn Player, input: &str) -> Result<String, PlotError> {
        let command = PlotCommand::parse(input);
        debug!(
            "plot command from {}: {:?}",
            escape_log(player.name()),
            command
        );
        self.execute(player, &command)
    }

    /// Capability gate. Admin nodes imply the plain node and also waive the
    /// owner check further down. Returns whether the player is an admin for
    /// this action.
    fn gate(&self, player: &dyn Player, action: &str) -> Result<bool, PlotError> {
        if player.has_capability(&perms::admin_node(action)) {
            return Ok(true);
        }
        if player.has_capability(&perms::use_node(action)) {
            return Ok(false);
        }
        Err(PlotError::PermissionDenied(perms::use_node(action)))
    }

    pub fn execute(
        &mut self,
        player: &mut dyn Player,
        command: &PlotCommand,
    ) -> Result<String, PlotError> {
        if let PlotCommand::Unknown(raw) = command {
            return Ok(if raw.trim().is_empty() {
                "Usage: claim | dispose | home | info | add <player> | remove <player> | \
                 deny <player> | undeny <player> | like | sell <price>|stop | finish | \
                 name <label> | protect"
                    .to_string()
            } else {
                format!("Unknown plot command: {}", raw.trim())
            });
        }

        let admin = self.gate(player, command.action())?;

        let world = player.world().to_lowercase();
        if !self.index.is_plot_world(&world) {
            return Err(PlotError::NotPlotWorld(world));
        }

        match command {
            PlotCommand::Claim => self.claim(player, &world),
            PlotCommand::Home => self.home(player, &world),
            PlotCommand::Info => self.info(player, &world),
            PlotCommand::Like => self.like(player, &world),
            PlotCommand::Dispose => self.dispose(player, &world, admin),
            PlotCommand::Add(target) => self.add(player, &world, admin, target),
            PlotCommand::Remove(target) => self.remove(player, &world, admin, target),
            PlotCommand::Deny(target) => self.deny(player, &world, admin, target),
            PlotCommand::Undeny(target) => self.undeny(player, &world, admin, target),
            PlotCommand::Sell(price) => self.sell(player, &world, admin, *price),
            PlotCommand::Finish => self.finish(player, &world, admin),
            PlotCommand::Name(label) => self.rename(player, &world, admin, label),
            PlotCommand::Protect => self.protect(player, &world),
            PlotCommand::Unknown(_) => unreachable!("handled above"),
        }
    }

    /// The cell the player stands in, provided they are on a plot interior
    /// and not a path strip.
    fn standing_cell(&self, player: &dyn Player, world: &str) -> Option<PlotId> {
        let grid = self.index.grid(world)?;
        let at = player.location();
        let id = grid.cell_at(at.block_x(), at.block_z());
        grid.contains(id, at.block_x(), at.block_z()).then_some(id)
    }

    /// Mutation target: the claimed plot under the player's feet, with the
    /// owner-or-admin check applied. Takes the index directly so callers can
    /// keep using the store while holding the plot.
    fn owned_plot_at<'p>(
        index: &'p mut PlotIndex,
        player: &dyn Player,
        world: &str,
        admin: bool,
    ) -> Result<&'p mut Plot, PlotError> {
        let at = player.location();
        let Some(plot) = index.plot_at_mut(world, &at) else {
            return Err(PlotError::NotFound(format!(
                "no plot at ({}, {}) in {}",
                at.block_x(),
                at.block_z(),
                world
            )));
        };
        if !admin && !plot.is_owner(player.name(), player.id()) {
            return Err(PlotError::PermissionDenied(format!(
                "plot {} belongs to {}",
                plot.id(),
                plot.owner_display()
            )));
        }
        Ok(plot)
    }

    fn claim(&mut self, player: &mut dyn Player, world: &str) -> Result<String, PlotError> {
        let Some(id) = self.standing_cell(player, world) else {
            return Ok("Stand inside a plot to claim it.".to_string());
        };
        if let Some(existing) = self.index.plot(world, id) {
            return Ok(format!(
                "Plot {} is already claimed by {}.",
                id,
                existing.owner_display()
            ));
        }

        let grid = *self.index.grid(world).expect("plot world has a grid");
        let (bottom, top) = grid.bounds(id);
        let mut plot = Plot::new(world, id, bottom, top).with_owner(player.name(), player.id());

        let expire_days = self
            .config
            .world(world)
            .map_or(0, |w| w.days_to_expiration);
        plot.reset_expire_from(Utc::now().date_naive(), expire_days);

        self.store.put_plot(&mut plot)?;
        self.index.insert(plot)?;
        info!(
            "{} claimed plot {} in '{}'",
            escape_log(player.name()),
            id,
            world
        );
        Ok(format!("Plot {} is yours.", id))
    }

    fn dispose(
        &mut self,
        player: &mut dyn Player,
        world: &str,
        admin: bool,
    ) -> Result<String, PlotError> {
        let id = Self::owned_plot_at(self.index, player, world, admin)?.id();
        self.store.delete_plot(world, id)?;
        self.index.evict(world, id);
        info!(
            "{} disposed plot {} in '{}'",
            escape_log(player.name()),
            id,
            world
        );
        Ok(format!("Plot {} has been disposed.", id))
    }

    fn home(&mut self, player: &mut dyn Player, world: &str) -> Result<String, PlotError> {
        let at = player.location();
        let Some(plot) = self.index.plot_at(world, &at) else {
            return Err(PlotError::NotFound(format!("no plot here in {}", world)));
        };
        let id = plot.id();
        let home = self
            .index
            .plot_home(world, id)
            .expect("plot world has a grid");
        player.set_location(home);
        Ok(format!("Teleported to the home of plot {}.", id))
    }

    fn info(&mut self, player: &mut dyn Player, world: &str) -> Result<String, PlotError> {
        let at = player.location();
        let Some(plot) = self.index.plot_at(world, &at) else {
            let Some(id) = self.standing_cell(player, world) else {
                return Ok("You are on a path between plots.".to_string());
            };
            return Ok(format!("Plot {} is unclaimed.", id));
        };

        let mut out = format!("Plot {} — owner: {}", plot.id(), plot.owner_display());
        if let Some(name) = plot.name() {
            out.push_str(&format!(" \"{}\"", name));
        }
        out.push_str(&format!(
            "\nMembers: {} | Denied: {} | Likes: {}",
            plot.member_count(),
            plot.denied_count(),
            plot.likes()
        ));
        if plot.is_for_sale() {
            out.push_str(&format!("\nFor sale at {:.2}", plot.sale_price()));
        }
        if let Some(date) = plot.finished_date() {
            out.push_str(&format!("\nFinished on {}", date));
        }
        if let Some(date) = plot.expired_date() {
            out.push_str(&format!("\nExpires on {}", date));
        }
        if plot.is_protected() {
            out.push_str("\nProtected");
        }
        Ok(out)
    }

    fn add(
        &mut self,
        player: &mut dyn Player,
        world: &str,
        admin: bool,
        target: &str,
    ) -> Result<String, PlotError> {
        let plot = Self::owned_plot_at(self.index, player, world, admin)?;
        let id = plot.id();
        plot.add_member(target, AccessLevel::Allowed);
        // An invitation overrides any standing denial for the same key.
        plot.remove_denied(target);
        self.store.put_plot(plot)?;
        info!(
            "{} added {} to plot {} in '{}'",
            escape_log(player.name()),
            escape_log(target),
            id,
            world
        );
        Ok(if target == crate::plot::types::WILDCARD {
            format!("Plot {} is now open to everyone.", id)
        } else {
            format!("{} was added to plot {}.", target, id)
        })
    }

    fn remove(
        &mut self,
        player: &mut dyn Player,
        world: &str,
        admin: bool,
        target: &str,
    ) -> Result<String, PlotError> {
        let plot = Self::owned_plot_at(self.index, player, world, admin)?;
        let id = plot.id();
        let removed = plot.remove_member(target);
        if removed {
            self.store.put_plot(plot)?;
        }
        Ok(if removed {
            format!("{} was removed from plot {}.", target, id)
        } else {
            format!("{} is not a member of plot {}.", target, id)
        })
    }

    fn deny(
        &mut self,
        player: &mut dyn Player,
        world: &str,
        admin: bool,
        target: &str,
    ) -> Result<String, PlotError> {
        let plot = Self::owned_plot_at(self.index, player, world, admin)?;
        let id = plot.id();
        let target_is_owner = plot
            .owner()
            .is_some_and(|o| o.eq_ignore_ascii_case(target))
            || plot.owner_id().is_some_and(|u| u.to_string() == target);
        if target_is_owner {
            return Ok("You cannot deny the plot's owner.".to_string());
        }
        let added = plot.add_denied(target);
        if added {
            self.store.put_plot(plot)?;
            info!(
                "{} denied {} on plot {} in '{}'",
                escape_log(player.name()),
                escape_log(target),
                id,
                world
            );
        }
        Ok(if added {
            format!("{} is now denied on plot {}.", target, id)
        } else {
            format!("{} is already denied on plot {}.", target, id)
        })
    }

    fn undeny(
        &mut self,
        player: &mut dyn Player,
        world: &str,
        admin: bool,
        target: &str,
    ) -> Result<String, PlotError> {
        let plot = Self::owned_plot_at(self.index, player, world, admin)?;
        let id = plot.id();
        let removed = plot.remove_denied(target);
        if removed {
            self.store.put_plot(plot)?;
        }
        Ok(if removed {
            format!("{} is no longer denied on plot {}.", target, id)
        } else {
            format!("{} was not denied on plot {}.", target, id)
        })
    }

    fn like(&mut self, player: &mut dyn Player, world: &str) -> Result<String, PlotError> {
        let at = player.location();
        let Some(plot) = self.index.plot_at_mut(world, &at) else {
            return Err(PlotError::NotFound(format!("no plot here in {}", world)));
        };
        if !plot.can_like(player.id()) {
            return Ok(format!("You already liked plot {}.", plot.id()));
        }
        plot.add_like(1, player.id());
        let id = plot.id();
        let likes = plot.likes();
        self.store.put_plot(plot)?;
        Ok(format!("You liked plot {} ({} likes).", id, likes))
    }

    fn sell(
        &mut self,
        player: &mut dyn Player,
        world: &str,
        admin: bool,
        price: Option<f64>,
    ) -> Result<String, PlotError> {
        let plot = Self::owned_plot_at(self.index, player, world, admin)?;
        let id = plot.id();
        let reply = match price {
            Some(price) => {
                plot.set_price(price);
                plot.set_for_sale(true);
                format!("Plot {} is now for sale at {:.2}.", id, price)
            }
            None => {
                plot.set_for_sale(false);
                format!("Plot {} is no longer for sale.", id)
            }
        };
        self.store.put_plot(plot)?;
        Ok(reply)
    }

    fn finish(
        &mut self,
        player: &mut dyn Player,
        world: &str,
        admin: bool,
    ) -> Result<String, PlotError> {
        let plot = Self::owned_plot_at(self.index, player, world, admin)?;
        let id = plot.id();
        let reply = if plot.is_finished() {
            plot.clear_finished();
            format!("Plot {} is marked unfinished again.", id)
        } else {
            plot.set_finished(Utc::now().date_naive());
            format!("Plot {} is marked finished.", id)
        };
        self.store.put_plot(plot)?;
        Ok(reply)
    }

    fn rename(
        &mut self,
        player: &mut dyn Player,
        world: &str,
        admin: bool,
        label: &str,
    ) -> Result<String, PlotError> {
        let plot = Self::owned_plot_at(self.index, player, world, admin)?;
        let id = plot.id();
        plot.set_name(Some(label.to_string()));
        self.store.put_plot(plot)?;
        info!(
            "{} named plot {} \"{}\"",
            escape_log(player.name()),
            id,
            escape_log(label)
        );
        Ok(format!("Plot {} is now named \"{}\".", id, label))
    }

    /// Admin only: there is no `use.protect` grant.
    fn protect(&mut self, player: &mut dyn Player, world: &str) -> Result<String, PlotError> {
        if !player.has_capability(&perms::admin_node("protect")) {
            return Err(PlotError::PermissionDenied(perms::admin_node("protect")));
        }
        let plot = Self::owned_plot_at(self.index, player, world, true)?;
        let id = plot.id();
        let protected = !plot.is_protected();
        plot.set_protected(protected);
        self.store.put_plot(plot)?;
        Ok(if protected {
            format!("Plot {} is now protected.", id)
        } else {
            format!("Plot {} is no longer protected.", id)
        })
    }
}
