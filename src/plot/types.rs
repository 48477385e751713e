use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use chrono::{Days, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::plot::errors::PlotError;

pub const PLOT_SCHEMA_VERSION: u8 = 1;

/// Membership tier on a plot. `Trusted` members keep their build rights
/// while the owner is offline; `Allowed` members do not.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum AccessLevel {
    Allowed,
    Trusted,
}

impl AccessLevel {
    /// Stable numeric code used by persisted records.
    pub fn code(self) -> u8 {
        match self {
            AccessLevel::Allowed => 0,
            AccessLevel::Trusted => 1,
        }
    }

    /// Decode a stored level. Unknown codes fall back to `Allowed`, the
    /// permissive floor, matching how legacy data is interpreted.
    pub fn from_code(code: u8) -> Self {
        match code {
            1 => AccessLevel::Trusted,
            _ => AccessLevel::Allowed,
        }
    }
}

impl fmt::Display for AccessLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccessLevel::Allowed => write!(f, "allowed"),
            AccessLevel::Trusted => write!(f, "trusted"),
        }
    }
}

/// A plot's coordinate on the world grid. Not a block coordinate: plot
/// (1;0) starts `plot_size + path_width` blocks east of plot (0;0).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PlotId {
    pub x: i32,
    pub z: i32,
}

impl PlotId {
    pub fn new(x: i32, z: i32) -> Self {
        Self { x, z }
    }
}

impl fmt::Display for PlotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{};{}", self.x, self.z)
    }
}

impl FromStr for PlotId {
    type Err = PlotError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let Some((x, z)) = s.split_once(';') else {
            return Err(PlotError::InvalidPlotId(s.to_string()));
        };
        let x = x
            .trim()
            .parse()
            .map_err(|_| PlotError::InvalidPlotId(s.to_string()))?;
        let z = z
            .trim()
            .parse()
            .map_err(|_| PlotError::InvalidPlotId(s.to_string()))?;
        Ok(Self { x, z })
    }
}

/// Integer block coordinate, used for plot corners and homes.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct BlockPos {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl BlockPos {
    pub fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }
}

impl fmt::Display for BlockPos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.z)
    }
}

/// A player's exact location including look direction. The world it belongs
/// to travels separately (players answer `world()`).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Position {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub yaw: f32,
    pub pitch: f32,
}

impl Position {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self {
            x,
            y,
            z,
            yaw: 0.0,
            pitch: 0.0,
        }
    }

    pub fn facing(mut self, yaw: f32, pitch: f32) -> Self {
        self.yaw = yaw;
        self.pitch = pitch;
        self
    }

    /// Containing block column, by flooring. (-0.5, _, 3.2) is block (-1, _, 3).
    pub fn block_x(&self) -> i32 {
        self.x.floor() as i32
    }

    pub fn block_y(&self) -> i32 {
        self.y.floor() as i32
    }

    pub fn block_z(&self) -> i32 {
        self.z.floor() as i32
    }
}

impl From<BlockPos> for Position {
    fn from(b: BlockPos) -> Self {
        Position::new(b.x as f64, b.y as f64, b.z as f64)
    }
}

pub const WILDCARD: &str = "*";

/// One parcel's full record: identity, geometry, membership, and state.
///
/// Membership and denial keys are either a player display name or a UUID
/// rendered to a string. Both forms occur in stored data and both are
/// honored by every query; callers must ask with the form that was stored.
/// Collections are private so the wildcard and idempotence rules below hold
/// no matter who mutates the plot.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Plot {
    internal_id: i64,
    id: PlotId,
    world: String,
    #[serde(default)]
    name: Option<String>,
    owner: Option<String>,
    owner_id: Option<Uuid>,
    bottom: BlockPos,
    top: BlockPos,
    members: BTreeMap<String, AccessLevel>,
    denied: BTreeSet<String>,
    #[serde(default)]
    likes: u32,
    #[serde(default)]
    likers: BTreeSet<Uuid>,
    for_sale: bool,
    price: f64,
    finished: bool,
    finished_date: Option<NaiveDate>,
    created_date: NaiveDate,
    expired_date: Option<NaiveDate>,
    #[serde(default)]
    protected: bool,
    #[serde(default)]
    metadata: BTreeMap<String, BTreeMap<String, String>>,
    pub schema_version: u8,
}

impl Plot {
    /// A fresh, unowned plot spanning `bottom..=top`. The world name is
    /// stored lowercased; `internal_id` stays 0 until first persisted.
    pub fn new(world: &str, id: PlotId, bottom: BlockPos, top: BlockPos) -> Self {
        Self {
            internal_id: 0,
            id,
            world: world.to_lowercase(),
            name: None,
            owner: None,
            owner_id: None,
            bottom,
            top,
            members: BTreeMap::new(),
            denied: BTreeSet::new(),
            likes: 0,
            likers: BTreeSet::new(),
            for_sale: false,
            price: 0.0,
            finished: false,
            finished_date: None,
            created_date: Utc::now().date_naive(),
            expired_date: None,
            protected: false,
            metadata: BTreeMap::new(),
            schema_version: PLOT_SCHEMA_VERSION,
        }
    }

    pub fn with_owner(mut self, name: &str, id: Uuid) -> Self {
        self.set_owner(name, id);
        self
    }

    pub fn with_name(mut self, name: &str) -> Self {
        self.name = Some(name.to_string());
        self
    }

    // --- identity ----------------------------------------------------------

    pub fn id(&self) -> PlotId {
        self.id
    }

    pub fn world(&self) -> &str {
        &self.world
    }

    /// Database-assigned id; 0 means the plot was never durably stored.
    pub fn internal_id(&self) -> i64 {
        self.internal_id
    }

    pub fn is_persisted(&self) -> bool {
        self.internal_id != 0
    }

    pub(crate) fn assign_internal_id(&mut self, id: i64) {
        self.internal_id = id;
    }

    /// Record identity: same database row, not structural equality. Compares
    /// internal id, grid id, owner id, world, and expiry date only. Use `==`
    /// for whole-record comparison.
    pub fn same_record_as(&self, other: &Plot) -> bool {
        self.internal_id == other.internal_id
            && self.id == other.id
            && self.owner_id == other.owner_id
            && self.world == other.world
            && self.expired_date == other.expired_date
    }

    // --- ownership ---------------------------------------------------------

    pub fn owner(&self) -> Option<&str> {
        self.owner.as_deref()
    }

    pub fn owner_id(&self) -> Option<Uuid> {
        self.owner_id
    }

    pub fn set_owner(&mut self, name: &str, id: Uuid) {
        self.owner = Some(name.to_string());
        self.owner_id = Some(id);
    }

    pub fn clear_owner(&mut self) {
        self.owner = None;
        self.owner_id = None;
    }

    pub fn has_owner(&self) -> bool {
        self.owner_id.is_some()
    }

    /// Name to show in listings when the plot may be unowned.
    pub fn owner_display(&self) -> &str {
        self.owner.as_deref().unwrap_or("Unknown")
    }

    /// True when `name` (case-insensitive) or `id` is the owner.
    pub fn is_owner(&self, name: &str, id: Uuid) -> bool {
        if self.owner_id == Some(id) {
            return true;
        }
        matches!(&self.owner, Some(o) if o.eq_ignore_ascii_case(name))
    }

    // --- naming ------------------------------------------------------------

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn set_name(&mut self, name: Option<String>) {
        self.name = name;
    }

    // --- geometry ----------------------------------------------------------

    pub fn bottom(&self) -> BlockPos {
        self.bottom
    }

    pub fn top(&self) -> BlockPos {
        self.top
    }

    /// Midpoint of the corner columns, at y 0. A survey point, not a safe
    /// teleport target; use the index's plot home for teleports.
    pub fn middle(&self) -> BlockPos {
        BlockPos::new(
            (self.top.x + self.bottom.x + 1) / 2,
            0,
            (self.top.z + self.bottom.z + 1) / 2,
        )
    }

    // --- membership --------------------------------------------------------

    /// Grant `key` the given level. Adding the wildcard `"*"` first clears
    /// every member and stores the wildcard at `Allowed`; a wildcard grant
    /// is never trusted, whatever level was asked for.
    pub fn add_member(&mut self, key: &str, level: AccessLevel) {
        if key == WILDCARD {
            self.members.clear();
            self.members.insert(WILDCARD.to_string(), AccessLevel::Allowed);
        } else {
            self.members.insert(key.to_string(), level);
        }
    }

    pub fn remove_member(&mut self, key: &str) -> bool {
        self.members.remove(key).is_some()
    }

    pub fn remove_all_members(&mut self) {
        self.members.clear();
    }

    pub fn is_member(&self, key: &str) -> bool {
        self.members.contains_key(WILDCARD) || self.members.contains_key(key)
    }

    /// Effective level for `key`: a present wildcard answers `Allowed` for
    /// everyone, otherwise the exact entry if any.
    pub fn member_level(&self, key: &str) -> Option<AccessLevel> {
        if self.members.contains_key(WILDCARD) {
            return Some(AccessLevel::Allowed);
        }
        self.members.get(key).copied()
    }

    pub fn members(&self) -> impl Iterator<Item = (&str, AccessLevel)> {
        self.members.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn member_count(&self) -> usize {
        self.members.len()
    }

    /// Bulk hydration from stored rows. Extends without wildcard
    /// normalization: legacy data is replayed exactly as it was saved.
    pub fn load_members<I: IntoIterator<Item = (String, AccessLevel)>>(&mut self, entries: I) {
        self.members.extend(entries);
    }

    // --- denial ------------------------------------------------------------

    /// Bar `key` from the plot. Idempotent through the same wildcard-aware
    /// predicate the enforcer uses: under an active `"*"` denial no
    /// individual entry is added. Returns whether the set changed.
    pub fn add_denied(&mut self, key: &str) -> bool {
        if self.is_denied(key) {
            return false;
        }
        self.denied.insert(key.to_string())
    }

    pub fn remove_denied(&mut self, key: &str) -> bool {
        self.denied.remove(key)
    }

    pub fn remove_all_denied(&mut self) {
        self.denied.clear();
    }

    /// True when the wildcard is denied or `key` itself is. `key` may be a
    /// display name or a UUID string; supply the form that was stored.
    pub fn is_denied(&self, key: &str) -> bool {
        self.denied.contains(WILDCARD) || self.denied.contains(key)
    }

    pub fn denied(&self) -> impl Iterator<Item = &str> {
        self.denied.iter().map(|s| s.as_str())
    }

    pub fn denied_count(&self) -> usize {
        self.denied.len()
    }

    pub fn load_denied<I: IntoIterator<Item = String>>(&mut self, entries: I) {
        self.denied.extend(entries);
    }

    // --- likes -------------------------------------------------------------

    /// True until `id` has liked this plot. Callers consult this before
    /// `add_like`; the count itself is not guarded (see `add_like`).
    pub fn can_like(&self, id: Uuid) -> bool {
        !self.likers.contains(&id)
    }

    /// Add `count` likes and record `id` as a liker. The liker set is a set,
    /// but the count is a raw delta: calling this twice for the same player
    /// double-counts. Legacy behavior, kept; gate on `can_like`.
    pub fn add_like(&mut self, count: u32, id: Uuid) {
        self.likes += count;
        self.likers.insert(id);
    }

    pub fn remove_like(&mut self, count: u32, id: Uuid) {
        self.likes = self.likes.saturating_sub(count);
        self.likers.remove(&id);
    }

    pub fn likes(&self) -> u32 {
        self.likes
    }

    pub fn likers(&self) -> impl Iterator<Item = Uuid> + '_ {
        self.likers.iter().copied()
    }

    // --- sale --------------------------------------------------------------

    pub fn is_for_sale(&self) -> bool {
        self.for_sale
    }

    pub fn set_for_sale(&mut self, for_sale: bool) {
        self.for_sale = for_sale;
    }

    /// Raw stored price. Stays as last set even after a sale ends; use
    /// `sale_price` for the effective value.
    pub fn price(&self) -> f64 {
        self.price
    }

    pub fn set_price(&mut self, price: f64) {
        self.price = price;
    }

    /// The price a buyer would pay right now: 0 unless the plot is for sale.
    pub fn sale_price(&self) -> f64 {
        if self.for_sale {
            self.price
        } else {
            0.0
        }
    }

    // --- lifecycle ---------------------------------------------------------

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn finished_date(&self) -> Option<NaiveDate> {
        self.finished_date
    }

    /// Mark the build complete, stamping the date. The flag and the date
    /// move together in both directions.
    pub fn set_finished(&mut self, today: NaiveDate) {
        self.finished = true;
        self.finished_date = Some(today);
    }

    pub fn clear_finished(&mut self) {
        self.finished = false;
        self.finished_date = None;
    }

    pub fn created_date(&self) -> NaiveDate {
        self.created_date
    }

    pub fn expired_date(&self) -> Option<NaiveDate> {
        self.expired_date
    }

    /// Re-arm the expiry clock. `days == 0` clears the date ("never
    /// expires"). `days > 0` stores `today + days`, but only when that lands
    /// later than the current date: repeated resets extend, never shorten.
    /// Returns whether the stored date changed.
    pub fn reset_expire_from(&mut self, today: NaiveDate, days: u32) -> bool {
        if days == 0 {
            return self.expired_date.take().is_some();
        }
        let target = today
            .checked_add_days(Days::new(u64::from(days)))
            .unwrap_or(NaiveDate::MAX);
        match self.expired_date {
            Some(current) if target <= current => false,
            _ => {
                self.expired_date = Some(target);
                true
            }
        }
    }

    pub fn reset_expire(&mut self, days: u32) -> bool {
        self.reset_expire_from(Utc::now().date_naive(), days)
    }

    pub fn is_expired(&self, today: NaiveDate) -> bool {
        matches!(self.expired_date, Some(d) if d <= today)
    }

    pub fn is_protected(&self) -> bool {
        self.protected
    }

    pub fn set_protected(&mut self, protected: bool) {
        self.protected = protected;
    }

    // --- metadata ----------------------------------------------------------

    pub fn has_namespace(&self, namespace: &str) -> bool {
        self.metadata.contains_key(namespace)
    }

    /// Value stored by an external collaborator. Asking inside a namespace
    /// that was never set is an error; an absent key in a live namespace is
    /// `Ok(None)`.
    pub fn plugin_value(&self, namespace: &str, key: &str) -> Result<Option<&str>, PlotError> {
        let ns = self
            .metadata
            .get(namespace)
            .ok_or_else(|| PlotError::MissingNamespace(namespace.to_string()))?;
        Ok(ns.get(key).map(|v| v.as_str()))
    }

    pub fn set_plugin_value(&mut self, namespace: &str, key: &str, value: &str) {
        self.metadata
            .entry(namespace.to_string())
            .or_default()
            .insert(key.to_string(), value.to_string());
    }

    /// Remove one key; a namespace left empty is pruned so `has_namespace`
    /// turns false again.
    pub fn remove_plugin_value(&mut self, namespace: &str, key: &str) -> bool {
        let Some(ns) = self.metadata.get_mut(namespace) else {
            return false;
        };
        let removed = ns.remove(key).is_some();
        if ns.is_empty() {
            self.metadata.remove(namespace);
        }
        removed
    }
}
