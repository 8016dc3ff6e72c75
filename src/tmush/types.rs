use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::tmush::lock::Lock;
use crate::tmush::shop::ShopSession;

pub const PLAYER_SCHEMA_VERSION: u8 = 1;
pub const ROOM_SCHEMA_VERSION: u8 = 1;
pub const OBJECT_SCHEMA_VERSION: u8 = 1;
pub const EXIT_SCHEMA_VERSION: u8 = 1;

/// Ledger key holding a character's spendable currency.
pub const BUDGET_KEY: &str = "Budget";

/// Item/currency name -> quantity owned.
pub type Ledger = BTreeMap<String, i64>;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum RoomFlag {
    Safe,
    Indoor,
    Shop,
    Storeroom,
}

/// Extra commands a room makes available to whoever stands in it.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum CommandSet {
    /// `buy` / `shop` / `browse`
    Shop,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
    Builders,
    Admins,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ObjectLocation {
    Room(String),
    Player(String),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RoomRecord {
    pub id: String,
    pub name: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub flags: Vec<RoomFlag>,
    #[serde(default)]
    pub command_sets: Vec<CommandSet>,
    /// Object ids, in the order they arrived.
    #[serde(default)]
    pub items: Vec<String>,
    /// Ids of exits leading out of this room.
    #[serde(default)]
    pub exits: Vec<String>,
    /// Back-reference to the storeroom feeding a shop. Unset until a builder binds it.
    #[serde(default)]
    pub storeroom: Option<String>,
    pub schema_version: u8,
}

impl RoomRecord {
    pub fn world(id: &str, name: &str, description: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            description: description.to_string(),
            created_at: Utc::now(),
            flags: Vec::new(),
            command_sets: Vec::new(),
            items: Vec::new(),
            exits: Vec::new(),
            storeroom: None,
            schema_version: ROOM_SCHEMA_VERSION,
        }
    }

    /// A shop storefront: carries the shop command set and starts without a storeroom.
    pub fn shop(id: &str, name: &str) -> Self {
        let mut room = Self::world(id, name, "Wares are displayed behind a worn counter.")
            .with_flag(RoomFlag::Shop)
            .with_flag(RoomFlag::Indoor);
        room.command_sets.push(CommandSet::Shop);
        room.storeroom = None;
        room
    }

    pub fn with_flag(mut self, flag: RoomFlag) -> Self {
        if !self.flags.contains(&flag) {
            self.flags.push(flag);
        }
        self
    }

    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self
    }

    pub fn has_command_set(&self, set: CommandSet) -> bool {
        self.command_sets.contains(&set)
    }

    pub fn is_shop(&self) -> bool {
        self.flags.contains(&RoomFlag::Shop)
    }

    pub fn add_item(&mut self, object_id: &str) {
        if !self.items.iter().any(|id| id == object_id) {
            self.items.push(object_id.to_string());
        }
    }

    pub fn remove_item(&mut self, object_id: &str) -> bool {
        let before = self.items.len();
        self.items.retain(|id| id != object_id);
        self.items.len() != before
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ObjectRecord {
    pub id: String,
    pub name: String,
    pub description: String,
    pub location: ObjectLocation,
    /// Asking price when sold from a storeroom. Unset or non-positive means the shop default.
    #[serde(default)]
    pub price: Option<i64>,
    pub takeable: bool,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub schema_version: u8,
}

impl ObjectRecord {
    pub fn new(id: &str, name: &str, location: ObjectLocation, created_by: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            description: String::new(),
            location,
            price: None,
            takeable: true,
            created_by: created_by.to_string(),
            created_at: Utc::now(),
            schema_version: OBJECT_SCHEMA_VERSION,
        }
    }

    pub fn with_price(mut self, price: i64) -> Self {
        self.price = Some(price);
        self
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = description.to_string();
        self
    }

    pub fn price_or(&self, default_price: i64) -> i64 {
        self.price.filter(|p| *p > 0).unwrap_or(default_price)
    }
}

/// A one-way passage between two rooms.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExitRecord {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub aliases: Vec<String>,
    pub source: String,
    pub destination: String,
    #[serde(default)]
    pub lock: Option<Lock>,
    pub created_at: DateTime<Utc>,
    pub schema_version: u8,
}

impl ExitRecord {
    pub fn new(id: &str, name: &str, source: &str, destination: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            aliases: Vec::new(),
            source: source.to_string(),
            destination: destination.to_string(),
            lock: None,
            created_at: Utc::now(),
            schema_version: EXIT_SCHEMA_VERSION,
        }
    }

    pub fn with_aliases(mut self, aliases: &[&str]) -> Self {
        self.aliases = aliases.iter().map(|a| a.to_string()).collect();
        self
    }

    pub fn with_lock(mut self, lock: Lock) -> Self {
        self.lock = Some(lock);
        self
    }

    /// Exits match on exact name or alias, ignoring case and surrounding space.
    pub fn matches(&self, query: &str) -> bool {
        let query = query.trim();
        self.name.eq_ignore_ascii_case(query)
            || self.aliases.iter().any(|a| a.eq_ignore_ascii_case(query))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub enum PlayerState {
    #[default]
    Exploring,
    Shopping(ShopSession),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlayerRecord {
    pub username: String,
    pub display_name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub current_room: String,
    #[serde(default)]
    pub state: PlayerState,
    #[serde(default)]
    pub ledger: Ledger,
    /// Object ids carried by the player.
    #[serde(default)]
    pub carried: Vec<String>,
    #[serde(default)]
    pub permissions: Vec<Permission>,
    pub schema_version: u8,
}

impl PlayerRecord {
    pub fn new(username: &str, display_name: &str, starting_room: &str) -> Self {
        let now = Utc::now();
        Self {
            username: username.to_string(),
            display_name: display_name.to_string(),
            created_at: now,
            updated_at: now,
            current_room: starting_room.to_string(),
            state: PlayerState::Exploring,
            ledger: Ledger::new(),
            carried: Vec::new(),
            permissions: Vec::new(),
            schema_version: PLAYER_SCHEMA_VERSION,
        }
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    /// Spendable currency; absent means zero.
    pub fn budget(&self) -> i64 {
        self.quantity_of(BUDGET_KEY)
    }

    pub fn quantity_of(&self, name: &str) -> i64 {
        self.ledger.get(name).copied().unwrap_or(0)
    }

    pub fn grant(&mut self, permission: Permission) {
        if !self.permissions.contains(&permission) {
            self.permissions.push(permission);
        }
    }

    /// Admins pass every builder check.
    pub fn has_permission(&self, permission: Permission) -> bool {
        self.permissions.contains(&permission) || self.permissions.contains(&Permission::Admins)
    }

    pub fn is_shopping(&self) -> bool {
        matches!(self.state, PlayerState::Shopping(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shop_room_installs_command_set_without_storeroom() {
        let shop = RoomRecord::shop("#1", "Bob");
        assert!(shop.is_shop());
        assert!(shop.has_command_set(CommandSet::Shop));
        assert_eq!(shop.storeroom, None);

        let plain = RoomRecord::world("#2", "Bob-storage", "");
        assert!(!plain.has_command_set(CommandSet::Shop));
    }

    #[test]
    fn price_defaults_when_unset_or_non_positive() {
        let loc = ObjectLocation::Room("#2".to_string());
        let unset = ObjectRecord::new("#3", "Rope", loc.clone(), "sysop");
        assert_eq!(unset.price_or(1), 1);
        assert_eq!(unset.clone().with_price(0).price_or(1), 1);
        assert_eq!(unset.with_price(10).price_or(1), 10);
    }

    #[test]
    fn exit_matches_name_and_aliases() {
        let exit = ExitRecord::new("#4", "back door", "#1", "#2")
            .with_aliases(&["storage", "store room"]);
        assert!(exit.matches("Back Door"));
        assert!(exit.matches(" store room "));
        assert!(!exit.matches("door"));
    }

    #[test]
    fn ledger_defaults_to_zero() {
        let mut player = PlayerRecord::new("alice", "Alice", "town_square");
        assert_eq!(player.budget(), 0);
        player.ledger.insert(BUDGET_KEY.to_string(), 25);
        assert_eq!(player.budget(), 25);
        assert_eq!(player.quantity_of("Sword"), 0);
    }

    #[test]
    fn admins_count_as_builders() {
        let mut player = PlayerRecord::new("sysop", "Sysop", "town_square");
        assert!(!player.has_permission(Permission::Builders));
        player.grant(Permission::Admins);
        assert!(player.has_permission(Permission::Builders));
    }

    #[test]
    fn room_items_keep_arrival_order() {
        let mut room = RoomRecord::world("#2", "Store", "");
        room.add_item("#5");
        room.add_item("#3");
        room.add_item("#5");
        assert_eq!(room.items, vec!["#5".to_string(), "#3".to_string()]);
        assert!(room.remove_item("#5"));
        assert!(!room.remove_item("#5"));
    }
}
