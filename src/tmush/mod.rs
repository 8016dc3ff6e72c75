//! TinyMUSH world model, persistence and command handling.
//!
//! The world is an explicit entity store (rooms, exits, objects, players)
//! kept in sled. Shops are ordinary rooms that carry the shop command set and
//! a reference to the storeroom their wares are drawn from.

pub mod builder_commands;
pub mod commands;
pub mod errors;
pub mod lock;
pub mod resolver;
pub mod shop;
pub mod state;
pub mod storage;
pub mod types;

pub use builder_commands::{
    handle_buildshop_command, handle_create_command, handle_lock_command, handle_open_command,
    handle_price_command, handle_teleport_command,
};
pub use commands::{player_message, TinyMushCommand, TinyMushProcessor};
pub use errors::TinyMushError;
pub use lock::{AccessType, Lock, LockPredicate};
pub use shop::{advance, build_catalog, MenuStep, ShopMenuState, ShopSession, ShopView, Ware};
pub use state::{canonical_world_seed, OLD_TOWNE_WORLD_ROOM_IDS, REQUIRED_START_LOCATION_ID};
pub use storage::{TinyMushStore, TinyMushStoreBuilder, WorldChanges, WorldStats};
pub use types::*;
