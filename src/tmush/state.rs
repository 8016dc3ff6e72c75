//! Canonical starting world for a fresh store.
//!
//! Two public rooms joined by a pair of exits: new characters arrive in the
//! Town Square and builders typically hang new shops off the South Market.

use chrono::{DateTime, Utc};

use crate::tmush::storage::WorldChanges;
use crate::tmush::types::{ExitRecord, RoomFlag, RoomRecord};

/// Required starting location where new characters enter.
pub const REQUIRED_START_LOCATION_ID: &str = "town_square";

pub const SOUTH_MARKET_ID: &str = "south_market";

pub const OLD_TOWNE_WORLD_ROOM_IDS: &[&str] = &[REQUIRED_START_LOCATION_ID, SOUTH_MARKET_ID];

pub fn canonical_world_seed(now: DateTime<Utc>) -> WorldChanges {
    let mut square = RoomRecord::world(
        REQUIRED_START_LOCATION_ID,
        "Town Square",
        "Cobblestones ring a dry fountain. A lane runs south toward the market stalls.",
    )
    .with_flag(RoomFlag::Safe)
    .with_created_at(now);

    let mut market = RoomRecord::world(
        SOUTH_MARKET_ID,
        "South Market",
        "Awnings and shuttered stalls line the lane. The square lies back to the north.",
    )
    .with_flag(RoomFlag::Safe)
    .with_created_at(now);

    let to_market =
        ExitRecord::new("square_to_market", "south", square.id.as_str(), market.id.as_str())
            .with_aliases(&["s", "market"]);
    let to_square =
        ExitRecord::new("market_to_square", "north", market.id.as_str(), square.id.as_str())
            .with_aliases(&["n", "square"]);

    square.exits.push(to_market.id.clone());
    market.exits.push(to_square.id.clone());

    WorldChanges {
        rooms: vec![square, market],
        exits: vec![to_market, to_square],
        objects: Vec::new(),
        players: Vec::new(),
    }
}
