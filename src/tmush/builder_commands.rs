//! Builder Commands for TinyMUSH shops
//!
//! World-editing commands restricted to the `Builders` permission. They
//! create whole structures in one go so a builder never needs to know dbrefs
//! in advance.
//!
//! ## Commands
//! - `@buildshop <name>` - shop room, locked storeroom, both exits and the key
//! - `@create <name>[=<price>]` - new object in the current room
//! - `@price <object>=<price>` - set (or clear, with an empty price) an object's price
//! - `@teleport <#dbref|room name>` - jump to a room
//! - `@open <exit name>=<#dbref>` - exit from the current room to another room
//! - `@lock <exit>=<lock>` - set an exit's lock, e.g. `traverse:holds(Bob-storekey)`;
//!   an empty lock removes it

use log::info;

use crate::logutil::escape_log;
use crate::tmush::{
    errors::TinyMushError,
    lock::Lock,
    resolver::{
        format_disambiguation_prompt, resolve_exit, resolve_object_name, ResolveResult,
        SearchScope,
    },
    storage::{TinyMushStore, WorldChanges},
    types::{
        ExitRecord, ObjectLocation, ObjectRecord, Permission, PlayerRecord, RoomFlag, RoomRecord,
    },
};

pub const BUILDSHOP_USAGE: &str = "Usage: @buildshop <storename>";
pub const CREATE_USAGE: &str = "Usage: @create <name>[=<price>]";
pub const PRICE_USAGE: &str = "Usage: @price <object>=<price>";
pub const TELEPORT_USAGE: &str = "Usage: @teleport <#dbref|room name>";
pub const OPEN_USAGE: &str = "Usage: @open <exit name>=<#dbref>";
pub const LOCK_USAGE: &str = "Usage: @lock <exit>=<lock>";
const PRICE_RULE: &str = "Price must be a whole number of at least 1.";

/// Exit from a shop into its storeroom.
pub const BACK_DOOR_NAME: &str = "back door";
pub const BACK_DOOR_ALIASES: &[&str] = &["storage", "store room"];
/// Exit from a storeroom back into its shop.
pub const DOOR_NAME: &str = "door";

fn require_builder(player: &PlayerRecord, command: &str) -> Result<(), TinyMushError> {
    if player.has_permission(Permission::Builders) {
        return Ok(());
    }
    Err(TinyMushError::PermissionDenied(format!(
        "Only builders may use {}.",
        command
    )))
}

/// Split `left=right`, trimming both halves. Without `=` the right half is `None`.
fn split_assignment(args: &str) -> (&str, Option<&str>) {
    match args.split_once('=') {
        Some((left, right)) => (left.trim(), Some(right.trim())),
        None => (args.trim(), None),
    }
}

/// Prices are whole numbers of at least one.
fn parse_price(input: &str) -> Option<i64> {
    input.parse::<i64>().ok().filter(|p| *p > 0)
}

pub fn storeroom_name(shop_name: &str) -> String {
    format!("{}-storage", shop_name)
}

pub fn storekey_name(shop_name: &str) -> String {
    format!("{}-storekey", shop_name)
}

/// Handle `@buildshop <name>`.
///
/// Creates the shop, its storeroom, the locked `back door` and the `door`
/// back out, and drops the store key in the shop, all in one transaction.
/// The builder stays where they are.
pub fn handle_buildshop_command(
    player: &PlayerRecord,
    args: &str,
    store: &TinyMushStore,
) -> Result<String, TinyMushError> {
    require_builder(player, "@buildshop")?;

    let name = args.trim();
    if name.is_empty() {
        return Ok(BUILDSHOP_USAGE.to_string());
    }

    let shop_id = store.next_dbref()?;
    let storeroom_id = store.next_dbref()?;
    let back_door_id = store.next_dbref()?;
    let door_id = store.next_dbref()?;
    let key_id = store.next_dbref()?;

    let key_name = storekey_name(name);

    let mut shop = RoomRecord::shop(&shop_id, name);
    let mut storeroom = RoomRecord::world(
        &storeroom_id,
        &storeroom_name(name),
        "Crates and shelves crowd this back room. Whatever is kept here is for sale out front.",
    )
    .with_flag(RoomFlag::Storeroom)
    .with_flag(RoomFlag::Indoor);

    let back_door = ExitRecord::new(&back_door_id, BACK_DOOR_NAME, &shop_id, &storeroom_id)
        .with_aliases(BACK_DOOR_ALIASES)
        .with_lock(Lock::traverse_holds(&key_name));
    let door = ExitRecord::new(&door_id, DOOR_NAME, &storeroom_id, &shop_id);

    let key = ObjectRecord::new(
        &key_id,
        &key_name,
        ObjectLocation::Room(shop_id.clone()),
        &player.username,
    )
    .with_description(&format!("A brass key that opens the back door of {}.", name));

    shop.storeroom = Some(storeroom_id.clone());
    shop.exits.push(back_door_id);
    shop.add_item(&key_id);
    storeroom.exits.push(door_id);

    let changes = WorldChanges {
        rooms: vec![shop, storeroom],
        exits: vec![back_door, door],
        objects: vec![key],
        players: Vec::new(),
    };
    store.apply(changes)?;

    info!(
        "shop.build name={} shop={} storeroom={} builder={}",
        escape_log(name),
        shop_id,
        storeroom_id,
        escape_log(&player.username)
    );

    Ok(format!("The shop {} was created!", name))
}

/// Handle `@create <name>[=<price>]` in the builder's current room.
pub fn handle_create_command(
    player: &PlayerRecord,
    args: &str,
    store: &TinyMushStore,
) -> Result<String, TinyMushError> {
    require_builder(player, "@create")?;

    let (name, price) = split_assignment(args);
    if name.is_empty() {
        return Ok(CREATE_USAGE.to_string());
    }
    let price = match price {
        None | Some("") => None,
        Some(text) => match parse_price(text) {
            Some(p) => Some(p),
            None => return Ok(format!("{}\n{}", PRICE_RULE, CREATE_USAGE)),
        },
    };

    let mut room = store.get_room(&player.current_room)?;
    let object_id = store.next_dbref()?;
    let mut object = ObjectRecord::new(
        &object_id,
        name,
        ObjectLocation::Room(room.id.clone()),
        &player.username,
    );
    object.price = price;
    room.add_item(&object_id);

    let mut changes = WorldChanges::new();
    changes.rooms.push(room);
    changes.objects.push(object);
    store.apply(changes)?;

    info!(
        "object.create id={} name={} price={:?} builder={}",
        object_id,
        escape_log(name),
        price,
        escape_log(&player.username)
    );

    Ok(match price {
        Some(p) => format!("Created {} ({}) priced at {}.", name, object_id, p),
        None => format!("Created {} ({}).", name, object_id),
    })
}

/// Handle `@price <object>=<price>`. An empty price clears it back to the shop default.
pub fn handle_price_command(
    player: &PlayerRecord,
    args: &str,
    store: &TinyMushStore,
) -> Result<String, TinyMushError> {
    require_builder(player, "@price")?;

    let (target, price) = split_assignment(args);
    let Some(price) = price else {
        return Ok(PRICE_USAGE.to_string());
    };
    if target.is_empty() {
        return Ok(PRICE_USAGE.to_string());
    }

    let new_price = if price.is_empty() {
        None
    } else {
        match parse_price(price) {
            Some(p) => Some(p),
            None => return Ok(format!("{}\n{}", PRICE_RULE, PRICE_USAGE)),
        }
    };

    let mut object = match resolve_object_name(player, target, SearchScope::Room, store)? {
        ResolveResult::Found(object) => object,
        ResolveResult::Ambiguous(matches) => return Ok(format_disambiguation_prompt(&matches)),
        ResolveResult::NotFound => return Ok(format!("You don't see {} here.", target)),
    };

    object.price = new_price;
    let name = object.name.clone();
    store.put_object(object)?;

    Ok(match new_price {
        Some(p) => format!("{} now costs {}.", name, p),
        None => format!("{} no longer has a price of its own.", name),
    })
}

/// Find a room by `#dbref` or by exact name.
fn find_room(
    query: &str,
    store: &TinyMushStore,
) -> Result<Result<RoomRecord, String>, TinyMushError> {
    if query.starts_with('#') {
        return match store.get_room(query) {
            Ok(room) => Ok(Ok(room)),
            Err(TinyMushError::NotFound(_)) => Ok(Err(format!("There is no room {}.", query))),
            Err(e) => Err(e),
        };
    }

    let mut rooms = store.find_rooms_by_name(query)?;
    match rooms.len() {
        0 => Ok(Err(format!("There is no room called {}.", query))),
        1 => Ok(Ok(rooms.remove(0))),
        _ => {
            let listing: Vec<String> = rooms
                .iter()
                .map(|room| format!("{} [{}]", room.name, room.id))
                .collect();
            Ok(Err(format!(
                "Several rooms are called {}: {}. Use a #dbref.",
                query,
                listing.join(", ")
            )))
        }
    }
}

/// Handle `@teleport <#dbref|room name>`. Moves and saves `player`.
pub fn handle_teleport_command(
    player: &mut PlayerRecord,
    args: &str,
    store: &TinyMushStore,
) -> Result<String, TinyMushError> {
    require_builder(player, "@teleport")?;

    let query = args.trim();
    if query.is_empty() {
        return Ok(TELEPORT_USAGE.to_string());
    }

    let room = match find_room(query, store)? {
        Ok(room) => room,
        Err(message) => return Ok(message),
    };

    player.current_room = room.id.clone();
    store.put_player(player.clone())?;
    Ok(format!("You teleport to {}.", room.name))
}

/// Handle `@open <exit name>=<#dbref>` from the builder's current room.
pub fn handle_open_command(
    player: &PlayerRecord,
    args: &str,
    store: &TinyMushStore,
) -> Result<String, TinyMushError> {
    require_builder(player, "@open")?;

    let (exit_name, destination) = split_assignment(args);
    let Some(destination) = destination else {
        return Ok(OPEN_USAGE.to_string());
    };
    if exit_name.is_empty() || destination.is_empty() {
        return Ok(OPEN_USAGE.to_string());
    }

    let destination = match find_room(destination, store)? {
        Ok(room) => room,
        Err(message) => return Ok(message),
    };

    let mut room = store.get_room(&player.current_room)?;
    let existing = store.room_exits(&room)?;
    if existing.iter().any(|exit| exit.matches(exit_name)) {
        return Ok(format!("There is already an exit called {} here.", exit_name));
    }

    let exit_id = store.next_dbref()?;
    let exit = ExitRecord::new(&exit_id, exit_name, &room.id, &destination.id);
    room.exits.push(exit_id.clone());

    let mut changes = WorldChanges::new();
    changes.rooms.push(room);
    changes.exits.push(exit);
    store.apply(changes)?;

    info!(
        "exit.open id={} name={} to={} builder={}",
        exit_id,
        escape_log(exit_name),
        destination.id,
        escape_log(&player.username)
    );

    Ok(format!("Opened {} to {}.", exit_name, destination.name))
}

/// Handle `@lock <exit>=<lock>` on an exit leading out of the builder's room.
///
/// The lock string is parsed before anything is written; a malformed one
/// comes back as [`TinyMushError::InvalidLock`].
pub fn handle_lock_command(
    player: &PlayerRecord,
    args: &str,
    store: &TinyMushStore,
) -> Result<String, TinyMushError> {
    require_builder(player, "@lock")?;

    let (exit_name, lock_text) = split_assignment(args);
    let Some(lock_text) = lock_text else {
        return Ok(LOCK_USAGE.to_string());
    };
    if exit_name.is_empty() {
        return Ok(LOCK_USAGE.to_string());
    }

    let lock = if lock_text.is_empty() {
        None
    } else {
        Some(Lock::parse(lock_text)?)
    };

    let room = store.get_room(&player.current_room)?;
    let exits = store.room_exits(&room)?;
    let Some(mut exit) = resolve_exit(&exits, exit_name).cloned() else {
        return Ok(format!("There is no exit called {} here.", exit_name));
    };

    exit.lock = lock;
    let reply = match &exit.lock {
        Some(lock) => format!("{} is now locked: {}.", exit.name, lock),
        None => format!("{} is now unlocked.", exit.name),
    };
    info!(
        "exit.lock id={} lock={:?} builder={}",
        exit.id,
        exit.lock.as_ref().map(|l| l.to_string()),
        escape_log(&player.username)
    );
    store.put_exit(exit)?;

    Ok(reply)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tmush::lock::AccessType;
    use crate::tmush::state::{REQUIRED_START_LOCATION_ID, SOUTH_MARKET_ID};
    use crate::tmush::storage::TinyMushStoreBuilder;
    use tempfile::TempDir;

    fn builder() -> PlayerRecord {
        let mut player = PlayerRecord::new("sysop", "Sysop", REQUIRED_START_LOCATION_ID);
        player.grant(Permission::Builders);
        player
    }

    fn open_store(dir: &TempDir) -> TinyMushStore {
        TinyMushStoreBuilder::new(dir.path()).open().expect("store")
    }

    #[test]
    fn buildshop_without_name_creates_nothing() {
        let dir = TempDir::new().expect("tempdir");
        let store = open_store(&dir);
        let before = store.stats().expect("stats");

        let reply = handle_buildshop_command(&builder(), "   ", &store).expect("command");
        assert_eq!(reply, BUILDSHOP_USAGE);
        assert_eq!(store.stats().expect("stats"), before);
    }

    #[test]
    fn buildshop_requires_builders() {
        let dir = TempDir::new().expect("tempdir");
        let store = open_store(&dir);
        let before = store.stats().expect("stats");
        let visitor = PlayerRecord::new("alice", "Alice", REQUIRED_START_LOCATION_ID);

        let err = handle_buildshop_command(&visitor, "Bob", &store).unwrap_err();
        assert!(matches!(err, TinyMushError::PermissionDenied(_)));
        assert_eq!(store.stats().expect("stats"), before);
    }

    #[test]
    fn buildshop_creates_linked_structure() {
        let dir = TempDir::new().expect("tempdir");
        let store = open_store(&dir);
        let before = store.stats().expect("stats");

        let reply = handle_buildshop_command(&builder(), "Bob", &store).expect("command");
        assert_eq!(reply, "The shop Bob was created!");

        let after = store.stats().expect("stats");
        assert_eq!(after.rooms, before.rooms + 2);
        assert_eq!(after.exits, before.exits + 2);
        assert_eq!(after.objects, before.objects + 1);

        let shop = store.find_rooms_by_name("Bob").expect("find").remove(0);
        assert!(shop.is_shop());
        let storeroom_id = shop.storeroom.clone().expect("storeroom bound");
        let storeroom = store.get_room(&storeroom_id).expect("storeroom");
        assert_eq!(storeroom.name, "Bob-storage");
        assert!(storeroom.flags.contains(&RoomFlag::Storeroom));

        let shop_exits = store.room_exits(&shop).expect("exits");
        assert_eq!(shop_exits.len(), 1);
        let back_door = &shop_exits[0];
        assert_eq!(back_door.name, BACK_DOOR_NAME);
        assert_eq!(back_door.destination, storeroom.id);
        assert!(back_door.matches("storage") && back_door.matches("store room"));
        let lock = back_door.lock.as_ref().expect("locked");
        assert_eq!(lock.access, AccessType::Traverse);
        assert_eq!(lock.required_key(), Some("Bob-storekey"));

        let store_exits = store.room_exits(&storeroom).expect("exits");
        assert_eq!(store_exits.len(), 1);
        assert_eq!(store_exits[0].name, DOOR_NAME);
        assert_eq!(store_exits[0].destination, shop.id);
        assert!(store_exits[0].lock.is_none());

        let items = store.room_objects(&shop).expect("items");
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].name, "Bob-storekey");
        assert!(store.room_objects(&storeroom).expect("items").is_empty());
    }

    #[test]
    fn create_and_price_objects_in_current_room() {
        let dir = TempDir::new().expect("tempdir");
        let store = open_store(&dir);
        let player = builder();

        let reply = handle_create_command(&player, "Sword=10", &store).expect("create");
        assert!(reply.starts_with("Created Sword"));
        assert!(reply.ends_with("priced at 10."));
        handle_create_command(&player, "Rope", &store).expect("create");

        let room = store.get_room(REQUIRED_START_LOCATION_ID).expect("room");
        let objects = store.room_objects(&room).expect("objects");
        let names: Vec<&str> = objects.iter().map(|o| o.name.as_str()).collect();
        assert_eq!(names, vec!["Sword", "Rope"]);
        assert_eq!(objects[0].price, Some(10));
        assert_eq!(objects[1].price, None);

        assert_eq!(
            handle_price_command(&player, "rope=3", &store).expect("price"),
            "Rope now costs 3."
        );
        assert_eq!(store.get_object(&objects[1].id).expect("rope").price, Some(3));

        handle_price_command(&player, "Rope=", &store).expect("clear");
        assert_eq!(store.get_object(&objects[1].id).expect("rope").price, None);

        let rejected = handle_price_command(&player, "Rope=-4", &store).expect("reject");
        assert!(rejected.starts_with("Price must be"));
        assert_eq!(handle_price_command(&player, "Rope", &store).expect("usage"), PRICE_USAGE);
        assert_eq!(
            handle_price_command(&player, "lamp=2", &store).expect("missing"),
            "You don't see lamp here."
        );
    }

    #[test]
    fn create_rejects_bad_input() {
        let dir = TempDir::new().expect("tempdir");
        let store = open_store(&dir);
        let before = store.stats().expect("stats");

        assert_eq!(handle_create_command(&builder(), "", &store).expect("usage"), CREATE_USAGE);
        let reply = handle_create_command(&builder(), "Sword=cheap", &store).expect("reject");
        assert!(reply.starts_with("Price must be"));
        assert_eq!(store.stats().expect("stats"), before);
    }

    #[test]
    fn teleport_and_open_link_a_shop() {
        let dir = TempDir::new().expect("tempdir");
        let store = open_store(&dir);
        let mut player = builder();
        handle_buildshop_command(&player, "Bob", &store).expect("build");
        let shop = store.find_rooms_by_name("bob").expect("find").remove(0);

        assert_eq!(
            handle_teleport_command(&mut player, "South Market", &store).expect("teleport"),
            "You teleport to South Market."
        );
        assert_eq!(player.current_room, SOUTH_MARKET_ID);
        assert_eq!(store.get_player("sysop").expect("saved").current_room, SOUTH_MARKET_ID);

        let reply =
            handle_open_command(&player, &format!("bob's=  {}", shop.id), &store).expect("open");
        assert_eq!(reply, "Opened bob's to Bob.");
        let market = store.get_room(SOUTH_MARKET_ID).expect("market");
        let exits = store.room_exits(&market).expect("exits");
        assert!(exits.iter().any(|e| e.name == "bob's" && e.destination == shop.id));

        let again =
            handle_open_command(&player, &format!("BOB'S={}", shop.id), &store).expect("dup");
        assert!(again.starts_with("There is already an exit"));

        assert_eq!(
            handle_teleport_command(&mut player, "#999999", &store).expect("missing"),
            "There is no room #999999."
        );
        assert_eq!(handle_open_command(&player, "gate", &store).expect("usage"), OPEN_USAGE);
    }

    #[test]
    fn lock_rekeys_and_clears_an_exit() {
        let dir = TempDir::new().expect("tempdir");
        let store = open_store(&dir);
        let mut player = builder();
        handle_buildshop_command(&player, "Bob", &store).expect("build");
        let shop = store.find_rooms_by_name("Bob").expect("find").remove(0);
        handle_teleport_command(&mut player, &shop.id, &store).expect("teleport");

        assert_eq!(
            handle_lock_command(&player, "storage=traverse:holds(brass key)", &store)
                .expect("lock"),
            "back door is now locked: traverse:holds(brass key)."
        );
        let back_door = store.room_exits(&shop).expect("exits").remove(0);
        assert_eq!(back_door.lock.as_ref().and_then(|l| l.required_key()), Some("brass key"));

        assert_eq!(
            handle_lock_command(&player, "back door=", &store).expect("unlock"),
            "back door is now unlocked."
        );
        assert!(store.room_exits(&shop).expect("exits")[0].lock.is_none());
    }

    #[test]
    fn lock_rejects_bad_input_without_writing() {
        let dir = TempDir::new().expect("tempdir");
        let store = open_store(&dir);
        let player = builder();
        let square = store.get_room(REQUIRED_START_LOCATION_ID).expect("square");
        let before = store.room_exits(&square).expect("exits");

        let err = handle_lock_command(&player, "south=open:holds(key)", &store).unwrap_err();
        assert!(matches!(err, TinyMushError::InvalidLock(_)));
        assert_eq!(handle_lock_command(&player, "south", &store).expect("usage"), LOCK_USAGE);
        assert_eq!(
            handle_lock_command(&player, "gate=traverse:holds(key)", &store).expect("missing"),
            "There is no exit called gate here."
        );
        assert_eq!(store.room_exits(&square).expect("exits"), before);

        let visitor = PlayerRecord::new("alice", "Alice", REQUIRED_START_LOCATION_ID);
        let err = handle_lock_command(&visitor, "south=", &store).unwrap_err();
        assert!(matches!(err, TinyMushError::PermissionDenied(_)));
    }

    #[test]
    fn teleport_requires_builders() {
        let dir = TempDir::new().expect("tempdir");
        let store = open_store(&dir);
        let mut visitor = PlayerRecord::new("alice", "Alice", REQUIRED_START_LOCATION_ID);
        let err = handle_teleport_command(&mut visitor, "South Market", &store).unwrap_err();
        assert!(matches!(err, TinyMushError::PermissionDenied(_)));
        assert_eq!(visitor.current_room, REQUIRED_START_LOCATION_ID);
    }
}
