use mushshop::config::Config;
use mushshop::tmush::{TinyMushProcessor, TinyMushStoreBuilder, REQUIRED_START_LOCATION_ID};
use tempfile::TempDir;

fn processor(dir: &TempDir) -> TinyMushProcessor {
    let store = TinyMushStoreBuilder::new(dir.path()).open().expect("store");
    TinyMushProcessor::new(store, Config::default())
}

fn room_name(processor: &TinyMushProcessor, user: &str) -> String {
    let player = processor.store().get_player(user).expect("player");
    processor
        .store()
        .get_room(&player.current_room)
        .expect("room")
        .name
}

/// Shop "Bob" reachable from the Town Square through an exit named "bob".
fn shop_off_the_square(processor: &TinyMushProcessor) {
    processor.handle_line("sysop", "@buildshop Bob");
    let shop = processor.store().find_rooms_by_name("Bob").expect("find").remove(0);
    processor.handle_line("sysop", &format!("@open bob={}", shop.id));
}

#[test]
fn back_door_needs_the_store_key() {
    let dir = TempDir::new().expect("tempdir");
    let processor = processor(&dir);
    shop_off_the_square(&processor);

    processor.handle_line("alice", "bob");
    assert_eq!(room_name(&processor, "alice"), "Bob");

    assert_eq!(processor.handle_line("alice", "back door"), "You can't go that way.");
    assert_eq!(processor.handle_line("alice", "go storage"), "You can't go that way.");
    assert_eq!(room_name(&processor, "alice"), "Bob");

    assert_eq!(processor.handle_line("alice", "get key"), "You pick up Bob-storekey.");
    let reply = processor.handle_line("alice", "store room");
    assert!(reply.starts_with("=== Bob-storage ==="), "{}", reply);
    assert!(reply.contains("Exits: door"));

    // The storeroom has no shop command set of its own.
    assert_eq!(processor.handle_line("alice", "buy"), "There is nothing for sale here.");

    let reply = processor.handle_line("alice", "door");
    assert!(reply.starts_with("=== Bob ==="), "{}", reply);
}

#[test]
fn key_holder_can_stock_the_storeroom_by_hand() {
    let dir = TempDir::new().expect("tempdir");
    let processor = processor(&dir);
    shop_off_the_square(&processor);

    processor.handle_line("sysop", "@create Lantern");
    processor.handle_line("sysop", "take Lantern");
    processor.handle_line("sysop", "bob");
    processor.handle_line("sysop", "get Bob-storekey");
    processor.handle_line("sysop", "back door");
    assert_eq!(processor.handle_line("sysop", "drop lantern"), "You drop Lantern.");

    processor.handle_line("alice", "bob");
    assert_eq!(
        processor.handle_line("alice", "buy"),
        "*** Welcome to Bob! ***\n   Things for sale (choose 1-1 to inspect); quit to exit:\n \
         1. Lantern (1)"
    );
}

#[test]
fn empty_storeroom_has_nothing_for_sale() {
    let dir = TempDir::new().expect("tempdir");
    let processor = processor(&dir);
    shop_off_the_square(&processor);

    processor.handle_line("alice", "bob");
    assert_eq!(
        processor.handle_line("alice", "buy"),
        "*** Welcome to Bob! ***\n   There is nothing for sale; quit to exit."
    );
    assert_eq!(
        processor.handle_line("alice", "1"),
        "There is nothing to choose.\n\n*** Welcome to Bob! ***\n   \
         There is nothing for sale; quit to exit."
    );
    assert_eq!(processor.handle_line("alice", "q"), "You leave Bob.");
}

#[test]
fn look_and_help_reflect_location() {
    let dir = TempDir::new().expect("tempdir");
    let processor = processor(&dir);

    let look = processor.handle_line("alice", "l");
    assert!(look.starts_with("=== Town Square ==="));
    assert!(look.contains("Exits: south"));
    let player = processor.store().get_player("alice").expect("alice");
    assert_eq!(player.current_room, REQUIRED_START_LOCATION_ID);

    let help = processor.handle_line("alice", "help");
    assert!(!help.contains("BUY"));
    assert!(!help.contains("@BUILDSHOP"));
    assert!(processor.handle_line("sysop", "help").contains("@BUILDSHOP"));

    shop_off_the_square(&processor);
    processor.handle_line("alice", "bob");
    assert!(processor.handle_line("alice", "help").contains("BUY/SHOP/BROWSE"));
    assert_eq!(
        processor.handle_line("alice", "go nowhere"),
        "There is no exit called nowhere here."
    );
}
