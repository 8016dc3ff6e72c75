//! TinyMUSH command parsing and dispatch.
//!
//! Every line a player types comes through [`TinyMushProcessor::process_command`].
//! A player who is browsing a shop has their input routed to the shop menu
//! instead of the command parser, until they leave the menu.

use log::{debug, info, warn};

use crate::config::Config;
use crate::logutil::escape_log;
use crate::tmush::builder_commands::{
    handle_buildshop_command, handle_create_command, handle_lock_command, handle_open_command,
    handle_price_command, handle_teleport_command,
};
use crate::tmush::errors::TinyMushError;
use crate::tmush::lock::AccessType;
use crate::tmush::resolver::{
    format_disambiguation_prompt, resolve_exit, resolve_object_name, ResolveResult, SearchScope,
};
use crate::tmush::shop::{advance, build_catalog, render_storefront, ShopSession, ShopView, Ware};
use crate::tmush::state::REQUIRED_START_LOCATION_ID;
use crate::tmush::storage::{TinyMushStore, WorldChanges};
use crate::tmush::types::{
    CommandSet, ExitRecord, ObjectLocation, Permission, PlayerRecord, PlayerState, RoomRecord,
    BUDGET_KEY,
};

pub const HUH: &str = "Huh? (Type \"help\" for help.)";

/// TinyMUSH command categories for parsing and routing
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TinyMushCommand {
    // World
    Look,            // L, LOOK
    Go(String),      // GO <exit>
    Take(String),    // GET/TAKE <object>
    Drop(String),    // DROP <object>
    Inventory,       // I, INV, INVENTORY

    // Shop command set
    Buy, // BUY, SHOP, BROWSE

    // Builders
    BuildShop(String), // @BUILDSHOP <name>
    Create(String),    // @CREATE <name>[=<price>]
    Price(String),     // @PRICE <object>=<price>
    Teleport(String),  // @TELEPORT <#dbref|name>
    Open(String),      // @OPEN <exit>=<#dbref>
    Lock(String),      // @LOCK <exit>=<lock>

    // System
    Help,
    Quit,

    // Anything else; tried as an exit name before giving up
    Unknown(String),
}

/// Parses and executes player commands against a [`TinyMushStore`].
///
/// Each command loads the player record, mutates it and writes it back. The
/// ledger read-modify-write is not guarded, so commands for one player must
/// be run one at a time. Commands for different players may interleave.
pub struct TinyMushProcessor {
    store: TinyMushStore,
    config: Config,
}

impl TinyMushProcessor {
    pub fn new(store: TinyMushStore, config: Config) -> Self {
        Self { store, config }
    }

    pub fn store(&self) -> &TinyMushStore {
        &self.store
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Run one line of input and always produce something to show the player.
    pub fn handle_line(&self, username: &str, input: &str) -> String {
        match self.process_command(username, input) {
            Ok(reply) => reply,
            Err(e) => {
                warn!(
                    "command failed user={} input={} error={}",
                    escape_log(username),
                    escape_log(input),
                    e
                );
                player_message(&e)
            }
        }
    }

    /// Whether `username` is currently inside a shop menu.
    pub fn is_in_menu(&self, username: &str) -> Result<bool, TinyMushError> {
        match self.store.get_player(username) {
            Ok(player) => Ok(player.is_shopping()),
            Err(TinyMushError::NotFound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Process a TinyMUSH command and return the response
    pub fn process_command(&self, username: &str, input: &str) -> Result<String, TinyMushError> {
        let player = self.get_or_create_player(username)?;

        if let PlayerState::Shopping(session) = player.state.clone() {
            return self.handle_menu_input(player, session, input);
        }

        let command = self.parse_command(input);
        debug!(
            "TinyMUSH command parsed: user={} command={:?}",
            escape_log(username),
            command
        );

        match command {
            TinyMushCommand::Look => self.describe_room(&player),
            TinyMushCommand::Go(target) => self.handle_go(player, &target),
            TinyMushCommand::Take(target) => self.handle_take(player, &target),
            TinyMushCommand::Drop(target) => self.handle_drop(player, &target),
            TinyMushCommand::Inventory => self.handle_inventory(&player),
            TinyMushCommand::Buy => self.handle_buy(player),
            TinyMushCommand::BuildShop(args) => {
                handle_buildshop_command(&player, &args, &self.store)
            }
            TinyMushCommand::Create(args) => handle_create_command(&player, &args, &self.store),
            TinyMushCommand::Price(args) => handle_price_command(&player, &args, &self.store),
            TinyMushCommand::Teleport(args) => self.handle_teleport(player, &args),
            TinyMushCommand::Open(args) => handle_open_command(&player, &args, &self.store),
            TinyMushCommand::Lock(args) => handle_lock_command(&player, &args, &self.store),
            TinyMushCommand::Help => self.handle_help(&player),
            TinyMushCommand::Quit => Ok("Goodbye.".to_string()),
            TinyMushCommand::Unknown(text) => self.handle_unknown(player, &text),
        }
    }

    /// Split a line into a command. Verbs are case-insensitive; arguments keep their case.
    pub fn parse_command(&self, input: &str) -> TinyMushCommand {
        let input = input.trim();
        let (verb, rest) = match input.split_once(char::is_whitespace) {
            Some((verb, rest)) => (verb, rest.trim()),
            None => (input, ""),
        };

        match verb.to_ascii_lowercase().as_str() {
            "l" | "look" if rest.is_empty() => TinyMushCommand::Look,
            "go" | "walk" => TinyMushCommand::Go(rest.to_string()),
            "get" | "take" | "t" if !rest.is_empty() => TinyMushCommand::Take(rest.to_string()),
            "drop" if !rest.is_empty() => TinyMushCommand::Drop(rest.to_string()),
            "i" | "inv" | "inventory" => TinyMushCommand::Inventory,
            "buy" | "shop" | "browse" => TinyMushCommand::Buy,
            "@buildshop" => TinyMushCommand::BuildShop(rest.to_string()),
            "@create" => TinyMushCommand::Create(rest.to_string()),
            "@price" => TinyMushCommand::Price(rest.to_string()),
            "@teleport" | "@tel" => TinyMushCommand::Teleport(rest.to_string()),
            "@open" => TinyMushCommand::Open(rest.to_string()),
            "@lock" => TinyMushCommand::Lock(rest.to_string()),
            "help" | "?" => TinyMushCommand::Help,
            "quit" | "q" => TinyMushCommand::Quit,
            _ => TinyMushCommand::Unknown(input.to_string()),
        }
    }

    /// Get or create the player record for `username`.
    ///
    /// New characters start in the configured room with the configured
    /// budget, and receive `Builders` when listed in the config.
    pub fn get_or_create_player(&self, username: &str) -> Result<PlayerRecord, TinyMushError> {
        match self.store.get_player(username) {
            Ok(player) => Ok(player),
            Err(TinyMushError::NotFound(_)) => {
                let start_room = match self.store.get_room(&self.config.world.start_room) {
                    Ok(room) => room.id,
                    Err(TinyMushError::NotFound(_)) => {
                        warn!(
                            "configured start room {} missing; using {}",
                            escape_log(&self.config.world.start_room),
                            REQUIRED_START_LOCATION_ID
                        );
                        REQUIRED_START_LOCATION_ID.to_string()
                    }
                    Err(e) => return Err(e),
                };

                let mut player = PlayerRecord::new(username, username, &start_room);
                player
                    .ledger
                    .insert(BUDGET_KEY.to_string(), self.config.shop.starting_budget);
                if self.config.world.is_builder(username) {
                    player.grant(Permission::Builders);
                }
                self.store.put_player(player.clone())?;
                info!(
                    "player.create user={} room={} builder={}",
                    escape_log(username),
                    start_room,
                    player.has_permission(Permission::Builders)
                );
                Ok(player)
            }
            Err(e) => Err(e),
        }
    }

    /// Current catalog for a shop room, read fresh from its storeroom.
    fn load_catalog(&self, shop: &RoomRecord) -> Result<Vec<Ware>, TinyMushError> {
        let Some(storeroom_id) = shop.storeroom.as_deref() else {
            return Err(TinyMushError::ShopNotStocked(shop.name.clone()));
        };
        let storeroom = match self.store.get_room(storeroom_id) {
            Ok(room) => room,
            Err(TinyMushError::NotFound(_)) => {
                return Err(TinyMushError::ShopNotStocked(shop.name.clone()))
            }
            Err(e) => return Err(e),
        };
        let objects = self.store.room_objects(&storeroom)?;
        Ok(build_catalog(&objects, self.config.shop.default_price))
    }

    /// Handle BUY/SHOP/BROWSE - open the shop menu at the storefront
    fn handle_buy(&self, mut player: PlayerRecord) -> Result<String, TinyMushError> {
        let room = self.store.get_room(&player.current_room)?;
        if !room.has_command_set(CommandSet::Shop) {
            return Ok("There is nothing for sale here.".to_string());
        }

        let catalog = self.load_catalog(&room)?;
        let text = render_storefront(&ShopView {
            shop_name: &room.name,
            catalog: &catalog,
        });

        let session = ShopSession::new(&room.id);
        debug!(
            "shop.enter user={} shop={} session={}",
            escape_log(&player.username),
            room.id,
            session.id
        );
        player.state = PlayerState::Shopping(session);
        self.store.put_player(player)?;
        Ok(text)
    }

    /// Feed one line to the shop menu and persist the resulting ledger and state.
    fn handle_menu_input(
        &self,
        mut player: PlayerRecord,
        session: ShopSession,
        input: &str,
    ) -> Result<String, TinyMushError> {
        let loaded = self.store.get_room(&session.shop_room).and_then(|shop| {
            let catalog = self.load_catalog(&shop)?;
            Ok((shop, catalog))
        });

        // Whatever broke, leave the menu so the player is never stuck in it.
        let (shop, catalog) = match loaded {
            Ok(loaded) => loaded,
            Err(e) => {
                player.state = PlayerState::Exploring;
                self.store.put_player(player)?;
                return match e {
                    TinyMushError::NotFound(_) => Ok("The shop is gone.".to_string()),
                    e => Err(e),
                };
            }
        };

        let view = ShopView {
            shop_name: &shop.name,
            catalog: &catalog,
        };
        let step = advance(&session.state, input, &view, &mut player.ledger);

        if let Some(purchase) = &step.purchase {
            info!(
                "shop.purchase user={} shop={} ware={} quantity={} total={} budget_left={}",
                escape_log(&player.username),
                shop.id,
                escape_log(&purchase.ware_name),
                purchase.quantity,
                purchase.total,
                player.budget()
            );
        }

        player.state = match step.state {
            Some(state) => PlayerState::Shopping(ShopSession { state, ..session }),
            None => {
                debug!(
                    "shop.leave user={} shop={} session={}",
                    escape_log(&player.username),
                    shop.id,
                    session.id
                );
                PlayerState::Exploring
            }
        };
        self.store.put_player(player)?;
        Ok(step.output)
    }

    fn describe_room(&self, player: &PlayerRecord) -> Result<String, TinyMushError> {
        let room = match self.store.get_room(&player.current_room) {
            Ok(room) => room,
            Err(TinyMushError::NotFound(_)) => {
                return Ok(format!(
                    "You are in a mysterious void (room '{}' not found).",
                    player.current_room
                ))
            }
            Err(e) => return Err(e),
        };

        let mut response = format!("=== {} ===\n{}", room.name, room.description);

        let objects = self.store.room_objects(&room)?;
        if !objects.is_empty() {
            let names: Vec<&str> = objects.iter().map(|o| o.name.as_str()).collect();
            response.push_str(&format!("\nYou see: {}", names.join(", ")));
        }

        let exits = self.store.room_exits(&room)?;
        if !exits.is_empty() {
            let names: Vec<&str> = exits.iter().map(|e| e.name.as_str()).collect();
            response.push_str(&format!("\nExits: {}", names.join(", ")));
        }

        if room.has_command_set(CommandSet::Shop) {
            response.push_str("\nType BUY to browse the wares.");
        }
        Ok(response)
    }

    fn handle_go(&self, player: PlayerRecord, target: &str) -> Result<String, TinyMushError> {
        if target.is_empty() {
            return Ok("Go where?".to_string());
        }
        let room = self.store.get_room(&player.current_room)?;
        let exits = self.store.room_exits(&room)?;
        match resolve_exit(&exits, target) {
            Some(exit) => self.traverse(player, exit),
            None => Ok(format!("There is no exit called {} here.", target)),
        }
    }

    /// Walk through `exit` if its lock lets the player pass.
    fn traverse(
        &self,
        mut player: PlayerRecord,
        exit: &ExitRecord,
    ) -> Result<String, TinyMushError> {
        if let Some(lock) = &exit.lock {
            let carried = self.store.carried_objects(&player)?;
            if !lock.passes(AccessType::Traverse, &carried) {
                debug!(
                    "exit.blocked user={} exit={} lock={}",
                    escape_log(&player.username),
                    exit.id,
                    lock
                );
                return Ok("You can't go that way.".to_string());
            }
        }

        // Fails with NotFound before the player moves if the destination is gone.
        self.store.get_room(&exit.destination)?;

        player.current_room = exit.destination.clone();
        self.store.put_player(player.clone())?;
        debug!(
            "player.move user={} exit={} to={}",
            escape_log(&player.username),
            exit.id,
            exit.destination
        );
        self.describe_room(&player)
    }

    fn handle_take(&self, mut player: PlayerRecord, target: &str) -> Result<String, TinyMushError> {
        let found = resolve_object_name(&player, target, SearchScope::Room, &self.store)?;
        let mut object = match found {
            ResolveResult::Found(object) => object,
            ResolveResult::Ambiguous(matches) => return Ok(format_disambiguation_prompt(&matches)),
            ResolveResult::NotFound => return Ok(format!("You don't see {} here.", target)),
        };
        if !object.takeable {
            return Ok(format!("You can't take {}.", object.name));
        }

        let mut room = self.store.get_room(&player.current_room)?;
        room.remove_item(&object.id);
        object.location = ObjectLocation::Player(player.username.clone());
        if !player.carried.contains(&object.id) {
            player.carried.push(object.id.clone());
        }
        let reply = format!("You pick up {}.", object.name);

        let mut changes = WorldChanges::new();
        changes.rooms.push(room);
        changes.objects.push(object);
        changes.players.push(player);
        self.store.apply(changes)?;
        Ok(reply)
    }

    fn handle_drop(&self, mut player: PlayerRecord, target: &str) -> Result<String, TinyMushError> {
        let found = resolve_object_name(&player, target, SearchScope::Carried, &self.store)?;
        let mut object = match found {
            ResolveResult::Found(object) => object,
            ResolveResult::Ambiguous(matches) => return Ok(format_disambiguation_prompt(&matches)),
            ResolveResult::NotFound => return Ok(format!("You aren't carrying {}.", target)),
        };

        let mut room = self.store.get_room(&player.current_room)?;
        player.carried.retain(|id| id != &object.id);
        room.add_item(&object.id);
        object.location = ObjectLocation::Room(room.id.clone());
        let reply = format!("You drop {}.", object.name);

        let mut changes = WorldChanges::new();
        changes.rooms.push(room);
        changes.objects.push(object);
        changes.players.push(player);
        self.store.apply(changes)?;
        Ok(reply)
    }

    fn handle_inventory(&self, player: &PlayerRecord) -> Result<String, TinyMushError> {
        let mut response = format!("Budget: {}", player.budget());
        for (name, quantity) in player.ledger.iter().filter(|(name, _)| *name != BUDGET_KEY) {
            response.push_str(&format!("\n{}: {}", name, quantity));
        }

        let carried = self.store.carried_objects(player)?;
        if carried.is_empty() {
            response.push_str("\nYou are carrying nothing.");
        } else {
            let names: Vec<&str> = carried.iter().map(|o| o.name.as_str()).collect();
            response.push_str(&format!("\nCarrying: {}", names.join(", ")));
        }
        Ok(response)
    }

    fn handle_teleport(
        &self,
        mut player: PlayerRecord,
        args: &str,
    ) -> Result<String, TinyMushError> {
        let before = player.current_room.clone();
        let reply = handle_teleport_command(&mut player, args, &self.store)?;
        if player.current_room == before {
            return Ok(reply);
        }
        Ok(format!("{}\n\n{}", reply, self.describe_room(&player)?))
    }

    /// Anything unparsed may be the name of an exit.
    fn handle_unknown(&self, player: PlayerRecord, text: &str) -> Result<String, TinyMushError> {
        if text.is_empty() {
            return Ok(HUH.to_string());
        }
        let room = self.store.get_room(&player.current_room)?;
        let exits = self.store.room_exits(&room)?;
        match resolve_exit(&exits, text) {
            Some(exit) => self.traverse(player, exit),
            None => Ok(HUH.to_string()),
        }
    }

    /// Command list; shop and builder lines appear only where they apply.
    fn handle_help(&self, player: &PlayerRecord) -> Result<String, TinyMushError> {
        let mut text = String::from(
            "=== HELP ===\n\
             LOOK (L) - describe this room\n\
             <exit> or GO <exit> - walk through an exit\n\
             GET/TAKE <thing> - pick something up\n\
             DROP <thing> - put something down\n\
             INVENTORY (I) - your budget and belongings\n\
             QUIT (Q) - leave",
        );

        let room = self.store.get_room(&player.current_room).ok();
        if room.is_some_and(|r| r.has_command_set(CommandSet::Shop)) {
            text.push_str("\nBUY/SHOP/BROWSE - browse this shop's wares");
        }
        if player.has_permission(Permission::Builders) {
            text.push_str(
                "\n=== BUILDER ===\n\
                 @BUILDSHOP <name> - build a shop with a locked storeroom\n\
                 @CREATE <name>[=<price>] - create an object here\n\
                 @PRICE <object>=<price> - set or clear a price\n\
                 @TELEPORT <#dbref|room> - jump to a room\n\
                 @OPEN <exit>=<#dbref> - open an exit from here\n\
                 @LOCK <exit>=<lock> - lock an exit, e.g. traverse:holds(key)",
            );
        }
        Ok(text)
    }
}

/// Player-facing text for an error that escaped a command.
pub fn player_message(error: &TinyMushError) -> String {
    match error {
        TinyMushError::PermissionDenied(message) => message.clone(),
        TinyMushError::ShopNotStocked(shop) => {
            format!("{} has no storeroom yet, so nothing can be sold here.", shop)
        }
        TinyMushError::NotFound(what) => format!("That no longer exists ({}).", what),
        TinyMushError::InvalidLock(reason) => format!("That lock makes no sense: {}.", reason),
        _ => "Something went wrong. Please try again.".to_string(),
    }
}
