use std::path::{Path, PathBuf};

use chrono::Utc;
use log::debug;
use sled::transaction::{TransactionError, TransactionResult};
use sled::{IVec, Transactional};

use crate::tmush::errors::TinyMushError;
use crate::tmush::state::canonical_world_seed;
use crate::tmush::types::{
    ExitRecord, ObjectRecord, PlayerRecord, RoomRecord, EXIT_SCHEMA_VERSION,
    OBJECT_SCHEMA_VERSION, PLAYER_SCHEMA_VERSION, ROOM_SCHEMA_VERSION,
};

const TREE_PRIMARY: &str = "tinymush";
const TREE_OBJECTS: &str = "tinymush_objects";

const PREFIX_PLAYERS: &str = "players:";
const PREFIX_ROOMS: &str = "rooms:";
const PREFIX_EXITS: &str = "exits:";
const PREFIX_OBJECTS: &str = "objects:";

/// Helper builder so tests can easily create throwaway stores with custom paths.
pub struct TinyMushStoreBuilder {
    path: PathBuf,
    ensure_world_seed: bool,
}

impl TinyMushStoreBuilder {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            ensure_world_seed: true,
        }
    }

    /// Opt out of seeding the canonical world during initialization (useful for targeted tests).
    pub fn without_world_seed(mut self) -> Self {
        self.ensure_world_seed = false;
        self
    }

    pub fn open(self) -> Result<TinyMushStore, TinyMushError> {
        TinyMushStore::open_with_options(self.path, self.ensure_world_seed)
    }
}

/// Records to write in a single transaction.
#[derive(Debug, Default, Clone)]
pub struct WorldChanges {
    pub rooms: Vec<RoomRecord>,
    pub exits: Vec<ExitRecord>,
    pub objects: Vec<ObjectRecord>,
    pub players: Vec<PlayerRecord>,
}

impl WorldChanges {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
            && self.exits.is_empty()
            && self.objects.is_empty()
            && self.players.is_empty()
    }
}

/// Record counts, for status output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct WorldStats {
    pub rooms: usize,
    pub exits: usize,
    pub objects: usize,
    pub players: usize,
}

/// Sled-backed persistence for TinyMUSH rooms, exits, objects and players.
///
/// Rooms, exits and players share the primary tree under distinct key
/// prefixes; objects live in their own tree.
pub struct TinyMushStore {
    db: sled::Db,
    primary: sled::Tree,
    objects: sled::Tree,
}

impl TinyMushStore {
    /// Open (or create) the store rooted at `path`, seeding the canonical rooms
    /// if no rooms exist yet.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, TinyMushError> {
        Self::open_with_options(path, true)
    }

    fn open_with_options<P: AsRef<Path>>(path: P, seed_world: bool) -> Result<Self, TinyMushError> {
        let path_ref = path.as_ref();
        std::fs::create_dir_all(path_ref)?;
        let db = sled::open(path_ref)?;
        let primary = db.open_tree(TREE_PRIMARY)?;
        let objects = db.open_tree(TREE_OBJECTS)?;
        let store = Self {
            db,
            primary,
            objects,
        };

        if seed_world {
            store.seed_world_if_needed()?;
        }

        Ok(store)
    }

    fn player_key(username: &str) -> Vec<u8> {
        format!("{}{}", PREFIX_PLAYERS, username.to_ascii_lowercase()).into_bytes()
    }

    fn room_key(room_id: &str) -> Vec<u8> {
        format!("{}{}", PREFIX_ROOMS, room_id).into_bytes()
    }

    fn exit_key(exit_id: &str) -> Vec<u8> {
        format!("{}{}", PREFIX_EXITS, exit_id).into_bytes()
    }

    fn object_key(object_id: &str) -> Vec<u8> {
        format!("{}{}", PREFIX_OBJECTS, object_id).into_bytes()
    }

    fn serialize<T: serde::Serialize>(value: &T) -> Result<Vec<u8>, TinyMushError> {
        Ok(bincode::serialize(value)?)
    }

    fn deserialize<T: serde::de::DeserializeOwned>(bytes: IVec) -> Result<T, TinyMushError> {
        Ok(bincode::deserialize::<T>(&bytes)?)
    }

    fn check_schema(entity: &'static str, expected: u8, found: u8) -> Result<(), TinyMushError> {
        if expected != found {
            return Err(TinyMushError::SchemaMismatch {
                entity,
                expected,
                found,
            });
        }
        Ok(())
    }

    /// Allocate a fresh `#<n>` dbref for a new room, exit or object.
    pub fn next_dbref(&self) -> Result<String, TinyMushError> {
        Ok(format!("#{}", self.db.generate_id()?))
    }

    /// Insert or update a player record.
    pub fn put_player(&self, mut player: PlayerRecord) -> Result<(), TinyMushError> {
        player.schema_version = PLAYER_SCHEMA_VERSION;
        player.touch();
        let bytes = Self::serialize(&player)?;
        self.primary.insert(Self::player_key(&player.username), bytes)?;
        self.primary.flush()?;
        Ok(())
    }

    /// Fetch a player record by username.
    pub fn get_player(&self, username: &str) -> Result<PlayerRecord, TinyMushError> {
        let Some(bytes) = self.primary.get(Self::player_key(username))? else {
            return Err(TinyMushError::NotFound(format!("player: {}", username)));
        };
        let record: PlayerRecord = Self::deserialize(bytes)?;
        Self::check_schema("player", PLAYER_SCHEMA_VERSION, record.schema_version)?;
        Ok(record)
    }

    /// List all player usernames currently stored.
    pub fn list_player_ids(&self) -> Result<Vec<String>, TinyMushError> {
        let mut ids = Vec::new();
        for entry in self.primary.scan_prefix(PREFIX_PLAYERS.as_bytes()) {
            let (key, _) = entry?;
            let text = String::from_utf8_lossy(&key);
            if let Some(username) = text.strip_prefix(PREFIX_PLAYERS) {
                ids.push(username.to_string());
            }
        }
        Ok(ids)
    }

    /// Insert or update a room record.
    pub fn put_room(&self, mut room: RoomRecord) -> Result<(), TinyMushError> {
        room.schema_version = ROOM_SCHEMA_VERSION;
        let bytes = Self::serialize(&room)?;
        self.primary.insert(Self::room_key(&room.id), bytes)?;
        self.primary.flush()?;
        Ok(())
    }

    pub fn get_room(&self, room_id: &str) -> Result<RoomRecord, TinyMushError> {
        let Some(bytes) = self.primary.get(Self::room_key(room_id))? else {
            return Err(TinyMushError::NotFound(format!("room: {}", room_id)));
        };
        let record: RoomRecord = Self::deserialize(bytes)?;
        Self::check_schema("room", ROOM_SCHEMA_VERSION, record.schema_version)?;
        Ok(record)
    }

    /// All rooms whose name matches `name`, ignoring case.
    pub fn find_rooms_by_name(&self, name: &str) -> Result<Vec<RoomRecord>, TinyMushError> {
        let mut rooms = Vec::new();
        for entry in self.primary.scan_prefix(PREFIX_ROOMS.as_bytes()) {
            let (_, bytes) = entry?;
            let room: RoomRecord = Self::deserialize(bytes)?;
            if room.name.eq_ignore_ascii_case(name.trim()) {
                rooms.push(room);
            }
        }
        Ok(rooms)
    }

    pub fn put_exit(&self, mut exit: ExitRecord) -> Result<(), TinyMushError> {
        exit.schema_version = EXIT_SCHEMA_VERSION;
        let bytes = Self::serialize(&exit)?;
        self.primary.insert(Self::exit_key(&exit.id), bytes)?;
        self.primary.flush()?;
        Ok(())
    }

    pub fn get_exit(&self, exit_id: &str) -> Result<ExitRecord, TinyMushError> {
        let Some(bytes) = self.primary.get(Self::exit_key(exit_id))? else {
            return Err(TinyMushError::NotFound(format!("exit: {}", exit_id)));
        };
        let record: ExitRecord = Self::deserialize(bytes)?;
        Self::check_schema("exit", EXIT_SCHEMA_VERSION, record.schema_version)?;
        Ok(record)
    }

    /// Insert or update an object definition.
    pub fn put_object(&self, mut object: ObjectRecord) -> Result<(), TinyMushError> {
        object.schema_version = OBJECT_SCHEMA_VERSION;
        let bytes = Self::serialize(&object)?;
        self.objects.insert(Self::object_key(&object.id), bytes)?;
        self.objects.flush()?;
        Ok(())
    }

    pub fn get_object(&self, object_id: &str) -> Result<ObjectRecord, TinyMushError> {
        let Some(bytes) = self.objects.get(Self::object_key(object_id))? else {
            return Err(TinyMushError::NotFound(format!("object: {}", object_id)));
        };
        let record: ObjectRecord = Self::deserialize(bytes)?;
        Self::check_schema("object", OBJECT_SCHEMA_VERSION, record.schema_version)?;
        Ok(record)
    }

    /// Objects in a room, in the room's order. Dangling ids are skipped.
    pub fn room_objects(&self, room: &RoomRecord) -> Result<Vec<ObjectRecord>, TinyMushError> {
        self.load_objects(&room.items)
    }

    /// Objects a player is carrying. Dangling ids are skipped.
    pub fn carried_objects(
        &self,
        player: &PlayerRecord,
    ) -> Result<Vec<ObjectRecord>, TinyMushError> {
        self.load_objects(&player.carried)
    }

    fn load_objects(&self, ids: &[String]) -> Result<Vec<ObjectRecord>, TinyMushError> {
        let mut objects = Vec::with_capacity(ids.len());
        for id in ids {
            match self.get_object(id) {
                Ok(obj) => objects.push(obj),
                Err(TinyMushError::NotFound(_)) => {
                    debug!("skipping dangling object reference {}", id);
                }
                Err(e) => return Err(e),
            }
        }
        Ok(objects)
    }

    /// Exits leading out of a room. Dangling ids are skipped.
    pub fn room_exits(&self, room: &RoomRecord) -> Result<Vec<ExitRecord>, TinyMushError> {
        let mut exits = Vec::with_capacity(room.exits.len());
        for id in &room.exits {
            match self.get_exit(id) {
                Ok(exit) => exits.push(exit),
                Err(TinyMushError::NotFound(_)) => {
                    debug!("skipping dangling exit reference {}", id);
                }
                Err(e) => return Err(e),
            }
        }
        Ok(exits)
    }

    /// Write every record in `changes` in one transaction across both trees.
    pub fn apply(&self, changes: WorldChanges) -> Result<(), TinyMushError> {
        if changes.is_empty() {
            return Ok(());
        }

        let mut primary_writes: Vec<(Vec<u8>, Vec<u8>)> = Vec::new();
        let mut object_writes: Vec<(Vec<u8>, Vec<u8>)> = Vec::new();

        for mut room in changes.rooms {
            room.schema_version = ROOM_SCHEMA_VERSION;
            primary_writes.push((Self::room_key(&room.id), Self::serialize(&room)?));
        }
        for mut exit in changes.exits {
            exit.schema_version = EXIT_SCHEMA_VERSION;
            primary_writes.push((Self::exit_key(&exit.id), Self::serialize(&exit)?));
        }
        for mut player in changes.players {
            player.schema_version = PLAYER_SCHEMA_VERSION;
            player.touch();
            primary_writes.push((Self::player_key(&player.username), Self::serialize(&player)?));
        }
        for mut object in changes.objects {
            object.schema_version = OBJECT_SCHEMA_VERSION;
            object_writes.push((Self::object_key(&object.id), Self::serialize(&object)?));
        }

        let result: TransactionResult<()> =
            (&self.primary, &self.objects).transaction(|(primary, objects)| {
                for (key, bytes) in &primary_writes {
                    primary.insert(key.as_slice(), bytes.as_slice())?;
                }
                for (key, bytes) in &object_writes {
                    objects.insert(key.as_slice(), bytes.as_slice())?;
                }
                Ok(())
            });

        result.map_err(|e| match e {
            TransactionError::Storage(err) => TinyMushError::Sled(err),
            TransactionError::Abort(()) => {
                TinyMushError::Internal("world transaction aborted".to_string())
            }
        })?;

        self.primary.flush()?;
        self.objects.flush()?;
        Ok(())
    }

    /// Overwrite an object with bytes that cannot be decoded.
    #[cfg(test)]
    pub(crate) fn corrupt_object(&self, object_id: &str) -> Result<(), TinyMushError> {
        self.objects.insert(Self::object_key(object_id), &b"\xff"[..])?;
        Ok(())
    }

    pub fn stats(&self) -> Result<WorldStats, TinyMushError> {
        Ok(WorldStats {
            rooms: self.primary.scan_prefix(PREFIX_ROOMS.as_bytes()).count(),
            exits: self.primary.scan_prefix(PREFIX_EXITS.as_bytes()).count(),
            objects: self.objects.scan_prefix(PREFIX_OBJECTS.as_bytes()).count(),
            players: self.primary.scan_prefix(PREFIX_PLAYERS.as_bytes()).count(),
        })
    }

    pub fn seed_world_if_needed(&self) -> Result<usize, TinyMushError> {
        if self
            .primary
            .scan_prefix(PREFIX_ROOMS.as_bytes())
            .next()
            .is_some()
        {
            return Ok(0);
        }
        let seed = canonical_world_seed(Utc::now());
        let inserted = seed.rooms.len();
        self.apply(seed)?;
        debug!("seeded {} canonical rooms", inserted);
        Ok(inserted)
    }
}
