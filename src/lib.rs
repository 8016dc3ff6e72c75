//! # mushshop - shops for a TinyMUSH world
//!
//! A small text world in which builders put up shops and players buy from
//! them through a numbered menu. Each shop is a room with a locked storeroom
//! behind it; whatever sits in the storeroom is for sale out front, paid for
//! from the player's `Budget`.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use mushshop::config::Config;
//! use mushshop::tmush::{TinyMushProcessor, TinyMushStore};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load("config.toml").await?;
//!     let store = TinyMushStore::open(&config.world.db_path)?;
//!     let processor = TinyMushProcessor::new(store, config);
//!
//!     println!("{}", processor.handle_line("sysop", "@buildshop Bob"));
//!     Ok(())
//! }
//! ```
//!
//! ## Module Organization
//!
//! - [`tmush`] - world records, sled store, shop menu and command processor
//! - [`config`] - TOML configuration
//! - [`logutil`] - helpers for logging player input

pub mod config;
pub mod logutil;
pub mod tmush;
