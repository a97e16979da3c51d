//! # Payuppal - Property-Trading Board Game for Group Chats
//!
//! Payuppal runs a Monopoly-style game inside a chat: players join with `/join`,
//! take turns with `/roll`, buy, upgrade, mortgage and sell properties, pay rent to
//! each other and go bankrupt until one solvent player is left.
//!
//! ## Features
//!
//! - **Turn State Machine**: one roll per turn, jail skips, pass-Start bonus, a single
//!   outstanding debt that blocks the turn until it is paid or the debtor goes bankrupt.
//! - **Property Lifecycle**: buy, upgrade to level 5, downgrade with a full refund,
//!   mortgage at level 0, sell at the current valuation.
//! - **Persistence**: every mutating command saves the session as a JSON document;
//!   restoring re-links owners, holdings and the debt by id and name.
//! - **Per-Session Locking**: commands for one chat run one at a time; different
//!   chats never wait on each other.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use payuppal::chat::{CommandParser, SessionRegistry};
//! use payuppal::config::Config;
//! use payuppal::game::UserId;
//! use payuppal::storage::JsonFileStore;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load("config.toml").await?;
//!     let store = JsonFileStore::open(config.storage.sessions_dir())?;
//!     let registry = SessionRegistry::new(store, config.game.clone());
//!     let parser = CommandParser::new();
//!
//!     let mut replies: Vec<String> = Vec::new();
//!     registry
//!         .execute("chat-1", UserId(7), "alice", parser.parse("/join"), &mut replies)
//!         .await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Module Organization
//!
//! - [`game`] - board, players, chance deck, the session state machine and its document form
//! - [`chat`] - command parsing and the per-session registry
//! - [`storage`] - session document stores
//! - [`config`] - configuration management and validation
//! - [`validation`] - checks for chat-supplied keys, names and arguments
//! - [`logutil`] - single-line escaping for logged chat text
//! - [`metrics`] - process-wide counters

pub mod chat;
pub mod config;
pub mod game;
pub mod logutil;
pub mod metrics;
pub mod storage;
pub mod validation;
