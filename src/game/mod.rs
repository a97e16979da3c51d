//! # Game core
//!
//! The rules engine for a property-trading board game played through chat commands.
//!
//! - [`board`] - squares, their economics and the board layout
//! - [`player`] - seated players and their holdings
//! - [`chance`] - the chance / fate deck
//! - [`session`] - the turn state machine, debt ledger and message sink
//! - [`snapshot`] - conversion to and from the persisted session document
//!
//! Players and squares are owned by value inside [`session::GameSession`]; cross
//! references are user ids and square names resolved through the session.

pub mod board;
pub mod chance;
pub mod errors;
pub mod player;
pub mod session;
pub mod snapshot;

pub use board::{Board, Square, SquareKind};
pub use errors::GameError;
pub use player::{Player, UserId};
pub use session::{GameSession, Ledger, MessageSink, Phase, ResetStatus};
pub use snapshot::SessionDocument;
