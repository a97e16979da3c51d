//! Test utilities & fixtures shared by the integration tests.

use payuppal::config::GameConfig;
use payuppal::game::{GameSession, UserId};

pub const ALICE: UserId = UserId(11);
pub const BOB: UserId = UserId(22);
pub const CAROL: UserId = UserId(33);

/// Display name used for the fixture ids.
#[allow(dead_code)]
pub fn name_of(id: UserId) -> &'static str {
    match id {
        ALICE => "alice",
        BOB => "bob",
        CAROL => "carol",
        _ => "guest",
    }
}

/// Started session whose turn order is exactly `ids`.
///
/// The start shuffle is undone by rewriting the stored player order, which also
/// exercises the document round trip.
#[allow(dead_code)]
pub fn seated(ids: &[UserId]) -> GameSession {
    let mut session = GameSession::new(GameConfig::default());
    let mut out: Vec<String> = Vec::new();
    for id in ids {
        session.add_player(name_of(*id), *id, &mut out);
    }
    session.start_game(&mut out);
    let mut doc = session.to_document();
    doc.players
        .sort_by_key(|p| ids.iter().position(|id| *id == p.user_id));
    doc.current_player_index = 0;
    GameSession::from_document(&doc, GameConfig::default()).expect("reordered document")
}

/// Overwrite one player's cash through the document form.
#[allow(dead_code)]
pub fn with_money(session: &GameSession, id: UserId, money: i64) -> GameSession {
    let mut doc = session.to_document();
    for p in doc.players.iter_mut().filter(|p| p.user_id == id) {
        p.money = money;
    }
    GameSession::from_document(&doc, GameConfig::default()).expect("edited document")
}
