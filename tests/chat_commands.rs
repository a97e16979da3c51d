//! Chat text through the parser and registry, with an in-memory store.
mod common;

use common::{ALICE, BOB};
use payuppal::chat::{CommandParser, SessionRegistry, HELP_TEXT};
use payuppal::config::GameConfig;
use payuppal::game::UserId;
use payuppal::storage::MemoryStore;

struct Table {
    reg: SessionRegistry<MemoryStore>,
    parser: CommandParser,
}

impl Table {
    fn new() -> Self {
        Table {
            reg: SessionRegistry::new(MemoryStore::new(), GameConfig::default()),
            parser: CommandParser::with_bot_name("paybot"),
        }
    }

    async fn say(&self, id: UserId, name: &str, text: &str) -> Vec<String> {
        let mut out: Vec<String> = Vec::new();
        self.reg
            .execute("group", id, name, self.parser.parse(text), &mut out)
            .await
            .expect("command");
        out
    }
}

#[tokio::test]
async fn join_and_start_through_chat() {
    let t = Table::new();
    assert_eq!(t.say(ALICE, "alice", "/join@paybot").await, vec!["alice joined the game!"]);
    assert_eq!(t.say(ALICE, "alice", "/JOIN").await, vec!["alice has already joined!"]);
    assert_eq!(
        t.say(ALICE, "alice", "/start").await,
        vec!["At least 2 players are needed to start."]
    );
    t.say(BOB, "bob", "/join").await;
    let started = t.say(BOB, "bob", "/start").await;
    assert_eq!(started[0], "Game started!");
    assert!(started[1].starts_with("Turn order\n1. "));
    assert_eq!(
        t.say(BOB, "bob", "/join").await,
        vec!["The game has already started; you cannot join."]
    );
}

#[tokio::test]
async fn commands_for_other_bots_are_ignored() {
    let t = Table::new();
    assert!(t.say(ALICE, "alice", "/join@otherbot").await.is_empty());
    assert!(t.say(ALICE, "alice", "hello there").await.is_empty());
    assert!(t.reg.store().is_empty());
}

#[tokio::test]
async fn usage_and_help() {
    let t = Table::new();
    assert_eq!(t.say(ALICE, "alice", "/sell").await, vec!["Usage: /sell <square>"]);
    assert_eq!(t.say(ALICE, "alice", "/help").await, vec![HELP_TEXT.to_string()]);
    assert!(t.reg.store().is_empty());
}

#[tokio::test]
async fn actions_before_joining() {
    let t = Table::new();
    assert_eq!(
        t.say(ALICE, "alice", "/buy").await,
        vec!["You have not joined the game."]
    );
    assert_eq!(
        t.say(ALICE, "alice", "/info").await,
        vec!["No players have joined yet."]
    );
    assert_eq!(
        t.say(ALICE, "alice", "/roll").await,
        vec!["The game has not started yet."]
    );
    assert_eq!(
        t.say(ALICE, "alice", "/sell Atlantis").await,
        vec!["Cannot find that property!"]
    );
}

#[tokio::test]
async fn board_listing_names_every_square() {
    let t = Table::new();
    let board = t.say(ALICE, "alice", "/board").await;
    assert_eq!(board.len(), 1);
    let lines: Vec<&str> = board[0].lines().collect();
    assert_eq!(lines[0], "Board:");
    assert_eq!(lines.len(), 13);
    assert_eq!(lines[1], " 0: Start");
    assert_eq!(lines[2], " 1: Taipei (600)");
    assert_eq!(lines[12], "11: Detention Center");
}

#[tokio::test]
async fn display_names_are_cleaned() {
    let t = Table::new();
    assert_eq!(
        t.say(UserId(5), "  \u{1b}[31m ", "/join").await,
        vec!["[31m joined the game!"]
    );
    assert_eq!(t.say(UserId(6), "", "/join").await, vec!["Player 6 joined the game!"]);
}
