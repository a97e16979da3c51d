//! Persisted form of a [`GameSession`].
//!
//! The document is plain data: players carry property *names*, squares carry the
//! owner's *user id*, and the ledger carries both participants' ids. Decoding is
//! two-phase: every player and square is rebuilt on its own first, then owner
//! references, holdings and the ledger are re-linked through id and name tables.

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::board::{Board, Square, SquareKind, MAX_LEVEL, TOLL_LEVELS};
use super::errors::GameError;
use super::player::{Player, UserId};
use super::session::{GameSession, Ledger};
use crate::config::GameConfig;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionDocument {
    pub players: Vec<PlayerRecord>,
    pub started: bool,
    pub current_player_index: usize,
    pub board: Vec<SquareRecord>,
    #[serde(default)]
    pub ledger: Option<LedgerRecord>,
    pub rolled: bool,
    pub double_confirm: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerRecord {
    pub name: String,
    pub user_id: UserId,
    pub money: i64,
    pub position: usize,
    pub jail_turns: u32,
    #[serde(default)]
    pub properties: Vec<String>,
    #[serde(default)]
    pub mortgage_properties: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SquareRecord {
    pub name: String,
    pub position: usize,
    #[serde(rename = "type")]
    pub kind: SquareKind,
    pub color: Option<String>,
    pub price: Option<i64>,
    pub tolls: Option<Vec<i64>>,
    pub house_cost: Option<i64>,
    pub owner: Option<UserId>,
    pub level: u8,
    pub mortgaged: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerRecord {
    pub from: UserId,
    pub to: UserId,
    pub amount: i64,
}

impl From<&Player> for PlayerRecord {
    fn from(p: &Player) -> Self {
        PlayerRecord {
            name: p.name.clone(),
            user_id: p.user_id,
            money: p.money,
            position: p.position,
            jail_turns: p.jail_turns,
            properties: p.properties.clone(),
            mortgage_properties: p.mortgaged.clone(),
        }
    }
}

impl From<&Square> for SquareRecord {
    fn from(s: &Square) -> Self {
        let deed = s.deed.as_ref();
        SquareRecord {
            name: s.name.clone(),
            position: s.position,
            kind: s.kind,
            color: deed.map(|d| d.color.clone()),
            price: deed.map(|d| d.price),
            tolls: deed.map(|d| d.tolls.to_vec()),
            house_cost: deed.map(|d| d.house_cost),
            owner: s.owner,
            level: s.level,
            mortgaged: s.mortgaged,
        }
    }
}

impl SquareRecord {
    /// Phase one: the square without its owner link.
    fn to_square(&self) -> Result<Square, GameError> {
        if self.level > MAX_LEVEL {
            return Err(GameError::InvalidDocument(format!(
                "square {} is at level {}, above {}",
                self.name, self.level, MAX_LEVEL
            )));
        }
        // Mortgaged squares are always level 0.
        if self.mortgaged && self.level > 0 {
            return Err(GameError::InvalidDocument(format!(
                "square {} is mortgaged at level {}",
                self.name, self.level
            )));
        }
        if self.kind != SquareKind::Property && (self.level > 0 || self.mortgaged) {
            return Err(GameError::InvalidDocument(format!(
                "{} square {} carries property state",
                self.kind.as_str(),
                self.name
            )));
        }
        let mut square = match self.kind {
            SquareKind::Start => Square::start(&self.name),
            SquareKind::Jail => Square::jail(&self.name),
            SquareKind::Chance => Square::chance(&self.name),
            SquareKind::Property => {
                let missing = |field: &str| {
                    GameError::InvalidDocument(format!("property {} has no {}", self.name, field))
                };
                let tolls_vec = self.tolls.as_ref().ok_or_else(|| missing("tolls"))?;
                let tolls: [i64; TOLL_LEVELS] =
                    tolls_vec.as_slice().try_into().map_err(|_| {
                        GameError::InvalidDocument(format!(
                            "property {} has {} tolls, expected {}",
                            self.name,
                            tolls_vec.len(),
                            TOLL_LEVELS
                        ))
                    })?;
                Square::property(
                    &self.name,
                    self.color.as_deref().unwrap_or_default(),
                    self.price.ok_or_else(|| missing("price"))?,
                    tolls,
                    self.house_cost.ok_or_else(|| missing("house_cost"))?,
                )
            }
        };
        square.position = self.position;
        square.level = self.level;
        square.mortgaged = self.mortgaged;
        Ok(square)
    }
}

impl GameSession {
    pub fn to_document(&self) -> SessionDocument {
        SessionDocument {
            players: self.players.iter().map(PlayerRecord::from).collect(),
            started: self.started,
            current_player_index: self.current,
            board: self.board.squares().iter().map(SquareRecord::from).collect(),
            ledger: self.ledger.map(|l| LedgerRecord {
                from: l.debtor,
                to: l.creditor,
                amount: l.amount,
            }),
            rolled: self.rolled,
            double_confirm: self.confirm_reset,
        }
    }

    /// Rebuild a session from a stored document.
    pub fn from_document(doc: &SessionDocument, config: GameConfig) -> Result<Self, GameError> {
        // Phase one: independent values.
        let mut players: Vec<Player> = doc
            .players
            .iter()
            .map(|r| {
                let mut p = Player::new(&r.name, r.user_id, r.money);
                p.position = r.position;
                p.jail_turns = r.jail_turns;
                p
            })
            .collect();
        let squares = doc
            .board
            .iter()
            .map(SquareRecord::to_square)
            .collect::<Result<Vec<_>, _>>()?;
        for (idx, square) in squares.iter().enumerate() {
            if square.position != idx {
                return Err(GameError::InvalidDocument(format!(
                    "square {} stored at position {} but listed at {}",
                    square.name, square.position, idx
                )));
            }
        }
        let mut board = Board::new(squares)?;

        let mut seats: HashMap<UserId, usize> = HashMap::with_capacity(players.len());
        for (i, p) in players.iter().enumerate() {
            if seats.insert(p.user_id, i).is_some() {
                return Err(GameError::InvalidDocument(format!(
                    "player {} appears twice",
                    p.user_id
                )));
            }
            if p.position >= board.len() {
                return Err(GameError::InvalidDocument(format!(
                    "player {} is off the board at {}",
                    p.user_id, p.position
                )));
            }
        }
        if !players.is_empty() && doc.current_player_index >= players.len() {
            return Err(GameError::InvalidDocument(format!(
                "current player index {} out of range",
                doc.current_player_index
            )));
        }

        // Phase two: re-link references through the id and name tables.
        for (record, square) in doc.board.iter().zip(board.squares_mut().iter_mut()) {
            if let Some(owner) = record.owner {
                if !seats.contains_key(&owner) {
                    return Err(GameError::UnknownPlayer(owner));
                }
                square.owner = Some(owner);
            }
        }
        for (record, player) in doc.players.iter().zip(players.iter_mut()) {
            for (names, mortgaged) in [
                (&record.properties, false),
                (&record.mortgage_properties, true),
            ] {
                for name in names {
                    let square = board
                        .get(name)
                        .ok_or_else(|| GameError::UnknownSquare(name.clone()))?;
                    if square.owner != Some(player.user_id) || square.mortgaged != mortgaged {
                        return Err(GameError::InconsistentOwnership {
                            square: name.clone(),
                            detail: format!("listed by player {}", player.user_id),
                        });
                    }
                    if mortgaged {
                        player.mortgaged.push(name.clone());
                    } else {
                        player.properties.push(name.clone());
                    }
                }
            }
        }
        for square in board.squares() {
            if let Some(owner) = square.owner {
                let holder = &players[seats[&owner]];
                let listed = holder.properties.contains(&square.name)
                    || holder.mortgaged.contains(&square.name);
                if !listed {
                    return Err(GameError::InconsistentOwnership {
                        square: square.name.clone(),
                        detail: format!("owner {} does not list it", owner),
                    });
                }
            }
        }
        let ledger = match doc.ledger {
            Some(l) => {
                for id in [l.from, l.to] {
                    if !seats.contains_key(&id) {
                        return Err(GameError::UnknownPlayer(id));
                    }
                }
                Some(Ledger {
                    debtor: l.from,
                    creditor: l.to,
                    amount: l.amount,
                })
            }
            None => None,
        };

        let mut session = GameSession::with_rng(config, board, StdRng::from_entropy());
        session.players = players;
        session.seats = seats;
        session.current = doc.current_player_index;
        session.started = doc.started;
        session.rolled = doc.rolled;
        session.ledger = ledger;
        session.confirm_reset = doc.double_confirm;
        Ok(session)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const A: UserId = UserId(101);
    const B: UserId = UserId(202);

    fn round_trip(s: &GameSession) {
        let doc = s.to_document();
        let json = serde_json::to_string(&doc).unwrap();
        let parsed: SessionDocument = serde_json::from_str(&json).unwrap();
        let restored = GameSession::from_document(&parsed, GameConfig::default()).unwrap();
        assert_eq!(restored.to_document(), doc);
    }

    fn mid_game() -> GameSession {
        let mut s = GameSession::with_rng(
            GameConfig::default(),
            Board::standard(),
            StdRng::seed_from_u64(3),
        );
        let mut out: Vec<String> = Vec::new();
        s.add_player("alice", A, &mut out);
        s.add_player("bob", B, &mut out);
        s.start_game(&mut out);
        s
    }

    #[test]
    fn fresh_and_started_sessions_round_trip() {
        round_trip(&GameSession::new(GameConfig::default()));
        round_trip(&mid_game());
    }

    #[test]
    fn ownership_mortgage_and_ledger_round_trip() {
        let mut s = mid_game();
        let first = s.current_player().unwrap().user_id;
        let second = if first == A { B } else { A };
        let mut out: Vec<String> = Vec::new();
        s.roll_dice_with(first, (2, 2), &mut out);
        s.buy_here(first, &mut out);
        s.roll_dice_with(second, (1, 2), &mut out);
        s.roll_dice_with(first, (1, 2), &mut out);
        s.mortgage_property(first, "Tainan", &mut out);
        s.ledger = Some(Ledger {
            debtor: first,
            creditor: second,
            amount: 220,
        });
        s.confirm_reset = true;
        round_trip(&s);

        let doc = s.to_document();
        let restored = GameSession::from_document(&doc, GameConfig::default()).unwrap();
        let owner = restored.player(first).unwrap();
        assert_eq!(owner.mortgaged, vec!["Tainan".to_string()]);
        assert_eq!(restored.board().get("Tainan").unwrap().owner, Some(first));
        assert_eq!(restored.ledger().map(|l| l.creditor), Some(second));
        assert!(restored.reset_pending());
    }

    #[test]
    fn document_shape_uses_ids_and_names() {
        let mut s = mid_game();
        let first = s.current_player().unwrap().user_id;
        let mut out: Vec<String> = Vec::new();
        s.roll_dice_with(first, (2, 2), &mut out);
        s.buy_here(first, &mut out);
        let value = serde_json::to_value(s.to_document()).unwrap();
        let tainan = &value["board"][4];
        assert_eq!(tainan["type"], "PROPERTY");
        assert_eq!(tainan["owner"], first.0);
        assert_eq!(value["board"][0]["type"], "START");
        assert!(value["board"][0]["owner"].is_null());
        assert!(value["ledger"].is_null());
        let holder = value["players"]
            .as_array()
            .unwrap()
            .iter()
            .find(|p| p["user_id"] == first.0)
            .unwrap();
        assert_eq!(holder["properties"][0], "Tainan");
    }

    #[test]
    fn decode_rejects_dangling_references() {
        let s = mid_game();
        let mut doc = s.to_document();
        doc.board[1].owner = Some(UserId(999));
        assert!(matches!(
            GameSession::from_document(&doc, GameConfig::default()),
            Err(GameError::UnknownPlayer(UserId(999)))
        ));

        let mut doc = s.to_document();
        doc.players[0].properties.push("Atlantis".into());
        assert!(matches!(
            GameSession::from_document(&doc, GameConfig::default()),
            Err(GameError::UnknownSquare(_))
        ));

        let mut doc = s.to_document();
        doc.players[0].properties.push("Taipei".into());
        assert!(matches!(
            GameSession::from_document(&doc, GameConfig::default()),
            Err(GameError::InconsistentOwnership { .. })
        ));

        let mut doc = s.to_document();
        doc.ledger = Some(LedgerRecord {
            from: A,
            to: UserId(5),
            amount: 1,
        });
        assert!(GameSession::from_document(&doc, GameConfig::default()).is_err());
    }

    #[test]
    fn decode_rejects_impossible_square_state() {
        let s = mid_game();
        let taipei = s.board().index_of("Taipei").unwrap();

        let mut doc = s.to_document();
        doc.board[taipei].level = MAX_LEVEL + 1;
        assert!(matches!(
            GameSession::from_document(&doc, GameConfig::default()),
            Err(GameError::InvalidDocument(_))
        ));

        let mut doc = s.to_document();
        doc.board[taipei].level = 2;
        doc.board[taipei].mortgaged = true;
        assert!(matches!(
            GameSession::from_document(&doc, GameConfig::default()),
            Err(GameError::InvalidDocument(_))
        ));

        let mut doc = s.to_document();
        doc.board[0].level = 1;
        assert!(matches!(
            GameSession::from_document(&doc, GameConfig::default()),
            Err(GameError::InvalidDocument(_))
        ));

        let mut doc = s.to_document();
        doc.board[taipei].level = MAX_LEVEL;
        doc.board[taipei].owner = Some(A);
        for p in doc.players.iter_mut().filter(|p| p.user_id == A) {
            p.properties.push("Taipei".into());
        }
        let restored = GameSession::from_document(&doc, GameConfig::default()).unwrap();
        assert_eq!(restored.board().get("Taipei").unwrap().level, MAX_LEVEL);
    }

    #[test]
    fn restored_session_keeps_playing() {
        let s = mid_game();
        let first = s.current_player().unwrap().user_id;
        let mut restored =
            GameSession::from_document(&s.to_document(), GameConfig::default()).unwrap();
        let mut out: Vec<String> = Vec::new();
        restored.roll_dice_with(first, (2, 2), &mut out);
        restored.buy_here(first, &mut out);
        assert_eq!(restored.player(first).unwrap().money, 900);
        assert_eq!(restored.board().get("Tainan").unwrap().owner, Some(first));
    }
}
