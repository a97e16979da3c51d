//! Board squares and the fixed board layout.
//!
//! A [`Board`] owns every [`Square`] by value in board order plus a name index.
//! Ownership is stored as the owner's [`UserId`]; the session resolves it.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::errors::GameError;
use super::player::UserId;

/// Highest level a property can be raised to.
pub const MAX_LEVEL: u8 = 5;

/// Number of entries in a property toll schedule (levels 0..=5).
pub const TOLL_LEVELS: usize = MAX_LEVEL as usize + 1;

/// Semantic category of a square, assigned when the board is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SquareKind {
    Start,
    Jail,
    Chance,
    Property,
}

impl SquareKind {
    pub fn as_str(self) -> &'static str {
        match self {
            SquareKind::Start => "START",
            SquareKind::Jail => "JAIL",
            SquareKind::Chance => "CHANCE",
            SquareKind::Property => "PROPERTY",
        }
    }
}

/// Static economics of a property square.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Deed {
    pub color: String,
    pub price: i64,
    pub tolls: [i64; TOLL_LEVELS],
    pub house_cost: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Square {
    pub name: String,
    pub position: usize,
    pub kind: SquareKind,
    /// Present only for [`SquareKind::Property`].
    pub deed: Option<Deed>,
    pub owner: Option<UserId>,
    pub level: u8,
    pub mortgaged: bool,
}

impl Square {
    fn plain(name: &str, kind: SquareKind) -> Self {
        Square {
            name: name.to_string(),
            position: 0,
            kind,
            deed: None,
            owner: None,
            level: 0,
            mortgaged: false,
        }
    }

    pub fn start(name: &str) -> Self {
        Self::plain(name, SquareKind::Start)
    }

    pub fn jail(name: &str) -> Self {
        Self::plain(name, SquareKind::Jail)
    }

    pub fn chance(name: &str) -> Self {
        Self::plain(name, SquareKind::Chance)
    }

    pub fn property(
        name: &str,
        color: &str,
        price: i64,
        tolls: [i64; TOLL_LEVELS],
        house_cost: i64,
    ) -> Self {
        Square {
            deed: Some(Deed {
                color: color.to_string(),
                price,
                tolls,
                house_cost,
            }),
            ..Self::plain(name, SquareKind::Property)
        }
    }

    pub fn is_property(&self) -> bool {
        self.kind == SquareKind::Property
    }

    /// Listed price ignoring level and mortgage; zero for non-properties.
    pub fn base_price(&self) -> i64 {
        self.deed.as_ref().map(|d| d.price).unwrap_or(0)
    }

    pub fn house_cost(&self) -> i64 {
        self.deed.as_ref().map(|d| d.house_cost).unwrap_or(0)
    }

    /// Current valuation used for buying, selling and mortgaging.
    ///
    /// Mortgaged squares are worth half the base price; otherwise every level adds
    /// one house cost on top of the base price.
    pub fn effective_price(&self) -> i64 {
        let base = self.base_price();
        if self.mortgaged {
            base / 2
        } else if self.level > 0 {
            self.level as i64 * self.house_cost() + base
        } else {
            base
        }
    }

    /// Toll charged to a visitor at the current level.
    pub fn effective_rent(&self) -> i64 {
        self.deed
            .as_ref()
            .and_then(|d| d.tolls.get(self.level as usize).copied())
            .unwrap_or(0)
    }

    /// Clear ownership, level and mortgage.
    pub fn reset(&mut self) {
        self.owner = None;
        self.level = 0;
        self.mortgaged = false;
    }
}

/// Ordered board with a name index. Positions are assigned 0..N-1 at construction.
#[derive(Debug, Clone)]
pub struct Board {
    squares: Vec<Square>,
    by_name: HashMap<String, usize>,
}

impl Board {
    /// Build a board from squares in order.
    ///
    /// Requires exactly one start square, at least one jail and unique names.
    pub fn new(mut squares: Vec<Square>) -> Result<Self, GameError> {
        let starts = squares
            .iter()
            .filter(|s| s.kind == SquareKind::Start)
            .count();
        if starts != 1 {
            return Err(GameError::InvalidBoard(format!(
                "expected exactly one start square, found {}",
                starts
            )));
        }
        if !squares.iter().any(|s| s.kind == SquareKind::Jail) {
            return Err(GameError::InvalidBoard("board has no jail".into()));
        }
        let mut by_name = HashMap::with_capacity(squares.len());
        for (idx, square) in squares.iter_mut().enumerate() {
            if square.is_property() != square.deed.is_some() {
                return Err(GameError::InvalidBoard(format!(
                    "{} has mismatched property data",
                    square.name
                )));
            }
            square.position = idx;
            if by_name.insert(square.name.clone(), idx).is_some() {
                return Err(GameError::InvalidBoard(format!(
                    "duplicate square name {}",
                    square.name
                )));
            }
        }
        Ok(Board { squares, by_name })
    }

    /// The standard 12-square board.
    pub fn standard() -> Self {
        const TOLLS: [i64; TOLL_LEVELS] = [220, 1500, 3000, 6000, 12000, 24000];
        let city = |name: &str, color: &str| Square::property(name, color, 600, TOLLS, 2000);
        let squares = vec![
            Square::start("Start"),
            city("Taipei", "red"),
            Square::chance("Chance"),
            Square::jail("Jail"),
            city("Tainan", "green"),
            city("Kaohsiung", "blue"),
            Square::chance("Fate"),
            city("Hualien", "yellow"),
            city("Taitung", "purple"),
            city("Penghu", "orange"),
            city("Keelung", "red"),
            Square::jail("Detention Center"),
        ];
        match Board::new(squares) {
            Ok(board) => board,
            Err(e) => unreachable!("standard board is valid: {}", e),
        }
    }

    pub fn len(&self) -> usize {
        self.squares.len()
    }

    pub fn is_empty(&self) -> bool {
        self.squares.is_empty()
    }

    pub fn squares(&self) -> &[Square] {
        &self.squares
    }

    pub(crate) fn squares_mut(&mut self) -> &mut [Square] {
        &mut self.squares
    }

    pub fn at(&self, position: usize) -> &Square {
        &self.squares[position % self.squares.len()]
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.by_name.get(name).copied()
    }

    pub fn get(&self, name: &str) -> Option<&Square> {
        self.index_of(name).map(|i| &self.squares[i])
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Square> {
        let idx = self.index_of(name)?;
        self.squares.get_mut(idx)
    }

    pub fn reset(&mut self) {
        for square in &mut self.squares {
            square.reset();
        }
    }
}

impl Default for Board {
    fn default() -> Self {
        Board::standard()
    }
}
