use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable external identity of a chat user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub i64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A seated player. Property holdings are square names; the board owns the squares.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Player {
    pub name: String,
    pub user_id: UserId,
    /// Negative balance marks the player bankrupt.
    pub money: i64,
    pub position: usize,
    pub jail_turns: u32,
    /// Owned, unmortgaged squares in acquisition order.
    pub properties: Vec<String>,
    /// Owned, mortgaged squares in mortgage order.
    pub mortgaged: Vec<String>,
}

impl Player {
    pub fn new(name: &str, user_id: UserId, money: i64) -> Self {
        Player {
            name: name.to_string(),
            user_id,
            money,
            position: 0,
            jail_turns: 0,
            properties: Vec::new(),
            mortgaged: Vec::new(),
        }
    }

    /// Advance `steps` squares on a board of `board_size`, wrapping past the start.
    pub fn advance(&mut self, steps: usize, board_size: usize) -> usize {
        self.position = (self.position + steps) % board_size;
        self.position
    }

    /// Deduct `amount` if affordable.
    pub fn pay(&mut self, amount: i64) -> bool {
        if self.money >= amount {
            self.money -= amount;
            true
        } else {
            false
        }
    }

    pub fn receive(&mut self, amount: i64) {
        self.money += amount;
    }

    pub fn is_bankrupt(&self) -> bool {
        self.money < 0
    }

    pub fn holds_any(&self) -> bool {
        !self.properties.is_empty() || !self.mortgaged.is_empty()
    }

    /// Drop `name` from whichever holding list contains it.
    pub fn release(&mut self, name: &str) -> bool {
        let before = self.properties.len() + self.mortgaged.len();
        self.properties.retain(|n| n != name);
        self.mortgaged.retain(|n| n != name);
        before != self.properties.len() + self.mortgaged.len()
    }

    /// Move `name` from the owned list to the mortgaged list.
    pub fn mark_mortgaged(&mut self, name: &str) {
        self.properties.retain(|n| n != name);
        if !self.mortgaged.iter().any(|n| n == name) {
            self.mortgaged.push(name.to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn advance_wraps_around_board() {
        let mut p = Player::new("alice", UserId(1), 1500);
        assert_eq!(p.advance(7, 10), 7);
        assert_eq!(p.advance(5, 10), 2);
    }

    #[test]
    fn pay_refuses_overdraft() {
        let mut p = Player::new("alice", UserId(1), 100);
        assert!(!p.pay(220));
        assert_eq!(p.money, 100);
        assert!(p.pay(100));
        assert_eq!(p.money, 0);
        assert!(!p.is_bankrupt());
    }

    #[test]
    fn holdings_move_between_lists() {
        let mut p = Player::new("alice", UserId(1), 0);
        p.properties.push("Taipei".into());
        p.properties.push("Tainan".into());
        p.mark_mortgaged("Taipei");
        assert_eq!(p.properties, vec!["Tainan".to_string()]);
        assert_eq!(p.mortgaged, vec!["Taipei".to_string()]);
        assert!(p.release("Taipei"));
        assert!(!p.release("Taipei"));
        assert!(p.holds_any());
    }
}
