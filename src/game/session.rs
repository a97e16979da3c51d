//! Turn state machine for one chat session.
//!
//! Every public operation validates its preconditions against the current state,
//! mutates state only when they all hold, and reports everything the players should
//! see through a [`MessageSink`]. Rule violations are messages, never errors.
//!
//! Turn flow inside a started game:
//!
//! ```text
//! AwaitingRoll --roll--> (jail: skip turn) --------------------------> next player
//!                   \--> landed: start/jail ---------------------------> next player
//!                   \--> landed: rent paid -----------------------------> next player
//!                   \--> landed: chance/unowned/own property -> AwaitingAction --buy/upgrade/next--> next player
//!                   \--> landed: rent unpaid -> InDebt --pay--> next player (or winner)
//! ```

use log::{debug, error, info};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use std::collections::HashMap;

use super::board::{Board, SquareKind, MAX_LEVEL};
use super::chance;
use super::player::{Player, UserId};
use crate::config::GameConfig;

/// Receiver for user-visible text. Message order within an operation is significant.
pub trait MessageSink {
    fn send(&mut self, text: &str);
}

impl MessageSink for Vec<String> {
    fn send(&mut self, text: &str) {
        self.push(text.to_string());
    }
}

impl<S: MessageSink + ?Sized> MessageSink for &mut S {
    fn send(&mut self, text: &str) {
        (**self).send(text)
    }
}

/// The single outstanding debt, opened when rent cannot be paid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ledger {
    pub debtor: UserId,
    pub creditor: UserId,
    pub amount: i64,
}

/// Coarse state of the session, derived from its flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    NotStarted,
    /// Current player has not rolled this turn.
    AwaitingRoll,
    /// Current player rolled and must act or end the turn.
    AwaitingAction,
    /// Current player owes rent that must be settled before the turn can end.
    InDebt,
}

/// Outcome of a `/reset` request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResetStatus {
    /// First request: the confirmation flag is now armed.
    AwaitingConfirmation,
    /// Second request: the session was cleared.
    Reset,
}

const LIQUIDATE_HINTS: [&str; 3] = [
    "Use /mortgage to mortgage a property",
    "Use /downgrade to downgrade a property",
    "Use /sell to sell a property",
];

pub struct GameSession {
    pub(crate) config: GameConfig,
    pub(crate) players: Vec<Player>,
    pub(crate) seats: HashMap<UserId, usize>,
    pub(crate) board: Board,
    pub(crate) current: usize,
    pub(crate) started: bool,
    pub(crate) rolled: bool,
    pub(crate) ledger: Option<Ledger>,
    pub(crate) confirm_reset: bool,
    pub(crate) rng: StdRng,
}

impl GameSession {
    pub fn new(config: GameConfig) -> Self {
        Self::with_rng(config, Board::standard(), StdRng::from_entropy())
    }

    /// Build a session on a custom board with a caller-provided rng.
    pub fn with_rng(config: GameConfig, board: Board, rng: StdRng) -> Self {
        GameSession {
            config,
            players: Vec::new(),
            seats: HashMap::new(),
            board,
            current: 0,
            started: false,
            rolled: false,
            ledger: None,
            confirm_reset: false,
            rng,
        }
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn players(&self) -> &[Player] {
        &self.players
    }

    pub fn player(&self, id: UserId) -> Option<&Player> {
        self.seats.get(&id).map(|&i| &self.players[i])
    }

    pub fn current_player(&self) -> Option<&Player> {
        self.players.get(self.current)
    }

    pub fn current_index(&self) -> usize {
        self.current
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn ledger(&self) -> Option<&Ledger> {
        self.ledger.as_ref()
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    pub fn has_rolled(&self) -> bool {
        self.rolled
    }

    pub fn reset_pending(&self) -> bool {
        self.confirm_reset
    }

    pub fn phase(&self) -> Phase {
        if !self.started {
            Phase::NotStarted
        } else if self.ledger.is_some() {
            Phase::InDebt
        } else if self.rolled {
            Phase::AwaitingAction
        } else {
            Phase::AwaitingRoll
        }
    }

    /// The sole player with non-negative cash, if exactly one remains.
    pub fn check_winner(&self) -> Option<&Player> {
        let mut solvent = self.players.iter().filter(|p| !p.is_bankrupt());
        match (solvent.next(), solvent.next()) {
            (Some(p), None) => Some(p),
            _ => None,
        }
    }

    pub(crate) fn rebuild_seats(&mut self) {
        self.seats = self
            .players
            .iter()
            .enumerate()
            .map(|(i, p)| (p.user_id, i))
            .collect();
    }

    /// Seat index of `actor` when it is their turn in a started game.
    fn seat_on_turn(&self, actor: UserId, out: &mut dyn MessageSink) -> Option<usize> {
        if !self.started {
            out.send("The game has not started yet.");
            return None;
        }
        match self.seats.get(&actor) {
            Some(&seat) if seat == self.current => Some(seat),
            _ => {
                out.send("It is not your turn!");
                None
            }
        }
    }

    fn require_roll(&self, out: &mut dyn MessageSink) -> bool {
        if !self.rolled {
            out.send("Roll the dice first!");
        }
        self.rolled
    }

    fn owner_name(&self, owner: UserId) -> Option<String> {
        self.player(owner).map(|p| p.name.clone())
    }

    /// Seat a new player before the game starts.
    pub fn add_player(&mut self, name: &str, id: UserId, out: &mut dyn MessageSink) {
        info!("join request: {} ({})", crate::logutil::escape_log(name), id);
        if self.started {
            out.send("The game has already started; you cannot join.");
            return;
        }
        if self.seats.contains_key(&id) {
            out.send(&format!("{} has already joined!", name));
            return;
        }
        if self.players.len() >= self.config.max_players {
            out.send("The table is full; you cannot join.");
            return;
        }
        self.players
            .push(Player::new(name, id, self.config.start_money));
        self.seats.insert(id, self.players.len() - 1);
        out.send(&format!("{} joined the game!", name));
    }

    pub fn start_game(&mut self, out: &mut dyn MessageSink) {
        if self.started {
            out.send("The game has already started.");
            return;
        }
        if self.players.len() < self.config.min_players {
            out.send(&format!(
                "At least {} players are needed to start.",
                self.config.min_players
            ));
            return;
        }
        self.started = true;
        out.send("Game started!");
        self.players.shuffle(&mut self.rng);
        self.rebuild_seats();
        self.current = 0;
        self.rolled = false;
        info!("game started with {} players", self.players.len());
        crate::metrics::record_game_started();
        let order: Vec<String> = self
            .players
            .iter()
            .enumerate()
            .map(|(i, p)| format!("{}. {}", i + 1, p.name))
            .collect();
        out.send(&format!("Turn order\n{}", order.join("\n")));
    }

    /// Throw two dice for the current player.
    pub fn roll_dice(&mut self, actor: UserId, out: &mut dyn MessageSink) {
        let dice = (self.rng.gen_range(1..=6), self.rng.gen_range(1..=6));
        self.roll_dice_with(actor, dice, out);
    }

    /// Resolve a roll with the given dice faces.
    pub fn roll_dice_with(&mut self, actor: UserId, dice: (u8, u8), out: &mut dyn MessageSink) {
        let Some(seat) = self.seat_on_turn(actor, out) else {
            return;
        };
        if self.rolled {
            out.send(&format!("{} has already rolled!", self.players[seat].name));
            return;
        }

        if self.players[seat].jail_turns > 0 {
            let player = &mut self.players[seat];
            player.jail_turns -= 1;
            self.rolled = true;
            out.send(&format!(
                "{} is in jail and cannot roll.\n{} more turn(s) until release.",
                player.name, player.jail_turns
            ));
            self.advance_turn(actor, out);
            return;
        }

        self.rolled = true;
        let steps = dice.0 as usize + dice.1 as usize;
        let board_len = self.board.len();
        let player = &mut self.players[seat];
        out.send(&format!("{} rolled {}!", player.name, steps));
        let old_position = player.position;
        let new_position = player.advance(steps, board_len);
        let square = self.board.at(new_position);
        let kind = square.kind;
        out.send(&format!("Moved to {}!", square.name));
        debug!("{} moved {} -> {}", player.user_id, old_position, new_position);

        if new_position != 0 && new_position < old_position {
            let bonus = self.config.pass_start_bonus;
            player.receive(bonus);
            out.send(&format!("{} passed Start and collects {}!", player.name, bonus));
        }

        match kind {
            SquareKind::Jail => {
                player.jail_turns = self.config.jail_turns;
                out.send(&format!("{} was sent to jail!", player.name));
                self.advance_turn(actor, out);
            }
            SquareKind::Start => {
                self.advance_turn(actor, out);
            }
            SquareKind::Chance => {
                // Display only; card amounts are not applied.
                let card = chance::draw(&mut self.rng);
                out.send(card.label);
                out.send("Card effects are not implemented yet.");
            }
            SquareKind::Property => self.land_on_property(seat, new_position, out),
        }
    }

    fn land_on_property(&mut self, seat: usize, position: usize, out: &mut dyn MessageSink) {
        let square = self.board.at(position);
        let actor = self.players[seat].user_id;
        match square.owner {
            None => {
                out.send(&format!(
                    "This property is unowned! Price: {}",
                    square.effective_price()
                ));
                out.send("Use /buy to buy this property");
            }
            Some(owner) if owner == actor => {
                out.send(&format!("{} owns this property!", self.players[seat].name));
                out.send(&format!(
                    "Use /upgrade to upgrade this property. Upgrade cost: {}",
                    square.house_cost()
                ));
            }
            Some(owner) => {
                let Some(&owner_seat) = self.seats.get(&owner) else {
                    error!(
                        "square {} owned by unknown player {} (visitor {})",
                        square.name, owner, actor
                    );
                    return;
                };
                let rent = square.effective_rent();
                let owner_name = self.players[owner_seat].name.clone();
                let payer = &mut self.players[seat];
                out.send(&format!(
                    "{} must pay {} rent to {}!",
                    payer.name, rent, owner_name
                ));
                if payer.pay(rent) {
                    out.send(&format!("{} paid the rent!", payer.name));
                    self.players[owner_seat].receive(rent);
                    self.advance_turn(actor, out);
                } else {
                    out.send(&format!("{} cannot pay the rent!", payer.name));
                    self.ledger = Some(Ledger {
                        debtor: actor,
                        creditor: owner,
                        amount: rent,
                    });
                    for hint in LIQUIDATE_HINTS {
                        out.send(hint);
                    }
                }
            }
        }
    }

    /// `/buy`: purchase the square the actor is standing on.
    pub fn buy_here(&mut self, actor: UserId, out: &mut dyn MessageSink) {
        match self.player(actor) {
            Some(p) => {
                let name = self.board.at(p.position).name.clone();
                self.buy_property(actor, &name, out);
            }
            None => out.send("You have not joined the game."),
        }
    }

    /// `/upgrade`: raise the square the actor is standing on.
    pub fn upgrade_here(&mut self, actor: UserId, out: &mut dyn MessageSink) {
        match self.player(actor) {
            Some(p) => {
                let name = self.board.at(p.position).name.clone();
                self.upgrade_property(actor, &name, out);
            }
            None => out.send("You have not joined the game."),
        }
    }

    pub fn buy_property(&mut self, actor: UserId, square_name: &str, out: &mut dyn MessageSink) {
        let Some(pos) = self.board.index_of(square_name) else {
            out.send("Cannot find that property!");
            return;
        };
        if !self.started {
            out.send("The game has not started yet.");
            return;
        }
        if !self.require_roll(out) {
            return;
        }
        let Some(seat) = self.seat_on_turn(actor, out) else {
            return;
        };
        let square = self.board.at(pos);
        if self.players[seat].position != square.position {
            out.send(&format!("{} is not your current position!", square.name));
            return;
        }
        if !square.is_property() {
            out.send(&format!("{} is not a property!", square.name));
            return;
        }
        if let Some(owner) = square.owner {
            let owner_name = self.owner_name(owner).unwrap_or_else(|| owner.to_string());
            out.send(&format!("{} is already owned by {}!", square.name, owner_name));
            return;
        }
        let price = square.effective_price();
        let player = &mut self.players[seat];
        if player.money < price {
            out.send(&format!("{} cannot afford {}!", player.name, square.name));
            for hint in LIQUIDATE_HINTS {
                out.send(hint);
            }
            return;
        }

        let name = square.name.clone();
        let square = &mut self.board.squares_mut()[pos];
        if square.mortgaged {
            player.release(&name);
            square.mortgaged = false;
        }
        player.pay(price);
        square.owner = Some(actor);
        player.properties.push(name.clone());
        out.send(&format!("{} bought {}!", player.name, name));
        self.advance_turn(actor, out);
    }

    pub fn sell_property(&mut self, actor: UserId, square_name: &str, out: &mut dyn MessageSink) {
        let Some(pos) = self.board.index_of(square_name) else {
            out.send("Cannot find that property!");
            return;
        };
        let Some(seat) = self.seat_on_turn(actor, out) else {
            return;
        };
        let square = &mut self.board.squares_mut()[pos];
        if !square.is_property() {
            out.send(&format!("{} is not a property!", square.name));
            return;
        }
        if square.owner != Some(actor) {
            out.send(&format!("{} is not your property!", square.name));
            return;
        }
        let price = square.effective_price();
        let detail = if square.mortgaged {
            " (mortgaged)".to_string()
        } else {
            format!(" level: {}", square.level)
        };
        let player = &mut self.players[seat];
        let message = format!("{} sold {}{} for {}!", player.name, square.name, detail, price);
        player.receive(price);
        player.release(&square.name);
        square.reset();
        out.send(&message);
    }

    pub fn upgrade_property(&mut self, actor: UserId, square_name: &str, out: &mut dyn MessageSink) {
        let Some(pos) = self.board.index_of(square_name) else {
            out.send("Cannot find that property!");
            return;
        };
        if !self.started {
            out.send("The game has not started yet.");
            return;
        }
        if !self.require_roll(out) {
            return;
        }
        let Some(seat) = self.seat_on_turn(actor, out) else {
            return;
        };
        let square = &mut self.board.squares_mut()[pos];
        let player = &mut self.players[seat];
        if player.position != square.position {
            out.send(&format!("{} is not your current position!", square.name));
            return;
        }
        if !square.is_property() {
            out.send(&format!("{} is not a property!", square.name));
            return;
        }
        if square.owner != Some(actor) {
            out.send(&format!("{} is not your property!", square.name));
            return;
        }
        if square.mortgaged {
            out.send(&format!("{} is mortgaged and cannot be upgraded!", square.name));
            return;
        }
        if square.level >= MAX_LEVEL {
            out.send(&format!("{} is already at the highest level!", square.name));
            return;
        }
        let cost = square.house_cost();
        if !player.pay(cost) {
            out.send(&format!(
                "{} does not have enough money to upgrade {}!",
                player.name, square.name
            ));
            return;
        }
        square.level += 1;
        out.send(&format!(
            "{} upgraded {} to level {}!",
            player.name, square.name, square.level
        ));
        self.advance_turn(actor, out);
    }

    pub fn downgrade_property(
        &mut self,
        actor: UserId,
        square_name: &str,
        out: &mut dyn MessageSink,
    ) {
        let Some(pos) = self.board.index_of(square_name) else {
            out.send("Cannot find that property!");
            return;
        };
        let Some(seat) = self.seat_on_turn(actor, out) else {
            return;
        };
        let square = &mut self.board.squares_mut()[pos];
        if !square.is_property() {
            out.send(&format!("{} is not a property!", square.name));
            return;
        }
        if square.owner != Some(actor) {
            out.send(&format!("{} is not your property!", square.name));
            return;
        }
        if square.mortgaged {
            out.send(&format!("{} is mortgaged and cannot be downgraded!", square.name));
            return;
        }
        if square.level == 0 {
            out.send(&format!("{} is already at the lowest level!", square.name));
            return;
        }
        // Refund is the full house cost.
        let player = &mut self.players[seat];
        player.receive(square.house_cost());
        square.level -= 1;
        out.send(&format!(
            "{} downgraded {} to level {}!",
            player.name, square.name, square.level
        ));
    }

    pub fn mortgage_property(
        &mut self,
        actor: UserId,
        square_name: &str,
        out: &mut dyn MessageSink,
    ) {
        let Some(pos) = self.board.index_of(square_name) else {
            out.send("Cannot find that property!");
            return;
        };
        let Some(seat) = self.seat_on_turn(actor, out) else {
            return;
        };
        let square = &mut self.board.squares_mut()[pos];
        if !square.is_property() {
            out.send(&format!("{} is not a property!", square.name));
            return;
        }
        if square.owner != Some(actor) {
            out.send(&format!("{} is not your property!", square.name));
            return;
        }
        if square.mortgaged {
            out.send(&format!("{} is already mortgaged!", square.name));
            return;
        }
        if square.level > 0 {
            out.send(&format!(
                "{} has been upgraded and cannot be mortgaged!",
                square.name
            ));
            return;
        }
        // Credit the pre-mortgage valuation, then flag.
        let player = &mut self.players[seat];
        player.receive(square.effective_price());
        square.mortgaged = true;
        player.mark_mortgaged(&square.name);
        out.send(&format!("{} mortgaged {}!", player.name, square.name));
    }

    /// `/pay`: settle the outstanding debt, or go bankrupt if nothing is left to sell.
    pub fn pay_ledger(&mut self, actor: UserId, out: &mut dyn MessageSink) {
        let Some(seat) = self.seat_on_turn(actor, out) else {
            return;
        };
        let Some(ledger) = self.ledger else {
            out.send(&format!("{} has no debt!", self.players[seat].name));
            return;
        };

        if self.players[seat].money < ledger.amount {
            let player = &mut self.players[seat];
            if player.holds_any() {
                out.send(&format!(
                    "{} does not have enough money! Sell off some property first!",
                    player.name
                ));
                return;
            }
            // Creditor receives nothing on bankruptcy.
            player.money = self.config.bankrupt_sentinel;
            out.send(&format!("{} is bankrupt!", player.name));
            info!("{} went bankrupt owing {}", player.user_id, ledger.amount);
            crate::metrics::record_bankruptcy();
        } else {
            let Some(&creditor_seat) = self.seats.get(&ledger.creditor) else {
                error!(
                    "ledger creditor {} is not seated (debtor {})",
                    ledger.creditor, ledger.debtor
                );
                return;
            };
            self.players[seat].pay(ledger.amount);
            self.players[creditor_seat].receive(ledger.amount);
            out.send(&format!(
                "{} paid {} to {}!",
                self.players[seat].name, ledger.amount, self.players[creditor_seat].name
            ));
        }
        self.ledger = None;

        if let Some(winner) = self.check_winner() {
            out.send(&format!("{} wins with {}!", winner.name, winner.money));
            info!("winner: {} ({})", winner.user_id, winner.money);
            crate::metrics::record_game_won();
            self.reset_game(out);
            return;
        }
        self.advance_turn(actor, out);
    }

    /// `/next`: end the current turn.
    pub fn advance_turn(&mut self, actor: UserId, out: &mut dyn MessageSink) {
        let Some(seat) = self.seat_on_turn(actor, out) else {
            return;
        };
        if !self.require_roll(out) {
            return;
        }
        if self.ledger.is_some() {
            out.send(&format!(
                "{}, you have an unpaid debt!",
                self.players[seat].name
            ));
            return;
        }

        let count = self.players.len();
        self.current = (self.current + 1) % count;
        out.send(&format!("It is {}'s turn!", self.players[self.current].name));
        let mut skipped = 0;
        while self.players[self.current].is_bankrupt() {
            out.send(&format!(
                "{} is bankrupt! Skipping to the next player.",
                self.players[self.current].name
            ));
            self.current = (self.current + 1) % count;
            skipped += 1;
            if skipped >= count {
                out.send("All players are bankrupt. Game over!");
                self.reset_game(out);
                return;
            }
            out.send(&format!("It is {}'s turn!", self.players[self.current].name));
        }
        self.rolled = false;
    }

    /// `/info`: the actor's own holdings.
    pub fn info(&self, actor: UserId, out: &mut dyn MessageSink) {
        if self.players.is_empty() {
            out.send("No players have joined yet.");
            return;
        }
        let Some(player) = self.player(actor) else {
            out.send("You have not joined the game.");
            return;
        };
        let mut lines = vec![
            format!("{}:{}, cash: {}", player.name, player.user_id, player.money),
            format!("Position: {}", self.board.at(player.position).name),
        ];
        if !player.properties.is_empty() {
            let held: Vec<String> = player
                .properties
                .iter()
                .filter_map(|n| self.board.get(n))
                .map(|s| format!("\t{} level: {}", s.name, s.level))
                .collect();
            lines.push(format!("Properties: {}", held.join("\n")));
        }
        if !player.mortgaged.is_empty() {
            lines.push(format!("Mortgaged: {}", player.mortgaged.join("\n")));
        }
        if let Some(ledger) = &self.ledger {
            let creditor = self
                .owner_name(ledger.creditor)
                .unwrap_or_else(|| ledger.creditor.to_string());
            lines.push(format!("Owes {} {}", creditor, ledger.amount));
        }
        out.send(&lines.join("\n"));
    }

    /// `/players`: everyone's cash.
    pub fn show_players(&self, out: &mut dyn MessageSink) {
        if self.players.is_empty() {
            out.send("No players have joined yet.");
            return;
        }
        let mut lines = vec!["Players:".to_string()];
        for p in &self.players {
            lines.push(format!("  {}:{}, cash: {}", p.name, p.user_id, p.money));
        }
        out.send(&lines.join("\n"));
    }

    /// `/board`: every square with price or owner.
    pub fn show_board(&self, out: &mut dyn MessageSink) {
        let mut lines = vec!["Board:".to_string()];
        for (i, square) in self.board.squares().iter().enumerate() {
            let mut line = format!("{:2}: {}", i, square.name);
            match square.owner {
                None if square.is_property() => {
                    line.push_str(&format!(" ({})", square.base_price()));
                }
                None => {}
                Some(owner) => {
                    let owner_name = self.owner_name(owner).unwrap_or_else(|| owner.to_string());
                    line.push_str(&format!(" {} level: {}", owner_name, square.level));
                }
            }
            if square.mortgaged {
                line.push_str(" (mortgaged)");
            }
            lines.push(line);
        }
        out.send(&lines.join("\n"));
    }

    /// `/reset`: the first call arms a confirmation, the second clears the session.
    pub fn request_reset(&mut self, out: &mut dyn MessageSink) -> ResetStatus {
        if !self.confirm_reset {
            self.confirm_reset = true;
            out.send("Send /reset again to confirm resetting the game.");
            return ResetStatus::AwaitingConfirmation;
        }
        self.reset_game(out);
        ResetStatus::Reset
    }

    pub fn reset_game(&mut self, out: &mut dyn MessageSink) {
        self.confirm_reset = false;
        self.players.clear();
        self.seats.clear();
        self.started = false;
        self.current = 0;
        self.ledger = None;
        self.rolled = false;
        self.board.reset();
        info!("session reset");
        out.send("The game has been reset!");
    }
}
