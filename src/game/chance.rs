//! Chance / fate deck. Cards are drawn and shown; their amounts are not applied.

use rand::Rng;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChanceCard {
    pub label: &'static str,
    pub loss: i64,
    pub gain: i64,
}

const fn card(label: &'static str, loss: i64, gain: i64) -> ChanceCard {
    ChanceCard { label, loss, gain }
}

pub const DECK: [ChanceCard; 8] = [
    card("Bonus! Collect $100", 0, 100),
    card("Bonus! Collect $50", 0, 50),
    card("Fine: pay $30", 30, 0),
    card("Fine: pay $75", 75, 0),
    card("Bonus! Collect $200", 0, 200),
    card("Fine: pay $100", 100, 0),
    card("Bonus! Collect $150", 0, 150),
    card("Fine: pay $20", 20, 0),
];

/// Pick one card uniformly at random.
pub fn draw<R: Rng + ?Sized>(rng: &mut R) -> ChanceCard {
    DECK[rng.gen_range(0..DECK.len())]
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn draws_come_from_the_deck() {
        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..64 {
            let c = draw(&mut rng);
            assert!(DECK.contains(&c));
            assert!(c.loss == 0 || c.gain == 0);
        }
    }
}
