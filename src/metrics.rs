//! Process-wide game counters.
//!
//! Plain atomics for lifecycle events plus a per-command tally keyed by the
//! command word. Read through [`snapshot`]; the `status` subcommand prints it.
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, OnceLock};

static GAMES_STARTED: AtomicU64 = AtomicU64::new(0);
static GAMES_WON: AtomicU64 = AtomicU64::new(0);
static BANKRUPTCIES: AtomicU64 = AtomicU64::new(0);
static SAVE_FAILURES: AtomicU64 = AtomicU64::new(0);

static COMMANDS: OnceLock<Mutex<HashMap<&'static str, u64>>> = OnceLock::new();

fn command_lock() -> MutexGuard<'static, HashMap<&'static str, u64>> {
    let lock = COMMANDS.get_or_init(|| Mutex::new(HashMap::new()));
    // A panicking holder cannot leave the map half-updated; keep counting.
    lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

pub fn record_command(word: &'static str) {
    let mut guard = command_lock();
    let n = guard.entry(word).or_insert(0);
    *n = n.saturating_add(1);
}

pub fn record_game_started() {
    GAMES_STARTED.fetch_add(1, Ordering::Relaxed);
}

pub fn record_game_won() {
    GAMES_WON.fetch_add(1, Ordering::Relaxed);
}

pub fn record_bankruptcy() {
    BANKRUPTCIES.fetch_add(1, Ordering::Relaxed);
}

pub fn record_save_failure() {
    SAVE_FAILURES.fetch_add(1, Ordering::Relaxed);
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub games_started: u64,
    pub games_won: u64,
    pub bankruptcies: u64,
    pub save_failures: u64,
    pub commands: HashMap<&'static str, u64>,
}

impl Snapshot {
    pub fn commands_handled(&self) -> u64 {
        self.commands.values().sum()
    }
}

pub fn snapshot() -> Snapshot {
    Snapshot {
        games_started: GAMES_STARTED.load(Ordering::Relaxed),
        games_won: GAMES_WON.load(Ordering::Relaxed),
        bankruptcies: BANKRUPTCIES.load(Ordering::Relaxed),
        save_failures: SAVE_FAILURES.load(Ordering::Relaxed),
        commands: command_lock().clone(),
    }
}
