/// Registry of live game sessions, one per chat session key.
///
/// Each key gets its own async lock, created the first time the key is seen.
/// Every command runs under that lock: load (or create) the session, apply the
/// command, save the document, release. Sessions for different keys never wait on
/// each other. A completed `/reset` deletes the stored document and drops the
/// in-memory session; the next command for that key starts from scratch.
use anyhow::{anyhow, Result};
use log::{debug, info, warn};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::Mutex as AsyncMutex;

use super::command::{Command, HELP_TEXT};
use crate::config::GameConfig;
use crate::game::{GameSession, MessageSink, ResetStatus, UserId};
use crate::storage::SessionStore;
use crate::validation::{display_name, validate_session_key};

type Slot = Arc<AsyncMutex<Option<GameSession>>>;

pub struct SessionRegistry<S: SessionStore> {
    store: S,
    config: GameConfig,
    slots: Mutex<HashMap<String, Slot>>,
}

impl<S: SessionStore> SessionRegistry<S> {
    pub fn new(store: S, config: GameConfig) -> Self {
        SessionRegistry {
            store,
            config,
            slots: Mutex::new(HashMap::new()),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    fn slot(&self, key: &str) -> Slot {
        let mut slots = self
            .slots
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        slots.entry(key.to_string()).or_default().clone()
    }

    /// Whether a session for `key` is currently held in memory.
    pub async fn is_cached(&self, key: &str) -> bool {
        let slot = self.slot(key);
        let guard = slot.lock().await;
        guard.is_some()
    }

    /// Drop the in-memory session for `key`; the stored document is kept.
    pub async fn evict(&self, key: &str) {
        let slot = self.slot(key);
        let mut guard = slot.lock().await;
        if guard.take().is_some() {
            debug!("evicted session {}", crate::logutil::escape_log(key));
        }
    }

    fn load_or_create(&self, key: &str) -> Result<GameSession> {
        match self.store.load(key) {
            Ok(Some(doc)) => GameSession::from_document(&doc, self.config.clone()).map_err(|e| {
                warn!("stored session {} is unusable: {}", crate::logutil::escape_log(key), e);
                anyhow!("Failed to restore session {}: {}", key, e)
            }),
            Ok(None) => {
                info!("new session {}", crate::logutil::escape_log(key));
                Ok(GameSession::new(self.config.clone()))
            }
            Err(e) => Err(anyhow!("Failed to load session {}: {}", key, e)),
        }
    }

    /// Run one command for `actor` in session `key`, writing replies to `out`.
    ///
    /// Errors are persistence problems only; game rule violations are replies.
    pub async fn execute(
        &self,
        key: &str,
        actor: UserId,
        actor_name: &str,
        command: Command,
        out: &mut (dyn MessageSink + Send),
    ) -> Result<()> {
        let key = validate_session_key(key)?;
        match &command {
            Command::Help => {
                out.send(HELP_TEXT);
                return Ok(());
            }
            Command::Invalid(usage) => {
                out.send(usage);
                return Ok(());
            }
            Command::Unknown => return Ok(()),
            _ => {}
        }
        crate::metrics::record_command(command.word());
        debug!(
            "{} in {}: /{}",
            actor,
            crate::logutil::escape_log(&key),
            command.word()
        );

        let slot = self.slot(&key);
        let mut guard = slot.lock().await;
        if guard.is_none() {
            *guard = Some(self.load_or_create(&key)?);
        }
        let Some(session) = guard.as_mut() else {
            return Err(anyhow!("session {} vanished while locked", key));
        };

        let mutates = command.mutates();
        match command {
            Command::Join => session.add_player(&display_name(actor_name, actor.0), actor, out),
            Command::Start => session.start_game(out),
            Command::Roll => session.roll_dice(actor, out),
            Command::Buy => session.buy_here(actor, out),
            Command::Upgrade => session.upgrade_here(actor, out),
            Command::Sell(square) => session.sell_property(actor, &square, out),
            Command::Downgrade(square) => session.downgrade_property(actor, &square, out),
            Command::Mortgage(square) => session.mortgage_property(actor, &square, out),
            Command::Pay => session.pay_ledger(actor, out),
            Command::Next => session.advance_turn(actor, out),
            Command::Info => session.info(actor, out),
            Command::Players => session.show_players(out),
            Command::Board => session.show_board(out),
            Command::Reset => {
                if session.request_reset(out) == ResetStatus::Reset {
                    *guard = None;
                    self.store
                        .delete(&key)
                        .map_err(|e| anyhow!("Failed to delete session {}: {}", key, e))?;
                    info!("session {} reset and evicted", crate::logutil::escape_log(&key));
                    out.send("Use /join to join a new game.");
                    return Ok(());
                }
            }
            Command::Help | Command::Invalid(_) | Command::Unknown => {}
        }

        if !mutates {
            return Ok(());
        }
        let doc = session.to_document();
        if let Err(e) = self.store.save(&key, &doc) {
            // In-memory state is kept; the next successful save catches up.
            warn!("failed to save session {}: {}", crate::logutil::escape_log(&key), e);
            crate::metrics::record_save_failure();
            return Err(anyhow!("Failed to save session {}: {}", key, e));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::GameError;
    use crate::game::SessionDocument;
    use crate::storage::MemoryStore;
    use std::sync::atomic::{AtomicBool, Ordering};

    struct FailingStore {
        fail: AtomicBool,
        inner: MemoryStore,
    }

    impl SessionStore for FailingStore {
        fn save(&self, key: &str, doc: &SessionDocument) -> Result<(), GameError> {
            if self.fail.load(Ordering::SeqCst) {
                return Err(GameError::Io(std::io::Error::new(
                    std::io::ErrorKind::Other,
                    "disk full",
                )));
            }
            self.inner.save(key, doc)
        }
        fn load(&self, key: &str) -> Result<Option<SessionDocument>, GameError> {
            self.inner.load(key)
        }
        fn delete(&self, key: &str) -> Result<(), GameError> {
            self.inner.delete(key)
        }
    }

    #[tokio::test]
    async fn read_only_commands_do_not_save() {
        let reg = SessionRegistry::new(MemoryStore::new(), GameConfig::default());
        let mut out: Vec<String> = Vec::new();
        reg.execute("k", UserId(1), "a", Command::Board, &mut out)
            .await
            .unwrap();
        assert!(reg.store().is_empty());
        assert!(reg.is_cached("k").await);
        reg.execute("k", UserId(1), "a", Command::Join, &mut out)
            .await
            .unwrap();
        assert_eq!(reg.store().len(), 1);
    }

    #[tokio::test]
    async fn help_and_unknown_do_not_create_sessions() {
        let reg = SessionRegistry::new(MemoryStore::new(), GameConfig::default());
        let mut out: Vec<String> = Vec::new();
        reg.execute("k", UserId(1), "a", Command::Help, &mut out)
            .await
            .unwrap();
        reg.execute("k", UserId(1), "a", Command::Unknown, &mut out)
            .await
            .unwrap();
        assert_eq!(out, vec![HELP_TEXT.to_string()]);
        assert!(!reg.is_cached("k").await);
    }

    #[tokio::test]
    async fn failed_save_is_reported_and_state_kept() {
        let store = FailingStore {
            fail: AtomicBool::new(true),
            inner: MemoryStore::new(),
        };
        let reg = SessionRegistry::new(store, GameConfig::default());
        let mut out: Vec<String> = Vec::new();
        let res = reg
            .execute("k", UserId(1), "a", Command::Join, &mut out)
            .await;
        assert!(res.is_err());
        assert_eq!(out, vec!["a joined the game!"]);

        reg.store().fail.store(false, Ordering::SeqCst);
        out.clear();
        reg.execute("k", UserId(1), "a", Command::Join, &mut out)
            .await
            .unwrap();
        assert_eq!(out, vec!["a has already joined!"]);
        assert_eq!(reg.store().inner.load("k").unwrap().unwrap().players.len(), 1);
    }

    #[tokio::test]
    async fn bad_key_is_rejected() {
        let reg = SessionRegistry::new(MemoryStore::new(), GameConfig::default());
        let mut out: Vec<String> = Vec::new();
        assert!(reg
            .execute("  ", UserId(1), "a", Command::Join, &mut out)
            .await
            .is_err());
        assert!(out.is_empty());
    }
}
