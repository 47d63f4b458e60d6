use std::collections::{BTreeSet, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::message::ResponseCode;
use crate::model::Player;

/// Why an authenticated player was refused a place in the world.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum AdmissionError {
    #[error("account is already online")]
    AccountOnline,
    #[error("world is full")]
    ServerFull,
}

impl AdmissionError {
    pub fn response_code(self) -> ResponseCode {
        match self {
            Self::AccountOnline => ResponseCode::AccountOnline,
            Self::ServerFull => ResponseCode::ServerFull,
        }
    }
}

#[derive(Debug)]
struct RegistrationState {
    capacity: usize,
    queue: VecDeque<Player>,
    queued: BTreeSet<u64>,
    online: BTreeSet<u64>,
}

/// Hands authenticated players from the login workers to the tick thread.
///
/// Names are tracked from admission until [`Registrations::mark_offline`], so
/// one account cannot hold two places whether it is queued or in the world.
/// Cloning shares the queue.
#[derive(Debug, Clone)]
pub struct Registrations {
    state: Arc<Mutex<RegistrationState>>,
}

impl Registrations {
    pub fn new(capacity: usize) -> Self {
        Self {
            state: Arc::new(Mutex::new(RegistrationState {
                capacity,
                queue: VecDeque::new(),
                queued: BTreeSet::new(),
                online: BTreeSet::new(),
            })),
        }
    }

    /// Queues `player` for registration on the next game pulse.
    ///
    /// The player is handed back with the reason when refused.
    pub fn admit(&self, player: Player) -> Result<(), (AdmissionError, Player)> {
        let mut state = self.lock();
        let name = player.encoded_username();
        if state.queued.contains(&name) || state.online.contains(&name) {
            return Err((AdmissionError::AccountOnline, player));
        }
        if state.queued.len() + state.online.len() >= state.capacity {
            return Err((AdmissionError::ServerFull, player));
        }
        state.queued.insert(name);
        state.queue.push_back(player);
        Ok(())
    }

    /// Takes up to `limit` queued players in admission order and counts them as online.
    pub fn take_batch(&self, limit: usize) -> Vec<Player> {
        let mut state = self.lock();
        let count = limit.min(state.queue.len());
        let batch: Vec<Player> = state.queue.drain(..count).collect();
        for player in &batch {
            let name = player.encoded_username();
            state.queued.remove(&name);
            state.online.insert(name);
        }
        batch
    }

    /// Frees the account name for a new login.
    pub fn mark_offline(&self, encoded_username: u64) {
        self.lock().online.remove(&encoded_username);
    }

    pub fn is_online(&self, encoded_username: u64) -> bool {
        let state = self.lock();
        state.online.contains(&encoded_username) || state.queued.contains(&encoded_username)
    }

    pub fn queued_len(&self) -> usize {
        self.lock().queue.len()
    }

    pub fn online_len(&self) -> usize {
        self.lock().online.len()
    }

    fn lock(&self) -> MutexGuard<'_, RegistrationState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
