//! One-time codes awaiting verification, keyed by email.
//!
//! Every entry lives for at most `ttl`. `store` schedules a task that deletes
//! the entry once the ttl has passed, but only if the entry still has the
//! generation it was stored with, so an overwrite is never removed by the
//! timer of the value it replaced. `retrieve` also compares the entry's age
//! against the ttl, which keeps expiry exact when no runtime is driving the
//! timers.
//!
//! All access goes through one mutex over the whole map. The lock is never
//! held across an `.await`.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use rand::Rng;
use tokio::time::Instant;

pub const OTP_TTL: Duration = Duration::from_secs(10 * 60);
pub const OTP_DIGITS: usize = 6;

struct OtpEntry {
    code: String,
    generation: u64,
    stored_at: Instant,
}

#[derive(Default)]
struct OtpState {
    entries: HashMap<String, OtpEntry>,
    next_generation: u64,
}

#[derive(Clone)]
pub struct OtpStore {
    state: Arc<Mutex<OtpState>>,
    ttl: Duration,
}

impl Default for OtpStore {
    fn default() -> Self {
        Self::new(OTP_TTL)
    }
}

impl OtpStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            state: Arc::new(Mutex::new(OtpState::default())),
            ttl,
        }
    }

    /// Inserts or overwrites the code for `email` and restarts its ttl.
    pub fn store(&self, email: &str, code: &str) {
        let generation = {
            let mut state = self.state.lock();
            state.next_generation += 1;
            let generation = state.next_generation;
            state.entries.insert(
                email.to_string(),
                OtpEntry {
                    code: code.to_string(),
                    generation,
                    stored_at: Instant::now(),
                },
            );
            generation
        };

        // Without a runtime the age check in `retrieve` still applies.
        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            let state = Arc::clone(&self.state);
            let key = email.to_string();
            let ttl = self.ttl;
            handle.spawn(async move {
                tokio::time::sleep(ttl).await;
                let mut state = state.lock();
                if state
                    .entries
                    .get(&key)
                    .is_some_and(|entry| entry.generation == generation)
                {
                    state.entries.remove(&key);
                }
            });
        }
    }

    /// Current code for `email`. Does not consume it.
    pub fn retrieve(&self, email: &str) -> Option<String> {
        let state = self.state.lock();
        state
            .entries
            .get(email)
            .filter(|entry| entry.stored_at.elapsed() < self.ttl)
            .map(|entry| entry.code.clone())
    }

    pub fn remove(&self, email: &str) -> Option<String> {
        self.state.lock().entries.remove(email).map(|entry| entry.code)
    }

    /// Entries still held, including ones whose expiry task has not run yet.
    pub fn len(&self) -> usize {
        self.state.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Six random decimal digits, zero padded.
    pub fn generate_code() -> String {
        let n: u32 = rand::rng().random_range(0..1_000_000);
        format!("{n:0width$}", width = OTP_DIGITS)
    }
}
