//! In-process conversation store: one capped FIFO of turns per scope.
//!
//! Nothing is persisted: a restart starts every scope empty.
//!
//! Locking is two-level. The outer table lock is held only long enough to
//! find or create a scope's slot; each slot has its own mutex guarding the
//! append-and-trim sequence. Callers never hold either lock across I/O.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};

use super::scope::ScopeKey;
use crate::llm::{ChatMessage, Role};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Speaker {
    User,
    Assistant,
}

impl Speaker {
    pub fn role(self) -> Role {
        match self {
            Speaker::User => Role::User,
            Speaker::Assistant => Role::Assistant,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Turn {
    pub speaker: Speaker,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl Turn {
    pub fn user(content: impl Into<String>) -> Self {
        Self { speaker: Speaker::User, content: content.into(), timestamp: Utc::now() }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self { speaker: Speaker::Assistant, content: content.into(), timestamp: Utc::now() }
    }

    pub fn to_message(&self) -> ChatMessage {
        ChatMessage::new(self.speaker.role(), self.content.clone())
    }
}

/// Snapshot of one scope's turns, oldest first.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConversationHistory {
    turns: Vec<Turn>,
}

impl ConversationHistory {
    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// The newest `n` turns, still in chronological order.
    pub fn recent(&self, n: usize) -> &[Turn] {
        &self.turns[self.turns.len().saturating_sub(n)..]
    }
}

type Thread = Arc<Mutex<VecDeque<Turn>>>;

/// Recover from poisoning: the guarded data is a plain list of turns, and a
/// panic between push and trim leaves it over-long at worst.
fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Debug, Default)]
pub struct ConversationStore {
    threads: Mutex<HashMap<ScopeKey, Thread>>,
}

impl ConversationStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn thread(&self, key: &ScopeKey) -> Option<Thread> {
        lock(&self.threads).get(key).cloned()
    }

    /// Current turns for `key`; empty if the scope has never been used.
    pub fn read(&self, key: &ScopeKey) -> ConversationHistory {
        match self.thread(key) {
            Some(thread) => ConversationHistory { turns: lock(&thread).iter().cloned().collect() },
            None => ConversationHistory::default(),
        }
    }

    /// Append one exchange, then evict oldest turns until the scope holds at
    /// most `max_history`. A cap of 0 empties the scope.
    pub fn append(&self, key: &ScopeKey, user: Turn, assistant: Turn, max_history: usize) {
        if max_history == 0 {
            if let Some(thread) = self.thread(key) {
                lock(&thread).clear();
            }
            return;
        }

        let thread = lock(&self.threads).entry(key.clone()).or_default().clone();
        let mut turns = lock(&thread);
        turns.push_back(user);
        turns.push_back(assistant);
        evict(&mut turns, max_history);
    }

    /// Forget one scope. Returns whether it existed.
    pub fn clear(&self, key: &ScopeKey) -> bool {
        lock(&self.threads).remove(key).is_some()
    }

    /// Forget every scope belonging to `channel`. Returns how many went.
    pub fn clear_channel(&self, channel: &str) -> usize {
        let channel = channel.to_lowercase();
        let mut threads = lock(&self.threads);
        let before = threads.len();
        threads.retain(|key, _| key.channel() != channel);
        before - threads.len()
    }

    pub fn scope_count(&self) -> usize {
        lock(&self.threads).len()
    }
}

/// Drop from the front, a user+assistant pair at a time when the head is one.
fn evict(turns: &mut VecDeque<Turn>, cap: usize) {
    while turns.len() > cap {
        let head_is_pair = matches!(
            (turns.front(), turns.get(1)),
            (Some(a), Some(b)) if a.speaker == Speaker::User && b.speaker == Speaker::Assistant
        );
        turns.pop_front();
        if head_is_pair {
            turns.pop_front();
        }
    }
}
