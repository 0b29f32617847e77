//! Administrative model blacklist.

use std::collections::HashSet;
use std::sync::{Arc, RwLock};

use tracing::info;

/// Blocked out of the box unless the config supplies its own list.
pub const DEFAULT_BLOCKED_MODELS: &[&str] = &["openai/o1-pro"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateVerdict {
    Allowed,
    Blocked,
}

/// Case-insensitive set of disallowed model names.
///
/// Cloning shares the underlying set, so an administrative handle and the
/// chat engine see the same list.
#[derive(Debug, Clone)]
pub struct ModelBlacklist {
    models: Arc<RwLock<HashSet<String>>>,
}

impl Default for ModelBlacklist {
    fn default() -> Self {
        Self::from_models(DEFAULT_BLOCKED_MODELS.iter().copied())
    }
}

impl ModelBlacklist {
    pub fn from_models<I, S>(models: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let models = models
            .into_iter()
            .map(|m| m.as_ref().trim().to_lowercase())
            .filter(|m| !m.is_empty())
            .collect();
        Self { models: Arc::new(RwLock::new(models)) }
    }

    pub fn check(&self, model: &str) -> GateVerdict {
        let models = self.models.read().unwrap_or_else(|e| e.into_inner());
        if models.contains(&model.trim().to_lowercase()) {
            GateVerdict::Blocked
        } else {
            GateVerdict::Allowed
        }
    }

    pub fn is_blocked(&self, model: &str) -> bool {
        self.check(model) == GateVerdict::Blocked
    }

    /// Returns `true` if the model was not already blocked.
    pub fn insert(&self, model: &str) -> bool {
        let added = self
            .models
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(model.trim().to_lowercase());
        if added {
            info!(%model, "model added to blacklist");
        }
        added
    }

    /// Returns `true` if the model was blocked.
    pub fn remove(&self, model: &str) -> bool {
        let removed = self
            .models
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&model.trim().to_lowercase());
        if removed {
            info!(%model, "model removed from blacklist");
        }
        removed
    }

    /// Sorted snapshot, for display.
    pub fn list(&self) -> Vec<String> {
        let mut models: Vec<String> = self
            .models
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .cloned()
            .collect();
        models.sort();
        models
    }
}
