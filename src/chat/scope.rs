//! Conversation scope keys.

use std::fmt;

use super::settings::ContextScope;

/// Identifies one conversation thread: a channel plus an optional
/// discriminator (model or alias, depending on the channel's scope).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ScopeKey {
    channel: String,
    discriminator: Option<String>,
}

impl ScopeKey {
    /// Pure derivation from the request's coordinates. `channel+alias` falls
    /// back to the model when the command did not come through an alias.
    pub fn derive(channel: &str, scope: ContextScope, model: &str, alias: Option<&str>) -> Self {
        let discriminator = match scope {
            ContextScope::Channel => None,
            ContextScope::ChannelModel => Some(model.to_string()),
            ContextScope::ChannelAlias => Some(alias.unwrap_or(model).to_string()),
        };
        Self { channel: channel.to_lowercase(), discriminator }
    }

    pub fn channel(&self) -> &str {
        &self.channel
    }

    pub fn discriminator(&self) -> Option<&str> {
        self.discriminator.as_deref()
    }
}

impl fmt::Display for ScopeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.discriminator {
            Some(d) => write!(f, "{}/{}", self.channel, d),
            None => f.write_str(&self.channel),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_scope_ignores_model_and_alias() {
        let a = ScopeKey::derive("#x", ContextScope::Channel, "model-a", Some("grok"));
        let b = ScopeKey::derive("#x", ContextScope::Channel, "model-b", None);
        assert_eq!(a, b);
        assert_eq!(a.to_string(), "#x");
    }

    #[test]
    fn channel_model_scope_splits_by_model() {
        let a = ScopeKey::derive("#x", ContextScope::ChannelModel, "model-a", None);
        let b = ScopeKey::derive("#x", ContextScope::ChannelModel, "model-b", None);
        assert_ne!(a, b);
        assert_eq!(a.discriminator(), Some("model-a"));
        assert_eq!(a.to_string(), "#x/model-a");
    }

    #[test]
    fn channel_alias_scope_falls_back_to_model() {
        let via_alias = ScopeKey::derive("#x", ContextScope::ChannelAlias, "model-a", Some("grok"));
        let direct = ScopeKey::derive("#x", ContextScope::ChannelAlias, "model-a", None);
        assert_eq!(via_alias.discriminator(), Some("grok"));
        assert_eq!(direct.discriminator(), Some("model-a"));
        assert_ne!(via_alias, direct);
    }

    #[test]
    fn channel_names_fold_case() {
        let a = ScopeKey::derive("#Rust", ContextScope::Channel, "m", None);
        let b = ScopeKey::derive("#rust", ContextScope::Channel, "m", None);
        assert_eq!(a, b);
        assert_eq!(a.channel(), "#rust");
    }

    #[test]
    fn different_channels_never_share() {
        let a = ScopeKey::derive("#a", ContextScope::ChannelModel, "m", None);
        let b = ScopeKey::derive("#b", ContextScope::ChannelModel, "m", None);
        assert_ne!(a, b);
    }
}
