//! Applicability policy: decides whether a plugin should see a message.

use crate::message::Message;
use crate::plugin::PluginDescriptor;

/// Returns whether `plugin` should run for `message`.
///
/// Restrictions are evaluated in a fixed order and the first one that is set
/// decides; they are not combined:
///
/// 1. `run_only_on_channels` → the message is channel scoped.
/// 2. `run_only_on_direct_messages` → the message is a direct message.
/// 3. `run_only_on_mentions` → the body contains `self_id`.
/// 4. No restriction → always.
pub fn applies(plugin: &PluginDescriptor, message: &Message, self_id: &str) -> bool {
    if plugin.run_only_on_channels {
        return message.is_channel_scoped();
    }
    if plugin.run_only_on_direct_messages {
        return message.is_direct_message();
    }
    if plugin.run_only_on_mentions {
        return message.body().contains(self_id);
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::Scope;

    const SELF_ID: &str = "test-id";

    fn message(scope: Scope, body: &str) -> Message {
        Message::new("U1", "X1", body, scope)
    }

    #[test]
    fn test_restriction_table() {
        let cases = [
            (PluginDescriptor::new("p").only_channels(true), message(Scope::Channel, ""), true),
            (PluginDescriptor::new("p").only_channels(true), message(Scope::Direct, ""), false),
            (PluginDescriptor::new("p").only_direct_messages(true), message(Scope::Direct, ""), true),
            (PluginDescriptor::new("p").only_direct_messages(true), message(Scope::Channel, ""), false),
            (PluginDescriptor::new("p").only_mentions(true), message(Scope::Channel, "<test-id> run this"), true),
            (PluginDescriptor::new("p").only_mentions(true), message(Scope::Channel, "not mentioned"), false),
        ];

        for (plugin, msg, expected) in cases {
            assert_eq!(applies(&plugin, &msg, SELF_ID), expected, "{plugin:?} {msg:?}");
        }
    }

    #[test]
    fn test_first_restriction_wins() {
        let plugin = PluginDescriptor::new("p")
            .only_channels(true)
            .only_direct_messages(true);
        assert!(applies(&plugin, &message(Scope::Channel, ""), SELF_ID));
        // Rule 2 is never consulted once rule 1 is set.
        assert!(!applies(&plugin, &message(Scope::Direct, ""), SELF_ID));

        let plugin = PluginDescriptor::new("p")
            .only_direct_messages(true)
            .only_mentions(true);
        assert!(!applies(&plugin, &message(Scope::Channel, "hey test-id"), SELF_ID));
    }

    #[test]
    fn test_unrestricted_plugin_always_applies() {
        let plugin = PluginDescriptor::new("p");
        for scope in [Scope::Channel, Scope::Direct, Scope::Unclassified] {
            for body in ["", "anything", "test-id"] {
                assert!(applies(&plugin, &message(scope, body), SELF_ID));
            }
        }
    }
}
