//! Read-only projection of history into display entries.

use dokter_ai::Role;
use serde::Serialize;

use crate::conversation::Turn;

/// Display label for the model's turns
pub const MODEL_LABEL: &str = "dokter";
/// Display label for the user's turns
pub const USER_LABEL: &str = "user";

/// One chat bubble
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TranscriptEntry {
    pub role: Role,
    pub label: &'static str,
    pub text: String,
}

/// Map an internal role to its user-facing label
pub fn role_label(role: Role) -> &'static str {
    match role {
        Role::Model => MODEL_LABEL,
        Role::User => USER_LABEL,
    }
}

/// Render every turn, in order.
pub fn render(turns: &[Turn]) -> Vec<TranscriptEntry> {
    turns
        .iter()
        .map(|turn| TranscriptEntry {
            role: turn.role,
            label: role_label(turn.role),
            text: turn.text.clone(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversation::Conversation;

    #[test]
    fn test_labels() {
        assert_eq!(role_label(Role::Model), "dokter");
        assert_eq!(role_label(Role::User), "user");
    }

    #[test]
    fn test_render_is_idempotent() {
        let conversation = Conversation::seeded();
        let first = render(conversation.turns());
        let second = render(conversation.turns());
        assert_eq!(first, second);
        assert_eq!(first.len(), 2);
        assert_eq!(first[0].label, "user");
        assert_eq!(first[1].label, "dokter");
    }
}
