use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Append-only transcript of the conversation, shared by every chat request.
///
/// Entries are plain text turns of the form `"User: ..."` and `"AI: ..."`.
#[derive(Debug, Default)]
pub struct ConversationHistory {
    entries: RwLock<Vec<String>>,
}

impl ConversationHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_user(&self, text: &str) {
        self.write().push(format!("User: {text}"));
    }

    pub fn push_ai(&self, text: &str) {
        self.write().push(format!("AI: {text}"));
    }

    /// Snapshot of all entries, oldest first.
    pub fn entries(&self) -> Vec<String> {
        self.read().clone()
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    fn read(&self) -> RwLockReadGuard<'_, Vec<String>> {
        self.entries.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Vec<String>> {
        self.entries.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entries_are_prefixed_and_ordered() {
        let history = ConversationHistory::new();
        assert!(history.is_empty());

        history.push_user("How stressed are students?");
        history.push_ai("Quite stressed.");

        assert_eq!(history.len(), 2);
        assert_eq!(
            history.entries(),
            vec!["User: How stressed are students?", "AI: Quite stressed."]
        );
    }
}
