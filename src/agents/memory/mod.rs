//! Conversation state for one agent session.
//!
//! An ordered, append-only transcript with explicit retention. The system
//! prompt is held apart and always leads the model context. Retention runs
//! only when a turn is committed, so a checkpoint taken at the start of a
//! turn stays valid until the turn ends either way.

mod strategy;

pub use strategy::apply_strategy;

use crate::agents::config::MemoryConfig;
use crate::agents::domain::{Message, Role};

/// Transcript position a turn can be rolled back to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Checkpoint(usize);

#[derive(Debug, Clone)]
pub struct Conversation {
    system: Option<Message>,
    messages: Vec<Message>,
    config: MemoryConfig,
}

impl Conversation {
    pub fn new(system_prompt: Option<String>, config: MemoryConfig) -> Self {
        Self {
            system: system_prompt.map(Message::system),
            messages: Vec::new(),
            config,
        }
    }

    /// Append a turn. Tool results must answer a call requested by an
    /// earlier assistant turn; unlinked ones are dropped.
    pub fn push(&mut self, message: Message) -> bool {
        if message.role == Role::Tool {
            let linked = message.tool_call_id.as_deref().is_some_and(|id| {
                self.messages
                    .iter()
                    .rev()
                    .take_while(|m| m.role == Role::Tool || m.role == Role::Assistant)
                    .any(|m| m.requested(id))
            });
            if !linked {
                tracing::warn!(tool = ?message.name, "Dropping tool result with no matching request");
                return false;
            }
        }
        self.messages.push(message);
        true
    }

    pub fn checkpoint(&self) -> Checkpoint {
        Checkpoint(self.messages.len())
    }

    /// Discard everything appended since `checkpoint`.
    pub fn rollback(&mut self, checkpoint: Checkpoint) {
        self.messages.truncate(checkpoint.0);
    }

    /// Close out a turn and enforce `max_messages`, evicting whole groups
    /// (a turn plus the tool results it requested) from the front.
    pub fn commit(&mut self) {
        let max = self.config.max_messages;
        if self.messages.len() <= max {
            return;
        }
        let mut cut = self.messages.len() - max;
        while cut < self.messages.len() && self.messages[cut].role == Role::Tool {
            cut += 1;
        }
        // never evict the turn just completed
        let last_user = self
            .messages
            .iter()
            .rposition(|m| m.role == Role::User)
            .unwrap_or(0);
        let cut = cut.min(last_user);
        self.messages.drain(..cut);
    }

    /// Messages presented to the model: system prompt, then the transcript
    /// filtered through the configured strategy.
    pub fn context(&self) -> Vec<Message> {
        let mut out = Vec::with_capacity(self.messages.len() + 1);
        out.extend(self.system.iter().cloned());
        out.extend(apply_strategy(&self.messages, &self.config.strategy));
        out
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Forget the transcript, keeping the system prompt.
    pub fn clear(&mut self) {
        self.messages.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::config::MemoryStrategy;
    use crate::agents::domain::ToolCall;
    use serde_json::json;

    fn conversation(max_messages: usize) -> Conversation {
        Conversation::new(
            Some("system".into()),
            MemoryConfig {
                strategy: MemoryStrategy::Full,
                max_messages,
            },
        )
    }

    fn exchange(conv: &mut Conversation, question: &str, tools: usize) {
        conv.push(Message::user(question));
        let calls: Vec<ToolCall> = (0..tools)
            .map(|i| ToolCall::new(format!("{question}-{i}"), "get_domains", json!({})))
            .collect();
        if !calls.is_empty() {
            conv.push(Message::assistant_with_tools("", calls.clone()));
            for call in &calls {
                assert!(conv.push(Message::tool_result(call, "{}")));
            }
        }
        conv.push(Message::assistant("answer"));
        conv.commit();
    }

    #[test]
    fn test_context_leads_with_system() {
        let mut conv = conversation(10);
        exchange(&mut conv, "q1", 0);
        let ctx = conv.context();
        assert_eq!(ctx[0].role, Role::System);
        assert_eq!(ctx.len(), 3);
    }

    #[test]
    fn test_unlinked_tool_result_rejected() {
        let mut conv = conversation(10);
        conv.push(Message::user("q"));
        let stray = ToolCall::new("nobody-asked", "get_domains", json!({}));
        assert!(!conv.push(Message::tool_result(&stray, "{}")));
        assert_eq!(conv.len(), 1);
    }

    #[test]
    fn test_rollback_restores_transcript() {
        let mut conv = conversation(10);
        exchange(&mut conv, "q1", 0);
        let before = conv.messages().to_vec();

        let checkpoint = conv.checkpoint();
        conv.push(Message::user("q2"));
        conv.push(Message::assistant("partial"));
        conv.rollback(checkpoint);

        assert_eq!(conv.messages(), &before[..]);
    }

    #[test]
    fn test_retention_bound_keeps_groups_whole() {
        let mut conv = conversation(6);
        exchange(&mut conv, "q1", 2);
        exchange(&mut conv, "q2", 2);

        assert!(conv.len() <= 6);
        let msgs = conv.messages();
        assert_ne!(msgs[0].role, Role::Tool);
        for (i, m) in msgs.iter().enumerate() {
            if let Some(id) = &m.tool_call_id {
                assert!(msgs[..i].iter().any(|prev| prev.requested(id)));
            }
        }
    }

    #[test]
    fn test_clear_keeps_system_prompt() {
        let mut conv = conversation(10);
        exchange(&mut conv, "q1", 1);
        conv.clear();
        assert!(conv.is_empty());
        assert_eq!(conv.context().len(), 1);
    }
}
