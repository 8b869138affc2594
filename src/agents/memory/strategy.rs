//! Memory management strategies for conversation history
//!
//! Cuts always land on a group boundary: a tool result stays with the
//! assistant turn that requested it.

use crate::agents::config::MemoryStrategy;
use crate::agents::domain::{Message, Role};

/// Apply a memory strategy to a list of messages
pub fn apply_strategy(messages: &[Message], strategy: &MemoryStrategy) -> Vec<Message> {
    match strategy {
        MemoryStrategy::Full => messages.to_vec(),
        MemoryStrategy::SlidingWindow { size } => apply_sliding_window(messages, *size),
        MemoryStrategy::FirstLast { first, last } => apply_first_last(messages, *first, *last),
    }
}

/// Move `idx` back to the start of the group it falls in.
pub(crate) fn group_start(messages: &[Message], mut idx: usize) -> usize {
    while idx > 0 && idx < messages.len() && messages[idx].role == Role::Tool {
        idx -= 1;
    }
    idx
}

/// Move `idx` forward past any tool results belonging to the group before it.
fn group_end(messages: &[Message], mut idx: usize) -> usize {
    while idx < messages.len() && messages[idx].role == Role::Tool {
        idx += 1;
    }
    idx
}

/// Keep roughly the last N messages (plus a leading system message)
fn apply_sliding_window(messages: &[Message], window_size: usize) -> Vec<Message> {
    if messages.is_empty() {
        return Vec::new();
    }

    let mut result = Vec::new();

    let start_idx = if messages[0].role == Role::System {
        result.push(messages[0].clone());
        1
    } else {
        0
    };

    let remaining = &messages[start_idx..];
    let take_from = group_start(remaining, remaining.len().saturating_sub(window_size));

    result.extend(remaining[take_from..].iter().cloned());
    result
}

/// Keep the first N messages and the last M messages
fn apply_first_last(messages: &[Message], first_count: usize, last_count: usize) -> Vec<Message> {
    if messages.len() <= first_count + last_count {
        return messages.to_vec();
    }

    let first_end = group_end(messages, first_count);
    let last_start = group_start(messages, messages.len().saturating_sub(last_count));

    if last_start <= first_end {
        return messages.to_vec();
    }

    let mut result = Vec::with_capacity(first_end + messages.len() - last_start);
    result.extend(messages[..first_end].iter().cloned());
    result.extend(messages[last_start..].iter().cloned());
    result
}
