//! Conversation Ingest
//!
//! Normalizes conversations returned by the generation service into the
//! canonical [`ConversationResult`] kept in state.
//!
//! Structured messages pass through untouched. Pre-formatted lines such as
//! `"Asha: I support this"` are attributed by matching the prefix against
//! the two participants' ids and names.

use opinion_model::{Agent, ConversationMessage, ConversationResult, RawConversation, RawMessage};
use tracing::debug;

/// Converts a raw service conversation into a canonical record.
///
/// Participant ids always come from the request side, never from the
/// service's echo, so the record is stored under the pair that was asked for.
pub fn normalize_conversation(
    raw: RawConversation,
    agent1: &Agent,
    agent2: &Agent,
) -> ConversationResult {
    if raw.agent1_id != agent1.id || raw.agent2_id != agent2.id {
        debug!(
            expected = %format!("{}-{}", agent1.id, agent2.id),
            received = %format!("{}-{}", raw.agent1_id, raw.agent2_id),
            "Service echoed different participant ids"
        );
    }

    let messages = raw
        .messages
        .into_iter()
        .enumerate()
        .map(|(position, message)| match message {
            RawMessage::Structured(message) => message,
            RawMessage::Formatted(line) => attribute_line(&line, position, agent1, agent2),
        })
        .collect();

    ConversationResult {
        agent1_id: agent1.id.clone(),
        agent2_id: agent2.id.clone(),
        messages,
    }
}

/// Attributes one formatted line to a speaker.
///
/// Falls back to alternating turns (agent1 first) and keeps the whole line
/// when the prefix names neither participant.
fn attribute_line(line: &str, position: usize, agent1: &Agent, agent2: &Agent) -> ConversationMessage {
    let by_position = if position % 2 == 0 { agent1 } else { agent2 };

    if let Some((prefix, text)) = line.split_once(':') {
        let label = speaker_label(prefix);
        let names = |agent: &Agent| {
            label.eq_ignore_ascii_case(&agent.id) || label.eq_ignore_ascii_case(&agent.name)
        };
        let speaker = match (names(agent1), names(agent2)) {
            (true, false) => Some(agent1),
            (false, true) => Some(agent2),
            // Namesakes: the prefix is valid but says nothing about who spoke
            (true, true) => Some(by_position),
            (false, false) => None,
        };
        if let Some(speaker) = speaker {
            return ConversationMessage::new(speaker.id.clone(), strip_quotes(text.trim()));
        }
    }

    ConversationMessage::new(by_position.id.clone(), line.trim())
}

/// "Asha said" -> "Asha"
fn speaker_label(prefix: &str) -> &str {
    let trimmed = prefix.trim();
    trimmed
        .strip_suffix(" said")
        .map(str::trim_end)
        .unwrap_or(trimmed)
}

fn strip_quotes(text: &str) -> &str {
    text.strip_prefix('"')
        .and_then(|t| t.strip_suffix('"'))
        .unwrap_or(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use opinion_model::fixtures;

    fn participants() -> (Agent, Agent) {
        (
            fixtures::get_agent("agent-0").unwrap(),
            fixtures::get_agent("agent-1").unwrap(),
        )
    }

    fn raw(messages: Vec<RawMessage>) -> RawConversation {
        RawConversation {
            agent1_id: "agent-0".to_string(),
            agent2_id: "agent-1".to_string(),
            messages,
        }
    }

    #[test]
    fn test_structured_messages_pass_through() {
        let (a, b) = participants();
        let result = normalize_conversation(
            raw(vec![
                RawMessage::Structured(ConversationMessage::new("agent-1", "hi")),
                RawMessage::Structured(ConversationMessage::new("agent-0", "hello")),
            ]),
            &a,
            &b,
        );

        assert_eq!(result.messages[0], ConversationMessage::new("agent-1", "hi"));
        assert_eq!(result.messages[1], ConversationMessage::new("agent-0", "hello"));
        assert_eq!(result.pair_id(), "agent-0-agent-1");
    }

    #[test]
    fn test_formatted_lines_matched_by_name() {
        let (a, b) = participants();
        let result = normalize_conversation(
            raw(vec![
                RawMessage::Formatted("Imran Qureshi: I oppose it".to_string()),
                RawMessage::Formatted("meera iyer said: \"I support it\"".to_string()),
            ]),
            &a,
            &b,
        );

        assert_eq!(result.messages[0], ConversationMessage::new("agent-1", "I oppose it"));
        assert_eq!(result.messages[1], ConversationMessage::new("agent-0", "I support it"));
    }

    #[test]
    fn test_formatted_lines_matched_by_id() {
        let (a, b) = participants();
        let result = normalize_conversation(
            raw(vec![RawMessage::Formatted("agent-1: Not convinced".to_string())]),
            &a,
            &b,
        );
        assert_eq!(result.messages[0].agent_id, "agent-1");
        assert_eq!(result.messages[0].text, "Not convinced");
    }

    #[test]
    fn test_unmatched_lines_alternate() {
        let (a, b) = participants();
        let result = normalize_conversation(
            raw(vec![
                RawMessage::Formatted("Somebody: first".to_string()),
                RawMessage::Formatted("no prefix at all".to_string()),
                RawMessage::Formatted("third line".to_string()),
            ]),
            &a,
            &b,
        );

        assert_eq!(result.messages[0], ConversationMessage::new("agent-0", "Somebody: first"));
        assert_eq!(result.messages[1], ConversationMessage::new("agent-1", "no prefix at all"));
        assert_eq!(result.messages[2].agent_id, "agent-0");
    }

    #[test]
    fn test_ids_come_from_request() {
        let (a, b) = participants();
        let mut conversation = raw(Vec::new());
        conversation.agent1_id = "x".to_string();
        conversation.agent2_id = "y".to_string();

        let result = normalize_conversation(conversation, &a, &b);
        assert_eq!(result.agent1_id, "agent-0");
        assert_eq!(result.agent2_id, "agent-1");
        assert!(result.messages.is_empty());
    }

    #[test]
    fn test_namesakes_fall_back_to_position() {
        let (a, mut b) = participants();
        b.name = a.name.clone();
        let result = normalize_conversation(
            raw(vec![
                RawMessage::Formatted("Meera Iyer: first".to_string()),
                RawMessage::Formatted("Meera Iyer: second".to_string()),
            ]),
            &a,
            &b,
        );

        assert_eq!(result.messages[0], ConversationMessage::new("agent-0", "first"));
        assert_eq!(result.messages[1], ConversationMessage::new("agent-1", "second"));
    }

    #[test]
    fn test_speaker_label() {
        assert_eq!(speaker_label("  Asha said "), "Asha");
        assert_eq!(speaker_label("Asha"), "Asha");
    }
}
