//! Conversation Transcript
//!
//! Append-only log of every conversation line folded into state, in the
//! order it was applied. Can be written out as JSONL.

use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// One line of one conversation, as it was applied to agent memories.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranscriptEntry {
    pub sequence: u64,
    pub pair_id: String,
    pub speaker_id: String,
    pub speaker_name: String,
    pub text: String,
}

impl TranscriptEntry {
    /// The memory participants receive for this line.
    pub fn as_memory(&self) -> String {
        format!("{} said: \"{}\"", self.speaker_name, self.text)
    }
}

#[derive(Debug, Clone, Default)]
pub struct Transcript {
    entries: Vec<TranscriptEntry>,
    next_sequence: u64,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a line and returns the stored entry.
    pub fn push(
        &mut self,
        pair_id: impl Into<String>,
        speaker_id: impl Into<String>,
        speaker_name: impl Into<String>,
        text: impl Into<String>,
    ) -> &TranscriptEntry {
        self.next_sequence += 1;
        self.entries.push(TranscriptEntry {
            sequence: self.next_sequence,
            pair_id: pair_id.into(),
            speaker_id: speaker_id.into(),
            speaker_name: speaker_name.into(),
            text: text.into(),
        });
        &self.entries[self.entries.len() - 1]
    }

    pub fn entries(&self) -> &[TranscriptEntry] {
        &self.entries
    }

    /// Lines belonging to one conversation.
    pub fn for_pair<'a>(&'a self, pair_id: &'a str) -> impl Iterator<Item = &'a TranscriptEntry> + 'a {
        self.entries.iter().filter(move |e| e.pair_id == pair_id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.next_sequence = 0;
    }

    /// Writes one JSON object per line.
    pub fn write_jsonl<W: Write>(&self, writer: &mut W) -> std::io::Result<()> {
        for entry in &self.entries {
            let json = serde_json::to_string(entry)?;
            writeln!(writer, "{}", json)?;
        }
        Ok(())
    }

    /// Writes the transcript to `path`, truncating any existing file.
    pub fn save(&self, path: impl AsRef<Path>) -> std::io::Result<()> {
        let mut writer = BufWriter::new(File::create(path)?);
        self.write_jsonl(&mut writer)?;
        writer.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_assigns_sequence() {
        let mut transcript = Transcript::new();
        transcript.push("a-b", "a", "Asha", "one");
        let entry = transcript.push("a-b", "b", "Bilal", "two");

        assert_eq!(entry.sequence, 2);
        assert_eq!(entry.as_memory(), "Bilal said: \"two\"");
        assert_eq!(transcript.len(), 2);
    }

    #[test]
    fn test_for_pair_filters() {
        let mut transcript = Transcript::new();
        transcript.push("a-b", "a", "Asha", "one");
        transcript.push("c-d", "c", "Chitra", "two");
        transcript.push("a-b", "b", "Bilal", "three");

        let texts: Vec<_> = transcript.for_pair("a-b").map(|e| e.text.as_str()).collect();
        assert_eq!(texts, vec!["one", "three"]);
    }

    #[test]
    fn test_write_jsonl() {
        let mut transcript = Transcript::new();
        transcript.push("a-b", "a", "Asha", "one");
        transcript.push("a-b", "b", "Bilal", "two");

        let mut buffer = Vec::new();
        transcript.write_jsonl(&mut buffer).unwrap();
        let output = String::from_utf8(buffer).unwrap();
        let lines: Vec<_> = output.lines().collect();

        assert_eq!(lines.len(), 2);
        let parsed: TranscriptEntry = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(parsed.speaker_name, "Bilal");
        assert!(lines[0].contains("\"pairId\":\"a-b\""));
    }

    #[test]
    fn test_save_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("transcript.jsonl");

        let mut transcript = Transcript::new();
        transcript.push("a-b", "a", "Asha", "one");
        transcript.save(&path).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().count(), 1);
    }

    #[test]
    fn test_clear_resets_sequence() {
        let mut transcript = Transcript::new();
        transcript.push("a-b", "a", "Asha", "one");
        transcript.clear();
        assert!(transcript.is_empty());
        assert_eq!(transcript.push("a-b", "a", "Asha", "again").sequence, 1);
    }
}
