//! Record codec: the two small text formats persisted by the store.
//!
//! A description record is a sequence of `key: value` lines where keys are
//! lowercase identifiers and continuation lines (anything that does not
//! start a new key) belong to the previous key. Reserved keys always
//! serialize first, in fixed order; extra fields follow in insertion order.
//!
//! An import line is `uid` or `uid via=exporterUid`.

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

/// Reserved description keys, in their mandatory serialization order.
pub const RESERVED_KEYS: [&str; 3] = ["source", "kind", "purpose"];

/// An insertion-ordered mapping of description field name to free text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Description {
    fields: Vec<(String, String)>,
}

impl Description {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a description record. Unrecognized leading lines (before any
    /// key) are dropped; values are trimmed.
    pub fn parse(text: &str) -> Self {
        let mut fields: Vec<(String, String)> = Vec::new();
        let mut current: Option<(String, Vec<&str>)> = None;

        for raw in text.lines() {
            if let Some((key, rest)) = split_key_line(raw) {
                if let Some((k, lines)) = current.take() {
                    fields.push((k, lines.join("\n").trim().to_string()));
                }
                current = Some((key.to_string(), vec![rest]));
            } else if let Some((_, lines)) = current.as_mut() {
                lines.push(raw);
            }
        }
        if let Some((k, lines)) = current {
            fields.push((k, lines.join("\n").trim().to_string()));
        }

        Self { fields }
    }

    /// Serialize with reserved keys first, then extras in insertion order.
    pub fn serialize(&self) -> String {
        let mut lines: Vec<String> = Vec::with_capacity(self.fields.len());
        for key in RESERVED_KEYS {
            if let Some(value) = self.get(key) {
                lines.push(format!("{}: {}", key, value));
            }
        }
        for (key, value) in &self.fields {
            if !RESERVED_KEYS.contains(&key.as_str()) {
                lines.push(format!("{}: {}", key, value));
            }
        }
        lines.join("\n")
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Set a field, overwriting in place if the key already exists.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.fields.iter_mut().find(|(k, _)| *k == key) {
            Some((_, v)) => *v = value,
            None => self.fields.push((key, value)),
        }
    }

    /// Merge another set of fields into this one, overwriting by key.
    pub fn merge(&mut self, other: &Description) {
        for (k, v) in &other.fields {
            self.set(k.clone(), v.clone());
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl Serialize for Description {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (k, v) in &self.fields {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

/// Split a `key: value` line. Returns the key and the remainder with at
/// most one space after the colon consumed. Keys are `[a-z_]+`.
fn split_key_line(line: &str) -> Option<(&str, &str)> {
    let colon = line.find(':')?;
    let key = &line[..colon];
    if key.is_empty() || !key.chars().all(|c| c.is_ascii_lowercase() || c == '_') {
        return None;
    }
    let rest = &line[colon + 1..];
    Some((key, rest.strip_prefix(' ').unwrap_or(rest)))
}

/// A directed import edge as stored in an entity's imports list.
///
/// Edge identity is `(uid, via)`: an importer may hold the same uid twice
/// only under different `via` values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImportEdge {
    /// The imported entity uid.
    pub uid: String,
    /// The exporter this import was obtained through, if any.
    pub via: Option<String>,
}

impl ImportEdge {
    pub fn direct(uid: impl Into<String>) -> Self {
        Self {
            uid: uid.into(),
            via: None,
        }
    }

    pub fn via(uid: impl Into<String>, exporter: impl Into<String>) -> Self {
        Self {
            uid: uid.into(),
            via: Some(exporter.into()),
        }
    }

    /// Parse one imports-file line. Tokens other than `via=` after the uid
    /// are ignored. Returns `None` for blank lines.
    pub fn parse_line(line: &str) -> Option<Self> {
        let mut parts = line.split_whitespace();
        let uid = parts.next()?.to_string();
        let mut via = None;
        for token in parts {
            if let Some(exporter) = token.strip_prefix("via=") {
                via = Some(exporter.to_string());
            }
        }
        Some(Self { uid, via })
    }

    /// Format as an imports-file line.
    pub fn to_line(&self) -> String {
        match &self.via {
            Some(exporter) => format!("{} via={}", self.uid, exporter),
            None => self.uid.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_simple_description() {
        let desc = Description::parse("source: src/a.rs\nkind: object\npurpose: does things");
        assert_eq!(desc.get("source"), Some("src/a.rs"));
        assert_eq!(desc.get("kind"), Some("object"));
        assert_eq!(desc.get("purpose"), Some("does things"));
    }

    #[test]
    fn continuation_lines_belong_to_previous_key() {
        let desc = Description::parse("purpose: first line\nsecond line\nnotes: tail");
        assert_eq!(desc.get("purpose"), Some("first line\nsecond line"));
        assert_eq!(desc.get("notes"), Some("tail"));
    }

    #[test]
    fn reserved_keys_serialize_first_in_fixed_order() {
        let mut desc = Description::new();
        desc.set("notes", "extra");
        desc.set("purpose", "p");
        desc.set("source", "s");
        desc.set("kind", "k");
        assert_eq!(desc.serialize(), "source: s\nkind: k\npurpose: p\nnotes: extra");
    }

    #[test]
    fn extra_fields_keep_insertion_order() {
        let mut desc = Description::new();
        desc.set("zebra", "1");
        desc.set("alpha", "2");
        assert_eq!(desc.serialize(), "zebra: 1\nalpha: 2");
    }

    #[test]
    fn round_trip_preserves_fields() {
        let mut desc = Description::new();
        desc.set("source", "src/lib.rs#foo");
        desc.set("kind", "function");
        desc.set("purpose", "parses records");
        desc.set("owner_note", "belongs to codec");
        let parsed = Description::parse(&desc.serialize());
        assert_eq!(parsed, desc);
    }

    #[test]
    fn merge_overwrites_by_key_and_appends_new() {
        let mut base = Description::new();
        base.set("source", "old");
        base.set("kind", "object");
        let mut patch = Description::new();
        patch.set("source", "new");
        patch.set("notes", "added");
        base.merge(&patch);
        assert_eq!(base.get("source"), Some("new"));
        assert_eq!(base.get("kind"), Some("object"));
        assert_eq!(base.get("notes"), Some("added"));
    }

    #[test]
    fn invalid_key_lines_are_continuations() {
        let desc = Description::parse("purpose: p\nUpperCase: not a key");
        assert_eq!(desc.get("purpose"), Some("p\nUpperCase: not a key"));
    }

    #[test]
    fn import_line_round_trip() {
        let direct = ImportEdge::direct("obj-11111111");
        assert_eq!(direct.to_line(), "obj-11111111");
        assert_eq!(ImportEdge::parse_line("obj-11111111"), Some(direct));

        let shared = ImportEdge::via("func-22222222", "obj-33333333");
        assert_eq!(shared.to_line(), "func-22222222 via=obj-33333333");
        assert_eq!(
            ImportEdge::parse_line("func-22222222 via=obj-33333333"),
            Some(shared)
        );
    }

    #[test]
    fn import_line_ignores_unknown_tokens() {
        let edge = ImportEdge::parse_line("obj-1 weight=3 via=obj-2").unwrap();
        assert_eq!(edge.uid, "obj-1");
        assert_eq!(edge.via.as_deref(), Some("obj-2"));
    }

    #[test]
    fn blank_import_line_is_none() {
        assert_eq!(ImportEdge::parse_line("   "), None);
    }
}
