//! Parsed playlist data model
//!
//! A channel entry is a mapping from field name to string value. The rule
//! engine addresses fields by the names configured in filter and
//! transformation rules, so entries stay map-shaped instead of becoming a
//! fixed struct.

use std::collections::HashMap;

/// Recognized EXTINF attribute fields, in the order the writer emits them
pub const TVG_ID: &str = "tvg-id";
pub const TVG_NAME: &str = "tvg-name";
pub const TVG_LOGO: &str = "tvg-logo";
pub const GROUP_TITLE: &str = "group-title";

/// Reserved field holding the resolved stream URL line, verbatim
pub const STREAM: &str = "stream";
/// Reserved field holding free-form lines between the entry header and its
/// stream URL, concatenated with line breaks, verbatim
pub const METADATA: &str = "metadata";

/// One playable item: descriptive attributes, optional metadata block, and a
/// stream URL
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChannelEntry {
    fields: HashMap<String, String>,
}

impl ChannelEntry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.fields.get(field).map(String::as_str)
    }

    pub fn set(&mut self, field: impl Into<String>, value: impl Into<String>) {
        self.fields.insert(field.into(), value.into());
    }

    pub fn remove(&mut self, field: &str) {
        self.fields.remove(field);
    }

    /// Append a raw metadata line, creating the field if absent
    pub fn append_metadata(&mut self, line: &str) {
        let metadata = self.fields.entry(METADATA.to_string()).or_default();
        metadata.push_str(line);
        metadata.push('\n');
    }

    pub fn tvg_id(&self) -> Option<&str> {
        self.get(TVG_ID)
    }

    pub fn tvg_name(&self) -> Option<&str> {
        self.get(TVG_NAME)
    }

    pub fn stream(&self) -> Option<&str> {
        self.get(STREAM)
    }

    pub fn clear(&mut self) {
        self.fields.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// A parsed playlist: the preserved header line (if any, with its trailing
/// newline) and an ordered sequence of entries
#[derive(Debug, Clone, Default)]
pub struct Playlist {
    pub header: Option<String>,
    pub entries: Vec<ChannelEntry>,
}
