//! Streaming M3U parser
//!
//! A line classifier with four mutually exclusive categories, tested in
//! priority order: header line, entry-header (EXTINF) line, stream-URL line,
//! metadata. Entries are materialized only when their stream line arrives;
//! the model's filter/transform engine runs inline at that point so memory
//! stays bounded to one in-progress entry.

use regex::Regex;
use tracing::debug;

use crate::models::{ChannelEntry, GROUP_TITLE, METADATA, Playlist, STREAM, TVG_NAME};
use crate::rules::ModelEngine;

const HEADER_PREFIX: &str = "#EXTM3U";
const ENTRY_PREFIX: &str = "#EXTINF";

/// URL scheme prefixes that finalize an in-progress entry
const STREAM_SCHEMES: [&str; 5] = ["http://", "https://", "rtmp://", "rtsp://", "udp://"];

pub struct PlaylistParser {
    /// Duration marker, up to five key="value" pairs, trailing title after
    /// the last comma
    extinf_attrs: Regex,
    /// Leading run of word characters, for the group-title fallback
    group_prefix: Regex,
}

impl Default for PlaylistParser {
    fn default() -> Self {
        Self::new()
    }
}

impl PlaylistParser {
    pub fn new() -> Self {
        let extinf_attrs = Regex::new(
            r#"^#EXTINF:-?\d+,?(?: *?([\w-]*)="(.*?)")?(?: *?([\w-]*)="(.*?)")?(?: *?([\w-]*)="(.*?)")?(?: *?([\w-]*)="(.*?)")?(?: *?([\w-]*)="(.*?)")?.*,(.*)"#,
        )
        .expect("EXTINF attribute regex is valid");
        let group_prefix = Regex::new(r"^\w*").expect("group prefix regex is valid");
        Self {
            extinf_attrs,
            group_prefix,
        }
    }

    /// Parse a playlist, evaluating each finalized entry against the model
    /// engine. Returns retained, transformed entries in input order.
    pub fn parse(&self, content: &str, engine: &ModelEngine) -> Playlist {
        let mut playlist = Playlist::default();
        let mut fields = ChannelEntry::new();

        for line in content.lines() {
            if line.starts_with(HEADER_PREFIX) {
                if playlist.header.is_none() {
                    playlist.header = Some(format!("{line}\n"));
                }
            } else if line.starts_with(ENTRY_PREFIX) {
                // Metadata only attaches to an immediately-following stream
                // line; anything accumulated for an uncompleted entry goes.
                fields.remove(METADATA);
                self.parse_entry_header(line, &mut fields);
            } else if STREAM_SCHEMES.iter().any(|s| line.starts_with(s)) {
                fields.set(STREAM, line);
                let entry = std::mem::take(&mut fields);
                let has_name = entry.tvg_name().is_some_and(|name| !name.is_empty());
                if has_name {
                    if let Some(entry) = engine.evaluate(entry) {
                        playlist.entries.push(entry);
                    }
                } else {
                    debug!("Dropping entry without a resolvable name: {line}");
                }
            } else {
                fields.append_metadata(line);
            }
        }

        // An entry still in progress at end of input was never completed by
        // a stream line and is discarded.
        playlist
    }

    fn parse_entry_header(&self, line: &str, fields: &mut ChannelEntry) {
        let Some(caps) = self.extinf_attrs.captures(line) else {
            debug!("Abandoning malformed entry header: {line}");
            fields.clear();
            return;
        };

        for i in (1..=9).step_by(2) {
            if let (Some(key), Some(value)) = (caps.get(i), caps.get(i + 1)) {
                fields.set(key.as_str(), value.as_str());
            }
        }

        if fields.tvg_name().is_none() {
            if let Some(title) = caps.get(11) {
                fields.set(TVG_NAME, title.as_str().trim());
            }
        }
        // Compact playlists carry no group-title; derive one from the name
        if fields.get(GROUP_TITLE).is_none() {
            if let Some(name) = fields.tvg_name() {
                let group = self
                    .group_prefix
                    .find(name)
                    .map(|m| m.as_str().to_string())
                    .unwrap_or_default();
                fields.set(GROUP_TITLE, group);
            }
        }
    }
}
