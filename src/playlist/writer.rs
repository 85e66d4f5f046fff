//! M3U serializer
//!
//! A pure serializer: no filtering or transformation happens here. The
//! header is reproduced verbatim, then each entry becomes an EXTINF line
//! carrying the recognized attributes that are present, its metadata block,
//! and its stream line.

use crate::models::{GROUP_TITLE, METADATA, Playlist, STREAM, TVG_ID, TVG_LOGO, TVG_NAME};

/// Attributes emitted conditionally, in this order; group-title is always
/// emitted (it may have been synthesized by the parser)
const OPTIONAL_ATTRS: [&str; 3] = [TVG_ID, TVG_NAME, TVG_LOGO];

pub fn write_playlist(playlist: &Playlist) -> String {
    let mut out = String::new();
    if let Some(header) = &playlist.header {
        out.push_str(header);
    }

    for entry in &playlist.entries {
        out.push_str("#EXTINF:-1");
        for field in OPTIONAL_ATTRS {
            if let Some(value) = entry.get(field) {
                out.push_str(&format!(" {field}=\"{value}\""));
            }
        }
        out.push_str(&format!(
            " group-title=\"{}\",{}\n",
            entry.get(GROUP_TITLE).unwrap_or_default(),
            entry.get(TVG_NAME).unwrap_or_default()
        ));
        if let Some(metadata) = entry.get(METADATA) {
            // Metadata already carries its line breaks
            out.push_str(metadata);
        }
        out.push_str(entry.get(STREAM).unwrap_or_default());
        out.push('\n');
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ChannelEntry;

    fn entry(pairs: &[(&str, &str)]) -> ChannelEntry {
        let mut entry = ChannelEntry::new();
        for (field, value) in pairs {
            entry.set(*field, *value);
        }
        entry
    }

    #[test]
    fn writes_header_and_full_entry() {
        let playlist = Playlist {
            header: Some("#EXTM3U\n".to_string()),
            entries: vec![entry(&[
                (TVG_ID, "1"),
                (TVG_NAME, "News"),
                (TVG_LOGO, "http://l/n.png"),
                (GROUP_TITLE, "Info"),
                (STREAM, "http://example/news"),
            ])],
        };
        assert_eq!(
            write_playlist(&playlist),
            "#EXTM3U\n#EXTINF:-1 tvg-id=\"1\" tvg-name=\"News\" tvg-logo=\"http://l/n.png\" group-title=\"Info\",News\nhttp://example/news\n"
        );
    }

    #[test]
    fn absent_attributes_are_omitted_but_group_title_is_not() {
        let playlist = Playlist {
            header: None,
            entries: vec![entry(&[
                (TVG_NAME, "News"),
                (GROUP_TITLE, "News"),
                (STREAM, "http://example/news"),
            ])],
        };
        assert_eq!(
            write_playlist(&playlist),
            "#EXTINF:-1 tvg-name=\"News\" group-title=\"News\",News\nhttp://example/news\n"
        );
    }

    #[test]
    fn metadata_block_precedes_the_stream_line() {
        let playlist = Playlist {
            header: None,
            entries: vec![entry(&[
                (TVG_NAME, "News"),
                (GROUP_TITLE, "News"),
                (METADATA, "#EXTVLCOPT:foo\n"),
                (STREAM, "http://example/news"),
            ])],
        };
        assert_eq!(
            write_playlist(&playlist),
            "#EXTINF:-1 tvg-name=\"News\" group-title=\"News\",News\n#EXTVLCOPT:foo\nhttp://example/news\n"
        );
    }
}
