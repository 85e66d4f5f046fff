//! Streaming XMLTV guide filter
//!
//! Streams a guide document with quick-xml and re-emits only the channel
//! definitions whose id survives playlist filtering, and the programmes that
//! reference a surviving channel inside a rolling time window: start less
//! than 48 hours in the future, stop not more than 1 hour in the past.
//! Nodes other than `channel` and `programme` are copied through unexamined.
//!
//! "Now" is supplied by the caller so the window is testable; production
//! callers pass `Utc::now()`.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use quick_xml::Reader;
use quick_xml::Writer;
use quick_xml::events::{BytesStart, BytesText, Event};
use tracing::debug;

use crate::errors::{SourceError, SourceResult};

/// Fixed declaration and root-open emitted in place of the input's own
const GUIDE_PREAMBLE: &str =
    "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<!DOCTYPE tv SYSTEM \"xmltv.dtd\">\n<tv>\n";

const MAX_HOURS_AHEAD: f64 = 48.0;
const MAX_HOURS_PAST: f64 = -1.0;

/// Timestamp format: 14-digit local date-time plus a signed 4-digit UTC
/// offset, e.g. `20240101120000 +0000`
const TIMESTAMP_FORMAT: &str = "%Y%m%d%H%M%S %z";

/// Filter a guide document against an allow-list of channel identifiers,
/// returning the filtered document text.
pub fn filter_guide(
    content: &str,
    allowed: &HashSet<String>,
    now: DateTime<Utc>,
) -> SourceResult<String> {
    let mut reader = Reader::from_str(content);
    reader.config_mut().trim_text(true);
    let mut writer = Writer::new(Vec::new());
    let mut seen_root = false;

    loop {
        match reader.read_event()? {
            Event::Start(start) => {
                if !seen_root {
                    // The input's root-open is replaced by the fixed preamble
                    seen_root = true;
                    continue;
                }
                if retain_element(&start, allowed, now) {
                    copy_subtree(&mut reader, &mut writer, start)?;
                    writer.write_event(Event::Text(BytesText::new("\n")))?;
                } else {
                    reader.read_to_end(start.name())?;
                }
            }
            Event::Empty(empty) => {
                if seen_root && retain_element(&empty, allowed, now) {
                    writer.write_event(Event::Empty(empty))?;
                    writer.write_event(Event::Text(BytesText::new("\n")))?;
                }
            }
            // The only End reaching this loop is the root's; subtrees are
            // consumed whole above.
            Event::End(_) | Event::Eof => break,
            _ => {}
        }
    }

    let body = String::from_utf8_lossy(&writer.into_inner()).into_owned();
    Ok(format!("{GUIDE_PREAMBLE}{body}</tv>"))
}

fn retain_element(
    element: &BytesStart<'_>,
    allowed: &HashSet<String>,
    now: DateTime<Utc>,
) -> bool {
    match element.name().as_ref() {
        b"channel" => {
            let attrs = parse_attributes(element);
            attrs
                .get("id")
                .is_some_and(|id| !id.is_empty() && allowed.contains(id))
        }
        b"programme" => programme_retained(&parse_attributes(element), allowed, now),
        // Not a channel or programme node: passed through untouched
        _ => true,
    }
}

fn programme_retained(
    attrs: &HashMap<String, String>,
    allowed: &HashSet<String>,
    now: DateTime<Utc>,
) -> bool {
    if !attrs
        .get("channel")
        .is_some_and(|channel| allowed.contains(channel))
    {
        return false;
    }

    let (Some(start), Some(stop)) = (attrs.get("start"), attrs.get("stop")) else {
        debug!("Programme without start/stop excluded");
        return false;
    };

    match (hours_from_now(start, now), hours_from_now(stop, now)) {
        (Some(start_hours), Some(stop_hours)) => {
            start_hours < MAX_HOURS_AHEAD && stop_hours >= MAX_HOURS_PAST
        }
        _ => {
            // Unparseable time data fails closed
            debug!("Programme with unparseable timestamps excluded: start={start} stop={stop}");
            false
        }
    }
}

/// Signed fractional hours between a guide timestamp and `now`
fn hours_from_now(timestamp: &str, now: DateTime<Utc>) -> Option<f64> {
    let parsed = DateTime::parse_from_str(timestamp, TIMESTAMP_FORMAT).ok()?;
    Some((parsed.with_timezone(&Utc) - now).num_seconds() as f64 / 3600.0)
}

/// Copy a retained element and everything inside it to the writer
fn copy_subtree<'a>(
    reader: &mut Reader<&'a [u8]>,
    writer: &mut Writer<Vec<u8>>,
    start: BytesStart<'a>,
) -> SourceResult<()> {
    writer.write_event(Event::Start(start))?;
    let mut depth = 1usize;
    while depth > 0 {
        let event = reader.read_event()?;
        match event {
            Event::Start(_) => depth += 1,
            Event::End(_) => depth -= 1,
            Event::Eof => {
                return Err(SourceError::malformed_guide(
                    "unexpected end of document inside element",
                ));
            }
            _ => {}
        }
        writer.write_event(event)?;
    }
    Ok(())
}

fn parse_attributes(element: &BytesStart<'_>) -> HashMap<String, String> {
    let mut attrs = HashMap::new();
    for attr in element.attributes().flatten() {
        attrs.insert(
            String::from_utf8_lossy(attr.key.as_ref()).into_owned(),
            String::from_utf8_lossy(&attr.value).into_owned(),
        );
    }
    attrs
}
