//! Protocol-id map member: device index to protocol id.

use std::collections::HashMap;

use tracing::trace;

use crate::package::member_lines;

/// Parses `<description>:<hex protocol id>;<device index>` lines.
///
/// Only the text after the last `:` is considered. A protocol id that is not
/// valid hex becomes `0`; a line without a decimal device index is skipped.
/// Later lines for the same index win.
pub fn parse_protocol_ids(text: &str) -> HashMap<u32, u32> {
    let mut map = HashMap::new();

    for raw_line in member_lines(text) {
        let line = raw_line.trim();
        let data = line.rsplit_once(':').map_or(line, |(_, data)| data).trim();

        let mut segments = data.split(';');
        let protocol_id = segments.next().unwrap_or_default().trim();
        let Some(Ok(device_index)) = segments.next().map(|index| index.trim().parse::<u32>())
        else {
            continue;
        };

        let protocol_id = u32::from_str_radix(protocol_id, 16).unwrap_or(0);
        trace!("Protocol id entry: device {} -> {:X}", device_index, protocol_id);
        map.insert(device_index, protocol_id);
    }

    map
}
