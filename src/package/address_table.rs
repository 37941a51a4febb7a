//! Address map member: protocol id to network address.

use std::collections::HashMap;

use tracing::trace;

use crate::package::member_lines;

/// Parses `id<N>=<hex>` and `addr<N>=<address>` pairs.
///
/// `id<N>` registers protocol id `<hex>` under slot `N` with an empty
/// address. `addr<N>` fills in the address only when slot `N` was
/// registered earlier in the text.
pub fn parse_address_table(text: &str) -> HashMap<u32, String> {
    let mut addresses = HashMap::new();
    let mut slots: HashMap<u32, u32> = HashMap::new();

    for raw_line in member_lines(text) {
        let Some((key, value)) = raw_line.trim().split_once('=') else {
            continue;
        };
        let (key, value) = (key.trim(), value.trim());

        if let Some(slot) = key.strip_prefix("id") {
            if let Ok(slot) = slot.parse::<u32>()
                && let Ok(protocol_id) = u32::from_str_radix(value, 16)
            {
                addresses.insert(protocol_id, String::new());
                slots.insert(slot, protocol_id);
                trace!("Address slot {} registered for id {:X}", slot, protocol_id);
            }
        } else if let Some(slot) = key.strip_prefix("addr")
            && let Ok(slot) = slot.parse::<u32>()
            && let Some(protocol_id) = slots.get(&slot)
        {
            trace!("Address slot {} resolved to {}", slot, value);
            addresses.insert(*protocol_id, value.to_string());
        }
    }

    addresses
}
