//! Device roster member: grouped `<Field><index>=<value>` lines.

use std::{collections::BTreeMap, sync::LazyLock};

use {regex::Regex, tracing::trace};

use crate::package::{member_lines, models::Device};

/// Matches one repeated-group roster field.
static FIELD_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(DeviceIndex|DeviceType|DeviceName|DeviceComment)(\d+)=(.*)$")
        .expect("roster field pattern is valid")
});

const DEVICE_COUNT_KEY: &str = "numdevices=";

/// Parsed roster contents.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceRoster {
    /// Value of `NumDevices`, an upper bound on the group numbers emitted.
    pub declared_count: u32,
    /// Devices in group order, gaps skipped.
    pub devices: Vec<Device>,
}

/// Parses the roster text.
///
/// Blank lines and `[section]` headers are ignored. Numeric fields that
/// fail to parse keep their zero default. Only groups `1..=NumDevices`
/// that actually appear are returned, in ascending order.
pub fn parse_roster(text: &str) -> DeviceRoster {
    let mut declared_count = 0;
    let mut groups: BTreeMap<u32, Device> = BTreeMap::new();

    for raw_line in member_lines(text) {
        let line = raw_line.trim();
        if line.is_empty() || line.starts_with('[') {
            continue;
        }

        if line
            .get(..DEVICE_COUNT_KEY.len())
            .is_some_and(|key| key.eq_ignore_ascii_case(DEVICE_COUNT_KEY))
        {
            declared_count = line
                .split('=')
                .nth(1)
                .and_then(|count| count.trim().parse().ok())
                .unwrap_or(0);
            continue;
        }

        let Some(captures) = FIELD_PATTERN.captures(line) else {
            continue;
        };
        let Ok(group) = captures[2].parse::<u32>() else {
            trace!("Skipping roster line with oversized group number: {}", line);
            continue;
        };
        let value = captures[3].trim();
        let device = groups.entry(group).or_default();

        match &captures[1] {
            "DeviceIndex" => device.device_index = value.parse().unwrap_or(0),
            "DeviceType" => device.device_type = value.parse().unwrap_or(0),
            "DeviceName" => device.name = value.to_string(),
            "DeviceComment" => device.comment = value.to_string(),
            _ => {}
        }
    }

    let devices = if declared_count == 0 {
        Vec::new()
    } else {
        groups
            .range(1..=declared_count)
            .map(|(_, device)| device.clone())
            .collect()
    };

    DeviceRoster {
        declared_count,
        devices,
    }
}
