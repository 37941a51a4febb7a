//! Compiled control-system package decoding.
//!
//! A package is a zip container whose companion members, named after the
//! package itself, describe the device roster, the device to protocol-id
//! assignments and the protocol-id to address table. This module
//! cross-references the three into a per-device report.

use std::{
    collections::HashMap,
    fs::File,
    io::{BufReader, Read, Seek},
    path::Path,
};

use {
    tracing::{debug, info},
    zip::{ZipArchive, result::ZipError},
};

use crate::error::domain::PackageError;

pub mod address_table;
pub mod models;
pub mod protocol_ids;
pub mod roster;

pub use {
    address_table::parse_address_table, models::Device, protocol_ids::parse_protocol_ids,
    roster::parse_roster,
};

/// Rendered in place of a report when the package cannot be cross-referenced.
pub const NO_TABLE_SENTINEL: &str = "No Table Available";

/// Companion member names for one package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberNames {
    /// Device roster, `<stem>.cloud`.
    pub roster: String,
    /// Protocol-id map, `<stem>.dsc`.
    pub protocol_ids: String,
    /// Address map, `<stem>.dip`.
    pub addresses: String,
}

impl MemberNames {
    /// Derives the member names from the package's own file name.
    pub fn for_package(path: &Path) -> Self {
        let stem = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default();

        Self {
            roster: format!("{stem}.cloud"),
            protocol_ids: format!("{stem}.dsc"),
            addresses: format!("{stem}.dip"),
        }
    }
}

/// Merged device list of one package.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PackageReport {
    /// Roster devices in group order, enriched with protocol id and address.
    pub devices: Vec<Device>,
}

impl PackageReport {
    /// Renders one line per device, each terminated by `\n`.
    pub fn render(&self) -> String {
        self.devices
            .iter()
            .map(|device| format!("{}\n", device.report_line()))
            .collect()
    }
}

/// Reads and cross-references the members of the package at `path`.
///
/// # Errors
///
/// Returns `PackageError` if the file cannot be opened, is not a zip
/// container, or lacks any of the three companion members.
pub fn load_report(path: &Path) -> Result<PackageReport, PackageError> {
    let names = MemberNames::for_package(path);
    let mut archive = ZipArchive::new(BufReader::new(File::open(path)?))?;

    let roster = read_member(&mut archive, &names.roster)?;
    let protocol_ids = read_member(&mut archive, &names.protocol_ids)?;
    let addresses = read_member(&mut archive, &names.addresses)?;

    Ok(parse_members(&roster, &protocol_ids, &addresses))
}

/// Renders the device report for the package at `path`.
///
/// Never fails: any problem opening the package or finding a member yields
/// [`NO_TABLE_SENTINEL`].
pub fn parse(path: &Path) -> String {
    match load_report(path) {
        Ok(report) => report.render(),
        Err(e) => {
            info!("No device table for {:?}: {}", path, e);
            NO_TABLE_SENTINEL.to_string()
        }
    }
}

/// Cross-references already-extracted member texts.
///
/// Each device gets its protocol id through its declared device index, then
/// its address through that protocol id. Missing lookups keep defaults.
pub fn parse_members(roster: &str, protocol_ids: &str, addresses: &str) -> PackageReport {
    let roster = parse_roster(roster);
    let protocol_ids = parse_protocol_ids(protocol_ids);
    let addresses = parse_address_table(addresses);

    let devices = roster
        .devices
        .into_iter()
        .map(|device| resolve_device(device, &protocol_ids, &addresses))
        .collect();

    PackageReport { devices }
}

fn resolve_device(
    mut device: Device,
    protocol_ids: &HashMap<u32, u32>,
    addresses: &HashMap<u32, String>,
) -> Device {
    if let Some(protocol_id) = protocol_ids.get(&device.device_index) {
        device.protocol_id = *protocol_id;
    }
    if let Some(address) = addresses.get(&device.protocol_id) {
        device.ip_address.clone_from(address);
    }

    debug!(
        "Resolved device {} ({}): index {}, id {:X}, address {:?}",
        device.name, device.comment, device.device_index, device.protocol_id, device.ip_address
    );
    device
}

fn read_member<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    name: &str,
) -> Result<String, PackageError> {
    let mut member = match archive.by_name(name) {
        Ok(member) => member,
        Err(ZipError::FileNotFound) => {
            return Err(PackageError::MissingMember {
                name: name.to_string(),
            });
        }
        Err(e) => return Err(e.into()),
    };

    let mut bytes = Vec::new();
    member.read_to_end(&mut bytes)?;
    Ok(decode_member_text(&bytes))
}

/// Splits member text into non-empty lines.
///
/// Members may use `\r\n`, `\n` or a bare `\r` as the line terminator.
pub fn member_lines(text: &str) -> impl Iterator<Item = &str> {
    text.split(['\r', '\n']).filter(|line| !line.is_empty())
}

/// Decodes member bytes as UTF-8, replacing invalid sequences and dropping
/// a leading byte order mark.
fn decode_member_text(bytes: &[u8]) -> String {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    String::from_utf8_lossy(bytes).into_owned()
}

#[cfg(test)]
mod tests {
    use std::{
        fs::{File, write},
        io::Write,
        path::{Path, PathBuf},
    };

    use {
        tempfile::TempDir,
        zip::{ZipWriter, write::SimpleFileOptions},
    };

    use crate::package::{
        MemberNames, NO_TABLE_SENTINEL, decode_member_text, load_report, member_lines, parse,
        parse_members,
    };

    const ROSTER: &str = "[CloudInfo]\r\nNumDevices=3\r\n\
        DeviceIndex1=7\r\nDeviceType1=1\r\nDeviceName1=TSW-770\r\nDeviceComment1=Boardroom\r\n\
        DeviceIndex3=8\r\nDeviceType3=2\r\nDeviceName3=DMPS\r\nDeviceComment3=Rack\r\n";
    const PROTOCOL_IDS: &str = "TSW-770: Boardroom:1A;7\r\nDMPS: Rack:03;8\r\n";
    const ADDRESSES: &str = "id1=1A\r\naddr1=10.0.0.5\r\nid2=03\r\n";

    fn write_package(dir: &Path, file_name: &str, members: &[(&str, &str)]) -> PathBuf {
        let path = dir.join(file_name);
        let mut writer = ZipWriter::new(File::create(&path).unwrap());
        for (name, content) in members {
            writer
                .start_file(*name, SimpleFileOptions::default())
                .unwrap();
            writer.write_all(content.as_bytes()).unwrap();
        }
        writer.finish().unwrap();
        path
    }

    #[test]
    fn test_member_names_follow_package_stem() {
        let names = MemberNames::for_package(Path::new("/srv/Room 1.v2.lpz"));
        assert_eq!(names.roster, "Room 1.v2.cloud");
        assert_eq!(names.protocol_ids, "Room 1.v2.dsc");
        assert_eq!(names.addresses, "Room 1.v2.dip");
    }

    #[test]
    fn test_parse_members_merges_in_roster_order() {
        let report = parse_members(ROSTER, PROTOCOL_IDS, ADDRESSES);

        assert_eq!(report.devices.len(), 2);
        assert_eq!(
            report.render(),
            "TSW-770: Boardroom @ IP ID: 1A [10.0.0.5]\nDMPS: Rack @ IP ID: 3 [Not Set!]\n"
        );
    }

    #[test]
    fn test_parse_members_leaves_unmatched_devices_at_defaults() {
        let report = parse_members("NumDevices=1\nDeviceIndex1=42\nDeviceName1=Orphan\n", "", "");

        assert_eq!(report.devices[0].protocol_id, 0);
        assert_eq!(report.render(), "Orphan:  @ IP ID: 0 [Not Set!]\n");
    }

    #[test]
    fn test_member_lines_accepts_every_terminator() {
        let lines: Vec<&str> = member_lines("a\r\nb\rc\n\nd").collect();
        assert_eq!(lines, vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn test_parse_members_with_carriage_return_terminators() {
        let report = parse_members(
            "NumDevices=1\rDeviceIndex1=7\rDeviceName1=Panel\rDeviceComment1=Hall\r",
            "Panel: Hall:1A;7\r",
            "id1=1A\raddr1=10.0.0.5\r",
        );
        assert_eq!(report.render(), "Panel: Hall @ IP ID: 1A [10.0.0.5]\n");
    }

    #[test]
    fn test_empty_roster_renders_empty_report() {
        assert_eq!(parse_members("NumDevices=0\n", PROTOCOL_IDS, ADDRESSES).render(), "");
    }

    #[test]
    fn test_parse_package_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = write_package(
            temp_dir.path(),
            "room.lpz",
            &[
                ("room.cloud", ROSTER),
                ("room.dsc", PROTOCOL_IDS),
                ("room.dip", ADDRESSES),
                ("room.smw", "ignored"),
            ],
        );

        let first = parse(&path);
        assert!(first.starts_with("TSW-770: Boardroom @ IP ID: 1A [10.0.0.5]\n"));
        assert_eq!(first.lines().count(), 2);
        // Rendering is stable for unchanged input.
        assert_eq!(parse(&path), first);
    }

    #[test]
    fn test_missing_member_yields_sentinel() {
        let temp_dir = TempDir::new().unwrap();
        let path = write_package(
            temp_dir.path(),
            "room.lpz",
            &[("room.cloud", ROSTER), ("room.dsc", PROTOCOL_IDS)],
        );

        assert_eq!(parse(&path), NO_TABLE_SENTINEL);
        assert!(load_report(&path).unwrap_err().to_string().contains("room.dip"));
    }

    #[test]
    fn test_roster_only_package_yields_sentinel() {
        let temp_dir = TempDir::new().unwrap();
        let path = write_package(temp_dir.path(), "room.lpz", &[("room.cloud", ROSTER)]);

        assert_eq!(parse(&path), NO_TABLE_SENTINEL);
        assert!(load_report(&path).unwrap_err().to_string().contains("room.dsc"));
    }

    #[test]
    fn test_members_of_another_package_are_not_used() {
        let temp_dir = TempDir::new().unwrap();
        let path = write_package(
            temp_dir.path(),
            "renamed.lpz",
            &[
                ("room.cloud", ROSTER),
                ("room.dsc", PROTOCOL_IDS),
                ("room.dip", ADDRESSES),
            ],
        );
        assert_eq!(parse(&path), NO_TABLE_SENTINEL);
    }

    #[test]
    fn test_unreadable_package_yields_sentinel() {
        let temp_dir = TempDir::new().unwrap();
        let not_zip = temp_dir.path().join("broken.lpz");
        write(&not_zip, "definitely not a zip").unwrap();

        assert_eq!(parse(&not_zip), NO_TABLE_SENTINEL);
        assert_eq!(parse(&temp_dir.path().join("absent.lpz")), NO_TABLE_SENTINEL);
    }

    #[test]
    fn test_decode_member_text_is_lenient() {
        assert_eq!(decode_member_text(b"\xEF\xBB\xBFNumDevices=1"), "NumDevices=1");
        assert_eq!(decode_member_text(b"Caf\xE9"), "Caf\u{FFFD}");
    }
}
