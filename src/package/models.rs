//! Device records reconstructed from a compiled package.

/// One device from the package roster, enriched with its network identity.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Device {
    /// Index declared by the roster's `DeviceIndex` field.
    pub device_index: u32,
    /// Numeric device type.
    pub device_type: u32,
    /// Device name.
    pub name: String,
    /// Free-form comment, usually the room or role.
    pub comment: String,
    /// Protocol id; zero when unresolved.
    pub protocol_id: u32,
    /// Network address; empty when unresolved.
    pub ip_address: String,
}

impl Device {
    /// Renders the device as one report line, without a line break.
    pub fn report_line(&self) -> String {
        let address = if self.ip_address.is_empty() {
            "Not Set!"
        } else {
            self.ip_address.as_str()
        };
        format!(
            "{}: {} @ IP ID: {:X} [{}]",
            self.name, self.comment, self.protocol_id, address
        )
    }
}
