use rusticata_macros::newtype_enum;

/// Maximum snapshot length for most link types, in bytes
pub const MAX_PACKET_SIZE_STANDARD: u32 = 262_144;
/// Maximum snapshot length for D-Bus captures, in bytes
///
/// D-Bus messages can be up to 128 MiB; no other link type comes close.
pub const MAX_PACKET_SIZE_DBUS: u32 = 128 * 1024 * 1024;

/// Data link type
///
/// The link-layer header type specifies the type of headers at the beginning
/// of the packet.
///
/// See [http://www.tcpdump.org/linktypes.html](http://www.tcpdump.org/linktypes.html)
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Linktype(pub i32);

newtype_enum! {
impl display Linktype {
    NULL = 0,
    ETHERNET = 1,

    FDDI = 10,

    RAW = 101,

    LOOP = 108,
    LINUX_SLL = 113,

    // Raw IPv4; the packet begins with an IPv4 header.
    IPV4 = 228,
    // Raw IPv6; the packet begins with an IPv6 header.
    IPV6 = 229,

    // D-Bus messages.
    DBUS = 231,

    // Linux netlink NETLINK NFLOG socket log messages.
    NFLOG = 239,

    USBPCAP = 249,
}
}

impl Linktype {
    /// The largest captured length a conforming reader accepts for this
    /// link type. Packet blocks declaring more are malformed.
    pub fn max_snap_len(self) -> u32 {
        match self {
            Linktype::DBUS => MAX_PACKET_SIZE_DBUS,
            _ => MAX_PACKET_SIZE_STANDARD,
        }
    }

    /// Returns true if the value fits the 16-bit link type field of an
    /// Interface Description Block
    pub fn has_wire_mapping(self) -> bool {
        self.0 >= 0 && self.0 <= i32::from(u16::MAX)
    }
}
