//! Protocol/Service Multiplexer (PSM) handling for L2CAP
//!
//! A PSM names the upper-layer service a dynamic channel connects to.

use std::fmt;

/// Protocol/Service Multiplexer value.
///
/// See Bluetooth Core Specification Vol 3, Part A, Section 4.2, and the
/// assigned numbers for logical link control.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Psm(u16);

impl Psm {
    /// Service Discovery Protocol
    pub const SDP: Psm = Psm(0x0001);
    /// RFCOMM protocol
    pub const RFCOMM: Psm = Psm(0x0003);
    /// Telephony Control Protocol
    pub const TCS_BIN: Psm = Psm(0x0005);
    /// TCS_BIN_CORDLESS
    pub const TCS_BIN_CORDLESS: Psm = Psm(0x0007);
    /// BNEP protocol
    pub const BNEP: Psm = Psm(0x000F);
    /// HID Control
    pub const HID_CONTROL: Psm = Psm(0x0011);
    /// HID Interrupt
    pub const HID_INTERRUPT: Psm = Psm(0x0013);
    /// UPnP protocol (ESDP)
    pub const UPNP: Psm = Psm(0x0015);
    /// AVCTP protocol
    pub const AVCTP: Psm = Psm(0x0017);
    /// AVDTP protocol
    pub const AVDTP: Psm = Psm(0x0019);
    /// AVCTP Browsing
    pub const AVCTP_BROWSING: Psm = Psm(0x001B);
    /// ATT over BR/EDR
    pub const ATT: Psm = Psm(0x001F);
    /// 3DSP protocol
    pub const _3DSP: Psm = Psm(0x0021);

    /// First value of the dynamically assigned range
    pub const DYNAMIC_MIN: u16 = 0x1001;

    pub const fn new(value: u16) -> Self {
        Psm(value)
    }

    /// Check if the PSM is valid.
    ///
    /// The least significant octet must be odd and the least significant
    /// bit of the most significant octet must be zero.
    pub fn is_valid(&self) -> bool {
        self.0 & 0x0101 == 0x0001
    }

    /// Whether the value falls in the dynamically assigned range
    pub fn is_dynamic(&self) -> bool {
        self.0 >= Self::DYNAMIC_MIN
    }

    /// Get the PSM value as u16
    pub fn value(&self) -> u16 {
        self.0
    }

    /// Try to create a valid PSM from a u16 value
    pub fn from_value(value: u16) -> Option<Self> {
        let psm = Psm(value);
        if psm.is_valid() {
            Some(psm)
        } else {
            None
        }
    }

    fn name(&self) -> Option<&'static str> {
        let name = match *self {
            Psm::SDP => "SDP",
            Psm::RFCOMM => "RFCOMM",
            Psm::TCS_BIN => "TCS-BIN",
            Psm::TCS_BIN_CORDLESS => "TCS-BIN-CORDLESS",
            Psm::BNEP => "BNEP",
            Psm::HID_CONTROL => "HID-Control",
            Psm::HID_INTERRUPT => "HID-Interrupt",
            Psm::UPNP => "UPnP",
            Psm::AVCTP => "AVCTP",
            Psm::AVDTP => "AVDTP",
            Psm::AVCTP_BROWSING => "AVCTP-Browsing",
            Psm::ATT => "ATT",
            Psm::_3DSP => "3DSP",
            _ => return None,
        };
        Some(name)
    }
}

impl fmt::Display for Psm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => write!(f, "{} (0x{:04X})", name, self.0),
            None if self.is_dynamic() => write!(f, "Dynamic PSM (0x{:04X})", self.0),
            None => write!(f, "PSM (0x{:04X})", self.0),
        }
    }
}

impl From<Psm> for u16 {
    fn from(psm: Psm) -> Self {
        psm.0
    }
}
