//! L2CAP signalling commands on the ACL-U signalling channel
//!
//! This module encodes and decodes the classic signalling commands used to
//! set up, configure and tear down dynamic channels, plus the echo and
//! information exchanges every link must answer.

use super::constants::*;
use super::psm::Psm;
use super::types::*;
use byteorder::{LittleEndian, ReadBytesExt};
use std::io::Cursor;

/// Identifier matching a signalling response to its request
pub type SignalId = u8;

/// Header in front of every signalling command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct L2capCommandHeader {
    /// Command code
    pub code: u8,
    /// Command identifier
    pub identifier: SignalId,
    /// Length of command parameters
    pub length: u16,
}

impl L2capCommandHeader {
    /// Parse a command header from raw bytes
    pub fn parse(data: &[u8]) -> Option<Self> {
        if data.len() < L2CAP_COMMAND_HEADER_SIZE {
            return None;
        }

        let mut cursor = Cursor::new(&data[2..4]);
        let length = cursor.read_u16::<LittleEndian>().ok()?;

        Some(Self {
            code: data[0],
            identifier: data[1],
            length,
        })
    }

    /// Serialize the command header to bytes
    pub fn to_bytes(&self) -> [u8; L2CAP_COMMAND_HEADER_SIZE] {
        let length = self.length.to_le_bytes();
        [self.code, self.identifier, length[0], length[1]]
    }
}

/// Classic L2CAP signalling command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignalingMessage {
    CommandReject {
        identifier: SignalId,
        reason: u16,
        data: Vec<u8>,
    },

    ConnectionRequest {
        identifier: SignalId,
        psm: Psm,
        source_cid: ChannelId,
    },

    ConnectionResponse {
        identifier: SignalId,
        destination_cid: ChannelId,
        source_cid: ChannelId,
        result: ConnectionResponseResult,
        status: u16,
    },

    ConfigureRequest {
        identifier: SignalId,
        destination_cid: ChannelId,
        flags: u16,
        options: ConfigOptions,
    },

    ConfigureResponse {
        identifier: SignalId,
        source_cid: ChannelId,
        flags: u16,
        result: u16,
        options: ConfigOptions,
    },

    DisconnectionRequest {
        identifier: SignalId,
        destination_cid: ChannelId,
        source_cid: ChannelId,
    },

    DisconnectionResponse {
        identifier: SignalId,
        destination_cid: ChannelId,
        source_cid: ChannelId,
    },

    EchoRequest {
        identifier: SignalId,
        data: Vec<u8>,
    },

    EchoResponse {
        identifier: SignalId,
        data: Vec<u8>,
    },

    InformationRequest {
        identifier: SignalId,
        info_type: u16,
    },

    InformationResponse {
        identifier: SignalId,
        info_type: u16,
        result: u16,
        data: Vec<u8>,
    },
}

impl SignalingMessage {
    /// Get the command code for this signaling message
    pub fn command_code(&self) -> u8 {
        match self {
            Self::CommandReject { .. } => L2CAP_COMMAND_REJECT,
            Self::ConnectionRequest { .. } => L2CAP_CONNECTION_REQUEST,
            Self::ConnectionResponse { .. } => L2CAP_CONNECTION_RESPONSE,
            Self::ConfigureRequest { .. } => L2CAP_CONFIGURE_REQUEST,
            Self::ConfigureResponse { .. } => L2CAP_CONFIGURE_RESPONSE,
            Self::DisconnectionRequest { .. } => L2CAP_DISCONNECTION_REQUEST,
            Self::DisconnectionResponse { .. } => L2CAP_DISCONNECTION_RESPONSE,
            Self::EchoRequest { .. } => L2CAP_ECHO_REQUEST,
            Self::EchoResponse { .. } => L2CAP_ECHO_RESPONSE,
            Self::InformationRequest { .. } => L2CAP_INFORMATION_REQUEST,
            Self::InformationResponse { .. } => L2CAP_INFORMATION_RESPONSE,
        }
    }

    /// Get the identifier for this signaling message
    pub fn identifier(&self) -> SignalId {
        match self {
            Self::CommandReject { identifier, .. }
            | Self::ConnectionRequest { identifier, .. }
            | Self::ConnectionResponse { identifier, .. }
            | Self::ConfigureRequest { identifier, .. }
            | Self::ConfigureResponse { identifier, .. }
            | Self::DisconnectionRequest { identifier, .. }
            | Self::DisconnectionResponse { identifier, .. }
            | Self::EchoRequest { identifier, .. }
            | Self::EchoResponse { identifier, .. }
            | Self::InformationRequest { identifier, .. }
            | Self::InformationResponse { identifier, .. } => *identifier,
        }
    }

    /// Whether this command expects a response from the peer
    pub fn is_request(&self) -> bool {
        matches!(
            self,
            Self::ConnectionRequest { .. }
                | Self::ConfigureRequest { .. }
                | Self::DisconnectionRequest { .. }
                | Self::EchoRequest { .. }
                | Self::InformationRequest { .. }
        )
    }

    /// Serialize the command, header included
    pub fn serialize(&self) -> Vec<u8> {
        let params = match self {
            Self::CommandReject { reason, data, .. } => {
                let mut params = Vec::with_capacity(2 + data.len());
                params.extend_from_slice(&reason.to_le_bytes());
                params.extend_from_slice(data);
                params
            }

            Self::ConnectionRequest {
                psm, source_cid, ..
            } => {
                let mut params = Vec::with_capacity(4);
                params.extend_from_slice(&psm.value().to_le_bytes());
                params.extend_from_slice(&source_cid.to_le_bytes());
                params
            }

            Self::ConnectionResponse {
                destination_cid,
                source_cid,
                result,
                status,
                ..
            } => {
                let mut params = Vec::with_capacity(8);
                params.extend_from_slice(&destination_cid.to_le_bytes());
                params.extend_from_slice(&source_cid.to_le_bytes());
                params.extend_from_slice(&u16::from(*result).to_le_bytes());
                params.extend_from_slice(&status.to_le_bytes());
                params
            }

            Self::ConfigureRequest {
                destination_cid,
                flags,
                options,
                ..
            } => {
                let mut params = Vec::with_capacity(8);
                params.extend_from_slice(&destination_cid.to_le_bytes());
                params.extend_from_slice(&flags.to_le_bytes());
                serialize_config_options(options, &mut params);
                params
            }

            Self::ConfigureResponse {
                source_cid,
                flags,
                result,
                options,
                ..
            } => {
                let mut params = Vec::with_capacity(10);
                params.extend_from_slice(&source_cid.to_le_bytes());
                params.extend_from_slice(&flags.to_le_bytes());
                params.extend_from_slice(&result.to_le_bytes());
                serialize_config_options(options, &mut params);
                params
            }

            Self::DisconnectionRequest {
                destination_cid,
                source_cid,
                ..
            }
            | Self::DisconnectionResponse {
                destination_cid,
                source_cid,
                ..
            } => {
                let mut params = Vec::with_capacity(4);
                params.extend_from_slice(&destination_cid.to_le_bytes());
                params.extend_from_slice(&source_cid.to_le_bytes());
                params
            }

            Self::EchoRequest { data, .. } | Self::EchoResponse { data, .. } => data.clone(),

            Self::InformationRequest { info_type, .. } => info_type.to_le_bytes().to_vec(),

            Self::InformationResponse {
                info_type,
                result,
                data,
                ..
            } => {
                let mut params = Vec::with_capacity(4 + data.len());
                params.extend_from_slice(&info_type.to_le_bytes());
                params.extend_from_slice(&result.to_le_bytes());
                params.extend_from_slice(data);
                params
            }
        };

        let header = L2capCommandHeader {
            code: self.command_code(),
            identifier: self.identifier(),
            length: params.len() as u16,
        };

        let mut result = Vec::with_capacity(L2CAP_COMMAND_HEADER_SIZE + params.len());
        result.extend_from_slice(&header.to_bytes());
        result.extend_from_slice(&params);
        result
    }

    /// Parse every command in a signalling channel payload.
    ///
    /// A single C-frame may carry several commands back to back. Parsing
    /// stops at the first header that cannot be read.
    pub fn parse_frame(data: &[u8]) -> Vec<L2capResult<Self>> {
        let mut commands = Vec::new();
        let mut offset = 0;

        while let Some(header) = L2capCommandHeader::parse(&data[offset..]) {
            let end = offset + L2CAP_COMMAND_HEADER_SIZE + header.length as usize;
            if end > data.len() {
                commands.push(Err(L2capError::InvalidParameter(
                    "Command parameters too short".into(),
                )));
                break;
            }
            commands.push(Self::parse(&data[offset..end]));
            offset = end;
        }

        commands
    }

    /// Parse a single signalling command from raw bytes
    pub fn parse(data: &[u8]) -> L2capResult<Self> {
        let header = L2capCommandHeader::parse(data)
            .ok_or_else(|| L2capError::InvalidParameter("Signaling data too short".into()))?;

        let params = &data[L2CAP_COMMAND_HEADER_SIZE..];
        if params.len() < header.length as usize {
            return Err(L2capError::InvalidParameter(
                "Command parameters too short".into(),
            ));
        }
        let params = &params[..header.length as usize];
        let identifier = header.identifier;
        let mut cursor = Cursor::new(params);

        let message = match header.code {
            L2CAP_COMMAND_REJECT => {
                let reason = read_u16(&mut cursor, "reason")?;
                Self::CommandReject {
                    identifier,
                    reason,
                    data: params[2..].to_vec(),
                }
            }

            L2CAP_CONNECTION_REQUEST => Self::ConnectionRequest {
                identifier,
                psm: Psm::new(read_u16(&mut cursor, "PSM")?),
                source_cid: read_u16(&mut cursor, "source CID")?,
            },

            L2CAP_CONNECTION_RESPONSE => Self::ConnectionResponse {
                identifier,
                destination_cid: read_u16(&mut cursor, "destination CID")?,
                source_cid: read_u16(&mut cursor, "source CID")?,
                result: ConnectionResponseResult::from(read_u16(&mut cursor, "result")?),
                status: read_u16(&mut cursor, "status")?,
            },

            L2CAP_CONFIGURE_REQUEST => {
                let destination_cid = read_u16(&mut cursor, "destination CID")?;
                let flags = read_u16(&mut cursor, "flags")?;
                Self::ConfigureRequest {
                    identifier,
                    destination_cid,
                    flags,
                    options: parse_config_options(&params[4..]),
                }
            }

            L2CAP_CONFIGURE_RESPONSE => {
                let source_cid = read_u16(&mut cursor, "source CID")?;
                let flags = read_u16(&mut cursor, "flags")?;
                let result = read_u16(&mut cursor, "result")?;
                Self::ConfigureResponse {
                    identifier,
                    source_cid,
                    flags,
                    result,
                    options: parse_config_options(&params[6..]),
                }
            }

            L2CAP_DISCONNECTION_REQUEST => Self::DisconnectionRequest {
                identifier,
                destination_cid: read_u16(&mut cursor, "destination CID")?,
                source_cid: read_u16(&mut cursor, "source CID")?,
            },

            L2CAP_DISCONNECTION_RESPONSE => Self::DisconnectionResponse {
                identifier,
                destination_cid: read_u16(&mut cursor, "destination CID")?,
                source_cid: read_u16(&mut cursor, "source CID")?,
            },

            L2CAP_ECHO_REQUEST => Self::EchoRequest {
                identifier,
                data: params.to_vec(),
            },

            L2CAP_ECHO_RESPONSE => Self::EchoResponse {
                identifier,
                data: params.to_vec(),
            },

            L2CAP_INFORMATION_REQUEST => Self::InformationRequest {
                identifier,
                info_type: read_u16(&mut cursor, "info type")?,
            },

            L2CAP_INFORMATION_RESPONSE => {
                let info_type = read_u16(&mut cursor, "info type")?;
                let result = read_u16(&mut cursor, "result")?;
                Self::InformationResponse {
                    identifier,
                    info_type,
                    result,
                    data: params[4..].to_vec(),
                }
            }

            code => return Err(L2capError::UnknownCommand { identifier, code }),
        };

        Ok(message)
    }
}

fn read_u16(cursor: &mut Cursor<&[u8]>, field: &str) -> L2capResult<u16> {
    cursor
        .read_u16::<LittleEndian>()
        .map_err(|_| L2capError::InvalidParameter(format!("Failed to read {}", field)))
}

/// Parse configuration options from raw bytes
fn parse_config_options(data: &[u8]) -> ConfigOptions {
    let mut options = ConfigOptions::default();
    let mut offset = 0;

    while offset + 2 <= data.len() {
        let option_type = data[offset] & !L2CAP_CONF_HINT_MASK;
        let option_length = data[offset + 1] as usize;

        if offset + 2 + option_length > data.len() {
            break;
        }

        let mut cursor = Cursor::new(&data[offset + 2..offset + 2 + option_length]);
        match (option_type, option_length) {
            (L2CAP_CONF_MTU, 2) => {
                options.mtu = cursor.read_u16::<LittleEndian>().ok();
            }
            (L2CAP_CONF_FLUSH_TIMEOUT, 2) => {
                options.flush_timeout = cursor.read_u16::<LittleEndian>().ok();
            }
            _ => {}
        }

        offset += 2 + option_length;
    }

    options
}

/// Serialize configuration options to bytes
fn serialize_config_options(options: &ConfigOptions, out: &mut Vec<u8>) {
    if let Some(mtu) = options.mtu {
        out.push(L2CAP_CONF_MTU);
        out.push(2);
        out.extend_from_slice(&mtu.to_le_bytes());
    }

    if let Some(timeout) = options.flush_timeout {
        out.push(L2CAP_CONF_FLUSH_TIMEOUT);
        out.push(2);
        out.extend_from_slice(&timeout.to_le_bytes());
    }
}
