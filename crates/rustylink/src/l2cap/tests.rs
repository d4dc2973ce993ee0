//! Tests for the L2CAP signalling codec and PSM handling

use super::constants::*;
use super::psm::Psm;
use super::signaling::{L2capCommandHeader, SignalingMessage};
use super::types::*;

#[test]
fn test_psm_validity() {
    assert!(Psm::SDP.is_valid());
    assert!(Psm::RFCOMM.is_valid());
    assert!(Psm::new(0x1001).is_valid());
    assert!(Psm::new(0x1001).is_dynamic());
    assert!(!Psm::RFCOMM.is_dynamic());

    // LSB of the low octet must be 1, LSB of the high octet must be 0
    assert!(!Psm::new(0x0002).is_valid());
    assert!(!Psm::new(0x0101).is_valid());
    assert_eq!(Psm::from_value(0x0003), Some(Psm::RFCOMM));
    assert_eq!(Psm::from_value(0x0100), None);
}

#[test]
fn test_psm_display() {
    assert_eq!(Psm::SDP.to_string(), "SDP (0x0001)");
    assert_eq!(Psm::new(0x1003).to_string(), "Dynamic PSM (0x1003)");
    assert_eq!(Psm::new(0x0025).to_string(), "PSM (0x0025)");
    assert_eq!(u16::from(Psm::AVDTP), 0x0019);
}

#[test]
fn test_command_header() {
    let header = L2capCommandHeader {
        code: L2CAP_ECHO_REQUEST,
        identifier: 0x12,
        length: 0x0304,
    };
    let bytes = header.to_bytes();
    assert_eq!(bytes, [0x08, 0x12, 0x04, 0x03]);
    assert_eq!(L2capCommandHeader::parse(&bytes), Some(header));
    assert_eq!(L2capCommandHeader::parse(&bytes[..3]), None);
}

#[test]
fn test_connection_request_encoding() {
    let request = SignalingMessage::ConnectionRequest {
        identifier: 1,
        psm: Psm::RFCOMM,
        source_cid: 0x0040,
    };
    let bytes = request.serialize();
    assert_eq!(bytes, vec![0x02, 0x01, 0x04, 0x00, 0x03, 0x00, 0x40, 0x00]);
    assert_eq!(SignalingMessage::parse(&bytes), Ok(request));
}

#[test]
fn test_connection_response_decoding() {
    let bytes = [
        0x03, 0x07, 0x08, 0x00, // header
        0x41, 0x00, 0x40, 0x00, // destination, source
        0x02, 0x00, 0x00, 0x00, // PSM not supported, no status
    ];
    assert_eq!(
        SignalingMessage::parse(&bytes),
        Ok(SignalingMessage::ConnectionResponse {
            identifier: 7,
            destination_cid: 0x0041,
            source_cid: 0x0040,
            result: ConnectionResponseResult::PsmNotSupported,
            status: 0,
        })
    );
}

#[test]
fn test_configure_request_options() {
    let request = SignalingMessage::ConfigureRequest {
        identifier: 2,
        destination_cid: 0x0041,
        flags: 0,
        options: ConfigOptions {
            mtu: Some(672),
            flush_timeout: Some(0xFFFF),
        },
    };
    let bytes = request.serialize();
    assert_eq!(
        bytes,
        vec![
            0x04, 0x02, 0x0C, 0x00, 0x41, 0x00, 0x00, 0x00, 0x01, 0x02, 0xA0, 0x02, 0x02, 0x02,
            0xFF, 0xFF,
        ]
    );
    assert_eq!(SignalingMessage::parse(&bytes), Ok(request));
}

#[test]
fn test_unknown_options_are_skipped() {
    let bytes = [
        0x04, 0x03, 0x0C, 0x00, 0x40, 0x00, 0x00, 0x00, // header, destination, flags
        0x84, 0x02, 0x00, 0x00, // hinted unknown option
        0x01, 0x02, 0x00, 0x01, // MTU 256
    ];
    match SignalingMessage::parse(&bytes) {
        Ok(SignalingMessage::ConfigureRequest { options, .. }) => {
            assert_eq!(options.mtu, Some(256));
            assert_eq!(options.flush_timeout, None);
        }
        other => panic!("unexpected parse result {:?}", other),
    }
}

#[test]
fn test_parse_errors() {
    assert!(matches!(
        SignalingMessage::parse(&[0x02, 0x01]),
        Err(L2capError::InvalidParameter(_))
    ));
    assert!(matches!(
        SignalingMessage::parse(&[0x02, 0x01, 0x04, 0x00, 0x01, 0x00]),
        Err(L2capError::InvalidParameter(_))
    ));
    assert_eq!(
        SignalingMessage::parse(&[0x30, 0x05, 0x00, 0x00]),
        Err(L2capError::UnknownCommand {
            identifier: 5,
            code: 0x30
        })
    );
}

#[test]
fn test_parse_frame_with_several_commands() {
    let mut frame = SignalingMessage::EchoRequest {
        identifier: 1,
        data: vec![0xAA],
    }
    .serialize();
    frame.extend(
        SignalingMessage::InformationRequest {
            identifier: 2,
            info_type: L2CAP_INFO_EXTENDED_FEATURES,
        }
        .serialize(),
    );
    frame.extend([0x0A, 0x03, 0x08, 0x00]);

    let commands = SignalingMessage::parse_frame(&frame);
    assert_eq!(commands.len(), 3);
    assert_eq!(commands[0].as_ref().map(|c| c.identifier()), Ok(1));
    assert_eq!(
        commands[1],
        Ok(SignalingMessage::InformationRequest {
            identifier: 2,
            info_type: L2CAP_INFO_EXTENDED_FEATURES,
        })
    );
    assert!(commands[2].is_err());
}

#[test]
fn test_request_classification() {
    let request = SignalingMessage::DisconnectionRequest {
        identifier: 4,
        destination_cid: 0x0040,
        source_cid: 0x0041,
    };
    let response = SignalingMessage::DisconnectionResponse {
        identifier: 4,
        destination_cid: 0x0040,
        source_cid: 0x0041,
    };
    assert!(request.is_request());
    assert!(!response.is_request());
    assert_eq!(request.command_code(), L2CAP_DISCONNECTION_REQUEST);
    assert_eq!(response.command_code(), L2CAP_DISCONNECTION_RESPONSE);
}

#[test]
fn test_fixed_channel_mask() {
    assert_eq!(
        FixedChannelsSupported::for_cid(L2CAP_BR_EDR_SECURITY_MANAGER_CID),
        FixedChannelsSupported::BR_EDR_SECURITY_MANAGER
    );
    assert_eq!(FixedChannelsSupported::for_cid(0x0040), FixedChannelsSupported::empty());
}

#[test]
fn test_connection_result_codes() {
    assert_eq!(
        ConnectionResponseResult::from(0x0003),
        ConnectionResponseResult::SecurityBlock
    );
    assert_eq!(
        ConnectionResponseResult::from(0x00B0),
        ConnectionResponseResult::Other(0x00B0)
    );
    assert_eq!(u16::from(ConnectionResponseResult::SourceCidAlreadyAllocated), 0x0007);
}
