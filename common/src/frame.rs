use crate::{bounded, OutboundPacket, Packet, Tag};

/// Controller -> node: network credentials to join
pub const CREDENTIALS_TAG: &str = "WiFi";
/// Controller -> node: light/laser states, one field per board
pub const ACTUATOR_TAG: &str = "sLP";
/// Node -> controller: the node's current address
pub const ADDRESS_TAG: &str = "gIP";

pub const NETWORK_NAME_LEN: usize = 31;
pub const PASSPHRASE_LEN: usize = 63;
pub const ADDRESS_LEN: usize = 31;

pub type NetworkName = heapless::String<NETWORK_NAME_LEN>;
pub type Passphrase = heapless::String<PASSPHRASE_LEN>;
pub type ReportAddress = heapless::String<ADDRESS_LEN>;

/// A decoded inbound frame.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Frame {
    CredentialUpdate {
        mode: i32,
        network_name: NetworkName,
        passphrase: Passphrase,
        report_address: ReportAddress,
    },
    ActuatorCommand {
        /// Bottom LED, driven by the drive board
        aux_a: i32,
        /// Turret LED, driven by this node
        local_indicator: i32,
        /// Turret laser, driven by the UNO
        aux_b: i32,
    },
    Unrecognized {
        tag: Tag,
    },
}

impl Frame {
    pub fn from_packet(packet: &Packet) -> Self {
        let mut fields = packet.fields();

        if packet.full_match(CREDENTIALS_TAG) {
            Frame::CredentialUpdate {
                mode: fields.next_int(),
                network_name: fields.next_string(),
                passphrase: fields.next_string(),
                report_address: fields.next_string(),
            }
        } else if packet.full_match(ACTUATOR_TAG) {
            Frame::ActuatorCommand {
                aux_a: fields.next_int(),
                local_indicator: fields.next_int(),
                aux_b: fields.next_int(),
            }
        } else {
            Frame::Unrecognized {
                tag: bounded(packet.tag()),
            }
        }
    }

    /// The status frame carrying the node's address
    pub fn address_report(address: &str) -> OutboundPacket {
        OutboundPacket::new(ADDRESS_TAG).string(address)
    }

    /// Re-encode an inbound frame, as the controller would send it.
    /// `Unrecognized` frames have no field schema and yield `None`.
    pub fn to_packet(&self) -> Option<OutboundPacket> {
        match self {
            Frame::CredentialUpdate {
                mode,
                network_name,
                passphrase,
                report_address,
            } => Some(
                OutboundPacket::new(CREDENTIALS_TAG)
                    .int(*mode)
                    .string(network_name)
                    .string(passphrase)
                    .string(report_address),
            ),
            Frame::ActuatorCommand {
                aux_a,
                local_indicator,
                aux_b,
            } => Some(
                OutboundPacket::new(ACTUATOR_TAG)
                    .int(*aux_a)
                    .int(*local_indicator)
                    .int(*aux_b),
            ),
            Frame::Unrecognized { .. } => None,
        }
    }
}

impl From<&Packet> for Frame {
    fn from(packet: &Packet) -> Self {
        Frame::from_packet(packet)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{encode, Decoder, FrameEncoding};

    fn decode_one(encoding: FrameEncoding, bytes: &[u8]) -> Option<Frame> {
        let mut decoder = Decoder::new(encoding);
        bytes
            .iter()
            .filter_map(|b| decoder.push(*b))
            .map(|packet| Frame::from_packet(&packet))
            .next()
    }

    #[test]
    fn test_credential_update_decoding() {
        let frame = decode_one(FrameEncoding::Ascii, b"WiFi 2 HomeNet secret123 10.0.0.2\n");
        assert_eq!(
            frame,
            Some(Frame::CredentialUpdate {
                mode: 2,
                network_name: bounded("HomeNet"),
                passphrase: bounded("secret123"),
                report_address: bounded("10.0.0.2"),
            })
        );
    }

    #[test]
    fn test_credential_update_without_report_address() {
        let frame = decode_one(FrameEncoding::Ascii, b"WiFi 0 HomeNet secret123\n");
        match frame {
            Some(Frame::CredentialUpdate { report_address, .. }) => {
                assert!(report_address.is_empty())
            }
            other => panic!("unexpected frame {:?}", other),
        }
    }

    #[test]
    fn test_oversized_name_is_truncated() {
        let long_name = "n".repeat(40);
        let bytes = encode(
            FrameEncoding::Slip,
            &OutboundPacket::new(CREDENTIALS_TAG)
                .int(0)
                .string(&long_name)
                .string("pw")
                .string(""),
        );

        match decode_one(FrameEncoding::Slip, &bytes) {
            Some(Frame::CredentialUpdate { network_name, .. }) => {
                assert_eq!(network_name.len(), NETWORK_NAME_LEN)
            }
            other => panic!("unexpected frame {:?}", other),
        }
    }

    #[test]
    fn test_tags_match_exactly() {
        assert_eq!(
            decode_one(FrameEncoding::Ascii, b"wifi 0 a b\n"),
            Some(Frame::Unrecognized {
                tag: bounded("wifi")
            })
        );
        assert!(matches!(
            decode_one(FrameEncoding::Ascii, b"sLPx 1 1 1\n"),
            Some(Frame::Unrecognized { .. })
        ));
    }

    #[test]
    fn test_actuator_frame_reencodes() {
        let frame = Frame::ActuatorCommand {
            aux_a: 1,
            local_indicator: 0,
            aux_b: 1,
        };
        let bytes = encode(FrameEncoding::Ascii, &frame.to_packet().unwrap());
        assert_eq!(bytes, b"sLP 1 0 1\n".to_vec());
        assert_eq!(decode_one(FrameEncoding::Ascii, &bytes), Some(frame));
    }
}
