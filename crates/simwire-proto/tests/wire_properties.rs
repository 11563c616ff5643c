//! Property tests for the wire codecs.

use std::net::{IpAddr, Ipv4Addr};

use proptest::prelude::*;
use simwire_proto::{
    AckResponse, AsconfAckChunk, AsconfChunk, AsconfParam, AsconfParamKind, AuthChunk, Chunk,
    Ipv4Net, RipCommand, RipEntry, RipPacket, SctpPacket,
};

fn arb_ipv4() -> impl Strategy<Value = Ipv4Addr> {
    any::<u32>().prop_map(Ipv4Addr::from)
}

fn arb_rip_entry() -> impl Strategy<Value = RipEntry> {
    (arb_ipv4(), 0u8..=32, 0u32..=16, arb_ipv4(), any::<u16>()).prop_map(
        |(addr, prefix, metric, next_hop, tag)| {
            let net = Ipv4Net::new(addr, prefix).unwrap();
            let mut entry = RipEntry::new(net, metric);
            entry.set_next_hop(next_hop);
            entry.set_route_tag(tag);
            entry
        },
    )
}

fn arb_rip_packet() -> impl Strategy<Value = RipPacket> {
    (
        prop_oneof![Just(RipCommand::Request), Just(RipCommand::Response)],
        prop::collection::vec(arb_rip_entry(), 0..25),
    )
        .prop_map(|(command, entries)| RipPacket::new(command, entries))
}

fn arb_address() -> impl Strategy<Value = IpAddr> {
    prop_oneof![
        arb_ipv4().prop_map(IpAddr::V4),
        any::<[u8; 16]>().prop_map(|o| IpAddr::V6(o.into())),
    ]
}

fn arb_asconf() -> impl Strategy<Value = AsconfChunk> {
    let kinds = prop_oneof![
        Just(AsconfParamKind::AddIp),
        Just(AsconfParamKind::DeleteIp),
        Just(AsconfParamKind::SetPrimary),
    ];
    let params = prop::collection::vec(
        (kinds, any::<u32>(), arb_address())
            .prop_map(|(kind, correlation_id, address)| AsconfParam { kind, correlation_id, address }),
        0..6,
    );
    (any::<u32>(), arb_address(), proptest::option::of(any::<u32>()), params).prop_map(
        |(serial_number, address, peer_vtag, params)| AsconfChunk {
            serial_number,
            address,
            peer_vtag,
            params,
        },
    )
}

fn arb_ack() -> impl Strategy<Value = AsconfAckChunk> {
    let responses = prop::collection::vec(
        prop_oneof![
            any::<u32>().prop_map(|correlation_id| AckResponse::Success { correlation_id }),
            (any::<u32>(), any::<u16>())
                .prop_map(|(correlation_id, cause)| AckResponse::Error { correlation_id, cause }),
        ],
        0..6,
    );
    (any::<u32>(), responses)
        .prop_map(|(serial_number, responses)| AsconfAckChunk { serial_number, responses })
}

proptest! {
    #[test]
    fn rip_packet_round_trip(packet in arb_rip_packet()) {
        let mut wire = Vec::new();
        packet.encode(&mut wire).unwrap();

        let parsed = RipPacket::decode(&wire).unwrap();
        prop_assert_eq!(parsed, packet);
    }

    #[test]
    fn rip_decode_never_panics(bytes in prop::collection::vec(any::<u8>(), 0..600)) {
        let _ = RipPacket::decode(&bytes);
    }

    #[test]
    fn sctp_packet_round_trip(
        asconf in arb_asconf(),
        ack in arb_ack(),
        vtag in any::<u32>(),
    ) {
        let packet = SctpPacket::new(
            5000,
            5001,
            vtag,
            vec![
                Chunk::Auth(AuthChunk::zeroed()),
                Chunk::Asconf(asconf),
                Chunk::AsconfAck(ack),
            ],
        );
        let mut wire = Vec::new();
        packet.encode(&mut wire);

        let parsed = SctpPacket::decode(&wire).unwrap();
        prop_assert_eq!(parsed, packet);
    }

    #[test]
    fn sctp_decode_never_panics(bytes in prop::collection::vec(any::<u8>(), 0..600)) {
        let _ = SctpPacket::decode(&bytes);
    }

    // Smallest ASCONF chunk is 16 bytes, so cuts below 12 always leave a
    // chunk header whose declared length overruns the buffer.
    #[test]
    fn truncation_is_detected(asconf in arb_asconf(), cut in 1usize..12) {
        let packet = SctpPacket::new(1, 2, 3, vec![Chunk::Asconf(asconf)]);
        let mut wire = Vec::new();
        packet.encode(&mut wire);

        prop_assert!(SctpPacket::decode(&wire[..wire.len() - cut]).is_err());
    }
}
