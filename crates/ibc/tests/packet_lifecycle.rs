// Path: crates/ibc/tests/packet_lifecycle.rs

use anyhow::{Context, Result};
use ioi_ibc::IbcStore;
use ioi_test_utils::chain::BLOCK_TIME;
use ioi_test_utils::mock_module::{
    recv_sentinel_key, MOCK_ASYNC_PACKET_DATA, MOCK_FAIL_PACKET_DATA, MOCK_PACKET_DATA,
    MOCK_SUCCESS_ACK,
};
use ioi_test_utils::{init_tracing, mock_port, written_ack, Coordinator, Link, Side};
use ioi_types::error::IbcError;
use ioi_types::ibc::{
    Acknowledgement, ChannelId, ChannelState, Height, IbcEvent, MsgEnvelope, MsgResponse, Order,
    Packet, Path, ResponseResult, Sequence,
};

fn commitment_path(packet: &Packet) -> Path {
    Path::Commitment(
        packet.source_port.clone(),
        packet.source_channel.clone(),
        packet.sequence,
    )
}

fn receipt_path(packet: &Packet) -> Path {
    Path::Receipt(
        packet.destination_port.clone(),
        packet.destination_channel.clone(),
        packet.sequence,
    )
}

fn success_ack() -> Vec<u8> {
    Acknowledgement::success(MOCK_SUCCESS_ACK).to_bytes().unwrap()
}

fn open(order: Order) -> Result<(Coordinator, Link)> {
    init_tracing();
    let mut c = Coordinator::new()?;
    let link = c.setup_channel(order)?;
    Ok((c, link))
}

/// A timeout height `blocks` ahead of B's current height.
fn b_height_in(c: &Coordinator, blocks: u64) -> Height {
    c.b.height().add(blocks)
}

#[test]
fn unordered_send_receive_acknowledge() -> Result<()> {
    let (mut c, link) = open(Order::Unordered)?;

    let packet = c.send_default(Side::A, &link, MOCK_PACKET_DATA)?;
    assert_eq!(packet.sequence, Sequence(1));
    assert_eq!(packet.destination_channel, link.channel_b);
    assert!(c.a.has(&commitment_path(&packet))?);
    assert_eq!(
        c.a.state.next_sequence_send(&mock_port(), &link.channel_a)?,
        Sequence(2)
    );

    let outcome = c.relay_recv(Side::B, &packet)?;
    assert_eq!(outcome.response, MsgResponse::RecvPacket(ResponseResult::Success));
    assert_eq!(written_ack(&outcome.events), Some(success_ack()));
    assert!(c.b.has(&receipt_path(&packet))?);
    assert!(c.b.has_key(&recv_sentinel_key(&packet))?);

    let outcome = c.relay_ack(Side::A, &packet, &success_ack())?;
    assert_eq!(
        outcome.response,
        MsgResponse::Acknowledgement(ResponseResult::Success)
    );
    assert!(outcome
        .events
        .iter()
        .any(|e| matches!(e, IbcEvent::AcknowledgePacket { .. })));
    assert!(!c.a.has(&commitment_path(&packet))?);
    assert_eq!(c.a.module.calls().ack, 1);
    Ok(())
}

#[test]
fn redundant_relays_are_no_ops() -> Result<()> {
    let (mut c, link) = open(Order::Unordered)?;
    let packet = c.send_default(Side::A, &link, MOCK_PACKET_DATA)?;
    c.relay_recv(Side::B, &packet)?;

    let msg = c.recv_msg(Side::B, &packet)?;
    let before = c.b.state.clone();
    let replay = c.deliver(Side::B, MsgEnvelope::RecvPacket(msg))?;
    assert_eq!(replay.response, MsgResponse::RecvPacket(ResponseResult::NoOp));
    assert!(replay.events.is_empty());
    assert_eq!(c.b.state, before);
    assert_eq!(c.b.module.calls().recv, 1);

    c.relay_ack(Side::A, &packet, &success_ack())?;
    let msg = c.ack_msg(Side::A, &packet, &success_ack())?;
    let before = c.a.state.clone();
    let replay = c.deliver(Side::A, MsgEnvelope::Acknowledgement(msg))?;
    assert_eq!(
        replay.response,
        MsgResponse::Acknowledgement(ResponseResult::NoOp)
    );
    assert_eq!(c.a.state, before);
    assert_eq!(c.a.module.calls().ack, 1);
    Ok(())
}

#[test]
fn unordered_channel_accepts_any_order() -> Result<()> {
    let (mut c, link) = open(Order::Unordered)?;
    let first = c.send_default(Side::A, &link, MOCK_PACKET_DATA)?;
    let second = c.send_default(Side::A, &link, MOCK_PACKET_DATA)?;

    for packet in [&second, &first] {
        let outcome = c.relay_recv(Side::B, packet)?;
        assert_eq!(outcome.response.result(), ResponseResult::Success);
    }
    for packet in [&second, &first] {
        let outcome = c.relay_ack(Side::A, packet, &success_ack())?;
        assert_eq!(outcome.response.result(), ResponseResult::Success);
    }
    Ok(())
}

#[test]
fn ordered_channel_enforces_sequence() -> Result<()> {
    let (mut c, link) = open(Order::Ordered)?;
    let port = mock_port();
    let packets = (0..3)
        .map(|_| c.send_default(Side::A, &link, MOCK_PACKET_DATA))
        .collect::<Result<Vec<_>>>()?;
    let [p1, p2, p3] = packets.as_slice() else {
        anyhow::bail!("expected three packets");
    };

    let msg = c.recv_msg(Side::B, p2)?;
    let err = c.deliver(Side::B, MsgEnvelope::RecvPacket(msg)).unwrap_err();
    assert_eq!(
        err,
        IbcError::SequenceMismatch {
            expected: Sequence(1),
            got: Sequence(2),
        }
    );

    assert_eq!(c.relay_recv(Side::B, p1)?.response.result(), ResponseResult::Success);
    assert_eq!(c.relay_recv(Side::B, p1)?.response.result(), ResponseResult::NoOp);
    assert_eq!(c.relay_recv(Side::B, p2)?.response.result(), ResponseResult::Success);
    assert_eq!(c.relay_recv(Side::B, p3)?.response.result(), ResponseResult::Success);
    assert_eq!(c.b.state.next_sequence_recv(&port, &link.channel_b)?, Sequence(4));
    for packet in [p1, p2, p3] {
        assert!(c.b.has(&receipt_path(packet))?);
    }

    let msg = c.ack_msg(Side::A, p2, &success_ack())?;
    let err = c.deliver(Side::A, MsgEnvelope::Acknowledgement(msg)).unwrap_err();
    assert_eq!(
        err,
        IbcError::SequenceMismatch {
            expected: Sequence(1),
            got: Sequence(2),
        }
    );
    for packet in [p1, p2, p3] {
        let outcome = c.relay_ack(Side::A, packet, &success_ack())?;
        assert_eq!(outcome.response.result(), ResponseResult::Success);
    }
    assert_eq!(c.a.state.next_sequence_ack(&port, &link.channel_a)?, Sequence(4));
    Ok(())
}

#[test]
fn send_validates_timeout_and_capability() -> Result<()> {
    let (mut c, link) = open(Order::Unordered)?;
    let port = mock_port();

    let err = c
        .a
        .send_packet(&port, &link.channel_a, Height::zero(), 0, MOCK_PACKET_DATA)
        .unwrap_err();
    assert!(matches!(err, IbcError::InvalidTimeout(_)), "{err}");

    let err = c
        .a
        .send_packet(&port, &link.channel_a, Height::new(0, 1), 0, MOCK_PACKET_DATA)
        .unwrap_err();
    assert_eq!(err, IbcError::PacketAlreadyTimedOut(Sequence(1)));

    let block = c.a.block();
    let chain = &mut c.a;
    let err = chain
        .core
        .send_packet(
            &mut chain.state,
            block,
            &chain.port_capability,
            &port,
            &link.channel_a,
            Height::zero(),
            u64::MAX,
            MOCK_PACKET_DATA.to_vec(),
        )
        .unwrap_err();
    assert!(matches!(err, IbcError::Unauthorized(_)), "{err}");
    assert_eq!(
        c.a.state.next_sequence_send(&port, &link.channel_a)?,
        Sequence(1)
    );
    Ok(())
}

#[test]
fn tampered_packets_are_rejected() -> Result<()> {
    let (mut c, link) = open(Order::Unordered)?;
    let packet = c.send_default(Side::A, &link, MOCK_PACKET_DATA)?;

    let mut forged = packet.clone();
    forged.data = b"forged".to_vec();
    let msg = c.recv_msg(Side::B, &forged)?;
    let err = c.deliver(Side::B, MsgEnvelope::RecvPacket(msg)).unwrap_err();
    assert!(matches!(err, IbcError::ProofVerificationFailed { .. }), "{err}");

    let mut misrouted = packet.clone();
    misrouted.source_channel = ChannelId::new("channel-9")?;
    let msg = c.recv_msg(Side::B, &misrouted)?;
    let err = c.deliver(Side::B, MsgEnvelope::RecvPacket(msg)).unwrap_err();
    assert!(matches!(err, IbcError::InvalidPacketRoute(_)), "{err}");

    c.relay_recv(Side::B, &packet)?;
    let msg = c.ack_msg(Side::A, &packet, &Acknowledgement::error("made up").to_bytes()?)?;
    let err = c.deliver(Side::A, MsgEnvelope::Acknowledgement(msg)).unwrap_err();
    assert!(matches!(err, IbcError::ProofVerificationFailed { .. }), "{err}");

    let msg = c.ack_msg(Side::A, &forged, &success_ack())?;
    let err = c.deliver(Side::A, MsgEnvelope::Acknowledgement(msg)).unwrap_err();
    assert_eq!(err, IbcError::CommitmentMismatch(packet.sequence));
    Ok(())
}

#[test]
fn failed_receive_callback_writes_error_ack_and_no_app_state() -> Result<()> {
    let (mut c, link) = open(Order::Unordered)?;
    c.b.module.configure(|cfg| cfg.fail_recv = true);
    let packet = c.send_default(Side::A, &link, MOCK_PACKET_DATA)?;

    let outcome = c.relay_recv(Side::B, &packet)?;
    assert_eq!(outcome.response, MsgResponse::RecvPacket(ResponseResult::Success));
    let ack = written_ack(&outcome.events).context("an error ack is written")?;
    match Acknowledgement::from_bytes(&ack)? {
        Acknowledgement::Error(message) => assert!(message.contains("mock receive failed")),
        other => panic!("expected an error acknowledgement, got {other:?}"),
    }
    assert!(c.b.has(&receipt_path(&packet))?, "the receipt is transport state");
    assert!(
        !c.b.has_key(&recv_sentinel_key(&packet))?,
        "application writes of a failed callback are discarded"
    );
    assert!(
        outcome
            .events
            .iter()
            .any(|e| matches!(e, IbcEvent::Module { kind, .. } if kind == "mock_recv")),
        "application events survive the discarded branch"
    );

    let outcome = c.relay_ack(Side::A, &packet, &ack)?;
    assert_eq!(outcome.response.result(), ResponseResult::Success);
    Ok(())
}

#[test]
fn error_acknowledgement_discards_app_state() -> Result<()> {
    let (mut c, link) = open(Order::Unordered)?;
    let packet = c.send_default(Side::A, &link, MOCK_FAIL_PACKET_DATA)?;

    let outcome = c.relay_recv(Side::B, &packet)?;
    let ack = written_ack(&outcome.events).context("ack written")?;
    assert!(!Acknowledgement::from_bytes(&ack)?.is_success());
    assert!(!c.b.has_key(&recv_sentinel_key(&packet))?);
    Ok(())
}

#[test]
fn deferred_acknowledgement_is_written_once() -> Result<()> {
    let (mut c, link) = open(Order::Unordered)?;
    let port = mock_port();
    let packet = c.send_default(Side::A, &link, MOCK_ASYNC_PACKET_DATA)?;

    let outcome = c.relay_recv(Side::B, &packet)?;
    assert_eq!(outcome.response.result(), ResponseResult::Success);
    assert_eq!(written_ack(&outcome.events), None);
    assert!(c.b.has_key(&recv_sentinel_key(&packet))?);
    assert!(c
        .b
        .state
        .packet_acknowledgement(&port, &link.channel_b, packet.sequence)?
        .is_none());

    let capability = c.b.channel_capability(&port, &link.channel_b)?;
    let block = c.b.block();
    let chain = &mut c.b;
    let err = chain
        .core
        .write_acknowledgement(&mut chain.state, block, &capability, &packet, Vec::new())
        .unwrap_err();
    assert!(matches!(err, IbcError::InvalidMessage(_)), "{err}");
    let events = chain.core.write_acknowledgement(
        &mut chain.state,
        block,
        &capability,
        &packet,
        success_ack(),
    )?;
    assert_eq!(written_ack(&events), Some(success_ack()));

    let err = chain
        .core
        .write_acknowledgement(&mut chain.state, block, &capability, &packet, success_ack())
        .unwrap_err();
    assert_eq!(err, IbcError::AcknowledgementExists(packet.sequence));

    let outcome = c.relay_ack(Side::A, &packet, &success_ack())?;
    assert_eq!(outcome.response.result(), ResponseResult::Success);
    Ok(())
}

#[test]
fn unordered_timeout_by_height() -> Result<()> {
    let (mut c, link) = open(Order::Unordered)?;
    let timeout_height = b_height_in(&c, 2);
    let packet = c.send_packet(Side::A, &link, MOCK_PACKET_DATA, timeout_height, 0)?;

    let msg = c.timeout_msg(Side::A, &packet)?;
    let err = c.deliver(Side::A, MsgEnvelope::Timeout(msg)).unwrap_err();
    assert!(matches!(err, IbcError::TimeoutNotReached { .. }), "{err}");

    c.b.advance(3);
    let outcome = {
        let msg = c.timeout_msg(Side::A, &packet)?;
        c.deliver(Side::A, MsgEnvelope::Timeout(msg))?
    };
    assert_eq!(outcome.response, MsgResponse::Timeout(ResponseResult::Success));
    assert!(outcome
        .events
        .iter()
        .any(|e| matches!(e, IbcEvent::TimeoutPacket { .. })));
    assert!(!c.a.has(&commitment_path(&packet))?);
    assert_eq!(c.a.module.calls().timeout, 1);
    assert_eq!(
        c.a.channel(&mock_port(), &link.channel_a)?.state,
        ChannelState::Open
    );

    let msg = c.timeout_msg(Side::A, &packet)?;
    let replay = c.deliver(Side::A, MsgEnvelope::Timeout(msg))?;
    assert_eq!(replay.response, MsgResponse::Timeout(ResponseResult::NoOp));

    let msg = c.recv_msg(Side::B, &packet)?;
    let err = c.deliver(Side::B, MsgEnvelope::RecvPacket(msg)).unwrap_err();
    assert_eq!(err, IbcError::PacketAlreadyTimedOut(packet.sequence));
    Ok(())
}

#[test]
fn timeout_by_timestamp() -> Result<()> {
    let (mut c, link) = open(Order::Unordered)?;
    let timeout_timestamp = c.b.timestamp() + 2 * BLOCK_TIME;
    let packet = c.send_packet(Side::A, &link, MOCK_PACKET_DATA, Height::zero(), timeout_timestamp)?;

    c.b.advance(3);
    let msg = c.timeout_msg(Side::A, &packet)?;
    let outcome = c.deliver(Side::A, MsgEnvelope::Timeout(msg))?;
    assert_eq!(outcome.response.result(), ResponseResult::Success);
    Ok(())
}

#[test]
fn received_packet_cannot_time_out() -> Result<()> {
    let (mut c, link) = open(Order::Unordered)?;
    let timeout_height = b_height_in(&c, 3);
    let packet = c.send_packet(Side::A, &link, MOCK_PACKET_DATA, timeout_height, 0)?;
    c.relay_recv(Side::B, &packet)?;

    c.b.advance(4);
    let msg = c.timeout_msg(Side::A, &packet)?;
    let err = c.deliver(Side::A, MsgEnvelope::Timeout(msg)).unwrap_err();
    assert!(matches!(err, IbcError::ProofVerificationFailed { .. }), "{err}");
    assert!(c.a.has(&commitment_path(&packet))?);

    let outcome = c.relay_ack(Side::A, &packet, &success_ack())?;
    assert_eq!(outcome.response.result(), ResponseResult::Success);
    assert_eq!(c.a.module.calls().timeout, 0);
    Ok(())
}

#[test]
fn received_packet_cannot_time_out_on_ordered_channel() -> Result<()> {
    let (mut c, link) = open(Order::Ordered)?;
    let timeout_height = b_height_in(&c, 3);
    let packet = c.send_packet(Side::A, &link, MOCK_PACKET_DATA, timeout_height, 0)?;
    c.relay_recv(Side::B, &packet)?;

    c.b.advance(4);
    let msg = c.timeout_msg(Side::A, &packet)?;
    assert_eq!(msg.next_sequence_recv, Sequence(2));
    let before = c.a.state.clone();
    let err = c.deliver(Side::A, MsgEnvelope::Timeout(msg)).unwrap_err();
    assert!(matches!(err, IbcError::InvalidState(_)), "{err}");
    assert_eq!(c.a.state, before);
    assert!(c.a.has(&commitment_path(&packet))?);
    assert_eq!(
        c.a.channel(&mock_port(), &link.channel_a)?.state,
        ChannelState::Open
    );

    let outcome = c.relay_ack(Side::A, &packet, &success_ack())?;
    assert_eq!(outcome.response.result(), ResponseResult::Success);
    assert_eq!(c.a.module.calls().timeout, 0);
    Ok(())
}

#[test]
fn ordered_timeout_closes_the_channel() -> Result<()> {
    let (mut c, link) = open(Order::Ordered)?;
    let timeout_height = b_height_in(&c, 2);
    let packet = c.send_packet(Side::A, &link, MOCK_PACKET_DATA, timeout_height, 0)?;

    c.b.advance(3);
    let msg = c.timeout_msg(Side::A, &packet)?;
    assert_eq!(msg.next_sequence_recv, Sequence(1));
    let outcome = c.deliver(Side::A, MsgEnvelope::Timeout(msg))?;
    assert_eq!(outcome.response.result(), ResponseResult::Success);
    assert!(outcome
        .events
        .iter()
        .any(|e| matches!(e, IbcEvent::ChannelClosed { .. })));
    assert_eq!(
        c.a.channel(&mock_port(), &link.channel_a)?.state,
        ChannelState::Closed
    );

    let err = c.send_default(Side::A, &link, MOCK_PACKET_DATA).unwrap_err();
    assert!(
        matches!(
            err.downcast_ref::<IbcError>(),
            Some(IbcError::InvalidChannelState { .. })
        ),
        "{err}"
    );
    Ok(())
}

#[test]
fn timeout_on_close_after_counterparty_closed() -> Result<()> {
    let (mut c, link) = open(Order::Unordered)?;
    let packet = c.send_default(Side::A, &link, MOCK_PACKET_DATA)?;

    let msg = c.timeout_on_close_msg(Side::A, &packet)?;
    let err = c.deliver(Side::A, MsgEnvelope::TimeoutOnClose(msg)).unwrap_err();
    assert!(matches!(err, IbcError::ProofVerificationFailed { .. }), "{err}");

    c.chan_close_init(Side::B, &link.channel_b)?;
    let msg = c.timeout_on_close_msg(Side::A, &packet)?;
    let outcome = c.deliver(Side::A, MsgEnvelope::TimeoutOnClose(msg))?;
    assert_eq!(
        outcome.response,
        MsgResponse::TimeoutOnClose(ResponseResult::Success)
    );
    assert!(!c.a.has(&commitment_path(&packet))?);
    assert_eq!(c.a.module.calls().timeout, 1);
    Ok(())
}
