// Path: crates/ibc/tests/atomicity.rs

use anyhow::Result;
use ioi_ibc::{IbcStore, MSG_DISPATCH_METHOD};
use ioi_test_utils::mock_module::MOCK_PACKET_DATA;
use ioi_test_utils::{init_tracing, Coordinator, Link, Side, RELAYER};
use ioi_types::codec::to_bytes_canonical;
use ioi_types::error::IbcError;
use ioi_types::ibc::{MsgEnvelope, MsgUpdateClient, Order, Packet, ResponseResult};

fn open() -> Result<(Coordinator, Link)> {
    init_tracing();
    let mut c = Coordinator::new()?;
    let link = c.setup_channel(Order::Unordered)?;
    Ok((c, link))
}

fn forged(packet: &Packet) -> Packet {
    let mut forged = packet.clone();
    forged.data = b"not what was committed".to_vec();
    forged
}

#[test]
fn rejected_message_leaves_state_untouched() -> Result<()> {
    let (mut c, link) = open()?;
    let packet = c.send_default(Side::A, &link, MOCK_PACKET_DATA)?;
    let msg = c.recv_msg(Side::B, &forged(&packet))?;

    let before = c.b.state.clone();
    let err = c.deliver(Side::B, MsgEnvelope::RecvPacket(msg)).unwrap_err();
    assert!(matches!(err, IbcError::ProofVerificationFailed { .. }), "{err}");
    assert_eq!(c.b.state, before);
    assert_eq!(c.b.module.calls().recv, 0);
    Ok(())
}

#[test]
fn malformed_message_is_rejected_before_execution() -> Result<()> {
    let (mut c, link) = open()?;
    let packet = c.send_default(Side::A, &link, MOCK_PACKET_DATA)?;
    let mut msg = c.recv_msg(Side::B, &packet)?;
    msg.signer.clear();

    let before = c.b.state.clone();
    let err = c.deliver(Side::B, MsgEnvelope::RecvPacket(msg)).unwrap_err();
    assert!(matches!(err, IbcError::InvalidMessage(_)), "{err}");
    assert_eq!(c.b.state, before);
    Ok(())
}

#[test]
fn batch_runs_in_order_and_commits_together() -> Result<()> {
    let (mut c, link) = open()?;
    let packet = c.send_default(Side::A, &link, MOCK_PACKET_DATA)?;
    let msg = c.recv_msg(Side::B, &packet)?;

    let outcomes = c.b.dispatch_batch(vec![
        MsgEnvelope::RecvPacket(msg.clone()),
        MsgEnvelope::RecvPacket(msg),
    ])?;
    let results: Vec<_> = outcomes.iter().map(|o| o.response.result()).collect();
    assert_eq!(results, [ResponseResult::Success, ResponseResult::NoOp]);
    assert!(c.b.state.has_packet_receipt(
        &packet.destination_port,
        &packet.destination_channel,
        packet.sequence,
    )?);
    Ok(())
}

#[test]
fn failing_batch_member_discards_the_whole_batch() -> Result<()> {
    let (mut c, link) = open()?;
    let packet = c.send_default(Side::A, &link, MOCK_PACKET_DATA)?;
    let good = c.recv_msg(Side::B, &packet)?;
    let bad = c.recv_msg(Side::B, &forged(&packet))?;

    let height = c.a.commit();
    let header = c.a.header(height)?;
    let update = MsgEnvelope::UpdateClient(MsgUpdateClient {
        client_id: c.client_b.clone(),
        client_message: to_bytes_canonical(&header),
        signer: RELAYER.into(),
    });

    let before = c.b.state.clone();
    let latest = c.b.state.client_state(&c.client_b)?.latest_height;
    let err = c
        .b
        .dispatch_batch(vec![
            update,
            MsgEnvelope::RecvPacket(good.clone()),
            MsgEnvelope::RecvPacket(bad),
        ])
        .unwrap_err();
    assert!(matches!(err, IbcError::ProofVerificationFailed { .. }), "{err}");
    assert_eq!(c.b.state, before);
    assert_eq!(c.b.state.client_state(&c.client_b)?.latest_height, latest);
    assert!(latest < height);

    let outcomes = c.b.dispatch_batch(vec![MsgEnvelope::RecvPacket(good)])?;
    assert_eq!(outcomes.len(), 1);
    assert_eq!(outcomes[0].response.result(), ResponseResult::Success);
    Ok(())
}

#[test]
fn service_rejects_unknown_methods_and_bad_params() -> Result<()> {
    let (mut c, _) = open()?;
    let before = c.a.state.clone();

    let err = c.a.service_call("msg_dispatch@v2", &[]).unwrap_err();
    assert_eq!(err, IbcError::UnsupportedMethod("msg_dispatch@v2".into()));

    let err = c.a.service_call(MSG_DISPATCH_METHOD, &[0xff, 0x01]).unwrap_err();
    assert!(matches!(err, IbcError::Codec(_)), "{err}");
    assert_eq!(c.a.state, before);

    let outcomes = c.a.service_call(MSG_DISPATCH_METHOD, &to_bytes_canonical(&Vec::<MsgEnvelope>::new()))?;
    assert!(outcomes.is_empty());
    Ok(())
}
