// Path: crates/ibc/tests/channel_upgrade.rs

use anyhow::Result;
use ioi_ibc::IbcStore;
use ioi_test_utils::mock_module::{channel_sentinel_key, MOCK_PACKET_DATA, MOCK_SUCCESS_ACK, MOCK_VERSION};
use ioi_test_utils::{init_tracing, mock_port, written_ack, Coordinator, Link, Side};
use ioi_types::error::IbcError;
use ioi_types::ibc::{
    Acknowledgement, ChannelState, IbcEvent, MsgEnvelope, MsgResponse, Order, ResponseResult,
    Sequence, UpgradeFields,
};

const UPGRADED_VERSION: &str = "mock-v2";
const SECOND: u64 = 1_000_000_000;

fn open(order: Order) -> Result<(Coordinator, Link)> {
    init_tracing();
    let mut c = Coordinator::new()?;
    let link = c.setup_channel(order)?;
    Ok((c, link))
}

fn fields(link: &Link, side: Side, ordering: Order, version: &str) -> UpgradeFields {
    UpgradeFields {
        ordering,
        connection_hops: vec![link.connection(side).clone()],
        version: version.into(),
    }
}

fn state_of(c: &Coordinator, side: Side, link: &Link) -> Result<ChannelState> {
    Ok(c.chain(side).channel(&mock_port(), link.channel(side))?.state)
}

/// Runs INIT on A and TRY on B, leaving B flushing.
fn init_and_try(c: &mut Coordinator, link: &Link, ordering: Order) -> Result<()> {
    c.upgrade_init(Side::A, link, fields(link, Side::A, ordering, UPGRADED_VERSION))?;
    let msg = c.upgrade_try_msg(Side::B, link)?;
    let outcome = c.deliver(Side::B, MsgEnvelope::ChannelUpgradeTry(msg))?;
    assert_eq!(outcome.response.result(), ResponseResult::Success);
    assert_eq!(state_of(c, Side::B, link)?, ChannelState::Flushing);
    Ok(())
}

fn ack_on_a(c: &mut Coordinator, link: &Link) -> Result<ResponseResult> {
    let msg = c.upgrade_ack_msg(Side::A, link)?;
    Ok(c.deliver(Side::A, MsgEnvelope::ChannelUpgradeAck(msg))?.response.result())
}

fn cancel_on_b(c: &mut Coordinator, link: &Link) -> Result<()> {
    let msg = c.upgrade_cancel_msg(Side::B, link)?;
    let outcome = c.deliver(Side::B, MsgEnvelope::ChannelUpgradeCancel(msg))?;
    assert_eq!(outcome.response, MsgResponse::ChannelUpgradeCancel);
    Ok(())
}

#[test]
fn upgrade_switches_version_on_both_ends() -> Result<()> {
    let (mut c, link) = open(Order::Unordered)?;
    let port = mock_port();

    let outcome = c.upgrade_init(
        Side::A,
        &link,
        fields(&link, Side::A, Order::Unordered, UPGRADED_VERSION),
    )?;
    match &outcome.response {
        MsgResponse::ChannelUpgradeInit {
            upgrade,
            upgrade_sequence,
        } => {
            assert_eq!(*upgrade_sequence, 1);
            assert_eq!(upgrade.fields.version, UPGRADED_VERSION);
        }
        other => panic!("unexpected response {other:?}"),
    }
    assert!(outcome.events.iter().any(
        |e| matches!(e, IbcEvent::ChannelUpgrade { step, .. } if step == "init")
    ));
    assert_eq!(state_of(&c, Side::A, &link)?, ChannelState::Open);

    let msg = c.upgrade_try_msg(Side::B, &link)?;
    c.deliver(Side::B, MsgEnvelope::ChannelUpgradeTry(msg))?;
    assert_eq!(ack_on_a(&mut c, &link)?, ResponseResult::Success);
    assert_eq!(state_of(&c, Side::A, &link)?, ChannelState::FlushComplete);

    let msg = c.upgrade_confirm_msg(Side::B, &link)?;
    let outcome = c.deliver(Side::B, MsgEnvelope::ChannelUpgradeConfirm(msg))?;
    assert_eq!(outcome.response.result(), ResponseResult::Success);
    assert_eq!(state_of(&c, Side::B, &link)?, ChannelState::Open);

    let msg = c.upgrade_open_msg(Side::A, &link)?;
    assert_eq!(
        c.deliver(Side::A, MsgEnvelope::ChannelUpgradeOpen(msg))?.response,
        MsgResponse::ChannelUpgradeOpen
    );

    for side in [Side::A, Side::B] {
        let chain = c.chain(side);
        let channel = chain.channel(&port, link.channel(side))?;
        assert_eq!(channel.state, ChannelState::Open);
        assert_eq!(channel.version, UPGRADED_VERSION);
        assert_eq!(channel.upgrade_sequence, 1);
        assert!(chain.state.upgrade(&port, link.channel(side))?.is_none());
        assert!(chain
            .state
            .counterparty_upgrade(&port, link.channel(side))?
            .is_none());
        assert_eq!(chain.module.calls().upgrade_open, 1);
    }

    let packet = c.send_default(Side::A, &link, MOCK_PACKET_DATA)?;
    assert_eq!(
        c.relay_recv(Side::B, &packet)?.response.result(),
        ResponseResult::Success
    );
    Ok(())
}

#[test]
fn upgrade_to_ordered_resumes_sequences() -> Result<()> {
    let (mut c, link) = open(Order::Unordered)?;
    let port = mock_port();
    let ack = Acknowledgement::success(MOCK_SUCCESS_ACK).to_bytes()?;
    let before = c.send_default(Side::A, &link, MOCK_PACKET_DATA)?;
    c.relay_recv(Side::B, &before)?;
    c.relay_ack(Side::A, &before, &ack)?;

    init_and_try(&mut c, &link, Order::Ordered)?;
    assert_eq!(ack_on_a(&mut c, &link)?, ResponseResult::Success);
    let msg = c.upgrade_confirm_msg(Side::B, &link)?;
    c.deliver(Side::B, MsgEnvelope::ChannelUpgradeConfirm(msg))?;
    let msg = c.upgrade_open_msg(Side::A, &link)?;
    c.deliver(Side::A, MsgEnvelope::ChannelUpgradeOpen(msg))?;

    assert_eq!(c.a.channel(&port, &link.channel_a)?.ordering, Order::Ordered);
    assert_eq!(c.b.channel(&port, &link.channel_b)?.ordering, Order::Ordered);
    assert_eq!(c.b.state.next_sequence_recv(&port, &link.channel_b)?, Sequence(2));
    assert_eq!(c.a.state.next_sequence_ack(&port, &link.channel_a)?, Sequence(2));

    let after = c.send_default(Side::A, &link, MOCK_PACKET_DATA)?;
    assert_eq!(after.sequence, Sequence(2));
    c.relay_recv(Side::B, &after)?;
    assert_eq!(c.b.state.next_sequence_recv(&port, &link.channel_b)?, Sequence(3));
    let outcome = c.relay_ack(Side::A, &after, &ack)?;
    assert_eq!(outcome.response.result(), ResponseResult::Success);
    Ok(())
}

#[test]
fn in_flight_packets_are_flushed_before_opening() -> Result<()> {
    let (mut c, link) = open(Order::Unordered)?;
    let packet = c.send_default(Side::A, &link, MOCK_PACKET_DATA)?;

    init_and_try(&mut c, &link, Order::Unordered)?;
    assert_eq!(ack_on_a(&mut c, &link)?, ResponseResult::Success);
    assert_eq!(state_of(&c, Side::A, &link)?, ChannelState::Flushing);
    let upgrade = c
        .a
        .state
        .upgrade(&mock_port(), &link.channel_a)?
        .ok_or_else(|| anyhow::anyhow!("upgrade missing"))?;
    assert_eq!(upgrade.next_sequence_send, Sequence(2));

    let err = c.send_default(Side::A, &link, MOCK_PACKET_DATA).unwrap_err();
    assert!(
        matches!(
            err.downcast_ref::<IbcError>(),
            Some(IbcError::InvalidChannelState { .. })
        ),
        "{err}"
    );

    let msg = c.upgrade_confirm_msg(Side::B, &link)?;
    c.deliver(Side::B, MsgEnvelope::ChannelUpgradeConfirm(msg))?;
    assert_eq!(state_of(&c, Side::B, &link)?, ChannelState::FlushComplete);

    let msg = c.upgrade_open_msg(Side::A, &link)?;
    let err = c
        .deliver(Side::A, MsgEnvelope::ChannelUpgradeOpen(msg))
        .unwrap_err();
    assert!(matches!(err, IbcError::InvalidChannelState { .. }), "{err}");

    let outcome = c.relay_recv(Side::B, &packet)?;
    assert_eq!(outcome.response.result(), ResponseResult::Success);
    let ack = written_ack(&outcome.events).ok_or_else(|| anyhow::anyhow!("no ack written"))?;
    c.relay_ack(Side::A, &packet, &ack)?;
    assert_eq!(state_of(&c, Side::A, &link)?, ChannelState::FlushComplete);

    let msg = c.upgrade_open_msg(Side::A, &link)?;
    c.deliver(Side::A, MsgEnvelope::ChannelUpgradeOpen(msg))?;
    let msg = c.upgrade_open_msg(Side::B, &link)?;
    c.deliver(Side::B, MsgEnvelope::ChannelUpgradeOpen(msg))?;
    for side in [Side::A, Side::B] {
        assert_eq!(state_of(&c, side, &link)?, ChannelState::Open);
        let channel = c.chain(side).channel(&mock_port(), link.channel(side))?;
        assert_eq!(channel.version, UPGRADED_VERSION);
    }
    Ok(())
}

#[test]
fn failed_ack_callback_restores_the_channel() -> Result<()> {
    let (mut c, link) = open(Order::Unordered)?;
    let port = mock_port();
    c.a.module.configure(|cfg| cfg.fail_upgrade_ack = true);
    let prior_a = c.a.channel(&port, &link.channel_a)?;
    let prior_b = c.b.channel(&port, &link.channel_b)?;

    init_and_try(&mut c, &link, Order::Ordered)?;
    let msg = c.upgrade_ack_msg(Side::A, &link)?;
    let outcome = c.deliver(Side::A, MsgEnvelope::ChannelUpgradeAck(msg))?;
    assert_eq!(
        outcome.response,
        MsgResponse::ChannelUpgradeAck(ResponseResult::Failure)
    );
    assert!(outcome.events.iter().any(|e| matches!(
        e,
        IbcEvent::ChannelUpgradeError { upgrade_sequence: 1, .. }
    )));

    let channel = c.a.channel(&port, &link.channel_a)?;
    assert_eq!(channel.state, ChannelState::Open);
    assert_eq!(channel.ordering, Order::Unordered);
    assert_eq!(channel.version, MOCK_VERSION);
    assert_eq!(channel.connection_hops, prior_a.connection_hops);
    assert_eq!(channel.upgrade_sequence, 1);
    assert!(c.a.state.upgrade(&port, &link.channel_a)?.is_none());
    let receipt = c
        .a
        .state
        .upgrade_error(&port, &link.channel_a)?
        .ok_or_else(|| anyhow::anyhow!("no error receipt"))?;
    assert_eq!(receipt.sequence, 1);
    assert!(!c
        .a
        .has_key(&channel_sentinel_key("upgrade_ack", &port, &link.channel_a))?);
    assert_eq!(c.a.module.calls().upgrade_restore, 1);

    cancel_on_b(&mut c, &link)?;
    let channel = c.b.channel(&port, &link.channel_b)?;
    assert_eq!(channel.state, ChannelState::Open);
    assert_eq!(channel.ordering, Order::Unordered);
    assert_eq!(channel.version, MOCK_VERSION);
    assert_eq!(channel.connection_hops, prior_b.connection_hops);
    assert_eq!(channel.upgrade_sequence, 1);
    assert!(c.b.state.upgrade(&port, &link.channel_b)?.is_none());
    assert_eq!(c.b.module.calls().upgrade_restore, 1);

    let packet = c.send_default(Side::A, &link, MOCK_PACKET_DATA)?;
    assert_eq!(
        c.relay_recv(Side::B, &packet)?.response.result(),
        ResponseResult::Success
    );
    Ok(())
}

#[test]
fn rejected_try_lets_the_initiator_cancel() -> Result<()> {
    let (mut c, link) = open(Order::Unordered)?;
    let port = mock_port();
    c.b.module.configure(|cfg| cfg.fail_upgrade_try = true);

    c.upgrade_init(
        Side::A,
        &link,
        fields(&link, Side::A, Order::Unordered, UPGRADED_VERSION),
    )?;
    let msg = c.upgrade_try_msg(Side::B, &link)?;
    let outcome = c.deliver(Side::B, MsgEnvelope::ChannelUpgradeTry(msg))?;
    assert_eq!(
        outcome.response,
        MsgResponse::ChannelUpgradeTry {
            result: ResponseResult::Failure,
            upgrade: None,
            upgrade_sequence: 1,
        }
    );
    assert_eq!(state_of(&c, Side::B, &link)?, ChannelState::Open);

    let msg = c.upgrade_cancel_msg(Side::A, &link)?;
    c.deliver(Side::A, MsgEnvelope::ChannelUpgradeCancel(msg))?;
    assert!(c.a.state.upgrade(&port, &link.channel_a)?.is_none());
    assert_eq!(c.a.channel(&port, &link.channel_a)?.version, MOCK_VERSION);
    assert_eq!(c.a.module.calls().upgrade_restore, 1);
    Ok(())
}

#[test]
fn stalled_counterparty_times_out_the_upgrade() -> Result<()> {
    let (mut c, link) = open(Order::Unordered)?;
    let port = mock_port();

    init_and_try(&mut c, &link, Order::Unordered)?;
    assert_eq!(ack_on_a(&mut c, &link)?, ResponseResult::Success);

    let msg = c.upgrade_timeout_msg(Side::A, &link)?;
    let err = c
        .deliver(Side::A, MsgEnvelope::ChannelUpgradeTimeout(msg))
        .unwrap_err();
    assert!(matches!(err, IbcError::Upgrade(_)), "{err}");

    let offset = c.a.core.config().upgrade_timeout.timestamp_offset;
    c.b.advance_time(offset + SECOND);
    let msg = c.upgrade_timeout_msg(Side::A, &link)?;
    let outcome = c.deliver(Side::A, MsgEnvelope::ChannelUpgradeTimeout(msg))?;
    assert_eq!(outcome.response, MsgResponse::ChannelUpgradeTimeout);

    let channel = c.a.channel(&port, &link.channel_a)?;
    assert_eq!(channel.state, ChannelState::Open);
    assert_eq!(channel.version, MOCK_VERSION);
    assert_eq!(c.a.module.calls().upgrade_timeout, 1);
    assert_eq!(c.a.module.calls().upgrade_restore, 0);

    cancel_on_b(&mut c, &link)?;
    assert_eq!(state_of(&c, Side::B, &link)?, ChannelState::Open);
    Ok(())
}

#[test]
fn new_proposal_supersedes_the_pending_one() -> Result<()> {
    let (mut c, link) = open(Order::Unordered)?;
    let port = mock_port();

    c.upgrade_init(Side::A, &link, fields(&link, Side::A, Order::Unordered, "mock-v2"))?;
    c.upgrade_init(Side::A, &link, fields(&link, Side::A, Order::Unordered, "mock-v3"))?;

    assert_eq!(c.a.channel(&port, &link.channel_a)?.upgrade_sequence, 2);
    let upgrade = c
        .a
        .state
        .upgrade(&port, &link.channel_a)?
        .ok_or_else(|| anyhow::anyhow!("upgrade missing"))?;
    assert_eq!(upgrade.fields.version, "mock-v3");
    let receipt = c
        .a
        .state
        .upgrade_error(&port, &link.channel_a)?
        .ok_or_else(|| anyhow::anyhow!("no error receipt"))?;
    assert_eq!(receipt.sequence, 1);
    Ok(())
}

#[test]
fn init_rejects_an_unchanged_channel() -> Result<()> {
    let (mut c, link) = open(Order::Unordered)?;
    let before = c.a.state.clone();

    let err = c
        .upgrade_init(Side::A, &link, fields(&link, Side::A, Order::Unordered, MOCK_VERSION))
        .unwrap_err();
    assert!(matches!(err, IbcError::Upgrade(_)), "{err}");
    assert_eq!(c.a.state, before);

    let msg = c.upgrade_ack_msg(Side::A, &link);
    assert!(msg.is_err(), "B has no proposal to acknowledge");
    Ok(())
}

#[test]
fn forged_ack_proof_leaves_the_upgrade_in_place() -> Result<()> {
    let (mut c, link) = open(Order::Unordered)?;
    let port = mock_port();

    init_and_try(&mut c, &link, Order::Unordered)?;
    let mut msg = c.upgrade_ack_msg(Side::A, &link)?;
    msg.counterparty_upgrade.fields.version = "mock-v9".into();

    let before = c.a.state.clone();
    let err = c
        .deliver(Side::A, MsgEnvelope::ChannelUpgradeAck(msg))
        .unwrap_err();
    assert!(matches!(err, IbcError::ProofVerificationFailed { .. }), "{err}");
    assert_eq!(c.a.state, before);
    assert!(c.a.state.upgrade(&port, &link.channel_a)?.is_some());
    assert!(c.a.state.upgrade_error(&port, &link.channel_a)?.is_none());
    assert_eq!(c.a.module.calls().upgrade_restore, 0);

    assert_eq!(ack_on_a(&mut c, &link)?, ResponseResult::Success);
    Ok(())
}
