// Path: crates/ibc/tests/channel_handshake.rs

use anyhow::Result;
use ioi_ibc::{CapabilityRegistry, IbcStore};
use ioi_test_utils::mock_module::{channel_sentinel_key, MOCK_MODULE_ID, MOCK_VERSION};
use ioi_test_utils::{init_tracing, mock_port, Coordinator, Side};
use ioi_types::error::IbcError;
use ioi_types::ibc::{
    channel_capability_name, ChannelState, ConnectionState, IbcEvent, ModuleId, MsgEnvelope,
    Order, PortId, Sequence,
};

#[test]
fn unordered_handshake_opens_both_ends() -> Result<()> {
    init_tracing();
    let mut c = Coordinator::new()?;
    let link = c.setup_channel(Order::Unordered)?;
    let port = mock_port();

    let end_a = c.a.channel(&port, &link.channel_a)?;
    let end_b = c.b.channel(&port, &link.channel_b)?;
    assert_eq!(end_a.state, ChannelState::Open);
    assert_eq!(end_b.state, ChannelState::Open);
    assert_eq!(end_a.counterparty.channel_id.as_ref(), Some(&link.channel_b));
    assert_eq!(end_b.counterparty.channel_id.as_ref(), Some(&link.channel_a));
    assert_eq!(end_a.version, MOCK_VERSION);
    assert_eq!(end_b.version, MOCK_VERSION);
    assert_eq!(end_a.connection_hops, vec![link.connection_a.clone()]);

    for (chain, channel) in [(&c.a, &link.channel_a), (&c.b, &link.channel_b)] {
        assert_eq!(chain.state.next_sequence_send(&port, channel)?, Sequence(1));
        assert_eq!(chain.state.next_sequence_recv(&port, channel)?, Sequence(1));
        assert_eq!(chain.state.next_sequence_ack(&port, channel)?, Sequence(1));
        let owners = CapabilityRegistry::lookup_modules(
            &chain.state,
            &channel_capability_name(&port, channel),
        )?;
        assert_eq!(owners, vec![ModuleId::new(MOCK_MODULE_ID)]);
    }

    let calls_a = c.a.module.calls();
    let calls_b = c.b.module.calls();
    assert_eq!((calls_a.open_init, calls_a.open_ack), (1, 1));
    assert_eq!((calls_b.open_try, calls_b.open_confirm), (1, 1));
    Ok(())
}

#[test]
fn ordered_handshake_keeps_ordering() -> Result<()> {
    let mut c = Coordinator::new()?;
    let link = c.setup_channel(Order::Ordered)?;
    assert_eq!(c.a.channel(&mock_port(), &link.channel_a)?.ordering, Order::Ordered);
    assert_eq!(c.b.channel(&mock_port(), &link.channel_b)?.ordering, Order::Ordered);
    Ok(())
}

#[test]
fn module_chosen_version_is_negotiated() -> Result<()> {
    let mut c = Coordinator::new()?;
    c.a.module
        .configure(|cfg| cfg.open_init_version = Some("mock-custom".into()));
    let link = c.setup_channel(Order::Unordered)?;
    assert_eq!(c.a.channel(&mock_port(), &link.channel_a)?.version, "mock-custom");
    assert_eq!(c.b.channel(&mock_port(), &link.channel_b)?.version, "mock-custom");
    Ok(())
}

#[test]
fn rejected_init_callback_leaves_no_channel() -> Result<()> {
    let mut c = Coordinator::new()?;
    let (conn_a, _) = c.setup_connection()?;
    c.a.module.configure(|cfg| cfg.fail_open_init = true);
    let before = c.a.state.clone();

    let msg = c.chan_open_init_msg(&conn_a, Order::Unordered, MOCK_VERSION);
    let err = c.deliver(Side::A, MsgEnvelope::ChannelOpenInit(msg)).unwrap_err();

    assert!(matches!(err, IbcError::AppCallback { .. }), "{err}");
    assert_eq!(c.a.state, before, "no channel, sequence or capability may survive");
    assert_eq!(c.a.module.calls().open_init, 1);
    Ok(())
}

#[test]
fn init_requires_an_open_connection_and_a_bound_port() -> Result<()> {
    let mut c = Coordinator::new()?;
    let conn_a = c.conn_open_init(Side::A)?;

    let msg = c.chan_open_init_msg(&conn_a, Order::Unordered, MOCK_VERSION);
    let err = c
        .deliver(Side::A, MsgEnvelope::ChannelOpenInit(msg.clone()))
        .unwrap_err();
    assert_eq!(
        err,
        IbcError::InvalidConnectionState {
            expected: ConnectionState::Open,
            actual: ConnectionState::Init,
        }
    );

    let mut msg = msg;
    msg.port_id = PortId::new("unbound")?;
    let err = c.deliver(Side::A, MsgEnvelope::ChannelOpenInit(msg)).unwrap_err();
    assert!(matches!(err, IbcError::PortNotBound(_)), "{err}");
    Ok(())
}

#[test]
fn try_with_mismatched_version_fails_proof() -> Result<()> {
    let mut c = Coordinator::new()?;
    let (conn_a, conn_b) = c.setup_connection()?;
    let channel_a = c.chan_open_init(Side::A, &conn_a, Order::Unordered)?;
    let mut msg = c.chan_open_try_msg(Side::B, &conn_b, &channel_a)?;
    msg.counterparty_version = "something-else".into();

    let err = c.deliver(Side::B, MsgEnvelope::ChannelOpenTry(msg)).unwrap_err();
    assert!(matches!(err, IbcError::ProofVerificationFailed { .. }), "{err}");
    assert_eq!(c.b.module.calls().open_try, 0);
    Ok(())
}

#[test]
fn close_handshake_closes_both_ends() -> Result<()> {
    let mut c = Coordinator::new()?;
    let link = c.setup_channel(Order::Unordered)?;
    let port = mock_port();

    let outcome = c.chan_close_init(Side::A, &link.channel_a)?;
    assert!(outcome
        .events
        .iter()
        .any(|e| matches!(e, IbcEvent::CloseInitChannel { .. })));
    assert_eq!(c.a.channel(&port, &link.channel_a)?.state, ChannelState::Closed);

    let msg = c.chan_close_confirm_msg(Side::B, &link.channel_b)?;
    c.deliver(Side::B, MsgEnvelope::ChannelCloseConfirm(msg))?;
    assert_eq!(c.b.channel(&port, &link.channel_b)?.state, ChannelState::Closed);
    assert!(c.b.has_key(&channel_sentinel_key("close_confirm", &port, &link.channel_b))?);

    let err = c.chan_close_init(Side::A, &link.channel_a).unwrap_err();
    assert!(matches!(err, IbcError::InvalidState(_)), "{err}");
    Ok(())
}

#[test]
fn module_can_refuse_to_close() -> Result<()> {
    let mut c = Coordinator::new()?;
    let link = c.setup_channel(Order::Unordered)?;
    c.a.module.configure(|cfg| cfg.fail_close_init = true);

    let err = c.chan_close_init(Side::A, &link.channel_a).unwrap_err();
    assert!(matches!(err, IbcError::AppCallback { .. }), "{err}");
    assert_eq!(c.a.channel(&mock_port(), &link.channel_a)?.state, ChannelState::Open);
    Ok(())
}

#[test]
fn close_confirm_requires_counterparty_closed() -> Result<()> {
    let mut c = Coordinator::new()?;
    let link = c.setup_channel(Order::Unordered)?;
    let msg = c.chan_close_confirm_msg(Side::B, &link.channel_b)?;
    let err = c.deliver(Side::B, MsgEnvelope::ChannelCloseConfirm(msg)).unwrap_err();
    assert!(matches!(err, IbcError::ProofVerificationFailed { .. }), "{err}");
    Ok(())
}

#[test]
fn binding_a_port_twice_is_rejected() -> Result<()> {
    let mut c = Coordinator::new()?;
    let chain = &mut c.a;
    let err = chain
        .core
        .bind_port(&mut chain.state, &mock_port(), &ModuleId::new(MOCK_MODULE_ID))
        .unwrap_err();
    assert!(matches!(err, IbcError::CapabilityAlreadyClaimed(_)), "{err}");

    let err = chain
        .core
        .bind_port(&mut chain.state, &PortId::new("transfer")?, &ModuleId::new("nobody"))
        .unwrap_err();
    assert!(matches!(err, IbcError::RouteNotFound(_)), "{err}");
    Ok(())
}
