// Path: crates/ibc/tests/connection_handshake.rs

use anyhow::Result;
use ioi_ibc::IbcStore;
use ioi_test_utils::{init_tracing, Coordinator, MockHeader, Side, RELAYER};
use ioi_types::codec::to_bytes_canonical;
use ioi_types::error::IbcError;
use ioi_types::ibc::{
    ClientId, CommitmentPrefix, ConnectionCounterparty, ConnectionState, IbcEvent,
    MsgConnectionOpenInit, MsgEnvelope, MsgSubmitMisbehaviour, MsgUpdateClient, Order, Version,
};

#[test]
fn four_step_handshake_opens_both_ends() -> Result<()> {
    init_tracing();
    let mut c = Coordinator::new()?;

    let (conn_a, conn_b) = c.setup_connection()?;

    let end_a = c.a.connection(&conn_a)?;
    let end_b = c.b.connection(&conn_b)?;
    assert_eq!(end_a.state, ConnectionState::Open);
    assert_eq!(end_b.state, ConnectionState::Open);
    assert_eq!(end_a.counterparty.connection_id.as_ref(), Some(&conn_b));
    assert_eq!(end_b.counterparty.connection_id.as_ref(), Some(&conn_a));
    assert_eq!(end_a.versions, vec![Version::default()]);
    assert_eq!(end_a.versions, end_b.versions);
    assert_eq!(c.a.state.client_connections(&c.client_a)?, vec![conn_a]);
    Ok(())
}

#[test]
fn try_with_forged_proof_is_rejected_without_side_effects() -> Result<()> {
    let mut c = Coordinator::new()?;
    let conn_a = c.conn_open_init(Side::A)?;
    let mut msg = c.conn_open_try_msg(Side::B, &conn_a)?;
    msg.proof_init = vec![0xde, 0xad];
    let before = c.b.state.clone();

    let err = c
        .deliver(Side::B, MsgEnvelope::ConnectionOpenTry(msg))
        .unwrap_err();

    assert!(matches!(err, IbcError::ProofVerificationFailed { .. }), "{err}");
    assert_eq!(c.b.state, before);
    Ok(())
}

#[test]
fn try_rejects_a_consensus_height_from_the_future() -> Result<()> {
    let mut c = Coordinator::new()?;
    let conn_a = c.conn_open_init(Side::A)?;
    let mut msg = c.conn_open_try_msg(Side::B, &conn_a)?;
    msg.consensus_height = c.b.height();

    let err = c
        .deliver(Side::B, MsgEnvelope::ConnectionOpenTry(msg))
        .unwrap_err();
    assert!(matches!(err, IbcError::InvalidState(_)), "{err}");
    Ok(())
}

#[test]
fn ack_requires_init_state() -> Result<()> {
    let mut c = Coordinator::new()?;
    let (conn_a, conn_b) = c.setup_connection()?;

    let msg = c.conn_open_ack_msg(Side::A, &conn_a, &conn_b)?;
    let err = c
        .deliver(Side::A, MsgEnvelope::ConnectionOpenAck(msg))
        .unwrap_err();
    assert_eq!(
        err,
        IbcError::InvalidConnectionState {
            expected: ConnectionState::Init,
            actual: ConnectionState::Open,
        }
    );
    Ok(())
}

#[test]
fn init_rejects_unknown_client_and_unsupported_version() -> Result<()> {
    let mut c = Coordinator::new()?;
    let template = MsgConnectionOpenInit {
        client_id: ClientId::new("9999-mock-42")?,
        counterparty: ConnectionCounterparty {
            client_id: c.client_b.clone(),
            connection_id: None,
            prefix: CommitmentPrefix::new("ibc")?,
        },
        version: None,
        delay_period: 0,
        signer: RELAYER.into(),
    };

    let err = c
        .deliver(Side::A, MsgEnvelope::ConnectionOpenInit(template.clone()))
        .unwrap_err();
    assert!(matches!(err, IbcError::ClientNotFound(_)), "{err}");

    let msg = MsgConnectionOpenInit {
        client_id: c.client_a.clone(),
        version: Some(Version {
            identifier: "2".into(),
            features: vec![Order::Unordered.as_feature().to_string()],
        }),
        ..template
    };
    let err = c
        .deliver(Side::A, MsgEnvelope::ConnectionOpenInit(msg))
        .unwrap_err();
    assert!(matches!(err, IbcError::UnsupportedVersion(_)), "{err}");
    Ok(())
}

#[test]
fn update_client_tracks_latest_height() -> Result<()> {
    let mut c = Coordinator::new()?;
    let h1 = c.update_client(Side::A)?;
    c.b.advance(3);
    let h2 = c.update_client(Side::A)?;
    assert!(h2 > h1);
    assert_eq!(c.a.state.client_state(&c.client_a)?.latest_height, h2);
    assert!(c.a.state.consensus_state(&c.client_a, h1)?.is_some());
    Ok(())
}

#[test]
fn conflicting_header_freezes_the_client() -> Result<()> {
    let mut c = Coordinator::new()?;
    let height = c.update_client(Side::A)?;
    let forged = MockHeader {
        height,
        timestamp: c.b.header(height)?.timestamp,
        root: vec![7; 32],
    };

    let outcome = c.deliver(
        Side::A,
        MsgEnvelope::SubmitMisbehaviour(MsgSubmitMisbehaviour {
            client_id: c.client_a.clone(),
            misbehaviour: to_bytes_canonical(&forged),
            signer: RELAYER.into(),
        }),
    )?;
    assert!(outcome
        .events
        .iter()
        .any(|e| matches!(e, IbcEvent::ClientMisbehaviour { .. })));
    assert!(c.a.state.client_state(&c.client_a)?.is_frozen());

    let err = c.conn_open_init(Side::A).unwrap_err();
    assert!(
        matches!(err.downcast_ref::<IbcError>(), Some(IbcError::ClientFrozen(_))),
        "{err}"
    );

    let header = c.b.header(height)?;
    let err = c
        .deliver(
            Side::A,
            MsgEnvelope::UpdateClient(MsgUpdateClient {
                client_id: c.client_a.clone(),
                client_message: to_bytes_canonical(&header),
                signer: RELAYER.into(),
            }),
        )
        .unwrap_err();
    assert!(matches!(err, IbcError::ClientFrozen(_)), "{err}");
    Ok(())
}

#[test]
fn honest_evidence_is_not_misbehaviour() -> Result<()> {
    let mut c = Coordinator::new()?;
    let height = c.update_client(Side::A)?;
    let header = c.b.header(height)?;
    let err = c
        .deliver(
            Side::A,
            MsgEnvelope::SubmitMisbehaviour(MsgSubmitMisbehaviour {
                client_id: c.client_a.clone(),
                misbehaviour: to_bytes_canonical(&header),
                signer: RELAYER.into(),
            }),
        )
        .unwrap_err();
    assert!(matches!(err, IbcError::ClientUpdateFailed { .. }), "{err}");
    assert!(!c.a.state.client_state(&c.client_a)?.is_frozen());
    Ok(())
}
