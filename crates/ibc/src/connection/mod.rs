// Path: crates/ibc/src/connection/mod.rs
//! Connection handshake (ICS-03).

pub(crate) mod verify;

use ioi_api::state::StateAccessor;
use ioi_types::error::IbcError;
use ioi_types::ibc::{
    is_supported_version, pick_version, ConnectionCounterparty, ConnectionEnd, ConnectionId,
    ConnectionState, IbcEvent, MsgConnectionOpenAck, MsgConnectionOpenConfirm,
    MsgConnectionOpenInit, MsgConnectionOpenTry, MsgResponse, Path,
};

use crate::client::active_client;
use crate::context::ExecCtx;
use crate::store::IbcStore;

fn expect_state(connection: &ConnectionEnd, expected: ConnectionState) -> Result<(), IbcError> {
    if connection.state == expected {
        Ok(())
    } else {
        Err(IbcError::InvalidConnectionState {
            expected,
            actual: connection.state,
        })
    }
}

fn allocate_connection_id(state: &mut dyn StateAccessor) -> Result<ConnectionId, IbcError> {
    let counter = state.next_counter(&Path::NextConnectionSequence)?;
    Ok(ConnectionId::new_indexed(counter))
}

pub(crate) fn conn_open_init(
    ctx: &mut ExecCtx<'_>,
    state: &mut dyn StateAccessor,
    msg: MsgConnectionOpenInit,
) -> Result<MsgResponse, IbcError> {
    active_client(&*state, &msg.client_id)?;
    let versions = match msg.version {
        Some(version) => {
            if !is_supported_version(&ctx.config.connection_versions, &version) {
                return Err(IbcError::UnsupportedVersion(version.identifier));
            }
            vec![version]
        }
        None => ctx.config.connection_versions.clone(),
    };

    let connection_id = allocate_connection_id(state)?;
    let connection = ConnectionEnd {
        state: ConnectionState::Init,
        client_id: msg.client_id.clone(),
        counterparty: msg.counterparty,
        versions,
        delay_period: msg.delay_period,
    };
    state.set_connection(&connection_id, &connection)?;
    state.add_client_connection(&msg.client_id, &connection_id)?;

    ctx.emit(IbcEvent::OpenInitConnection {
        connection_id: connection_id.clone(),
        client_id: msg.client_id.clone(),
    });
    tracing::info!(target: "ibc", connection_id = %connection_id, client_id = %msg.client_id, "connection init");
    Ok(MsgResponse::ConnectionOpenInit { connection_id })
}

pub(crate) fn conn_open_try(
    ctx: &mut ExecCtx<'_>,
    state: &mut dyn StateAccessor,
    msg: MsgConnectionOpenTry,
) -> Result<MsgResponse, IbcError> {
    active_client(&*state, &msg.client_id)?;
    if msg.consensus_height >= ctx.block.height {
        return Err(IbcError::InvalidState(format!(
            "consensus height {} is not below host height {}",
            msg.consensus_height, ctx.block.height
        )));
    }
    let counterparty_connection_id = msg
        .counterparty
        .connection_id
        .clone()
        .ok_or_else(|| IbcError::InvalidMessage("counterparty connection id is required".into()))?;
    let version = pick_version(&ctx.config.connection_versions, &msg.counterparty_versions)?;

    let connection = ConnectionEnd {
        state: ConnectionState::TryOpen,
        client_id: msg.client_id.clone(),
        counterparty: msg.counterparty.clone(),
        versions: vec![version],
        delay_period: msg.delay_period,
    };
    let expected = ConnectionEnd {
        state: ConnectionState::Init,
        client_id: msg.counterparty.client_id.clone(),
        counterparty: ConnectionCounterparty {
            client_id: msg.client_id.clone(),
            connection_id: None,
            prefix: ctx.commitment_prefix()?,
        },
        versions: msg.counterparty_versions.clone(),
        delay_period: msg.delay_period,
    };
    verify::verify_connection_state(
        ctx,
        &*state,
        &connection,
        msg.proof_height,
        &msg.proof_init,
        &counterparty_connection_id,
        &expected,
    )?;
    verify::verify_client_state(
        ctx,
        &*state,
        &connection,
        msg.proof_height,
        &msg.proof_client,
        &msg.client_state,
    )?;
    verify::verify_client_consensus_state(
        ctx,
        &*state,
        &connection,
        msg.proof_height,
        &msg.proof_consensus,
        msg.consensus_height,
        &msg.consensus_state,
    )?;

    let connection_id = allocate_connection_id(state)?;
    state.set_connection(&connection_id, &connection)?;
    state.add_client_connection(&msg.client_id, &connection_id)?;

    ctx.emit(IbcEvent::OpenTryConnection {
        connection_id: connection_id.clone(),
        client_id: msg.client_id.clone(),
        counterparty_connection_id: counterparty_connection_id.clone(),
    });
    tracing::info!(
        target: "ibc",
        connection_id = %connection_id,
        counterparty_connection_id = %counterparty_connection_id,
        "connection try"
    );
    Ok(MsgResponse::ConnectionOpenTry { connection_id })
}

pub(crate) fn conn_open_ack(
    ctx: &mut ExecCtx<'_>,
    state: &mut dyn StateAccessor,
    msg: MsgConnectionOpenAck,
) -> Result<MsgResponse, IbcError> {
    let mut connection = state.connection(&msg.connection_id)?;
    expect_state(&connection, ConnectionState::Init)?;
    if !is_supported_version(&connection.versions, &msg.version) {
        return Err(IbcError::UnsupportedVersion(msg.version.identifier));
    }
    if msg.consensus_height >= ctx.block.height {
        return Err(IbcError::InvalidState(format!(
            "consensus height {} is not below host height {}",
            msg.consensus_height, ctx.block.height
        )));
    }

    let expected = ConnectionEnd {
        state: ConnectionState::TryOpen,
        client_id: connection.counterparty.client_id.clone(),
        counterparty: ConnectionCounterparty {
            client_id: connection.client_id.clone(),
            connection_id: Some(msg.connection_id.clone()),
            prefix: ctx.commitment_prefix()?,
        },
        versions: vec![msg.version.clone()],
        delay_period: connection.delay_period,
    };
    verify::verify_connection_state(
        ctx,
        &*state,
        &connection,
        msg.proof_height,
        &msg.proof_try,
        &msg.counterparty_connection_id,
        &expected,
    )?;
    verify::verify_client_state(
        ctx,
        &*state,
        &connection,
        msg.proof_height,
        &msg.proof_client,
        &msg.client_state,
    )?;
    verify::verify_client_consensus_state(
        ctx,
        &*state,
        &connection,
        msg.proof_height,
        &msg.proof_consensus,
        msg.consensus_height,
        &msg.consensus_state,
    )?;

    connection.state = ConnectionState::Open;
    connection.versions = vec![msg.version];
    connection.counterparty.connection_id = Some(msg.counterparty_connection_id.clone());
    state.set_connection(&msg.connection_id, &connection)?;

    ctx.emit(IbcEvent::OpenAckConnection {
        connection_id: msg.connection_id.clone(),
        counterparty_connection_id: msg.counterparty_connection_id,
    });
    tracing::info!(target: "ibc", connection_id = %msg.connection_id, "connection open (ack)");
    Ok(MsgResponse::ConnectionOpenAck)
}

pub(crate) fn conn_open_confirm(
    ctx: &mut ExecCtx<'_>,
    state: &mut dyn StateAccessor,
    msg: MsgConnectionOpenConfirm,
) -> Result<MsgResponse, IbcError> {
    let mut connection = state.connection(&msg.connection_id)?;
    expect_state(&connection, ConnectionState::TryOpen)?;
    let counterparty_connection_id = connection.counterparty_connection_id()?.clone();

    let expected = ConnectionEnd {
        state: ConnectionState::Open,
        client_id: connection.counterparty.client_id.clone(),
        counterparty: ConnectionCounterparty {
            client_id: connection.client_id.clone(),
            connection_id: Some(msg.connection_id.clone()),
            prefix: ctx.commitment_prefix()?,
        },
        versions: connection.versions.clone(),
        delay_period: connection.delay_period,
    };
    verify::verify_connection_state(
        ctx,
        &*state,
        &connection,
        msg.proof_height,
        &msg.proof_ack,
        &counterparty_connection_id,
        &expected,
    )?;

    connection.state = ConnectionState::Open;
    state.set_connection(&msg.connection_id, &connection)?;

    ctx.emit(IbcEvent::OpenConfirmConnection {
        connection_id: msg.connection_id.clone(),
    });
    tracing::info!(target: "ibc", connection_id = %msg.connection_id, "connection open (confirm)");
    Ok(MsgResponse::ConnectionOpenConfirm)
}
