// Path: crates/ibc/src/channel/handshake.rs
//! Channel opening and closing handshakes.

use ioi_api::state::StateAccessor;
use ioi_types::error::IbcError;
use ioi_types::ibc::{
    channel_capability_name, ChannelCounterparty, ChannelEnd, ChannelId, ChannelState, IbcEvent,
    ModuleId, MsgChannelCloseConfirm, MsgChannelCloseInit, MsgChannelOpenAck,
    MsgChannelOpenConfirm, MsgChannelOpenInit, MsgChannelOpenTry, MsgResponse, Path, PortId,
    Sequence,
};

use super::{app_error, channel_connection, channel_module, open_connection, port_module};
use crate::capability::{core_module_id, CapabilityRegistry};
use crate::client::active_client;
use crate::connection::verify;
use crate::context::ExecCtx;
use crate::execution::in_branch;
use crate::store::IbcStore;

/// Allocates the channel id, stores the end, initialises its sequences and
/// hands the channel capability to `module_id`.
fn create_channel(
    state: &mut dyn StateAccessor,
    module_id: &ModuleId,
    port_id: &PortId,
    channel: &ChannelEnd,
) -> Result<ChannelId, IbcError> {
    let channel_id = ChannelId::new_indexed(state.next_counter(&Path::NextChannelSequence)?);
    state.set_channel(port_id, &channel_id, channel)?;
    state.set_next_sequence_send(port_id, &channel_id, Sequence(1))?;
    state.set_next_sequence_recv(port_id, &channel_id, Sequence(1))?;
    state.set_next_sequence_ack(port_id, &channel_id, Sequence(1))?;

    let name = channel_capability_name(port_id, &channel_id);
    let capability = CapabilityRegistry::new_capability(state, &core_module_id(), &name)?;
    CapabilityRegistry::claim(state, module_id, &capability, &name)?;
    Ok(channel_id)
}

fn set_version(
    state: &mut dyn StateAccessor,
    port_id: &PortId,
    channel_id: &ChannelId,
    version: &str,
) -> Result<(), IbcError> {
    let mut channel = state.channel(port_id, channel_id)?;
    channel.version = version.to_string();
    state.set_channel(port_id, channel_id, &channel)
}

pub(crate) fn chan_open_init(
    ctx: &mut ExecCtx<'_>,
    state: &mut dyn StateAccessor,
    msg: MsgChannelOpenInit,
) -> Result<MsgResponse, IbcError> {
    let module_id = port_module(&*state, &msg.port_id)?;
    let channel = ChannelEnd {
        state: ChannelState::Init,
        ordering: msg.ordering,
        counterparty: ChannelCounterparty::new(msg.counterparty_port_id.clone(), None),
        connection_hops: msg.connection_hops.clone(),
        version: msg.version.clone(),
        upgrade_sequence: 0,
    };
    let connection_id = channel.connection_id()?.clone();
    let connection = open_connection(&*state, &connection_id)?;
    connection.version()?.verify_supported_ordering(msg.ordering)?;
    active_client(&*state, &connection.client_id)?;

    let channel_id = in_branch(state, |branch| {
        create_channel(branch, &module_id, &msg.port_id, &channel)
    })?;

    let version = ctx
        .callback(&module_id, state, |module, cb| {
            module.on_chan_open_init(
                cb,
                msg.ordering,
                &msg.connection_hops,
                &msg.port_id,
                &channel_id,
                &channel.counterparty,
                &msg.version,
            )
        })?
        .map_err(|e| app_error(&msg.port_id, &channel_id, e))?;
    set_version(state, &msg.port_id, &channel_id, &version)?;

    ctx.emit(IbcEvent::OpenInitChannel {
        port_id: msg.port_id.clone(),
        channel_id: channel_id.clone(),
        connection_id,
        version: version.clone(),
    });
    tracing::info!(target: "ibc", port_id = %msg.port_id, channel_id = %channel_id, version = %version, "channel open init callback succeeded");
    Ok(MsgResponse::ChannelOpenInit {
        channel_id,
        version,
    })
}

pub(crate) fn chan_open_try(
    ctx: &mut ExecCtx<'_>,
    state: &mut dyn StateAccessor,
    msg: MsgChannelOpenTry,
) -> Result<MsgResponse, IbcError> {
    let module_id = port_module(&*state, &msg.port_id)?;
    let counterparty_channel_id = msg
        .counterparty
        .channel_id
        .clone()
        .ok_or_else(|| IbcError::InvalidMessage("counterparty channel id is required".into()))?;
    let channel = ChannelEnd {
        state: ChannelState::TryOpen,
        ordering: msg.ordering,
        counterparty: msg.counterparty.clone(),
        connection_hops: msg.connection_hops.clone(),
        version: msg.counterparty_version.clone(),
        upgrade_sequence: 0,
    };
    let connection = channel_connection(&*state, &channel)?;
    connection.version()?.verify_supported_ordering(msg.ordering)?;

    let expected = ChannelEnd {
        state: ChannelState::Init,
        ordering: msg.ordering,
        counterparty: ChannelCounterparty::new(msg.port_id.clone(), None),
        connection_hops: vec![connection.counterparty_connection_id()?.clone()],
        version: msg.counterparty_version.clone(),
        upgrade_sequence: 0,
    };
    verify::verify_channel_state(
        ctx,
        &*state,
        &connection,
        msg.proof_height,
        &msg.proof_init,
        &msg.counterparty.port_id,
        &counterparty_channel_id,
        &expected,
    )?;

    let channel_id = in_branch(state, |branch| {
        create_channel(branch, &module_id, &msg.port_id, &channel)
    })?;

    let version = ctx
        .callback(&module_id, state, |module, cb| {
            module.on_chan_open_try(
                cb,
                msg.ordering,
                &msg.connection_hops,
                &msg.port_id,
                &channel_id,
                &msg.counterparty,
                &msg.counterparty_version,
            )
        })?
        .map_err(|e| app_error(&msg.port_id, &channel_id, e))?;
    set_version(state, &msg.port_id, &channel_id, &version)?;

    ctx.emit(IbcEvent::OpenTryChannel {
        port_id: msg.port_id.clone(),
        channel_id: channel_id.clone(),
        counterparty_channel_id,
        version: version.clone(),
    });
    tracing::info!(target: "ibc", port_id = %msg.port_id, channel_id = %channel_id, version = %version, "channel open try callback succeeded");
    Ok(MsgResponse::ChannelOpenTry {
        channel_id,
        version,
    })
}

pub(crate) fn chan_open_ack(
    ctx: &mut ExecCtx<'_>,
    state: &mut dyn StateAccessor,
    msg: MsgChannelOpenAck,
) -> Result<MsgResponse, IbcError> {
    let mut channel = state.channel(&msg.port_id, &msg.channel_id)?;
    channel.verify_state(&[ChannelState::Init])?;
    let module_id = channel_module(&*state, &msg.port_id, &msg.channel_id)?;
    let connection = channel_connection(&*state, &channel)?;

    let expected = ChannelEnd {
        state: ChannelState::TryOpen,
        ordering: channel.ordering,
        counterparty: ChannelCounterparty::new(msg.port_id.clone(), Some(msg.channel_id.clone())),
        connection_hops: vec![connection.counterparty_connection_id()?.clone()],
        version: msg.counterparty_version.clone(),
        upgrade_sequence: 0,
    };
    verify::verify_channel_state(
        ctx,
        &*state,
        &connection,
        msg.proof_height,
        &msg.proof_try,
        &channel.counterparty.port_id,
        &msg.counterparty_channel_id,
        &expected,
    )?;

    channel.state = ChannelState::Open;
    channel.version = msg.counterparty_version.clone();
    channel.counterparty.channel_id = Some(msg.counterparty_channel_id.clone());
    state.set_channel(&msg.port_id, &msg.channel_id, &channel)?;

    ctx.callback(&module_id, state, |module, cb| {
        module.on_chan_open_ack(
            cb,
            &msg.port_id,
            &msg.channel_id,
            &msg.counterparty_channel_id,
            &msg.counterparty_version,
        )
    })?
    .map_err(|e| app_error(&msg.port_id, &msg.channel_id, e))?;

    ctx.emit(IbcEvent::OpenAckChannel {
        port_id: msg.port_id.clone(),
        channel_id: msg.channel_id.clone(),
    });
    tracing::info!(target: "ibc", port_id = %msg.port_id, channel_id = %msg.channel_id, "channel open (ack)");
    Ok(MsgResponse::ChannelOpenAck)
}

pub(crate) fn chan_open_confirm(
    ctx: &mut ExecCtx<'_>,
    state: &mut dyn StateAccessor,
    msg: MsgChannelOpenConfirm,
) -> Result<MsgResponse, IbcError> {
    let mut channel = state.channel(&msg.port_id, &msg.channel_id)?;
    channel.verify_state(&[ChannelState::TryOpen])?;
    let module_id = channel_module(&*state, &msg.port_id, &msg.channel_id)?;
    let connection = channel_connection(&*state, &channel)?;

    let expected = ChannelEnd {
        state: ChannelState::Open,
        ordering: channel.ordering,
        counterparty: ChannelCounterparty::new(msg.port_id.clone(), Some(msg.channel_id.clone())),
        connection_hops: vec![connection.counterparty_connection_id()?.clone()],
        version: channel.version.clone(),
        upgrade_sequence: 0,
    };
    verify::verify_channel_state(
        ctx,
        &*state,
        &connection,
        msg.proof_height,
        &msg.proof_ack,
        &channel.counterparty.port_id,
        channel.counterparty_channel_id()?,
        &expected,
    )?;

    channel.state = ChannelState::Open;
    state.set_channel(&msg.port_id, &msg.channel_id, &channel)?;

    ctx.callback(&module_id, state, |module, cb| {
        module.on_chan_open_confirm(cb, &msg.port_id, &msg.channel_id)
    })?
    .map_err(|e| app_error(&msg.port_id, &msg.channel_id, e))?;

    ctx.emit(IbcEvent::OpenConfirmChannel {
        port_id: msg.port_id.clone(),
        channel_id: msg.channel_id.clone(),
    });
    tracing::info!(target: "ibc", port_id = %msg.port_id, channel_id = %msg.channel_id, "channel open (confirm)");
    Ok(MsgResponse::ChannelOpenConfirm)
}

fn require_not_closed(channel: &ChannelEnd) -> Result<(), IbcError> {
    if channel.state == ChannelState::Closed {
        return Err(IbcError::InvalidState("channel is already closed".into()));
    }
    Ok(())
}

fn close(
    state: &mut dyn StateAccessor,
    port_id: &PortId,
    channel_id: &ChannelId,
    mut channel: ChannelEnd,
) -> Result<(), IbcError> {
    channel.state = ChannelState::Closed;
    state.set_channel(port_id, channel_id, &channel)?;
    state.delete_upgrade_info(port_id, channel_id)
}

pub(crate) fn chan_close_init(
    ctx: &mut ExecCtx<'_>,
    state: &mut dyn StateAccessor,
    msg: MsgChannelCloseInit,
) -> Result<MsgResponse, IbcError> {
    let channel = state.channel(&msg.port_id, &msg.channel_id)?;
    require_not_closed(&channel)?;
    let module_id = channel_module(&*state, &msg.port_id, &msg.channel_id)?;
    channel_connection(&*state, &channel)?;

    ctx.callback(&module_id, state, |module, cb| {
        module.on_chan_close_init(cb, &msg.port_id, &msg.channel_id)
    })?
    .map_err(|e| app_error(&msg.port_id, &msg.channel_id, e))?;
    close(state, &msg.port_id, &msg.channel_id, channel)?;

    ctx.emit(IbcEvent::CloseInitChannel {
        port_id: msg.port_id.clone(),
        channel_id: msg.channel_id.clone(),
    });
    tracing::info!(target: "ibc", port_id = %msg.port_id, channel_id = %msg.channel_id, "channel closed (init)");
    Ok(MsgResponse::ChannelCloseInit)
}

pub(crate) fn chan_close_confirm(
    ctx: &mut ExecCtx<'_>,
    state: &mut dyn StateAccessor,
    msg: MsgChannelCloseConfirm,
) -> Result<MsgResponse, IbcError> {
    let channel = state.channel(&msg.port_id, &msg.channel_id)?;
    require_not_closed(&channel)?;
    let module_id = channel_module(&*state, &msg.port_id, &msg.channel_id)?;
    let connection = channel_connection(&*state, &channel)?;

    let expected = ChannelEnd {
        state: ChannelState::Closed,
        ordering: channel.ordering,
        counterparty: ChannelCounterparty::new(msg.port_id.clone(), Some(msg.channel_id.clone())),
        connection_hops: vec![connection.counterparty_connection_id()?.clone()],
        version: channel.version.clone(),
        upgrade_sequence: msg.counterparty_upgrade_sequence,
    };
    verify::verify_channel_state(
        ctx,
        &*state,
        &connection,
        msg.proof_height,
        &msg.proof_init,
        &channel.counterparty.port_id,
        channel.counterparty_channel_id()?,
        &expected,
    )?;

    ctx.callback(&module_id, state, |module, cb| {
        module.on_chan_close_confirm(cb, &msg.port_id, &msg.channel_id)
    })?
    .map_err(|e| app_error(&msg.port_id, &msg.channel_id, e))?;
    close(state, &msg.port_id, &msg.channel_id, channel)?;

    ctx.emit(IbcEvent::CloseConfirmChannel {
        port_id: msg.port_id.clone(),
        channel_id: msg.channel_id.clone(),
    });
    tracing::info!(target: "ibc", port_id = %msg.port_id, channel_id = %msg.channel_id, "channel closed (confirm)");
    Ok(MsgResponse::ChannelCloseConfirm)
}
