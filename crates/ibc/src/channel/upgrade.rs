// Path: crates/ibc/src/channel/upgrade.rs
//! In-place channel upgrades.
//!
//! Both ends store a proposal, drain the packets sent under the old
//! parameters (FLUSHING, then FLUSHCOMPLETE) and switch over together. A
//! rejected or timed-out attempt restores the pre-upgrade channel and leaves
//! an error receipt the counterparty can prove to cancel its side.

use ioi_api::state::StateAccessor;
use ioi_types::error::IbcError;
use ioi_types::ibc::{
    ChannelCounterparty, ChannelEnd, ChannelId, ChannelState, ConnectionEnd, ConnectionId,
    ErrorReceipt, Height, IbcEvent, ModuleId, MsgChannelUpgradeAck, MsgChannelUpgradeCancel,
    MsgChannelUpgradeConfirm, MsgChannelUpgradeInit, MsgChannelUpgradeOpen,
    MsgChannelUpgradeTimeout, MsgChannelUpgradeTry, MsgResponse, Order, PortId, ResponseResult,
    Sequence, Timeout, Upgrade, UpgradeFields,
};

use super::{app_error, channel_connection, channel_module, open_connection};
use crate::client::timestamp_at_height;
use crate::connection::verify;
use crate::context::ExecCtx;
use crate::store::IbcStore;

/// Which application callback an abort notifies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AbortReason {
    Restore,
    Timeout,
}

fn require_upgrade(
    state: &dyn StateAccessor,
    port_id: &PortId,
    channel_id: &ChannelId,
) -> Result<Upgrade, IbcError> {
    state
        .upgrade(port_id, channel_id)?
        .ok_or_else(|| IbcError::UpgradeNotFound {
            port_id: port_id.to_string(),
            channel_id: channel_id.to_string(),
        })
}

fn single_hop(fields: &UpgradeFields) -> Result<&ConnectionId, IbcError> {
    match fields.connection_hops.as_slice() {
        [hop] => Ok(hop),
        hops => Err(IbcError::Upgrade(format!(
            "upgrade must have exactly one connection hop, found {}",
            hops.len()
        ))),
    }
}

/// Checks that the connection an upgrade moves to is usable for its ordering.
fn upgrade_connection(
    state: &dyn StateAccessor,
    fields: &UpgradeFields,
) -> Result<ConnectionEnd, IbcError> {
    let connection = open_connection(state, single_hop(fields)?)?;
    connection.version()?.verify_supported_ordering(fields.ordering)?;
    Ok(connection)
}

/// Returns why the two proposals cannot be applied together, if they cannot.
fn incompatibility(
    state: &dyn StateAccessor,
    ours: &UpgradeFields,
    theirs: &UpgradeFields,
) -> Result<Option<String>, IbcError> {
    if ours.ordering != theirs.ordering {
        return Ok(Some(format!(
            "ordering mismatch: {} != {}",
            ours.ordering, theirs.ordering
        )));
    }
    if ours.version != theirs.version {
        return Ok(Some(format!(
            "version mismatch: {} != {}",
            ours.version, theirs.version
        )));
    }
    let connection = upgrade_connection(state, ours)?;
    let expected_hop = connection.counterparty_connection_id()?;
    match theirs.connection_hops.as_slice() {
        [hop] if hop == expected_hop => Ok(None),
        hops => Ok(Some(format!(
            "counterparty hops {hops:?} do not map to {expected_hop}"
        ))),
    }
}

/// The channel end the counterparty must store, given its state and upgrade sequence.
fn counterparty_channel(
    channel: &ChannelEnd,
    connection: &ConnectionEnd,
    port_id: &PortId,
    channel_id: &ChannelId,
    state: ChannelState,
    upgrade_sequence: u64,
) -> Result<ChannelEnd, IbcError> {
    Ok(ChannelEnd {
        state,
        ordering: channel.ordering,
        counterparty: ChannelCounterparty::new(port_id.clone(), Some(channel_id.clone())),
        connection_hops: vec![connection.counterparty_connection_id()?.clone()],
        version: channel.version.clone(),
        upgrade_sequence,
    })
}

fn emit_step(
    ctx: &mut ExecCtx<'_>,
    step: &str,
    port_id: &PortId,
    channel_id: &ChannelId,
    upgrade_sequence: u64,
) {
    ctx.emit(IbcEvent::ChannelUpgrade {
        step: step.to_string(),
        port_id: port_id.clone(),
        channel_id: channel_id.clone(),
        upgrade_sequence,
    });
    tracing::info!(target: "ibc", port_id = %port_id, channel_id = %channel_id, upgrade_sequence, step, "channel upgrade step");
}

/// Moves the channel to FLUSHING and stamps the upgrade's timeout and flush
/// boundary.
fn start_flushing(
    ctx: &ExecCtx<'_>,
    state: &mut dyn StateAccessor,
    port_id: &PortId,
    channel_id: &ChannelId,
    channel: &mut ChannelEnd,
    upgrade: &mut Upgrade,
) -> Result<(), IbcError> {
    let connection = channel_connection(&*state, channel)?;
    let latest_height = state.client_state(&connection.client_id)?.latest_height;
    let latest_timestamp = timestamp_at_height(ctx, &*state, &connection.client_id, latest_height)?;
    let offsets = &ctx.config.upgrade_timeout;
    let height = match offsets.height_offset {
        0 => Height::zero(),
        offset => latest_height.add(offset),
    };
    let timestamp = match offsets.timestamp_offset {
        0 => 0,
        offset => latest_timestamp.saturating_add(offset),
    };
    upgrade.timeout = Timeout::new(height, timestamp);
    upgrade.next_sequence_send = state.next_sequence_send(port_id, channel_id)?;

    channel.state = ChannelState::Flushing;
    state.set_channel(port_id, channel_id, channel)?;
    tracing::debug!(target: "ibc", port_id = %port_id, channel_id = %channel_id, next_sequence_send = %upgrade.next_sequence_send, "channel flushing");
    Ok(())
}

/// Restores the pre-upgrade channel, drops the proposals and writes an error
/// receipt for `upgrade_sequence`.
#[allow(clippy::too_many_arguments)]
fn abort(
    ctx: &mut ExecCtx<'_>,
    state: &mut dyn StateAccessor,
    module_id: &ModuleId,
    port_id: &PortId,
    channel_id: &ChannelId,
    upgrade_sequence: u64,
    message: String,
    reason: AbortReason,
) -> Result<(), IbcError> {
    if let Some(upgrade) = state.upgrade(port_id, channel_id)? {
        let mut restored = upgrade.prior_channel;
        restored.state = ChannelState::Open;
        restored.upgrade_sequence = upgrade_sequence;
        state.set_channel(port_id, channel_id, &restored)?;
    }
    state.delete_upgrade_info(port_id, channel_id)?;
    state.set_upgrade_error(
        port_id,
        channel_id,
        &ErrorReceipt {
            sequence: upgrade_sequence,
            message: message.clone(),
        },
    )?;

    ctx.callback(module_id, state, |module, cb| {
        match reason {
            AbortReason::Restore => module.on_chan_upgrade_restore(cb, port_id, channel_id),
            AbortReason::Timeout => module.on_chan_upgrade_timeout(cb, port_id, channel_id),
        }
        Ok(())
    })?
    .map_err(|e| app_error(port_id, channel_id, e))?;

    tracing::warn!(target: "ibc", port_id = %port_id, channel_id = %channel_id, upgrade_sequence, error = %message, "channel upgrade aborted");
    ctx.emit(IbcEvent::ChannelUpgradeError {
        port_id: port_id.clone(),
        channel_id: channel_id.clone(),
        upgrade_sequence,
        message,
    });
    Ok(())
}

/// Settles a FLUSHING channel after a packet left flight: aborts if the
/// counterparty's upgrade timed out, moves to FLUSHCOMPLETE once nothing is
/// left in flight.
pub(crate) fn handle_flush_state(
    ctx: &mut ExecCtx<'_>,
    state: &mut dyn StateAccessor,
    port_id: &PortId,
    channel_id: &ChannelId,
) -> Result<(), IbcError> {
    let mut channel = state.channel(port_id, channel_id)?;
    if channel.state != ChannelState::Flushing {
        return Ok(());
    }
    if let Some(counterparty_upgrade) = state.counterparty_upgrade(port_id, channel_id)? {
        if counterparty_upgrade
            .timeout
            .has_elapsed(ctx.block.height, ctx.block.timestamp)
        {
            let module_id = channel_module(&*state, port_id, channel_id)?;
            return abort(
                ctx,
                state,
                &module_id,
                port_id,
                channel_id,
                channel.upgrade_sequence,
                "counterparty upgrade timeout elapsed".into(),
                AbortReason::Restore,
            );
        }
    }
    if !state.has_inflight_packets(port_id, channel_id)? {
        channel.state = ChannelState::FlushComplete;
        state.set_channel(port_id, channel_id, &channel)?;
        tracing::debug!(target: "ibc", port_id = %port_id, channel_id = %channel_id, "channel flush complete");
    }
    Ok(())
}

pub(crate) fn upgrade_init(
    ctx: &mut ExecCtx<'_>,
    state: &mut dyn StateAccessor,
    msg: MsgChannelUpgradeInit,
) -> Result<MsgResponse, IbcError> {
    let (port_id, channel_id) = (&msg.port_id, &msg.channel_id);
    let mut channel = state.channel(port_id, channel_id)?;
    channel.verify_state(&[ChannelState::Open])?;
    let module_id = channel_module(&*state, port_id, channel_id)?;
    if msg.fields.matches_channel(&channel) {
        return Err(IbcError::Upgrade(
            "proposed fields are identical to the current channel".into(),
        ));
    }
    upgrade_connection(&*state, &msg.fields)?;

    if state.upgrade(port_id, channel_id)?.is_some() {
        state.set_upgrade_error(
            port_id,
            channel_id,
            &ErrorReceipt {
                sequence: channel.upgrade_sequence,
                message: "superseded by a new upgrade proposal".into(),
            },
        )?;
        state.delete_upgrade_info(port_id, channel_id)?;
    }

    let prior_channel = channel.clone();
    channel.upgrade_sequence = channel.upgrade_sequence.saturating_add(1);
    state.set_channel(port_id, channel_id, &channel)?;

    let mut fields = msg.fields;
    fields.version = ctx
        .callback(&module_id, state, |module, cb| {
            module.on_chan_upgrade_init(
                cb,
                port_id,
                channel_id,
                fields.ordering,
                &fields.connection_hops,
                &fields.version,
            )
        })?
        .map_err(|e| app_error(port_id, channel_id, e))?;

    let upgrade = Upgrade {
        fields,
        timeout: Timeout::default(),
        next_sequence_send: Sequence(0),
        prior_channel,
    };
    state.set_upgrade(port_id, channel_id, &upgrade)?;

    emit_step(ctx, "init", port_id, channel_id, channel.upgrade_sequence);
    Ok(MsgResponse::ChannelUpgradeInit {
        upgrade,
        upgrade_sequence: channel.upgrade_sequence,
    })
}

pub(crate) fn upgrade_try(
    ctx: &mut ExecCtx<'_>,
    state: &mut dyn StateAccessor,
    msg: MsgChannelUpgradeTry,
) -> Result<MsgResponse, IbcError> {
    let (port_id, channel_id) = (&msg.port_id, &msg.channel_id);
    let mut channel = state.channel(port_id, channel_id)?;
    channel.verify_state(&[ChannelState::Open])?;
    let module_id = channel_module(&*state, port_id, channel_id)?;
    let connection = channel_connection(&*state, &channel)?;

    let mut upgrade = match state.upgrade(port_id, channel_id)? {
        Some(existing) => {
            if existing.fields.connection_hops != msg.proposed_connection_hops {
                return Err(IbcError::Upgrade(
                    "proposed connection hops differ from the existing proposal".into(),
                ));
            }
            existing
        }
        None => {
            let fields = UpgradeFields {
                ordering: msg.counterparty_upgrade.fields.ordering,
                connection_hops: msg.proposed_connection_hops.clone(),
                version: msg.counterparty_upgrade.fields.version.clone(),
            };
            upgrade_connection(&*state, &fields)?;
            if msg.counterparty_upgrade_sequence > channel.upgrade_sequence {
                channel.upgrade_sequence = msg.counterparty_upgrade_sequence - 1;
            }
            let prior_channel = channel.clone();
            channel.upgrade_sequence = channel.upgrade_sequence.saturating_add(1);
            state.set_channel(port_id, channel_id, &channel)?;
            let upgrade = Upgrade {
                fields,
                timeout: Timeout::default(),
                next_sequence_send: Sequence(0),
                prior_channel,
            };
            state.set_upgrade(port_id, channel_id, &upgrade)?;
            upgrade
        }
    };

    let expected = counterparty_channel(
        &channel,
        &connection,
        port_id,
        channel_id,
        ChannelState::Open,
        msg.counterparty_upgrade_sequence,
    )?;
    let counterparty_channel_id = channel.counterparty_channel_id()?.clone();
    verify::verify_channel_state(
        ctx,
        &*state,
        &connection,
        msg.proof_height,
        &msg.proof_channel,
        &channel.counterparty.port_id,
        &counterparty_channel_id,
        &expected,
    )?;
    verify::verify_channel_upgrade(
        ctx,
        &*state,
        &connection,
        msg.proof_height,
        &msg.proof_upgrade,
        &channel.counterparty.port_id,
        &counterparty_channel_id,
        &msg.counterparty_upgrade,
    )?;

    let failed = |upgrade_sequence| MsgResponse::ChannelUpgradeTry {
        result: ResponseResult::Failure,
        upgrade: None,
        upgrade_sequence,
    };
    let rejection = match incompatibility(&*state, &upgrade.fields, &msg.counterparty_upgrade.fields)? {
        Some(reason) => Some(reason),
        None if msg.counterparty_upgrade_sequence < channel.upgrade_sequence => Some(format!(
            "counterparty upgrade sequence {} is behind {}",
            msg.counterparty_upgrade_sequence, channel.upgrade_sequence
        )),
        None => None,
    };
    if let Some(reason) = rejection {
        abort(
            ctx,
            state,
            &module_id,
            port_id,
            channel_id,
            channel.upgrade_sequence,
            reason,
            AbortReason::Restore,
        )?;
        return Ok(failed(channel.upgrade_sequence));
    }

    start_flushing(ctx, state, port_id, channel_id, &mut channel, &mut upgrade)?;
    let version = ctx.callback(&module_id, state, |module, cb| {
        module.on_chan_upgrade_try(
            cb,
            port_id,
            channel_id,
            upgrade.fields.ordering,
            &upgrade.fields.connection_hops,
            &msg.counterparty_upgrade.fields.version,
        )
    })?;
    match version {
        Ok(version) => upgrade.fields.version = version,
        Err(e) => {
            abort(
                ctx,
                state,
                &module_id,
                port_id,
                channel_id,
                channel.upgrade_sequence,
                format!("{e:#}"),
                AbortReason::Restore,
            )?;
            return Ok(failed(channel.upgrade_sequence));
        }
    }
    state.set_upgrade(port_id, channel_id, &upgrade)?;

    emit_step(ctx, "try", port_id, channel_id, channel.upgrade_sequence);
    Ok(MsgResponse::ChannelUpgradeTry {
        result: ResponseResult::Success,
        upgrade: Some(upgrade),
        upgrade_sequence: channel.upgrade_sequence,
    })
}

/// Checks shared by ACK and CONFIRM once the proofs verified.
fn counterparty_upgrade_rejection(
    ctx: &ExecCtx<'_>,
    state: &dyn StateAccessor,
    upgrade: &Upgrade,
    counterparty_upgrade: &Upgrade,
) -> Result<Option<String>, IbcError> {
    if let Some(reason) = incompatibility(state, &upgrade.fields, &counterparty_upgrade.fields)? {
        return Ok(Some(reason));
    }
    if counterparty_upgrade
        .timeout
        .has_elapsed(ctx.block.height, ctx.block.timestamp)
    {
        return Ok(Some("counterparty upgrade timeout elapsed".into()));
    }
    Ok(None)
}

#[allow(clippy::too_many_arguments)]
fn verify_counterparty_upgrade(
    ctx: &ExecCtx<'_>,
    state: &dyn StateAccessor,
    channel: &ChannelEnd,
    connection: &ConnectionEnd,
    port_id: &PortId,
    channel_id: &ChannelId,
    counterparty_state: ChannelState,
    counterparty_upgrade: &Upgrade,
    proof_channel: &[u8],
    proof_upgrade: &[u8],
    proof_height: Height,
) -> Result<(), IbcError> {
    let expected = counterparty_channel(
        channel,
        connection,
        port_id,
        channel_id,
        counterparty_state,
        channel.upgrade_sequence,
    )?;
    let counterparty_channel_id = channel.counterparty_channel_id()?;
    verify::verify_channel_state(
        ctx,
        state,
        connection,
        proof_height,
        proof_channel,
        &channel.counterparty.port_id,
        counterparty_channel_id,
        &expected,
    )?;
    verify::verify_channel_upgrade(
        ctx,
        state,
        connection,
        proof_height,
        proof_upgrade,
        &channel.counterparty.port_id,
        counterparty_channel_id,
        counterparty_upgrade,
    )
}

pub(crate) fn upgrade_ack(
    ctx: &mut ExecCtx<'_>,
    state: &mut dyn StateAccessor,
    msg: MsgChannelUpgradeAck,
) -> Result<MsgResponse, IbcError> {
    let (port_id, channel_id) = (&msg.port_id, &msg.channel_id);
    let mut channel = state.channel(port_id, channel_id)?;
    channel.verify_state(&[ChannelState::Open, ChannelState::Flushing])?;
    let module_id = channel_module(&*state, port_id, channel_id)?;
    let connection = channel_connection(&*state, &channel)?;
    let mut upgrade = require_upgrade(&*state, port_id, channel_id)?;

    verify_counterparty_upgrade(
        ctx,
        &*state,
        &channel,
        &connection,
        port_id,
        channel_id,
        ChannelState::Flushing,
        &msg.counterparty_upgrade,
        &msg.proof_channel,
        &msg.proof_upgrade,
        msg.proof_height,
    )?;

    if let Some(reason) =
        counterparty_upgrade_rejection(ctx, &*state, &upgrade, &msg.counterparty_upgrade)?
    {
        abort(
            ctx,
            state,
            &module_id,
            port_id,
            channel_id,
            channel.upgrade_sequence,
            reason,
            AbortReason::Restore,
        )?;
        return Ok(MsgResponse::ChannelUpgradeAck(ResponseResult::Failure));
    }

    if channel.state == ChannelState::Open {
        start_flushing(ctx, state, port_id, channel_id, &mut channel, &mut upgrade)?;
        state.set_upgrade(port_id, channel_id, &upgrade)?;
    }

    let accepted = ctx.callback(&module_id, state, |module, cb| {
        module.on_chan_upgrade_ack(
            cb,
            port_id,
            channel_id,
            &msg.counterparty_upgrade.fields.version,
        )
    })?;
    if let Err(e) = accepted {
        abort(
            ctx,
            state,
            &module_id,
            port_id,
            channel_id,
            channel.upgrade_sequence,
            format!("{e:#}"),
            AbortReason::Restore,
        )?;
        return Ok(MsgResponse::ChannelUpgradeAck(ResponseResult::Failure));
    }

    state.set_counterparty_upgrade(port_id, channel_id, &msg.counterparty_upgrade)?;
    if !state.has_inflight_packets(port_id, channel_id)? {
        channel.state = ChannelState::FlushComplete;
        state.set_channel(port_id, channel_id, &channel)?;
    }

    emit_step(ctx, "ack", port_id, channel_id, channel.upgrade_sequence);
    Ok(MsgResponse::ChannelUpgradeAck(ResponseResult::Success))
}

pub(crate) fn upgrade_confirm(
    ctx: &mut ExecCtx<'_>,
    state: &mut dyn StateAccessor,
    msg: MsgChannelUpgradeConfirm,
) -> Result<MsgResponse, IbcError> {
    let (port_id, channel_id) = (&msg.port_id, &msg.channel_id);
    let mut channel = state.channel(port_id, channel_id)?;
    channel.verify_state(&[ChannelState::Flushing])?;
    if !matches!(
        msg.counterparty_channel_state,
        ChannelState::Flushing | ChannelState::FlushComplete
    ) {
        return Err(IbcError::InvalidChannelState {
            expected: vec![ChannelState::Flushing, ChannelState::FlushComplete],
            actual: msg.counterparty_channel_state,
        });
    }
    let module_id = channel_module(&*state, port_id, channel_id)?;
    let connection = channel_connection(&*state, &channel)?;
    let upgrade = require_upgrade(&*state, port_id, channel_id)?;

    verify_counterparty_upgrade(
        ctx,
        &*state,
        &channel,
        &connection,
        port_id,
        channel_id,
        msg.counterparty_channel_state,
        &msg.counterparty_upgrade,
        &msg.proof_channel,
        &msg.proof_upgrade,
        msg.proof_height,
    )?;

    if let Some(reason) =
        counterparty_upgrade_rejection(ctx, &*state, &upgrade, &msg.counterparty_upgrade)?
    {
        abort(
            ctx,
            state,
            &module_id,
            port_id,
            channel_id,
            channel.upgrade_sequence,
            reason,
            AbortReason::Restore,
        )?;
        return Ok(MsgResponse::ChannelUpgradeConfirm(ResponseResult::Failure));
    }

    let accepted = ctx.callback(&module_id, state, |module, cb| {
        module.on_chan_upgrade_confirm(cb, port_id, channel_id)
    })?;
    if let Err(e) = accepted {
        abort(
            ctx,
            state,
            &module_id,
            port_id,
            channel_id,
            channel.upgrade_sequence,
            format!("{e:#}"),
            AbortReason::Restore,
        )?;
        return Ok(MsgResponse::ChannelUpgradeConfirm(ResponseResult::Failure));
    }

    state.set_counterparty_upgrade(port_id, channel_id, &msg.counterparty_upgrade)?;
    if !state.has_inflight_packets(port_id, channel_id)? {
        channel.state = ChannelState::FlushComplete;
        state.set_channel(port_id, channel_id, &channel)?;
    }
    emit_step(ctx, "confirm", port_id, channel_id, channel.upgrade_sequence);

    if channel.state == ChannelState::FlushComplete
        && msg.counterparty_channel_state == ChannelState::FlushComplete
    {
        open_upgraded_channel(ctx, state, &module_id, port_id, channel_id)?;
    }
    Ok(MsgResponse::ChannelUpgradeConfirm(ResponseResult::Success))
}

/// Switches a FLUSHCOMPLETE channel to its upgraded fields.
fn open_upgraded_channel(
    ctx: &mut ExecCtx<'_>,
    state: &mut dyn StateAccessor,
    module_id: &ModuleId,
    port_id: &PortId,
    channel_id: &ChannelId,
) -> Result<(), IbcError> {
    let mut channel = state.channel(port_id, channel_id)?;
    let upgrade = require_upgrade(&*state, port_id, channel_id)?;

    if channel.ordering == Order::Unordered && upgrade.fields.ordering == Order::Ordered {
        let counterparty_upgrade = state
            .counterparty_upgrade(port_id, channel_id)?
            .ok_or_else(|| IbcError::Upgrade("counterparty upgrade not recorded".into()))?;
        state.set_next_sequence_recv(port_id, channel_id, counterparty_upgrade.next_sequence_send)?;
        state.set_next_sequence_ack(port_id, channel_id, upgrade.next_sequence_send)?;
    }

    channel.state = ChannelState::Open;
    channel.ordering = upgrade.fields.ordering;
    channel.connection_hops = upgrade.fields.connection_hops.clone();
    channel.version = upgrade.fields.version.clone();
    state.set_channel(port_id, channel_id, &channel)?;
    state.delete_upgrade_info(port_id, channel_id)?;

    ctx.callback(module_id, state, |module, cb| {
        module.on_chan_upgrade_open(
            cb,
            port_id,
            channel_id,
            channel.ordering,
            &channel.connection_hops,
            &channel.version,
        );
        Ok(())
    })?
    .map_err(|e| app_error(port_id, channel_id, e))?;

    emit_step(ctx, "open", port_id, channel_id, channel.upgrade_sequence);
    Ok(())
}

pub(crate) fn upgrade_open(
    ctx: &mut ExecCtx<'_>,
    state: &mut dyn StateAccessor,
    msg: MsgChannelUpgradeOpen,
) -> Result<MsgResponse, IbcError> {
    let (port_id, channel_id) = (&msg.port_id, &msg.channel_id);
    let channel = state.channel(port_id, channel_id)?;
    channel.verify_state(&[ChannelState::FlushComplete])?;
    let module_id = channel_module(&*state, port_id, channel_id)?;
    let connection = channel_connection(&*state, &channel)?;
    let upgrade = require_upgrade(&*state, port_id, channel_id)?;

    let expected = match msg.counterparty_channel_state {
        ChannelState::FlushComplete => {
            if msg.counterparty_upgrade_sequence != channel.upgrade_sequence {
                return Err(IbcError::Upgrade(format!(
                    "counterparty upgrade sequence {} does not match {}",
                    msg.counterparty_upgrade_sequence, channel.upgrade_sequence
                )));
            }
            counterparty_channel(
                &channel,
                &connection,
                port_id,
                channel_id,
                ChannelState::FlushComplete,
                channel.upgrade_sequence,
            )?
        }
        ChannelState::Open => {
            if msg.counterparty_upgrade_sequence < channel.upgrade_sequence {
                return Err(IbcError::Upgrade(format!(
                    "counterparty upgrade sequence {} is behind {}",
                    msg.counterparty_upgrade_sequence, channel.upgrade_sequence
                )));
            }
            let upgraded_connection = upgrade_connection(&*state, &upgrade.fields)?;
            ChannelEnd {
                state: ChannelState::Open,
                ordering: upgrade.fields.ordering,
                counterparty: ChannelCounterparty::new(port_id.clone(), Some(channel_id.clone())),
                connection_hops: vec![upgraded_connection.counterparty_connection_id()?.clone()],
                version: upgrade.fields.version.clone(),
                upgrade_sequence: msg.counterparty_upgrade_sequence,
            }
        }
        actual => {
            return Err(IbcError::InvalidChannelState {
                expected: vec![ChannelState::FlushComplete, ChannelState::Open],
                actual,
            })
        }
    };
    verify::verify_channel_state(
        ctx,
        &*state,
        &connection,
        msg.proof_height,
        &msg.proof_channel,
        &channel.counterparty.port_id,
        channel.counterparty_channel_id()?,
        &expected,
    )?;

    open_upgraded_channel(ctx, state, &module_id, port_id, channel_id)?;
    Ok(MsgResponse::ChannelUpgradeOpen)
}

pub(crate) fn upgrade_timeout(
    ctx: &mut ExecCtx<'_>,
    state: &mut dyn StateAccessor,
    msg: MsgChannelUpgradeTimeout,
) -> Result<MsgResponse, IbcError> {
    let (port_id, channel_id) = (&msg.port_id, &msg.channel_id);
    let channel = state.channel(port_id, channel_id)?;
    channel.verify_state(&[ChannelState::Flushing, ChannelState::FlushComplete])?;
    let module_id = channel_module(&*state, port_id, channel_id)?;
    let connection = channel_connection(&*state, &channel)?;
    let upgrade = require_upgrade(&*state, port_id, channel_id)?;

    let timestamp = timestamp_at_height(ctx, &*state, &connection.client_id, msg.proof_height)?;
    if !upgrade.timeout.has_elapsed(msg.proof_height, timestamp) {
        return Err(IbcError::Upgrade(format!(
            "upgrade timeout not reached at counterparty height {} (timestamp {timestamp})",
            msg.proof_height
        )));
    }
    let counterparty = &msg.counterparty_channel;
    match counterparty.state {
        ChannelState::Flushing => {}
        ChannelState::Open if counterparty.upgrade_sequence < channel.upgrade_sequence => {}
        ChannelState::Open => {
            return Err(IbcError::Upgrade(
                "counterparty already opened the upgraded channel".into(),
            ))
        }
        actual => {
            return Err(IbcError::InvalidChannelState {
                expected: vec![ChannelState::Open, ChannelState::Flushing],
                actual,
            })
        }
    }
    verify::verify_channel_state(
        ctx,
        &*state,
        &connection,
        msg.proof_height,
        &msg.proof_channel,
        &channel.counterparty.port_id,
        channel.counterparty_channel_id()?,
        counterparty,
    )?;

    abort(
        ctx,
        state,
        &module_id,
        port_id,
        channel_id,
        channel.upgrade_sequence,
        "upgrade timed out".into(),
        AbortReason::Timeout,
    )?;
    Ok(MsgResponse::ChannelUpgradeTimeout)
}

pub(crate) fn upgrade_cancel(
    ctx: &mut ExecCtx<'_>,
    state: &mut dyn StateAccessor,
    msg: MsgChannelUpgradeCancel,
) -> Result<MsgResponse, IbcError> {
    let (port_id, channel_id) = (&msg.port_id, &msg.channel_id);
    let channel = state.channel(port_id, channel_id)?;
    let module_id = channel_module(&*state, port_id, channel_id)?;
    let connection = channel_connection(&*state, &channel)?;
    require_upgrade(&*state, port_id, channel_id)?;

    let receipt = &msg.error_receipt;
    if receipt.sequence < channel.upgrade_sequence {
        return Err(IbcError::Upgrade(format!(
            "error receipt sequence {} is behind {}",
            receipt.sequence, channel.upgrade_sequence
        )));
    }
    if channel.state == ChannelState::FlushComplete && receipt.sequence != channel.upgrade_sequence {
        return Err(IbcError::Upgrade(
            "a flushed channel can only cancel its current upgrade".into(),
        ));
    }
    verify::verify_channel_upgrade_error(
        ctx,
        &*state,
        &connection,
        msg.proof_height,
        &msg.proof_error_receipt,
        &channel.counterparty.port_id,
        channel.counterparty_channel_id()?,
        receipt,
    )?;

    abort(
        ctx,
        state,
        &module_id,
        port_id,
        channel_id,
        receipt.sequence,
        format!("cancelled by counterparty: {}", receipt.message),
        AbortReason::Restore,
    )?;
    Ok(MsgResponse::ChannelUpgradeCancel)
}
