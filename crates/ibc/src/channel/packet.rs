// Path: crates/ibc/src/channel/packet.rs
//! Packet lifecycle: send, receive, acknowledge and time out.
//!
//! Relayed steps run in two phases. Phase one verifies the counterparty proof
//! and performs the transport writes on its own branch; phase two runs the
//! application callback on a second branch. A redundant relay is reported as
//! `NoOp` and writes nothing.

use ioi_api::state::StateAccessor;
use ioi_types::error::IbcError;
use ioi_types::ibc::{
    ack_commitment, channel_capability_name, Acknowledgement, ChannelCounterparty, ChannelEnd,
    ChannelId, ChannelState, ErrorReceipt, Height, IbcEvent, MsgAcknowledgement, MsgRecvPacket,
    MsgResponse, MsgTimeout, MsgTimeoutOnClose, Order, Packet, PortId, ResponseResult, Sequence,
    Timeout,
};

use super::upgrade::handle_flush_state;
use super::{app_error, channel_connection, channel_module};
use crate::capability::{Capability, CapabilityRegistry};
use crate::client::{active_client, timestamp_at_height};
use crate::connection::verify;
use crate::context::ExecCtx;
use crate::execution::{in_branch, Outcome};
use crate::store::IbcStore;

fn authenticate_channel(
    state: &dyn StateAccessor,
    capability: &Capability,
    port_id: &PortId,
    channel_id: &ChannelId,
) -> Result<(), IbcError> {
    let name = channel_capability_name(port_id, channel_id);
    if !CapabilityRegistry::authenticate(state, capability, &name)? {
        return Err(IbcError::Unauthorized(format!(
            "capability does not authenticate {name}"
        )));
    }
    Ok(())
}

/// Checks that the packet's far end is the channel's counterparty.
fn verify_counterparty(
    counterparty: &ChannelCounterparty,
    port_id: &PortId,
    channel_id: &ChannelId,
) -> Result<(), IbcError> {
    if counterparty.port_id != *port_id || counterparty.channel_id.as_ref() != Some(channel_id) {
        return Err(IbcError::InvalidPacketRoute(format!(
            "packet counterparty {port_id}/{channel_id} does not match channel counterparty {}/{}",
            counterparty.port_id,
            counterparty
                .channel_id
                .as_ref()
                .map(ChannelId::as_str)
                .unwrap_or_default()
        )));
    }
    Ok(())
}

/// Commits an outgoing packet on a channel the caller holds the capability for.
#[allow(clippy::too_many_arguments)]
pub(crate) fn send_packet(
    ctx: &mut ExecCtx<'_>,
    state: &mut dyn StateAccessor,
    capability: &Capability,
    source_port: &PortId,
    source_channel: &ChannelId,
    timeout_height: Height,
    timeout_timestamp: u64,
    data: Vec<u8>,
) -> Result<Sequence, IbcError> {
    authenticate_channel(&*state, capability, source_port, source_channel)?;
    let channel = state.channel(source_port, source_channel)?;
    channel.verify_state(&[ChannelState::Open])?;

    let timeout = Timeout::new(timeout_height, timeout_timestamp);
    if !timeout.is_set() {
        return Err(IbcError::InvalidTimeout(
            "packet must set a timeout height or timestamp".into(),
        ));
    }
    let connection = state.connection(channel.connection_id()?)?;
    let client_state = active_client(&*state, &connection.client_id)?;
    let latest_height = client_state.latest_height;
    let latest_timestamp = timestamp_at_height(ctx, &*state, &connection.client_id, latest_height)?;

    let sequence = state.next_sequence_send(source_port, source_channel)?;
    if timeout.has_elapsed(latest_height, latest_timestamp) {
        return Err(IbcError::PacketAlreadyTimedOut(sequence));
    }

    let packet = Packet {
        sequence,
        source_port: source_port.clone(),
        source_channel: source_channel.clone(),
        destination_port: channel.counterparty.port_id.clone(),
        destination_channel: channel.counterparty_channel_id()?.clone(),
        data,
        timeout_height,
        timeout_timestamp,
    };
    let commitment = packet.commitment();
    tracing::debug!(target: "ibc", sequence = %sequence, commitment = %hex::encode(&commitment), "storing packet commitment");
    state.set_packet_commitment(source_port, source_channel, sequence, &commitment)?;
    state.set_next_sequence_send(source_port, source_channel, sequence.increment())?;

    ctx.emit(IbcEvent::SendPacket { packet });
    tracing::info!(target: "ibc", port_id = %source_port, channel_id = %source_channel, sequence = %sequence, "packet sent");
    Ok(sequence)
}

fn store_acknowledgement(
    ctx: &mut ExecCtx<'_>,
    state: &mut dyn StateAccessor,
    packet: &Packet,
    acknowledgement: Vec<u8>,
) -> Result<(), IbcError> {
    let (port_id, channel_id) = (&packet.destination_port, &packet.destination_channel);
    if acknowledgement.is_empty() {
        return Err(IbcError::InvalidMessage("acknowledgement cannot be empty".into()));
    }
    if state
        .packet_acknowledgement(port_id, channel_id, packet.sequence)?
        .is_some()
    {
        return Err(IbcError::AcknowledgementExists(packet.sequence));
    }
    state.set_packet_acknowledgement(
        port_id,
        channel_id,
        packet.sequence,
        &ack_commitment(&acknowledgement),
    )?;
    tracing::debug!(target: "ibc", port_id = %port_id, channel_id = %channel_id, sequence = %packet.sequence, "acknowledgement written");
    ctx.emit(IbcEvent::WriteAcknowledgement {
        packet: packet.clone(),
        acknowledgement,
    });
    Ok(())
}

/// Writes an acknowledgement the application deferred during receipt.
pub(crate) fn write_acknowledgement(
    ctx: &mut ExecCtx<'_>,
    state: &mut dyn StateAccessor,
    capability: &Capability,
    packet: &Packet,
    acknowledgement: Vec<u8>,
) -> Result<(), IbcError> {
    let (port_id, channel_id) = (&packet.destination_port, &packet.destination_channel);
    authenticate_channel(&*state, capability, port_id, channel_id)?;
    let channel = state.channel(port_id, channel_id)?;
    channel.verify_state(&[
        ChannelState::Open,
        ChannelState::Flushing,
        ChannelState::FlushComplete,
    ])?;
    if channel.ordering == Order::Unordered
        && !state.has_packet_receipt(port_id, channel_id, packet.sequence)?
    {
        return Err(IbcError::InvalidState(format!(
            "packet {} has not been received",
            packet.sequence
        )));
    }
    store_acknowledgement(ctx, state, packet, acknowledgement)
}

pub(crate) fn recv_packet(
    ctx: &mut ExecCtx<'_>,
    state: &mut dyn StateAccessor,
    msg: MsgRecvPacket,
) -> Result<MsgResponse, IbcError> {
    let packet = msg.packet;
    let (port_id, channel_id) = (&packet.destination_port, &packet.destination_channel);
    let channel = state.channel(port_id, channel_id)?;
    channel.verify_state(&[
        ChannelState::Open,
        ChannelState::Flushing,
        ChannelState::FlushComplete,
    ])?;
    if !channel.is_open() {
        if let Some(counterparty_upgrade) = state.counterparty_upgrade(port_id, channel_id)? {
            if packet.sequence >= counterparty_upgrade.next_sequence_send {
                return Err(IbcError::Upgrade(format!(
                    "packet {} was sent after the counterparty started flushing at {}",
                    packet.sequence, counterparty_upgrade.next_sequence_send
                )));
            }
        }
    }
    let module_id = channel_module(&*state, port_id, channel_id)?;
    verify_counterparty(&channel.counterparty, &packet.source_port, &packet.source_channel)?;
    let connection = channel_connection(&*state, &channel)?;
    if packet.timeout().has_elapsed(ctx.block.height, ctx.block.timestamp) {
        return Err(IbcError::PacketAlreadyTimedOut(packet.sequence));
    }

    verify::verify_packet_commitment(
        ctx,
        &*state,
        &connection,
        msg.proof_height,
        &msg.proof_commitment,
        &packet.source_port,
        &packet.source_channel,
        packet.sequence,
        &packet.commitment(),
    )?;

    let outcome = in_branch(state, |branch| {
        match channel.ordering {
            Order::Unordered => {
                if branch.has_packet_receipt(port_id, channel_id, packet.sequence)? {
                    return Ok(Outcome::NoOp);
                }
                branch.set_packet_receipt(port_id, channel_id, packet.sequence)?;
            }
            Order::Ordered => {
                let next = branch.next_sequence_recv(port_id, channel_id)?;
                if packet.sequence < next {
                    return Ok(Outcome::NoOp);
                }
                if packet.sequence > next {
                    return Err(IbcError::SequenceMismatch {
                        expected: next,
                        got: packet.sequence,
                    });
                }
                branch.set_packet_receipt(port_id, channel_id, packet.sequence)?;
                branch.set_next_sequence_recv(port_id, channel_id, next.increment())?;
            }
        }
        Ok(Outcome::Success(()))
    })?;
    if outcome == Outcome::NoOp {
        tracing::debug!(target: "ibc", port_id = %port_id, channel_id = %channel_id, sequence = %packet.sequence, "packet already received");
        return Ok(MsgResponse::RecvPacket(ResponseResult::NoOp));
    }
    ctx.emit(IbcEvent::RecvPacket {
        packet: packet.clone(),
    });

    let relayer = msg.signer;
    let result = ctx.callback_with(
        &module_id,
        state,
        |module, cb| module.on_recv_packet(cb, &packet, &relayer),
        |result| match result {
            Ok(Some(ack)) => ack.is_success(),
            Ok(None) => true,
            Err(_) => false,
        },
    )?;
    let acknowledgement = match result {
        Ok(ack) => ack,
        Err(e) => {
            tracing::warn!(target: "ibc", port_id = %port_id, channel_id = %channel_id, sequence = %packet.sequence, error = %e, "receive callback failed");
            Some(Acknowledgement::error(format!("{e:#}")))
        }
    };
    match acknowledgement {
        Some(ack) => store_acknowledgement(ctx, state, &packet, ack.to_bytes()?)?,
        None => {
            tracing::debug!(target: "ibc", port_id = %port_id, channel_id = %channel_id, sequence = %packet.sequence, "acknowledgement deferred")
        }
    }

    tracing::info!(target: "ibc", port_id = %port_id, channel_id = %channel_id, sequence = %packet.sequence, "packet received");
    Ok(MsgResponse::RecvPacket(ResponseResult::Success))
}

/// Checks the local commitment for a packet this chain sent.
///
/// Returns `false` if it is already gone.
fn check_commitment(
    state: &dyn StateAccessor,
    packet: &Packet,
) -> Result<bool, IbcError> {
    match state.packet_commitment(&packet.source_port, &packet.source_channel, packet.sequence)? {
        None => Ok(false),
        Some(stored) if stored == packet.commitment() => Ok(true),
        Some(_) => Err(IbcError::CommitmentMismatch(packet.sequence)),
    }
}

pub(crate) fn acknowledge_packet(
    ctx: &mut ExecCtx<'_>,
    state: &mut dyn StateAccessor,
    msg: MsgAcknowledgement,
) -> Result<MsgResponse, IbcError> {
    let packet = msg.packet;
    let (port_id, channel_id) = (&packet.source_port, &packet.source_channel);
    let channel = state.channel(port_id, channel_id)?;
    channel.verify_state(&[ChannelState::Open, ChannelState::Flushing])?;
    let module_id = channel_module(&*state, port_id, channel_id)?;
    verify_counterparty(
        &channel.counterparty,
        &packet.destination_port,
        &packet.destination_channel,
    )?;
    let connection = channel_connection(&*state, &channel)?;

    if !check_commitment(&*state, &packet)? {
        tracing::debug!(target: "ibc", port_id = %port_id, channel_id = %channel_id, sequence = %packet.sequence, "packet already acknowledged");
        return Ok(MsgResponse::Acknowledgement(ResponseResult::NoOp));
    }

    verify::verify_packet_acknowledgement(
        ctx,
        &*state,
        &connection,
        msg.proof_height,
        &msg.proof_acked,
        &packet.destination_port,
        &packet.destination_channel,
        packet.sequence,
        &ack_commitment(&msg.acknowledgement),
    )?;

    in_branch(state, |branch| {
        if channel.ordering == Order::Ordered {
            let next = branch.next_sequence_ack(port_id, channel_id)?;
            if packet.sequence != next {
                return Err(IbcError::SequenceMismatch {
                    expected: next,
                    got: packet.sequence,
                });
            }
            branch.set_next_sequence_ack(port_id, channel_id, next.increment())?;
        }
        branch.delete_packet_commitment(port_id, channel_id, packet.sequence)
    })?;
    handle_flush_state(ctx, state, port_id, channel_id)?;

    let relayer = msg.signer;
    ctx.callback(&module_id, state, |module, cb| {
        module.on_acknowledgement_packet(cb, &packet, &msg.acknowledgement, &relayer)
    })?
    .map_err(|e| app_error(port_id, channel_id, e))?;

    ctx.emit(IbcEvent::AcknowledgePacket {
        packet: packet.clone(),
    });
    tracing::info!(target: "ibc", port_id = %port_id, channel_id = %channel_id, sequence = %packet.sequence, "packet acknowledged");
    Ok(MsgResponse::Acknowledgement(ResponseResult::Success))
}

/// Proof that the counterparty channel is closed, for `TimeoutOnClose`.
struct ClosedCounterparty<'m> {
    proof_close: &'m [u8],
    upgrade_sequence: u64,
}

#[allow(clippy::too_many_arguments)]
fn timeout_packet(
    ctx: &mut ExecCtx<'_>,
    state: &mut dyn StateAccessor,
    packet: &Packet,
    next_sequence_recv: Sequence,
    proof_unreceived: &[u8],
    proof_height: Height,
    closed: Option<ClosedCounterparty<'_>>,
    relayer: &str,
) -> Result<ResponseResult, IbcError> {
    let (port_id, channel_id) = (&packet.source_port, &packet.source_channel);
    let mut channel = state.channel(port_id, channel_id)?;
    let module_id = channel_module(&*state, port_id, channel_id)?;
    verify_counterparty(
        &channel.counterparty,
        &packet.destination_port,
        &packet.destination_channel,
    )?;
    let connection = state.connection(channel.connection_id()?)?;

    if !check_commitment(&*state, packet)? {
        tracing::debug!(target: "ibc", port_id = %port_id, channel_id = %channel_id, sequence = %packet.sequence, "packet already timed out or acknowledged");
        return Ok(ResponseResult::NoOp);
    }

    match closed {
        Some(closed) => {
            let expected = ChannelEnd {
                state: ChannelState::Closed,
                ordering: channel.ordering,
                counterparty: ChannelCounterparty::new(port_id.clone(), Some(channel_id.clone())),
                connection_hops: vec![connection.counterparty_connection_id()?.clone()],
                version: channel.version.clone(),
                upgrade_sequence: closed.upgrade_sequence,
            };
            verify::verify_channel_state(
                ctx,
                &*state,
                &connection,
                proof_height,
                closed.proof_close,
                &packet.destination_port,
                &packet.destination_channel,
                &expected,
            )?;
        }
        None => {
            let timestamp = timestamp_at_height(ctx, &*state, &connection.client_id, proof_height)?;
            if !packet.timeout().has_elapsed(proof_height, timestamp) {
                return Err(IbcError::TimeoutNotReached {
                    sequence: packet.sequence,
                    proof_height,
                    timestamp,
                });
            }
        }
    }

    match channel.ordering {
        Order::Ordered => {
            if next_sequence_recv > packet.sequence {
                return Err(IbcError::InvalidState(format!(
                    "packet {} was already received by the counterparty",
                    packet.sequence
                )));
            }
            verify::verify_next_sequence_recv(
                ctx,
                &*state,
                &connection,
                proof_height,
                proof_unreceived,
                &packet.destination_port,
                &packet.destination_channel,
                next_sequence_recv,
            )?;
        }
        Order::Unordered => verify::verify_packet_receipt_absence(
            ctx,
            &*state,
            &connection,
            proof_height,
            proof_unreceived,
            &packet.destination_port,
            &packet.destination_channel,
            packet.sequence,
        )?,
    }

    let closes_channel = channel.ordering == Order::Ordered;
    in_branch(state, |branch| {
        branch.delete_packet_commitment(port_id, channel_id, packet.sequence)?;
        if closes_channel {
            if branch.upgrade(port_id, channel_id)?.is_some() {
                branch.set_upgrade_error(
                    port_id,
                    channel_id,
                    &ErrorReceipt {
                        sequence: channel.upgrade_sequence,
                        message: "ordered channel closed by packet timeout".into(),
                    },
                )?;
                branch.delete_upgrade_info(port_id, channel_id)?;
            }
            channel.state = ChannelState::Closed;
            branch.set_channel(port_id, channel_id, &channel)?;
        }
        Ok(())
    })?;
    if closes_channel {
        ctx.emit(IbcEvent::ChannelClosed {
            port_id: port_id.clone(),
            channel_id: channel_id.clone(),
        });
        tracing::info!(target: "ibc", port_id = %port_id, channel_id = %channel_id, "ordered channel closed on timeout");
    } else {
        handle_flush_state(ctx, state, port_id, channel_id)?;
    }

    ctx.callback(&module_id, state, |module, cb| {
        module.on_timeout_packet(cb, packet, relayer)
    })?
    .map_err(|e| app_error(port_id, channel_id, e))?;

    ctx.emit(IbcEvent::TimeoutPacket {
        packet: packet.clone(),
    });
    tracing::info!(target: "ibc", port_id = %port_id, channel_id = %channel_id, sequence = %packet.sequence, "packet timed out");
    Ok(ResponseResult::Success)
}

pub(crate) fn timeout(
    ctx: &mut ExecCtx<'_>,
    state: &mut dyn StateAccessor,
    msg: MsgTimeout,
) -> Result<MsgResponse, IbcError> {
    timeout_packet(
        ctx,
        state,
        &msg.packet,
        msg.next_sequence_recv,
        &msg.proof_unreceived,
        msg.proof_height,
        None,
        &msg.signer,
    )
    .map(MsgResponse::Timeout)
}

pub(crate) fn timeout_on_close(
    ctx: &mut ExecCtx<'_>,
    state: &mut dyn StateAccessor,
    msg: MsgTimeoutOnClose,
) -> Result<MsgResponse, IbcError> {
    timeout_packet(
        ctx,
        state,
        &msg.packet,
        msg.next_sequence_recv,
        &msg.proof_unreceived,
        msg.proof_height,
        Some(ClosedCounterparty {
            proof_close: &msg.proof_close,
            upgrade_sequence: msg.counterparty_upgrade_sequence,
        }),
        &msg.signer,
    )
    .map(MsgResponse::TimeoutOnClose)
}
