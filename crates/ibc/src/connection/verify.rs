// Path: crates/ibc/src/connection/verify.rs
//! Proofs about counterparty state, checked through a connection's client
//! and qualified by the counterparty's commitment prefix.

use ioi_api::state::StateAccessor;
use ioi_types::codec::to_bytes_canonical;
use ioi_types::error::IbcError;
use ioi_types::ibc::{
    ChannelEnd, ChannelId, ClientId, ConnectionEnd, ConnectionId, ErrorReceipt, Height,
    MerklePath, Path, PortId, Sequence, Upgrade,
};

use crate::client;
use crate::context::ExecCtx;

fn merkle_path(connection: &ConnectionEnd, path: &Path) -> MerklePath {
    MerklePath::new(connection.counterparty.prefix.as_bytes(), path)
}

fn verify_member(
    ctx: &ExecCtx<'_>,
    state: &dyn StateAccessor,
    connection: &ConnectionEnd,
    height: Height,
    proof: &[u8],
    path: Path,
    value: &[u8],
) -> Result<(), IbcError> {
    client::verify_membership(
        ctx,
        state,
        &connection.client_id,
        height,
        proof,
        &merkle_path(connection, &path),
        value,
    )
}

fn verify_delayed_member(
    ctx: &ExecCtx<'_>,
    state: &dyn StateAccessor,
    connection: &ConnectionEnd,
    height: Height,
    proof: &[u8],
    path: Path,
    value: &[u8],
) -> Result<(), IbcError> {
    client::verify_delay_passed(ctx, state, &connection.client_id, height, connection.delay_period)?;
    verify_member(ctx, state, connection, height, proof, path, value)
}

/// The counterparty stores `expected` under `connections/{counterparty_connection_id}`.
pub(crate) fn verify_connection_state(
    ctx: &ExecCtx<'_>,
    state: &dyn StateAccessor,
    connection: &ConnectionEnd,
    height: Height,
    proof: &[u8],
    counterparty_connection_id: &ConnectionId,
    expected: &ConnectionEnd,
) -> Result<(), IbcError> {
    verify_member(
        ctx,
        state,
        connection,
        height,
        proof,
        Path::Connection(counterparty_connection_id.clone()),
        &to_bytes_canonical(expected),
    )
}

/// The counterparty's client of this chain has the given state.
pub(crate) fn verify_client_state(
    ctx: &ExecCtx<'_>,
    state: &dyn StateAccessor,
    connection: &ConnectionEnd,
    height: Height,
    proof: &[u8],
    client_state: &[u8],
) -> Result<(), IbcError> {
    let counterparty_client: &ClientId = &connection.counterparty.client_id;
    verify_member(
        ctx,
        state,
        connection,
        height,
        proof,
        Path::ClientState(counterparty_client.clone()),
        client_state,
    )
}

/// The counterparty's client of this chain stores the given consensus state.
pub(crate) fn verify_client_consensus_state(
    ctx: &ExecCtx<'_>,
    state: &dyn StateAccessor,
    connection: &ConnectionEnd,
    height: Height,
    proof: &[u8],
    consensus_height: Height,
    consensus_state: &[u8],
) -> Result<(), IbcError> {
    verify_member(
        ctx,
        state,
        connection,
        height,
        proof,
        Path::ClientConsensusState(connection.counterparty.client_id.clone(), consensus_height),
        consensus_state,
    )
}

/// The counterparty stores `expected` as its channel end.
#[allow(clippy::too_many_arguments)]
pub(crate) fn verify_channel_state(
    ctx: &ExecCtx<'_>,
    state: &dyn StateAccessor,
    connection: &ConnectionEnd,
    height: Height,
    proof: &[u8],
    port_id: &PortId,
    channel_id: &ChannelId,
    expected: &ChannelEnd,
) -> Result<(), IbcError> {
    verify_member(
        ctx,
        state,
        connection,
        height,
        proof,
        Path::ChannelEnd(port_id.clone(), channel_id.clone()),
        &to_bytes_canonical(expected),
    )
}

/// The counterparty committed to a packet with the given commitment.
#[allow(clippy::too_many_arguments)]
pub(crate) fn verify_packet_commitment(
    ctx: &ExecCtx<'_>,
    state: &dyn StateAccessor,
    connection: &ConnectionEnd,
    height: Height,
    proof: &[u8],
    port_id: &PortId,
    channel_id: &ChannelId,
    sequence: Sequence,
    commitment: &[u8],
) -> Result<(), IbcError> {
    verify_delayed_member(
        ctx,
        state,
        connection,
        height,
        proof,
        Path::Commitment(port_id.clone(), channel_id.clone(), sequence),
        commitment,
    )
}

/// The counterparty wrote an acknowledgement with the given commitment.
#[allow(clippy::too_many_arguments)]
pub(crate) fn verify_packet_acknowledgement(
    ctx: &ExecCtx<'_>,
    state: &dyn StateAccessor,
    connection: &ConnectionEnd,
    height: Height,
    proof: &[u8],
    port_id: &PortId,
    channel_id: &ChannelId,
    sequence: Sequence,
    ack_commitment: &[u8],
) -> Result<(), IbcError> {
    verify_delayed_member(
        ctx,
        state,
        connection,
        height,
        proof,
        Path::Ack(port_id.clone(), channel_id.clone(), sequence),
        ack_commitment,
    )
}

/// The counterparty holds no receipt for the sequence.
#[allow(clippy::too_many_arguments)]
pub(crate) fn verify_packet_receipt_absence(
    ctx: &ExecCtx<'_>,
    state: &dyn StateAccessor,
    connection: &ConnectionEnd,
    height: Height,
    proof: &[u8],
    port_id: &PortId,
    channel_id: &ChannelId,
    sequence: Sequence,
) -> Result<(), IbcError> {
    client::verify_delay_passed(ctx, state, &connection.client_id, height, connection.delay_period)?;
    let path = Path::Receipt(port_id.clone(), channel_id.clone(), sequence);
    client::verify_non_membership(
        ctx,
        state,
        &connection.client_id,
        height,
        proof,
        &merkle_path(connection, &path),
    )
}

/// The counterparty's next receive sequence is `next_sequence_recv`.
#[allow(clippy::too_many_arguments)]
pub(crate) fn verify_next_sequence_recv(
    ctx: &ExecCtx<'_>,
    state: &dyn StateAccessor,
    connection: &ConnectionEnd,
    height: Height,
    proof: &[u8],
    port_id: &PortId,
    channel_id: &ChannelId,
    next_sequence_recv: Sequence,
) -> Result<(), IbcError> {
    verify_delayed_member(
        ctx,
        state,
        connection,
        height,
        proof,
        Path::SeqRecv(port_id.clone(), channel_id.clone()),
        &next_sequence_recv.value().to_be_bytes(),
    )
}

/// The counterparty stores `upgrade` as its upgrade proposal.
#[allow(clippy::too_many_arguments)]
pub(crate) fn verify_channel_upgrade(
    ctx: &ExecCtx<'_>,
    state: &dyn StateAccessor,
    connection: &ConnectionEnd,
    height: Height,
    proof: &[u8],
    port_id: &PortId,
    channel_id: &ChannelId,
    upgrade: &Upgrade,
) -> Result<(), IbcError> {
    verify_member(
        ctx,
        state,
        connection,
        height,
        proof,
        Path::Upgrade(port_id.clone(), channel_id.clone()),
        &to_bytes_canonical(upgrade),
    )
}

/// The counterparty wrote `receipt` as its upgrade error receipt.
#[allow(clippy::too_many_arguments)]
pub(crate) fn verify_channel_upgrade_error(
    ctx: &ExecCtx<'_>,
    state: &dyn StateAccessor,
    connection: &ConnectionEnd,
    height: Height,
    proof: &[u8],
    port_id: &PortId,
    channel_id: &ChannelId,
    receipt: &ErrorReceipt,
) -> Result<(), IbcError> {
    verify_member(
        ctx,
        state,
        connection,
        height,
        proof,
        Path::UpgradeError(port_id.clone(), channel_id.clone()),
        &to_bytes_canonical(receipt),
    )
}
