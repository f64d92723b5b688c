// Path: crates/ibc/src/client.rs
//! Client keeper: creation, updates, misbehaviour and proof verification
//! against a client's stored consensus states.

use ioi_api::ibc::ClientContext;
use ioi_api::state::StateAccessor;
use ioi_types::error::{ClientError, IbcError};
use ioi_types::ibc::{
    ClientId, ClientState, ConsensusMeta, Height, IbcEvent, MerklePath, MsgCreateClient,
    MsgResponse, MsgSubmitMisbehaviour, MsgUpdateClient, Path,
};

use crate::context::ExecCtx;
use crate::store::IbcStore;

/// Height recorded when a client is frozen.
const FROZEN_HEIGHT: Height = Height::new(0, 1);

fn proof_error(path: &MerklePath, err: ClientError) -> IbcError {
    match err {
        ClientError::InvalidProof(reason) => IbcError::ProofVerificationFailed {
            path: path.to_string(),
            reason,
        },
        ClientError::ConsensusStateNotFound(height) => IbcError::ProofVerificationFailed {
            path: path.to_string(),
            reason: format!("no consensus state at height {height}"),
        },
        other => IbcError::Client(other),
    }
}

/// Loads a client and fails unless it is active.
pub(crate) fn active_client(state: &dyn StateAccessor, client_id: &ClientId) -> Result<ClientState, IbcError> {
    let client_state = state.client_state(client_id)?;
    if client_state.is_frozen() {
        return Err(IbcError::ClientFrozen(client_id.to_string()));
    }
    Ok(client_state)
}

pub(crate) fn create_client(
    ctx: &mut ExecCtx<'_>,
    state: &mut dyn StateAccessor,
    msg: MsgCreateClient,
) -> Result<MsgResponse, IbcError> {
    let client_type = msg.client_state.client_type.clone();
    if !ctx.config.is_client_enabled(&client_type) {
        return Err(IbcError::ClientTypeNotAllowed(client_type));
    }
    let verifier = ctx.verifiers.get(&client_type)?;
    verifier.validate_initial_state(&msg.client_state, &msg.consensus_state)?;

    let counter = state.next_counter(&Path::NextClientSequence)?;
    let client_id = ClientId::new_indexed(&client_type, counter)?;
    let height = msg.client_state.latest_height;

    state.set_client_state(&client_id, &msg.client_state)?;
    state.set_consensus_state(
        &client_id,
        height,
        &msg.consensus_state,
        &ConsensusMeta {
            processed_time: ctx.block.timestamp,
            processed_height: ctx.block.height,
        },
    )?;

    ctx.emit(IbcEvent::CreateClient {
        client_id: client_id.clone(),
        client_type: client_type.clone(),
        consensus_height: height,
    });
    tracing::info!(target: "ibc", client_id = %client_id, client_type = %client_type, height = %height, "client created");
    Ok(MsgResponse::CreateClient { client_id })
}

fn freeze(
    ctx: &mut ExecCtx<'_>,
    state: &mut dyn StateAccessor,
    client_id: &ClientId,
    mut client_state: ClientState,
) -> Result<(), IbcError> {
    client_state.frozen_height = Some(FROZEN_HEIGHT);
    state.set_client_state(client_id, &client_state)?;
    ctx.emit(IbcEvent::ClientMisbehaviour {
        client_id: client_id.clone(),
    });
    tracing::warn!(target: "ibc", client_id = %client_id, "misbehaviour detected, client frozen");
    Ok(())
}

pub(crate) fn update_client(
    ctx: &mut ExecCtx<'_>,
    state: &mut dyn StateAccessor,
    msg: MsgUpdateClient,
) -> Result<MsgResponse, IbcError> {
    let client_id = msg.client_id;
    let client_state = active_client(&*state, &client_id)?;
    let verifier = ctx.verifiers.get(&client_state.client_type)?;
    let rejected = |e: ClientError| IbcError::ClientUpdateFailed {
        client_id: client_id.to_string(),
        reason: e.to_string(),
    };

    let update = {
        let client_ctx = ClientContext::new(&client_id, &client_state, &*state);
        verifier
            .verify_client_message(&client_ctx, &msg.client_message)
            .map_err(rejected)?;
        if verifier
            .check_for_misbehaviour(&client_ctx, &msg.client_message)
            .map_err(rejected)?
        {
            None
        } else {
            Some(
                verifier
                    .update_state(&client_ctx, &msg.client_message)
                    .map_err(rejected)?,
            )
        }
    };

    let Some(update) = update else {
        freeze(ctx, state, &client_id, client_state)?;
        return Ok(MsgResponse::UpdateClient);
    };

    state.set_consensus_state(
        &client_id,
        update.height,
        &update.consensus_state,
        &ConsensusMeta {
            processed_time: ctx.block.timestamp,
            processed_height: ctx.block.height,
        },
    )?;
    if update.height > client_state.latest_height {
        let mut client_state = client_state;
        client_state.latest_height = update.height;
        state.set_client_state(&client_id, &client_state)?;
    }

    ctx.emit(IbcEvent::UpdateClient {
        client_id: client_id.clone(),
        consensus_height: update.height,
    });
    tracing::info!(target: "ibc", client_id = %client_id, height = %update.height, "client updated");
    Ok(MsgResponse::UpdateClient)
}

pub(crate) fn submit_misbehaviour(
    ctx: &mut ExecCtx<'_>,
    state: &mut dyn StateAccessor,
    msg: MsgSubmitMisbehaviour,
) -> Result<MsgResponse, IbcError> {
    let client_id = msg.client_id;
    let client_state = active_client(&*state, &client_id)?;
    let verifier = ctx.verifiers.get(&client_state.client_type)?;
    let rejected = |e: ClientError| IbcError::ClientUpdateFailed {
        client_id: client_id.to_string(),
        reason: e.to_string(),
    };

    let misbehaving = {
        let client_ctx = ClientContext::new(&client_id, &client_state, &*state);
        verifier
            .verify_client_message(&client_ctx, &msg.misbehaviour)
            .map_err(rejected)?;
        verifier
            .check_for_misbehaviour(&client_ctx, &msg.misbehaviour)
            .map_err(rejected)?
    };
    if !misbehaving {
        return Err(IbcError::ClientUpdateFailed {
            client_id: client_id.to_string(),
            reason: "submitted evidence is not misbehaviour".into(),
        });
    }
    freeze(ctx, state, &client_id, client_state)?;
    Ok(MsgResponse::SubmitMisbehaviour)
}

/// Verifies a membership proof with the client's verifier.
pub(crate) fn verify_membership(
    ctx: &ExecCtx<'_>,
    state: &dyn StateAccessor,
    client_id: &ClientId,
    height: Height,
    proof: &[u8],
    path: &MerklePath,
    value: &[u8],
) -> Result<(), IbcError> {
    let client_state = active_client(state, client_id)?;
    let verifier = ctx.verifiers.get(&client_state.client_type)?;
    let client_ctx = ClientContext::new(client_id, &client_state, state);
    verifier
        .verify_membership(&client_ctx, height, proof, path, value)
        .map_err(|e| proof_error(path, e))
}

/// Verifies a non-membership proof with the client's verifier.
pub(crate) fn verify_non_membership(
    ctx: &ExecCtx<'_>,
    state: &dyn StateAccessor,
    client_id: &ClientId,
    height: Height,
    proof: &[u8],
    path: &MerklePath,
) -> Result<(), IbcError> {
    let client_state = active_client(state, client_id)?;
    let verifier = ctx.verifiers.get(&client_state.client_type)?;
    let client_ctx = ClientContext::new(client_id, &client_state, state);
    verifier
        .verify_non_membership(&client_ctx, height, proof, path)
        .map_err(|e| proof_error(path, e))
}

/// The counterparty timestamp the client recorded at `height`.
pub(crate) fn timestamp_at_height(
    ctx: &ExecCtx<'_>,
    state: &dyn StateAccessor,
    client_id: &ClientId,
    height: Height,
) -> Result<u64, IbcError> {
    let client_state = state.client_state(client_id)?;
    let verifier = ctx.verifiers.get(&client_state.client_type)?;
    let client_ctx = ClientContext::new(client_id, &client_state, state);
    Ok(verifier.timestamp_at_height(&client_ctx, height)?)
}

/// Fails unless `delay_period` has elapsed, in both time and blocks, since
/// the consensus state at `proof_height` was stored.
pub(crate) fn verify_delay_passed(
    ctx: &ExecCtx<'_>,
    state: &dyn StateAccessor,
    client_id: &ClientId,
    proof_height: Height,
    delay_period: u64,
) -> Result<(), IbcError> {
    if delay_period == 0 {
        return Ok(());
    }
    let meta = state
        .consensus_meta(client_id, proof_height)?
        .ok_or(IbcError::Client(ClientError::ConsensusStateNotFound(proof_height)))?;

    let earliest_time = meta.processed_time.saturating_add(delay_period);
    if ctx.block.timestamp < earliest_time {
        return Err(IbcError::DelayPeriodNotPassed(format!(
            "host time {} is before {earliest_time}",
            ctx.block.timestamp
        )));
    }

    let block_delay = match ctx.config.max_expected_time_per_block {
        0 => 0,
        per_block => delay_period.div_ceil(per_block),
    };
    let earliest_height = meta.processed_height.add(block_delay);
    if ctx.block.height < earliest_height {
        return Err(IbcError::DelayPeriodNotPassed(format!(
            "host height {} is before {earliest_height}",
            ctx.block.height
        )));
    }
    Ok(())
}
