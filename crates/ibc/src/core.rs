// Path: crates/ibc/src/core.rs
//! The IBC core: routes relayer messages to their handlers and exposes the
//! packet-sending surface to application modules.

use std::sync::Arc;

use ioi_api::ibc::ClientVerifier;
use ioi_api::state::StateAccessor;
use ioi_types::codec::from_bytes_canonical;
use ioi_types::config::IbcConfig;
use ioi_types::error::IbcError;
use ioi_types::ibc::{
    port_capability_name, BlockContext, ChannelId, Height, IbcEvent, ModuleId, MsgEnvelope,
    MsgOutcome, MsgResponse, Packet, PortId, Sequence,
};

use crate::capability::{core_module_id, Capability, CapabilityRegistry};
use crate::context::ExecCtx;
use crate::execution::in_branch;
use crate::module::IbcModule;
use crate::registry::VerifierRegistry;
use crate::router::Router;
use crate::{channel, client, connection};

/// The service method that executes a SCALE-encoded batch of messages.
pub const MSG_DISPATCH_METHOD: &str = "msg_dispatch@v1";

/// The IBC state machine of one host chain.
///
/// Holds no chain state of its own: every entry point takes the state to
/// operate on and writes to it only when the whole call succeeds.
#[derive(Debug)]
pub struct IbcCore {
    config: IbcConfig,
    verifiers: VerifierRegistry,
    router: Router,
}

impl IbcCore {
    /// Creates a core with no verifiers and no modules.
    pub fn new(config: IbcConfig) -> Self {
        Self {
            config,
            verifiers: VerifierRegistry::new(),
            router: Router::new(),
        }
    }

    /// The active configuration.
    pub fn config(&self) -> &IbcConfig {
        &self.config
    }

    /// Registers the light-client verifier for its client type.
    pub fn register_verifier(&mut self, verifier: Arc<dyn ClientVerifier>) {
        self.verifiers.register(verifier);
    }

    /// Adds an application module to the router.
    pub fn add_module(
        &mut self,
        module_id: ModuleId,
        module: Box<dyn IbcModule>,
    ) -> Result<(), IbcError> {
        self.router.add_route(module_id, module)
    }

    /// Binds `port_id` to `module_id` and returns the port capability.
    ///
    /// Fails with `CapabilityAlreadyClaimed` if the port is already bound.
    pub fn bind_port(
        &mut self,
        state: &mut dyn StateAccessor,
        port_id: &PortId,
        module_id: &ModuleId,
    ) -> Result<Capability, IbcError> {
        if !self.router.has_route(module_id) {
            return Err(IbcError::RouteNotFound(module_id.to_string()));
        }
        let name = port_capability_name(port_id);
        let capability = in_branch(state, |branch| {
            let capability = CapabilityRegistry::new_capability(branch, &core_module_id(), &name)?;
            CapabilityRegistry::claim(branch, module_id, &capability, &name)?;
            Ok(capability)
        })?;
        tracing::info!(target: "ibc", port_id = %port_id, module_id = %module_id, "port bound");
        Ok(capability)
    }

    /// Executes one relayer message.
    ///
    /// The message runs on its own branch of `state`, committed only if it
    /// succeeds. Redundant packet relays succeed with a `NoOp` result.
    pub fn dispatch(
        &mut self,
        state: &mut dyn StateAccessor,
        block: BlockContext,
        msg: MsgEnvelope,
    ) -> Result<MsgOutcome, IbcError> {
        let msg_type = msg.type_name();
        if let Err(e) = msg.validate_basic() {
            tracing::warn!(target: "ibc", msg_type, error = %e, "rejected malformed message");
            return Err(e);
        }

        let mut ctx = ExecCtx::new(&self.config, &self.verifiers, &mut self.router, block);
        match in_branch(state, |branch| route(&mut ctx, branch, msg)) {
            Ok(response) => {
                tracing::debug!(target: "ibc", msg_type, result = ?response.result(), events = ctx.events.len(), "message executed");
                Ok(MsgOutcome {
                    response,
                    events: ctx.events,
                })
            }
            Err(e) => {
                tracing::error!(target: "ibc", msg_type, height = %block.height, error = %e, "message failed");
                Err(e)
            }
        }
    }

    /// Entry point for the host's service-call surface.
    ///
    /// `msg_dispatch@v1` takes a SCALE-encoded `Vec<MsgEnvelope>` and executes
    /// it as a unit: if any message fails, none of them is applied.
    pub fn handle_service_call(
        &mut self,
        state: &mut dyn StateAccessor,
        block: BlockContext,
        method: &str,
        params: &[u8],
    ) -> Result<Vec<MsgOutcome>, IbcError> {
        match method {
            MSG_DISPATCH_METHOD => {
                let msgs: Vec<MsgEnvelope> = from_bytes_canonical(params).map_err(IbcError::Codec)?;
                tracing::debug!(target: "ibc", count = msgs.len(), "dispatching message batch");
                in_branch(state, |batch| {
                    msgs.into_iter()
                        .map(|msg| self.dispatch(&mut *batch, block, msg))
                        .collect()
                })
            }
            _ => Err(IbcError::UnsupportedMethod(method.to_string())),
        }
    }

    /// Sends a packet on a channel the caller holds `capability` for.
    ///
    /// Returns the allocated sequence and the emitted events.
    #[allow(clippy::too_many_arguments)]
    pub fn send_packet(
        &mut self,
        state: &mut dyn StateAccessor,
        block: BlockContext,
        capability: &Capability,
        source_port: &PortId,
        source_channel: &ChannelId,
        timeout_height: Height,
        timeout_timestamp: u64,
        data: Vec<u8>,
    ) -> Result<(Sequence, Vec<IbcEvent>), IbcError> {
        let mut ctx = ExecCtx::new(&self.config, &self.verifiers, &mut self.router, block);
        let sequence = in_branch(state, |branch| {
            channel::packet::send_packet(
                &mut ctx,
                branch,
                capability,
                source_port,
                source_channel,
                timeout_height,
                timeout_timestamp,
                data,
            )
        })?;
        Ok((sequence, ctx.events))
    }

    /// Writes an acknowledgement the application deferred in `on_recv_packet`.
    pub fn write_acknowledgement(
        &mut self,
        state: &mut dyn StateAccessor,
        block: BlockContext,
        capability: &Capability,
        packet: &Packet,
        acknowledgement: Vec<u8>,
    ) -> Result<Vec<IbcEvent>, IbcError> {
        let mut ctx = ExecCtx::new(&self.config, &self.verifiers, &mut self.router, block);
        in_branch(state, |branch| {
            channel::packet::write_acknowledgement(&mut ctx, branch, capability, packet, acknowledgement)
        })?;
        Ok(ctx.events)
    }
}

fn route(
    ctx: &mut ExecCtx<'_>,
    state: &mut dyn StateAccessor,
    msg: MsgEnvelope,
) -> Result<MsgResponse, IbcError> {
    use channel::{handshake, packet, upgrade};
    match msg {
        MsgEnvelope::CreateClient(m) => client::create_client(ctx, state, m),
        MsgEnvelope::UpdateClient(m) => client::update_client(ctx, state, m),
        MsgEnvelope::SubmitMisbehaviour(m) => client::submit_misbehaviour(ctx, state, m),
        MsgEnvelope::ConnectionOpenInit(m) => connection::conn_open_init(ctx, state, m),
        MsgEnvelope::ConnectionOpenTry(m) => connection::conn_open_try(ctx, state, m),
        MsgEnvelope::ConnectionOpenAck(m) => connection::conn_open_ack(ctx, state, m),
        MsgEnvelope::ConnectionOpenConfirm(m) => connection::conn_open_confirm(ctx, state, m),
        MsgEnvelope::ChannelOpenInit(m) => handshake::chan_open_init(ctx, state, m),
        MsgEnvelope::ChannelOpenTry(m) => handshake::chan_open_try(ctx, state, m),
        MsgEnvelope::ChannelOpenAck(m) => handshake::chan_open_ack(ctx, state, m),
        MsgEnvelope::ChannelOpenConfirm(m) => handshake::chan_open_confirm(ctx, state, m),
        MsgEnvelope::ChannelCloseInit(m) => handshake::chan_close_init(ctx, state, m),
        MsgEnvelope::ChannelCloseConfirm(m) => handshake::chan_close_confirm(ctx, state, m),
        MsgEnvelope::RecvPacket(m) => packet::recv_packet(ctx, state, m),
        MsgEnvelope::Acknowledgement(m) => packet::acknowledge_packet(ctx, state, m),
        MsgEnvelope::Timeout(m) => packet::timeout(ctx, state, m),
        MsgEnvelope::TimeoutOnClose(m) => packet::timeout_on_close(ctx, state, m),
        MsgEnvelope::ChannelUpgradeInit(m) => upgrade::upgrade_init(ctx, state, m),
        MsgEnvelope::ChannelUpgradeTry(m) => upgrade::upgrade_try(ctx, state, m),
        MsgEnvelope::ChannelUpgradeAck(m) => upgrade::upgrade_ack(ctx, state, m),
        MsgEnvelope::ChannelUpgradeConfirm(m) => upgrade::upgrade_confirm(ctx, state, m),
        MsgEnvelope::ChannelUpgradeOpen(m) => upgrade::upgrade_open(ctx, state, m),
        MsgEnvelope::ChannelUpgradeTimeout(m) => upgrade::upgrade_timeout(ctx, state, m),
        MsgEnvelope::ChannelUpgradeCancel(m) => upgrade::upgrade_cancel(ctx, state, m),
    }
}
