// Path: crates/ibc/src/module.rs
//! The callback surface an application module exposes to the core.

use ioi_api::state::StateAccessor;
use ioi_types::ibc::{
    Acknowledgement, BlockContext, ChannelCounterparty, ChannelId, ConnectionId, IbcEvent, Order,
    Packet, PortId,
};

/// What a callback can see and touch.
///
/// `state` is a private branch of the host state: it is committed only if the
/// callback succeeds (and, for packet receipt, returns a success
/// acknowledgement). Events are kept either way.
pub struct ModuleCtx<'a> {
    /// The callback's state branch.
    pub state: &'a mut dyn StateAccessor,
    /// The executing block.
    pub block: BlockContext,
    events: &'a mut Vec<IbcEvent>,
}

impl<'a> ModuleCtx<'a> {
    /// Creates a callback context.
    pub fn new(
        state: &'a mut dyn StateAccessor,
        block: BlockContext,
        events: &'a mut Vec<IbcEvent>,
    ) -> Self {
        Self {
            state,
            block,
            events,
        }
    }

    /// Emits an application event.
    pub fn emit(&mut self, event: IbcEvent) {
        self.events.push(event);
    }
}

/// Callbacks the core invokes on the module owning a port.
///
/// Returning an error from a handshake callback aborts the message. From an
/// upgrade callback it aborts the upgrade and restores the channel. From
/// `on_recv_packet` it is turned into an error acknowledgement.
pub trait IbcModule: Send + Sync {
    /// Channel INIT. Returns the version to store, possibly overriding `version`.
    #[allow(clippy::too_many_arguments)]
    fn on_chan_open_init(
        &mut self,
        ctx: &mut ModuleCtx<'_>,
        order: Order,
        connection_hops: &[ConnectionId],
        port_id: &PortId,
        channel_id: &ChannelId,
        counterparty: &ChannelCounterparty,
        version: &str,
    ) -> anyhow::Result<String>;

    /// Channel TRY. Returns the version to store.
    #[allow(clippy::too_many_arguments)]
    fn on_chan_open_try(
        &mut self,
        ctx: &mut ModuleCtx<'_>,
        order: Order,
        connection_hops: &[ConnectionId],
        port_id: &PortId,
        channel_id: &ChannelId,
        counterparty: &ChannelCounterparty,
        counterparty_version: &str,
    ) -> anyhow::Result<String>;

    /// Channel ACK.
    fn on_chan_open_ack(
        &mut self,
        ctx: &mut ModuleCtx<'_>,
        port_id: &PortId,
        channel_id: &ChannelId,
        counterparty_channel_id: &ChannelId,
        counterparty_version: &str,
    ) -> anyhow::Result<()>;

    /// Channel CONFIRM.
    fn on_chan_open_confirm(
        &mut self,
        ctx: &mut ModuleCtx<'_>,
        port_id: &PortId,
        channel_id: &ChannelId,
    ) -> anyhow::Result<()>;

    /// Local close. Returning an error keeps the channel open.
    fn on_chan_close_init(
        &mut self,
        ctx: &mut ModuleCtx<'_>,
        port_id: &PortId,
        channel_id: &ChannelId,
    ) -> anyhow::Result<()>;

    /// Close after the counterparty closed.
    fn on_chan_close_confirm(
        &mut self,
        ctx: &mut ModuleCtx<'_>,
        port_id: &PortId,
        channel_id: &ChannelId,
    ) -> anyhow::Result<()>;

    /// Packet receipt. `Ok(None)` defers the acknowledgement to a later
    /// `write_acknowledgement`.
    fn on_recv_packet(
        &mut self,
        ctx: &mut ModuleCtx<'_>,
        packet: &Packet,
        relayer: &str,
    ) -> anyhow::Result<Option<Acknowledgement>>;

    /// The counterparty acknowledged a packet this module sent.
    fn on_acknowledgement_packet(
        &mut self,
        ctx: &mut ModuleCtx<'_>,
        packet: &Packet,
        acknowledgement: &[u8],
        relayer: &str,
    ) -> anyhow::Result<()>;

    /// A packet this module sent timed out.
    fn on_timeout_packet(
        &mut self,
        ctx: &mut ModuleCtx<'_>,
        packet: &Packet,
        relayer: &str,
    ) -> anyhow::Result<()>;

    /// Upgrade INIT. Returns the version to propose.
    fn on_chan_upgrade_init(
        &mut self,
        _ctx: &mut ModuleCtx<'_>,
        _port_id: &PortId,
        _channel_id: &ChannelId,
        _order: Order,
        _connection_hops: &[ConnectionId],
        version: &str,
    ) -> anyhow::Result<String> {
        Ok(version.to_string())
    }

    /// Upgrade TRY. Returns the version to accept.
    fn on_chan_upgrade_try(
        &mut self,
        _ctx: &mut ModuleCtx<'_>,
        _port_id: &PortId,
        _channel_id: &ChannelId,
        _order: Order,
        _connection_hops: &[ConnectionId],
        counterparty_version: &str,
    ) -> anyhow::Result<String> {
        Ok(counterparty_version.to_string())
    }

    /// Upgrade ACK.
    fn on_chan_upgrade_ack(
        &mut self,
        _ctx: &mut ModuleCtx<'_>,
        _port_id: &PortId,
        _channel_id: &ChannelId,
        _counterparty_version: &str,
    ) -> anyhow::Result<()> {
        Ok(())
    }

    /// Upgrade CONFIRM.
    fn on_chan_upgrade_confirm(
        &mut self,
        _ctx: &mut ModuleCtx<'_>,
        _port_id: &PortId,
        _channel_id: &ChannelId,
    ) -> anyhow::Result<()> {
        Ok(())
    }

    /// The upgrade completed and the channel runs with the new fields.
    fn on_chan_upgrade_open(
        &mut self,
        _ctx: &mut ModuleCtx<'_>,
        _port_id: &PortId,
        _channel_id: &ChannelId,
        _order: Order,
        _connection_hops: &[ConnectionId],
        _version: &str,
    ) {
    }

    /// The upgrade was aborted and the channel restored.
    fn on_chan_upgrade_restore(
        &mut self,
        _ctx: &mut ModuleCtx<'_>,
        _port_id: &PortId,
        _channel_id: &ChannelId,
    ) {
    }

    /// The upgrade timed out and the channel was restored.
    fn on_chan_upgrade_timeout(
        &mut self,
        _ctx: &mut ModuleCtx<'_>,
        _port_id: &PortId,
        _channel_id: &ChannelId,
    ) {
    }
}
