// Path: crates/test_utils/src/mock_module.rs
//! A scriptable application module.
//!
//! Every callback is counted and writes a sentinel key into its state branch,
//! so tests can observe both that a callback ran and whether its writes were
//! kept. Failures are switched on through [`MockHandle::configure`].

use std::sync::{Arc, Mutex, MutexGuard};

use anyhow::anyhow;
use ioi_ibc::{IbcModule, ModuleCtx};
use ioi_types::ibc::{
    Acknowledgement, ChannelCounterparty, ChannelId, ConnectionId, IbcEvent, Order, Packet, PortId,
};

/// The module id the mock registers under.
pub const MOCK_MODULE_ID: &str = "mock";
/// The port the mock binds.
pub const MOCK_PORT_ID: &str = "mock";
/// The channel version the mock proposes.
pub const MOCK_VERSION: &str = "mock-v1";
/// Payload acknowledged with [`MOCK_SUCCESS_ACK`].
pub const MOCK_PACKET_DATA: &[u8] = b"mock packet data";
/// Payload whose acknowledgement is deferred.
pub const MOCK_ASYNC_PACKET_DATA: &[u8] = b"mock async packet data";
/// Payload rejected with an error acknowledgement.
pub const MOCK_FAIL_PACKET_DATA: &[u8] = b"mock failed packet data";
/// The result carried by a success acknowledgement.
pub const MOCK_SUCCESS_ACK: &[u8] = b"mock acknowledgement";

/// Failure switches and overrides.
#[derive(Debug, Clone, Default)]
pub struct MockConfig {
    /// `on_chan_open_init` fails.
    pub fail_open_init: bool,
    /// `on_chan_open_try` fails.
    pub fail_open_try: bool,
    /// `on_chan_open_ack` fails.
    pub fail_open_ack: bool,
    /// `on_chan_close_init` fails.
    pub fail_close_init: bool,
    /// `on_recv_packet` returns an error after writing its sentinel.
    pub fail_recv: bool,
    /// `on_acknowledgement_packet` fails.
    pub fail_ack: bool,
    /// `on_timeout_packet` fails.
    pub fail_timeout: bool,
    /// `on_chan_upgrade_try` fails.
    pub fail_upgrade_try: bool,
    /// `on_chan_upgrade_ack` fails.
    pub fail_upgrade_ack: bool,
    /// Version returned by `on_chan_open_init` instead of the proposed one.
    pub open_init_version: Option<String>,
}

/// How many times each callback ran.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MockCalls {
    /// `on_chan_open_init`
    pub open_init: u32,
    /// `on_chan_open_try`
    pub open_try: u32,
    /// `on_chan_open_ack`
    pub open_ack: u32,
    /// `on_chan_open_confirm`
    pub open_confirm: u32,
    /// `on_chan_close_init`
    pub close_init: u32,
    /// `on_chan_close_confirm`
    pub close_confirm: u32,
    /// `on_recv_packet`
    pub recv: u32,
    /// `on_acknowledgement_packet`
    pub ack: u32,
    /// `on_timeout_packet`
    pub timeout: u32,
    /// `on_chan_upgrade_init`
    pub upgrade_init: u32,
    /// `on_chan_upgrade_try`
    pub upgrade_try: u32,
    /// `on_chan_upgrade_ack`
    pub upgrade_ack: u32,
    /// `on_chan_upgrade_confirm`
    pub upgrade_confirm: u32,
    /// `on_chan_upgrade_open`
    pub upgrade_open: u32,
    /// `on_chan_upgrade_restore`
    pub upgrade_restore: u32,
    /// `on_chan_upgrade_timeout`
    pub upgrade_timeout: u32,
}

#[derive(Debug, Default)]
struct Shared {
    config: MockConfig,
    calls: MockCalls,
}

fn lock(shared: &Mutex<Shared>) -> MutexGuard<'_, Shared> {
    shared.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Test-side view of a [`MockModule`] that was moved into a router.
#[derive(Debug, Clone)]
pub struct MockHandle {
    shared: Arc<Mutex<Shared>>,
}

impl MockHandle {
    /// Changes the module's failure switches.
    pub fn configure(&self, f: impl FnOnce(&mut MockConfig)) {
        f(&mut lock(&self.shared).config);
    }

    /// A snapshot of the callback counters.
    pub fn calls(&self) -> MockCalls {
        lock(&self.shared).calls.clone()
    }
}

/// The sentinel key `on_recv_packet` writes for a packet.
pub fn recv_sentinel_key(packet: &Packet) -> Vec<u8> {
    format!(
        "mock/recv/{}/{}/{}",
        packet.destination_port, packet.destination_channel, packet.sequence
    )
    .into_bytes()
}

/// The sentinel key a channel callback writes for `step`.
pub fn channel_sentinel_key(step: &str, port_id: &PortId, channel_id: &ChannelId) -> Vec<u8> {
    format!("mock/{step}/{port_id}/{channel_id}").into_bytes()
}

/// An application module driven by its [`MockHandle`].
#[derive(Debug, Default)]
pub struct MockModule {
    shared: Arc<Mutex<Shared>>,
}

impl MockModule {
    /// Creates a module with every callback succeeding.
    pub fn new() -> Self {
        Self::default()
    }

    /// A handle that keeps working after the module is boxed into a router.
    pub fn handle(&self) -> MockHandle {
        MockHandle {
            shared: Arc::clone(&self.shared),
        }
    }

    fn record(&self, f: impl FnOnce(&mut MockCalls)) -> MockConfig {
        let mut shared = lock(&self.shared);
        f(&mut shared.calls);
        shared.config.clone()
    }

    fn mark(
        ctx: &mut ModuleCtx<'_>,
        step: &str,
        port_id: &PortId,
        channel_id: &ChannelId,
    ) -> anyhow::Result<()> {
        ctx.state
            .insert(&channel_sentinel_key(step, port_id, channel_id), &[1])?;
        ctx.emit(IbcEvent::module(
            "mock",
            vec![
                ("step".into(), step.into()),
                ("port_id".into(), port_id.to_string()),
                ("channel_id".into(), channel_id.to_string()),
            ],
        ));
        Ok(())
    }
}

impl IbcModule for MockModule {
    fn on_chan_open_init(
        &mut self,
        ctx: &mut ModuleCtx<'_>,
        _order: Order,
        _connection_hops: &[ConnectionId],
        port_id: &PortId,
        channel_id: &ChannelId,
        _counterparty: &ChannelCounterparty,
        version: &str,
    ) -> anyhow::Result<String> {
        let config = self.record(|c| c.open_init += 1);
        Self::mark(ctx, "open_init", port_id, channel_id)?;
        if config.fail_open_init {
            return Err(anyhow!("mock open init rejected"));
        }
        Ok(config.open_init_version.unwrap_or_else(|| match version {
            "" => MOCK_VERSION.to_string(),
            v => v.to_string(),
        }))
    }

    fn on_chan_open_try(
        &mut self,
        ctx: &mut ModuleCtx<'_>,
        _order: Order,
        _connection_hops: &[ConnectionId],
        port_id: &PortId,
        channel_id: &ChannelId,
        _counterparty: &ChannelCounterparty,
        counterparty_version: &str,
    ) -> anyhow::Result<String> {
        let config = self.record(|c| c.open_try += 1);
        Self::mark(ctx, "open_try", port_id, channel_id)?;
        if config.fail_open_try {
            return Err(anyhow!("mock open try rejected"));
        }
        Ok(counterparty_version.to_string())
    }

    fn on_chan_open_ack(
        &mut self,
        ctx: &mut ModuleCtx<'_>,
        port_id: &PortId,
        channel_id: &ChannelId,
        _counterparty_channel_id: &ChannelId,
        _counterparty_version: &str,
    ) -> anyhow::Result<()> {
        let config = self.record(|c| c.open_ack += 1);
        Self::mark(ctx, "open_ack", port_id, channel_id)?;
        if config.fail_open_ack {
            return Err(anyhow!("mock open ack rejected"));
        }
        Ok(())
    }

    fn on_chan_open_confirm(
        &mut self,
        ctx: &mut ModuleCtx<'_>,
        port_id: &PortId,
        channel_id: &ChannelId,
    ) -> anyhow::Result<()> {
        self.record(|c| c.open_confirm += 1);
        Self::mark(ctx, "open_confirm", port_id, channel_id)
    }

    fn on_chan_close_init(
        &mut self,
        ctx: &mut ModuleCtx<'_>,
        port_id: &PortId,
        channel_id: &ChannelId,
    ) -> anyhow::Result<()> {
        let config = self.record(|c| c.close_init += 1);
        if config.fail_close_init {
            return Err(anyhow!("mock refuses to close"));
        }
        Self::mark(ctx, "close_init", port_id, channel_id)
    }

    fn on_chan_close_confirm(
        &mut self,
        ctx: &mut ModuleCtx<'_>,
        port_id: &PortId,
        channel_id: &ChannelId,
    ) -> anyhow::Result<()> {
        self.record(|c| c.close_confirm += 1);
        Self::mark(ctx, "close_confirm", port_id, channel_id)
    }

    fn on_recv_packet(
        &mut self,
        ctx: &mut ModuleCtx<'_>,
        packet: &Packet,
        _relayer: &str,
    ) -> anyhow::Result<Option<Acknowledgement>> {
        let config = self.record(|c| c.recv += 1);
        ctx.state.insert(&recv_sentinel_key(packet), &packet.data)?;
        ctx.emit(IbcEvent::module(
            "mock_recv",
            vec![("sequence".into(), packet.sequence.to_string())],
        ));
        if config.fail_recv {
            return Err(anyhow!("mock receive failed"));
        }
        Ok(match packet.data.as_slice() {
            MOCK_PACKET_DATA => Some(Acknowledgement::success(MOCK_SUCCESS_ACK)),
            MOCK_ASYNC_PACKET_DATA => None,
            _ => Some(Acknowledgement::error("mock rejected packet data")),
        })
    }

    fn on_acknowledgement_packet(
        &mut self,
        ctx: &mut ModuleCtx<'_>,
        packet: &Packet,
        acknowledgement: &[u8],
        _relayer: &str,
    ) -> anyhow::Result<()> {
        let config = self.record(|c| c.ack += 1);
        if config.fail_ack {
            return Err(anyhow!("mock acknowledgement handling failed"));
        }
        let key = format!(
            "mock/ack/{}/{}/{}",
            packet.source_port, packet.source_channel, packet.sequence
        );
        ctx.state.insert(key.as_bytes(), acknowledgement)?;
        Ok(())
    }

    fn on_timeout_packet(
        &mut self,
        ctx: &mut ModuleCtx<'_>,
        packet: &Packet,
        _relayer: &str,
    ) -> anyhow::Result<()> {
        let config = self.record(|c| c.timeout += 1);
        if config.fail_timeout {
            return Err(anyhow!("mock timeout handling failed"));
        }
        let key = format!(
            "mock/timeout/{}/{}/{}",
            packet.source_port, packet.source_channel, packet.sequence
        );
        ctx.state.insert(key.as_bytes(), &[1])?;
        Ok(())
    }

    fn on_chan_upgrade_init(
        &mut self,
        ctx: &mut ModuleCtx<'_>,
        port_id: &PortId,
        channel_id: &ChannelId,
        _order: Order,
        _connection_hops: &[ConnectionId],
        version: &str,
    ) -> anyhow::Result<String> {
        self.record(|c| c.upgrade_init += 1);
        Self::mark(ctx, "upgrade_init", port_id, channel_id)?;
        Ok(version.to_string())
    }

    fn on_chan_upgrade_try(
        &mut self,
        ctx: &mut ModuleCtx<'_>,
        port_id: &PortId,
        channel_id: &ChannelId,
        _order: Order,
        _connection_hops: &[ConnectionId],
        counterparty_version: &str,
    ) -> anyhow::Result<String> {
        let config = self.record(|c| c.upgrade_try += 1);
        Self::mark(ctx, "upgrade_try", port_id, channel_id)?;
        if config.fail_upgrade_try {
            return Err(anyhow!("mock upgrade try rejected"));
        }
        Ok(counterparty_version.to_string())
    }

    fn on_chan_upgrade_ack(
        &mut self,
        ctx: &mut ModuleCtx<'_>,
        port_id: &PortId,
        channel_id: &ChannelId,
        _counterparty_version: &str,
    ) -> anyhow::Result<()> {
        let config = self.record(|c| c.upgrade_ack += 1);
        Self::mark(ctx, "upgrade_ack", port_id, channel_id)?;
        if config.fail_upgrade_ack {
            return Err(anyhow!("mock upgrade ack rejected"));
        }
        Ok(())
    }

    fn on_chan_upgrade_confirm(
        &mut self,
        ctx: &mut ModuleCtx<'_>,
        port_id: &PortId,
        channel_id: &ChannelId,
    ) -> anyhow::Result<()> {
        self.record(|c| c.upgrade_confirm += 1);
        Self::mark(ctx, "upgrade_confirm", port_id, channel_id)
    }

    fn on_chan_upgrade_open(
        &mut self,
        _ctx: &mut ModuleCtx<'_>,
        _port_id: &PortId,
        _channel_id: &ChannelId,
        _order: Order,
        _connection_hops: &[ConnectionId],
        _version: &str,
    ) {
        self.record(|c| c.upgrade_open += 1);
    }

    fn on_chan_upgrade_restore(
        &mut self,
        _ctx: &mut ModuleCtx<'_>,
        _port_id: &PortId,
        _channel_id: &ChannelId,
    ) {
        self.record(|c| c.upgrade_restore += 1);
    }

    fn on_chan_upgrade_timeout(
        &mut self,
        _ctx: &mut ModuleCtx<'_>,
        _port_id: &PortId,
        _channel_id: &ChannelId,
    ) {
        self.record(|c| c.upgrade_timeout += 1);
    }
}
