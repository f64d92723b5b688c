// Path: crates/test_utils/src/chain.rs
//! A single in-memory host chain running the IBC core.
//!
//! The chain keeps a snapshot of its state at every committed height. Its
//! "state root" is a digest over that snapshot, so a counterparty client
//! updated with [`MockChain::header`] can check [`MockChain::prove`] proofs
//! against it.

use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::{anyhow, Context};
use ioi_api::state::{InMemoryState, StateAccessor};
use ioi_ibc::{Capability, CapabilityRegistry, IbcCore, IbcStore};
use ioi_types::codec::to_bytes_canonical;
use ioi_types::config::IbcConfig;
use ioi_types::error::IbcError;
use ioi_types::ibc::{
    channel_capability_name, BlockContext, ChannelEnd, ChannelId, ConnectionEnd, ConnectionId,
    Height, IbcEvent, MerklePath, ModuleId, MsgEnvelope, MsgOutcome, Path, PortId, Sequence,
};
use sha2::{Digest, Sha256};

use crate::mock_client::{membership_proof, non_membership_proof, MockHeader, MockVerifier};
use crate::mock_module::{MockHandle, MockModule, MOCK_MODULE_ID, MOCK_PORT_ID};

/// Nanoseconds between two blocks.
pub const BLOCK_TIME: u64 = 5_000_000_000;
/// The timestamp of height 1.
pub const GENESIS_TIME: u64 = 1_700_000_000_000_000_000;

/// One chain: an [`IbcCore`] with the mock client and module, its live state
/// and the snapshots of every committed height.
pub struct MockChain {
    /// A label for logs and assertions.
    pub name: String,
    /// The IBC core.
    pub core: IbcCore,
    /// The uncommitted state the next message executes on.
    pub state: InMemoryState,
    /// Control over the bound mock module.
    pub module: MockHandle,
    /// The port capability returned by binding.
    pub port_capability: Capability,
    height: u64,
    timestamp: u64,
    snapshots: BTreeMap<u64, (u64, InMemoryState)>,
}

impl std::fmt::Debug for MockChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockChain")
            .field("name", &self.name)
            .field("height", &self.height)
            .field("timestamp", &self.timestamp)
            .field("entries", &self.state.len())
            .finish()
    }
}

fn state_root(state: &InMemoryState) -> Vec<u8> {
    let mut hasher = Sha256::new();
    for (key, value) in state.iter() {
        hasher.update((key.len() as u64).to_be_bytes());
        hasher.update(key);
        hasher.update((value.len() as u64).to_be_bytes());
        hasher.update(value);
    }
    hasher.finalize().to_vec()
}

impl MockChain {
    /// Creates a chain at height 1 with `config`, the mock verifier and the
    /// mock module bound to the `mock` port.
    pub fn new(name: &str, config: IbcConfig) -> anyhow::Result<Self> {
        let mut core = IbcCore::new(config);
        core.register_verifier(Arc::new(MockVerifier));
        let module = MockModule::new();
        let handle = module.handle();
        let module_id = ModuleId::new(MOCK_MODULE_ID);
        core.add_module(module_id.clone(), Box::new(module))?;

        let mut state = InMemoryState::new();
        let port_id = PortId::new(MOCK_PORT_ID)?;
        let port_capability = core.bind_port(&mut state, &port_id, &module_id)?;

        Ok(Self {
            name: name.to_string(),
            core,
            state,
            module: handle,
            port_capability,
            height: 1,
            timestamp: GENESIS_TIME,
            snapshots: BTreeMap::new(),
        })
    }

    /// The block the next message executes in.
    pub fn block(&self) -> BlockContext {
        BlockContext::new(self.height, self.timestamp)
    }

    /// The height of the block being built.
    pub fn height(&self) -> Height {
        Height::new(0, self.height)
    }

    /// The timestamp of the block being built.
    pub fn timestamp(&self) -> u64 {
        self.timestamp
    }

    /// Seals the current block and starts the next one. Returns the sealed height.
    pub fn commit(&mut self) -> Height {
        let sealed = self.height;
        self.snapshots
            .insert(sealed, (self.timestamp, self.state.clone()));
        tracing::debug!(target: "ibc.test", chain = %self.name, height = sealed, "block committed");
        self.height += 1;
        self.timestamp += BLOCK_TIME;
        Height::new(0, sealed)
    }

    /// Seals `blocks` empty blocks.
    pub fn advance(&mut self, blocks: u64) {
        for _ in 0..blocks {
            self.commit();
        }
    }

    /// Skips ahead in time without producing blocks.
    pub fn advance_time(&mut self, nanos: u64) {
        self.timestamp += nanos;
    }

    /// The latest sealed height.
    pub fn latest_height(&self) -> anyhow::Result<Height> {
        self.snapshots
            .keys()
            .next_back()
            .map(|h| Height::new(0, *h))
            .ok_or_else(|| anyhow!("{} has no committed block", self.name))
    }

    fn snapshot(&self, height: Height) -> anyhow::Result<&(u64, InMemoryState)> {
        self.snapshots
            .get(&height.revision_height)
            .with_context(|| format!("{} has no block at {height}", self.name))
    }

    /// The header a counterparty client is updated with.
    pub fn header(&self, height: Height) -> anyhow::Result<MockHeader> {
        let (timestamp, state) = self.snapshot(height)?;
        Ok(MockHeader {
            height,
            timestamp: *timestamp,
            root: state_root(state),
        })
    }

    /// The raw value at `path` in the block sealed at `height`.
    pub fn value_at(&self, height: Height, path: &Path) -> anyhow::Result<Option<Vec<u8>>> {
        Ok(self.snapshot(height)?.1.get(&path.to_key())?)
    }

    /// A proof of whatever `path` holds at `height`: membership when the key
    /// is set, absence otherwise.
    pub fn prove(&self, height: Height, path: &Path) -> anyhow::Result<Vec<u8>> {
        let (_, state) = self.snapshot(height)?;
        let root = state_root(state);
        let prefix = self.core.config().commitment_prefix.as_bytes();
        let merkle_path = MerklePath::new(prefix, path);
        Ok(match state.get(&path.to_key())? {
            Some(value) => membership_proof(&root, &merkle_path, &value),
            None => non_membership_proof(&root, &merkle_path),
        })
    }

    /// Executes one message in the current block.
    pub fn dispatch(&mut self, msg: MsgEnvelope) -> Result<MsgOutcome, IbcError> {
        let block = self.block();
        self.core.dispatch(&mut self.state, block, msg)
    }

    /// Executes a service call in the current block.
    pub fn service_call(&mut self, method: &str, params: &[u8]) -> Result<Vec<MsgOutcome>, IbcError> {
        let block = self.block();
        self.core
            .handle_service_call(&mut self.state, block, method, params)
    }

    /// Executes `msgs` as one `msg_dispatch@v1` batch.
    pub fn dispatch_batch(&mut self, msgs: Vec<MsgEnvelope>) -> Result<Vec<MsgOutcome>, IbcError> {
        self.service_call(ioi_ibc::MSG_DISPATCH_METHOD, &to_bytes_canonical(&msgs))
    }

    /// The mock module's capability for a channel.
    pub fn channel_capability(
        &self,
        port_id: &PortId,
        channel_id: &ChannelId,
    ) -> anyhow::Result<Capability> {
        CapabilityRegistry::get_capability(
            &self.state,
            &ModuleId::new(MOCK_MODULE_ID),
            &channel_capability_name(port_id, channel_id),
        )?
        .with_context(|| format!("mock module holds no capability for {port_id}/{channel_id}"))
    }

    /// Sends a packet as the mock module.
    pub fn send_packet(
        &mut self,
        port_id: &PortId,
        channel_id: &ChannelId,
        timeout_height: Height,
        timeout_timestamp: u64,
        data: &[u8],
    ) -> Result<(Sequence, Vec<IbcEvent>), IbcError> {
        let capability = self
            .channel_capability(port_id, channel_id)
            .map_err(|e| IbcError::Unauthorized(e.to_string()))?;
        let block = self.block();
        self.core.send_packet(
            &mut self.state,
            block,
            &capability,
            port_id,
            channel_id,
            timeout_height,
            timeout_timestamp,
            data.to_vec(),
        )
    }

    /// The live channel end.
    pub fn channel(&self, port_id: &PortId, channel_id: &ChannelId) -> Result<ChannelEnd, IbcError> {
        self.state.channel(port_id, channel_id)
    }

    /// The live connection end.
    pub fn connection(&self, connection_id: &ConnectionId) -> Result<ConnectionEnd, IbcError> {
        self.state.connection(connection_id)
    }

    /// True if the live state has a value at `path`.
    pub fn has(&self, path: &Path) -> anyhow::Result<bool> {
        self.has_key(&path.to_key())
    }

    /// True if the live state has a value under the raw `key`.
    pub fn has_key(&self, key: &[u8]) -> anyhow::Result<bool> {
        Ok(self.state.get(key)?.is_some())
    }
}
