// Path: crates/types/src/ibc/path.rs
//! ICS-24 store paths.
//!
//! Every key the core reads or writes, on this chain or in a counterparty
//! proof, is rendered from one of these variants.

use super::{ChannelId, ClientId, ConnectionId, Height, PortId, Sequence};
use std::fmt;

/// A key in the IBC store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Path {
    /// `nextClientSequence`
    NextClientSequence,
    /// `nextConnectionSequence`
    NextConnectionSequence,
    /// `nextChannelSequence`
    NextChannelSequence,
    /// `clients/{client}/clientState`
    ClientState(ClientId),
    /// `clients/{client}/consensusStates/{height}`
    ClientConsensusState(ClientId, Height),
    /// `clients/{client}/processedMeta/{height}`
    ClientConsensusMeta(ClientId, Height),
    /// `clients/{client}/connections`
    ClientConnections(ClientId),
    /// `connections/{connection}`
    Connection(ConnectionId),
    /// `channelEnds/ports/{port}/channels/{channel}`
    ChannelEnd(PortId, ChannelId),
    /// `nextSequenceSend/ports/{port}/channels/{channel}`
    SeqSend(PortId, ChannelId),
    /// `nextSequenceRecv/ports/{port}/channels/{channel}`
    SeqRecv(PortId, ChannelId),
    /// `nextSequenceAck/ports/{port}/channels/{channel}`
    SeqAck(PortId, ChannelId),
    /// `commitments/ports/{port}/channels/{channel}/sequences/{sequence}`
    Commitment(PortId, ChannelId, Sequence),
    /// `receipts/ports/{port}/channels/{channel}/sequences/{sequence}`
    Receipt(PortId, ChannelId, Sequence),
    /// `acks/ports/{port}/channels/{channel}/sequences/{sequence}`
    Ack(PortId, ChannelId, Sequence),
    /// `channelUpgrades/upgrades/ports/{port}/channels/{channel}`
    Upgrade(PortId, ChannelId),
    /// `channelUpgrades/counterpartyUpgrade/ports/{port}/channels/{channel}`
    CounterpartyUpgrade(PortId, ChannelId),
    /// `channelUpgrades/upgradeError/ports/{port}/channels/{channel}`
    UpgradeError(PortId, ChannelId),
    /// `capabilities/index`
    CapabilityIndex,
    /// `capabilities/owners/{name}`
    CapabilityOwner(String),
}

impl Path {
    /// The key bytes of this path.
    pub fn to_key(&self) -> Vec<u8> {
        self.to_string().into_bytes()
    }

    /// The key prefix shared by all packet commitments of a channel.
    pub fn commitments_prefix(port_id: &PortId, channel_id: &ChannelId) -> Vec<u8> {
        format!("commitments/ports/{port_id}/channels/{channel_id}/sequences/").into_bytes()
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Path::NextClientSequence => f.write_str("nextClientSequence"),
            Path::NextConnectionSequence => f.write_str("nextConnectionSequence"),
            Path::NextChannelSequence => f.write_str("nextChannelSequence"),
            Path::ClientState(c) => write!(f, "clients/{c}/clientState"),
            Path::ClientConsensusState(c, h) => write!(f, "clients/{c}/consensusStates/{h}"),
            Path::ClientConsensusMeta(c, h) => write!(f, "clients/{c}/processedMeta/{h}"),
            Path::ClientConnections(c) => write!(f, "clients/{c}/connections"),
            Path::Connection(c) => write!(f, "connections/{c}"),
            Path::ChannelEnd(p, c) => write!(f, "channelEnds/ports/{p}/channels/{c}"),
            Path::SeqSend(p, c) => write!(f, "nextSequenceSend/ports/{p}/channels/{c}"),
            Path::SeqRecv(p, c) => write!(f, "nextSequenceRecv/ports/{p}/channels/{c}"),
            Path::SeqAck(p, c) => write!(f, "nextSequenceAck/ports/{p}/channels/{c}"),
            Path::Commitment(p, c, s) => {
                write!(f, "commitments/ports/{p}/channels/{c}/sequences/{s}")
            }
            Path::Receipt(p, c, s) => write!(f, "receipts/ports/{p}/channels/{c}/sequences/{s}"),
            Path::Ack(p, c, s) => write!(f, "acks/ports/{p}/channels/{c}/sequences/{s}"),
            Path::Upgrade(p, c) => write!(f, "channelUpgrades/upgrades/ports/{p}/channels/{c}"),
            Path::CounterpartyUpgrade(p, c) => {
                write!(f, "channelUpgrades/counterpartyUpgrade/ports/{p}/channels/{c}")
            }
            Path::UpgradeError(p, c) => {
                write!(f, "channelUpgrades/upgradeError/ports/{p}/channels/{c}")
            }
            Path::CapabilityIndex => f.write_str("capabilities/index"),
            Path::CapabilityOwner(name) => write!(f, "capabilities/owners/{name}"),
        }
    }
}

/// The capability name guarding a port.
pub fn port_capability_name(port_id: &PortId) -> String {
    format!("ports/{port_id}")
}

/// The capability name guarding a channel.
pub fn channel_capability_name(port_id: &PortId, channel_id: &ChannelId) -> String {
    format!("capabilities/ports/{port_id}/channels/{channel_id}")
}

/// A path in a counterparty store, qualified by that store's commitment prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MerklePath {
    /// The counterparty commitment prefix.
    pub prefix: Vec<u8>,
    /// The path within the prefixed store.
    pub path: String,
}

impl MerklePath {
    /// Qualifies `path` with `prefix`.
    pub fn new(prefix: &[u8], path: &Path) -> Self {
        Self {
            prefix: prefix.to_vec(),
            path: path.to_string(),
        }
    }
}

impl fmt::Display for MerklePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", String::from_utf8_lossy(&self.prefix), self.path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_ics24_layout() {
        let port = PortId::new("transfer").unwrap();
        let chan = ChannelId::new_indexed(0);
        assert_eq!(
            Path::Commitment(port.clone(), chan.clone(), Sequence(4)).to_string(),
            "commitments/ports/transfer/channels/channel-0/sequences/4"
        );
        assert_eq!(
            Path::SeqRecv(port.clone(), chan.clone()).to_string(),
            "nextSequenceRecv/ports/transfer/channels/channel-0"
        );
        assert!(Path::Commitment(port.clone(), chan.clone(), Sequence(4))
            .to_key()
            .starts_with(&Path::commitments_prefix(&port, &chan)));
    }
}
