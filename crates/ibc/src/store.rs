// Path: crates/ibc/src/store.rs
//! Typed access to the ICS-24 key space on top of any [`StateAccessor`].

use ioi_api::state::StateAccessor;
use ioi_types::codec::{from_bytes_canonical, to_bytes_canonical};
use ioi_types::error::{IbcError, StateError};
use ioi_types::ibc::{
    ChannelEnd, ChannelId, ClientId, ClientState, ConnectionEnd, ConnectionId, ConsensusMeta,
    ConsensusState, ErrorReceipt, Height, Path, PortId, Sequence, Upgrade, RECEIPT_MARKER,
};
use parity_scale_codec::{Decode, Encode};

/// Typed getters and setters for every value the core persists.
///
/// Implemented for every state accessor, so the same calls work on the
/// committed store and on a speculative branch.
pub trait IbcStore: StateAccessor {
    /// Reads the raw bytes stored at `path`.
    fn get_raw(&self, path: &Path) -> Result<Option<Vec<u8>>, IbcError> {
        Ok(self.get(&path.to_key())?)
    }

    /// Writes raw bytes at `path`.
    fn put_raw(&mut self, path: &Path, value: &[u8]) -> Result<(), IbcError> {
        Ok(self.insert(&path.to_key(), value)?)
    }

    /// Deletes the value at `path`.
    fn del_raw(&mut self, path: &Path) -> Result<(), IbcError> {
        Ok(self.delete(&path.to_key())?)
    }

    /// Reads and decodes the canonical value stored at `path`.
    fn get_value<T: Decode>(&self, path: &Path) -> Result<Option<T>, IbcError> {
        match self.get_raw(path)? {
            Some(bytes) => from_bytes_canonical(&bytes)
                .map(Some)
                .map_err(|e| IbcError::State(StateError::InvalidValue(format!("{path}: {e}")))),
            None => Ok(None),
        }
    }

    /// Encodes `value` canonically and writes it at `path`.
    fn put_value<T: Encode>(&mut self, path: &Path, value: &T) -> Result<(), IbcError> {
        self.put_raw(path, &to_bytes_canonical(value))
    }

    /// Reads a big-endian `u64`, zero if unset.
    fn read_u64_be(&self, path: &Path) -> Result<u64, IbcError> {
        match self.get_raw(path)? {
            Some(bytes) => {
                let arr: [u8; 8] = bytes.as_slice().try_into().map_err(|_| {
                    IbcError::State(StateError::InvalidValue(format!(
                        "invalid u64 at {path} ({} bytes)",
                        bytes.len()
                    )))
                })?;
                Ok(u64::from_be_bytes(arr))
            }
            None => Ok(0),
        }
    }

    /// Writes a big-endian `u64`.
    fn write_u64_be(&mut self, path: &Path, value: u64) -> Result<(), IbcError> {
        self.put_raw(path, &value.to_be_bytes())
    }

    /// Returns the counter at `path` and advances it.
    fn next_counter(&mut self, path: &Path) -> Result<u64, IbcError> {
        let current = self.read_u64_be(path)?;
        self.write_u64_be(path, current.saturating_add(1))?;
        Ok(current)
    }

    // ----------------------------- Clients -----------------------------

    /// Loads a client state.
    fn client_state(&self, client_id: &ClientId) -> Result<ClientState, IbcError> {
        self.get_value(&Path::ClientState(client_id.clone()))?
            .ok_or_else(|| IbcError::ClientNotFound(client_id.to_string()))
    }

    /// Stores a client state.
    fn set_client_state(&mut self, client_id: &ClientId, state: &ClientState) -> Result<(), IbcError> {
        self.put_value(&Path::ClientState(client_id.clone()), state)
    }

    /// Loads the consensus state a client stored at `height`.
    fn consensus_state(
        &self,
        client_id: &ClientId,
        height: Height,
    ) -> Result<Option<ConsensusState>, IbcError> {
        self.get_value(&Path::ClientConsensusState(client_id.clone(), height))
    }

    /// Stores a consensus state together with the host time and height it was processed at.
    fn set_consensus_state(
        &mut self,
        client_id: &ClientId,
        height: Height,
        consensus_state: &ConsensusState,
        meta: &ConsensusMeta,
    ) -> Result<(), IbcError> {
        self.put_value(&Path::ClientConsensusState(client_id.clone(), height), consensus_state)?;
        self.put_value(&Path::ClientConsensusMeta(client_id.clone(), height), meta)
    }

    /// Loads the processed time and height of a consensus state.
    fn consensus_meta(
        &self,
        client_id: &ClientId,
        height: Height,
    ) -> Result<Option<ConsensusMeta>, IbcError> {
        self.get_value(&Path::ClientConsensusMeta(client_id.clone(), height))
    }

    // --------------------------- Connections ---------------------------

    /// Loads a connection end.
    fn connection(&self, connection_id: &ConnectionId) -> Result<ConnectionEnd, IbcError> {
        self.get_value(&Path::Connection(connection_id.clone()))?
            .ok_or_else(|| IbcError::ConnectionNotFound(connection_id.to_string()))
    }

    /// Stores a connection end.
    fn set_connection(
        &mut self,
        connection_id: &ConnectionId,
        connection: &ConnectionEnd,
    ) -> Result<(), IbcError> {
        self.put_value(&Path::Connection(connection_id.clone()), connection)
    }

    /// Lists the connections built on a client.
    fn client_connections(&self, client_id: &ClientId) -> Result<Vec<ConnectionId>, IbcError> {
        Ok(self
            .get_value(&Path::ClientConnections(client_id.clone()))?
            .unwrap_or_default())
    }

    /// Records that `connection_id` is built on `client_id`.
    fn add_client_connection(
        &mut self,
        client_id: &ClientId,
        connection_id: &ConnectionId,
    ) -> Result<(), IbcError> {
        let mut connections = self.client_connections(client_id)?;
        connections.push(connection_id.clone());
        self.put_value(&Path::ClientConnections(client_id.clone()), &connections)
    }

    // ----------------------------- Channels ----------------------------

    /// Loads a channel end if it exists.
    fn try_channel(&self, port_id: &PortId, channel_id: &ChannelId) -> Result<Option<ChannelEnd>, IbcError> {
        self.get_value(&Path::ChannelEnd(port_id.clone(), channel_id.clone()))
    }

    /// Loads a channel end.
    fn channel(&self, port_id: &PortId, channel_id: &ChannelId) -> Result<ChannelEnd, IbcError> {
        self.try_channel(port_id, channel_id)?
            .ok_or_else(|| IbcError::ChannelNotFound {
                port_id: port_id.to_string(),
                channel_id: channel_id.to_string(),
            })
    }

    /// Stores a channel end.
    fn set_channel(
        &mut self,
        port_id: &PortId,
        channel_id: &ChannelId,
        channel: &ChannelEnd,
    ) -> Result<(), IbcError> {
        self.put_value(&Path::ChannelEnd(port_id.clone(), channel_id.clone()), channel)
    }

    /// The next sequence to send on a channel.
    fn next_sequence_send(&self, port_id: &PortId, channel_id: &ChannelId) -> Result<Sequence, IbcError> {
        self.read_u64_be(&Path::SeqSend(port_id.clone(), channel_id.clone()))
            .map(Sequence)
    }

    /// Sets the next sequence to send.
    fn set_next_sequence_send(
        &mut self,
        port_id: &PortId,
        channel_id: &ChannelId,
        seq: Sequence,
    ) -> Result<(), IbcError> {
        self.write_u64_be(&Path::SeqSend(port_id.clone(), channel_id.clone()), seq.value())
    }

    /// The next sequence expected on an ORDERED channel.
    fn next_sequence_recv(&self, port_id: &PortId, channel_id: &ChannelId) -> Result<Sequence, IbcError> {
        self.read_u64_be(&Path::SeqRecv(port_id.clone(), channel_id.clone()))
            .map(Sequence)
    }

    /// Sets the next sequence to receive.
    fn set_next_sequence_recv(
        &mut self,
        port_id: &PortId,
        channel_id: &ChannelId,
        seq: Sequence,
    ) -> Result<(), IbcError> {
        self.write_u64_be(&Path::SeqRecv(port_id.clone(), channel_id.clone()), seq.value())
    }

    /// The next sequence to be acknowledged on an ORDERED channel.
    fn next_sequence_ack(&self, port_id: &PortId, channel_id: &ChannelId) -> Result<Sequence, IbcError> {
        self.read_u64_be(&Path::SeqAck(port_id.clone(), channel_id.clone()))
            .map(Sequence)
    }

    /// Sets the next sequence to acknowledge.
    fn set_next_sequence_ack(
        &mut self,
        port_id: &PortId,
        channel_id: &ChannelId,
        seq: Sequence,
    ) -> Result<(), IbcError> {
        self.write_u64_be(&Path::SeqAck(port_id.clone(), channel_id.clone()), seq.value())
    }

    // ----------------------------- Packets -----------------------------

    /// Loads a packet commitment.
    fn packet_commitment(
        &self,
        port_id: &PortId,
        channel_id: &ChannelId,
        seq: Sequence,
    ) -> Result<Option<Vec<u8>>, IbcError> {
        self.get_raw(&Path::Commitment(port_id.clone(), channel_id.clone(), seq))
    }

    /// Stores a packet commitment.
    fn set_packet_commitment(
        &mut self,
        port_id: &PortId,
        channel_id: &ChannelId,
        seq: Sequence,
        commitment: &[u8],
    ) -> Result<(), IbcError> {
        self.put_raw(&Path::Commitment(port_id.clone(), channel_id.clone(), seq), commitment)
    }

    /// Deletes a packet commitment.
    fn delete_packet_commitment(
        &mut self,
        port_id: &PortId,
        channel_id: &ChannelId,
        seq: Sequence,
    ) -> Result<(), IbcError> {
        self.del_raw(&Path::Commitment(port_id.clone(), channel_id.clone(), seq))
    }

    /// Returns true if any packet sent on the channel is still committed.
    fn has_inflight_packets(&self, port_id: &PortId, channel_id: &ChannelId) -> Result<bool, IbcError> {
        let prefix = Path::commitments_prefix(port_id, channel_id);
        Ok(!self.prefix_scan(&prefix)?.is_empty())
    }

    /// Returns true if a receipt exists for the sequence.
    fn has_packet_receipt(
        &self,
        port_id: &PortId,
        channel_id: &ChannelId,
        seq: Sequence,
    ) -> Result<bool, IbcError> {
        Ok(self
            .get_raw(&Path::Receipt(port_id.clone(), channel_id.clone(), seq))?
            .is_some())
    }

    /// Writes a packet receipt.
    fn set_packet_receipt(
        &mut self,
        port_id: &PortId,
        channel_id: &ChannelId,
        seq: Sequence,
    ) -> Result<(), IbcError> {
        self.put_raw(&Path::Receipt(port_id.clone(), channel_id.clone(), seq), RECEIPT_MARKER)
    }

    /// Loads an acknowledgement commitment.
    fn packet_acknowledgement(
        &self,
        port_id: &PortId,
        channel_id: &ChannelId,
        seq: Sequence,
    ) -> Result<Option<Vec<u8>>, IbcError> {
        self.get_raw(&Path::Ack(port_id.clone(), channel_id.clone(), seq))
    }

    /// Stores an acknowledgement commitment.
    fn set_packet_acknowledgement(
        &mut self,
        port_id: &PortId,
        channel_id: &ChannelId,
        seq: Sequence,
        ack_commitment: &[u8],
    ) -> Result<(), IbcError> {
        self.put_raw(&Path::Ack(port_id.clone(), channel_id.clone(), seq), ack_commitment)
    }

    // ----------------------------- Upgrades ----------------------------

    /// Loads this end's upgrade proposal.
    fn upgrade(&self, port_id: &PortId, channel_id: &ChannelId) -> Result<Option<Upgrade>, IbcError> {
        self.get_value(&Path::Upgrade(port_id.clone(), channel_id.clone()))
    }

    /// Stores this end's upgrade proposal.
    fn set_upgrade(
        &mut self,
        port_id: &PortId,
        channel_id: &ChannelId,
        upgrade: &Upgrade,
    ) -> Result<(), IbcError> {
        self.put_value(&Path::Upgrade(port_id.clone(), channel_id.clone()), upgrade)
    }

    /// Loads the counterparty upgrade recorded during flushing.
    fn counterparty_upgrade(
        &self,
        port_id: &PortId,
        channel_id: &ChannelId,
    ) -> Result<Option<Upgrade>, IbcError> {
        self.get_value(&Path::CounterpartyUpgrade(port_id.clone(), channel_id.clone()))
    }

    /// Records the counterparty upgrade.
    fn set_counterparty_upgrade(
        &mut self,
        port_id: &PortId,
        channel_id: &ChannelId,
        upgrade: &Upgrade,
    ) -> Result<(), IbcError> {
        self.put_value(&Path::CounterpartyUpgrade(port_id.clone(), channel_id.clone()), upgrade)
    }

    /// Deletes both the local and the counterparty upgrade.
    fn delete_upgrade_info(&mut self, port_id: &PortId, channel_id: &ChannelId) -> Result<(), IbcError> {
        self.del_raw(&Path::Upgrade(port_id.clone(), channel_id.clone()))?;
        self.del_raw(&Path::CounterpartyUpgrade(port_id.clone(), channel_id.clone()))
    }

    /// Loads the latest upgrade error receipt.
    fn upgrade_error(
        &self,
        port_id: &PortId,
        channel_id: &ChannelId,
    ) -> Result<Option<ErrorReceipt>, IbcError> {
        self.get_value(&Path::UpgradeError(port_id.clone(), channel_id.clone()))
    }

    /// Stores an upgrade error receipt.
    fn set_upgrade_error(
        &mut self,
        port_id: &PortId,
        channel_id: &ChannelId,
        receipt: &ErrorReceipt,
    ) -> Result<(), IbcError> {
        self.put_value(&Path::UpgradeError(port_id.clone(), channel_id.clone()), receipt)
    }
}

impl<S: StateAccessor + ?Sized> IbcStore for S {}

#[cfg(test)]
mod tests {
    use super::*;
    use ioi_api::state::InMemoryState;

    #[test]
    fn counters_start_at_zero_and_advance() {
        let mut state = InMemoryState::new();
        assert_eq!(state.next_counter(&Path::NextChannelSequence).unwrap(), 0);
        assert_eq!(state.next_counter(&Path::NextChannelSequence).unwrap(), 1);
        assert_eq!(state.read_u64_be(&Path::NextChannelSequence).unwrap(), 2);
    }

    #[test]
    fn inflight_scan_is_scoped_to_the_channel() {
        let mut state = InMemoryState::new();
        let port = PortId::new("transfer").unwrap();
        let chan1 = ChannelId::new_indexed(1);
        let chan10 = ChannelId::new_indexed(10);
        state
            .set_packet_commitment(&port, &chan10, Sequence(1), b"c")
            .unwrap();
        assert!(!state.has_inflight_packets(&port, &chan1).unwrap());
        assert!(state.has_inflight_packets(&port, &chan10).unwrap());
        state.delete_packet_commitment(&port, &chan10, Sequence(1)).unwrap();
        assert!(!state.has_inflight_packets(&port, &chan10).unwrap());
    }

    #[test]
    fn malformed_counter_is_rejected() {
        let mut state = InMemoryState::new();
        state.put_raw(&Path::NextClientSequence, &[1, 2, 3]).unwrap();
        assert!(matches!(
            state.read_u64_be(&Path::NextClientSequence),
            Err(IbcError::State(_))
        ));
    }
}
