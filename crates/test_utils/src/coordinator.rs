// Path: crates/test_utils/src/coordinator.rs
//! Two mock chains and a relayer between them.
//!
//! Every `*_msg` builder first updates the receiving chain's client with a
//! fresh header of the sending chain, then assembles the message with proofs
//! taken at that header's height. Builders return the message instead of
//! dispatching it so tests can tamper with it first.

use anyhow::{anyhow, bail, Context};
use ioi_ibc::IbcStore;
use ioi_types::codec::{from_bytes_canonical, to_bytes_canonical};
use ioi_types::config::IbcConfig;
use ioi_types::error::IbcError;
use ioi_types::ibc::{
    ChannelCounterparty, ChannelEnd, ChannelId, ClientId, ClientState, CommitmentPrefix,
    ConnectionCounterparty, ConnectionId, Height, IbcEvent, MsgAcknowledgement,
    MsgChannelCloseConfirm, MsgChannelCloseInit, MsgChannelOpenAck, MsgChannelOpenConfirm,
    MsgChannelOpenInit, MsgChannelOpenTry, MsgChannelUpgradeAck, MsgChannelUpgradeCancel,
    MsgChannelUpgradeConfirm, MsgChannelUpgradeInit, MsgChannelUpgradeOpen,
    MsgChannelUpgradeTimeout, MsgChannelUpgradeTry, MsgConnectionOpenAck,
    MsgConnectionOpenConfirm, MsgConnectionOpenInit, MsgConnectionOpenTry, MsgCreateClient,
    MsgEnvelope, MsgOutcome, MsgRecvPacket, MsgResponse, MsgTimeout, MsgTimeoutOnClose,
    MsgUpdateClient, Order, Packet, Path, PortId, Sequence, Upgrade, UpgradeFields,
};

use crate::chain::MockChain;
use crate::mock_module::{MOCK_PORT_ID, MOCK_VERSION};

/// The signer on every relayed message.
pub const RELAYER: &str = "relayer";

/// One of the two chains.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    /// Chain A.
    A,
    /// Chain B.
    B,
}

impl Side {
    /// The other chain.
    pub fn other(self) -> Self {
        match self {
            Self::A => Self::B,
            Self::B => Self::A,
        }
    }
}

/// The identifiers of an open channel and the connection under it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Link {
    /// The connection on A.
    pub connection_a: ConnectionId,
    /// The connection on B.
    pub connection_b: ConnectionId,
    /// The channel on A.
    pub channel_a: ChannelId,
    /// The channel on B.
    pub channel_b: ChannelId,
}

impl Link {
    /// The connection end on `side`.
    pub fn connection(&self, side: Side) -> &ConnectionId {
        match side {
            Side::A => &self.connection_a,
            Side::B => &self.connection_b,
        }
    }

    /// The channel end on `side`.
    pub fn channel(&self, side: Side) -> &ChannelId {
        match side {
            Side::A => &self.channel_a,
            Side::B => &self.channel_b,
        }
    }
}

/// The mock port.
#[allow(clippy::expect_used)]
pub fn mock_port() -> PortId {
    PortId::new(MOCK_PORT_ID).expect("mock port id is valid")
}

/// The `Packet` carried by the first `SendPacket` event in `events`.
pub fn sent_packet(events: &[IbcEvent]) -> Option<Packet> {
    events.iter().find_map(|event| match event {
        IbcEvent::SendPacket { packet } => Some(packet.clone()),
        _ => None,
    })
}

/// The acknowledgement bytes carried by the first `WriteAcknowledgement` event.
pub fn written_ack(events: &[IbcEvent]) -> Option<Vec<u8>> {
    events.iter().find_map(|event| match event {
        IbcEvent::WriteAcknowledgement {
            acknowledgement, ..
        } => Some(acknowledgement.clone()),
        _ => None,
    })
}

/// Two chains, each with a mock client tracking the other.
#[derive(Debug)]
pub struct Coordinator {
    /// Chain A.
    pub a: MockChain,
    /// Chain B.
    pub b: MockChain,
    /// The client on A tracking B.
    pub client_a: ClientId,
    /// The client on B tracking A.
    pub client_b: ClientId,
}

impl Coordinator {
    /// Two chains with the default configuration and clients of each other.
    pub fn new() -> anyhow::Result<Self> {
        Self::with_config(IbcConfig::default())
    }

    /// Two chains sharing `config`, with clients of each other.
    pub fn with_config(config: IbcConfig) -> anyhow::Result<Self> {
        let mut a = MockChain::new("chain-a", config.clone())?;
        let mut b = MockChain::new("chain-b", config)?;
        let height_a = a.commit();
        let height_b = b.commit();
        let client_a = create_client(&mut a, &b, height_b)?;
        let client_b = create_client(&mut b, &a, height_a)?;
        Ok(Self {
            a,
            b,
            client_a,
            client_b,
        })
    }

    /// The chain on `side`.
    pub fn chain(&self, side: Side) -> &MockChain {
        match side {
            Side::A => &self.a,
            Side::B => &self.b,
        }
    }

    /// The chain on `side`, mutably.
    pub fn chain_mut(&mut self, side: Side) -> &mut MockChain {
        match side {
            Side::A => &mut self.a,
            Side::B => &mut self.b,
        }
    }

    /// The client on `side` tracking the other chain.
    pub fn client(&self, side: Side) -> &ClientId {
        match side {
            Side::A => &self.client_a,
            Side::B => &self.client_b,
        }
    }

    /// Executes `msg` on `side`.
    pub fn deliver(&mut self, side: Side, msg: MsgEnvelope) -> Result<MsgOutcome, IbcError> {
        self.chain_mut(side).dispatch(msg)
    }

    /// Seals a block on the other chain and updates `side`'s client with its
    /// header. Returns the header height, at which proofs are then taken.
    pub fn update_client(&mut self, side: Side) -> anyhow::Result<Height> {
        let source = self.chain_mut(side.other());
        let height = source.commit();
        let header = source.header(height)?;
        let msg = MsgEnvelope::UpdateClient(MsgUpdateClient {
            client_id: self.client(side).clone(),
            client_message: to_bytes_canonical(&header),
            signer: RELAYER.into(),
        });
        self.deliver(side, msg)?;
        Ok(height)
    }

    fn prove(&self, side: Side, height: Height, path: &Path) -> anyhow::Result<Vec<u8>> {
        self.chain(side).prove(height, path)
    }

    // Connection handshake.

    /// Runs ConnOpenInit on `side`.
    pub fn conn_open_init(&mut self, side: Side) -> anyhow::Result<ConnectionId> {
        let msg = MsgEnvelope::ConnectionOpenInit(MsgConnectionOpenInit {
            client_id: self.client(side).clone(),
            counterparty: ConnectionCounterparty {
                client_id: self.client(side.other()).clone(),
                connection_id: None,
                prefix: CommitmentPrefix::new(self.chain(side.other()).core.config().commitment_prefix.as_bytes())?,
            },
            version: None,
            delay_period: 0,
            signer: RELAYER.into(),
        });
        match self.deliver(side, msg)?.response {
            MsgResponse::ConnectionOpenInit { connection_id } => Ok(connection_id),
            other => bail!("unexpected response {other:?}"),
        }
    }

    /// Client and consensus state the other chain keeps of `side`, with proofs.
    fn self_client_proofs(
        &self,
        side: Side,
        height: Height,
    ) -> anyhow::Result<(Vec<u8>, Vec<u8>, Vec<u8>, Vec<u8>, Height)> {
        let source = self.chain(side.other());
        let client_path = Path::ClientState(self.client(side.other()).clone());
        let client_bytes = source
            .value_at(height, &client_path)?
            .context("counterparty client state missing")?;
        let client_state: ClientState =
            from_bytes_canonical(&client_bytes).map_err(|e| anyhow!(e))?;
        let consensus_height = client_state.latest_height;
        let consensus_path =
            Path::ClientConsensusState(self.client(side.other()).clone(), consensus_height);
        let consensus_bytes = source
            .value_at(height, &consensus_path)?
            .context("counterparty consensus state missing")?;
        Ok((
            self.prove(side.other(), height, &client_path)?,
            client_bytes,
            self.prove(side.other(), height, &consensus_path)?,
            consensus_bytes,
            consensus_height,
        ))
    }

    /// Builds ConnOpenTry on `side` for the other chain's INIT connection.
    pub fn conn_open_try_msg(
        &mut self,
        side: Side,
        counterparty_connection: &ConnectionId,
    ) -> anyhow::Result<MsgConnectionOpenTry> {
        let proof_height = self.update_client(side)?;
        let counterparty = self.chain(side.other()).connection(counterparty_connection)?;
        let (proof_client, client_state, proof_consensus, consensus_state, consensus_height) =
            self.self_client_proofs(side, proof_height)?;
        Ok(MsgConnectionOpenTry {
            client_id: self.client(side).clone(),
            counterparty: ConnectionCounterparty {
                client_id: self.client(side.other()).clone(),
                connection_id: Some(counterparty_connection.clone()),
                prefix: CommitmentPrefix::new(self.chain(side.other()).core.config().commitment_prefix.as_bytes())?,
            },
            delay_period: counterparty.delay_period,
            counterparty_versions: counterparty.versions,
            client_state,
            consensus_state,
            proof_init: self.prove(
                side.other(),
                proof_height,
                &Path::Connection(counterparty_connection.clone()),
            )?,
            proof_client,
            proof_consensus,
            proof_height,
            consensus_height,
            signer: RELAYER.into(),
        })
    }

    /// Builds ConnOpenAck on `side` for the other chain's TRYOPEN connection.
    pub fn conn_open_ack_msg(
        &mut self,
        side: Side,
        connection: &ConnectionId,
        counterparty_connection: &ConnectionId,
    ) -> anyhow::Result<MsgConnectionOpenAck> {
        let proof_height = self.update_client(side)?;
        let counterparty = self.chain(side.other()).connection(counterparty_connection)?;
        let (proof_client, client_state, proof_consensus, consensus_state, consensus_height) =
            self.self_client_proofs(side, proof_height)?;
        Ok(MsgConnectionOpenAck {
            connection_id: connection.clone(),
            counterparty_connection_id: counterparty_connection.clone(),
            version: counterparty.version()?.clone(),
            client_state,
            consensus_state,
            proof_try: self.prove(
                side.other(),
                proof_height,
                &Path::Connection(counterparty_connection.clone()),
            )?,
            proof_client,
            proof_consensus,
            proof_height,
            consensus_height,
            signer: RELAYER.into(),
        })
    }

    /// Builds ConnOpenConfirm on `side`.
    pub fn conn_open_confirm_msg(
        &mut self,
        side: Side,
        connection: &ConnectionId,
    ) -> anyhow::Result<MsgConnectionOpenConfirm> {
        let proof_height = self.update_client(side)?;
        let counterparty_connection = self
            .chain(side)
            .connection(connection)?
            .counterparty_connection_id()?
            .clone();
        Ok(MsgConnectionOpenConfirm {
            connection_id: connection.clone(),
            proof_ack: self.prove(
                side.other(),
                proof_height,
                &Path::Connection(counterparty_connection),
            )?,
            proof_height,
            signer: RELAYER.into(),
        })
    }

    /// Opens a connection with A as initiator. Returns `(on A, on B)`.
    pub fn setup_connection(&mut self) -> anyhow::Result<(ConnectionId, ConnectionId)> {
        let connection_a = self.conn_open_init(Side::A)?;
        let msg = self.conn_open_try_msg(Side::B, &connection_a)?;
        let connection_b = match self.deliver(Side::B, MsgEnvelope::ConnectionOpenTry(msg))?.response {
            MsgResponse::ConnectionOpenTry { connection_id } => connection_id,
            other => bail!("unexpected response {other:?}"),
        };
        let msg = self.conn_open_ack_msg(Side::A, &connection_a, &connection_b)?;
        self.deliver(Side::A, MsgEnvelope::ConnectionOpenAck(msg))?;
        let msg = self.conn_open_confirm_msg(Side::B, &connection_b)?;
        self.deliver(Side::B, MsgEnvelope::ConnectionOpenConfirm(msg))?;
        Ok((connection_a, connection_b))
    }

    // Channel handshake.

    /// Builds ChanOpenInit on `side` for the mock port.
    pub fn chan_open_init_msg(
        &self,
        connection: &ConnectionId,
        ordering: Order,
        version: &str,
    ) -> MsgChannelOpenInit {
        MsgChannelOpenInit {
            port_id: mock_port(),
            ordering,
            connection_hops: vec![connection.clone()],
            counterparty_port_id: mock_port(),
            version: version.to_string(),
            signer: RELAYER.into(),
        }
    }

    /// Runs ChanOpenInit on `side`.
    pub fn chan_open_init(
        &mut self,
        side: Side,
        connection: &ConnectionId,
        ordering: Order,
    ) -> anyhow::Result<ChannelId> {
        let msg = self.chan_open_init_msg(connection, ordering, MOCK_VERSION);
        match self.deliver(side, MsgEnvelope::ChannelOpenInit(msg))?.response {
            MsgResponse::ChannelOpenInit { channel_id, .. } => Ok(channel_id),
            other => bail!("unexpected response {other:?}"),
        }
    }

    /// Builds ChanOpenTry on `side` for the other chain's INIT channel.
    pub fn chan_open_try_msg(
        &mut self,
        side: Side,
        connection: &ConnectionId,
        counterparty_channel: &ChannelId,
    ) -> anyhow::Result<MsgChannelOpenTry> {
        let proof_height = self.update_client(side)?;
        let counterparty = self
            .chain(side.other())
            .channel(&mock_port(), counterparty_channel)?;
        Ok(MsgChannelOpenTry {
            port_id: mock_port(),
            ordering: counterparty.ordering,
            connection_hops: vec![connection.clone()],
            counterparty: ChannelCounterparty::new(mock_port(), Some(counterparty_channel.clone())),
            counterparty_version: counterparty.version,
            proof_init: self.prove(
                side.other(),
                proof_height,
                &Path::ChannelEnd(mock_port(), counterparty_channel.clone()),
            )?,
            proof_height,
            signer: RELAYER.into(),
        })
    }

    /// Builds ChanOpenAck on `side` for the other chain's TRYOPEN channel.
    pub fn chan_open_ack_msg(
        &mut self,
        side: Side,
        channel: &ChannelId,
        counterparty_channel: &ChannelId,
    ) -> anyhow::Result<MsgChannelOpenAck> {
        let proof_height = self.update_client(side)?;
        let counterparty = self
            .chain(side.other())
            .channel(&mock_port(), counterparty_channel)?;
        Ok(MsgChannelOpenAck {
            port_id: mock_port(),
            channel_id: channel.clone(),
            counterparty_channel_id: counterparty_channel.clone(),
            counterparty_version: counterparty.version,
            proof_try: self.prove(
                side.other(),
                proof_height,
                &Path::ChannelEnd(mock_port(), counterparty_channel.clone()),
            )?,
            proof_height,
            signer: RELAYER.into(),
        })
    }

    /// Builds ChanOpenConfirm on `side`.
    pub fn chan_open_confirm_msg(
        &mut self,
        side: Side,
        channel: &ChannelId,
    ) -> anyhow::Result<MsgChannelOpenConfirm> {
        let proof_height = self.update_client(side)?;
        let counterparty_channel = self.counterparty_channel_id(side, channel)?;
        Ok(MsgChannelOpenConfirm {
            port_id: mock_port(),
            channel_id: channel.clone(),
            proof_ack: self.prove(
                side.other(),
                proof_height,
                &Path::ChannelEnd(mock_port(), counterparty_channel),
            )?,
            proof_height,
            signer: RELAYER.into(),
        })
    }

    fn counterparty_channel_id(&self, side: Side, channel: &ChannelId) -> anyhow::Result<ChannelId> {
        Ok(self
            .chain(side)
            .channel(&mock_port(), channel)?
            .counterparty_channel_id()?
            .clone())
    }

    /// Opens a connection and a channel with A as initiator.
    pub fn setup_channel(&mut self, ordering: Order) -> anyhow::Result<Link> {
        let (connection_a, connection_b) = self.setup_connection()?;
        let channel_a = self.chan_open_init(Side::A, &connection_a, ordering)?;
        let msg = self.chan_open_try_msg(Side::B, &connection_b, &channel_a)?;
        let channel_b = match self.deliver(Side::B, MsgEnvelope::ChannelOpenTry(msg))?.response {
            MsgResponse::ChannelOpenTry { channel_id, .. } => channel_id,
            other => bail!("unexpected response {other:?}"),
        };
        let msg = self.chan_open_ack_msg(Side::A, &channel_a, &channel_b)?;
        self.deliver(Side::A, MsgEnvelope::ChannelOpenAck(msg))?;
        let msg = self.chan_open_confirm_msg(Side::B, &channel_b)?;
        self.deliver(Side::B, MsgEnvelope::ChannelOpenConfirm(msg))?;
        Ok(Link {
            connection_a,
            connection_b,
            channel_a,
            channel_b,
        })
    }

    /// Runs ChanCloseInit on `side`.
    pub fn chan_close_init(&mut self, side: Side, channel: &ChannelId) -> Result<MsgOutcome, IbcError> {
        let msg = MsgEnvelope::ChannelCloseInit(MsgChannelCloseInit {
            port_id: mock_port(),
            channel_id: channel.clone(),
            signer: RELAYER.into(),
        });
        self.deliver(side, msg)
    }

    /// Builds ChanCloseConfirm on `side` after the other end closed.
    pub fn chan_close_confirm_msg(
        &mut self,
        side: Side,
        channel: &ChannelId,
    ) -> anyhow::Result<MsgChannelCloseConfirm> {
        let proof_height = self.update_client(side)?;
        let counterparty_channel = self.counterparty_channel_id(side, channel)?;
        let counterparty = self
            .chain(side.other())
            .channel(&mock_port(), &counterparty_channel)?;
        Ok(MsgChannelCloseConfirm {
            port_id: mock_port(),
            channel_id: channel.clone(),
            proof_init: self.prove(
                side.other(),
                proof_height,
                &Path::ChannelEnd(mock_port(), counterparty_channel),
            )?,
            proof_height,
            counterparty_upgrade_sequence: counterparty.upgrade_sequence,
            signer: RELAYER.into(),
        })
    }

    // Packets.

    /// Sends `data` from `side` over the link and returns the committed packet.
    pub fn send_packet(
        &mut self,
        side: Side,
        link: &Link,
        data: &[u8],
        timeout_height: Height,
        timeout_timestamp: u64,
    ) -> anyhow::Result<Packet> {
        let (_, events) = self.chain_mut(side).send_packet(
            &mock_port(),
            link.channel(side),
            timeout_height,
            timeout_timestamp,
            data,
        )?;
        sent_packet(&events).context("send emitted no SendPacket event")
    }

    /// Sends `data` from `side` with a far-off timestamp timeout.
    pub fn send_default(&mut self, side: Side, link: &Link, data: &[u8]) -> anyhow::Result<Packet> {
        let timeout = self.chain(side.other()).timestamp() + 1_000 * crate::chain::BLOCK_TIME;
        self.send_packet(side, link, data, Height::zero(), timeout)
    }

    /// Builds RecvPacket on the destination chain.
    pub fn recv_msg(&mut self, destination: Side, packet: &Packet) -> anyhow::Result<MsgRecvPacket> {
        let proof_height = self.update_client(destination)?;
        Ok(MsgRecvPacket {
            packet: packet.clone(),
            proof_commitment: self.prove(
                destination.other(),
                proof_height,
                &Path::Commitment(
                    packet.source_port.clone(),
                    packet.source_channel.clone(),
                    packet.sequence,
                ),
            )?,
            proof_height,
            signer: RELAYER.into(),
        })
    }

    /// Relays `packet` to `destination`.
    pub fn relay_recv(&mut self, destination: Side, packet: &Packet) -> anyhow::Result<MsgOutcome> {
        let msg = self.recv_msg(destination, packet)?;
        Ok(self.deliver(destination, MsgEnvelope::RecvPacket(msg))?)
    }

    /// Builds Acknowledgement on the packet's source chain.
    pub fn ack_msg(
        &mut self,
        source: Side,
        packet: &Packet,
        acknowledgement: &[u8],
    ) -> anyhow::Result<MsgAcknowledgement> {
        let proof_height = self.update_client(source)?;
        Ok(MsgAcknowledgement {
            packet: packet.clone(),
            acknowledgement: acknowledgement.to_vec(),
            proof_acked: self.prove(
                source.other(),
                proof_height,
                &Path::Ack(
                    packet.destination_port.clone(),
                    packet.destination_channel.clone(),
                    packet.sequence,
                ),
            )?,
            proof_height,
            signer: RELAYER.into(),
        })
    }

    /// Relays an acknowledgement back to `source`.
    pub fn relay_ack(
        &mut self,
        source: Side,
        packet: &Packet,
        acknowledgement: &[u8],
    ) -> anyhow::Result<MsgOutcome> {
        let msg = self.ack_msg(source, packet, acknowledgement)?;
        Ok(self.deliver(source, MsgEnvelope::Acknowledgement(msg))?)
    }

    /// The next receive sequence and the proof of it (ORDERED) or the
    /// receipt absence proof (UNORDERED) on the packet's destination.
    fn unreceived_proof(
        &self,
        source: Side,
        packet: &Packet,
        proof_height: Height,
    ) -> anyhow::Result<(Sequence, Vec<u8>)> {
        let destination = self.chain(source.other());
        let channel = destination.channel(&packet.destination_port, &packet.destination_channel)?;
        match channel.ordering {
            Order::Ordered => {
                let path = Path::SeqRecv(
                    packet.destination_port.clone(),
                    packet.destination_channel.clone(),
                );
                let raw = destination
                    .value_at(proof_height, &path)?
                    .context("next receive sequence missing")?;
                let bytes: [u8; 8] = raw
                    .as_slice()
                    .try_into()
                    .map_err(|_| anyhow!("malformed next receive sequence"))?;
                Ok((
                    Sequence(u64::from_be_bytes(bytes)),
                    destination.prove(proof_height, &path)?,
                ))
            }
            Order::Unordered => Ok((
                packet.sequence,
                destination.prove(
                    proof_height,
                    &Path::Receipt(
                        packet.destination_port.clone(),
                        packet.destination_channel.clone(),
                        packet.sequence,
                    ),
                )?,
            )),
        }
    }

    /// Builds Timeout on the packet's source chain.
    pub fn timeout_msg(&mut self, source: Side, packet: &Packet) -> anyhow::Result<MsgTimeout> {
        let proof_height = self.update_client(source)?;
        let (next_sequence_recv, proof_unreceived) =
            self.unreceived_proof(source, packet, proof_height)?;
        Ok(MsgTimeout {
            packet: packet.clone(),
            next_sequence_recv,
            proof_unreceived,
            proof_height,
            signer: RELAYER.into(),
        })
    }

    /// Builds TimeoutOnClose on the packet's source chain.
    pub fn timeout_on_close_msg(
        &mut self,
        source: Side,
        packet: &Packet,
    ) -> anyhow::Result<MsgTimeoutOnClose> {
        let proof_height = self.update_client(source)?;
        let (next_sequence_recv, proof_unreceived) =
            self.unreceived_proof(source, packet, proof_height)?;
        let counterparty = self
            .chain(source.other())
            .channel(&packet.destination_port, &packet.destination_channel)?;
        Ok(MsgTimeoutOnClose {
            packet: packet.clone(),
            next_sequence_recv,
            proof_unreceived,
            proof_close: self.prove(
                source.other(),
                proof_height,
                &Path::ChannelEnd(
                    packet.destination_port.clone(),
                    packet.destination_channel.clone(),
                ),
            )?,
            proof_height,
            counterparty_upgrade_sequence: counterparty.upgrade_sequence,
            signer: RELAYER.into(),
        })
    }

    // Channel upgrades.

    /// Runs ChanUpgradeInit on `side` proposing `fields`.
    pub fn upgrade_init(
        &mut self,
        side: Side,
        link: &Link,
        fields: UpgradeFields,
    ) -> Result<MsgOutcome, IbcError> {
        let msg = MsgEnvelope::ChannelUpgradeInit(MsgChannelUpgradeInit {
            port_id: mock_port(),
            channel_id: link.channel(side).clone(),
            fields,
            signer: RELAYER.into(),
        });
        self.deliver(side, msg)
    }

    fn counterparty_upgrade_proofs(
        &mut self,
        side: Side,
        link: &Link,
    ) -> anyhow::Result<(Height, ChannelEnd, Upgrade, Vec<u8>, Vec<u8>)> {
        let proof_height = self.update_client(side)?;
        let counterparty_side = side.other();
        let port = mock_port();
        let channel_id = link.channel(counterparty_side).clone();
        let counterparty = self.chain(counterparty_side);
        let channel = counterparty.channel(&port, &channel_id)?;
        let upgrade = counterparty
            .state
            .upgrade(&port, &channel_id)?
            .context("counterparty has no upgrade in progress")?;
        let proof_channel =
            counterparty.prove(proof_height, &Path::ChannelEnd(port.clone(), channel_id.clone()))?;
        let proof_upgrade = counterparty.prove(proof_height, &Path::Upgrade(port, channel_id))?;
        Ok((proof_height, channel, upgrade, proof_channel, proof_upgrade))
    }

    /// Builds ChanUpgradeTry on `side` for the other end's proposal.
    pub fn upgrade_try_msg(&mut self, side: Side, link: &Link) -> anyhow::Result<MsgChannelUpgradeTry> {
        let (proof_height, channel, upgrade, proof_channel, proof_upgrade) =
            self.counterparty_upgrade_proofs(side, link)?;
        Ok(MsgChannelUpgradeTry {
            port_id: mock_port(),
            channel_id: link.channel(side).clone(),
            proposed_connection_hops: vec![link.connection(side).clone()],
            counterparty_upgrade: upgrade,
            counterparty_upgrade_sequence: channel.upgrade_sequence,
            proof_channel,
            proof_upgrade,
            proof_height,
            signer: RELAYER.into(),
        })
    }

    /// Builds ChanUpgradeAck on `side`.
    pub fn upgrade_ack_msg(&mut self, side: Side, link: &Link) -> anyhow::Result<MsgChannelUpgradeAck> {
        let (proof_height, _, upgrade, proof_channel, proof_upgrade) =
            self.counterparty_upgrade_proofs(side, link)?;
        Ok(MsgChannelUpgradeAck {
            port_id: mock_port(),
            channel_id: link.channel(side).clone(),
            counterparty_upgrade: upgrade,
            proof_channel,
            proof_upgrade,
            proof_height,
            signer: RELAYER.into(),
        })
    }

    /// Builds ChanUpgradeConfirm on `side`.
    pub fn upgrade_confirm_msg(
        &mut self,
        side: Side,
        link: &Link,
    ) -> anyhow::Result<MsgChannelUpgradeConfirm> {
        let (proof_height, channel, upgrade, proof_channel, proof_upgrade) =
            self.counterparty_upgrade_proofs(side, link)?;
        Ok(MsgChannelUpgradeConfirm {
            port_id: mock_port(),
            channel_id: link.channel(side).clone(),
            counterparty_channel_state: channel.state,
            counterparty_upgrade: upgrade,
            proof_channel,
            proof_upgrade,
            proof_height,
            signer: RELAYER.into(),
        })
    }

    fn counterparty_channel_proof(
        &mut self,
        side: Side,
        link: &Link,
    ) -> anyhow::Result<(Height, ChannelEnd, Vec<u8>)> {
        let proof_height = self.update_client(side)?;
        let channel_id = link.channel(side.other()).clone();
        let counterparty = self.chain(side.other());
        let channel = counterparty.channel(&mock_port(), &channel_id)?;
        let proof = counterparty.prove(proof_height, &Path::ChannelEnd(mock_port(), channel_id))?;
        Ok((proof_height, channel, proof))
    }

    /// Builds ChanUpgradeOpen on `side`.
    pub fn upgrade_open_msg(&mut self, side: Side, link: &Link) -> anyhow::Result<MsgChannelUpgradeOpen> {
        let (proof_height, channel, proof_channel) = self.counterparty_channel_proof(side, link)?;
        Ok(MsgChannelUpgradeOpen {
            port_id: mock_port(),
            channel_id: link.channel(side).clone(),
            counterparty_channel_state: channel.state,
            counterparty_upgrade_sequence: channel.upgrade_sequence,
            proof_channel,
            proof_height,
            signer: RELAYER.into(),
        })
    }

    /// Builds ChanUpgradeTimeout on `side`.
    pub fn upgrade_timeout_msg(
        &mut self,
        side: Side,
        link: &Link,
    ) -> anyhow::Result<MsgChannelUpgradeTimeout> {
        let (proof_height, channel, proof_channel) = self.counterparty_channel_proof(side, link)?;
        Ok(MsgChannelUpgradeTimeout {
            port_id: mock_port(),
            channel_id: link.channel(side).clone(),
            counterparty_channel: channel,
            proof_channel,
            proof_height,
            signer: RELAYER.into(),
        })
    }

    /// Builds ChanUpgradeCancel on `side` from the other end's error receipt.
    pub fn upgrade_cancel_msg(
        &mut self,
        side: Side,
        link: &Link,
    ) -> anyhow::Result<MsgChannelUpgradeCancel> {
        let proof_height = self.update_client(side)?;
        let port = mock_port();
        let channel_id = link.channel(side.other()).clone();
        let counterparty = self.chain(side.other());
        let error_receipt = counterparty
            .state
            .upgrade_error(&port, &channel_id)?
            .context("counterparty wrote no error receipt")?;
        Ok(MsgChannelUpgradeCancel {
            port_id: mock_port(),
            channel_id: link.channel(side).clone(),
            error_receipt,
            proof_error_receipt: counterparty
                .prove(proof_height, &Path::UpgradeError(port, channel_id))?,
            proof_height,
            signer: RELAYER.into(),
        })
    }
}

fn create_client(host: &mut MockChain, counterparty: &MockChain, height: Height) -> anyhow::Result<ClientId> {
    let header = counterparty.header(height)?;
    let msg = MsgEnvelope::CreateClient(MsgCreateClient {
        client_state: header.client_state(),
        consensus_state: header.consensus_state(),
        signer: RELAYER.into(),
    });
    match host.dispatch(msg)?.response {
        MsgResponse::CreateClient { client_id } => Ok(client_id),
        other => bail!("unexpected response {other:?}"),
    }
}

