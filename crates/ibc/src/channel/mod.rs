// Path: crates/ibc/src/channel/mod.rs
//! Channel handshake, packet lifecycle and channel upgrades (ICS-04).

pub(crate) mod handshake;
pub(crate) mod packet;
pub(crate) mod upgrade;

use ioi_api::state::StateAccessor;
use ioi_types::error::IbcError;
use ioi_types::ibc::{
    channel_capability_name, port_capability_name, ChannelEnd, ChannelId, ConnectionEnd,
    ConnectionId, ConnectionState, ModuleId, PortId,
};

use crate::capability::CapabilityRegistry;
use crate::store::IbcStore;

/// Resolves the module bound to `port_id`.
pub(crate) fn port_module(state: &dyn StateAccessor, port_id: &PortId) -> Result<ModuleId, IbcError> {
    let name = port_capability_name(port_id);
    if CapabilityRegistry::lookup_modules(state, &name)?.is_empty() {
        return Err(IbcError::PortNotBound(port_id.to_string()));
    }
    Ok(CapabilityRegistry::lookup_owner(state, &name)?.0)
}

/// Resolves the module owning a channel.
pub(crate) fn channel_module(
    state: &dyn StateAccessor,
    port_id: &PortId,
    channel_id: &ChannelId,
) -> Result<ModuleId, IbcError> {
    Ok(CapabilityRegistry::lookup_owner(state, &channel_capability_name(port_id, channel_id))?.0)
}

/// Loads a connection and fails unless it is OPEN.
pub(crate) fn open_connection(
    state: &dyn StateAccessor,
    connection_id: &ConnectionId,
) -> Result<ConnectionEnd, IbcError> {
    let connection = state.connection(connection_id)?;
    if !connection.is_open() {
        return Err(IbcError::InvalidConnectionState {
            expected: ConnectionState::Open,
            actual: connection.state,
        });
    }
    Ok(connection)
}

/// Loads the OPEN connection a channel runs over.
pub(crate) fn channel_connection(
    state: &dyn StateAccessor,
    channel: &ChannelEnd,
) -> Result<ConnectionEnd, IbcError> {
    open_connection(state, channel.connection_id()?)
}

pub(crate) fn app_error(port_id: &PortId, channel_id: &ChannelId, err: anyhow::Error) -> IbcError {
    IbcError::AppCallback {
        port_id: port_id.to_string(),
        channel_id: channel_id.to_string(),
        reason: format!("{err:#}"),
    }
}
