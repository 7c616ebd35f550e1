use std::sync::Arc;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("MIDI initialization failed")]
    Init(#[from] midir::InitError),

    #[error("Error connecting to MIDI port {}", .0)]
    Connection(Arc<str>),

    #[error("MIDI port not connected")]
    NotConnected,

    #[error("Couldn't retrieve a MIDI port name")]
    PortInfo(#[from] midir::PortInfoError),

    #[error("No MIDI port matching {}", .0)]
    PortNotFound(Arc<str>),

    #[error("Invalid 7 bits value: {}", .0)]
    InvalidU7(u8),

    #[error("Invalid normalized float: {}", .0)]
    InvalidNormalizedFloat(f64),

    #[error("Couldn't send MIDI message: {}", .0)]
    Send(#[from] midir::SendError),
}
