//! Packets read by the network thread.

/// A decoded server packet. Only the kind is interpreted by the bus; the body
/// is left to observers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    pub kind: String,
    pub data: Vec<u8>,
}

impl Packet {
    pub fn new(kind: impl Into<String>, data: Vec<u8>) -> Self {
        Packet {
            kind: kind.into(),
            data,
        }
    }
}

/// Payload of [`Channel::PacketInput`](crate::events::Channel::PacketInput).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PacketInputEvent {
    pub packet: Packet,
}

impl PacketInputEvent {
    pub fn new(packet: Packet) -> Self {
        PacketInputEvent { packet }
    }
}
