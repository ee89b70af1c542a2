//! Channel registry and event payloads.
//!
//! Every occurrence the game client broadcasts belongs to exactly one
//! [`Channel`]. The set of channels is closed: adding one means extending
//! [`Channel`], [`Event`] and the matching observer capability in
//! [`crate::observers`].
//!
//! Submodules:
//! - [`chat`] – chat messages received from or sent to the server
//! - [`input`] – pointer clicks and the entity under the crosshair
//! - [`packet`] – raw packets read by the network thread
//!
//! Marker channels (tick, render, GUI render, death) carry no payload.
pub mod chat;
pub mod input;
pub mod packet;

use std::fmt;

use crate::events::chat::{ChatInputEvent, ChatOutputEvent};
use crate::events::input::LeftClickEvent;
use crate::events::packet::PacketInputEvent;

/// Broadcast category. Each channel maps to one observer capability and one
/// payload shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    /// Simulation tick, fired once per client update.
    Tick,
    /// World render pass.
    Render,
    /// Overlay / GUI render pass.
    GuiRender,
    /// A packet arrived from the server.
    PacketInput,
    /// The player left-clicked.
    LeftClick,
    /// A chat message arrived from the server.
    ChatInput,
    /// The player is about to send a chat message.
    ChatOutput,
    /// The local player died.
    Death,
}

impl Channel {
    /// All channels, in registry order.
    pub const ALL: [Channel; 8] = [
        Channel::Tick,
        Channel::Render,
        Channel::GuiRender,
        Channel::PacketInput,
        Channel::LeftClick,
        Channel::ChatInput,
        Channel::ChatOutput,
        Channel::Death,
    ];

    /// What the client was doing when an observer on this channel ran.
    ///
    /// Shown in diagnostics as "error while <action>".
    pub fn action(self) -> &'static str {
        match self {
            Channel::Tick => "updating",
            Channel::Render => "rendering",
            Channel::GuiRender => "rendering GUI",
            Channel::PacketInput => "receiving packet",
            Channel::LeftClick => "left-clicking",
            Channel::ChatInput => "receiving chat message",
            Channel::ChatOutput => "sending chat message",
            Channel::Death => "dying",
        }
    }

    /// Short stable name, used in logs and diagnostic contexts.
    pub fn name(self) -> &'static str {
        match self {
            Channel::Tick => "Tick",
            Channel::Render => "Render",
            Channel::GuiRender => "GuiRender",
            Channel::PacketInput => "PacketInput",
            Channel::LeftClick => "LeftClick",
            Channel::ChatInput => "ChatInput",
            Channel::ChatOutput => "ChatOutput",
            Channel::Death => "Death",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One occurrence submitted for dispatch.
///
/// Events are plain values: they are moved into the engine, read by every
/// observer of their channel, and dropped when their turn ends.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Tick,
    Render,
    GuiRender,
    PacketInput(PacketInputEvent),
    LeftClick(LeftClickEvent),
    ChatInput(ChatInputEvent),
    ChatOutput(ChatOutputEvent),
    Death,
}

impl Event {
    /// Channel this event is broadcast on.
    pub fn channel(&self) -> Channel {
        match self {
            Event::Tick => Channel::Tick,
            Event::Render => Channel::Render,
            Event::GuiRender => Channel::GuiRender,
            Event::PacketInput(_) => Channel::PacketInput,
            Event::LeftClick(_) => Channel::LeftClick,
            Event::ChatInput(_) => Channel::ChatInput,
            Event::ChatOutput(_) => Channel::ChatOutput,
            Event::Death => Channel::Death,
        }
    }
}

impl From<PacketInputEvent> for Event {
    fn from(event: PacketInputEvent) -> Self {
        Event::PacketInput(event)
    }
}

impl From<LeftClickEvent> for Event {
    fn from(event: LeftClickEvent) -> Self {
        Event::LeftClick(event)
    }
}

impl From<ChatInputEvent> for Event {
    fn from(event: ChatInputEvent) -> Self {
        Event::ChatInput(event)
    }
}

impl From<ChatOutputEvent> for Event {
    fn from(event: ChatOutputEvent) -> Self {
        Event::ChatOutput(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::packet::Packet;

    #[test]
    fn test_event_channel_matches_variant() {
        assert_eq!(Event::Tick.channel(), Channel::Tick);
        assert_eq!(Event::Render.channel(), Channel::Render);
        assert_eq!(Event::GuiRender.channel(), Channel::GuiRender);
        assert_eq!(Event::Death.channel(), Channel::Death);
        let packet = Event::from(PacketInputEvent::new(Packet::new("KeepAlive", vec![1])));
        assert_eq!(packet.channel(), Channel::PacketInput);
        let chat = Event::from(ChatInputEvent::new("hi"));
        assert_eq!(chat.channel(), Channel::ChatInput);
        let sent = Event::from(ChatOutputEvent::new("/help"));
        assert_eq!(sent.channel(), Channel::ChatOutput);
        let click = Event::from(LeftClickEvent::default());
        assert_eq!(click.channel(), Channel::LeftClick);
    }

    #[test]
    fn test_channel_all_is_complete_and_unique() {
        let set: std::collections::HashSet<Channel> = Channel::ALL.iter().copied().collect();
        assert_eq!(set.len(), Channel::ALL.len());
    }

    #[test]
    fn test_channel_actions() {
        assert_eq!(Channel::Tick.action(), "updating");
        assert_eq!(Channel::GuiRender.action(), "rendering GUI");
        assert_eq!(Channel::ChatOutput.action(), "sending chat message");
        assert_eq!(Channel::PacketInput.to_string(), "PacketInput");
    }
}
