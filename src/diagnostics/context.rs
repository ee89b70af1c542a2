//! Context strings attached to observer diagnostics.

use crate::events::Event;

/// Read-only view of client state the engine needs when describing a fault.
pub trait ClientContext: Send + Sync {
    /// Type name of the screen currently open, if any.
    fn current_screen(&self) -> Option<String>;
}

/// Context for a client with no screen system (headless runs, tests).
#[derive(Debug, Default, Clone, Copy)]
pub struct NoScreen;

impl ClientContext for NoScreen {
    fn current_screen(&self) -> Option<String> {
        None
    }
}

/// Describes the state relevant to a fault raised while handling `event`.
///
/// The screen is looked up before formatting, so a missing screen reads as
/// `null` instead of failing.
pub fn fault_context(event: &Event, client: &dyn ClientContext) -> String {
    match event {
        Event::Render | Event::GuiRender => {
            let screen = client.current_screen();
            match screen.as_deref() {
                Some(name) => format!("GUI screen: {name}"),
                None => "GUI screen: null".to_string(),
            }
        }
        Event::PacketInput(e) => format!("Packet: {}", e.packet.kind),
        Event::ChatInput(e) => format!("Message: `{}`", e.text),
        Event::ChatOutput(e) => format!("Message: `{}`", e.message),
        Event::Tick | Event::LeftClick(_) | Event::Death => String::new(),
    }
}
