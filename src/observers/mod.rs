//! Observer capabilities and the type-erased [`Observer`] handle.
//!
//! Each [`Channel`] has exactly one capability trait with a single method.
//! Implementors must be `Send + Sync`: the engine invokes observers on
//! whichever thread happens to hold the open turn, which is usually not the
//! thread that registered them.
//!
//! Closures implement the capability of every channel whose payload they
//! accept, so one-off observers need no dedicated type:
//!
//! ```rust
//! use std::sync::Arc;
//! use hookbus::observers::Observer;
//! use hookbus::events::chat::ChatInputEvent;
//!
//! let on_tick = Observer::tick(Arc::new(|| println!("tick")));
//! let on_chat = Observer::chat_input(Arc::new(|event: &ChatInputEvent| {
//!     println!("<server> {}", event.text);
//! }));
//! assert_ne!(on_tick.channel(), on_chat.channel());
//! ```
//!
//! Observer identity is the allocation behind the `Arc`: two handles are the
//! same observer when they point at the same object on the same channel.

use std::any::type_name;
use std::fmt;
use std::sync::Arc;

use crate::diagnostics::Fault;
use crate::events::chat::{ChatInputEvent, ChatOutputEvent};
use crate::events::input::LeftClickEvent;
use crate::events::packet::PacketInputEvent;
use crate::events::{Channel, Event};

/// Observes [`Channel::Tick`].
pub trait TickObserver: Send + Sync {
    fn on_tick(&self);

    /// Name shown in diagnostics. Defaults to the implementing type.
    fn name(&self) -> &'static str {
        type_name::<Self>()
    }
}

/// Observes [`Channel::Render`].
pub trait RenderObserver: Send + Sync {
    fn on_render(&self);

    fn name(&self) -> &'static str {
        type_name::<Self>()
    }
}

/// Observes [`Channel::GuiRender`].
pub trait GuiRenderObserver: Send + Sync {
    fn on_render_gui(&self);

    fn name(&self) -> &'static str {
        type_name::<Self>()
    }
}

/// Observes [`Channel::PacketInput`].
pub trait PacketObserver: Send + Sync {
    fn on_packet(&self, event: &PacketInputEvent);

    fn name(&self) -> &'static str {
        type_name::<Self>()
    }
}

/// Observes [`Channel::LeftClick`].
pub trait LeftClickObserver: Send + Sync {
    fn on_left_click(&self, event: &LeftClickEvent);

    fn name(&self) -> &'static str {
        type_name::<Self>()
    }
}

/// Observes [`Channel::ChatInput`].
pub trait ChatInputObserver: Send + Sync {
    fn on_chat_received(&self, event: &ChatInputEvent);

    fn name(&self) -> &'static str {
        type_name::<Self>()
    }
}

/// Observes [`Channel::ChatOutput`].
pub trait ChatOutputObserver: Send + Sync {
    fn on_chat_sent(&self, event: &ChatOutputEvent);

    fn name(&self) -> &'static str {
        type_name::<Self>()
    }
}

/// Observes [`Channel::Death`].
pub trait DeathObserver: Send + Sync {
    fn on_death(&self);

    fn name(&self) -> &'static str {
        type_name::<Self>()
    }
}

impl<F> TickObserver for F
where
    F: Fn() + Send + Sync,
{
    fn on_tick(&self) {
        self()
    }
}

impl<F> RenderObserver for F
where
    F: Fn() + Send + Sync,
{
    fn on_render(&self) {
        self()
    }
}

impl<F> GuiRenderObserver for F
where
    F: Fn() + Send + Sync,
{
    fn on_render_gui(&self) {
        self()
    }
}

impl<F> PacketObserver for F
where
    F: Fn(&PacketInputEvent) + Send + Sync,
{
    fn on_packet(&self, event: &PacketInputEvent) {
        self(event)
    }
}

impl<F> LeftClickObserver for F
where
    F: Fn(&LeftClickEvent) + Send + Sync,
{
    fn on_left_click(&self, event: &LeftClickEvent) {
        self(event)
    }
}

impl<F> ChatInputObserver for F
where
    F: Fn(&ChatInputEvent) + Send + Sync,
{
    fn on_chat_received(&self, event: &ChatInputEvent) {
        self(event)
    }
}

impl<F> ChatOutputObserver for F
where
    F: Fn(&ChatOutputEvent) + Send + Sync,
{
    fn on_chat_sent(&self, event: &ChatOutputEvent) {
        self(event)
    }
}

impl<F> DeathObserver for F
where
    F: Fn() + Send + Sync,
{
    fn on_death(&self) {
        self()
    }
}

/// A registered (or to-be-registered) observer, tagged with its channel.
///
/// The variant fixes the channel, so an observer can never be filed under a
/// channel whose payload it does not accept.
#[derive(Clone)]
pub enum Observer {
    Tick(Arc<dyn TickObserver>),
    Render(Arc<dyn RenderObserver>),
    GuiRender(Arc<dyn GuiRenderObserver>),
    PacketInput(Arc<dyn PacketObserver>),
    LeftClick(Arc<dyn LeftClickObserver>),
    ChatInput(Arc<dyn ChatInputObserver>),
    ChatOutput(Arc<dyn ChatOutputObserver>),
    Death(Arc<dyn DeathObserver>),
}

impl Observer {
    pub fn tick(observer: Arc<dyn TickObserver>) -> Self {
        Observer::Tick(observer)
    }

    pub fn render(observer: Arc<dyn RenderObserver>) -> Self {
        Observer::Render(observer)
    }

    pub fn gui_render(observer: Arc<dyn GuiRenderObserver>) -> Self {
        Observer::GuiRender(observer)
    }

    pub fn packet_input(observer: Arc<dyn PacketObserver>) -> Self {
        Observer::PacketInput(observer)
    }

    pub fn left_click(observer: Arc<dyn LeftClickObserver>) -> Self {
        Observer::LeftClick(observer)
    }

    pub fn chat_input(observer: Arc<dyn ChatInputObserver>) -> Self {
        Observer::ChatInput(observer)
    }

    pub fn chat_output(observer: Arc<dyn ChatOutputObserver>) -> Self {
        Observer::ChatOutput(observer)
    }

    pub fn death(observer: Arc<dyn DeathObserver>) -> Self {
        Observer::Death(observer)
    }

    /// Channel this observer listens on.
    pub fn channel(&self) -> Channel {
        match self {
            Observer::Tick(_) => Channel::Tick,
            Observer::Render(_) => Channel::Render,
            Observer::GuiRender(_) => Channel::GuiRender,
            Observer::PacketInput(_) => Channel::PacketInput,
            Observer::LeftClick(_) => Channel::LeftClick,
            Observer::ChatInput(_) => Channel::ChatInput,
            Observer::ChatOutput(_) => Channel::ChatOutput,
            Observer::Death(_) => Channel::Death,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Observer::Tick(o) => o.name(),
            Observer::Render(o) => o.name(),
            Observer::GuiRender(o) => o.name(),
            Observer::PacketInput(o) => o.name(),
            Observer::LeftClick(o) => o.name(),
            Observer::ChatInput(o) => o.name(),
            Observer::ChatOutput(o) => o.name(),
            Observer::Death(o) => o.name(),
        }
    }

    /// Address of the observer object, without vtable metadata.
    fn addr(&self) -> *const () {
        match self {
            Observer::Tick(o) => Arc::as_ptr(o) as *const (),
            Observer::Render(o) => Arc::as_ptr(o) as *const (),
            Observer::GuiRender(o) => Arc::as_ptr(o) as *const (),
            Observer::PacketInput(o) => Arc::as_ptr(o) as *const (),
            Observer::LeftClick(o) => Arc::as_ptr(o) as *const (),
            Observer::ChatInput(o) => Arc::as_ptr(o) as *const (),
            Observer::ChatOutput(o) => Arc::as_ptr(o) as *const (),
            Observer::Death(o) => Arc::as_ptr(o) as *const (),
        }
    }

    /// Identity comparison: same channel and same object.
    pub fn same(&self, other: &Observer) -> bool {
        self.channel() == other.channel() && self.addr() == other.addr()
    }

    /// Invokes the observer's capability with the event's payload.
    ///
    /// Fails only if the event belongs to another channel, which the
    /// observer sets never allow.
    pub fn notify(&self, event: &Event) -> Result<(), Fault> {
        match (self, event) {
            (Observer::Tick(o), Event::Tick) => o.on_tick(),
            (Observer::Render(o), Event::Render) => o.on_render(),
            (Observer::GuiRender(o), Event::GuiRender) => o.on_render_gui(),
            (Observer::PacketInput(o), Event::PacketInput(e)) => o.on_packet(e),
            (Observer::LeftClick(o), Event::LeftClick(e)) => o.on_left_click(e),
            (Observer::ChatInput(o), Event::ChatInput(e)) => o.on_chat_received(e),
            (Observer::ChatOutput(o), Event::ChatOutput(e)) => o.on_chat_sent(e),
            (Observer::Death(o), Event::Death) => o.on_death(),
            (observer, event) => {
                return Err(Fault::ChannelMismatch {
                    observer: observer.channel(),
                    event: event.channel(),
                });
            }
        }
        Ok(())
    }
}

impl PartialEq for Observer {
    fn eq(&self, other: &Self) -> bool {
        self.same(other)
    }
}

impl Eq for Observer {}

impl fmt::Debug for Observer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Observer")
            .field("channel", &self.channel())
            .field("name", &self.name())
            .finish()
    }
}
