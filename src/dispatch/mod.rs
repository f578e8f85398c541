// src/dispatch/mod.rs

mod messages;
pub mod notifier;
pub mod sink;
mod worker;

pub use notifier::{Notifier, VoiceAnnouncer, WebhookNotifier};
pub use sink::{EventSink, JsonlEventLog};
pub use worker::{dispatch_channel, Dispatcher};
