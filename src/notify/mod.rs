//! Notification pipeline
//!
//! Three collaborators sit behind the bus's `NotificationSent` events:
//! the orchestrator expands disruption events into per-recipient
//! notifications, the store classifies and retains a bounded history,
//! and the gateway pushes live copies to subscribers.

pub mod gateway;
pub mod orchestrator;
pub mod store;

pub use gateway::{NotificationGateway, NotificationStream, PushUpdate, PushedNotification};
pub use orchestrator::NotificationOrchestrator;
pub use store::{NotificationStore, StoredNotification};
