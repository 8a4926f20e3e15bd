//! Alarm fanout over the connection registry.
//!
//! [`NotificationFanout`] is the production [`AlarmNotifier`](shipwatch_events::AlarmNotifier):
//! it decides which rooms an alarm event goes to and forwards presence
//! changes to administrators.

pub mod fanout;

pub use fanout::NotificationFanout;
