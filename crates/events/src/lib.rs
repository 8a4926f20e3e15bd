//! Realtime alarm event vocabulary and delivery seams.
//!
//! - [`protocol`]: event names, the outbound envelope, payload shapes, and
//!   inbound client messages.
//! - [`AlarmNotifier`]: the seam through which the ingestion pipeline hands
//!   alarms to whatever fans them out.
//! - [`EquipmentIdCache`]: time-boxed cache over the equipment lookup
//!   collaborator, used on hot delivery paths.

pub mod equipment_cache;
pub mod notifier;
pub mod protocol;

pub use equipment_cache::EquipmentIdCache;
pub use notifier::{AlarmNotifier, NotifyError};
pub use protocol::{ClientMessage, Envelope};
