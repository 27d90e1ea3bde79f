pub mod bus;
pub mod types;

pub use bus::{RelayBus, RelaySubscription};
pub use types::{ClientEvent, RelayEnvelope, RelayEvent};
