// events/mod.rs
//
// Retranscription event contract and the bus that carries it.

pub mod bus;
pub mod types;

pub use bus::{EventBus, Subscription};
pub use types::{
    EventError, RetranscriptionEvent, RetranscriptionFailure, RetranscriptionProgress,
    RetranscriptionResult, COMPLETE_EVENT, ERROR_EVENT, PROGRESS_EVENT,
};
