pub use watchparty_core::model::{Participant, ParticipantId};

pub mod model {
    pub use watchparty_core::model::*;
}

#[cfg(feature = "client")]
pub mod client {
    pub use watchparty_client::*;
}
