//! Domain vocabulary shared by the gym service and its clients.
//!
//! Nothing in here touches storage: the types carry the membership policy
//! table, the payment state machine and the remaining-days arithmetic so
//! that the API and any UI agree on them.

mod image;
mod membership;
mod payment;
mod realm;

pub use image::*;
pub use membership::*;
pub use payment::*;
pub use realm::*;
