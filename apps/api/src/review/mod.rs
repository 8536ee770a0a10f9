//! Review core: the field differ, the review session state machine, and the
//! driver that runs sessions against the backend services.

pub mod comparison;
pub mod diff;
pub mod document;
pub mod driver;
pub mod errors;
pub mod handlers;
pub mod projection;
pub mod session;
