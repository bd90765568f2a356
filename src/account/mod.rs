//! Account lifecycle: registration, contact updates, deactivation, and
//! key rollover (spec §4.8).
pub mod key_rollover;
pub mod session;

pub use key_rollover::KeyRollover;
pub use session::{Account, AccountSession, ExternalAccountBinding, RegisterOptions};
