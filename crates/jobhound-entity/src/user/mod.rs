//! Recipient and subscription entities.

pub mod model;
pub mod preference;

pub use model::User;
pub use preference::Preference;
