//! PostgreSQL repository implementations of the store traits.

pub mod delivery;
pub mod job;
pub mod posting;
pub mod preference;
pub mod user;

pub use delivery::DeliveryRepository;
pub use job::JobRepository;
pub use posting::PostingRepository;
pub use preference::PreferenceRepository;
pub use user::UserRepository;
