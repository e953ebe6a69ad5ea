//! Job handler implementations.

pub mod delivery;
pub mod housekeeping;
pub mod scan;

pub use delivery::DeliveryJobHandler;
pub use housekeeping::HousekeepingJobHandler;
pub use scan::ScanJobHandler;
