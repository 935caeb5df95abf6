//! Services layer - Business logic
//!
//! Services own the domain rules and coordinate the repositories:
//! - catalog lookups and the skill card lifecycle
//! - session availability and turn allocation
//! - booking validation
//! - administrative notices

pub mod availability;
pub mod booking;
pub mod catalog;
pub mod lifecycle;
pub mod notice;
pub mod turns;

#[cfg(test)]
pub(crate) mod test_support;

pub use availability::AvailabilityService;
pub use booking::{BookingError, BookingService};
pub use catalog::CatalogService;
pub use lifecycle::{
    attach_mandatory_modules, initial_expiry, renewed_expiry, LifecycleError, SkillCardService,
};
pub use notice::{NoticeService, NoticeServiceError};
pub use turns::{free_turns, TurnAllocator};
