//! Data models
//!
//! Entities of the certification and booking domain plus the input types
//! accepted by the services.

mod booking;
mod certification;
mod notice;
mod session;
mod skill_card;
mod student;

pub use booking::{Booking, BookingRequest, BookingSelection, ChoiceSet, TurnSlot};
pub use certification::{Certification, CertificationDuration, CertificationModule, Module};
pub use notice::Notice;
pub use session::{NewSessionInput, Session, SessionStatus};
pub use skill_card::{NewSkillCardInput, SkillCard, SkillCardModule, SkillCardStatus};
pub use student::Student;
