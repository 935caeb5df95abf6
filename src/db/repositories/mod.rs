//! Database repositories
//!
//! Repository pattern implementations for database access.
//! Each repository handles storage for one aggregate.

pub mod booking;
pub mod certification;
pub mod notice;
pub mod session;
pub mod skill_card;
pub mod student;

pub use booking::{BookingRepository, SqlxBookingRepository};
pub use certification::{CertificationRepository, SqlxCertificationRepository};
pub use notice::{NoticeRepository, SqlxNoticeRepository};
pub use session::{SessionRepository, SqlxSessionRepository};
pub use skill_card::{SkillCardRepository, SqlxSkillCardRepository};
pub use student::{SqlxStudentRepository, StudentRepository};
