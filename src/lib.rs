//! Skillbook - certification tracking and session booking
//!
//! Skill card lifecycle (activation, renewal, expiry), exam module
//! tracking, training session availability and turn booking.

pub mod config;
pub mod db;
pub mod models;
pub mod services;
