//! Domain models for the roomsense service

pub mod reading;
pub mod room;
pub mod user;

pub use reading::{Reading, RoomStatus};
pub use room::Room;
pub use user::{User, UserRole};
