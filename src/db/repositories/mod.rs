//! Repository layer
//!
//! Data access behind traits so services can be wired against fakes in tests.
//! Each `Sqlx*Repository` dispatches per operation on the configured driver.

pub mod reading;
pub mod room;
pub mod user;

pub use reading::{ReadingRepository, SqlxReadingRepository};
pub use room::{RoomRepository, SqlxRoomRepository};
pub use user::{SqlxUserRepository, UserRepository};
