//! Services layer - business logic
//!
//! The ingestion pipeline (device auth → persist → alert evaluation), the
//! per-room alert debouncer, login/token issuance, and the outbound mail
//! notifier live here. Services depend on repository traits, never on a
//! concrete database.

pub mod alerts;
pub mod auth;
pub mod email;
pub mod ingest;
pub mod password;

pub use alerts::AlertService;
pub use auth::{AuthService, AuthServiceError, TokenClaims};
pub use email::{Notifier, SmtpNotifier};
pub use ingest::{IngestError, IngestService, RoomAck};
pub use password::{hash_password, verify_password};
