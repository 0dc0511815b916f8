pub mod access_log;
pub mod basic_auth;
pub mod bearer;
pub mod cors;
pub mod recover;
pub mod request_id;
pub mod timeout;

pub use request_id::{RequestId, REQUEST_ID_HEADER};
