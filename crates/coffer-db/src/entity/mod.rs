//! database entity models for sea-orm.
//!
//! these entities map to database tables. there are no foreign-key
//! constraints between them; the unit of work keeps dependent rows
//! consistent.

pub mod credential;
pub mod feature_flag_credential;
pub mod feature_flag_data;
pub mod file_credential;
pub mod group;
pub mod password_credential;
pub mod permission_assignment;
pub mod user;
pub mod vault;
pub mod vault_credential;
