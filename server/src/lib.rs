//! Roster Server
//!
//! User directory service: CRUD, paginated listing, keyword search and CSV
//! export of user records, with profile images stored in S3, on local disk,
//! or inline as data URIs.

pub mod api;
pub mod config;
pub mod db;
pub mod storage;
pub mod users;
