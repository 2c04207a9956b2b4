//! Embedded storage for the panel server: a generic key/value table and the
//! client settings record kept in it.

pub mod db;
pub mod kv;
pub mod migrations;
pub mod settings;
