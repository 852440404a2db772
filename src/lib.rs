pub mod config;
pub mod convert;
pub mod db;
pub mod emit;
pub mod engine;
pub mod error;
pub mod intern;
pub mod keys;
pub mod model;
pub mod progress;
pub mod scan;
pub mod source;
pub mod sql;
