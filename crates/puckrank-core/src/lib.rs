// Library root: data model, row normalization, duplicate resolution and the
// ranking engine. Everything here is synchronous and free of I/O apart from
// reading configuration files.

pub mod config;
pub mod error;
pub mod normalize;
pub mod ranking;
pub mod record;
pub mod resolve;
