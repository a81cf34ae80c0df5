//! Services backing the HTTP handlers.

pub mod converter;

pub use converter::{input_format_for, AvailableFormats, PandocConverter};
