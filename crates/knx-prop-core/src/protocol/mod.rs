//! Protocol layer for property access.
//!
//! This module handles command grammar, data literals and data type
//! translation for KNX properties.

pub mod codec;
pub mod commands;
pub mod pdt;
