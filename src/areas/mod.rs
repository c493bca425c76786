//! Core repository components
//!
//! - `database`: object store over loose objects and packs
//! - `packs`: pack discovery, entry reading and delta resolution
//! - `refs`: loose and packed reference resolution
//! - `repository`: handle tying the areas together

pub mod database;
pub mod packs;
pub mod refs;
pub mod repository;
