//! Domain models.

mod entity;

pub use entity::{collate, PageEntity};
