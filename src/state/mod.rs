//! Positional state cells.
//!
//! A cell is identified by the order in which a component requests it, so a
//! component must request its cells in the same order on every render.

mod cell;

pub(crate) use cell::{ErasedCell, StateCell};
pub use cell::Setter;
