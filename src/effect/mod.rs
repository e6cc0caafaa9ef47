//! Effects scheduled after a render commit.
//!
//! An effect registered without a dependency list runs after every commit.
//! With a list it runs on the first commit and then only when the list
//! differs from the one captured at its previous run; `()` is the empty list
//! and so runs exactly once.

mod effect;

pub(crate) use effect::{run_pending, EffectRecord};
