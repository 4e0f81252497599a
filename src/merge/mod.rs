//! Merge module - ownership-aware `update` and `apply`.
//!
//! An [`Updater`] takes the live object, the ledger of who owns which
//! fields, and one manager's contribution, and returns the next object
//! together with the next ledger. Objects whose managers recorded another
//! API version go through a [`Converter`].

mod conflict;
mod converter;
mod updater;



pub use conflict::*;
pub use converter::{convert_field_set, ConversionError, Converter};
pub use updater::*;
