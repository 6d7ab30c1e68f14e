//! Data model shared by the gate, the store and the reconciliation engine.

pub mod outcome;
pub mod record;
pub mod subject;
pub mod util;
