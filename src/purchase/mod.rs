//! Purchase module containing the workflow engine, ledger map, and
//! due/aging queries

pub mod dues;
pub mod ledger_map;
pub mod workflow;

pub use dues::*;
pub use ledger_map::*;
pub use workflow::*;
