//! Core of the water bill ledger: customer bill histories, the storage port
//! that backends implement, and the record store that merges and scans them.

pub mod application;
pub mod domain;
pub mod error;
pub mod memory;
pub mod ports;
pub mod utils;
