//! Domain definitions.

pub mod contract;

pub use self::contract::Contract;
