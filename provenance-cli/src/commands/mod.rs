//! Subcommand implementations.

pub mod generate;
pub mod keygen;
pub mod sign;
pub mod verify;
