//! Command implementations.

pub mod balance;
pub mod gen;
pub mod init;
pub mod open;
pub mod root;
pub mod run;
pub mod seal;
pub mod verify;
