//! Parsing and job bookkeeping shared by the shell.

pub mod intermediate_representation;
pub mod job;
pub mod parser;
