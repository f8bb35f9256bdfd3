//! Shell-independent data: the line parser and the job table.

pub mod job;
pub mod parser;
