//! Picks one tutorial/lab index per selected course so that no sessions clash,
//! using as few campus days per week as possible.

pub mod catalog;
pub mod conflict;
pub mod data;
pub mod diagnosis;
pub mod error;
pub mod model;
pub mod parse;
pub mod report;
pub mod server;
pub mod solver;
