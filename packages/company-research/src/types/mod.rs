//! Data types shared by every stage of the research loop.

pub mod assessment;
pub mod audit;
pub mod config;
pub mod record;
pub mod search;
pub mod session;
