//! Core trait abstractions for the research library.
//!
//! These traits are the seams where applications plug in a language model
//! and a search provider.

pub mod completion;
pub mod searcher;
