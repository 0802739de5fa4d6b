//! postgen: budget-aware staged blog post generation.
//!
//! A run turns a topic into a title, a meta-description and a body. Each stage
//! prompt is checked against a token budget before any generation call is made,
//! and the body is grounded in one recent news headline fetched for the topic.
//!
//! The main entry point is [`pipeline::StagedGenerator`].

pub mod budget;
pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod news;
pub mod pipeline;
pub mod provider;
