//! Integration tests for the postgen generation pipeline

mod config_loading;
mod pipeline_scenarios;
mod test_utils;
