//! Integration tests for the transform-function execution harness

mod debug_harness;
mod test_utils;
mod workspace_layout;
