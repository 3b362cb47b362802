//! Property-based tests for decision guarantees

mod decisions;
