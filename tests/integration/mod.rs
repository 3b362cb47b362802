//! Integration tests for the content policy engine

mod config_loading;
mod messaging_correlation;
mod policy_decisions;
mod policy_over_port;
mod sitekey_verification;
mod test_utils;
