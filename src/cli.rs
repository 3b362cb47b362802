//! CLI domain: parse, route, and output only.
//! Decisions are made by the policy engine; this layer builds its inputs.

mod output;
mod parse;
mod route;

pub use output::{format_decision, format_elemhide_status, format_lint_report, map_error};
pub use parse::{parse_frame, Cli, Commands, OutputFormat};
pub use route::RunContext;
