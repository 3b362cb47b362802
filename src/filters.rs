//! Filters and the collaborators the decision engine consults: matcher,
//! element hiding lookup and hit storage.

pub mod domains;
pub mod elemhide;
pub mod engine;
pub mod filter;
pub mod list;
pub mod matcher;
pub mod pattern;
pub mod storage;

pub use elemhide::{ElemHideLookup, ElemHideRegistry};
pub use engine::FilterEngine;
pub use filter::{ElemHideFilter, Filter, PatternFilter, TypeMask};
pub use list::FilterList;
pub use matcher::{CombinedMatcher, MatchQuery, Matcher};
pub use storage::{FilterStats, FilterStorage, MemoryFilterStorage};
