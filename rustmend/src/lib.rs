pub mod config;
pub mod enumerate;
pub mod errors;
pub mod filters;
pub mod matcher;
pub mod patch;
pub mod position;
pub mod query;
pub mod source;
pub mod walker;

pub use config::RunConfig;
pub use enumerate::MatchEnumerator;
pub use errors::{MendError, MendResult};
pub use matcher::{CustomMatcher, Matcher, PatternDef, PatternMatcher};
pub use patch::Patch;
pub use position::{Bound, LineMark, Position};
pub use query::{
    AcceptAll, Decision, DecisionSource, EditorLauncher, Query, QueuedDecisions, RunReport,
};
pub use source::{LineEnding, SourceFile};
pub use walker::PathFilter;
