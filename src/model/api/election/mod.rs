mod desc;
mod results;
mod spec;

pub use desc::{ElectionDescription, ElectionSummary};
pub use results::{CandidateResult, CategoryCount, ElectionResults, Turnout};
pub use spec::ElectionSpec;
