mod extract;
mod paths;

pub use extract::{extract_archive, ExtractRules, ExtractSummary};
pub use paths::{contained_join, is_path_segment};
