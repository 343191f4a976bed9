pub mod analysis;
pub mod constant;
pub mod document;
pub mod mark;
pub mod outcome;
pub mod progress;
pub mod work_unit;

pub use analysis::{AnalysisMetadata, ImageDimensions, ParamValue};
pub use mark::FeatureMember;
pub use outcome::{UnitOutcome, UnitStatus};
pub use progress::{ProgressSnapshot, ProgressTracker};
pub use work_unit::{AnalysisRef, IdRange, MarkLink, RangeFilter, UnitScope, WorkUnit};
