pub mod completion;
pub mod habit;
pub mod stats;

pub use completion::{CompletionDocument, CompletionRecord, IngestError, RawCompletion};
pub use habit::{Frequency, Habit, User};
pub use stats::{RankedHabit, StreakSummary};
