pub use probing_core::{ProbingError as Error, Result};
