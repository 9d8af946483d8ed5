pub mod aggregate;
pub mod classify;
pub mod error;
pub mod extract;
pub mod phase;
pub mod registry;
pub mod result;
pub mod urls;
pub mod window;

pub use classify::{Collection, ObservedResponse, Outcome, ResponseClassifier, Signature, is_candidate_url};
pub use error::{Error, Result};
pub use phase::{Phase, PhaseState};
pub use registry::{AppConfig, AppRegistry};
pub use result::{AppResult, BatchResult};
pub use urls::ConsoleUrls;
pub use window::ReportWindow;
