//! Building blocks shared by the setup stages: create-or-reuse for remote
//! resources and a poller that waits for many resources at once.

mod ensure;
mod poller;

pub use ensure::{Ensured, ensure_replacing_failed, ensure_resource, ensure_solution_version};
pub use poller::{PollOutcome, PollReport, Poller};
