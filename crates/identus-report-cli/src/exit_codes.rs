//! Process exit codes. Part of the CI contract: workflows branch on them.
//! When several apply, the highest wins (4 > 3 > 1).

pub const SUCCESS: i32 = 0;
pub const TEST_FAILURE: i32 = 1; // At least one runner did not pass
pub const CONFIG_ERROR: i32 = 2; // Bad environment blob or configuration
pub const PIPELINE_ERROR: i32 = 3; // A pipeline step aborted the run
pub const NOTIFICATION_FAILED: i32 = 4; // Failure notification could not be delivered
