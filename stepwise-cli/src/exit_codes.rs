/// Every step succeeded, or failed only where the halt policy exempts it.
pub const SUCCESS: i32 = 0;
/// The collection, an environment file, `--set`/`--halt-on`/`--events` or the run
/// configuration was rejected before any request went out. Clap usage errors share this code.
pub const VALIDATION_FAILED: i32 = 2;
/// The run finished or halted with at least one step failure that is not exempt.
pub const RUN_FAILED: i32 = 3;
/// A file could not be read or the async runtime could not start.
pub const RUNTIME_ERROR: i32 = 4;
