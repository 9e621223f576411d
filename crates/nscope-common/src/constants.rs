//! System-wide constants and default paths.

/// Mount point of the proc filesystem.
pub const PROC_ROOT: &str = "/proc";

/// Filesystem type of namespace-filesystem entries as listed in mountinfo.
pub const NSFS_TYPE: &str = "nsfs";

/// Environment variable naming the action a re-executed worker runs.
pub const REEXEC_ACTION_ENV: &str = "NSCOPE_REEXEC_ACTION";

/// Environment variable carrying the JSON-encoded namespaces a re-executed
/// worker joins, in order, before running its action.
pub const REEXEC_NAMESPACES_ENV: &str = "NSCOPE_REEXEC_NAMESPACES";

/// Worker action enumerating bind-mounted namespaces.
pub const BINDMOUNTS_ACTION: &str = "discover-nsfs-bindmounts";

/// Exit code of a worker that could not join its namespaces.
pub const WORKER_EXIT_JOIN_FAILED: i32 = 3;

/// Exit code of a worker asked for an action it does not know.
pub const WORKER_EXIT_UNKNOWN_ACTION: i32 = 4;

/// Exit code of a worker whose action failed.
pub const WORKER_EXIT_ACTION_FAILED: i32 = 1;
