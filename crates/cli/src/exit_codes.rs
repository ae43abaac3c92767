//! CLI Exit Code Registry
//!
//! Single source of truth for all CLI exit codes. Exit codes are part of
//! the shell contract — audit scripts rely on them.
//!
//! | Code | Meaning                                        |
//! |------|------------------------------------------------|
//! | 0    | Success, no exceptions                         |
//! | 1    | Run completed, exceptions found                |
//! | 2    | CLI usage error (bad args)                     |
//! | 3    | Invalid run config                             |
//! | 4    | Required pre-balances source failed validation |
//! | 5    | Runtime error (I/O, serialization)             |

/// Success - reconciliation ran and every metric was clean.
pub const EXIT_SUCCESS: u8 = 0;

/// Run completed and the report contains exceptions.
/// Like `diff(1)`, exit 1 means "the snapshots differ."
pub const EXIT_EXCEPTIONS: u8 = 1;

/// Usage error - bad arguments, missing required options.
pub const EXIT_USAGE: u8 = 2;

/// Run config failed to parse or validate.
pub const EXIT_INVALID_CONFIG: u8 = 3;

/// The mandatory pre-balances source was unreadable or unparseable.
/// The run aborts before any reconciliation executes.
pub const EXIT_SOURCE_INVALID: u8 = 4;

/// Runtime error (file I/O, output serialization).
pub const EXIT_RUNTIME: u8 = 5;
