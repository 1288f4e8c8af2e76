//! Subcommand handlers.
//!
//! Each file in this module corresponds to one user-facing command:
//!
//! | File          | Invocation                     | Description                   |
//! |---------------|--------------------------------|-------------------------------|
//! | `init.rs`     | `backupper init`               | Scaffold an example plan      |
//! | `run.rs`      | `backupper -c <plan> -d <dir>` | Full backup pipeline          |

pub mod init;
pub mod run;
