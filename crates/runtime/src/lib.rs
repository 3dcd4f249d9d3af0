//! External collaborators used to get the elevated helper running.
//!
//! Nothing in here knows about sessions or calls. The traits are the seams the
//! bootstrapper in `privbridge` drives; the bundled implementations shell out to
//! `su` and `adb` so the bridge is usable without any platform glue.

pub mod debug_bridge;
pub mod launch;
pub mod process;
pub mod shell;

pub use debug_bridge::{AdbCli, DebugBridgeClient, DebugBridgeConnection, ShellStream};
pub use launch::LaunchCommand;
pub use shell::{ShellOutput, ShellRunner, SuShellRunner};
