//! Infrastructure layer for relay-native-host: stdio I/O, the outbound pump
//! and the runner that wires them to the daemon link.

pub mod pump;
pub mod runner;
pub mod stdio;

pub use pump::StdioPump;
pub use runner::run_host;
pub use stdio::{run_stdout_writer, write_frame, BrowserSink, FrameReader};
