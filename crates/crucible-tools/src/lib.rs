//! Crucible Tools - analysis tools as subprocesses
//!
//! Wraps the Python toolchain behind the core collaborator traits:
//! - pylint for style scores
//! - bandit for security findings
//! - radon for cyclomatic complexity
//! - pytest for executable tests
//!
//! Every invocation carries its own timeout; timeouts, missing binaries and
//! unparseable output all surface as `ToolError`s.

pub mod bandit;
pub mod pylint;
pub mod pytest;
pub mod radon;
pub mod runner;
pub mod tool;
pub mod toolchain;

pub use bandit::BanditScanner;
pub use pylint::PylintAnalyzer;
pub use pytest::PytestRunner;
pub use radon::RadonAnalyzer;
pub use runner::{ToolOutput, ToolRunner};
pub use tool::{BuiltinTool, ToolCommand};
pub use toolchain::{probe_tools, python_toolchain, ToolProbe};
