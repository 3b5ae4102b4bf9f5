//! Probe contract and the example probes built on it.
//!
//! A probe answers four questions about a target: what credentials it
//! needs, whether a given set of credentials works, what entity kinds it
//! can discover and how they relate, and what the target currently
//! contains. Probes that can also act on the target implement the
//! [`ActionExecutor`] contract on top.

pub mod application;
pub mod cli;
pub mod file;
pub mod probe;
pub mod simple;
pub mod storage;
pub mod vim;

pub use application::ApplicationProbe;
pub use file::FileProbe;
pub use probe::{ActionExecutor, Probe};
pub use simple::SimpleProbe;
pub use storage::StorageProbe;
pub use vim::{HostInfo, StaticInventory, VimInventory, VimProbe, VimSnapshot, VmInfo};
