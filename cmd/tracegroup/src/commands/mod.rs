//! CLI commands module.

mod cluster;
mod util;
mod vocab;

pub use cluster::ClusterCommand;
pub use vocab::VocabCommand;
