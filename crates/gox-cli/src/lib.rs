pub mod compiler;
pub mod config;
pub mod discovery;
pub mod errors;
pub mod imports;
pub mod validate;

pub use compiler::{output_path, CompileOutcome, GoxCompiler, GEN_SUFFIX, GOX_SUFFIX};
pub use config::{find_project_root, Config};
pub use discovery::{clean_generated, SourceDiscovery};
pub use errors::CliError;
