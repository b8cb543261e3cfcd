pub mod toml_loader;

pub use toml_loader::{load_assignment_manifest, parse_assignment_manifest};
