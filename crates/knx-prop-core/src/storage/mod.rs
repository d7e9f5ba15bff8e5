//! Storage for property definitions.

pub mod catalog;

pub use catalog::Catalog;

/// File name of the definitions looked up in the data directory.
pub const DEFAULT_DEFINITIONS_FILE: &str = "properties.json";

/// Get the default data directory for knx-prop tools.
///
/// Uses the `directories` crate to find the appropriate platform-specific
/// data directory.
pub fn default_data_dir() -> Option<std::path::PathBuf> {
    directories::ProjectDirs::from("", "knx-prop", "knx-prop")
        .map(|dirs| dirs.data_dir().to_path_buf())
}

/// Definitions file in the data directory, if one exists.
pub fn default_definitions_path() -> Option<std::path::PathBuf> {
    default_data_dir()
        .map(|dir| dir.join(DEFAULT_DEFINITIONS_FILE))
        .filter(|path| path.is_file())
}
