mod download_file;
mod expand;
mod find_repository_root;
mod summary;
mod wait;

pub use download_file::download_file;
pub use expand::expand_variables;
pub use find_repository_root::find_repository_root;
pub use summary::build_counters_table;
pub use wait::sleep_or_cancel;
