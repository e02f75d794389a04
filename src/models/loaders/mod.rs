pub mod toml_loader;

pub use toml_loader::{load_work_list, parse_work_list};
