pub mod config_parser;
pub mod display_monitor;
pub mod file_path;
pub mod input_monitor;
pub mod kick_node;
pub mod node_monitor;
