pub mod code_graph;
pub mod import_map;
pub mod module_id;
