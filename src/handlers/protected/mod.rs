// handlers/protected/mod.rs - Protected handlers (bearer token required)
//
// Every route here sits behind `middleware::require_caller`, so handlers can
// take `Extension<Caller>` and rely on it being present.
pub mod clients;
pub mod datasets;
pub mod me;

pub use clients::list as clients_list;
pub use datasets::add_file as dataset_add_file;
pub use datasets::create as dataset_create;
pub use datasets::get as dataset_get;
pub use datasets::list as datasets_list;
pub use datasets::process as dataset_process;
pub use me::me;
