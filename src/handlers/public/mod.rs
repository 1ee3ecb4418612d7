// handlers/public/mod.rs - Public handlers (no authentication required)
//
// Security Level: None
// Middleware: global CORS + tracing only
pub mod health;

pub use health::health;
