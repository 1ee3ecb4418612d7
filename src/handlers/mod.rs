// handlers/mod.rs - Two-tier handler layout
//
// Public (no auth) → Protected (bearer token resolved to a firm user)
pub mod protected; // Bearer token required: /me, /clients, /datasets/*
pub mod public; // No authentication: /health
