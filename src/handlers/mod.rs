// handlers/mod.rs - Two-tier handler architecture
//
// Public (no session) → Protected (client key + JWT)

pub mod protected; // Tier 2: session token required
pub mod public;    // Tier 1: no session token
