//! API route definitions
//!
//! Query programs are served under /api/v1/search; the probes live at the
//! root so orchestrators can reach them without the API prefix.

pub mod health;
pub mod search;
