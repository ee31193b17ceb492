//! Client for the external threat classifier RPC.
//!
//! The classifier is a black box behind HTTP: six numeric features in, an
//! attack label with scores out. The client is stateless, thread-safe,
//! and deliberately forgiving — any failure (timeout, transport, bad
//! status, malformed body) collapses into a deterministic fallback so the
//! ingest path never depends on classifier availability.

mod client;
mod features;

pub use client::{ClassifierClient, CLASSIFY_TIMEOUT};
pub use features::FeatureVector;
