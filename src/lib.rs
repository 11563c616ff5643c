//! Workspace root. The functionality lives in the member crates:
//! `simwire-proto` (wire formats), `simwire-core` (protocol engines), and
//! `simwire-harness` (deterministic simulation).
