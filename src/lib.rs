//! Workspace-level integration test host for the stratum cache crates.
