// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

//! Infrastructure Layer
//!
//! Adapters implementing the ports the reconciler depends on.
//!
//! ## Adapters
//!
//! - `PebbleClient`: process supervisor reached over the Pebble unix socket
//! - `HookTools`: configuration, status and action I/O through hook tools
//! - `RelationIngress`: ingress requirements published as relation data
//! - `LocalFileStore`: workload files on the container's mounted filesystem
//! - `JsonFileStateStore`: recorded state kept as JSON in the charm directory
//! - `in_memory`: in-memory doubles used by `--dry-run` and the tests

pub mod hook_tools;
pub mod in_memory;
pub mod json_state_store;
pub mod local_files;
pub mod pebble;

pub use hook_tools::{CommandRunner, HookTools, ProcessRunner, RelationIngress};
pub use in_memory::{
    InMemoryConfigSource, InMemoryFileStore, InMemoryStateStore, InMemorySupervisor,
    RecordingActionChannel, RecordingIngress, RecordingStatus,
};
pub use json_state_store::JsonFileStateStore;
pub use local_files::LocalFileStore;
pub use pebble::PebbleClient;
