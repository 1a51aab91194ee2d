// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

//! Operator for a kamailio SIP server running under Pebble.
//!
//! The crate reconciles charm configuration into the workload container
//! (listen address, SIP domain, ingress and the Pebble layer) and handles
//! the operator actions that start, stop and restart the service.

pub mod actions;
pub mod charm;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod files;
pub mod infrastructure;
pub mod ingress;
pub mod layer;
pub mod runtime;
pub mod settings;
pub mod state;
pub mod status;
pub mod supervisor;

pub use actions::{ActionChannel, ActionKind, ActionOutcome};
pub use charm::{ActionReport, KamailioCharm, Reconciled};
pub use config::{ConfigSource, DesiredConfig};
pub use dispatch::{Dispatcher, Event};
pub use error::{OperatorError, Result};
pub use runtime::Runtime;
pub use settings::OperatorSettings;
pub use state::{RecordedState, StateStore};
pub use status::{StatusReporter, UnitStatus};
