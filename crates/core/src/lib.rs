// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! tb-core: domain types for the Tributary control plane

pub mod macros;

pub mod clock;
pub mod dag;
pub mod dependency;
pub mod deployment;
pub mod error;
pub mod event;
pub mod id;
pub mod job;
pub mod release;
pub mod replay;
pub mod resource;
pub mod run;
pub mod run_event;
pub mod schedule;
pub mod span;
pub mod tenant;
pub mod window;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use clock::{Clock, FakeClock, SystemClock};
pub use dag::{Dag, DagTask, ExternalUpstream};
pub use dependency::{
    DependencyRef, DependencySpec, EdgeKind, EdgeOrigin, HttpDependency, JobDependency, JobSource,
    UnknownDependencies,
};
pub use deployment::{DeploymentDetails, DeploymentFailure, DeploymentStatus, JobDeployment};
pub use error::ErrorKind;
pub use event::Event;
pub use id::{
    DeploymentId, JobId, JobRunId, NamespaceId, OperatorRunId, ProjectId, ReplayId, ResourceId,
    SecretId,
};
#[cfg(any(test, feature = "test-support"))]
pub use job::JobSpecBuilder;
pub use job::{Behavior, Hook, HookType, Job, JobSpec, Retry, ScheduleSpec, SpecError, TaskSpec};
pub use release::{MigrationRecord, APP_VERSION};
pub use replay::{
    ExecutionNode, Replay, ReplayConfig, ReplayFailure, ReplayRun, ReplayRunStatus, ReplayStatus,
};
pub use resource::{resource_urn, Resource};
pub use run::{
    InstanceData, JobRun, JobRunStatus, OperatorKind, OperatorRun, OperatorStatus, RunListing,
};
pub use run_event::{OperatorPayload, OperatorPhase, RunEvent, RunEventError, RunPayload, WireEvent};
pub use schedule::{CronSchedule, ScheduleError};
pub use span::{parse_duration, Span, SpanError};
pub use tenant::{Namespace, Project, Secret, SecretType};
pub use window::{Interval, WindowError, WindowSpec, WindowVersion};
