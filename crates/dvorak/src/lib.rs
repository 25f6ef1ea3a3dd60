//! A judging engine for online judge submissions.
//!
//! Dvorak takes a submission off a job queue, compiles and runs it against a
//! problem's test cases inside a throwaway Docker container, and publishes a
//! single verdict per job to a result store.
//!
//! # Features
//!
//! - **Sandboxed execution** — One network-disabled, resource-capped container per job, removed on every exit path.
//! - **Multi-language** — Compiled and interpreted languages from a TOML registry.
//! - **Bounded execution** — In-container `timeout` plus a supervisory deadline on the host.
//! - **Checkers** — Strict byte-exact comparison or whitespace-trimmed lenient comparison.
//! - **Queue worker** — Blocking Redis consumer with expiring results, plus in-memory backends.

pub use config::{Config, ConfigError, EXAMPLE_CONFIG, Language};
pub use judge::{Judge, JudgeError};
pub use problem::{CheckerMode, FsProblemLoader, Problem, ProblemError, ProblemLoader, TestCase};
pub use queue::{
    JobEnvelope, JobQueue, MemoryQueue, MemoryResultStore, QueueError, QueueSender, RedisQueue,
    RedisResultStore, ResultStore,
};
pub use sandbox::{DockerRuntime, Sandbox, SandboxError, SandboxId, SandboxRuntime};
pub use types::{ExecOutput, ExecRequest, Job, SandboxFile, SandboxLimits, Submission};
pub use verdict::{ResultRecord, Verdict};
pub use worker::{Worker, WorkerError};

pub mod config;
pub mod judge;
pub mod problem;
pub mod queue;
pub mod sandbox;
pub mod types;
pub mod verdict;
pub mod worker;
