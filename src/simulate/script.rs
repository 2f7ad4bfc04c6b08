//! Scripted step handlers.

use std::collections::VecDeque;
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use crate::steps::{HandlerOutput, StepContext, StepHandler};

/// What one handler invocation does.
///
/// Parsed from strings such as `ok`, `ok:<artifact>`, `cancel`, `declined`,
/// `transient`, `fatal`, `fatal:<message>`, `hang`, and `delay:<ms>`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "String")]
pub enum ScriptedAttempt {
    /// Succeed, optionally with a specific artifact.
    Ok(Option<String>),
    /// Return the cancellation sentinel.
    Cancel,
    /// Fail with a user-declined signature.
    Declined,
    /// Fail with a stale-synchronization signature.
    Transient,
    /// Fail with an unrecognised message.
    Fatal(String),
    /// Never finish.
    Hang,
    /// Succeed after a delay in milliseconds.
    Delay(u64),
}

impl FromStr for ScriptedAttempt {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (head, arg) = match s.split_once(':') {
            Some((head, arg)) => (head.trim(), Some(arg.trim())),
            None => (s.trim(), None),
        };

        match (head, arg) {
            ("ok", arg) => Ok(ScriptedAttempt::Ok(arg.map(str::to_string))),
            ("cancel", None) => Ok(ScriptedAttempt::Cancel),
            ("declined", None) => Ok(ScriptedAttempt::Declined),
            ("transient", None) => Ok(ScriptedAttempt::Transient),
            ("fatal", None) => Ok(ScriptedAttempt::Fatal("unexpected failure".to_string())),
            ("fatal", Some(msg)) => Ok(ScriptedAttempt::Fatal(msg.to_string())),
            ("hang", None) => Ok(ScriptedAttempt::Hang),
            ("delay", Some(ms)) => ms
                .parse()
                .map(ScriptedAttempt::Delay)
                .map_err(|_| format!("invalid delay '{}'", ms)),
            _ => Err(format!("unknown scripted attempt '{}'", s)),
        }
    }
}

impl TryFrom<String> for ScriptedAttempt {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl fmt::Display for ScriptedAttempt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScriptedAttempt::Ok(None) => f.write_str("ok"),
            ScriptedAttempt::Ok(Some(value)) => write!(f, "ok:{}", value),
            ScriptedAttempt::Cancel => f.write_str("cancel"),
            ScriptedAttempt::Declined => f.write_str("declined"),
            ScriptedAttempt::Transient => f.write_str("transient"),
            ScriptedAttempt::Fatal(msg) => write!(f, "fatal:{}", msg),
            ScriptedAttempt::Hang => f.write_str("hang"),
            ScriptedAttempt::Delay(ms) => write!(f, "delay:{}", ms),
        }
    }
}

impl ScriptedAttempt {
    async fn perform(&self, ctx: &StepContext) -> anyhow::Result<HandlerOutput> {
        match self {
            ScriptedAttempt::Ok(value) => Ok(HandlerOutput::done(
                value
                    .clone()
                    .unwrap_or_else(|| format!("{}@{}", ctx.step.key(), ctx.identity)),
            )),
            ScriptedAttempt::Cancel => Ok(HandlerOutput::Cancelled),
            ScriptedAttempt::Declined => anyhow::bail!("User rejected the request"),
            ScriptedAttempt::Transient => anyhow::bail!("Stale synchronization detected"),
            ScriptedAttempt::Fatal(msg) => anyhow::bail!("{}", msg),
            ScriptedAttempt::Hang => std::future::pending().await,
            ScriptedAttempt::Delay(ms) => {
                tokio::time::sleep(Duration::from_millis(*ms)).await;
                Ok(HandlerOutput::done(ctx.step.key()))
            }
        }
    }
}

/// Replays a queue of scripted attempts; succeeds once the queue runs dry.
#[derive(Debug, Default)]
pub struct ScriptedHandler {
    script: Mutex<VecDeque<ScriptedAttempt>>,
    calls: AtomicU32,
}

impl ScriptedHandler {
    /// Create a handler from a script.
    pub fn new(script: impl IntoIterator<Item = ScriptedAttempt>) -> Self {
        Self {
            script: Mutex::new(script.into_iter().collect()),
            calls: AtomicU32::new(0),
        }
    }

    /// How many times the handler was invoked.
    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    fn next_attempt(&self) -> ScriptedAttempt {
        self.script
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop_front()
            .unwrap_or(ScriptedAttempt::Ok(None))
    }
}

#[async_trait]
impl StepHandler for ScriptedHandler {
    async fn run(&self, ctx: StepContext) -> anyhow::Result<HandlerOutput> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let attempt = self.next_attempt();
        tracing::debug!(step = %ctx.step, attempt = %attempt, "scripted handler");
        attempt.perform(&ctx).await
    }
}
