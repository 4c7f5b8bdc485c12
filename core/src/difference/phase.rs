use crate::time::Time;
use std::fmt;

/// Where a difference equation stands in its period.
///
/// ```text
/// PreInit ─▶ Init ─▶ PreInit2 ─▶ Pre ◀──▶ Run ─▶ Post ─┐
///    │        │                   ▲                   │
///    └────────┴──────▶ Pre / Run ◀┴─── Post2 ◀────────┘ (out of phase)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Announce name, value and timestep before anything else.
    PreInit,
    /// Waiting for every dependency to announce itself.
    Init,
    /// Re-announce once the timestep has been negotiated.
    PreInit2,
    /// Waiting for this period's dependency reports.
    Pre,
    /// Compute at the next internal event.
    Run,
    /// Broadcast the freshly computed value.
    Post,
    /// Broadcast after an out-of-phase update, then resume the interrupted
    /// period after `resume`.
    Post2 { resume: Time },
}

impl Phase {
    /// Phases whose output carries an update.
    pub fn broadcasts(self) -> bool {
        matches!(
            self,
            Phase::PreInit | Phase::PreInit2 | Phase::Post | Phase::Post2 { .. }
        )
    }

    /// Phases whose update also announces the timestep.
    pub fn announces(self) -> bool {
        matches!(self, Phase::PreInit | Phase::PreInit2)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::PreInit => "pre-init",
            Phase::Init => "init",
            Phase::PreInit2 => "pre-init-2",
            Phase::Pre => "pre",
            Phase::Run => "run",
            Phase::Post => "post",
            Phase::Post2 { .. } => "post-2",
        };
        f.write_str(name)
    }
}
