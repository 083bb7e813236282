//! Conflict policy consulted before an existing destination file is overwritten.

use crate::spec::EnumConflictDecision;

/// Decides whether an existing destination file may be replaced.
///
/// Asked once per colliding destination file, synchronously, with no
/// information about the entry. Callers that need path-aware answers close
/// over that state themselves.
pub trait ReplacePolicy {
    /// `true` replaces the destination, `false` keeps it.
    fn should_replace(&self) -> bool;
}

impl<F> ReplacePolicy for F
where
    F: Fn() -> bool,
{
    fn should_replace(&self) -> bool {
        self()
    }
}

impl ReplacePolicy for EnumConflictDecision {
    fn should_replace(&self) -> bool {
        *self == EnumConflictDecision::Replace
    }
}

/// Policy that always overwrites.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysReplace;

impl ReplacePolicy for AlwaysReplace {
    fn should_replace(&self) -> bool {
        true
    }
}

/// Policy that never overwrites.
#[derive(Debug, Clone, Copy, Default)]
pub struct NeverReplace;

impl ReplacePolicy for NeverReplace {
    fn should_replace(&self) -> bool {
        false
    }
}

pub(crate) fn decide(policy: &dyn ReplacePolicy) -> EnumConflictDecision {
    EnumConflictDecision::from_should_replace(policy.should_replace())
}
