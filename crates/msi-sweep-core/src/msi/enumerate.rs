use tracing::{debug, trace, warn};

use super::EnumStep;
use crate::error::Error;

/// A run this long of failing indexes ends the sequence with an error, so a
/// subsystem that rejects every index can neither spin forever nor pass for
/// one with nothing installed.
pub const MAX_CONSECUTIVE_FAILURES: u32 = 64;

/// What an access-denied index means for the sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeniedPolicy {
    /// Yield a permission error and stop.
    Fatal,
    /// Stop quietly.
    EndSequence,
}

/// Lazy, finite walk over an index-based native enumeration.
///
/// Starts at index 0 every time it is created. Failing indexes are skipped,
/// the "no more items" sentinel ends the sequence.
pub struct Enumeration<'a, T> {
    step: Box<dyn FnMut(u32) -> EnumStep<T> + 'a>,
    kind: &'static str,
    policy: DeniedPolicy,
    index: u32,
    failures: u32,
    finished: bool,
}

impl<'a, T> Enumeration<'a, T> {
    pub fn new<F>(kind: &'static str, policy: DeniedPolicy, step: F) -> Self
    where
        F: FnMut(u32) -> EnumStep<T> + 'a,
    {
        Self {
            step: Box::new(step),
            kind,
            policy,
            index: 0,
            failures: 0,
            finished: false,
        }
    }
}

impl<T> Iterator for Enumeration<'_, T> {
    type Item = Result<T, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        while !self.finished {
            let index = self.index;
            match self.index.checked_add(1) {
                Some(next) => self.index = next,
                None => self.finished = true,
            }

            match (self.step)(index) {
                EnumStep::Item(item) => {
                    self.failures = 0;
                    return Some(Ok(item));
                }
                EnumStep::End => {
                    self.finished = true;
                }
                EnumStep::AccessDenied => {
                    self.finished = true;
                    match self.policy {
                        DeniedPolicy::Fatal => {
                            return Some(Err(Error::PermissionDenied(format!(
                                "access denied enumerating installed {}; run as administrator",
                                self.kind
                            ))));
                        }
                        DeniedPolicy::EndSequence => {
                            debug!("Access denied enumerating {} at index {}", self.kind, index);
                        }
                    }
                }
                EnumStep::Skip(code) => {
                    trace!("Skipping {} index {} (error {})", self.kind, index, code);
                    self.failures += 1;
                    if self.failures >= MAX_CONSECUTIVE_FAILURES {
                        warn!(
                            "Giving up on {} after {} consecutive failures (last error {})",
                            self.kind, self.failures, code
                        );
                        self.finished = true;
                        return Some(Err(Error::Other(format!(
                            "unable to enumerate installed {}: {} consecutive failures \
                             at index {} (last error {})",
                            self.kind, self.failures, index, code
                        ))));
                    }
                }
            }
        }
        None
    }
}
