use crate::{RhiError, RhiResult};

/// The kind of pass a command buffer can be inside of.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassKind {
    Render,
    Compute,
    Copy,
}

/// Where a command buffer is in its recording lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordingState {
    /// Recording outside of any pass.
    Recording,
    /// Inside a pass. Only commands of that pass kind may be recorded.
    InPass(PassKind),
    /// Recording was closed by a submit that did not complete. Only `reset`
    /// leads back to recording.
    Closed,
    /// Submitted. Only `reset` leads back to recording.
    Submitted,
}

impl RecordingState {
    #[inline]
    pub fn is_in_pass(self) -> bool {
        matches!(self, RecordingState::InPass(_))
    }

    /// Closes recording for a submit.
    ///
    /// Fails with [`RhiError::BadCallingTime`] unless recording outside of
    /// any pass. A submit that fails after this point leaves the state
    /// [`Closed`](RecordingState::Closed), so it cannot be retried
    /// without a reset.
    #[track_caller]
    pub fn close(&mut self) -> RhiResult<()> {
        self.assert_outside_pass("submit");
        if *self != RecordingState::Recording {
            return Err(RhiError::BadCallingTime);
        }
        *self = RecordingState::Closed;
        Ok(())
    }

    /// Marks a closed recording as handed to the queue.
    pub fn mark_submitted(&mut self) {
        debug_assert_eq!(*self, RecordingState::Closed);
        *self = RecordingState::Submitted;
    }

    /// Returns to recording. Returns the state that was left.
    pub fn reopen(&mut self) -> RecordingState {
        self.assert_outside_pass("reset");
        std::mem::replace(self, RecordingState::Recording)
    }

    #[track_caller]
    pub fn begin_pass(&mut self, kind: PassKind) {
        assert!(
            *self == RecordingState::Recording,
            "a {:?} pass can only be opened while recording outside of any pass (state: {:?})",
            kind,
            self
        );
        *self = RecordingState::InPass(kind);
    }

    #[track_caller]
    pub fn end_pass(&mut self, kind: PassKind) {
        self.assert_in_pass(kind);
        *self = RecordingState::Recording;
    }

    /// Panics unless a pass of the given kind is open.
    #[track_caller]
    pub fn assert_in_pass(self, kind: PassKind) {
        assert!(
            self == RecordingState::InPass(kind),
            "this command requires an open {:?} pass (state: {:?})",
            kind,
            self
        );
    }

    /// Panics unless recording outside of any pass.
    #[track_caller]
    pub fn assert_outside_pass(self, operation: &str) {
        assert!(
            !self.is_in_pass(),
            "{} cannot be called while a pass is open (state: {:?})",
            operation,
            self
        );
    }
}
