//! Interview lifecycle state machine and per-question evaluation phases.

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::error::{InterviewError, InterviewResult};
use crate::model::{Interview, InterviewStatus};

impl InterviewStatus {
    /// Whether `self -> next` is a legal lifecycle transition.
    pub fn can_transition_to(self, next: InterviewStatus) -> bool {
        use InterviewStatus::*;
        matches!(
            (self, next),
            (Preparing, Ready)
                | (Preparing, Cancelled)
                | (Ready, InProgress)
                | (Ready, Cancelled)
                | (InProgress, Completed)
                | (InProgress, Cancelled)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, InterviewStatus::Completed | InterviewStatus::Cancelled)
    }
}

impl Interview {
    /// Move to `next`, stamping the relevant timestamps.
    ///
    /// Fails without touching the interview if the transition is not allowed.
    pub fn transition_to(&mut self, next: InterviewStatus) -> InterviewResult<()> {
        if !self.status.can_transition_to(next) {
            return Err(InterviewError::InvalidStateTransition {
                from: self.status,
                to: next,
            });
        }

        let now = Utc::now();
        match next {
            InterviewStatus::InProgress => self.started_at = Some(now),
            InterviewStatus::Completed => self.completed_at = Some(now),
            _ => {}
        }
        tracing::info!(interview = %self.id, from = %self.status, to = %next, "interview transition");
        self.status = next;
        self.updated_at = now;
        Ok(())
    }

    /// Fail with `InvalidStateTransition` unless the interview is in `expected`.
    ///
    /// `attempted` names the state the caller was trying to reach.
    pub fn require_status(
        &self,
        expected: InterviewStatus,
        attempted: InterviewStatus,
    ) -> InterviewResult<()> {
        if self.status == expected {
            Ok(())
        } else {
            Err(InterviewError::InvalidStateTransition {
                from: self.status,
                to: attempted,
            })
        }
    }
}

/// Where a main question stands in the adaptive follow-up loop.
///
/// `AnsweredMain -> Evaluating -> {FollowUpNeeded -> AnsweredFollowUp -> ... | Satisfied}`;
/// `Satisfied` and `FollowUpLimitReached` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvaluationPhase {
    AnsweredMain,
    Evaluating,
    FollowUpNeeded,
    AnsweredFollowUp,
    Satisfied,
    FollowUpLimitReached,
}

impl EvaluationPhase {
    /// Phase an answer enters before it is scored.
    pub fn submitted(is_follow_up: bool) -> Self {
        if is_follow_up {
            EvaluationPhase::AnsweredFollowUp
        } else {
            EvaluationPhase::AnsweredMain
        }
    }

    pub fn can_advance_to(self, next: EvaluationPhase) -> bool {
        use EvaluationPhase::*;
        matches!(
            (self, next),
            (AnsweredMain | AnsweredFollowUp, Evaluating)
                | (Evaluating, FollowUpNeeded | Satisfied | FollowUpLimitReached)
                | (FollowUpNeeded, AnsweredFollowUp)
        )
    }

    pub fn advance(self, next: EvaluationPhase) -> EvaluationPhase {
        debug_assert!(self.can_advance_to(next), "{self:?} -> {next:?}");
        tracing::trace!(from = ?self, to = ?next, "evaluation phase");
        next
    }

    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            EvaluationPhase::Satisfied | EvaluationPhase::FollowUpLimitReached
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn happy_path_transitions() {
        let mut interview = Interview::new("cand-1");
        interview.transition_to(InterviewStatus::Ready).unwrap();
        interview.transition_to(InterviewStatus::InProgress).unwrap();
        assert!(interview.started_at.is_some());
        interview.transition_to(InterviewStatus::Completed).unwrap();
        assert!(interview.completed_at.is_some());
        assert!(interview.status.is_terminal());
    }

    #[test]
    fn illegal_transitions_are_rejected() {
        let mut interview = Interview::new("cand-1");
        let err = interview
            .transition_to(InterviewStatus::InProgress)
            .unwrap_err();
        assert!(matches!(
            err,
            InterviewError::InvalidStateTransition {
                from: InterviewStatus::Preparing,
                to: InterviewStatus::InProgress
            }
        ));
        assert_eq!(interview.status, InterviewStatus::Preparing);

        interview.transition_to(InterviewStatus::Cancelled).unwrap();
        assert!(interview.transition_to(InterviewStatus::Ready).is_err());
    }

    #[test]
    fn completed_only_from_in_progress() {
        for from in [
            InterviewStatus::Preparing,
            InterviewStatus::Ready,
            InterviewStatus::Completed,
            InterviewStatus::Cancelled,
        ] {
            assert!(!from.can_transition_to(InterviewStatus::Completed), "{from}");
        }
        assert!(InterviewStatus::InProgress.can_transition_to(InterviewStatus::Completed));
    }

    #[test]
    fn evaluation_phase_transitions() {
        use EvaluationPhase::*;
        assert_eq!(EvaluationPhase::submitted(false), AnsweredMain);
        assert_eq!(EvaluationPhase::submitted(true), AnsweredFollowUp);

        assert!(AnsweredMain.can_advance_to(Evaluating));
        assert!(AnsweredFollowUp.can_advance_to(Evaluating));
        for outcome in [FollowUpNeeded, Satisfied, FollowUpLimitReached] {
            assert!(Evaluating.can_advance_to(outcome), "{outcome:?}");
        }
        assert!(FollowUpNeeded.can_advance_to(AnsweredFollowUp));

        assert!(!AnsweredMain.can_advance_to(Satisfied));
        assert!(!Satisfied.can_advance_to(AnsweredFollowUp));
        assert!(!FollowUpLimitReached.can_advance_to(Evaluating));
        assert!(Satisfied.is_terminal() && FollowUpLimitReached.is_terminal());
        assert!(!FollowUpNeeded.is_terminal());
    }

    #[test]
    fn require_status_reports_attempted_target() {
        let interview = Interview::new("cand-1");
        let err = interview
            .require_status(InterviewStatus::InProgress, InterviewStatus::Completed)
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid state transition: PREPARING -> COMPLETED"
        );
    }
}
