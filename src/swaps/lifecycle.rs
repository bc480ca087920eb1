//! Pure swap lifecycle rules
//!
//! Authorization and transition guards over an in-memory swap record, with
//! no I/O. The service layer loads the record, applies these rules, then
//! performs the matching status-guarded update.

use thiserror::Error;
use uuid::Uuid;

use crate::error::ApiError;
use crate::swaps::model::{SwapRequest, SwapStatus};

/// Which side of a swap a user is on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Requester,
    Receiver,
}

/// Lifecycle rule violations
#[derive(Error, Debug, PartialEq, Eq)]
pub enum LifecycleError {
    #[error("You are not a participant in this swap")]
    NotParticipant,

    #[error("Only the receiver can do this")]
    NotReceiver,

    #[error("Only the requester can do this")]
    NotRequester,

    #[error("Swap is {actual}, expected {expected}")]
    WrongStatus {
        expected: &'static str,
        actual: &'static str,
    },
}

impl From<LifecycleError> for ApiError {
    fn from(e: LifecycleError) -> Self {
        match e {
            LifecycleError::NotParticipant
            | LifecycleError::NotReceiver
            | LifecycleError::NotRequester => ApiError::Forbidden(e.to_string()),
            LifecycleError::WrongStatus { .. } => ApiError::InvalidState(e.to_string()),
        }
    }
}

/// Resolve which side of the swap a user is on, if any
pub fn side_of(swap: &SwapRequest, user_id: Uuid) -> Option<Side> {
    if swap.requester_id == user_id {
        Some(Side::Requester)
    } else if swap.receiver_id == user_id {
        Some(Side::Receiver)
    } else {
        None
    }
}

/// The other participant's user id, given the acting side
pub fn counterparty(swap: &SwapRequest, side: Side) -> Uuid {
    match side {
        Side::Requester => swap.receiver_id,
        Side::Receiver => swap.requester_id,
    }
}

/// The actor must be a participant
pub fn require_participant(swap: &SwapRequest, user_id: Uuid) -> Result<Side, LifecycleError> {
    side_of(swap, user_id).ok_or(LifecycleError::NotParticipant)
}

fn require_status(swap: &SwapRequest, expected: SwapStatus) -> Result<(), LifecycleError> {
    if swap.status == expected {
        Ok(())
    } else {
        Err(LifecycleError::WrongStatus {
            expected: expected.as_str(),
            actual: swap.status.as_str(),
        })
    }
}

/// Guard for Accept: receiver only, pending only
pub fn authorize_accept(swap: &SwapRequest, actor_id: Uuid) -> Result<(), LifecycleError> {
    match require_participant(swap, actor_id)? {
        Side::Receiver => {}
        Side::Requester => return Err(LifecycleError::NotReceiver),
    }
    require_status(swap, SwapStatus::Pending)
}

/// Guard for Reject: receiver only, pending only
pub fn authorize_reject(swap: &SwapRequest, actor_id: Uuid) -> Result<(), LifecycleError> {
    authorize_accept(swap, actor_id)
}

/// Guard for Cancel: requester only, pending only
pub fn authorize_cancel(swap: &SwapRequest, actor_id: Uuid) -> Result<(), LifecycleError> {
    match require_participant(swap, actor_id)? {
        Side::Requester => {}
        Side::Receiver => return Err(LifecycleError::NotRequester),
    }
    require_status(swap, SwapStatus::Pending)
}

/// Guard for Schedule: either participant, accepted only
pub fn authorize_schedule(swap: &SwapRequest, actor_id: Uuid) -> Result<Side, LifecycleError> {
    let side = require_participant(swap, actor_id)?;
    require_status(swap, SwapStatus::Accepted)?;
    Ok(side)
}

/// Outcome of a completion confirmation, before it is applied
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionOutcome {
    /// The acting side already confirmed; nothing changes
    AlreadyConfirmed,
    /// One flag set, waiting for the other side
    Progress,
    /// Both flags set, the swap transitions to completed
    Completed,
}

/// Guard for Complete: either participant; accepted only, except that a
/// repeat confirmation after completion stays an idempotent no-op.
pub fn authorize_complete(
    swap: &SwapRequest,
    actor_id: Uuid,
) -> Result<(Side, CompletionOutcome), LifecycleError> {
    let side = require_participant(swap, actor_id)?;

    let already_confirmed = match side {
        Side::Requester => swap.requester_completed,
        Side::Receiver => swap.receiver_completed,
    };

    match swap.status {
        SwapStatus::Accepted => {}
        SwapStatus::Completed if already_confirmed => {
            return Ok((side, CompletionOutcome::AlreadyConfirmed));
        }
        _ => {
            return Err(LifecycleError::WrongStatus {
                expected: "accepted",
                actual: swap.status.as_str(),
            });
        }
    }

    if already_confirmed {
        return Ok((side, CompletionOutcome::AlreadyConfirmed));
    }

    let other_confirmed = match side {
        Side::Requester => swap.receiver_completed,
        Side::Receiver => swap.requester_completed,
    };

    let outcome = if other_confirmed {
        CompletionOutcome::Completed
    } else {
        CompletionOutcome::Progress
    };

    Ok((side, outcome))
}

/// Reads are restricted to participants and admins
pub fn authorize_view(swap: &SwapRequest, actor_id: Uuid, is_admin: bool) -> Result<(), LifecycleError> {
    if is_admin {
        return Ok(());
    }
    require_participant(swap, actor_id).map(|_| ())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn sample_swap(status: SwapStatus) -> SwapRequest {
        SwapRequest {
            id: Uuid::new_v4(),
            requester_id: Uuid::new_v4(),
            receiver_id: Uuid::new_v4(),
            skill_offered: "Rust".to_string(),
            skill_wanted: "Piano".to_string(),
            message: "Trade?".to_string(),
            status,
            accepted_at: None,
            rejected_at: None,
            completed_at: None,
            requester_completed: false,
            receiver_completed: false,
            session_time: None,
            session_summary: None,
            contact_email: None,
            contact_phone: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_side_resolution() {
        let swap = sample_swap(SwapStatus::Pending);
        assert_eq!(side_of(&swap, swap.requester_id), Some(Side::Requester));
        assert_eq!(side_of(&swap, swap.receiver_id), Some(Side::Receiver));
        assert_eq!(side_of(&swap, Uuid::new_v4()), None);

        assert_eq!(counterparty(&swap, Side::Requester), swap.receiver_id);
        assert_eq!(counterparty(&swap, Side::Receiver), swap.requester_id);
    }

    #[test]
    fn test_accept_requires_receiver() {
        let swap = sample_swap(SwapStatus::Pending);
        assert!(authorize_accept(&swap, swap.receiver_id).is_ok());
        assert_eq!(
            authorize_accept(&swap, swap.requester_id),
            Err(LifecycleError::NotReceiver)
        );
        assert_eq!(
            authorize_accept(&swap, Uuid::new_v4()),
            Err(LifecycleError::NotParticipant)
        );
    }

    #[test]
    fn test_accept_requires_pending() {
        for status in [SwapStatus::Accepted, SwapStatus::Rejected, SwapStatus::Completed] {
            let swap = sample_swap(status);
            assert!(matches!(
                authorize_accept(&swap, swap.receiver_id),
                Err(LifecycleError::WrongStatus { expected: "pending", .. })
            ));
        }
    }

    #[test]
    fn test_cancel_requires_requester_and_pending() {
        let swap = sample_swap(SwapStatus::Pending);
        assert!(authorize_cancel(&swap, swap.requester_id).is_ok());
        assert_eq!(
            authorize_cancel(&swap, swap.receiver_id),
            Err(LifecycleError::NotRequester)
        );

        let swap = sample_swap(SwapStatus::Accepted);
        assert!(matches!(
            authorize_cancel(&swap, swap.requester_id),
            Err(LifecycleError::WrongStatus { .. })
        ));
    }

    #[test]
    fn test_first_confirmation_is_progress() {
        let swap = sample_swap(SwapStatus::Accepted);
        let (side, outcome) = authorize_complete(&swap, swap.requester_id).unwrap();
        assert_eq!(side, Side::Requester);
        assert_eq!(outcome, CompletionOutcome::Progress);
    }

    #[test]
    fn test_second_side_completes() {
        let mut swap = sample_swap(SwapStatus::Accepted);
        swap.requester_completed = true;

        let (side, outcome) = authorize_complete(&swap, swap.receiver_id).unwrap();
        assert_eq!(side, Side::Receiver);
        assert_eq!(outcome, CompletionOutcome::Completed);
    }

    #[test]
    fn test_repeat_confirmation_is_noop() {
        // Repeat while still accepted
        let mut swap = sample_swap(SwapStatus::Accepted);
        swap.requester_completed = true;
        let (_, outcome) = authorize_complete(&swap, swap.requester_id).unwrap();
        assert_eq!(outcome, CompletionOutcome::AlreadyConfirmed);

        // Repeat after full completion
        let mut swap = sample_swap(SwapStatus::Completed);
        swap.requester_completed = true;
        swap.receiver_completed = true;
        for user in [swap.requester_id, swap.receiver_id] {
            let (_, outcome) = authorize_complete(&swap, user).unwrap();
            assert_eq!(outcome, CompletionOutcome::AlreadyConfirmed);
        }
    }

    #[test]
    fn test_complete_rejected_or_pending_is_invalid() {
        for status in [SwapStatus::Pending, SwapStatus::Rejected] {
            let swap = sample_swap(status);
            assert!(matches!(
                authorize_complete(&swap, swap.requester_id),
                Err(LifecycleError::WrongStatus { .. })
            ));
        }
    }

    #[test]
    fn test_schedule_requires_accepted() {
        let swap = sample_swap(SwapStatus::Accepted);
        assert_eq!(
            authorize_schedule(&swap, swap.receiver_id).unwrap(),
            Side::Receiver
        );

        let swap = sample_swap(SwapStatus::Pending);
        assert!(matches!(
            authorize_schedule(&swap, swap.receiver_id),
            Err(LifecycleError::WrongStatus { .. })
        ));
    }

    #[test]
    fn test_view_participants_and_admins_only() {
        let swap = sample_swap(SwapStatus::Pending);
        assert!(authorize_view(&swap, swap.requester_id, false).is_ok());
        assert!(authorize_view(&swap, swap.receiver_id, false).is_ok());
        assert!(authorize_view(&swap, Uuid::new_v4(), true).is_ok());
        assert_eq!(
            authorize_view(&swap, Uuid::new_v4(), false),
            Err(LifecycleError::NotParticipant)
        );
    }

    #[test]
    fn test_lifecycle_errors_map_to_api_errors() {
        let forbidden: ApiError = LifecycleError::NotReceiver.into();
        assert_eq!(forbidden.error_code(), "FORBIDDEN");

        let invalid: ApiError = LifecycleError::WrongStatus {
            expected: "pending",
            actual: "accepted",
        }
        .into();
        assert_eq!(invalid.error_code(), "INVALID_STATE");
    }
}
