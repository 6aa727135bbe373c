//! Campaign and phase state machines (spec.md §4.5, §3). Transitions are
//! the only way state changes; anything not in the table fails with
//! `invalid_state`.

use crate::error::{CoreError, CoreResult};
use crate::models::CampaignStatus;

/// Validates a campaign transition against the abridged table in
/// spec.md §4.5. `requires_approval` selects which edge leaves `draft`.
pub fn validate_campaign_transition(
    from: CampaignStatus,
    to: CampaignStatus,
    requires_approval: bool,
) -> CoreResult<()> {
    use CampaignStatus::*;

    let allowed = match from {
        Draft => {
            if requires_approval {
                matches!(to, PendingApproval)
            } else {
                matches!(to, Approved)
            }
        }
        PendingApproval => matches!(to, Approved | Cancelled),
        Approved => matches!(to, Scheduled | InProgress),
        Scheduled => matches!(to, InProgress | Cancelled),
        InProgress => matches!(to, Paused | Completed | Failed | RolledBack),
        Paused => matches!(to, InProgress | Cancelled),
        Completed | Failed | RolledBack | Cancelled => false,
    };

    if allowed {
        Ok(())
    } else {
        Err(CoreError::InvalidState(format!("cannot transition campaign from {from:?} to {to:?}")))
    }
}

/// Idempotency helper for spec.md §4.5's `start/pause/resume/cancel/approve`:
/// re-issuing a command already satisfied by the current state is a
/// no-op success rather than an error.
pub fn is_idempotent_noop(from: CampaignStatus, to: CampaignStatus) -> bool {
    from == to
}

#[cfg(test)]
mod tests {
    use super::*;
    use CampaignStatus::*;

    #[test]
    fn draft_requires_approval_goes_to_pending_approval() {
        assert!(validate_campaign_transition(Draft, PendingApproval, true).is_ok());
        assert!(validate_campaign_transition(Draft, Approved, true).is_err());
    }

    #[test]
    fn draft_without_approval_goes_straight_to_approved() {
        assert!(validate_campaign_transition(Draft, Approved, false).is_ok());
    }

    #[test]
    fn in_progress_can_pause_and_resume() {
        assert!(validate_campaign_transition(InProgress, Paused, false).is_ok());
        assert!(validate_campaign_transition(Paused, InProgress, false).is_ok());
    }

    #[test]
    fn terminal_states_accept_no_transitions() {
        assert!(validate_campaign_transition(Completed, InProgress, false).is_err());
        assert!(validate_campaign_transition(RolledBack, Cancelled, false).is_err());
    }

    #[test]
    fn repeating_the_current_state_is_idempotent() {
        assert!(is_idempotent_noop(Approved, Approved));
        assert!(!is_idempotent_noop(Approved, Scheduled));
    }
}
