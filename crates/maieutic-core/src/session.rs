// Session & phase manager (§4.8). Pure transition helpers; the actual persistence and
// orchestrator routing for `advance_phase` live in `agents::project_manager`.

use chrono::Utc;
use uuid::Uuid;

use maieutic_contracts::error::{CoreError, Result};
use maieutic_contracts::project::Phase;
use maieutic_contracts::session::{Session, SessionMode, SessionStatus};

pub fn new_session(project_id: Uuid, user_id: Uuid, mode: SessionMode) -> Session {
    let now = Utc::now();
    Session {
        id: Uuid::new_v4(),
        project_id,
        user_id,
        mode,
        status: SessionStatus::Active,
        created_at: now,
        updated_at: now,
    }
}

/// Flip between `socratic` and `direct_chat` (§4.8 `toggle_mode`). A session in `ended` state
/// is immutable (invariant 5, §3).
pub fn toggle_mode(session: &Session, new_mode: SessionMode) -> Result<Session> {
    if session.status == SessionStatus::Ended {
        return Err(CoreError::SessionEnded);
    }
    let mut updated = session.clone();
    updated.mode = new_mode;
    updated.updated_at = Utc::now();
    Ok(updated)
}

pub fn pause(session: &Session) -> Result<Session> {
    if session.status == SessionStatus::Ended {
        return Err(CoreError::SessionEnded);
    }
    let mut updated = session.clone();
    updated.status = SessionStatus::Paused;
    updated.updated_at = Utc::now();
    Ok(updated)
}

pub fn resume(session: &Session) -> Result<Session> {
    if session.status == SessionStatus::Ended {
        return Err(CoreError::SessionEnded);
    }
    let mut updated = session.clone();
    updated.status = SessionStatus::Active;
    updated.updated_at = Utc::now();
    Ok(updated)
}

/// Terminal: `ended` has no way back (§3 Lifecycles).
pub fn end(session: &Session) -> Session {
    let mut updated = session.clone();
    updated.status = SessionStatus::Ended;
    updated.updated_at = Utc::now();
    updated
}

/// The fixed sequence is monotone; no regression (§3). Returns `None` at the terminal phase.
pub fn next_phase(current: Phase) -> Option<Phase> {
    current.next()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn toggle_mode_rejects_ended_session() {
        let mut session = new_session(Uuid::new_v4(), Uuid::new_v4(), SessionMode::Socratic);
        session.status = SessionStatus::Ended;
        let err = toggle_mode(&session, SessionMode::DirectChat).unwrap_err();
        assert!(matches!(err, CoreError::SessionEnded));
    }

    #[test]
    fn toggle_mode_preserves_identity_fields() {
        let session = new_session(Uuid::new_v4(), Uuid::new_v4(), SessionMode::Socratic);
        let updated = toggle_mode(&session, SessionMode::DirectChat).unwrap();
        assert_eq!(updated.id, session.id);
        assert_eq!(updated.mode, SessionMode::DirectChat);
    }

    #[test]
    fn phase_sequence_is_monotone_with_no_regression() {
        assert_eq!(next_phase(Phase::Discovery), Some(Phase::Analysis));
        assert_eq!(next_phase(Phase::Analysis), Some(Phase::Design));
        assert_eq!(next_phase(Phase::Design), Some(Phase::Implementation));
        assert_eq!(next_phase(Phase::Implementation), None);
    }
}
