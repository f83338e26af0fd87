use log::debug;

use crate::diagnostics::SessionReport;
use crate::models::{ButtonPress, EndedSession};

/// Outcome of analyzing one closed session: at most one press event, plus a
/// diagnostic report for every session that held readings.
#[derive(Debug)]
pub struct SessionVerdict {
    pub press: Option<ButtonPress>,
    pub report: Option<SessionReport>,
}

/// Validate a closed session and derive the discrete press event.
///
/// The report is produced even for discarded sessions; it is observability
/// only and can neither block nor fail the press event.
pub fn analyze(ended: EndedSession, min_session_duration_ms: u64) -> SessionVerdict {
    if ended.readings.is_empty() {
        debug!("discarding session with no readings");
        return SessionVerdict {
            press: None,
            report: None,
        };
    }

    let duration_ms = ended.duration_ms();
    let press = if duration_ms < min_session_duration_ms {
        debug!(
            "discarding session: duration {}ms below minimum {}ms",
            duration_ms, min_session_duration_ms
        );
        None
    } else {
        match ended.button {
            Some(button) => Some(ButtonPress { button }),
            None => {
                debug!("discarding session without an attributed button");
                None
            }
        }
    };

    let report = Some(SessionReport::from_session(ended));

    SessionVerdict { press, report }
}
