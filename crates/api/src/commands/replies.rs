//! User-facing reply texts for engine errors.
//!
//! The conversation flow shows exactly one sentence per failure; internal
//! detail stays in the logs.

use slotwise_domain::SchedulingError;

/// Map an error to the sentence the client sees in chat.
pub fn reply_for_error(error: &SchedulingError) -> String {
    match error {
        SchedulingError::UnknownService(name) => {
            format!("We don't offer \"{name}\". Send /services to see the menu.")
        }
        SchedulingError::NoAvailability => {
            "No free slots in that period, sorry. Try different dates.".into()
        }
        SchedulingError::SlotTaken => {
            "That time was just taken. Let's look for another slot.".into()
        }
        SchedulingError::CalendarUnavailable(_) | SchedulingError::Network(_) => {
            "Our calendar is not responding right now. Please try again in a minute.".into()
        }
        SchedulingError::VersionConflict { .. } => {
            "This booking was changed from another chat. Check /mybookings for its current state."
                .into()
        }
        SchedulingError::NotFound(_) => "I couldn't find that booking.".into(),
        SchedulingError::InvalidTransition { from, .. } => {
            format!("This booking is already {from}, so that action isn't possible.")
        }
        SchedulingError::CalendarRejected(_)
        | SchedulingError::Database(_)
        | SchedulingError::Config(_) => {
            "Something went wrong on our side. The salon has been notified.".into()
        }
    }
}

#[cfg(test)]
mod tests {
    use slotwise_domain::BookingStatus;

    use super::*;

    #[test]
    fn every_error_has_a_human_sentence() {
        let errors = [
            SchedulingError::UnknownService("massage".into()),
            SchedulingError::NoAvailability,
            SchedulingError::SlotTaken,
            SchedulingError::CalendarUnavailable("timeout".into()),
            SchedulingError::CalendarRejected("403".into()),
            SchedulingError::VersionConflict { expected: 1, stored: 2 },
            SchedulingError::NotFound("x".into()),
            SchedulingError::InvalidTransition {
                from: BookingStatus::Cancelled,
                to: BookingStatus::Confirmed,
            },
            SchedulingError::Database("locked".into()),
            SchedulingError::Config("bad tz".into()),
            SchedulingError::Network("reset".into()),
        ];
        for error in errors {
            let reply = reply_for_error(&error);
            assert!(!reply.is_empty());
            // Internal identifiers never leak into chat.
            assert!(!reply.contains("sqlite"));
        }
    }

    #[test]
    fn invalid_transition_names_the_current_state() {
        let reply = reply_for_error(&SchedulingError::InvalidTransition {
            from: BookingStatus::Expired,
            to: BookingStatus::Confirmed,
        });
        assert!(reply.contains("expired"));
    }
}
