//! Timing figures for activities, tasks and support tickets.

use chrono::{DateTime, Utc};

use super::minutes_between;
use crate::models::{Activity, ActivityStatus, Task, Ticket};

impl Activity {
    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        matches!(self.status, ActivityStatus::Planned | ActivityStatus::InProgress)
            && self.scheduled_at.is_some_and(|at| now > at)
    }

    /// Minutes from start to completion, once both are known.
    pub fn calculate_duration(&mut self) -> Option<i32> {
        if let (Some(started), Some(completed)) = (self.started_at, self.completed_at) {
            self.duration_minutes = Some(minutes_between(started, completed));
        }
        self.duration_minutes
    }

    pub fn mark_completed(&mut self, now: DateTime<Utc>, outcome: Option<String>) {
        self.status = ActivityStatus::Completed;
        self.completed_at = Some(now);
        if let Some(outcome) = outcome.filter(|o| !o.is_empty()) {
            self.outcome = Some(outcome);
        }
        self.calculate_duration();
    }
}

impl Task {
    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        self.status != ActivityStatus::Completed && self.due_date.is_some_and(|due| now > due)
    }

    pub fn mark_completed(&mut self, now: DateTime<Utc>) {
        self.status = ActivityStatus::Completed;
        self.completed_at = Some(now);
        self.progress_percent = 100;
    }
}

impl Ticket {
    pub fn calculate_resolution_time(&mut self) -> Option<i32> {
        if let Some(resolved) = self.resolved_at {
            self.resolution_time_minutes = Some(minutes_between(self.created_at, resolved));
        }
        self.resolution_time_minutes
    }

    pub fn calculate_first_response_time(&mut self) -> Option<i32> {
        if let Some(responded) = self.first_response_at {
            self.first_response_time_minutes = Some(minutes_between(self.created_at, responded));
        }
        self.first_response_time_minutes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ActivityType;
    use chrono::Duration;

    #[test]
    fn completing_an_activity_records_duration_and_outcome() {
        let now = Utc::now();
        let mut call = Activity::new("Discovery call", ActivityType::Call, now);
        call.started_at = Some(now - Duration::minutes(45) - Duration::seconds(30));

        call.mark_completed(now, Some("Booked demo".into()));
        assert_eq!(call.status, ActivityStatus::Completed);
        assert_eq!(call.duration_minutes, Some(45));
        assert_eq!(call.outcome.as_deref(), Some("Booked demo"));
    }

    #[test]
    fn completing_without_start_leaves_duration_unset() {
        let now = Utc::now();
        let mut note = Activity::new("Note", ActivityType::Note, now);
        note.outcome = Some("kept".into());
        note.mark_completed(now, None);
        assert_eq!(note.duration_minutes, None);
        assert_eq!(note.outcome.as_deref(), Some("kept"));
    }

    #[test]
    fn activity_overdue_only_before_completion() {
        let now = Utc::now();
        let mut meeting = Activity::new("QBR", ActivityType::Meeting, now);
        assert!(!meeting.is_overdue(now));
        meeting.scheduled_at = Some(now - Duration::hours(1));
        assert!(meeting.is_overdue(now));
        meeting.status = ActivityStatus::Cancelled;
        assert!(!meeting.is_overdue(now));
    }

    #[test]
    fn task_completion_sets_progress() {
        let now = Utc::now();
        let mut task = Task::new("Send contract", now);
        task.due_date = Some(now - Duration::days(2));
        assert!(task.is_overdue(now));

        task.mark_completed(now);
        assert_eq!(task.progress_percent, 100);
        assert_eq!(task.completed_at, Some(now));
        assert!(!task.is_overdue(now));
    }

    #[test]
    fn ticket_times_measure_from_creation() {
        let opened = Utc::now();
        let mut ticket = Ticket::new("T-1", "Login broken", opened);
        assert_eq!(ticket.calculate_first_response_time(), None);

        ticket.first_response_at = Some(opened + Duration::minutes(12));
        ticket.resolved_at = Some(opened + Duration::hours(26));
        assert_eq!(ticket.calculate_first_response_time(), Some(12));
        assert_eq!(ticket.calculate_resolution_time(), Some(26 * 60));
    }
}
