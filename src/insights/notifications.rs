use serde::Serialize;
use time::OffsetDateTime;
use uuid::Uuid;

use super::score::{round_half_up, sum_savings};
use crate::models::{Expense, Saving};

/// Reminders go out for bills due within this many whole days.
pub const DUE_SOON_WINDOW_DAYS: i64 = 3;

const CURRENCY_SYMBOL: &str = "₹";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Reminder,
    Alert,
    Tip,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Medium,
    High,
}

/// View-computed notification; built fresh on every request.
#[derive(Debug, Clone, Serialize)]
pub struct Notification {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
    pub priority: Priority,
}

impl Notification {
    fn new(
        kind: NotificationKind,
        priority: Priority,
        title: &str,
        message: String,
        now: OffsetDateTime,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            title: title.to_string(),
            message,
            timestamp: now,
            priority,
        }
    }
}

/// Derives notifications for one user's records as of `now`.
///
/// Output order: due-soon reminders, overdue alerts, then at most one
/// savings tip. Reminders and alerts follow the order of `expenses`.
pub fn compute_notifications(
    expenses: &[Expense],
    savings: &[Saving],
    now: OffsetDateTime,
) -> Vec<Notification> {
    let mut out = Vec::new();

    for (expense, days) in expenses.iter().filter_map(|e| days_until_due(e, now)) {
        if days <= DUE_SOON_WINDOW_DAYS {
            out.push(Notification::new(
                NotificationKind::Reminder,
                Priority::Medium,
                "Bill Due Soon",
                format!("{} is due in {} days", expense.description, days),
                now,
            ));
        }
    }

    for expense in expenses.iter().filter(|e| e.is_overdue(now)) {
        let Some(due) = expense.due_date else {
            continue;
        };
        let days = (now - due).whole_days();
        out.push(Notification::new(
            NotificationKind::Alert,
            Priority::High,
            "Overdue Bill",
            format!("{} is overdue by {} days", expense.description, days),
            now,
        ));
    }

    let total_savings = sum_savings(savings);
    if total_savings > 0.0 {
        out.push(Notification::new(
            NotificationKind::Tip,
            Priority::Low,
            "Savings Achievement",
            format!(
                "Great job! You've saved {}{} so far",
                CURRENCY_SYMBOL,
                round_half_up(total_savings)
            ),
            now,
        ));
    }

    out
}

/// Whole days (truncated) until an unpaid bill falls due; `None` when
/// paid, undated or already past due.
fn days_until_due(expense: &Expense, now: OffsetDateTime) -> Option<(&Expense, i64)> {
    if expense.is_paid {
        return None;
    }
    let due = expense.due_date?;
    if due < now {
        return None;
    }
    Some((expense, (due - now).whole_days()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::{macros::datetime, Duration};

    const NOW: OffsetDateTime = datetime!(2024-06-15 12:00 UTC);

    fn bill(description: &str, due: Option<OffsetDateTime>) -> Expense {
        Expense::new(
            Uuid::nil(),
            description.into(),
            100.0,
            "Food".into(),
            due,
            NOW - Duration::days(10),
        )
    }

    fn saving(amount: f64) -> Saving {
        Saving::new(Uuid::nil(), amount, "manual".into(), None, NOW)
    }

    fn kinds(list: &[Notification]) -> Vec<NotificationKind> {
        list.iter().map(|n| n.kind).collect()
    }

    #[test]
    fn due_in_two_days_yields_reminder_and_tip() {
        let expenses = vec![bill("Groceries", Some(NOW + Duration::days(2)))];
        let out = compute_notifications(&expenses, &[saving(50.0)], NOW);

        assert_eq!(kinds(&out), vec![NotificationKind::Reminder, NotificationKind::Tip]);
        assert_eq!(out[0].priority, Priority::Medium);
        assert!(out[0].message.contains("Groceries"));
        assert!(out[0].message.contains("2 days"));
        assert_eq!(out[1].priority, Priority::Low);
        assert!(out[1].message.contains("₹50"));
    }

    #[test]
    fn five_days_overdue_yields_alert_only() {
        let expenses = vec![bill("Groceries", Some(NOW - Duration::days(5)))];
        let out = compute_notifications(&expenses, &[saving(50.0)], NOW);

        assert_eq!(kinds(&out), vec![NotificationKind::Alert, NotificationKind::Tip]);
        assert_eq!(out[0].priority, Priority::High);
        assert!(out[0].message.contains("5 days"));
    }

    #[test]
    fn due_later_today_is_a_zero_day_reminder() {
        let expenses = vec![bill("Phone", Some(NOW + Duration::hours(5)))];
        let out = compute_notifications(&expenses, &[], NOW);
        assert_eq!(kinds(&out), vec![NotificationKind::Reminder]);
        assert!(out[0].message.contains("due in 0 days"));
    }

    #[test]
    fn passed_due_instant_is_overdue_even_within_a_day() {
        let expenses = vec![bill("Phone", Some(NOW - Duration::minutes(1)))];
        let out = compute_notifications(&expenses, &[], NOW);
        assert_eq!(kinds(&out), vec![NotificationKind::Alert]);
        assert!(out[0].message.contains("overdue by 0 days"));
    }

    #[test]
    fn window_edges() {
        let expenses = vec![
            bill("Three", Some(NOW + Duration::days(3) + Duration::hours(23))),
            bill("Four", Some(NOW + Duration::days(4))),
        ];
        let out = compute_notifications(&expenses, &[], NOW);
        assert_eq!(out.len(), 1);
        assert!(out[0].message.starts_with("Three"));
    }

    #[test]
    fn paid_and_undated_bills_are_ignored() {
        let mut paid = bill("Paid", Some(NOW - Duration::days(1)));
        paid.mark_paid(NOW);
        let expenses = vec![paid, bill("Undated", None)];
        assert!(compute_notifications(&expenses, &[], NOW).is_empty());
    }

    #[test]
    fn reminders_precede_alerts_in_input_order() {
        let expenses = vec![
            bill("Late", Some(NOW - Duration::days(2))),
            bill("Soon A", Some(NOW + Duration::days(1))),
            bill("Soon B", Some(NOW + Duration::days(2))),
        ];
        let out = compute_notifications(&expenses, &[], NOW);
        let messages: Vec<_> = out.iter().map(|n| n.message.as_str()).collect();
        assert_eq!(
            messages,
            vec![
                "Soon A is due in 1 days",
                "Soon B is due in 2 days",
                "Late is overdue by 2 days",
            ]
        );
    }

    #[test]
    fn tip_reports_rounded_cumulative_savings() {
        let out = compute_notifications(&[], &[saving(10.25), saving(20.30)], NOW);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].message, "Great job! You've saved ₹31 so far");
    }

    #[test]
    fn each_call_builds_fresh_notifications() {
        let expenses = vec![bill("Rent", Some(NOW + Duration::days(1)))];
        let first = compute_notifications(&expenses, &[], NOW);
        let second = compute_notifications(&expenses, &[], NOW);
        assert_eq!(first.len(), 1);
        assert_eq!(second.len(), 1);
        assert_ne!(first[0].id, second[0].id);
        assert_eq!(first[0].timestamp, NOW);
    }

    #[test]
    fn serializes_kind_as_type() {
        let out = compute_notifications(&[], &[saving(5.0)], NOW);
        let json = serde_json::to_value(&out[0]).unwrap();
        assert_eq!(json["type"], "tip");
        assert_eq!(json["priority"], "low");
    }
}
