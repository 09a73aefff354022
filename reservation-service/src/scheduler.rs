use chrono::{DateTime, Duration as ChronoDuration, FixedOffset, NaiveTime, TimeZone, Utc};
use shared::*;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::time;
use tracing::{error, info, warn};

use crate::gateway::NotificationGateway;
use crate::store::{ReservationStore, StoreError};

const KEEP_ALIVE_INTERVAL: Duration = Duration::from_secs(10 * 60);
const KEEP_ALIVE_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReminderSummary {
    NoReservations(DateKey),
    Completed {
        date_key: DateKey,
        sent: usize,
        failed: usize,
    },
    Failed {
        date_key: DateKey,
        error: String,
    },
}

impl fmt::Display for ReminderSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReminderSummary::NoReservations(date_key) => {
                write!(f, "No reservations found for {}", date_key)
            }
            ReminderSummary::Completed {
                date_key,
                sent,
                failed,
            } => write!(
                f,
                "SMS Summary for {}: {} sent successfully, {} failed",
                date_key, sent, failed
            ),
            ReminderSummary::Failed { date_key, error } => {
                write!(f, "Error sending SMS for {}: {}", date_key, error)
            }
        }
    }
}

/// Sending never changes a row's status, so rows still `Pending` are sent to again on every run.
pub struct ReminderScheduler {
    store: Arc<dyn ReservationStore>,
    gateway: Arc<dyn NotificationGateway>,
    venue: Venue,
    reference_offset: FixedOffset,
}

impl ReminderScheduler {
    pub fn new(
        store: Arc<dyn ReservationStore>,
        gateway: Arc<dyn NotificationGateway>,
        venue: Venue,
        reference_offset: FixedOffset,
    ) -> Self {
        Self {
            store,
            gateway,
            venue,
            reference_offset,
        }
    }

    pub fn now(&self) -> DateTime<FixedOffset> {
        Utc::now().with_timezone(&self.reference_offset)
    }

    pub async fn run_cohort(&self, cohort: Cohort) -> ReminderSummary {
        let now = self.now();
        let today = DateKey::new(now.date_naive());
        match cohort.target_date(today) {
            Some(date_key) => self.send_for_date(cohort, date_key, now).await,
            None => ReminderSummary::Failed {
                date_key: today,
                error: "target date out of range".to_string(),
            },
        }
    }

    pub async fn send_for_date(
        &self,
        cohort: Cohort,
        date_key: DateKey,
        now: DateTime<FixedOffset>,
    ) -> ReminderSummary {
        let summary = match self.try_send_for_date(cohort, date_key, now).await {
            Ok(summary) => summary,
            Err(e) => {
                error!("Error sending {} SMS for {}: {}", cohort, date_key, e);
                ReminderSummary::Failed {
                    date_key,
                    error: e.to_string(),
                }
            }
        };
        info!("{} reminder run: {}", cohort, summary);
        summary
    }

    async fn try_send_for_date(
        &self,
        cohort: Cohort,
        date_key: DateKey,
        now: DateTime<FixedOffset>,
    ) -> Result<ReminderSummary, StoreError> {
        let table = match self.store.get_table(&date_key).await? {
            Some(table) => table,
            None => return Ok(ReminderSummary::NoReservations(date_key)),
        };

        let clock = now.format("%H:%M").to_string();
        let correlation_ref = cohort.correlation_ref(now.timestamp());
        let mut sent = 0;
        let mut failed = 0;
        let mut audit_writes = Vec::new();

        for row in table.pending_with_phone() {
            let text = reminder_sms(row, cohort, &self.venue);
            let delivered = match self.gateway.send_sms(&row.phone, &text, &correlation_ref).await {
                Ok(_) => {
                    info!("{} SMS sent to {} (row {})", cohort, row.name, row.row_number);
                    sent += 1;
                    true
                }
                Err(e) => {
                    warn!("{} SMS to {} (row {}) failed: {}", cohort, row.name, row.row_number, e);
                    failed += 1;
                    false
                }
            };

            let note = cohort.audit_note(delivered, &clock);
            let audit = if row.sms_reply.trim().is_empty() {
                note
            } else {
                format!("{}; {}", row.sms_reply, note)
            };
            audit_writes.push(CellWrite::new(row.row_number, Column::SmsReply, audit));
        }

        if !audit_writes.is_empty() {
            if let Err(e) = self.store.batch_write_cells(&date_key, audit_writes).await {
                error!("Failed to record reminder audit notes for {}: {}", date_key, e);
            }
        }

        Ok(ReminderSummary::Completed {
            date_key,
            sent,
            failed,
        })
    }

    pub async fn run_daily(self: Arc<Self>, cohort: Cohort, at: NaiveTime) {
        let mut last_fire = None;
        loop {
            let now = self.now();
            let next = following_fire(now, last_fire, at);
            info!("Next automatic {} reminder run at {}", cohort, next);
            time::sleep((next - now).to_std().unwrap_or_default()).await;
            last_fire = Some(next);

            let summary = self.run_cohort(cohort).await;
            info!("Automatic {} SMS job completed: {}", cohort, summary);
        }
    }
}

pub fn next_fire(now: DateTime<FixedOffset>, at: NaiveTime) -> DateTime<FixedOffset> {
    let today_at = now.date_naive().and_time(at);
    let candidate = if today_at > now.naive_local() {
        today_at
    } else {
        today_at + ChronoDuration::days(1)
    };
    now.timezone()
        .from_local_datetime(&candidate)
        .single()
        .unwrap_or(now + ChronoDuration::days(1))
}

/// Next fire strictly after both `now` and the previous fire.
pub fn following_fire(
    now: DateTime<FixedOffset>,
    last_fire: Option<DateTime<FixedOffset>>,
    at: NaiveTime,
) -> DateTime<FixedOffset> {
    let from = match last_fire {
        Some(last) if last > now => last,
        _ => now,
    };
    next_fire(from, at)
}

pub async fn keep_alive(base_url: String) {
    let client = match reqwest::Client::builder().timeout(KEEP_ALIVE_TIMEOUT).build() {
        Ok(client) => client,
        Err(e) => {
            error!("Keep-alive disabled: {}", e);
            return;
        }
    };
    let url = format!("{}/health", base_url.trim_end_matches('/'));
    let mut interval = time::interval(KEEP_ALIVE_INTERVAL);

    loop {
        interval.tick().await;
        match client.get(&url).send().await {
            Ok(response) if response.status().is_success() => info!("Keep-alive ping sent"),
            Ok(response) => warn!("Keep-alive ping returned {}", response.status()),
            Err(e) => warn!("Keep-alive ping failed: {}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::recording::RecordingGateway;
    use crate::models::DbReservationRow;
    use crate::store::memory::InMemoryStore;

    fn row(name: &str, phone: &str, status: ReservationStatus) -> ReservationRow {
        ReservationRow {
            row_number: 0,
            name: name.to_string(),
            time: "18:30".to_string(),
            people: "2".to_string(),
            phone: phone.to_string(),
            email: String::new(),
            date: "2024-09-30".to_string(),
            dish_type: String::new(),
            notes: String::new(),
            status,
            reservation_id: None,
            sms_reply: String::new(),
            confirmation_method: String::new(),
        }
    }

    fn at(raw: &str) -> DateTime<FixedOffset> {
        DateTime::parse_from_rfc3339(raw).unwrap()
    }

    fn scheduler(store: &Arc<InMemoryStore>, gateway: &Arc<RecordingGateway>) -> ReminderScheduler {
        ReminderScheduler::new(
            store.clone(),
            gateway.clone(),
            Venue::default(),
            FixedOffset::east_opt(0).unwrap(),
        )
    }

    fn three_pending(store: &InMemoryStore) -> DateKey {
        store.seed(
            "2024-09-30",
            vec![
                row("Ada", "61412345678", ReservationStatus::Pending),
                row("Walk-in", "", ReservationStatus::Pending),
                row("Grace", "61498765432", ReservationStatus::Pending),
            ],
        )
    }

    #[tokio::test]
    async fn sends_to_pending_rows_with_phone_only() {
        let store = Arc::new(InMemoryStore::new());
        let gateway = Arc::new(RecordingGateway::new());
        let key = three_pending(&store);

        let summary = scheduler(&store, &gateway)
            .send_for_date(Cohort::DayOf, key, at("2024-09-30T08:45:00Z"))
            .await;

        assert_eq!(summary, ReminderSummary::Completed { date_key: key, sent: 2, failed: 0 });
        assert_eq!(
            summary.to_string(),
            "SMS Summary for 2024-09-30: 2 sent successfully, 0 failed"
        );

        let sent = gateway.sms();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0].to, "61412345678");
        assert_eq!(sent[1].to, "61498765432");
        assert!(sent[0].correlation_ref.starts_with("day_of_"));
        assert!(sent[0].text.contains("Hi Ada!"));

        let rows = store.rows(&key);
        assert_eq!(rows[0].sms_reply, "day_of SMS sent 08:45");
        assert_eq!(rows[1], row_numbered(row("Walk-in", "", ReservationStatus::Pending), 2));
        assert_eq!(rows[2].sms_reply, "day_of SMS sent 08:45");
        assert!(rows.iter().all(|r| r.status == ReservationStatus::Pending));
    }

    fn row_numbered(mut r: ReservationRow, n: u32) -> ReservationRow {
        r.row_number = n;
        r
    }

    #[tokio::test]
    async fn rerun_resends_to_rows_still_pending() {
        let store = Arc::new(InMemoryStore::new());
        let gateway = Arc::new(RecordingGateway::new());
        let key = three_pending(&store);
        let scheduler = scheduler(&store, &gateway);

        scheduler
            .send_for_date(Cohort::DayBefore, key, at("2024-09-29T17:00:00Z"))
            .await;
        scheduler
            .send_for_date(Cohort::DayBefore, key, at("2024-09-29T17:05:00Z"))
            .await;

        assert_eq!(gateway.sms().len(), 4);
        assert_eq!(
            store.rows(&key)[0].sms_reply,
            "day_before SMS sent 17:00; day_before SMS sent 17:05"
        );
    }

    #[tokio::test]
    async fn malformed_stored_rows_are_not_sent_to() {
        let store = Arc::new(InMemoryStore::new());
        let gateway = Arc::new(RecordingGateway::new());
        let key: DateKey = "2024-09-30".parse().unwrap();
        let mut broken = DbReservationRow::new(&key, 2, row("Broken", "61400000002", ReservationStatus::Pending));
        broken.status = "Maybe".to_string();
        store.seed_stored(
            "2024-09-30",
            vec![
                DbReservationRow::new(&key, 1, row("Ada", "61412345678", ReservationStatus::Pending)),
                broken,
                DbReservationRow::new(&key, 3, row("Grace", "61498765432", ReservationStatus::Pending)),
            ],
        );

        let summary = scheduler(&store, &gateway)
            .send_for_date(Cohort::DayOf, key, at("2024-09-30T08:45:00Z"))
            .await;

        assert_eq!(summary, ReminderSummary::Completed { date_key: key, sent: 2, failed: 0 });
        let recipients: Vec<String> = gateway.sms().into_iter().map(|sms| sms.to).collect();
        assert_eq!(recipients, ["61412345678", "61498765432"]);
    }

    #[tokio::test]
    async fn settled_rows_are_skipped() {
        let store = Arc::new(InMemoryStore::new());
        let gateway = Arc::new(RecordingGateway::new());
        let key = store.seed(
            "2024-09-30",
            vec![
                row("Ada", "61412345678", ReservationStatus::Confirmed),
                row("Grace", "61498765432", ReservationStatus::Cancelled),
                row("Linus", "61400000001", ReservationStatus::NeedsReview("late".to_string())),
            ],
        );

        let summary = scheduler(&store, &gateway)
            .send_for_date(Cohort::DayOf, key, at("2024-09-30T08:45:00Z"))
            .await;

        assert_eq!(summary, ReminderSummary::Completed { date_key: key, sent: 0, failed: 0 });
        assert!(gateway.sms().is_empty());
    }

    #[tokio::test]
    async fn failed_sends_are_counted_and_noted() {
        let store = Arc::new(InMemoryStore::new());
        let gateway = Arc::new(RecordingGateway::failing_for(&["61498765432"]));
        let key = three_pending(&store);

        let summary = scheduler(&store, &gateway)
            .send_for_date(Cohort::DayOf, key, at("2024-09-30T08:45:00Z"))
            .await;

        assert_eq!(summary, ReminderSummary::Completed { date_key: key, sent: 1, failed: 1 });
        assert_eq!(store.rows(&key)[2].sms_reply, "day_of SMS failed 08:45");
    }

    #[tokio::test]
    async fn missing_table_reports_no_reservations() {
        let store = Arc::new(InMemoryStore::new());
        let gateway = Arc::new(RecordingGateway::new());
        let key: DateKey = "2024-09-30".parse().unwrap();

        let summary = scheduler(&store, &gateway)
            .send_for_date(Cohort::DayOf, key, at("2024-09-30T08:45:00Z"))
            .await;

        assert_eq!(summary.to_string(), "No reservations found for 2024-09-30");
        assert!(gateway.sms().is_empty());
    }

    #[tokio::test]
    async fn store_failure_degrades_to_error_summary() {
        let store = Arc::new(InMemoryStore::new());
        let gateway = Arc::new(RecordingGateway::new());
        let key = three_pending(&store);
        store.fail_reads();

        let summary = scheduler(&store, &gateway)
            .send_for_date(Cohort::DayOf, key, at("2024-09-30T08:45:00Z"))
            .await;

        assert!(summary.to_string().starts_with("Error sending SMS for 2024-09-30"));
        assert!(gateway.sms().is_empty());
    }

    #[test]
    fn early_wake_does_not_fire_twice_in_one_day() {
        let at_0845 = NaiveTime::from_hms_opt(8, 45, 0).unwrap();
        let fired = at("2024-09-30T08:45:00Z");

        assert_eq!(following_fire(at("2024-09-30T07:00:00Z"), None, at_0845), fired);
        assert_eq!(
            following_fire(at("2024-09-30T08:44:59Z"), Some(fired), at_0845),
            at("2024-10-01T08:45:00Z")
        );
        assert_eq!(
            following_fire(at("2024-09-30T08:46:10Z"), Some(fired), at_0845),
            at("2024-10-01T08:45:00Z")
        );
    }

    #[test]
    fn next_fire_is_later_today_or_tomorrow() {
        let at_0845 = NaiveTime::from_hms_opt(8, 45, 0).unwrap();
        assert_eq!(
            next_fire(at("2024-09-30T07:00:00+10:00"), at_0845),
            at("2024-09-30T08:45:00+10:00")
        );
        assert_eq!(
            next_fire(at("2024-09-30T08:45:00+10:00"), at_0845),
            at("2024-10-01T08:45:00+10:00")
        );
        assert_eq!(
            next_fire(at("2024-12-31T23:00:00Z"), at_0845),
            at("2025-01-01T08:45:00Z")
        );
    }
}
