use async_trait::async_trait;
use shared::*;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use uuid::Uuid;

use super::{ReservationStore, StoreError, StoreResult, UnknownReplyLog};
use crate::models::{stored_table, DbReservationRow};
use crate::outbox::{EmailJob, EmailOutbox, EmailOutcome};

#[derive(Default)]
pub struct InMemoryStore {
    tables: Mutex<BTreeMap<DateKey, Vec<ReservationRow>>>,
    master: Mutex<Vec<NewReservation>>,
    unknown: Mutex<Vec<UnknownReply>>,
    emails: Mutex<Vec<(EmailJob, Option<EmailOutcome>)>>,
    table_lookups: AtomicUsize,
    fail_reads: AtomicBool,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed(&self, date_key: &str, rows: Vec<ReservationRow>) -> DateKey {
        let key: DateKey = date_key.parse().unwrap();
        let numbered = rows
            .into_iter()
            .enumerate()
            .map(|(i, mut row)| {
                row.row_number = i as u32 + 1;
                row
            })
            .collect();
        self.tables.lock().unwrap().insert(key, numbered);
        key
    }

    pub fn seed_stored(&self, date_key: &str, rows: Vec<DbReservationRow>) -> DateKey {
        let key: DateKey = date_key.parse().unwrap();
        let table = stored_table(key, rows);
        self.tables.lock().unwrap().insert(key, table.rows);
        key
    }

    pub fn rows(&self, date_key: &DateKey) -> Vec<ReservationRow> {
        self.tables
            .lock()
            .unwrap()
            .get(date_key)
            .cloned()
            .unwrap_or_default()
    }

    pub fn unknown_replies(&self) -> Vec<UnknownReply> {
        self.unknown.lock().unwrap().clone()
    }

    pub fn table_lookups(&self) -> usize {
        self.table_lookups.load(Ordering::SeqCst)
    }

    pub fn fail_reads(&self) {
        self.fail_reads.store(true, Ordering::SeqCst);
    }

    pub fn email_jobs(&self) -> Vec<EmailJob> {
        self.emails.lock().unwrap().iter().map(|(job, _)| job.clone()).collect()
    }

    pub fn email_outcome(&self, id: Uuid) -> Option<EmailOutcome> {
        self.emails
            .lock()
            .unwrap()
            .iter()
            .find(|(job, _)| job.id == id)
            .and_then(|(_, outcome)| outcome.clone())
    }

    fn check_reads(&self) -> StoreResult<()> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(StoreError::Pool("connection refused".to_string()));
        }
        Ok(())
    }
}

fn apply(row: &mut ReservationRow, column: Column, value: &str) -> StoreResult<()> {
    match column {
        Column::Name => row.name = value.to_string(),
        Column::Time => row.time = value.to_string(),
        Column::People => row.people = value.to_string(),
        Column::Phone => row.phone = value.to_string(),
        Column::Email => row.email = value.to_string(),
        Column::Date => row.date = value.to_string(),
        Column::DishType => row.dish_type = value.to_string(),
        Column::Notes => row.notes = value.to_string(),
        Column::Status => {
            row.status = value.parse().map_err(|e: DomainError| StoreError::InvalidValue {
                column,
                reason: e.to_string(),
            })?
        }
        Column::SmsReply => row.sms_reply = value.to_string(),
        Column::ConfirmationMethod => row.confirmation_method = value.to_string(),
        Column::ReservationId => return Err(StoreError::ReadOnlyColumn(column)),
    }
    Ok(())
}

#[async_trait]
impl ReservationStore for InMemoryStore {
    async fn get_table(&self, date_key: &DateKey) -> StoreResult<Option<DateTable>> {
        self.table_lookups.fetch_add(1, Ordering::SeqCst);
        self.check_reads()?;
        Ok(self
            .tables
            .lock()
            .unwrap()
            .get(date_key)
            .map(|rows| DateTable {
                key: *date_key,
                rows: rows.clone(),
            }))
    }

    async fn create_table(&self, date_key: &DateKey) -> StoreResult<()> {
        self.tables.lock().unwrap().entry(*date_key).or_default();
        Ok(())
    }

    async fn append_row(&self, date_key: &DateKey, mut row: ReservationRow) -> StoreResult<u32> {
        let mut tables = self.tables.lock().unwrap();
        let rows = tables
            .get_mut(date_key)
            .ok_or(StoreError::TableNotFound(*date_key))?;
        row.row_number = rows.len() as u32 + 1;
        let row_number = row.row_number;
        rows.push(row);
        Ok(row_number)
    }

    async fn find_row_by_column_value(
        &self,
        date_key: &DateKey,
        column: Column,
        value: &str,
    ) -> StoreResult<Option<ReservationRow>> {
        self.check_reads()?;
        Ok(self.tables.lock().unwrap().get(date_key).and_then(|rows| {
            rows.iter().find(|row| row.cell(column) == value).cloned()
        }))
    }

    async fn batch_write_cells(&self, date_key: &DateKey, writes: Vec<CellWrite>) -> StoreResult<()> {
        let mut tables = self.tables.lock().unwrap();
        let rows = tables
            .get_mut(date_key)
            .ok_or(StoreError::TableNotFound(*date_key))?;
        for write in writes {
            let row = rows
                .iter_mut()
                .find(|row| row.row_number == write.row_number)
                .ok_or(StoreError::RowNotFound {
                    date_key: *date_key,
                    row_number: write.row_number,
                })?;
            apply(row, write.column, &write.value)?;
        }
        Ok(())
    }

    async fn update_single_cell(
        &self,
        date_key: &DateKey,
        row_number: u32,
        column: Column,
        value: &str,
    ) -> StoreResult<()> {
        self.batch_write_cells(date_key, vec![CellWrite::new(row_number, column, value)])
            .await
    }

    async fn append_master_row(&self, booking: &NewReservation) -> StoreResult<i64> {
        let mut master = self.master.lock().unwrap();
        master.push(booking.clone());
        Ok(master.len() as i64)
    }
}

#[async_trait]
impl UnknownReplyLog for InMemoryStore {
    async fn append(&self, entry: UnknownReply) -> StoreResult<()> {
        self.unknown.lock().unwrap().push(entry);
        Ok(())
    }
}

#[async_trait]
impl EmailOutbox for InMemoryStore {
    async fn enqueue(&self, job: &EmailJob) -> anyhow::Result<()> {
        self.emails.lock().unwrap().push((job.clone(), None));
        Ok(())
    }

    async fn pending(&self, limit: i64) -> anyhow::Result<Vec<EmailJob>> {
        Ok(self
            .emails
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, outcome)| outcome.is_none())
            .take(limit.max(0) as usize)
            .map(|(job, _)| job.clone())
            .collect())
    }

    async fn mark_processed(&self, id: Uuid, outcome: &EmailOutcome) -> anyhow::Result<()> {
        let mut emails = self.emails.lock().unwrap();
        if let Some(entry) = emails.iter_mut().find(|(job, _)| job.id == id) {
            entry.1 = Some(outcome.clone());
        }
        Ok(())
    }
}
