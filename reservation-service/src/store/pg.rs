use async_trait::async_trait;
use bb8::{Pool, PooledConnection};
use chrono::Utc;
use diesel::prelude::*;
use diesel_async::pooled_connection::AsyncDieselConnectionManager;
use diesel_async::{AsyncConnection, AsyncPgConnection, RunQueryDsl};
use shared::{
    CellWrite, Column, DateKey, DateTable, NewReservation, ReservationRow, ReservationStatus,
    UnknownReply,
};
use uuid::Uuid;

use super::{ReservationStore, StoreError, StoreResult, UnknownReplyLog};
use crate::models::*;
use crate::outbox::{EmailJob, EmailOutbox, EmailOutcome};
use crate::schema::*;

pub type DbPool = Pool<AsyncDieselConnectionManager<AsyncPgConnection>>;

#[derive(Clone)]
pub struct PgStore {
    pool: DbPool,
}

impl PgStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub async fn connect(database_url: &str, max_connections: u32) -> anyhow::Result<Self> {
        let config = AsyncDieselConnectionManager::<AsyncPgConnection>::new(database_url);
        let pool = Pool::builder().max_size(max_connections).build(config).await?;
        Ok(Self::new(pool))
    }

    async fn conn(
        &self,
    ) -> StoreResult<PooledConnection<'_, AsyncDieselConnectionManager<AsyncPgConnection>>> {
        self.pool
            .get()
            .await
            .map_err(|e| StoreError::Pool(e.to_string()))
    }
}

fn db_row_number(date_key: &DateKey, row_number: u32) -> StoreResult<i32> {
    i32::try_from(row_number)
        .ok()
        .filter(|n| *n > 0)
        .ok_or(StoreError::RowNotFound {
            date_key: *date_key,
            row_number,
        })
}

async fn write_cell(
    conn: &mut AsyncPgConnection,
    date_key: &DateKey,
    write: &CellWrite,
) -> StoreResult<()> {
    if write.column.is_read_only() {
        return Err(StoreError::ReadOnlyColumn(write.column));
    }
    if write.column == Column::Status {
        write
            .value
            .parse::<ReservationStatus>()
            .map_err(|e| StoreError::InvalidValue {
                column: write.column,
                reason: e.to_string(),
            })?;
    }

    let key = date_key.to_string();
    let row_number = db_row_number(date_key, write.row_number)?;
    let value = write.value.as_str();
    let target = reservation_rows::table
        .filter(reservation_rows::date_key.eq(&key))
        .filter(reservation_rows::row_number.eq(row_number));
    let touched = reservation_rows::updated_at.eq(Utc::now());

    let updated = match write.column {
        Column::Name => {
            diesel::update(target)
                .set((reservation_rows::name.eq(value), touched))
                .execute(conn)
                .await?
        }
        Column::Time => {
            diesel::update(target)
                .set((reservation_rows::time_slot.eq(value), touched))
                .execute(conn)
                .await?
        }
        Column::People => {
            diesel::update(target)
                .set((reservation_rows::people.eq(value), touched))
                .execute(conn)
                .await?
        }
        Column::Phone => {
            diesel::update(target)
                .set((reservation_rows::phone.eq(value), touched))
                .execute(conn)
                .await?
        }
        Column::Email => {
            diesel::update(target)
                .set((reservation_rows::email.eq(value), touched))
                .execute(conn)
                .await?
        }
        Column::Date => {
            diesel::update(target)
                .set((reservation_rows::booking_date.eq(value), touched))
                .execute(conn)
                .await?
        }
        Column::DishType => {
            diesel::update(target)
                .set((reservation_rows::dish_type.eq(value), touched))
                .execute(conn)
                .await?
        }
        Column::Notes => {
            diesel::update(target)
                .set((reservation_rows::notes.eq(value), touched))
                .execute(conn)
                .await?
        }
        Column::Status => {
            diesel::update(target)
                .set((reservation_rows::status.eq(value), touched))
                .execute(conn)
                .await?
        }
        Column::SmsReply => {
            diesel::update(target)
                .set((reservation_rows::sms_reply.eq(value), touched))
                .execute(conn)
                .await?
        }
        Column::ConfirmationMethod => {
            diesel::update(target)
                .set((reservation_rows::confirmation_method.eq(value), touched))
                .execute(conn)
                .await?
        }
        Column::ReservationId => return Err(StoreError::ReadOnlyColumn(write.column)),
    };

    if updated == 0 {
        return Err(StoreError::RowNotFound {
            date_key: *date_key,
            row_number: write.row_number,
        });
    }
    Ok(())
}

#[async_trait]
impl ReservationStore for PgStore {
    async fn get_table(&self, date_key: &DateKey) -> StoreResult<Option<DateTable>> {
        let mut conn = self.conn().await?;
        let key = date_key.to_string();

        let exists = date_tables::table
            .find(&key)
            .select(date_tables::date_key)
            .first::<String>(&mut conn)
            .await
            .optional()?;
        if exists.is_none() {
            return Ok(None);
        }

        let db_rows = reservation_rows::table
            .filter(reservation_rows::date_key.eq(&key))
            .order(reservation_rows::row_number.asc())
            .load::<DbReservationRow>(&mut conn)
            .await?;

        Ok(Some(stored_table(*date_key, db_rows)))
    }

    async fn create_table(&self, date_key: &DateKey) -> StoreResult<()> {
        let mut conn = self.conn().await?;
        diesel::insert_into(date_tables::table)
            .values(&NewDateTable {
                date_key: date_key.to_string(),
            })
            .on_conflict_do_nothing()
            .execute(&mut conn)
            .await?;
        Ok(())
    }

    async fn append_row(&self, date_key: &DateKey, row: ReservationRow) -> StoreResult<u32> {
        let mut conn = self.conn().await?;
        let table_key = *date_key;

        let row_number = conn
            .transaction::<_, StoreError, _>(|conn| {
                Box::pin(async move {
                    let key = table_key.to_string();

                    // Serializes appends to the same date table.
                    let locked = date_tables::table
                        .find(&key)
                        .select(date_tables::date_key)
                        .for_update()
                        .first::<String>(conn)
                        .await
                        .optional()?;
                    if locked.is_none() {
                        return Err(StoreError::TableNotFound(table_key));
                    }

                    let last = reservation_rows::table
                        .filter(reservation_rows::date_key.eq(&key))
                        .select(diesel::dsl::max(reservation_rows::row_number))
                        .first::<Option<i32>>(conn)
                        .await?;
                    let row_number = last.unwrap_or(0) + 1;

                    diesel::insert_into(reservation_rows::table)
                        .values(&DbReservationRow::new(&table_key, row_number, row))
                        .execute(conn)
                        .await?;

                    Ok(row_number)
                })
            })
            .await?;

        u32::try_from(row_number).map_err(|_| StoreError::MalformedRow {
            date_key: date_key.to_string(),
            row_number,
            reason: "row number out of range".to_string(),
        })
    }

    async fn find_row_by_column_value(
        &self,
        date_key: &DateKey,
        column: Column,
        value: &str,
    ) -> StoreResult<Option<ReservationRow>> {
        let mut conn = self.conn().await?;
        let key = date_key.to_string();

        let base = reservation_rows::table
            .filter(reservation_rows::date_key.eq(&key))
            .order(reservation_rows::row_number.asc())
            .into_boxed();

        let query = match column {
            Column::Name => base.filter(reservation_rows::name.eq(value)),
            Column::Time => base.filter(reservation_rows::time_slot.eq(value)),
            Column::People => base.filter(reservation_rows::people.eq(value)),
            Column::Phone => base.filter(reservation_rows::phone.eq(value)),
            Column::Email => base.filter(reservation_rows::email.eq(value)),
            Column::Date => base.filter(reservation_rows::booking_date.eq(value)),
            Column::DishType => base.filter(reservation_rows::dish_type.eq(value)),
            Column::Notes => base.filter(reservation_rows::notes.eq(value)),
            Column::Status => base.filter(reservation_rows::status.eq(value)),
            Column::SmsReply => base.filter(reservation_rows::sms_reply.eq(value)),
            Column::ConfirmationMethod => {
                base.filter(reservation_rows::confirmation_method.eq(value))
            }
            Column::ReservationId => match value.trim().parse::<i64>() {
                Ok(id) => base.filter(reservation_rows::reservation_id.eq(id)),
                Err(_) => return Ok(None),
            },
        };

        let found = query
            .first::<DbReservationRow>(&mut conn)
            .await
            .optional()?;
        found.map(ReservationRow::try_from).transpose()
    }

    async fn batch_write_cells(&self, date_key: &DateKey, writes: Vec<CellWrite>) -> StoreResult<()> {
        if writes.is_empty() {
            return Ok(());
        }
        let mut conn = self.conn().await?;
        let table_key = *date_key;

        conn.transaction::<_, StoreError, _>(|conn| {
            Box::pin(async move {
                for write in &writes {
                    write_cell(conn, &table_key, write).await?;
                }
                Ok(())
            })
        })
        .await
    }

    async fn update_single_cell(
        &self,
        date_key: &DateKey,
        row_number: u32,
        column: Column,
        value: &str,
    ) -> StoreResult<()> {
        let mut conn = self.conn().await?;
        write_cell(&mut conn, date_key, &CellWrite::new(row_number, column, value)).await
    }

    async fn append_master_row(&self, booking: &NewReservation) -> StoreResult<i64> {
        let mut conn = self.conn().await?;
        let reservation_id = diesel::insert_into(master_reservations::table)
            .values(&NewMasterReservation::from(booking))
            .returning(master_reservations::reservation_id)
            .get_result::<i64>(&mut conn)
            .await?;
        Ok(reservation_id)
    }
}

#[async_trait]
impl UnknownReplyLog for PgStore {
    async fn append(&self, entry: UnknownReply) -> StoreResult<()> {
        let mut conn = self.conn().await?;
        diesel::insert_into(unknown_replies::table)
            .values(&NewUnknownReply {
                id: Uuid::new_v4(),
                logged_at: Utc::now(),
                phone: entry.phone,
                message: entry.message,
                received_at: entry.received_at,
                status: entry.status,
            })
            .execute(&mut conn)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl EmailOutbox for PgStore {
    async fn enqueue(&self, job: &EmailJob) -> anyhow::Result<()> {
        let mut conn = self.conn().await?;
        diesel::insert_into(email_outbox::table)
            .values(&DbEmailJob::from(job))
            .execute(&mut conn)
            .await?;
        Ok(())
    }

    async fn pending(&self, limit: i64) -> anyhow::Result<Vec<EmailJob>> {
        let mut conn = self.conn().await?;
        let jobs = email_outbox::table
            .filter(email_outbox::state.eq("pending"))
            .order(email_outbox::created_at.asc())
            .limit(limit)
            .load::<DbEmailJob>(&mut conn)
            .await?;
        Ok(jobs.into_iter().map(EmailJob::from).collect())
    }

    async fn mark_processed(&self, id: Uuid, outcome: &EmailOutcome) -> anyhow::Result<()> {
        let mut conn = self.conn().await?;
        diesel::update(email_outbox::table.filter(email_outbox::id.eq(id)))
            .set((
                email_outbox::state.eq(outcome.state()),
                email_outbox::last_error.eq(outcome.error()),
                email_outbox::processed_at.eq(Utc::now()),
            ))
            .execute(&mut conn)
            .await?;
        Ok(())
    }
}
