pub mod pg;

#[cfg(test)]
pub mod memory;

use async_trait::async_trait;
use shared::*;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("date table {0} does not exist")]
    TableNotFound(DateKey),

    #[error("row {row_number} not found in date table {date_key}")]
    RowNotFound { date_key: DateKey, row_number: u32 },

    #[error("column {0} cannot be rewritten")]
    ReadOnlyColumn(Column),

    #[error("invalid value for column {column}: {reason}")]
    InvalidValue { column: Column, reason: String },

    #[error("malformed row {row_number} in date table {date_key}: {reason}")]
    MalformedRow {
        date_key: String,
        row_number: i32,
        reason: String,
    },

    #[error("database error: {0}")]
    Database(#[from] diesel::result::Error),

    #[error("connection pool error: {0}")]
    Pool(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait ReservationStore: Send + Sync {
    /// Rows of the date table in table order, or `None` if the table was never created.
    async fn get_table(&self, date_key: &DateKey) -> StoreResult<Option<DateTable>>;

    async fn create_table(&self, date_key: &DateKey) -> StoreResult<()>;

    async fn append_row(&self, date_key: &DateKey, row: ReservationRow) -> StoreResult<u32>;

    /// First row in table order whose cell equals `value` exactly.
    async fn find_row_by_column_value(
        &self,
        date_key: &DateKey,
        column: Column,
        value: &str,
    ) -> StoreResult<Option<ReservationRow>>;

    async fn batch_write_cells(&self, date_key: &DateKey, writes: Vec<CellWrite>) -> StoreResult<()>;

    async fn update_single_cell(
        &self,
        date_key: &DateKey,
        row_number: u32,
        column: Column,
        value: &str,
    ) -> StoreResult<()>;

    async fn append_master_row(&self, booking: &NewReservation) -> StoreResult<i64>;
}

#[async_trait]
pub trait UnknownReplyLog: Send + Sync {
    async fn append(&self, entry: UnknownReply) -> StoreResult<()>;
}
