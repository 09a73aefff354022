use chrono::FixedOffset;
use shared::*;
use std::fmt;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::store::{ReservationStore, StoreError, UnknownReplyLog};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhoneMatching {
    Normalized,
    LegacyRaw,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnmatchedReason {
    EmptyMessage,
    UnparsableTimestamp,
    NoDateTable(DateKey),
    NoMatchingRow(DateKey),
    StoreFailure(String),
}

impl fmt::Display for UnmatchedReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnmatchedReason::EmptyMessage => write!(f, "reply has no message text"),
            UnmatchedReason::UnparsableTimestamp => write!(f, "could not determine reservation date"),
            UnmatchedReason::NoDateTable(key) => write!(f, "no date table for {}", key),
            UnmatchedReason::NoMatchingRow(key) => write!(f, "no reservation with this phone on {}", key),
            UnmatchedReason::StoreFailure(e) => write!(f, "store failure: {}", e),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileOutcome {
    Matched {
        date_key: DateKey,
        row_number: u32,
        status: ReservationStatus,
    },
    Unmatched(UnmatchedReason),
}

impl ReconcileOutcome {
    pub fn is_matched(&self) -> bool {
        matches!(self, ReconcileOutcome::Matched { .. })
    }
}

pub struct ReplyReconciler {
    store: Arc<dyn ReservationStore>,
    unknown_log: Arc<dyn UnknownReplyLog>,
    reference_offset: FixedOffset,
    phone_matching: PhoneMatching,
}

impl ReplyReconciler {
    pub fn new(
        store: Arc<dyn ReservationStore>,
        unknown_log: Arc<dyn UnknownReplyLog>,
        reference_offset: FixedOffset,
        phone_matching: PhoneMatching,
    ) -> Self {
        Self {
            store,
            unknown_log,
            reference_offset,
            phone_matching,
        }
    }

    /// Applies a reply to its reservation. Never fails: every error becomes
    /// an unmatched outcome and the reply is logged for manual review.
    pub async fn reconcile(&self, reply: &InboundReply) -> ReconcileOutcome {
        info!("Looking for reservation with phone {}", reply.phone);

        let outcome = match self.try_reconcile(reply).await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!("Error processing SMS reply from {}: {}", reply.phone, e);
                ReconcileOutcome::Unmatched(UnmatchedReason::StoreFailure(e.to_string()))
            }
        };

        if let ReconcileOutcome::Unmatched(reason) = &outcome {
            warn!("Unmatched SMS reply from {}: {}", reply.phone, reason);
            self.log_unknown(reply).await;
        }

        outcome
    }

    fn match_key(&self, phone: &str) -> String {
        match self.phone_matching {
            PhoneMatching::Normalized => normalize(phone).as_str().to_string(),
            PhoneMatching::LegacyRaw => phone.to_string(),
        }
    }

    async fn try_reconcile(&self, reply: &InboundReply) -> Result<ReconcileOutcome, StoreError> {
        if reply.message.trim().is_empty() {
            return Ok(ReconcileOutcome::Unmatched(UnmatchedReason::EmptyMessage));
        }

        let received_at = match reply
            .received_at
            .as_deref()
            .and_then(|raw| parse_received_at(raw, &self.reference_offset))
        {
            Some(received_at) => received_at,
            None => return Ok(ReconcileOutcome::Unmatched(UnmatchedReason::UnparsableTimestamp)),
        };
        let date_key = reply_date_key(&received_at);

        if self.store.get_table(&date_key).await?.is_none() {
            return Ok(ReconcileOutcome::Unmatched(UnmatchedReason::NoDateTable(date_key)));
        }

        let phone_key = self.match_key(&reply.phone);
        if phone_key.trim().is_empty() {
            return Ok(ReconcileOutcome::Unmatched(UnmatchedReason::NoMatchingRow(date_key)));
        }

        let row = match self
            .store
            .find_row_by_column_value(&date_key, Column::Phone, &phone_key)
            .await?
        {
            Some(row) => row,
            None => return Ok(ReconcileOutcome::Unmatched(UnmatchedReason::NoMatchingRow(date_key))),
        };
        info!("Found reservation for {} in {}, row {}", row.name, date_key, row.row_number);

        let classification = classify_reply(&reply.message);
        let audit = format!("{}: {}", audit_stamp(&received_at), reply.message);

        self.store
            .batch_write_cells(
                &date_key,
                vec![
                    CellWrite::new(row.row_number, Column::Status, classification.status.to_string()),
                    CellWrite::new(row.row_number, Column::SmsReply, audit),
                    CellWrite::new(row.row_number, Column::ConfirmationMethod, classification.method),
                ],
            )
            .await?;

        info!("Reservation for {} set to {}", row.name, classification.status);
        Ok(ReconcileOutcome::Matched {
            date_key,
            row_number: row.row_number,
            status: classification.status,
        })
    }

    async fn log_unknown(&self, reply: &InboundReply) {
        match self.unknown_log.append(UnknownReply::needs_review(reply)).await {
            Ok(()) => info!("Logged unknown reply from {}", reply.phone),
            Err(e) => error!("Error logging unknown reply from {}: {}", reply.phone, e),
        }
    }
}
