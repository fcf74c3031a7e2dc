// SPDX-License-Identifier: Apache-2.0

use crate::referrals::insert_row;
use crate::{ReferralStore, StoreError, StoreErrorCode};
use referral_desk_model::Referral;

/// Upper bound on rows written per transaction.
pub const MAX_BATCH_SIZE: usize = 500;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchResult {
    pub index: usize,
    pub rows: usize,
    pub written: usize,
    pub failed: usize,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchOutcome {
    pub batch_size: usize,
    pub written: usize,
    pub failed: usize,
    pub batches: Vec<BatchResult>,
}

impl BatchOutcome {
    #[must_use]
    pub fn failed_batches(&self) -> impl Iterator<Item = &BatchResult> {
        self.batches.iter().filter(|b| b.error.is_some())
    }
}

impl ReferralStore {
    /// Writes `rows` in transactions of at most `batch_size` rows (capped at
    /// [`MAX_BATCH_SIZE`]). A failing batch is rolled back on its own; batches
    /// before it stay committed and later ones are still attempted.
    pub fn insert_referrals_batched(
        &mut self,
        rows: Vec<Referral>,
        batch_size: usize,
    ) -> Result<BatchOutcome, StoreError> {
        if batch_size == 0 {
            return Err(StoreError::new(
                StoreErrorCode::Validation,
                "batch size must be at least 1",
            ));
        }
        let batch_size = batch_size.min(MAX_BATCH_SIZE);
        let mut outcome = BatchOutcome {
            batch_size,
            ..BatchOutcome::default()
        };

        for (index, chunk) in rows.chunks(batch_size).enumerate() {
            let result = match self.write_chunk(chunk) {
                Ok(()) => BatchResult {
                    index,
                    rows: chunk.len(),
                    written: chunk.len(),
                    failed: 0,
                    error: None,
                },
                Err(err) => {
                    tracing::warn!(batch = index, rows = chunk.len(), error = %err, "referral batch rolled back");
                    BatchResult {
                        index,
                        rows: chunk.len(),
                        written: 0,
                        failed: chunk.len(),
                        error: Some(err.to_string()),
                    }
                }
            };
            outcome.written += result.written;
            outcome.failed += result.failed;
            outcome.batches.push(result);
        }
        tracing::info!(
            written = outcome.written,
            failed = outcome.failed,
            batches = outcome.batches.len(),
            "batched referral write finished"
        );
        Ok(outcome)
    }

    fn write_chunk(&mut self, chunk: &[Referral]) -> Result<(), StoreError> {
        let tx = self.conn.transaction()?;
        for record in chunk {
            record.validate()?;
            insert_row(&tx, record)?;
        }
        tx.commit()?;
        Ok(())
    }
}
