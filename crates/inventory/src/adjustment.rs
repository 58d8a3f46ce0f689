use serde::{Deserialize, Serialize};

use stockroom_core::{DomainError, DomainResult, ErrorKind, ProductId};

use crate::stock::StockStatus;

pub const MAX_REASON_LEN: usize = 255;

/// Command: AdjustStock.
///
/// `reason` is a free-text label ("Restock", "Sale", "Damage"...) carried
/// into logs; it is only checked for presence and length.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdjustStock {
    pub product_id: ProductId,
    pub delta: i64,
    pub reason: String,
}

impl AdjustStock {
    pub fn new(product_id: ProductId, delta: i64, reason: impl Into<String>) -> Self {
        Self {
            product_id,
            delta,
            reason: reason.into(),
        }
    }

    pub fn validate(&self) -> DomainResult<()> {
        if self.delta == 0 {
            return Err(DomainError::invalid("delta", "cannot be zero"));
        }
        let reason = self.reason.trim();
        if reason.is_empty() {
            return Err(DomainError::invalid("reason", "cannot be empty"));
        }
        if reason.chars().count() > MAX_REASON_LEN {
            return Err(DomainError::invalid(
                "reason",
                format!("must be at most {MAX_REASON_LEN} characters"),
            ));
        }
        Ok(())
    }
}

/// Result of one applied adjustment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Applied {
    pub new_quantity: u64,
    pub status: StockStatus,
}

/// Outcome of one request inside a batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum AdjustmentOutcome {
    Applied {
        new_quantity: u64,
        status: StockStatus,
    },
    Failed {
        kind: ErrorKind,
        message: String,
    },
}

impl AdjustmentOutcome {
    pub fn failed(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self::Failed {
            kind,
            message: message.into(),
        }
    }

    pub fn is_applied(&self) -> bool {
        matches!(self, AdjustmentOutcome::Applied { .. })
    }

    pub fn error_kind(&self) -> Option<ErrorKind> {
        match self {
            AdjustmentOutcome::Applied { .. } => None,
            AdjustmentOutcome::Failed { kind, .. } => Some(*kind),
        }
    }
}

impl From<Applied> for AdjustmentOutcome {
    fn from(value: Applied) -> Self {
        AdjustmentOutcome::Applied {
            new_quantity: value.new_quantity,
            status: value.status,
        }
    }
}

/// One batch entry: the request as submitted plus its outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchItem {
    pub product_id: ProductId,
    pub delta: i64,
    pub reason: String,
    #[serde(flatten)]
    pub outcome: AdjustmentOutcome,
}

/// Per-request outcomes of a batch, in submission order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchAdjustmentResult {
    pub items: Vec<BatchItem>,
    pub applied: usize,
    pub failed: usize,
}

impl BatchAdjustmentResult {
    pub fn from_items(items: Vec<BatchItem>) -> Self {
        let applied = items.iter().filter(|i| i.outcome.is_applied()).count();
        let failed = items.len() - applied;
        Self {
            items,
            applied,
            failed,
        }
    }

    /// Sum of the deltas that were actually applied.
    pub fn applied_delta(&self) -> i64 {
        self.items
            .iter()
            .filter(|i| i.outcome.is_applied())
            .map(|i| i.delta)
            .sum()
    }

    pub fn is_complete_success(&self) -> bool {
        self.failed == 0
    }
}
