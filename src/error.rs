// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use thiserror::Error;

/// Errors raised by the ledger engine.
///
/// Everything except `Storage` is detected before a write happens, so a
/// failed operation never leaves a partially applied change behind.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// Malformed or missing field, non-positive amount, forbidden field for a kind.
    #[error("validation failed: {0}")]
    Validation(String),

    /// Unknown account/category id or a category whose kind does not match.
    #[error("inconsistent reference: {0}")]
    InconsistentReference(String),

    /// Delete (or kind change) blocked by transactions still pointing at the entity.
    #[error("{entity} {id} is referenced by {references} transaction(s)")]
    EntityInUse {
        entity: &'static str,
        id: i64,
        references: i64,
    },

    /// A caller handed a pre-sorted sequence that is not ordered by (date, id).
    #[error("transactions out of (date, id) order at position {position}")]
    InvalidOrdering { position: usize },

    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: i64 },

    /// A stored row could not be decoded back into the model.
    #[error("corrupt row: {0}")]
    Corrupt(String),

    #[error(transparent)]
    Storage(#[from] rusqlite::Error),
}

impl LedgerError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn reference(msg: impl Into<String>) -> Self {
        Self::InconsistentReference(msg.into())
    }

    pub fn not_found(entity: &'static str, id: i64) -> Self {
        Self::NotFound { entity, id }
    }
}

pub type Result<T> = std::result::Result<T, LedgerError>;
