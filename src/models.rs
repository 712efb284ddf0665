// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::LedgerError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CategoryKind {
    Income,
    Expense,
}

impl CategoryKind {
    pub fn as_str(self) -> &'static str {
        match self {
            CategoryKind::Income => "Income",
            CategoryKind::Expense => "Expense",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransactionKind {
    Income,
    Expense,
    Transfer,
}

impl TransactionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            TransactionKind::Income => "Income",
            TransactionKind::Expense => "Expense",
            TransactionKind::Transfer => "Transfer",
        }
    }

    /// Kind a category must have to classify this transaction; `None` for transfers.
    pub fn category_kind(self) -> Option<CategoryKind> {
        match self {
            TransactionKind::Income => Some(CategoryKind::Income),
            TransactionKind::Expense => Some(CategoryKind::Expense),
            TransactionKind::Transfer => None,
        }
    }

    pub fn takes_origin(self) -> bool {
        match self {
            TransactionKind::Expense | TransactionKind::Transfer => true,
            TransactionKind::Income => false,
        }
    }

    pub fn takes_destination(self) -> bool {
        match self {
            TransactionKind::Income | TransactionKind::Transfer => true,
            TransactionKind::Expense => false,
        }
    }
}

impl From<CategoryKind> for TransactionKind {
    fn from(kind: CategoryKind) -> Self {
        match kind {
            CategoryKind::Income => TransactionKind::Income,
            CategoryKind::Expense => TransactionKind::Expense,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransactionState {
    Planned,
    Confirmed,
}

impl TransactionState {
    pub fn as_str(self) -> &'static str {
        match self {
            TransactionState::Planned => "Planned",
            TransactionState::Confirmed => "Confirmed",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Frequency {
    Monthly,
    Weekly,
    Annual,
}

impl Frequency {
    pub fn as_str(self) -> &'static str {
        match self {
            Frequency::Monthly => "Monthly",
            Frequency::Weekly => "Weekly",
            Frequency::Annual => "Annual",
        }
    }
}

macro_rules! label_enum {
    ($ty:ident, $what:literal, [$($variant:ident),+]) => {
        impl FromStr for $ty {
            type Err = LedgerError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let t = s.trim();
                $(
                    if t.eq_ignore_ascii_case(stringify!($variant)) {
                        return Ok($ty::$variant);
                    }
                )+
                Err(LedgerError::validation(format!(
                    "unknown {} '{}'",
                    $what, s
                )))
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

label_enum!(CategoryKind, "category kind", [Income, Expense]);
label_enum!(TransactionKind, "transaction kind", [Income, Expense, Transfer]);
label_enum!(TransactionState, "transaction state", [Planned, Confirmed]);
label_enum!(Frequency, "frequency", [Monthly, Weekly, Annual]);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub id: i64,
    pub name: String,
    pub r#type: String,
    pub opening_balance: Decimal,
    /// Derived: opening balance plus every confirmed transaction touching the account.
    pub current_balance: Decimal,
}

#[derive(Debug, Clone)]
pub struct NewAccount {
    pub name: String,
    pub r#type: String,
    pub opening_balance: Decimal,
}

#[derive(Debug, Clone, Default)]
pub struct AccountPatch {
    pub name: Option<String>,
    pub r#type: Option<String>,
    /// Always rejected; present so callers get an explicit error instead of a silent no-op.
    pub opening_balance: Option<Decimal>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: i64,
    pub name: String,
    pub kind: CategoryKind,
}

#[derive(Debug, Clone, Default)]
pub struct CategoryPatch {
    pub name: Option<String>,
    pub kind: Option<CategoryKind>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: i64,
    pub date: NaiveDate,
    pub amount: Decimal,
    pub kind: TransactionKind,
    pub state: TransactionState,
    pub description: String,
    pub origin_account_id: Option<i64>,
    pub destination_account_id: Option<i64>,
    pub category_id: Option<i64>,
    pub recurring_rule_id: Option<i64>,
    /// Occurrence date the rule fired for; with the rule id it forms the generation key.
    pub scheduled_date: Option<NaiveDate>,
}

impl Transaction {
    pub fn is_confirmed(&self) -> bool {
        self.state == TransactionState::Confirmed
    }

    pub fn is_planned(&self) -> bool {
        self.state == TransactionState::Planned
    }

    pub fn touches_account(&self, account_id: i64) -> bool {
        self.origin_account_id == Some(account_id) || self.destination_account_id == Some(account_id)
    }
}

#[derive(Debug, Clone)]
pub struct NewTransaction {
    pub date: NaiveDate,
    pub amount: Decimal,
    pub kind: TransactionKind,
    pub state: TransactionState,
    pub description: String,
    pub origin_account_id: Option<i64>,
    pub destination_account_id: Option<i64>,
    pub category_id: Option<i64>,
}

/// Field-wise edit of a transaction. `Some(None)` clears an optional reference.
#[derive(Debug, Clone, Default)]
pub struct TransactionPatch {
    pub date: Option<NaiveDate>,
    pub amount: Option<Decimal>,
    pub kind: Option<TransactionKind>,
    pub state: Option<TransactionState>,
    pub description: Option<String>,
    pub origin_account_id: Option<Option<i64>>,
    pub destination_account_id: Option<Option<i64>>,
    pub category_id: Option<Option<i64>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecurringRule {
    pub id: i64,
    pub description: String,
    pub default_amount: Decimal,
    /// Rules only ever produce income or expense transactions.
    pub kind: CategoryKind,
    pub frequency: Frequency,
    /// Day of month (1-31) for Monthly/Annual, weekday (0 = Monday .. 6 = Sunday) for Weekly.
    pub day: u32,
    pub month: Option<u32>,
    pub default_category_id: Option<i64>,
    pub active: bool,
}

#[derive(Debug, Clone)]
pub struct NewRule {
    pub description: String,
    pub default_amount: Decimal,
    pub kind: CategoryKind,
    pub frequency: Frequency,
    pub day: u32,
    pub month: Option<u32>,
    pub default_category_id: Option<i64>,
}

#[derive(Debug, Clone, Default)]
pub struct RulePatch {
    pub description: Option<String>,
    pub default_amount: Option<Decimal>,
    pub kind: Option<CategoryKind>,
    pub frequency: Option<Frequency>,
    pub day: Option<u32>,
    pub month: Option<Option<u32>>,
    pub default_category_id: Option<Option<i64>>,
    pub active: Option<bool>,
}
