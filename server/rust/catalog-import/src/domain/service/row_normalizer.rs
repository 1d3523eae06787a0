//! 取込行の正規化。
//!
//! 1 行分の生データ（列名 → 文字列）を検証し、カタログへマージ可能な
//! [`NewProduct`] に変換するか、行を棄却する。副作用は持たない。

use std::collections::HashMap;

use crate::domain::entity::NewProduct;

pub const SKU_COLUMN: &str = "sku";
pub const NAME_COLUMN: &str = "name";
pub const DESCRIPTION_COLUMN: &str = "description";

/// RawRow はヘッダ行の列名をキーとした 1 行分の生データ。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawRow {
    fields: HashMap<String, String>,
}

impl RawRow {
    pub fn new(fields: HashMap<String, String>) -> Self {
        Self { fields }
    }

    pub fn get(&self, column: &str) -> Option<&str> {
        self.fields.get(column).map(String::as_str)
    }
}

impl<K, V> FromIterator<(K, V)> for RawRow
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            fields: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// RejectReason は行が棄却された理由。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// SKU が空（空白のみを含む）。
    EmptySku,
}

impl std::fmt::Display for RejectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptySku => write!(f, "empty sku"),
        }
    }
}

/// NormalizeOutcome は 1 行の正規化結果。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NormalizeOutcome {
    Accepted(NewProduct),
    Rejected(RejectReason),
}

fn trimmed<'a>(row: &'a RawRow, column: &str) -> &'a str {
    row.get(column).map_or("", str::trim)
}

/// 1 行を正規化する。
///
/// - `sku` は前後の空白を除去し、空なら棄却する。
/// - `name` が空なら `sku` で補う。
/// - `description` が空なら None とする。
/// - `active` は入力列に関わらず常に true。
pub fn normalize_row(row: &RawRow) -> NormalizeOutcome {
    let sku = trimmed(row, SKU_COLUMN);
    if sku.is_empty() {
        return NormalizeOutcome::Rejected(RejectReason::EmptySku);
    }

    let name = match trimmed(row, NAME_COLUMN) {
        "" => sku,
        name => name,
    };
    let description = match trimmed(row, DESCRIPTION_COLUMN) {
        "" => None,
        description => Some(description.to_string()),
    };

    NormalizeOutcome::Accepted(NewProduct {
        sku: sku.to_string(),
        name: name.to_string(),
        description,
        active: true,
    })
}
