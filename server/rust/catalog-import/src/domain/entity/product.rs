use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Product はカタログに格納された商品レコード。
/// SKU は大文字小文字を区別せず一意である。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: i64,
    pub sku: String,
    pub name: String,
    pub description: Option<String>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// NewProduct は正規化済みの取込レコード。バッチ単位でカタログへマージされる。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewProduct {
    pub sku: String,
    pub name: String,
    pub description: Option<String>,
    pub active: bool,
}

impl NewProduct {
    /// 大文字小文字を無視した比較に使う SKU キー。
    pub fn sku_key(&self) -> String {
        sku_key(&self.sku)
    }
}

/// SKU を比較用キーに変換する。
pub fn sku_key(sku: &str) -> String {
    sku.to_lowercase()
}
