use async_trait::async_trait;

use crate::domain::entity::{NewProduct, Product};

/// ProductRepository は商品カタログの永続化を担うリポジトリトレイト。
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ProductRepository: Send + Sync {
    /// レコード群を 1 トランザクションでマージする。
    /// SKU（大文字小文字無視）が既存なら name / description / active / updated_at を上書きし、
    /// 無ければ新規挿入する。失敗時はバッチのいずれの変更も残らない。
    /// 呼び出し側はバッチ内の SKU キーが重複しないことを保証する。
    async fn upsert_batch(&self, products: &[NewProduct]) -> anyhow::Result<()>;

    /// SKU（大文字小文字無視）で商品を検索する。
    async fn find_by_sku(&self, sku: &str) -> anyhow::Result<Option<Product>>;

    /// 格納されている商品数を返す。
    async fn count(&self) -> anyhow::Result<i64>;
}
