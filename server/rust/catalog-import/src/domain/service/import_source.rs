use std::io::Read;

/// ImportSource は取込ファイルの読み出し口。
/// 2 パス処理のため、何度でも先頭から開き直せなければならない。
/// 一時コピーの削除など入力資源の解放は Drop で行う。
pub trait ImportSource: Send + Sync {
    /// 入力を先頭から読み出すストリームを開く。
    fn open(&self) -> anyhow::Result<Box<dyn Read + Send>>;

    /// ログ出力用の入力の所在。
    fn location(&self) -> String;
}
