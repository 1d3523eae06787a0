//! 区切りテキスト（CSV）の行読み出し。
//!
//! 先頭行をヘッダとして列名を取り、以降の各行を [`RawRow`] として返す。
//! 列数の過不足は許容し、足りない列は存在しないものとして扱う。
//! UTF-8 として不正な行は読み出しエラーとなる。

use std::io::Read;

use anyhow::Context;

use crate::domain::service::RawRow;

fn builder() -> csv::ReaderBuilder {
    let mut builder = csv::ReaderBuilder::new();
    builder.flexible(true).trim(csv::Trim::Headers);
    builder
}

/// データ行の数を数える。ヘッダ行と空行は含まない。
pub fn count_rows<R: Read>(reader: R) -> anyhow::Result<u64> {
    let mut reader = builder().from_reader(reader);
    let mut record = csv::StringRecord::new();
    let mut rows = 0u64;
    while reader
        .read_record(&mut record)
        .with_context(|| format!("failed to read row {}", rows + 1))?
    {
        rows += 1;
    }
    Ok(rows)
}

/// RowReader はデータ行を 1 行ずつ [`RawRow`] として読み出すイテレータ。
pub struct RowReader<R: Read> {
    reader: csv::Reader<R>,
    headers: csv::StringRecord,
    record: csv::StringRecord,
    line: u64,
}

impl<R: Read> RowReader<R> {
    pub fn new(reader: R) -> anyhow::Result<Self> {
        let mut reader = builder().from_reader(reader);
        let headers = reader
            .headers()
            .context("failed to read header row")?
            .clone();
        Ok(Self {
            reader,
            headers,
            record: csv::StringRecord::new(),
            line: 0,
        })
    }

    pub fn headers(&self) -> &csv::StringRecord {
        &self.headers
    }
}

impl<R: Read> Iterator for RowReader<R> {
    type Item = anyhow::Result<RawRow>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.reader.read_record(&mut self.record) {
            Ok(true) => {
                self.line += 1;
                Some(Ok(self
                    .headers
                    .iter()
                    .zip(self.record.iter())
                    .collect()))
            }
            Ok(false) => None,
            Err(e) => {
                Some(Err(anyhow::Error::new(e)
                    .context(format!("failed to read row {}", self.line + 1))))
            }
        }
    }
}
