//! JSONレポートの書き出し
//!
//! 2スペースのインデント、非ASCII文字はエスケープせずUTF-8のまま出力します。
//! 同じ入力からは常にバイト単位で同一の出力が得られます。

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use serde::Serialize;
use tracing::info;

use crate::error::Result;

/// 任意のレポートを整形済みJSONとして書き出す
pub fn write_json<T: Serialize + ?Sized, W: Write>(report: &T, mut writer: W) -> Result<()> {
    serde_json::to_writer_pretty(&mut writer, report)?;
    writer.flush()?;
    Ok(())
}

/// レポートをファイルへ書き出す（既存ファイルは上書き）
pub fn write_json_file<T: Serialize + ?Sized>(report: &T, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let file = File::create(path)?;
    write_json(report, BufWriter::new(file))?;
    info!("Wrote JSON report {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::OrderedMap;

    #[test]
    fn test_indent_and_unicode() {
        let mut inner = OrderedMap::new();
        inner.insert("01月", 10.0);
        let mut report = OrderedMap::new();
        report.insert("外科", inner);

        let mut buffer = Vec::new();
        write_json(&report, &mut buffer).unwrap();
        let text = String::from_utf8(buffer).unwrap();
        assert_eq!(text, "{\n  \"外科\": {\n    \"01月\": 10.0\n  }\n}");
    }

    #[test]
    fn test_write_file_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("report.json");

        let mut report: OrderedMap<f64> = OrderedMap::new();
        report.insert("a", 1.0);
        write_json_file(&report, &path).unwrap();

        let empty: OrderedMap<f64> = OrderedMap::new();
        write_json_file(&empty, &path).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "{}");
    }
}
