use crate::error::{AppResult, FileError};
use crate::models::record::{Record, RecordFields};
use serde::Deserialize;
use std::path::Path;
use tokio::fs;

/// 记录文件格式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordFormat {
    Toml,
    Json,
}

impl RecordFormat {
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension().and_then(|s| s.to_str()) {
            Some("toml") => Some(RecordFormat::Toml),
            Some("json") => Some(RecordFormat::Json),
            _ => None,
        }
    }
}

/// 文件中的一条记录，`data` 为原始接口的字段名
#[derive(Debug, Deserialize)]
struct RecordEntry {
    #[serde(default, alias = "rowNumber")]
    row_number: Option<u32>,
    #[serde(alias = "data")]
    fields: RecordFields,
}

#[derive(Debug, Deserialize)]
struct RecordFile {
    records: Vec<RecordEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum JsonRecords {
    List(Vec<RecordEntry>),
    Wrapped(RecordFile),
}

/// 从文件加载记录
pub async fn load_records(path: &Path) -> AppResult<Vec<Record>> {
    let path_str = path.display().to_string();

    let format = RecordFormat::from_path(path).ok_or_else(|| FileError::UnsupportedFormat {
        path: path_str.clone(),
    })?;

    if !path.exists() {
        return Err(FileError::NotFound { path: path_str }.into());
    }

    let content = fs::read_to_string(path)
        .await
        .map_err(|source| FileError::ReadFailed {
            path: path_str.clone(),
            source,
        })?;

    let records = parse_records(&content, format).map_err(|e| FileError::parse_failed(&path_str, e))?;
    tracing::info!("成功加载 {} 条记录: {}", records.len(), path_str);

    Ok(records)
}

/// 解析记录文本；缺失的行号按文件内序号（从 1 开始）补齐
pub fn parse_records(content: &str, format: RecordFormat) -> Result<Vec<Record>, String> {
    let entries = match format {
        RecordFormat::Toml => {
            toml::from_str::<RecordFile>(content)
                .map_err(|e| e.to_string())?
                .records
        }
        RecordFormat::Json => match serde_json::from_str::<JsonRecords>(content)
            .map_err(|e| e.to_string())?
        {
            JsonRecords::List(list) => list,
            JsonRecords::Wrapped(file) => file.records,
        },
    };

    Ok(entries
        .into_iter()
        .enumerate()
        .map(|(index, entry)| {
            let row_number = entry.row_number.unwrap_or(index as u32 + 1);
            Record::new(row_number, entry.fields)
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_toml_tables() {
        let content = r#"
[[records]]
row_number = 2
fields = { email = "a@example.com", first_name = "John", last_name = "Doe", phone = "5555551234", date_of_birth = "01/15/2000", zip_code = "12345" }

[[records]]
fields = { email = "b@example.com", first_name = "Jane", last_name = "Smith", phone = "5555555678", date_of_birth = "03/20/2001", zip_code = "54321" }
"#;
        let records = parse_records(content, RecordFormat::Toml).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].row_number, 2);
        // 缺失行号时取文件内序号
        assert_eq!(records[1].row_number, 2);
        assert_eq!(records[1].subject_label(), "Jane Smith");
    }

    #[test]
    fn parses_spreadsheet_json_shape() {
        let content = r#"[
            {"row_number": 3, "data": {
                "Email Address": "test1@example.com", "First Name": "John",
                "Last Name": "Doe", "Phone": "5555551234",
                "Date of Birth": "01/15/2000", "Zip Code": "12345"}}
        ]"#;
        let records = parse_records(content, RecordFormat::Json).unwrap();
        assert_eq!(records[0].row_number, 3);
        assert_eq!(records[0].fields.email, "test1@example.com");
    }

    #[test]
    fn rejects_records_missing_fields() {
        let content = r#"[{"row_number": 1, "data": {"First Name": "John"}}]"#;
        assert!(parse_records(content, RecordFormat::Json).is_err());
    }

    #[test]
    fn format_follows_extension() {
        assert_eq!(RecordFormat::from_path(Path::new("a.toml")), Some(RecordFormat::Toml));
        assert_eq!(RecordFormat::from_path(Path::new("a.json")), Some(RecordFormat::Json));
        assert_eq!(RecordFormat::from_path(Path::new("a.xlsx")), None);
    }

    #[tokio::test]
    async fn missing_file_is_reported() {
        let err = load_records(Path::new("does/not/exist.toml")).await.unwrap_err();
        assert!(err.to_string().contains("文件不存在"));
    }

    #[tokio::test]
    async fn loads_records_from_disk() {
        let path = std::env::temp_dir().join(format!("form_batch_submit_{}.json", std::process::id()));
        let content = r#"{"records": [
            {"data": {
                "Email Address": "disk@example.com", "First Name": "Ada",
                "Last Name": "Lovelace", "Phone": "5555550000",
                "Date of Birth": "12/10/1990", "Zip Code": "10001"}}
        ]}"#;
        tokio::fs::write(&path, content).await.unwrap();

        let records = load_records(&path).await;
        tokio::fs::remove_file(&path).await.unwrap();

        let records = records.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].row_number, 1);
        assert_eq!(records[0].subject_label(), "Ada Lovelace");
    }
}
