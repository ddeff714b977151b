use serde::{Deserialize, Serialize};
use std::fmt;

/// 待提交的一条记录
///
/// `row_number` 由调用方提供，仅用于追踪，进入任务后不再修改。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub row_number: u32,
    pub fields: RecordFields,
}

impl Record {
    pub fn new(row_number: u32, fields: RecordFields) -> Self {
        Self { row_number, fields }
    }

    /// 用于日志展示的姓名
    pub fn subject_label(&self) -> String {
        self.fields.subject_label()
    }
}

/// 表单的六个字段，字段名兼容原始表格列名
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RecordFields {
    #[serde(alias = "Email Address")]
    pub email: String,
    #[serde(alias = "First Name")]
    pub first_name: String,
    #[serde(alias = "Last Name")]
    pub last_name: String,
    #[serde(alias = "Phone")]
    pub phone: String,
    #[serde(alias = "Date of Birth")]
    pub date_of_birth: String,
    #[serde(alias = "Zip Code")]
    pub zip_code: String,
}

impl RecordFields {
    pub fn subject_label(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }

    pub fn value(&self, field: FormField) -> &str {
        match field {
            FormField::Email => &self.email,
            FormField::FirstName => &self.first_name,
            FormField::LastName => &self.last_name,
            FormField::Phone => &self.phone,
            FormField::DateOfBirth => &self.date_of_birth,
            FormField::ZipCode => &self.zip_code,
        }
    }

    /// 按填写顺序遍历字段
    pub fn iter(&self) -> impl Iterator<Item = (FormField, &str)> + '_ {
        FormField::ORDERED
            .iter()
            .map(move |field| (*field, self.value(*field)))
    }
}

/// 表单字段，`ORDERED` 即填写顺序
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FormField {
    Email,
    FirstName,
    LastName,
    Phone,
    DateOfBirth,
    ZipCode,
}

impl FormField {
    pub const ORDERED: [FormField; 6] = [
        FormField::Email,
        FormField::FirstName,
        FormField::LastName,
        FormField::Phone,
        FormField::DateOfBirth,
        FormField::ZipCode,
    ];

    pub fn name(self) -> &'static str {
        match self {
            FormField::Email => "email",
            FormField::FirstName => "first_name",
            FormField::LastName => "last_name",
            FormField::Phone => "phone",
            FormField::DateOfBirth => "date_of_birth",
            FormField::ZipCode => "zip_code",
        }
    }
}

impl fmt::Display for FormField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields(first: &str, last: &str) -> RecordFields {
        RecordFields {
            email: "a@example.com".into(),
            first_name: first.into(),
            last_name: last.into(),
            phone: "5555551234".into(),
            date_of_birth: "01/15/2000".into(),
            zip_code: "12345".into(),
        }
    }

    #[test]
    fn label_joins_and_trims_names() {
        assert_eq!(fields("John", "Doe").subject_label(), "John Doe");
        assert_eq!(fields("", "Doe").subject_label(), "Doe");
    }

    #[test]
    fn iter_follows_declared_order() {
        let f = fields("John", "Doe");
        let order: Vec<_> = f.iter().map(|(field, _)| field).collect();
        assert_eq!(order, FormField::ORDERED.to_vec());
        assert_eq!(f.iter().nth(1).map(|(_, v)| v), Some("John"));
    }

    #[test]
    fn accepts_spreadsheet_column_names() {
        let json = r#"{
            "Email Address": "x@example.com",
            "First Name": "Jane",
            "Last Name": "Smith",
            "Phone": "5555555678",
            "Date of Birth": "03/20/2001",
            "Zip Code": "54321"
        }"#;
        let parsed: RecordFields = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.first_name, "Jane");
        assert_eq!(parsed.zip_code, "54321");
    }

    #[test]
    fn rejects_unknown_fields() {
        let json = r#"{
            "email": "x@example.com", "first_name": "J", "last_name": "S",
            "phone": "1", "date_of_birth": "2", "zip_code": "3", "nickname": "jj"
        }"#;
        assert!(serde_json::from_str::<RecordFields>(json).is_err());
    }
}
