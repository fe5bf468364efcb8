//! Column and table type codes reported by the Machbase catalog.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ColumnType {
    Short,
    Varchar,
    Datetime,
    Integer,
    Long,
    Float,
    Double,
    Ipv4,
    Ipv6,
    Text,
    Clob,
    Blob,
    Binary,
    Ushort,
    Uinteger,
    Ulong,
}

static COLUMN_TYPES: Lazy<HashMap<i32, ColumnType>> = Lazy::new(|| {
    HashMap::from([
        (4, ColumnType::Short),
        (5, ColumnType::Varchar),
        (6, ColumnType::Datetime),
        (8, ColumnType::Integer),
        (12, ColumnType::Long),
        (16, ColumnType::Float),
        (20, ColumnType::Double),
        (32, ColumnType::Ipv4),
        (36, ColumnType::Ipv6),
        (49, ColumnType::Text),
        (53, ColumnType::Clob),
        (57, ColumnType::Blob),
        (97, ColumnType::Binary),
        (104, ColumnType::Ushort),
        (108, ColumnType::Uinteger),
        (112, ColumnType::Ulong),
    ])
});

impl ColumnType {
    pub fn from_code(code: i32) -> Option<Self> {
        COLUMN_TYPES.get(&code).copied()
    }

    pub fn name(&self) -> &'static str {
        match self {
            ColumnType::Short => "SHORT",
            ColumnType::Varchar => "VARCHAR",
            ColumnType::Datetime => "DATETIME",
            ColumnType::Integer => "INTEGER",
            ColumnType::Long => "LONG",
            ColumnType::Float => "FLOAT",
            ColumnType::Double => "DOUBLE",
            ColumnType::Ipv4 => "IPV4",
            ColumnType::Ipv6 => "IPV6",
            ColumnType::Text => "TEXT",
            ColumnType::Clob => "CLOB",
            ColumnType::Blob => "BLOB",
            ColumnType::Binary => "BINARY",
            ColumnType::Ushort => "USHORT",
            ColumnType::Uinteger => "UINTEGER",
            ColumnType::Ulong => "ULONG",
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            ColumnType::Short
                | ColumnType::Integer
                | ColumnType::Long
                | ColumnType::Float
                | ColumnType::Double
                | ColumnType::Ushort
                | ColumnType::Uinteger
                | ColumnType::Ulong
        )
    }
}

/// Whether a catalog type code denotes a numeric column. Unknown codes are
/// non-numeric.
pub fn is_numeric(code: i32) -> bool {
    ColumnType::from_code(code).is_some_and(|t| t.is_numeric())
}

/// Same as [`is_numeric`] for codes carried as strings in filter clauses.
pub fn is_numeric_str(code: &str) -> bool {
    code.trim().parse::<i32>().is_ok_and(is_numeric)
}

pub const TAG_TABLE_CODE: i32 = 6;
pub const LOG_TABLE_CODE: i32 = 0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableType {
    Tag,
    Log,
    Unknown,
}

impl TableType {
    pub fn from_code(code: i32) -> Self {
        match code {
            TAG_TABLE_CODE => TableType::Tag,
            LOG_TABLE_CODE => TableType::Log,
            _ => TableType::Unknown,
        }
    }
}

/// Tag tables are the only kind that support rollups.
pub fn is_tag_table(code: i32) -> bool {
    TableType::from_code(code) == TableType::Tag
}
