// ==========================================
// 平衡轮库存系统 - 行字段编解码
// ==========================================
// 时间统一存为 "%Y-%m-%d %H:%M:%S" 文本，日期存为 "%Y-%m-%d"
// 枚举列解析失败按 FromSqlConversionFailure 上抛，不静默兜底
// ==========================================

use chrono::{Local, NaiveDate, NaiveDateTime, Timelike};
use rusqlite::types::Type;

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// 当前本地时间（截断到秒，与存储精度一致）
pub fn now_timestamp() -> NaiveDateTime {
    let now = Local::now().naive_local();
    now.with_nanosecond(0).unwrap_or(now)
}

pub fn format_timestamp(ts: &NaiveDateTime) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

pub fn format_date(date: &NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

fn conversion_error(idx: usize, message: String) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, message.into())
}

pub fn parse_timestamp(idx: usize, raw: &str) -> rusqlite::Result<NaiveDateTime> {
    NaiveDateTime::parse_from_str(raw, TIMESTAMP_FORMAT)
        .map_err(|e| conversion_error(idx, format!("时间格式错误 '{}': {}", raw, e)))
}

pub fn parse_opt_timestamp(idx: usize, raw: Option<String>) -> rusqlite::Result<Option<NaiveDateTime>> {
    raw.map(|s| parse_timestamp(idx, &s)).transpose()
}

pub fn parse_date(idx: usize, raw: &str) -> rusqlite::Result<NaiveDate> {
    NaiveDate::parse_from_str(raw, DATE_FORMAT)
        .map_err(|e| conversion_error(idx, format!("日期格式错误 '{}': {}", raw, e)))
}

/// 解析枚举列
pub fn parse_enum<T>(idx: usize, raw: &str, parse: fn(&str) -> Option<T>) -> rusqlite::Result<T> {
    parse(raw).ok_or_else(|| conversion_error(idx, format!("未知枚举值 '{}'", raw)))
}

/// LIKE 模式（大小写不敏感匹配由 SQL 侧 UPPER() 完成）
pub fn like_pattern(query: &str) -> String {
    let escaped = query
        .trim()
        .to_uppercase()
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::Direction;

    #[test]
    fn test_timestamp_round_trip_keeps_seconds() {
        let ts = now_timestamp();
        let parsed = parse_timestamp(0, &format_timestamp(&ts)).unwrap();
        assert_eq!(parsed, ts);
    }

    #[test]
    fn test_parse_enum_rejects_unknown() {
        assert!(parse_enum(2, "SIDEWAYS", Direction::from_str).is_err());
        assert_eq!(
            parse_enum(2, "ASCENDING", Direction::from_str).unwrap(),
            Direction::Ascending
        );
    }

    #[test]
    fn test_like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern(" 50%_a "), "%50\\%\\_A%");
    }
}
