use chrono::{DateTime, NaiveTime};
use duckdb::types::{TimeUnit, ValueRef};
use duckdb::Statement;
use serde_json::{Map, Number, Value};

/// Runs a prepared statement and collects every row as a column-name -> value
/// map, in result order.
pub fn query_rows<P: duckdb::Params>(
    stmt: &mut Statement,
    params: P,
) -> Result<Vec<Map<String, Value>>, duckdb::Error> {
    let column_count = stmt.column_count();
    let mut column_names = Vec::with_capacity(column_count);
    for i in 0..column_count {
        match stmt.column_name(i) {
            Ok(name) => column_names.push(name.to_string()),
            Err(_) => column_names.push(format!("column_{}", i)),
        }
    }

    let mut rows = stmt.query(params)?;
    let mut out = Vec::new();
    while let Some(row) = rows.next()? {
        let mut record = Map::new();
        for (i, name) in column_names.iter().enumerate() {
            record.insert(name.clone(), value_ref_to_json(row.get_ref(i)?));
        }
        out.push(record);
    }

    Ok(out)
}

/// Converts a single DuckDB value to JSON. Anything 64 bits or wider (BIGINT,
/// UBIGINT, HUGEINT, DECIMAL) becomes a string: JSON numbers cannot losslessly
/// hold the full range the store produces for aggregate counts.
pub fn value_ref_to_json(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Boolean(b) => Value::Bool(b),
        ValueRef::TinyInt(i) => Value::Number(Number::from(i)),
        ValueRef::SmallInt(i) => Value::Number(Number::from(i)),
        ValueRef::Int(i) => Value::Number(Number::from(i)),
        ValueRef::UTinyInt(i) => Value::Number(Number::from(i)),
        ValueRef::USmallInt(i) => Value::Number(Number::from(i)),
        ValueRef::UInt(i) => Value::Number(Number::from(i)),
        ValueRef::BigInt(i) => Value::String(i.to_string()),
        ValueRef::UBigInt(i) => Value::String(i.to_string()),
        ValueRef::HugeInt(i) => Value::String(i.to_string()),
        ValueRef::Decimal(d) => Value::String(d.to_string()),
        ValueRef::Float(f) => Number::from_f64(f as f64)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        ValueRef::Double(f) => Number::from_f64(f).map(Value::Number).unwrap_or(Value::Null),
        ValueRef::Text(bytes) => Value::String(String::from_utf8_lossy(bytes).to_string()),
        ValueRef::Blob(bytes) => Value::String(format!("<{} byte blob>", bytes.len())),
        ValueRef::Date32(days) => DateTime::from_timestamp(days as i64 * 86_400, 0)
            .map(|dt| Value::String(dt.format("%Y-%m-%d").to_string()))
            .unwrap_or(Value::Null),
        ValueRef::Timestamp(unit, raw) => DateTime::from_timestamp_micros(to_micros(unit, raw))
            .map(|dt| Value::String(dt.format("%Y-%m-%d %H:%M:%S").to_string()))
            .unwrap_or(Value::Null),
        ValueRef::Time64(unit, raw) => {
            let micros = to_micros(unit, raw);
            NaiveTime::from_num_seconds_from_midnight_opt(
                (micros / 1_000_000) as u32,
                ((micros % 1_000_000) * 1_000) as u32,
            )
            .map(|t| Value::String(t.format("%H:%M:%S").to_string()))
            .unwrap_or(Value::Null)
        }
        // Nested and exotic types are not produced by the invoice tables
        other => Value::String(format!("{:?}", other)),
    }
}

fn to_micros(unit: TimeUnit, raw: i64) -> i64 {
    match unit {
        TimeUnit::Second => raw.saturating_mul(1_000_000),
        TimeUnit::Millisecond => raw.saturating_mul(1_000),
        TimeUnit::Microsecond => raw,
        TimeUnit::Nanosecond => raw / 1_000,
    }
}
