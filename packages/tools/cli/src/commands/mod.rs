//! CLI 명령어 구현

pub mod compile;
pub mod run;

use serde::Serialize;
use serde_json::Value;

#[derive(Clone, Copy, Default, clap::ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Clone, Copy, clap::ValueEnum)]
pub enum OperationKind {
    Find,
    Count,
    Remove,
    Update,
    Aggregate,
}

/// 인자를 JSON으로 읽는다. `@path`면 파일 내용
pub fn read_json(arg: &str) -> anyhow::Result<Value> {
    let content = match arg.strip_prefix('@') {
        Some(path) => std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Cannot read {}: {}", path, e))?,
        None => arg.to_string(),
    };
    Ok(serde_json::from_str(&content)?)
}

pub fn print_output<T: Serialize>(format: OutputFormat, output: &T) -> anyhow::Result<()> {
    let value = serde_json::to_value(output)?;
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&value)?),
        OutputFormat::Text => print_text(&value),
    }
    Ok(())
}

fn print_text(value: &Value) {
    match value {
        Value::Object(map) => {
            for (key, value) in map {
                match value {
                    Value::String(s) => println!("{}: {}", key, s),
                    Value::Null => {}
                    other => println!("{}: {}", key, other),
                }
            }
        }
        Value::Array(items) => {
            for item in items {
                println!("{}", item);
            }
        }
        other => println!("{}", other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_json_inline() {
        let value = read_json(r#"{ "limit": 3 }"#).unwrap();
        assert_eq!(value["limit"], 3);
        assert!(read_json("not json").is_err());
    }
}
