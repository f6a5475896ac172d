//! compile 명령어

use serde_json::{from_value, to_value, Value};

use rq_sql::QueryFactory;

use super::{print_output, read_json, OperationKind, OutputFormat};

pub fn compile(kind: OperationKind, params: &str, format: OutputFormat) -> anyhow::Result<()> {
    let output = compile_value(&QueryFactory::new(), kind, read_json(params)?)?;
    print_output(format, &output)
}

fn compile_value(factory: &QueryFactory, kind: OperationKind, params: Value) -> anyhow::Result<Value> {
    Ok(match kind {
        OperationKind::Find => to_value(factory.compile_find(&from_value(params)?)?)?,
        OperationKind::Count => to_value(factory.compile_count(&from_value(params)?)?)?,
        OperationKind::Remove => to_value(factory.compile_remove(&from_value(params)?)?)?,
        OperationKind::Update => to_value(factory.compile_update(&from_value(params)?)?)?,
        OperationKind::Aggregate => to_value(factory.compile_aggregate(&from_value(params)?)?)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_compile_find_json() {
        let output = compile_value(
            &QueryFactory::new(),
            OperationKind::Find,
            json!({
                "condition": {
                    "operator": "or",
                    "conditions": [
                        { "field": "age", "operator": "gt", "value": 18 },
                        { "field": "status", "operator": "eq", "value": "active" }
                    ]
                },
                "limit": 10,
                "offset": 5
            }),
        )
        .unwrap();

        assert_eq!(output["where"]["text"], "WHERE (age > ?) OR (status = ?)");
        assert_eq!(output["where"]["values"], json!([18, "active"]));
        assert_eq!(output["limit"], "LIMIT 5, 10");
    }

    #[test]
    fn test_compile_rejects_unknown_operator() {
        let err = compile_value(
            &QueryFactory::new(),
            OperationKind::Count,
            json!({ "condition": { "field": "age", "operator": "between", "value": 1 } }),
        )
        .unwrap_err();
        assert!(err.to_string().contains("unsupported operator"));
    }
}
