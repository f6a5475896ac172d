//! 요청 파라미터
//!
//! 연산별 파라미터 객체입니다. 요청마다 만들어 한 번 컴파일하고 버립니다.
//!
//! # 예시
//!
//! ```json
//! {
//!   "condition": { "field": "status", "operator": "eq", "value": "active" },
//!   "sort": { "created_at": -1, "name": 1 },
//!   "limit": 10,
//!   "offset": 20
//! }
//! ```

use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::condition::ConditionNode;
use crate::value::Record;

/// 정렬 방향
///
/// `-1` 또는 `"desc"`면 DESC, 그 외는 모두 ASC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    pub fn sql(&self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }

    /// 숫자 인코딩: -1 → DESC
    pub fn from_code(code: i64) -> Self {
        if code == -1 {
            SortDirection::Desc
        } else {
            SortDirection::Asc
        }
    }
}

impl Serialize for SortDirection {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            SortDirection::Asc => serializer.serialize_i64(1),
            SortDirection::Desc => serializer.serialize_i64(-1),
        }
    }
}

impl<'de> Deserialize<'de> for SortDirection {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Code(i64),
            Float(f64),
            Name(String),
        }

        Ok(match Raw::deserialize(deserializer)? {
            Raw::Code(code) => SortDirection::from_code(code),
            Raw::Float(_) => SortDirection::Asc,
            Raw::Name(name) => match name.trim().to_ascii_lowercase().as_str() {
                "desc" | "-1" => SortDirection::Desc,
                _ => SortDirection::Asc,
            },
        })
    }
}

/// 정렬 지정 (호출자가 준 키 순서 유지)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Sort(pub IndexMap<String, SortDirection>);

impl Sort {
    pub fn new() -> Self {
        Self(IndexMap::new())
    }

    pub fn asc(mut self, field: impl Into<String>) -> Self {
        self.0.insert(field.into(), SortDirection::Asc);
        self
    }

    pub fn desc(mut self, field: impl Into<String>) -> Self {
        self.0.insert(field.into(), SortDirection::Desc);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &SortDirection)> {
        self.0.iter()
    }
}

/// find 파라미터
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FindParams {
    #[serde(default)]
    pub condition: Option<ConditionNode>,

    #[serde(default)]
    pub sort: Option<Sort>,

    #[serde(default)]
    pub limit: Option<u64>,

    /// `limit` 없이 단독으로는 무시됨
    #[serde(default)]
    pub offset: Option<u64>,
}

/// count 파라미터
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CountParams {
    #[serde(default)]
    pub condition: Option<ConditionNode>,
}

/// remove 파라미터
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RemoveParams {
    #[serde(default)]
    pub condition: Option<ConditionNode>,
}

/// update 요청
///
/// `updates[i]`는 `conditions[i]`와 짝지어집니다. 페이로드가 더 많으면
/// 정책에 따라 마지막 조건을 재사용합니다.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateRequest {
    pub updates: Vec<Record>,

    #[serde(default)]
    pub conditions: Vec<ConditionNode>,
}

impl UpdateRequest {
    /// 단일 페이로드 + 단일 조건
    pub fn single(fields: Record, condition: ConditionNode) -> Self {
        Self {
            updates: vec![fields],
            conditions: vec![condition],
        }
    }
}

/// aggregate 파라미터
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregationParams {
    #[serde(default)]
    pub sum: Option<String>,

    #[serde(default)]
    pub average: Option<String>,

    #[serde(default)]
    pub min: Option<String>,

    #[serde(default)]
    pub max: Option<String>,

    #[serde(default)]
    pub count: Option<String>,

    #[serde(default)]
    pub group_by: Option<Vec<String>>,

    #[serde(default)]
    pub sort: Option<Sort>,

    #[serde(default)]
    pub condition: Option<ConditionNode>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_params_deserialization() {
        let json = r#"{
            "condition": { "field": "status", "operator": "eq", "value": "active" },
            "sort": { "created_at": -1, "name": 1, "rank": "desc" },
            "limit": 10
        }"#;

        let params: FindParams = serde_json::from_str(json).unwrap();
        assert!(params.condition.is_some());
        assert_eq!(params.limit, Some(10));
        assert_eq!(params.offset, None);

        let sort: Vec<(&str, SortDirection)> = params
            .sort
            .as_ref()
            .unwrap()
            .iter()
            .map(|(k, v)| (k.as_str(), *v))
            .collect();
        assert_eq!(
            sort,
            vec![
                ("created_at", SortDirection::Desc),
                ("name", SortDirection::Asc),
                ("rank", SortDirection::Desc),
            ]
        );
    }

    #[test]
    fn test_sort_direction_codes() {
        assert_eq!(SortDirection::from_code(-1), SortDirection::Desc);
        assert_eq!(SortDirection::from_code(1), SortDirection::Asc);
        assert_eq!(SortDirection::from_code(0), SortDirection::Asc);
        assert_eq!(SortDirection::from_code(-2), SortDirection::Asc);
    }

    #[test]
    fn test_invalid_condition_fails_params() {
        let json = r#"{ "condition": { "field": "age", "operator": "between", "value": 1 } }"#;
        let err = serde_json::from_str::<CountParams>(json).unwrap_err();
        assert!(err.to_string().contains("unsupported operator"));
    }

    #[test]
    fn test_aggregation_params_camel_case() {
        let json = r#"{ "sum": "amount", "groupBy": ["region", "year"] }"#;
        let params: AggregationParams = serde_json::from_str(json).unwrap();
        assert_eq!(params.sum.as_deref(), Some("amount"));
        assert_eq!(params.group_by.unwrap(), vec!["region", "year"]);
    }

    #[test]
    fn test_update_request_deserialization() {
        let json = r#"{
            "updates": [{ "qty": 1, "name": "a" }, { "qty": 2 }],
            "conditions": [{ "field": "id", "operator": "eq", "value": 7 }]
        }"#;
        let request: UpdateRequest = serde_json::from_str(json).unwrap();
        assert_eq!(request.updates.len(), 2);
        assert_eq!(request.conditions.len(), 1);
        let keys: Vec<&str> = request.updates[0].keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["qty", "name"]);
    }
}
