//! 바인딩 값과 레코드
//!
//! 조건의 비교 값, INSERT/UPDATE 페이로드, 드라이버가 돌려준 행 모두
//! 같은 닫힌 값 타입(`Scalar`)을 사용합니다.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// 필드 이름 → 값 (삽입 순서 유지)
///
/// INSERT의 컬럼 목록과 UPDATE의 SET 절 순서가 이 맵의 순서를 따르므로
/// 컬럼과 값의 정렬이 구조적으로 보장됩니다.
pub type Record = IndexMap<String, Scalar>;

/// 바인딩 가능한 값
///
/// JSON과 untagged로 변환됩니다. 정수는 `Int`, 그 외 숫자는 `Float`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    /// `in` / `nin` 비교의 우변 전용
    List(Vec<Scalar>),
}

impl Scalar {
    pub fn is_null(&self) -> bool {
        matches!(self, Scalar::Null)
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Scalar::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Scalar::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl From<bool> for Scalar {
    fn from(value: bool) -> Self {
        Scalar::Bool(value)
    }
}

impl From<i64> for Scalar {
    fn from(value: i64) -> Self {
        Scalar::Int(value)
    }
}

impl From<i32> for Scalar {
    fn from(value: i32) -> Self {
        Scalar::Int(value.into())
    }
}

impl From<u32> for Scalar {
    fn from(value: u32) -> Self {
        Scalar::Int(value.into())
    }
}

impl From<f64> for Scalar {
    fn from(value: f64) -> Self {
        Scalar::Float(value)
    }
}

impl From<&str> for Scalar {
    fn from(value: &str) -> Self {
        Scalar::Text(value.to_string())
    }
}

impl From<String> for Scalar {
    fn from(value: String) -> Self {
        Scalar::Text(value)
    }
}

impl<T: Into<Scalar>> From<Vec<T>> for Scalar {
    fn from(values: Vec<T>) -> Self {
        Scalar::List(values.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Scalar>> From<Option<T>> for Scalar {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Scalar::Null)
    }
}

/// `[("name", "a".into()), ...]` 형태로 레코드 생성
pub fn record<K, I>(fields: I) -> Record
where
    K: Into<String>,
    I: IntoIterator<Item = (K, Scalar)>,
{
    fields.into_iter().map(|(k, v)| (k.into(), v)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalar_from_json() {
        let values: Vec<Scalar> = serde_json::from_str(r#"[null, true, 18, 1.5, "active", [1, 2]]"#).unwrap();
        assert_eq!(
            values,
            vec![
                Scalar::Null,
                Scalar::Bool(true),
                Scalar::Int(18),
                Scalar::Float(1.5),
                Scalar::Text("active".to_string()),
                Scalar::List(vec![Scalar::Int(1), Scalar::Int(2)]),
            ]
        );
    }

    #[test]
    fn test_record_preserves_key_order() {
        let rec: Record = serde_json::from_str(r#"{"zeta": 1, "alpha": "x", "mid": null}"#).unwrap();
        let keys: Vec<&str> = rec.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["zeta", "alpha", "mid"]);
    }
}
