//! 조건 트리와 컴파일러
//!
//! 조건 트리는 리프 비교(`Condition`)와 AND/OR 그룹(`ConditionGroup`)의
//! 합 타입입니다. 형태 판별은 생성(JSON 파싱) 시점에 한 번만 하고,
//! 컴파일러는 두 변형을 패턴 매칭합니다.
//!
//! # JSON 형태
//!
//! ```json
//! { "field": "age", "operator": "gt", "value": 18 }
//! { "operator": "or", "conditions": [ { ... }, { ... } ] }
//! ```
//!
//! 리프는 `left`/`right` 키도 받습니다.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::{Error, Result};
use crate::value::Scalar;

/// 조건이 없을 때 사용하는 항상 참인 술어
pub const NEUTRAL_TRUE: &str = "1=1";

/// 비교 연산자 (닫힌 집합)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    Eq,
    Ne,
    Gt,
    Lt,
    Gte,
    Lte,
    In,
    Nin,
    Like,
}

impl Operator {
    pub const ALL: [Operator; 9] = [
        Operator::Eq,
        Operator::Ne,
        Operator::Gt,
        Operator::Lt,
        Operator::Gte,
        Operator::Lte,
        Operator::In,
        Operator::Nin,
        Operator::Like,
    ];

    /// SQL 비교 토큰
    pub fn sql(&self) -> &'static str {
        match self {
            Operator::Eq => "=",
            Operator::Ne => "!=",
            Operator::Gt => ">",
            Operator::Lt => "<",
            Operator::Gte => ">=",
            Operator::Lte => "<=",
            Operator::In => "IN",
            Operator::Nin => "NOT IN",
            Operator::Like => "LIKE",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Operator::Eq => "eq",
            Operator::Ne => "ne",
            Operator::Gt => "gt",
            Operator::Lt => "lt",
            Operator::Gte => "gte",
            Operator::Lte => "lte",
            Operator::In => "in",
            Operator::Nin => "nin",
            Operator::Like => "like",
        }
    }
}

impl FromStr for Operator {
    type Err = Error;

    /// `gt`, `GT`, `$gt` 모두 허용
    fn from_str(s: &str) -> Result<Self> {
        let name = s.strip_prefix('$').unwrap_or(s).to_ascii_lowercase();
        match name.as_str() {
            "eq" => Ok(Operator::Eq),
            "ne" => Ok(Operator::Ne),
            "gt" => Ok(Operator::Gt),
            "lt" => Ok(Operator::Lt),
            "gte" => Ok(Operator::Gte),
            "lte" => Ok(Operator::Lte),
            "in" => Ok(Operator::In),
            "nin" | "notin" => Ok(Operator::Nin),
            "like" => Ok(Operator::Like),
            _ => Err(Error::UnsupportedOperator(s.to_string())),
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 그룹 결합자
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BooleanJoiner {
    And,
    Or,
}

impl BooleanJoiner {
    fn separator(&self) -> &'static str {
        match self {
            BooleanJoiner::And => " AND ",
            BooleanJoiner::Or => " OR ",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BooleanJoiner::And => "and",
            BooleanJoiner::Or => "or",
        }
    }
}

impl FromStr for BooleanJoiner {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "and" => Ok(BooleanJoiner::And),
            "or" => Ok(BooleanJoiner::Or),
            _ => Err(Error::UnsupportedJoiner(s.to_string())),
        }
    }
}

/// 리프 비교: `<field> <op> ?`
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    pub field: String,
    pub operator: Operator,
    pub value: Scalar,
}

impl Condition {
    pub fn new(field: impl Into<String>, operator: Operator, value: impl Into<Scalar>) -> Self {
        Self {
            field: field.into(),
            operator,
            value: value.into(),
        }
    }

    /// 연산자 이름을 문자열로 받아 생성
    pub fn parse(field: impl Into<String>, operator: &str, value: impl Into<Scalar>) -> Result<Self> {
        Ok(Self::new(field, operator.parse()?, value))
    }
}

/// AND/OR 그룹
#[derive(Debug, Clone, PartialEq)]
pub struct ConditionGroup {
    pub joiner: BooleanJoiner,
    pub children: Vec<ConditionNode>,
}

/// 조건 트리 노드
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Value", into = "Value")]
pub enum ConditionNode {
    Leaf(Condition),
    Group(ConditionGroup),
}

impl ConditionNode {
    pub fn leaf(field: impl Into<String>, operator: Operator, value: impl Into<Scalar>) -> Self {
        ConditionNode::Leaf(Condition::new(field, operator, value))
    }

    pub fn and(children: Vec<ConditionNode>) -> Self {
        ConditionNode::Group(ConditionGroup {
            joiner: BooleanJoiner::And,
            children,
        })
    }

    pub fn or(children: Vec<ConditionNode>) -> Self {
        ConditionNode::Group(ConditionGroup {
            joiner: BooleanJoiner::Or,
            children,
        })
    }

    /// JSON에서 노드 생성
    ///
    /// `conditions` 키가 있으면 그룹, 없으면 리프로 해석합니다.
    /// 어느 쪽 형태도 아니면 `MalformedCondition`.
    pub fn from_json(value: &Value) -> Result<Self> {
        let Value::Object(obj) = value else {
            return Err(Error::malformed("condition must be a JSON object"));
        };

        if let Some(children) = obj.get("conditions") {
            let joiner = obj
                .get("operator")
                .and_then(Value::as_str)
                .ok_or_else(|| Error::malformed("condition group is missing its operator"))?
                .parse::<BooleanJoiner>()?;
            let Value::Array(items) = children else {
                return Err(Error::malformed("group conditions must be an array"));
            };
            if items.is_empty() {
                return Err(Error::malformed("condition group has no children"));
            }
            let children = items.iter().map(Self::from_json).collect::<Result<Vec<_>>>()?;
            return Ok(ConditionNode::Group(ConditionGroup { joiner, children }));
        }

        let field = obj.get("field").or_else(|| obj.get("left"));
        let operand = obj.get("value").or_else(|| obj.get("right"));
        match (field, operand) {
            (Some(Value::String(field)), Some(operand)) => {
                let operator = obj
                    .get("operator")
                    .and_then(Value::as_str)
                    .ok_or_else(|| Error::malformed(format!("condition on '{field}' is missing its operator")))?
                    .parse::<Operator>()?;
                let value: Scalar = serde_json::from_value(operand.clone()).map_err(|_| {
                    Error::malformed(format!("unsupported value for field '{field}'"))
                })?;
                Ok(ConditionNode::Leaf(Condition {
                    field: field.clone(),
                    operator,
                    value,
                }))
            }
            _ => Err(Error::malformed(
                "expected a leaf {field, operator, value} or a group {operator, conditions}",
            )),
        }
    }

    /// 노드를 SQL 술어로 컴파일
    pub fn compile(&self) -> Result<Fragment> {
        let mut values = Vec::new();
        let text = self.write(&mut values)?;
        Ok(Fragment { text, values })
    }

    // 전위 순회, 왼쪽부터. 값은 플레이스홀더가 텍스트에 나타나는 순서대로 쌓인다.
    fn write(&self, values: &mut Vec<Scalar>) -> Result<String> {
        match self {
            ConditionNode::Leaf(cond) => {
                if cond.field.is_empty() {
                    return Err(Error::malformed("condition field is empty"));
                }
                values.push(cond.value.clone());
                Ok(format!("{} {} ?", cond.field, cond.operator.sql()))
            }
            ConditionNode::Group(group) => {
                if group.children.is_empty() {
                    return Err(Error::malformed("condition group has no children"));
                }
                let parts = group
                    .children
                    .iter()
                    .map(|child| child.write(values).map(|text| format!("({text})")))
                    .collect::<Result<Vec<_>>>()?;
                Ok(parts.join(group.joiner.separator()))
            }
        }
    }

    /// 트리 안의 리프 개수
    pub fn leaf_count(&self) -> usize {
        match self {
            ConditionNode::Leaf(_) => 1,
            ConditionNode::Group(group) => group.children.iter().map(Self::leaf_count).sum(),
        }
    }
}

impl From<Condition> for ConditionNode {
    fn from(cond: Condition) -> Self {
        ConditionNode::Leaf(cond)
    }
}

impl From<ConditionGroup> for ConditionNode {
    fn from(group: ConditionGroup) -> Self {
        ConditionNode::Group(group)
    }
}

impl TryFrom<Value> for ConditionNode {
    type Error = Error;

    fn try_from(value: Value) -> Result<Self> {
        Self::from_json(&value)
    }
}

impl From<ConditionNode> for Value {
    fn from(node: ConditionNode) -> Self {
        match node {
            ConditionNode::Leaf(cond) => json!({
                "field": cond.field,
                "operator": cond.operator.as_str(),
                "value": cond.value,
            }),
            ConditionNode::Group(group) => json!({
                "operator": group.joiner.as_str(),
                "conditions": group.children.into_iter().map(Value::from).collect::<Vec<_>>(),
            }),
        }
    }
}

/// 컴파일 결과: SQL 텍스트 + 플레이스홀더 순서대로 정렬된 값
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Fragment {
    pub text: String,
    pub values: Vec<Scalar>,
}

impl Fragment {
    pub fn new(text: impl Into<String>, values: Vec<Scalar>) -> Self {
        Self {
            text: text.into(),
            values,
        }
    }

    /// `1=1`, 값 없음
    pub fn neutral() -> Self {
        Self::new(NEUTRAL_TRUE, Vec::new())
    }

    /// 빈 텍스트, 값 없음
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// 텍스트 앞에 키워드를 붙인다 (`WHERE`, ...)
    pub fn prefixed(self, keyword: &str) -> Self {
        Self {
            text: format!("{keyword} {}", self.text),
            values: self.values,
        }
    }
}

/// 조건 노드 컴파일. `None`은 항상 참인 술어(`1=1`)가 됩니다.
pub fn compile(node: Option<&ConditionNode>) -> Result<Fragment> {
    match node {
        Some(node) => node.compile(),
        None => Ok(Fragment::neutral()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn placeholders(text: &str) -> usize {
        text.matches('?').count()
    }

    #[test]
    fn test_compile_none_is_neutral_true() {
        let fragment = compile(None).unwrap();
        assert_eq!(fragment.text, "1=1");
        assert!(fragment.values.is_empty());
    }

    #[test]
    fn test_compile_leaf() {
        for op in Operator::ALL {
            let node = ConditionNode::leaf("age", op, 18);
            let fragment = node.compile().unwrap();
            assert_eq!(fragment.text, format!("age {} ?", op.sql()));
            assert_eq!(placeholders(&fragment.text), 1);
            assert_eq!(fragment.values, vec![Scalar::Int(18)]);
        }
    }

    #[test]
    fn test_compile_or_group() {
        let node = ConditionNode::or(vec![
            ConditionNode::leaf("age", Operator::Gt, 18),
            ConditionNode::leaf("status", Operator::Eq, "active"),
        ]);
        let fragment = node.compile().unwrap();
        assert_eq!(fragment.text, "(age > ?) OR (status = ?)");
        assert_eq!(fragment.values, vec![Scalar::Int(18), Scalar::from("active")]);
    }

    #[test]
    fn test_compile_nested_preorder() {
        let node = ConditionNode::and(vec![
            ConditionNode::leaf("a", Operator::Eq, 1),
            ConditionNode::or(vec![
                ConditionNode::leaf("b", Operator::Lt, 2),
                ConditionNode::and(vec![
                    ConditionNode::leaf("c", Operator::In, vec![3, 4]),
                    ConditionNode::leaf("d", Operator::Like, "x%"),
                ]),
            ]),
            ConditionNode::leaf("e", Operator::Nin, vec!["p", "q"]),
        ]);
        let fragment = node.compile().unwrap();
        assert_eq!(
            fragment.text,
            "(a = ?) AND ((b < ?) OR ((c IN ?) AND (d LIKE ?))) AND (e NOT IN ?)"
        );
        assert_eq!(placeholders(&fragment.text), node.leaf_count());
        assert_eq!(fragment.values.len(), 5);
        assert_eq!(fragment.values[0], Scalar::Int(1));
        assert_eq!(fragment.values[1], Scalar::Int(2));
        assert_eq!(fragment.values[2], Scalar::from(vec![3, 4]));
        assert_eq!(fragment.values[3], Scalar::from("x%"));
        assert_eq!(fragment.values[4], Scalar::from(vec!["p", "q"]));
    }

    #[test]
    fn test_compile_is_idempotent() {
        let node = ConditionNode::or(vec![
            ConditionNode::leaf("x", Operator::Gte, 1.5),
            ConditionNode::leaf("y", Operator::Ne, Scalar::Null),
        ]);
        assert_eq!(node.compile().unwrap(), node.compile().unwrap());
    }

    #[test]
    fn test_value_never_interpolated() {
        let node = ConditionNode::leaf("name", Operator::Eq, "'; DROP TABLE users; --");
        let fragment = node.compile().unwrap();
        assert_eq!(fragment.text, "name = ?");
        assert!(!fragment.text.contains("DROP"));
    }

    #[test]
    fn test_unknown_operators_rejected() {
        for op in ["between", "regex", "exists", "", "===", "is", "eqq", "not like"] {
            let err = Condition::parse("age", op, 1).unwrap_err();
            assert!(err.is_invalid_condition(), "operator {op:?} should be rejected");

            let json = json!({ "field": "age", "operator": op, "value": 1 });
            let err = ConditionNode::from_json(&json).unwrap_err();
            assert!(err.is_invalid_condition(), "operator {op:?} should be rejected");
        }
    }

    #[test]
    fn test_operator_parsing() {
        assert_eq!("gt".parse::<Operator>().unwrap(), Operator::Gt);
        assert_eq!("GTE".parse::<Operator>().unwrap(), Operator::Gte);
        assert_eq!("$in".parse::<Operator>().unwrap(), Operator::In);
        assert_eq!("notIn".parse::<Operator>().unwrap(), Operator::Nin);
    }

    #[test]
    fn test_from_json_shapes() {
        let node = ConditionNode::from_json(&json!({
            "operator": "OR",
            "conditions": [
                { "field": "age", "operator": "gt", "value": 18 },
                { "left": "status", "operator": "eq", "right": "active" }
            ]
        }))
        .unwrap();
        assert_eq!(node.compile().unwrap().text, "(age > ?) OR (status = ?)");

        let malformed = [
            json!("age > 18"),
            json!({ "field": "age" }),
            json!({ "value": 1, "operator": "eq" }),
            json!({ "operator": "and", "conditions": [] }),
            json!({ "operator": "and", "conditions": { "field": "a" } }),
            json!({ "operator": "xor", "conditions": [{ "field": "a", "operator": "eq", "value": 1 }] }),
            json!({ "field": "a", "operator": "eq", "value": { "nested": true } }),
        ];
        for value in malformed {
            let err = ConditionNode::from_json(&value).unwrap_err();
            assert!(err.is_invalid_condition(), "{value} should be rejected");
        }
    }

    #[test]
    fn test_empty_group_and_field_rejected_at_compile() {
        let empty = ConditionNode::and(vec![]);
        assert!(empty.compile().unwrap_err().is_invalid_condition());

        let blank = ConditionNode::leaf("", Operator::Eq, 1);
        assert!(blank.compile().unwrap_err().is_invalid_condition());
    }

    #[test]
    fn test_serde_roundtrip_through_params_shape() {
        let node: ConditionNode = serde_json::from_str(
            r#"{ "operator": "and", "conditions": [{ "field": "a", "operator": "lte", "value": 3 }] }"#,
        )
        .unwrap();
        let value = serde_json::to_value(&node).unwrap();
        assert_eq!(value["conditions"][0]["operator"], "lte");
    }
}
