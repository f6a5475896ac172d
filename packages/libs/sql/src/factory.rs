//! 연산별 SQL 조각 생성기
//!
//! 파라미터 객체를 받아 WHERE / ORDER BY / LIMIT / GROUP BY 텍스트와
//! 바인딩 값 목록을 만듭니다. 완성된 문장 조립은 실행 계층이 합니다.
//! 모든 메서드는 순수 함수이고, 에러는 조건 컴파일러의 것을 그대로 전달합니다.

use serde::Serialize;

use crate::condition::{compile, ConditionNode, Fragment};
use crate::error::{Error, Result};
use crate::params::{AggregationParams, CountParams, FindParams, RemoveParams, Sort, UpdateRequest};
use crate::policy::{Policy, SurplusPayloadPolicy};
use crate::value::{Record, Scalar};

/// find 조각
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FindFragment {
    /// 조건이 있을 때만 존재
    pub r#where: Option<Fragment>,
    pub order_by: Option<String>,
    pub limit: Option<String>,
}

impl FindFragment {
    pub fn values(&self) -> Vec<Scalar> {
        self.r#where
            .as_ref()
            .map(|w| w.values.clone())
            .unwrap_or_default()
    }
}

/// count 조각. WHERE는 항상 존재 (기본 `WHERE 1=1`)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CountFragment {
    pub r#where: Fragment,
}

/// remove 조각. 조건이 없으면 WHERE 텍스트가 빈 문자열
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RemoveFragment {
    pub r#where: Fragment,
}

impl RemoveFragment {
    pub fn is_unconditioned(&self) -> bool {
        self.r#where.is_empty()
    }
}

/// 행 하나의 update 조각
///
/// SET 절 값과 WHERE 절 값은 따로 보관합니다. 바인딩 순서는
/// `[...SET 값, ...WHERE 값]`이며 `bound_values()`가 이 순서로 합칩니다.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UpdateFragment {
    pub assignments: Vec<String>,
    pub values: Vec<Scalar>,
    pub r#where: Fragment,
}

impl UpdateFragment {
    pub fn set_clause(&self) -> String {
        self.assignments.join(", ")
    }

    pub fn bound_values(&self) -> Vec<Scalar> {
        self.values
            .iter()
            .chain(self.r#where.values.iter())
            .cloned()
            .collect()
    }
}

/// aggregate 조각
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregateFragment {
    pub select_list: String,
    pub r#where: Option<Fragment>,
    pub group_by: Option<String>,
    pub sort: Option<String>,
}

impl AggregateFragment {
    pub fn values(&self) -> Vec<Scalar> {
        self.r#where
            .as_ref()
            .map(|w| w.values.clone())
            .unwrap_or_default()
    }
}

/// 쿼리 조각 생성기
#[derive(Debug, Clone, Copy, Default)]
pub struct QueryFactory {
    policy: Policy,
}

impl QueryFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_policy(policy: Policy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &Policy {
        &self.policy
    }

    pub fn compile_find(&self, params: &FindParams) -> Result<FindFragment> {
        Ok(FindFragment {
            r#where: where_clause(params.condition.as_ref())?,
            order_by: params.sort.as_ref().and_then(order_by_clause),
            limit: limit_clause(params.limit, params.offset),
        })
    }

    pub fn compile_count(&self, params: &CountParams) -> Result<CountFragment> {
        Ok(CountFragment {
            r#where: compile(params.condition.as_ref())?.prefixed("WHERE"),
        })
    }

    pub fn compile_remove(&self, params: &RemoveParams) -> Result<RemoveFragment> {
        Ok(RemoveFragment {
            r#where: where_clause(params.condition.as_ref())?.unwrap_or_else(Fragment::empty),
        })
    }

    pub fn compile_update(&self, request: &UpdateRequest) -> Result<Vec<UpdateFragment>> {
        self.compile_update_pairs(&request.updates, &request.conditions)
    }

    /// `payloads[i]`를 `conditions[i]`와 짝지어 컴파일
    pub fn compile_update_pairs(
        &self,
        payloads: &[Record],
        conditions: &[ConditionNode],
    ) -> Result<Vec<UpdateFragment>> {
        if payloads.is_empty() {
            return Ok(Vec::new());
        }
        let Some(last) = conditions.last() else {
            return Err(Error::malformed("update requires at least one condition"));
        };

        payloads
            .iter()
            .enumerate()
            .map(|(index, fields)| {
                let condition = match conditions.get(index) {
                    Some(condition) => condition,
                    None => match self.policy.surplus_payload {
                        SurplusPayloadPolicy::ReuseLastCondition => {
                            tracing::debug!(index, "reusing last condition for surplus update payload");
                            last
                        }
                        SurplusPayloadPolicy::Reject => {
                            return Err(Error::UnpairedPayload {
                                index,
                                conditions: conditions.len(),
                            })
                        }
                    },
                };

                Ok(UpdateFragment {
                    assignments: fields.keys().map(|field| format!("{field} = ?")).collect(),
                    values: fields.values().cloned().collect(),
                    r#where: condition.compile()?.prefixed("WHERE"),
                })
            })
            .collect()
    }

    pub fn compile_aggregate(&self, params: &AggregationParams) -> Result<AggregateFragment> {
        let selectors = [
            ("SUM", &params.sum, "totalSum"),
            ("AVG", &params.average, "averageValue"),
            ("MIN", &params.min, "minValue"),
            ("MAX", &params.max, "maxValue"),
            ("COUNT", &params.count, "totalCount"),
        ];
        let select: Vec<String> = selectors
            .iter()
            .filter_map(|(func, field, alias)| {
                field.as_deref().map(|field| format!("{func}({field}) AS {alias}"))
            })
            .collect();

        let group_by = params
            .group_by
            .as_ref()
            .filter(|fields| !fields.is_empty())
            .map(|fields| format!("GROUP BY {}", fields.join(", ")));

        Ok(AggregateFragment {
            select_list: if select.is_empty() {
                "*".to_string()
            } else {
                select.join(", ")
            },
            r#where: where_clause(params.condition.as_ref())?,
            group_by,
            sort: params.sort.as_ref().and_then(order_by_clause),
        })
    }
}

fn where_clause(condition: Option<&ConditionNode>) -> Result<Option<Fragment>> {
    condition
        .map(|node| node.compile().map(|fragment| fragment.prefixed("WHERE")))
        .transpose()
}

fn order_by_clause(sort: &Sort) -> Option<String> {
    if sort.is_empty() {
        return None;
    }
    let columns: Vec<String> = sort
        .iter()
        .map(|(field, direction)| format!("{field} {}", direction.sql()))
        .collect();
    Some(format!("ORDER BY {}", columns.join(", ")))
}

fn limit_clause(limit: Option<u64>, offset: Option<u64>) -> Option<String> {
    match (limit, offset) {
        (Some(limit), Some(offset)) => Some(format!("LIMIT {offset}, {limit}")),
        (Some(limit), None) => Some(format!("LIMIT {limit}")),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::condition::Operator;
    use crate::value::record;

    fn factory() -> QueryFactory {
        QueryFactory::new()
    }

    #[test]
    fn test_find_limit_offset() {
        let both = factory()
            .compile_find(&FindParams {
                limit: Some(10),
                offset: Some(5),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(both.limit.as_deref(), Some("LIMIT 5, 10"));

        let limit_only = factory()
            .compile_find(&FindParams {
                limit: Some(10),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(limit_only.limit.as_deref(), Some("LIMIT 10"));

        let offset_only = factory()
            .compile_find(&FindParams {
                offset: Some(5),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(offset_only.limit, None);
    }

    #[test]
    fn test_find_without_condition_has_no_where() {
        let fragment = factory().compile_find(&FindParams::default()).unwrap();
        assert_eq!(fragment, FindFragment::default());
    }

    #[test]
    fn test_find_where_and_sort_order_preserved() {
        let params = FindParams {
            condition: Some(ConditionNode::leaf("age", Operator::Gte, 21)),
            sort: Some(Sort::new().desc("created_at").asc("name").asc("age")),
            ..Default::default()
        };
        let fragment = factory().compile_find(&params).unwrap();
        let r#where = fragment.r#where.clone().unwrap();
        assert_eq!(r#where.text, "WHERE age >= ?");
        assert_eq!(fragment.values(), vec![Scalar::Int(21)]);
        assert_eq!(
            fragment.order_by.as_deref(),
            Some("ORDER BY created_at DESC, name ASC, age ASC")
        );
    }

    #[test]
    fn test_count_and_remove_defaults_differ() {
        let count = factory().compile_count(&CountParams::default()).unwrap();
        assert_eq!(count.r#where.text, "WHERE 1=1");
        assert!(count.r#where.values.is_empty());

        let remove = factory().compile_remove(&RemoveParams::default()).unwrap();
        assert_eq!(remove.r#where.text, "");
        assert!(remove.is_unconditioned());
    }

    #[test]
    fn test_remove_with_condition() {
        let remove = factory()
            .compile_remove(&RemoveParams {
                condition: Some(ConditionNode::leaf("id", Operator::In, vec![1, 2, 3])),
            })
            .unwrap();
        assert_eq!(remove.r#where.text, "WHERE id IN ?");
        assert!(!remove.is_unconditioned());
    }

    #[test]
    fn test_update_reuses_last_condition() {
        let condition = ConditionNode::leaf("status", Operator::Eq, "pending");
        let request = UpdateRequest {
            updates: vec![
                record([("qty", Scalar::from(1))]),
                record([("qty", Scalar::from(2))]),
                record([("qty", Scalar::from(3))]),
            ],
            conditions: vec![condition],
        };

        let fragments = factory().compile_update(&request).unwrap();
        assert_eq!(fragments.len(), 3);
        for (i, fragment) in fragments.iter().enumerate() {
            assert_eq!(fragment.r#where.text, "WHERE status = ?");
            assert_eq!(fragment.r#where.values, vec![Scalar::from("pending")]);
            assert_eq!(fragment.values, vec![Scalar::from(i as i64 + 1)]);
        }
    }

    #[test]
    fn test_update_reject_policy() {
        let factory = QueryFactory::with_policy(Policy {
            surplus_payload: SurplusPayloadPolicy::Reject,
            ..Default::default()
        });
        let request = UpdateRequest {
            updates: vec![record([("a", Scalar::from(1))]), record([("a", Scalar::from(2))])],
            conditions: vec![ConditionNode::leaf("id", Operator::Eq, 1)],
        };
        let err = factory.compile_update(&request).unwrap_err();
        assert!(matches!(err, Error::UnpairedPayload { index: 1, conditions: 1 }));
    }

    #[test]
    fn test_update_value_ordering() {
        let request = UpdateRequest::single(
            record([("name", Scalar::from("bolt")), ("qty", Scalar::from(9))]),
            ConditionNode::and(vec![
                ConditionNode::leaf("id", Operator::Eq, 4),
                ConditionNode::leaf("qty", Operator::Lt, 100),
            ]),
        );
        let fragment = &factory().compile_update(&request).unwrap()[0];
        assert_eq!(fragment.set_clause(), "name = ?, qty = ?");
        assert_eq!(fragment.r#where.text, "WHERE (id = ?) AND (qty < ?)");
        assert_eq!(
            fragment.bound_values(),
            vec![Scalar::from("bolt"), Scalar::from(9), Scalar::from(4), Scalar::from(100)]
        );
    }

    #[test]
    fn test_update_without_conditions() {
        let request = UpdateRequest {
            updates: vec![record([("a", Scalar::from(1))])],
            conditions: vec![],
        };
        assert!(factory().compile_update(&request).unwrap_err().is_invalid_condition());
        assert!(factory().compile_update(&UpdateRequest::default()).unwrap().is_empty());
    }

    #[test]
    fn test_update_propagates_condition_errors() {
        let request = UpdateRequest::single(
            record([("a", Scalar::from(1))]),
            ConditionNode::or(vec![]),
        );
        assert!(factory().compile_update(&request).unwrap_err().is_invalid_condition());
    }

    #[test]
    fn test_aggregate_select_list() {
        let params = AggregationParams {
            sum: Some("amount".to_string()),
            average: Some("amount".to_string()),
            count: Some("id".to_string()),
            group_by: Some(vec!["region".to_string(), "year".to_string()]),
            sort: Some(Sort::new().desc("region")),
            condition: Some(ConditionNode::leaf("year", Operator::Gt, 2020)),
            ..Default::default()
        };
        let fragment = factory().compile_aggregate(&params).unwrap();
        assert_eq!(
            fragment.select_list,
            "SUM(amount) AS totalSum, AVG(amount) AS averageValue, COUNT(id) AS totalCount"
        );
        assert_eq!(fragment.group_by.as_deref(), Some("GROUP BY region, year"));
        assert_eq!(fragment.sort.as_deref(), Some("ORDER BY region DESC"));
        assert_eq!(fragment.r#where.as_ref().unwrap().text, "WHERE year > ?");
        assert_eq!(fragment.values(), vec![Scalar::Int(2020)]);
    }

    #[test]
    fn test_aggregate_without_selectors_selects_all() {
        let fragment = factory().compile_aggregate(&AggregationParams::default()).unwrap();
        assert_eq!(fragment.select_list, "*");
        assert!(fragment.r#where.is_none());
        assert!(fragment.group_by.is_none());
        assert!(fragment.sort.is_none());
    }

    #[test]
    fn test_min_max_aliases() {
        let params = AggregationParams {
            min: Some("price".to_string()),
            max: Some("price".to_string()),
            ..Default::default()
        };
        let fragment = factory().compile_aggregate(&params).unwrap();
        assert_eq!(fragment.select_list, "MIN(price) AS minValue, MAX(price) AS maxValue");
    }
}
