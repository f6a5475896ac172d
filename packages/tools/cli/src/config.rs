//! CLI 설정

use std::env;
use std::path::Path;

use rq_sql::Policy;

/// 실행 설정
#[derive(Debug, Clone)]
pub struct Config {
    /// DB URL (sqlx 형식)
    pub database_url: String,

    /// 풀 최대 연결 수
    pub max_connections: u32,
}

impl Config {
    /// 환경변수에서 설정 로드
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Self {
            database_url: env::var("RQ_DATABASE_URL")
                .unwrap_or_else(|_| "sqlite::memory:".to_string()),

            max_connections: env::var("RQ_MAX_CONNECTIONS")
                .unwrap_or_else(|_| "5".to_string())
                .parse()?,
        })
    }
}

/// 정책 파일 로드. 경로가 없으면 기본 정책
pub fn load_policy(path: Option<&Path>) -> anyhow::Result<Policy> {
    let Some(path) = path else {
        return Ok(Policy::default());
    };
    let content = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("Cannot read policy file {}: {}", path.display(), e))?;
    Ok(serde_json::from_str(&content)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rq_sql::policy::NonNumericCountPolicy;

    #[test]
    fn test_load_policy_default() {
        assert_eq!(load_policy(None).unwrap(), Policy::default());
    }

    #[test]
    fn test_load_policy_file() {
        let path = std::env::temp_dir().join(format!("rq-policy-{}.json", std::process::id()));
        std::fs::write(&path, r#"{ "nonNumericCount": "error" }"#).unwrap();
        let policy = load_policy(Some(&path)).unwrap();
        std::fs::remove_file(&path).ok();
        assert_eq!(policy.non_numeric_count, NonNumericCountPolicy::Error);
    }
}
