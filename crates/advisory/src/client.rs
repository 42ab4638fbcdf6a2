//! 배치 질의 클라이언트
//!
//! 쿼리를 상한 크기의 배치로 쪼개 세마포어로 제한된 동시성으로 전송하고,
//! 응답의 위치 대응을 이용해 ID를 원래 쿼리에 재귀속합니다. 전체 레코드는
//! [`hydrate`](OsvClient::hydrate)의 2차 패스가 ID 중복 제거 후 가져옵니다.
//!
//! # 재시도 정책
//!
//! 일시적 실패(연결/타임아웃/5xx/429)는 지수 백오프 + 지터로 재시도하고,
//! 4xx는 해당 배치만 실패시킵니다. 실패한 배치는 결과에서 빠지고 나머지
//! 배치는 계속 진행됩니다. 취소는 중단 지점(전송 전, 백오프 중)에서
//! 협조적으로 반영됩니다.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use vigil_core::config::AdvisoryConfig;
use vigil_core::error::AdvisoryError;

use crate::models::{BatchedQuery, BatchedResponse, Query, Vulnerability};

/// 배치 질의 결과
///
/// `per_query[i]`는 i번째 쿼리에 매칭된 advisory ID 목록입니다.
/// 실패한 배치의 쿼리는 빈 목록으로 남고 에러는 `failures`에 쌓입니다.
#[derive(Debug, Default)]
pub struct BatchedVulnIds {
    pub per_query: Vec<Vec<String>>,
    pub failures: Vec<AdvisoryError>,
}

/// 수화 결과
#[derive(Debug, Default)]
pub struct HydratedVulns {
    pub vulns: BTreeMap<String, Vulnerability>,
    pub failures: Vec<AdvisoryError>,
}

/// 취약점 데이터베이스 클라이언트
pub struct OsvClient {
    http: reqwest::Client,
    base_url: String,
    batch_size: usize,
    max_concurrency: usize,
    max_attempts: u32,
    cancel: CancellationToken,
}

impl OsvClient {
    /// 설정과 루트 취소 토큰으로 클라이언트를 생성합니다.
    pub fn new(config: &AdvisoryConfig, cancel: CancellationToken) -> Result<Self, AdvisoryError> {
        let user_agent = format!("vigil/{}", env!("CARGO_PKG_VERSION"));
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(user_agent)
            .build()
            .map_err(|e| AdvisoryError::ClientBuild(e.to_string()))?;

        Ok(Self {
            http,
            base_url: config.endpoint.trim_end_matches('/').to_owned(),
            batch_size: config.batch_size,
            max_concurrency: config.max_concurrency,
            max_attempts: config.max_attempts,
            cancel,
        })
    }

    /// 모든 쿼리를 배치로 전송하고 위치 대응을 복원합니다.
    ///
    /// 취소된 경우에만 `Err`를 반환하며, 배치 단위 실패는
    /// [`BatchedVulnIds::failures`]로 보고됩니다.
    pub async fn query_batched(&self, queries: &[Query]) -> Result<BatchedVulnIds, AdvisoryError> {
        let mut outcome = BatchedVulnIds {
            per_query: vec![Vec::new(); queries.len()],
            ..BatchedVulnIds::default()
        };

        if queries.is_empty() {
            return Ok(outcome);
        }

        let semaphore = Arc::new(Semaphore::new(self.max_concurrency));
        let mut tasks: JoinSet<(usize, Result<Vec<Vec<String>>, AdvisoryError>)> = JoinSet::new();

        for (chunk_idx, chunk) in queries.chunks(self.batch_size).enumerate() {
            let semaphore = Arc::clone(&semaphore);
            let http = self.http.clone();
            let url = format!("{}/v1/querybatch", self.base_url);
            let chunk: Vec<Query> = chunk.to_vec();
            let max_attempts = self.max_attempts;
            let cancel = self.cancel.clone();

            tasks.spawn(async move {
                let _permit = match semaphore.acquire().await {
                    Ok(permit) => permit,
                    Err(_) => return (chunk_idx, Err(AdvisoryError::Cancelled)),
                };

                let result =
                    send_batch_with_retry(&http, &url, &chunk, max_attempts, &cancel).await;
                (chunk_idx, result)
            });
        }

        let mut cancelled = false;
        while let Some(joined) = tasks.join_next().await {
            let Ok((chunk_idx, result)) = joined else {
                continue; // 패닉한 태스크는 배치 실패로 취급
            };

            match result {
                Ok(ids_per_query) => {
                    let offset = chunk_idx * self.batch_size;
                    for (i, ids) in ids_per_query.into_iter().enumerate() {
                        outcome.per_query[offset + i] = ids;
                    }
                }
                Err(AdvisoryError::Cancelled) => cancelled = true,
                Err(e) => {
                    warn!(error = %e, chunk = chunk_idx, "query batch dropped");
                    outcome.failures.push(e);
                }
            }
        }

        if cancelled {
            return Err(AdvisoryError::Cancelled);
        }

        Ok(outcome)
    }

    /// ID 목록을 중복 제거한 뒤 전체 advisory 레코드를 가져옵니다.
    pub async fn hydrate<I>(&self, ids: I) -> Result<HydratedVulns, AdvisoryError>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        let unique: BTreeSet<String> =
            ids.into_iter().map(|id| id.as_ref().to_owned()).collect();

        let mut outcome = HydratedVulns::default();
        if unique.is_empty() {
            return Ok(outcome);
        }

        let semaphore = Arc::new(Semaphore::new(self.max_concurrency));
        let mut tasks: JoinSet<Result<Vulnerability, (String, AdvisoryError)>> = JoinSet::new();

        for id in unique {
            let semaphore = Arc::clone(&semaphore);
            let http = self.http.clone();
            let url = format!("{}/v1/vulns/{}", self.base_url, id);
            let max_attempts = self.max_attempts;
            let cancel = self.cancel.clone();

            tasks.spawn(async move {
                let _permit = match semaphore.acquire().await {
                    Ok(permit) => permit,
                    Err(_) => return Err((id, AdvisoryError::Cancelled)),
                };

                fetch_vuln_with_retry(&http, &url, max_attempts, &cancel)
                    .await
                    .map_err(|e| (id, e))
            });
        }

        let mut cancelled = false;
        while let Some(joined) = tasks.join_next().await {
            let Ok(result) = joined else {
                continue;
            };

            match result {
                Ok(vuln) => {
                    outcome.vulns.insert(vuln.id.clone(), vuln);
                }
                Err((_, AdvisoryError::Cancelled)) => cancelled = true,
                Err((id, e)) => {
                    warn!(id = %id, error = %e, "hydration failed for advisory");
                    outcome.failures.push(e);
                }
            }
        }

        if cancelled {
            return Err(AdvisoryError::Cancelled);
        }

        Ok(outcome)
    }
}

/// 상태 코드를 일시적/영구적 실패로 분류합니다.
fn classify_status(status: reqwest::StatusCode) -> Option<AdvisoryError> {
    if status.is_success() {
        return None;
    }

    if status.is_client_error() && status.as_u16() != 429 {
        return Some(AdvisoryError::Rejected { status: status.as_u16() });
    }

    Some(AdvisoryError::NetworkTransient(format!("status {status}")))
}

/// 시도 횟수에 따른 백오프를 계산합니다. 지터는 서브초 나노초에서 파생해
/// 동시 재시도가 몰리는 것을 막습니다.
fn backoff_delay(attempt: u32) -> Duration {
    const BASE_MS: u64 = 500;

    let jitter_ms = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| u64::from(d.subsec_nanos()) % (BASE_MS / 2))
        .unwrap_or(0);

    Duration::from_millis(BASE_MS * 2u64.pow(attempt.min(8)) + jitter_ms)
}

async fn send_batch_with_retry(
    http: &reqwest::Client,
    url: &str,
    chunk: &[Query],
    max_attempts: u32,
    cancel: &CancellationToken,
) -> Result<Vec<Vec<String>>, AdvisoryError> {
    let body = BatchedQuery { queries: chunk.to_vec() };
    let mut last_error = AdvisoryError::NetworkTransient("no attempt made".to_owned());

    for attempt in 0..max_attempts {
        if attempt > 0 {
            let delay = backoff_delay(attempt - 1);
            debug!(attempt, delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX), "retrying query batch");

            tokio::select! {
                _ = cancel.cancelled() => return Err(AdvisoryError::Cancelled),
                _ = tokio::time::sleep(delay) => {}
            }
        }

        if cancel.is_cancelled() {
            return Err(AdvisoryError::Cancelled);
        }

        let response = tokio::select! {
            _ = cancel.cancelled() => return Err(AdvisoryError::Cancelled),
            r = http.post(url).json(&body).send() => r,
        };

        match response {
            Ok(response) => match classify_status(response.status()) {
                None => {
                    let parsed: BatchedResponse = response
                        .json()
                        .await
                        .map_err(|e| AdvisoryError::MalformedResponse(e.to_string()))?;

                    if parsed.results.len() != chunk.len() {
                        return Err(AdvisoryError::MalformedResponse(format!(
                            "expected {} results, got {}",
                            chunk.len(),
                            parsed.results.len()
                        )));
                    }

                    return Ok(parsed
                        .results
                        .into_iter()
                        .map(|r| r.vulns.into_iter().map(|v| v.id).collect())
                        .collect());
                }
                Some(AdvisoryError::NetworkTransient(reason)) => {
                    last_error = AdvisoryError::NetworkTransient(reason);
                }
                Some(permanent) => return Err(permanent),
            },
            Err(e) => {
                last_error = AdvisoryError::NetworkTransient(e.to_string());
            }
        }
    }

    Err(AdvisoryError::NetworkFailed { attempts: max_attempts, reason: last_error.to_string() })
}

async fn fetch_vuln_with_retry(
    http: &reqwest::Client,
    url: &str,
    max_attempts: u32,
    cancel: &CancellationToken,
) -> Result<Vulnerability, AdvisoryError> {
    let mut last_error = AdvisoryError::NetworkTransient("no attempt made".to_owned());

    for attempt in 0..max_attempts {
        if attempt > 0 {
            let delay = backoff_delay(attempt - 1);

            tokio::select! {
                _ = cancel.cancelled() => return Err(AdvisoryError::Cancelled),
                _ = tokio::time::sleep(delay) => {}
            }
        }

        let response = tokio::select! {
            _ = cancel.cancelled() => return Err(AdvisoryError::Cancelled),
            r = http.get(url).send() => r,
        };

        match response {
            Ok(response) => match classify_status(response.status()) {
                None => {
                    return response
                        .json()
                        .await
                        .map_err(|e| AdvisoryError::MalformedResponse(e.to_string()));
                }
                Some(AdvisoryError::NetworkTransient(reason)) => {
                    last_error = AdvisoryError::NetworkTransient(reason);
                }
                Some(permanent) => return Err(permanent),
            },
            Err(e) => {
                last_error = AdvisoryError::NetworkTransient(e.to_string());
            }
        }
    }

    Err(AdvisoryError::NetworkFailed { attempts: max_attempts, reason: last_error.to_string() })
}

#[cfg(test)]
mod tests {
    use super::*;

    use vigil_core::types::SourceInfo;

    fn test_client(endpoint: &str) -> OsvClient {
        let config = AdvisoryConfig {
            endpoint: endpoint.to_owned(),
            batch_size: 2,
            max_concurrency: 2,
            max_attempts: 1,
            timeout_secs: 1,
        };
        OsvClient::new(&config, CancellationToken::new()).unwrap()
    }

    fn name_query(name: &str) -> Query {
        Query {
            commit: String::new(),
            version: "1.0.0".to_owned(),
            package: Some(crate::models::QueryPackage {
                name: name.to_owned(),
                ecosystem: "npm".to_owned(),
                purl: None,
            }),
            source: SourceInfo::lockfile("test.lock"),
        }
    }

    #[test]
    fn classify_status_buckets() {
        assert!(classify_status(reqwest::StatusCode::OK).is_none());
        assert!(matches!(
            classify_status(reqwest::StatusCode::BAD_REQUEST),
            Some(AdvisoryError::Rejected { status: 400 })
        ));
        assert!(matches!(
            classify_status(reqwest::StatusCode::TOO_MANY_REQUESTS),
            Some(AdvisoryError::NetworkTransient(_))
        ));
        assert!(matches!(
            classify_status(reqwest::StatusCode::BAD_GATEWAY),
            Some(AdvisoryError::NetworkTransient(_))
        ));
    }

    #[test]
    fn backoff_grows_exponentially() {
        let first = backoff_delay(0);
        let third = backoff_delay(2);
        assert!(first >= Duration::from_millis(500));
        assert!(third >= Duration::from_millis(2000));
        // 지터는 기본 간격의 절반 미만
        assert!(first < Duration::from_millis(750));
    }

    #[tokio::test]
    async fn empty_query_list_returns_empty_outcome() {
        let client = test_client("http://127.0.0.1:9");
        let outcome = client.query_batched(&[]).await.unwrap();
        assert!(outcome.per_query.is_empty());
        assert!(outcome.failures.is_empty());
    }

    #[tokio::test]
    async fn unreachable_endpoint_drops_batches_but_does_not_fail() {
        // 127.0.0.1:9 (discard)는 연결이 거부되므로 전 배치가 폐기됨
        let client = test_client("http://127.0.0.1:9");
        let queries = vec![name_query("a"), name_query("b"), name_query("c")];

        let outcome = client.query_batched(&queries).await.unwrap();

        assert_eq!(outcome.per_query.len(), 3);
        assert!(outcome.per_query.iter().all(Vec::is_empty));
        // batch_size=2 → 배치 2개, 둘 다 실패
        assert_eq!(outcome.failures.len(), 2);
        assert!(outcome
            .failures
            .iter()
            .all(|e| matches!(e, AdvisoryError::NetworkFailed { .. })));
    }

    #[tokio::test]
    async fn cancelled_token_aborts_query() {
        let config = AdvisoryConfig {
            endpoint: "http://127.0.0.1:9".to_owned(),
            ..AdvisoryConfig::default()
        };
        let cancel = CancellationToken::new();
        cancel.cancel();
        let client = OsvClient::new(&config, cancel).unwrap();

        let err = client.query_batched(&[name_query("a")]).await.unwrap_err();
        assert!(matches!(err, AdvisoryError::Cancelled));
    }

    #[tokio::test]
    async fn hydrate_empty_ids() {
        let client = test_client("http://127.0.0.1:9");
        let outcome = client.hydrate(Vec::<String>::new()).await.unwrap();
        assert!(outcome.vulns.is_empty());
    }

    #[tokio::test]
    async fn hydrate_deduplicates_ids_before_fetching() {
        let client = test_client("http://127.0.0.1:9");
        let outcome = client
            .hydrate(["OSV-1", "OSV-1", "OSV-1"])
            .await
            .unwrap();

        // 중복 제거 후 한 번만 시도하므로 실패도 하나
        assert_eq!(outcome.failures.len(), 1);
    }
}
