//! 설정 관리 — vigil.toml 파싱 및 런타임 설정
//!
//! `--config` 플래그로 지정된 TOML 파일을 [`VigilConfig`]로 읽습니다.
//! 파일이나 필드가 없으면 기본값을 사용하며, `validate()`가
//! 터무니없는 값(0 배치 크기 등)을 거부합니다.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// vigil 통합 설정
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct VigilConfig {
    /// 스캔 설정
    pub scan: ScanConfig,
    /// 취약점 질의 설정
    pub advisory: AdvisoryConfig,
    /// 결과에서 제외할 취약점 ID 목록 (별칭 포함 매칭)
    pub ignored_vulns: Vec<String>,
}

/// 스캔 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// 동시 파싱 워커 수 상한
    pub workers: usize,
    /// lockfile 최대 허용 크기 (바이트)
    pub max_file_size: usize,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            workers: 8,
            max_file_size: 10 * 1024 * 1024, // 10 MB
        }
    }
}

/// 취약점 질의 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AdvisoryConfig {
    /// 취약점 데이터베이스 호스트
    pub endpoint: String,
    /// 요청당 최대 쿼리 수
    pub batch_size: usize,
    /// 동시 배치 요청 수 상한
    pub max_concurrency: usize,
    /// 배치당 최대 시도 횟수 (일시적 실패 재시도 포함)
    pub max_attempts: u32,
    /// 배치당 타임아웃 (초)
    pub timeout_secs: u64,
}

impl Default for AdvisoryConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://api.osv.dev".to_owned(),
            batch_size: 1000,
            max_concurrency: 4,
            max_attempts: 4,
            timeout_secs: 30,
        }
    }
}

/// 설정 상한값 상수
const MAX_BATCH_SIZE: usize = 1000;
const MAX_WORKERS: usize = 256;

impl VigilConfig {
    /// TOML 파일에서 설정을 로드합니다.
    ///
    /// 파일이 존재하지 않으면 `ConfigError::FileNotFound`를 반환합니다.
    pub fn load_from_path(path: &std::path::Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ConfigError::FileNotFound { path: path.display().to_string() }
            } else {
                ConfigError::ParseFailed { reason: e.to_string() }
            }
        })?;

        let config: Self =
            toml::from_str(&content).map_err(|e| ConfigError::ParseFailed { reason: e.to_string() })?;

        config.validate()?;
        Ok(config)
    }

    /// 설정 값의 유효성을 검증합니다.
    ///
    /// # 검증 규칙
    ///
    /// - `scan.workers`: 1-256
    /// - `advisory.batch_size`: 1-1000 (서비스 측 상한)
    /// - `advisory.max_concurrency`: 1 이상
    /// - `advisory.max_attempts`: 1 이상
    /// - `advisory.endpoint`: 비어있으면 안 됨
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.scan.workers == 0 || self.scan.workers > MAX_WORKERS {
            return Err(ConfigError::InvalidValue {
                field: "scan.workers".to_owned(),
                reason: format!("must be 1-{MAX_WORKERS}"),
            });
        }

        if self.scan.max_file_size == 0 {
            return Err(ConfigError::InvalidValue {
                field: "scan.max_file_size".to_owned(),
                reason: "must be greater than 0".to_owned(),
            });
        }

        if self.advisory.batch_size == 0 || self.advisory.batch_size > MAX_BATCH_SIZE {
            return Err(ConfigError::InvalidValue {
                field: "advisory.batch_size".to_owned(),
                reason: format!("must be 1-{MAX_BATCH_SIZE}"),
            });
        }

        if self.advisory.max_concurrency == 0 {
            return Err(ConfigError::InvalidValue {
                field: "advisory.max_concurrency".to_owned(),
                reason: "must be greater than 0".to_owned(),
            });
        }

        if self.advisory.max_attempts == 0 {
            return Err(ConfigError::InvalidValue {
                field: "advisory.max_attempts".to_owned(),
                reason: "must be greater than 0".to_owned(),
            });
        }

        if self.advisory.endpoint.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "advisory.endpoint".to_owned(),
                reason: "endpoint must not be empty".to_owned(),
            });
        }

        Ok(())
    }
}
