//! 에러 타입 — 도메인별 에러 정의
//!
//! 각 도메인 크레이트는 자체 에러 타입을 정의하고
//! `From` 구현을 통해 [`VigilError`]로 전파합니다.

/// vigil 최상위 에러 타입
#[derive(Debug, thiserror::Error)]
pub enum VigilError {
    /// 설정 관련 에러
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// lockfile 추출 에러
    #[error("extract error: {0}")]
    Extract(#[from] ExtractError),

    /// 취약점 질의 에러
    #[error("advisory error: {0}")]
    Advisory(#[from] AdvisoryError),

    /// 교정(remediation) 에러
    #[error("remediation error: {0}")]
    Remediation(#[from] RemediationError),

    /// I/O 에러
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// 설정 관련 에러
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// 설정 파일을 찾을 수 없음
    #[error("config file not found: {path}")]
    FileNotFound { path: String },

    /// 설정 파싱 실패
    #[error("failed to parse config: {reason}")]
    ParseFailed { reason: String },

    /// 유효하지 않은 설정 값
    #[error("invalid config value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}

/// lockfile 추출 에러
#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    /// 경로에 맞는 추출기가 없음
    #[error("could not determine extractor for {path}")]
    ExtractorNotFound { path: String },

    /// 요청한 이름의 추출기가 등록되어 있지 않음
    #[error("could not determine extractor, requested {requested}")]
    ExtractorNotRegistered { requested: String },

    /// 추출기는 선택되었으나 파일이 잘못됨
    #[error("could not extract from {path} (parsing as {parsed_as}): {reason}")]
    ParseFailed {
        /// 파싱 대상 파일 경로
        path: String,
        /// 사용한 파서 이름
        parsed_as: String,
        /// 실패 사유
        reason: String,
    },

    /// requirements.txt `-r` 포함 순환
    #[error("recursive include cycle detected at {path}")]
    IncludeCycle { path: String },

    /// 파일 I/O 에러
    #[error("io error: {path}: {source}")]
    Io {
        /// 관련 파일 경로
        path: String,
        /// 원본 I/O 에러
        source: std::io::Error,
    },
}

/// 취약점 질의 에러
#[derive(Debug, thiserror::Error)]
pub enum AdvisoryError {
    /// 일시적 전송 실패 (재시도 대상)
    #[error("transient network failure: {0}")]
    NetworkTransient(String),

    /// 재시도 한도 소진 후 실패 (배치 폐기)
    #[error("network failure after {attempts} attempts: {reason}")]
    NetworkFailed { attempts: u32, reason: String },

    /// 서버가 4xx로 거부 (재시도하지 않음)
    #[error("advisory service rejected request: status {status}")]
    Rejected { status: u16 },

    /// 응답 본문 해석 실패
    #[error("malformed advisory response: {0}")]
    MalformedResponse(String),

    /// 클라이언트 구성 실패
    #[error("client build error: {0}")]
    ClientBuild(String),

    /// 루트 컨텍스트 취소로 중단됨
    #[error("operation cancelled")]
    Cancelled,
}

/// 교정(remediation) 에러
#[derive(Debug, thiserror::Error)]
pub enum RemediationError {
    /// 오버라이드로 고칠 수 있는 취약점이 없음 (엔진 내부에서만 소비)
    #[error("cannot fix vulns by overrides")]
    OverrideImpossible,

    /// Maven 외 매니페스트에 대한 교정 요청
    #[error("unsupported ecosystem for manifest patching")]
    UnsupportedEcosystem,

    /// 리졸버 클라이언트 호출 실패
    #[error("resolution client error: {0}")]
    Client(String),
}
