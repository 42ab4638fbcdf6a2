//! 리졸버 클라이언트 seam
//!
//! 엔진이 버전 목록 조회와 매니페스트 재해결에 사용하는 유일한 외부
//! 의존성입니다. 동시 사용에 안전해야 합니다 (시도들이 공유).

use async_trait::async_trait;

use vigil_core::error::RemediationError;

use crate::model::{Manifest, PackageKey, ResolutionResult};

/// 의존성 해결 클라이언트
#[async_trait]
pub trait ResolutionClient: Send + Sync {
    /// 패키지의 모든 공개 버전을 반환합니다 (정렬 보장 없음).
    async fn versions(&self, package: &PackageKey) -> Result<Vec<String>, RemediationError>;

    /// 매니페스트를 해결하고 매칭된 취약점을 채워 반환합니다.
    async fn resolve(&self, manifest: &Manifest) -> Result<ResolutionResult, RemediationError>;
}
