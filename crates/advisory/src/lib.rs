#![doc = include_str!("../README.md")]
//!
//! # Module Structure
//!
//! - [`models`]: OSV 레코드와 querybatch 와이어 타입
//! - [`query`]: 패키지 → 질의 좌표 변환
//! - [`client`]: 배치 질의 + 수화 클라이언트 (`OsvClient`)
//! - [`version`]: 생태계별 버전 비교
//! - [`affects`]: 영향 범위 판정
//! - [`grouper`]: 별칭 동치류 그룹화
//! - [`results`]: 소스별 결과 버킷 조립

pub mod affects;
pub mod client;
pub mod grouper;
pub mod models;
pub mod query;
pub mod results;
pub mod version;

// --- Public API Re-exports ---

pub use affects::is_affected;
pub use client::{BatchedVulnIds, HydratedVulns, OsvClient};
pub use grouper::{group_by_alias, Group};
pub use models::{Query, QueryPackage, Vulnerability};
pub use query::{make_purl, make_purl_query, make_query};
pub use results::{assemble_source, PackageSource, PackageVulns, VulnerabilityResults};
