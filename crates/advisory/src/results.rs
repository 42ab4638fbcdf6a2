//! 결과 조립 -- advisory를 발원 패키지에 귀속하고 소스별로 버킷화
//!
//! 그룹화는 패키지 단위로 수행되며 소스 경계를 넘지 않습니다.
//! 수화에 실패한 ID는 ID-only 레코드로 남겨 결과에서 사라지지 않게 합니다.
//! 설정의 ignore 목록에 있는 ID(별칭 포함)는 이 단계에서 제거됩니다.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use vigil_core::types::{PackageDetails, SourceInfo};

use crate::grouper::{group_by_alias, Group};
use crate::models::Vulnerability;

/// 한 패키지와 그에 매칭된 advisory + 그룹
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PackageVulns {
    pub package: PackageDetails,
    pub vulnerabilities: Vec<Vulnerability>,
    pub groups: Vec<Group>,
}

/// 한 소스의 결과 버킷
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PackageSource {
    pub source: SourceInfo,
    pub packages: Vec<PackageVulns>,
}

/// 전체 스캔 결과
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VulnerabilityResults {
    pub results: Vec<PackageSource>,
}

impl VulnerabilityResults {
    /// 하나라도 매칭된 취약점이 있는지 확인합니다 (종료 코드 결정용).
    pub fn has_vulnerabilities(&self) -> bool {
        self.results.iter().any(|r| !r.packages.is_empty())
    }

    /// 전체 매칭 취약점 수를 셉니다.
    pub fn vulnerability_count(&self) -> usize {
        self.results
            .iter()
            .flat_map(|r| &r.packages)
            .map(|p| p.vulnerabilities.len())
            .sum()
    }
}

/// 소스 하나의 결과 버킷을 조립합니다.
///
/// `ids_per_package[i]`는 `packages[i]`에 대한 배치 응답입니다
/// (위치 대응). 패키지 순서는 추출기의 정렬 순서를 그대로 따릅니다.
pub fn assemble_source(
    source: SourceInfo,
    packages: &[PackageDetails],
    ids_per_package: &[Vec<String>],
    hydrated: &BTreeMap<String, Vulnerability>,
    ignored: &[String],
) -> PackageSource {
    let mut result_packages = Vec::new();

    for (pkg, ids) in packages.iter().zip(ids_per_package) {
        let mut vulnerabilities: Vec<Vulnerability> = ids
            .iter()
            .map(|id| {
                hydrated.get(id).cloned().unwrap_or_else(|| Vulnerability::id_only(id.clone()))
            })
            .filter(|vuln| !is_ignored(vuln, ignored))
            .collect();

        if vulnerabilities.is_empty() {
            continue;
        }

        vulnerabilities.sort_by(|a, b| a.id.cmp(&b.id));
        vulnerabilities.dedup_by(|a, b| a.id == b.id);

        let groups = group_by_alias(&vulnerabilities);

        result_packages.push(PackageVulns {
            package: pkg.clone(),
            vulnerabilities,
            groups,
        });
    }

    PackageSource { source, packages: result_packages }
}

fn is_ignored(vuln: &Vulnerability, ignored: &[String]) -> bool {
    ignored.iter().any(|id| vuln.is_known_as(id))
}
