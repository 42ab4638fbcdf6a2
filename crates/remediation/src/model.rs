//! 교정 도메인 타입 -- 해결 그래프, 매니페스트, diff
//!
//! [`ResolutionResult`]는 매니페스트 하나를 해결한 결과와 매칭된
//! 취약점(문제 체인 포함)을 담습니다. 엔진은 이를 복제해서만 다루며
//! 원본은 변경하지 않습니다.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use vigil_advisory::models::Vulnerability;
use vigil_core::types::Ecosystem;

/// 패키지 식별자 (생태계 + 이름)
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PackageKey {
    pub ecosystem: Ecosystem,
    pub name: String,
}

/// 특정 해결 버전 식별자
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct VersionKey {
    pub package_key: PackageKey,
    pub version: String,
}

/// 매니페스트의 요구사항 하나
///
/// `origin`은 요구사항의 출처입니다 (Maven의 `management` 등).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequirementVersion {
    pub version_key: VersionKey,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin: Option<String>,
}

/// 해결 대상 매니페스트
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    pub ecosystem: Ecosystem,
    pub requirements: Vec<RequirementVersion>,
}

/// 루트 요구사항에서 취약 버전까지의 의존성 경로
///
/// 체인의 끝이 영향을 받는 의존성의 [`VersionKey`]입니다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyChain {
    pub nodes: Vec<VersionKey>,
}

impl DependencyChain {
    /// 체인 끝의 VersionKey를 반환합니다.
    pub fn end(&self) -> Option<&VersionKey> {
        self.nodes.last()
    }
}

/// 해결 그래프에서 매칭된 취약점 하나
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolutionVuln {
    pub vulnerability: Vulnerability,
    #[serde(default)]
    pub problem_chains: Vec<DependencyChain>,
    #[serde(default)]
    pub non_problem_chains: Vec<DependencyChain>,
}

/// 매니페스트 해결 결과
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolutionResult {
    pub manifest: Manifest,
    pub vulns: Vec<ResolutionVuln>,
}

impl ResolutionResult {
    /// 술어를 만족하지 않는 취약점을 제거합니다.
    pub fn filter_vulns(&mut self, predicate: impl Fn(&ResolutionVuln) -> bool) {
        self.vulns.retain(|v| predicate(v));
    }
}

/// 버전 오버라이드 패치 하나
///
/// 불변 조건: `new_version`은 생태계 버전 순서에서 `orig_version`보다
/// 순증가해야 합니다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyPatch {
    pub package_key: PackageKey,
    pub orig_version: String,
    pub new_version: String,
}

impl DependencyPatch {
    /// (package_key, orig_version, new_version) 사전식 전순서
    fn total_cmp(&self, other: &Self) -> Ordering {
        self.package_key
            .cmp(&other.package_key)
            .then_with(|| self.orig_version.cmp(&other.orig_version))
            .then_with(|| self.new_version.cmp(&other.new_version))
    }
}

/// 시도 하나의 결과 diff
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolutionDiff {
    /// 적용된 오버라이드 패치 (정렬됨)
    pub patches: Vec<DependencyPatch>,
    /// 패치로 새로 생긴 취약점 ID (정렬됨)
    pub added_vulns: Vec<String>,
    /// 패치로 제거된 취약점 ID (정렬됨)
    pub removed_vulns: Vec<String>,
}

impl ResolutionDiff {
    /// (patches, added_vulns, removed_vulns) 전체를 덮는 전순서 비교.
    ///
    /// 세 필드를 모두 비교해야 서로 다른 diff가 중복 제거에서
    /// 합쳐지지 않습니다.
    pub fn total_cmp(&self, other: &Self) -> Ordering {
        let by_patches = compare_slices(&self.patches, &other.patches, DependencyPatch::total_cmp);
        by_patches
            .then_with(|| self.added_vulns.cmp(&other.added_vulns))
            .then_with(|| self.removed_vulns.cmp(&other.removed_vulns))
    }
}

fn compare_slices<T>(a: &[T], b: &[T], cmp: impl Fn(&T, &T) -> Ordering) -> Ordering {
    for (x, y) in a.iter().zip(b) {
        let ordering = cmp(x, y);
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    a.len().cmp(&b.len())
}

/// 원본과 패치된 결과를 비교해 diff를 만듭니다.
///
/// 취약점은 ID 기준으로 비교하며, 결과의 세 목록 모두 정렬되어
/// 결정적입니다.
pub fn calculate_diff(
    original: &ResolutionResult,
    patched: &ResolutionResult,
    patches: &[DependencyPatch],
) -> ResolutionDiff {
    let original_ids: std::collections::BTreeSet<&str> =
        original.vulns.iter().map(|v| v.vulnerability.id.as_str()).collect();
    let patched_ids: std::collections::BTreeSet<&str> =
        patched.vulns.iter().map(|v| v.vulnerability.id.as_str()).collect();

    let added_vulns =
        patched_ids.difference(&original_ids).map(|id| (*id).to_owned()).collect();
    let removed_vulns =
        original_ids.difference(&patched_ids).map(|id| (*id).to_owned()).collect();

    let mut patches = patches.to_vec();
    patches.sort_by(DependencyPatch::total_cmp);

    ResolutionDiff { patches, added_vulns, removed_vulns }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn maven_key(name: &str) -> PackageKey {
        PackageKey { ecosystem: Ecosystem::Maven, name: name.to_owned() }
    }

    fn patch(name: &str, orig: &str, new: &str) -> DependencyPatch {
        DependencyPatch {
            package_key: maven_key(name),
            orig_version: orig.to_owned(),
            new_version: new.to_owned(),
        }
    }

    fn result_with_ids(ids: &[&str]) -> ResolutionResult {
        ResolutionResult {
            manifest: Manifest { ecosystem: Ecosystem::Maven, requirements: vec![] },
            vulns: ids
                .iter()
                .map(|id| ResolutionVuln {
                    vulnerability: Vulnerability::id_only(*id),
                    problem_chains: vec![],
                    non_problem_chains: vec![],
                })
                .collect(),
        }
    }

    #[test]
    fn chain_end_is_last_node() {
        let chain = DependencyChain {
            nodes: vec![
                VersionKey { package_key: maven_key("root"), version: "1.0.0".to_owned() },
                VersionKey { package_key: maven_key("leaf"), version: "0.1.0".to_owned() },
            ],
        };
        assert_eq!(chain.end().unwrap().package_key.name, "leaf");

        let empty = DependencyChain { nodes: vec![] };
        assert!(empty.end().is_none());
    }

    #[test]
    fn filter_vulns_retains_matching() {
        let mut result = result_with_ids(&["A", "B", "C"]);
        result.filter_vulns(|v| v.vulnerability.id != "B");

        let ids: Vec<&str> = result.vulns.iter().map(|v| v.vulnerability.id.as_str()).collect();
        assert_eq!(ids, vec!["A", "C"]);
    }

    #[test]
    fn diff_computes_added_and_removed() {
        let original = result_with_ids(&["A", "B"]);
        let patched = result_with_ids(&["B", "C"]);

        let diff = calculate_diff(&original, &patched, &[]);
        assert_eq!(diff.added_vulns, vec!["C"]);
        assert_eq!(diff.removed_vulns, vec!["A"]);
    }

    #[test]
    fn diff_sorts_patches() {
        let original = result_with_ids(&[]);
        let patched = result_with_ids(&[]);

        let diff = calculate_diff(
            &original,
            &patched,
            &[patch("zzz", "1.0.0", "2.0.0"), patch("aaa", "1.0.0", "2.0.0")],
        );

        assert_eq!(diff.patches[0].package_key.name, "aaa");
        assert_eq!(diff.patches[1].package_key.name, "zzz");
    }

    #[test]
    fn total_cmp_is_total_over_all_fields() {
        let base = ResolutionDiff {
            patches: vec![patch("a", "1.0.0", "2.0.0")],
            added_vulns: vec![],
            removed_vulns: vec!["V-1".to_owned()],
        };

        // 같은 패치, 다른 removed 목록 → 서로 달라야 함
        let other = ResolutionDiff { removed_vulns: vec!["V-2".to_owned()], ..base.clone() };
        assert_ne!(base.total_cmp(&other), Ordering::Equal);

        // 같은 패치, 다른 added 목록 → 서로 달라야 함
        let other = ResolutionDiff { added_vulns: vec!["V-3".to_owned()], ..base.clone() };
        assert_ne!(base.total_cmp(&other), Ordering::Equal);

        // 완전히 같으면 Equal
        assert_eq!(base.total_cmp(&base.clone()), Ordering::Equal);
    }

    #[test]
    fn total_cmp_orders_by_patch_list_prefix() {
        let short = ResolutionDiff {
            patches: vec![patch("a", "1.0.0", "2.0.0")],
            added_vulns: vec![],
            removed_vulns: vec![],
        };
        let long = ResolutionDiff {
            patches: vec![patch("a", "1.0.0", "2.0.0"), patch("b", "1.0.0", "2.0.0")],
            added_vulns: vec![],
            removed_vulns: vec![],
        };

        assert_eq!(short.total_cmp(&long), Ordering::Less);
        assert_eq!(long.total_cmp(&short), Ordering::Greater);
    }
}
