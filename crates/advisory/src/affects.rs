//! 영향 범위 판정 -- advisory가 특정 패키지 버전에 영향을 주는지 확인
//!
//! OSV `affected` 엔트리의 명시적 `versions` 목록과
//! `SEMVER`/`ECOSYSTEM` 범위 이벤트를 평가합니다. `GIT` 범위는 커밋
//! 순서를 로컬에서 알 수 없으므로 건너뜁니다 (서버 측 매칭에 위임).

use std::cmp::Ordering;

use vigil_core::types::PackageDetails;

use crate::models::{Affected, Range, Vulnerability};
use crate::version;

/// advisory가 패키지에 영향을 주는지 판정합니다.
pub fn is_affected(vuln: &Vulnerability, pkg: &PackageDetails) -> bool {
    vuln.affected.iter().any(|affected| entry_affects(affected, pkg))
}

fn entry_affects(affected: &Affected, pkg: &PackageDetails) -> bool {
    if let Some(affected_pkg) = &affected.package {
        if affected_pkg.ecosystem != pkg.ecosystem.as_str() || affected_pkg.name != pkg.name {
            return false;
        }
    }

    if pkg.version.is_empty() {
        return false;
    }

    if affected.versions.iter().any(|v| v == &pkg.version) {
        return true;
    }

    affected
        .ranges
        .iter()
        .filter(|r| r.range_type == "SEMVER" || r.range_type == "ECOSYSTEM")
        .any(|range| range_contains(range, pkg))
}

/// 이벤트 나열을 [introduced, fixed) / [introduced, last_affected] 구간으로
/// 해석해 버전 포함 여부를 확인합니다.
fn range_contains(range: &Range, pkg: &PackageDetails) -> bool {
    let cmp = |a: &str, b: &str| version::compare(pkg.compare_as, a, b);

    let mut span_open = false;
    let mut in_range = false;

    for event in &range.events {
        if let Some(introduced) = &event.introduced {
            span_open = true;
            in_range = introduced == "0" || cmp(&pkg.version, introduced) != Ordering::Less;
            if in_range {
                // 이후 fixed/last_affected 이벤트가 닫는지 확인
                continue;
            }
        }

        if !span_open {
            continue;
        }

        if let Some(fixed) = &event.fixed {
            if in_range && cmp(&pkg.version, fixed) == Ordering::Less {
                return true;
            }
            span_open = false;
            in_range = false;
        } else if let Some(last_affected) = &event.last_affected {
            if in_range && cmp(&pkg.version, last_affected) != Ordering::Greater {
                return true;
            }
            span_open = false;
            in_range = false;
        }
    }

    // 구간이 닫히지 않았으면 introduced 이후 전부 영향
    in_range
}
