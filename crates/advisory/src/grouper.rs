//! 별칭 그룹화 -- 같은 취약점을 가리키는 advisory ID의 동치류 계산
//!
//! 패키지 단위로, `b.id ∈ a.aliases ∨ a.id ∈ b.aliases`를 간선으로 하는
//! 그래프의 연결 요소가 하나의 그룹입니다 (별칭의 추이적 폐포).
//! 정규 순서: 그룹 내 ID는 사전순, 그룹은 최소 ID 기준으로 정렬됩니다.

use serde::{Deserialize, Serialize};

use crate::models::Vulnerability;

/// 별칭으로 연결된 advisory ID 집합
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub ids: Vec<String>,
}

impl Group {
    /// 그룹의 대표 ID(최소 ID)를 반환합니다.
    pub fn representative(&self) -> &str {
        self.ids.first().map(String::as_str).unwrap_or_default()
    }
}

/// 한 패키지의 취약점 목록을 별칭 동치류로 분할합니다.
pub fn group_by_alias(vulns: &[Vulnerability]) -> Vec<Group> {
    let n = vulns.len();
    let mut parent: Vec<usize> = (0..n).collect();

    fn find(parent: &mut Vec<usize>, i: usize) -> usize {
        if parent[i] != i {
            let root = find(parent, parent[i]);
            parent[i] = root;
        }
        parent[i]
    }

    fn union(parent: &mut Vec<usize>, a: usize, b: usize) {
        let ra = find(parent, a);
        let rb = find(parent, b);
        if ra != rb {
            parent[rb] = ra;
        }
    }

    for i in 0..n {
        for j in (i + 1)..n {
            let linked = vulns[i].aliases.iter().any(|a| a == &vulns[j].id)
                || vulns[j].aliases.iter().any(|a| a == &vulns[i].id);
            if linked {
                union(&mut parent, i, j);
            }
        }
    }

    let mut components: std::collections::BTreeMap<usize, Vec<String>> =
        std::collections::BTreeMap::new();
    for i in 0..n {
        let root = find(&mut parent, i);
        components.entry(root).or_default().push(vulns[i].id.clone());
    }

    let mut groups: Vec<Group> = components
        .into_values()
        .map(|mut ids| {
            ids.sort();
            ids.dedup();
            Group { ids }
        })
        .collect();

    groups.sort_by(|a, b| a.representative().cmp(b.representative()));
    groups
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vuln(id: &str, aliases: &[&str]) -> Vulnerability {
        Vulnerability {
            id: id.to_owned(),
            aliases: aliases.iter().map(|a| (*a).to_owned()).collect(),
            ..Vulnerability::default()
        }
    }

    #[test]
    fn unrelated_vulns_form_singleton_groups() {
        let vulns = vec![vuln("GHSA-b", &[]), vuln("GHSA-a", &[])];
        let groups = group_by_alias(&vulns);

        assert_eq!(groups.len(), 2);
        // 그룹은 최소 ID 기준 정렬
        assert_eq!(groups[0].ids, vec!["GHSA-a"]);
        assert_eq!(groups[1].ids, vec!["GHSA-b"]);
    }

    #[test]
    fn direct_alias_links_merge() {
        let vulns = vec![vuln("GHSA-x", &["CVE-2021-1"]), vuln("CVE-2021-1", &[])];
        let groups = group_by_alias(&vulns);

        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].ids, vec!["CVE-2021-1", "GHSA-x"]);
    }

    #[test]
    fn alias_link_is_symmetric() {
        // 한쪽 방향의 별칭만으로도 간선이 성립
        let vulns = vec![vuln("CVE-2021-1", &[]), vuln("GHSA-x", &["CVE-2021-1"])];
        assert_eq!(group_by_alias(&vulns).len(), 1);
    }

    #[test]
    fn transitive_closure_over_aliases() {
        // A-B 연결, B-C 연결 → {A, B, C} 하나의 그룹
        let vulns = vec![
            vuln("A", &["B"]),
            vuln("B", &[]),
            vuln("C", &["B"]),
            vuln("D", &[]),
        ];
        let groups = group_by_alias(&vulns);

        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].ids, vec!["A", "B", "C"]);
        assert_eq!(groups[1].ids, vec!["D"]);
    }

    #[test]
    fn representative_is_minimum_id() {
        let vulns = vec![vuln("GHSA-z", &["CVE-2020-1"]), vuln("CVE-2020-1", &[])];
        let groups = group_by_alias(&vulns);
        assert_eq!(groups[0].representative(), "CVE-2020-1");
    }

    #[test]
    fn empty_input_yields_no_groups() {
        assert!(group_by_alias(&[]).is_empty());
    }

    #[test]
    fn grouping_is_deterministic() {
        let vulns = vec![
            vuln("G-3", &[]),
            vuln("G-1", &["G-2"]),
            vuln("G-2", &[]),
        ];

        let first = group_by_alias(&vulns);
        let second = group_by_alias(&vulns);
        assert_eq!(first, second);
    }
}
