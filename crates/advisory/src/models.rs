//! OSV 레코드 및 와이어 타입
//!
//! 전체 advisory 레코드([`Vulnerability`])와 `/v1/querybatch` 교환
//! 형식을 정의합니다. 배치 응답은 ID만 담고 있으며, 전체 레코드는
//! 2차 수화(hydration) 단계에서 채워집니다.

use serde::{Deserialize, Serialize};

use vigil_core::types::SourceInfo;

/// 단일 패키지에 대한 질의
///
/// 좌표 우선순위: commit → purl → name+ecosystem.
/// `source`는 결과 재귀속을 위한 역참조이며 와이어에는 실리지 않습니다.
#[derive(Debug, Clone, Serialize)]
pub struct Query {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub commit: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub package: Option<QueryPackage>,
    #[serde(skip_serializing)]
    pub source: SourceInfo,
}

/// 질의의 패키지 좌표
#[derive(Debug, Clone, Serialize)]
pub struct QueryPackage {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub ecosystem: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub purl: Option<String>,
}

/// `/v1/querybatch` 요청 본문
#[derive(Debug, Serialize)]
pub struct BatchedQuery {
    pub queries: Vec<Query>,
}

/// `/v1/querybatch` 응답 본문 (위치 대응)
#[derive(Debug, Deserialize)]
pub struct BatchedResponse {
    #[serde(default)]
    pub results: Vec<BatchedResult>,
}

/// 쿼리 하나에 대한 최소 응답 (ID만)
#[derive(Debug, Deserialize)]
pub struct BatchedResult {
    #[serde(default)]
    pub vulns: Vec<MinimalVulnerability>,
}

/// 수화 전의 ID-only 레코드
#[derive(Debug, Clone, Deserialize)]
pub struct MinimalVulnerability {
    pub id: String,
}

/// 전체 advisory 레코드 (OSV 스키마)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Vulnerability {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema_version: Option<String>,
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub aliases: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub affected: Vec<Affected>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub severity: Vec<Severity>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub references: Vec<Reference>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database_specific: Option<serde_json::Value>,
}

impl Vulnerability {
    /// 수화 실패 시에도 ID만으로 결과에 남길 수 있는 최소 레코드를 만듭니다.
    pub fn id_only(id: impl Into<String>) -> Self {
        Self { id: id.into(), ..Self::default() }
    }

    /// 주어진 ID가 이 레코드의 ID이거나 별칭인지 확인합니다.
    pub fn is_known_as(&self, id: &str) -> bool {
        self.id == id || self.aliases.iter().any(|a| a == id)
    }
}

/// 영향 범위 엔트리
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Affected {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub package: Option<AffectedPackage>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ranges: Vec<Range>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub versions: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database_specific: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ecosystem_specific: Option<serde_json::Value>,
}

/// 영향받는 패키지 좌표
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AffectedPackage {
    #[serde(default)]
    pub ecosystem: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub purl: Option<String>,
}

/// 버전 범위 (이벤트 마커의 나열)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Range {
    #[serde(default, rename = "type")]
    pub range_type: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub events: Vec<Event>,
}

/// introduced / fixed / last_affected 버전 마커
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Event {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub introduced: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fixed: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_affected: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<String>,
}

/// 심각도 점수
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Severity {
    #[serde(default, rename = "type")]
    pub severity_type: String,
    #[serde(default)]
    pub score: String,
}

/// 참고 링크
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Reference {
    #[serde(default, rename = "type")]
    pub reference_type: String,
    #[serde(default)]
    pub url: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_serializes_only_set_coordinates() {
        let query = Query {
            commit: String::new(),
            version: "0.0.1".to_owned(),
            package: Some(QueryPackage {
                name: "ansi-html".to_owned(),
                ecosystem: "npm".to_owned(),
                purl: None,
            }),
            source: SourceInfo::lockfile("package-lock.json"),
        };

        let json = serde_json::to_value(&query).unwrap();
        assert_eq!(json["version"], "0.0.1");
        assert_eq!(json["package"]["name"], "ansi-html");
        assert!(json.get("commit").is_none());
        assert!(json.get("source").is_none());
    }

    #[test]
    fn commit_query_omits_version_and_package() {
        let query = Query {
            commit: "deadbeefdeadbeefdeadbeefdeadbeefdeadbeef".to_owned(),
            version: String::new(),
            package: None,
            source: SourceInfo::git("."),
        };

        let json = serde_json::to_value(&query).unwrap();
        assert_eq!(json["commit"], "deadbeefdeadbeefdeadbeefdeadbeefdeadbeef");
        assert!(json.get("version").is_none());
        assert!(json.get("package").is_none());
    }

    #[test]
    fn batched_response_with_missing_vulns_field() {
        let json = r#"{"results": [{}, {"vulns": [{"id": "OSV-1"}]}]}"#;
        let response: BatchedResponse = serde_json::from_str(json).unwrap();

        assert_eq!(response.results.len(), 2);
        assert!(response.results[0].vulns.is_empty());
        assert_eq!(response.results[1].vulns[0].id, "OSV-1");
    }

    #[test]
    fn vulnerability_deserializes_partial_record() {
        let json = r#"{
            "id": "GHSA-whgm-jr23-g3j9",
            "aliases": ["CVE-2021-23424"],
            "summary": "Uncontrolled Resource Consumption in ansi-html",
            "affected": [
                {
                    "package": { "ecosystem": "npm", "name": "ansi-html" },
                    "ranges": [
                        { "type": "SEMVER", "events": [{"introduced": "0"}, {"fixed": "0.0.8"}] }
                    ]
                }
            ]
        }"#;

        let vuln: Vulnerability = serde_json::from_str(json).unwrap();
        assert_eq!(vuln.id, "GHSA-whgm-jr23-g3j9");
        assert_eq!(vuln.aliases, vec!["CVE-2021-23424"]);
        assert_eq!(vuln.affected[0].ranges[0].events[1].fixed.as_deref(), Some("0.0.8"));
    }

    #[test]
    fn is_known_as_matches_id_and_aliases() {
        let vuln = Vulnerability {
            id: "GHSA-aaaa".to_owned(),
            aliases: vec!["CVE-2021-1".to_owned()],
            ..Vulnerability::default()
        };

        assert!(vuln.is_known_as("GHSA-aaaa"));
        assert!(vuln.is_known_as("CVE-2021-1"));
        assert!(!vuln.is_known_as("CVE-2021-2"));
    }

    #[test]
    fn id_only_record_roundtrips() {
        let vuln = Vulnerability::id_only("OSV-2023-1");
        let json = serde_json::to_string(&vuln).unwrap();
        let back: Vulnerability = serde_json::from_str(&json).unwrap();
        assert_eq!(back.id, "OSV-2023-1");
        assert!(back.aliases.is_empty());
    }
}
