//! 도메인 타입 -- 스캐너 전역에서 공유되는 데이터 구조
//!
//! lockfile에서 추출된 패키지, 스캔 소스, 생태계 태그 등
//! 파이프라인 전 단계가 공유하는 핵심 타입을 정의합니다.

use std::fmt;

use serde::{Deserialize, Serialize};

/// 패키지 생태계 (닫힌 태그 집합)
///
/// 각 lockfile 형식이 속하는 패키지 생태계를 나타냅니다.
/// 직렬화 문자열은 취약점 데이터베이스가 사용하는 표기를 그대로 따릅니다
/// (예: `crates.io`, `PyPI`, `ConanCenter`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Ecosystem {
    /// JavaScript/TypeScript (package-lock.json, yarn.lock, pnpm-lock.yaml)
    #[serde(rename = "npm")]
    Npm,
    /// Python (requirements.txt, Pipfile.lock, poetry.lock)
    #[serde(rename = "PyPI")]
    PyPI,
    /// Java/JVM (pom.xml, gradle.lockfile)
    Maven,
    /// Go (go.mod)
    Go,
    /// Rust (Cargo.lock)
    #[serde(rename = "crates.io")]
    CratesIo,
    /// PHP (composer.lock)
    Packagist,
    /// Ruby (Gemfile.lock)
    RubyGems,
    /// .NET (packages.lock.json)
    NuGet,
    /// Dart/Flutter (pubspec.lock)
    Pub,
    /// Elixir/Erlang (mix.lock)
    Hex,
    /// C/C++ (conan.lock)
    ConanCenter,
    /// 커밋 해시로만 식별되는 VCS 의존성
    #[serde(rename = "GIT")]
    Git,
}

impl Ecosystem {
    /// 생태계에 대응하는 Package URL 타입을 반환합니다.
    ///
    /// purl로 표현할 수 없는 생태계는 `None`을 반환하며,
    /// 이 경우 쿼리는 이름+생태계 좌표로 수행됩니다.
    pub fn purl_type(&self) -> Option<&'static str> {
        match self {
            Self::Maven => Some("maven"),
            Self::Go => Some("golang"),
            Self::Packagist => Some("composer"),
            Self::PyPI => Some("pypi"),
            Self::RubyGems => Some("gem"),
            Self::NuGet => Some("nuget"),
            Self::Npm => Some("npm"),
            _ => None,
        }
    }

    /// 직렬화에 쓰이는 문자열 표기를 반환합니다.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Npm => "npm",
            Self::PyPI => "PyPI",
            Self::Maven => "Maven",
            Self::Go => "Go",
            Self::CratesIo => "crates.io",
            Self::Packagist => "Packagist",
            Self::RubyGems => "RubyGems",
            Self::NuGet => "NuGet",
            Self::Pub => "Pub",
            Self::Hex => "Hex",
            Self::ConanCenter => "ConanCenter",
            Self::Git => "GIT",
        }
    }
}

impl fmt::Display for Ecosystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 소스 파일 내 라인 범위 (1부터 시작)
///
/// 라인 정보를 싸게 얻을 수 있는 파서만 채우며, 소비자는 부재를 허용해야 합니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineSpan {
    /// 시작 라인
    pub start: usize,
    /// 끝 라인 (단일 라인이면 start와 동일)
    pub end: usize,
}

impl LineSpan {
    /// 단일 라인 범위를 생성합니다.
    pub fn single(line: usize) -> Self {
        Self { start: line, end: line }
    }
}

/// lockfile에서 추출된 단일 패키지
///
/// # 불변 조건
///
/// `commit`이 비어있지 않거나, `name`과 `version`이 모두 비어있지 않아야 합니다.
/// 이를 만족하지 못하는 항목은 파서가 결과에서 제외합니다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageDetails {
    /// 패키지 이름
    pub name: String,
    /// 고정된 버전 (VCS 의존성이면 비어있을 수 있음)
    pub version: String,
    /// 패키지 생태계
    pub ecosystem: Ecosystem,
    /// 버전 범위 비교에 사용할 버전 체계
    ///
    /// 대부분 `ecosystem`과 같지만, 비교 규칙이 다른 생태계(PyPI 등)를
    /// 구분하기 위해 별도 필드로 유지합니다.
    pub compare_as: Ecosystem,
    /// VCS 고정 의존성의 커밋 해시
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub commit: String,
    /// 소스 파일 내 위치 (파서가 제공할 수 있는 경우만)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line_span: Option<LineSpan>,
    /// 의존성 그룹 (예: "dev", "optional")
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dep_groups: Vec<String>,
}

impl PackageDetails {
    /// 레지스트리 패키지를 생성합니다. `compare_as`는 생태계를 따릅니다.
    pub fn new(name: impl Into<String>, version: impl Into<String>, ecosystem: Ecosystem) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            ecosystem,
            compare_as: ecosystem,
            commit: String::new(),
            line_span: None,
            dep_groups: Vec::new(),
        }
    }

    /// 커밋 해시를 설정합니다.
    pub fn with_commit(mut self, commit: impl Into<String>) -> Self {
        self.commit = commit.into();
        self
    }

    /// 의존성 그룹을 설정합니다.
    pub fn with_dep_groups(mut self, groups: Vec<String>) -> Self {
        self.dep_groups = groups;
        self
    }

    /// 이름/버전 또는 커밋 불변 조건을 만족하는지 확인합니다.
    pub fn is_identifiable(&self) -> bool {
        !self.commit.is_empty() || (!self.name.is_empty() && !self.version.is_empty())
    }
}

impl fmt::Display for PackageDetails {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.commit.is_empty() {
            write!(f, "{}@{}", self.name, self.version)
        } else {
            write!(f, "{}@{}", self.name, self.commit)
        }
    }
}

/// 파싱된 lockfile 한 개의 결과
///
/// `packages`는 (name, version) 기준 오름차순 정렬되고 중복이 제거된 상태입니다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lockfile {
    /// 원본 파일 경로
    pub file_path: String,
    /// 이 결과를 생성한 파서의 정식 이름
    pub parsed_as: String,
    /// 추출된 패키지 목록
    pub packages: Vec<PackageDetails>,
}

impl fmt::Display for Lockfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for details in &self.packages {
            if !first {
                writeln!(f)?;
            }
            first = false;

            write!(f, "  {}: {}", details.ecosystem, details.name)?;
            if !details.version.is_empty() {
                write!(f, "@{}", details.version)?;
            }
            if !details.commit.is_empty() {
                write!(f, " ({})", details.commit)?;
            }
        }
        Ok(())
    }
}

/// 스캔 소스 종류
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceType {
    /// 생태계별 lockfile
    Lockfile,
    /// SBOM 문서 (CycloneDX / SPDX)
    Sbom,
    /// 컨테이너 이미지
    Docker,
    /// git 저장소 HEAD 커밋
    Git,
}

/// 스캔 소스 식별자
///
/// 결과 버킷의 그룹 키로 사용되는 안정적인 식별자입니다.
/// 서로 다른 소스의 결과는 절대 병합되지 않습니다.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SourceInfo {
    /// 소스 경로 (파일, 디렉토리 또는 이미지 이름)
    pub path: String,
    /// 소스 종류
    #[serde(rename = "type")]
    pub source_type: SourceType,
}

impl SourceInfo {
    /// lockfile 소스를 생성합니다.
    pub fn lockfile(path: impl Into<String>) -> Self {
        Self { path: path.into(), source_type: SourceType::Lockfile }
    }

    /// SBOM 소스를 생성합니다.
    pub fn sbom(path: impl Into<String>) -> Self {
        Self { path: path.into(), source_type: SourceType::Sbom }
    }

    /// git 소스를 생성합니다.
    pub fn git(path: impl Into<String>) -> Self {
        Self { path: path.into(), source_type: SourceType::Git }
    }
}

impl fmt::Display for SourceInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ecosystem_display_matches_database_strings() {
        assert_eq!(Ecosystem::Npm.to_string(), "npm");
        assert_eq!(Ecosystem::PyPI.to_string(), "PyPI");
        assert_eq!(Ecosystem::CratesIo.to_string(), "crates.io");
        assert_eq!(Ecosystem::ConanCenter.to_string(), "ConanCenter");
        assert_eq!(Ecosystem::Git.to_string(), "GIT");
    }

    #[test]
    fn ecosystem_serde_roundtrip() {
        let json = serde_json::to_string(&Ecosystem::CratesIo).unwrap();
        assert_eq!(json, r#""crates.io""#);
        let back: Ecosystem = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Ecosystem::CratesIo);
    }

    #[test]
    fn ecosystem_purl_type_mapping() {
        assert_eq!(Ecosystem::Maven.purl_type(), Some("maven"));
        assert_eq!(Ecosystem::Go.purl_type(), Some("golang"));
        assert_eq!(Ecosystem::Packagist.purl_type(), Some("composer"));
        assert_eq!(Ecosystem::PyPI.purl_type(), Some("pypi"));
        assert_eq!(Ecosystem::RubyGems.purl_type(), Some("gem"));
        assert_eq!(Ecosystem::NuGet.purl_type(), Some("nuget"));
        assert_eq!(Ecosystem::Npm.purl_type(), Some("npm"));
        assert_eq!(Ecosystem::CratesIo.purl_type(), None);
        assert_eq!(Ecosystem::Hex.purl_type(), None);
    }

    #[test]
    fn package_display_uses_concatenation() {
        let pkg = PackageDetails::new("ansi-html", "0.0.1", Ecosystem::Npm);
        assert_eq!(pkg.to_string(), "ansi-html@0.0.1");
    }

    #[test]
    fn package_display_prefers_commit() {
        let pkg = PackageDetails::new("left-pad", "", Ecosystem::Npm)
            .with_commit("abcdef0123456789abcdef0123456789abcdef01");
        assert_eq!(
            pkg.to_string(),
            "left-pad@abcdef0123456789abcdef0123456789abcdef01"
        );
    }

    #[test]
    fn identifiable_requires_name_and_version_or_commit() {
        assert!(PackageDetails::new("a", "1.0.0", Ecosystem::Npm).is_identifiable());
        assert!(!PackageDetails::new("a", "", Ecosystem::Npm).is_identifiable());
        assert!(!PackageDetails::new("", "1.0.0", Ecosystem::Npm).is_identifiable());
        assert!(PackageDetails::new("", "", Ecosystem::Git)
            .with_commit("deadbeef")
            .is_identifiable());
    }

    #[test]
    fn lockfile_display_lists_packages() {
        let lockfile = Lockfile {
            file_path: "composer.lock".to_owned(),
            parsed_as: "composer.lock".to_owned(),
            packages: vec![
                PackageDetails::new("monolog/monolog", "2.9.1", Ecosystem::Packagist),
                PackageDetails::new("psr/log", "", Ecosystem::Packagist).with_commit("deadbeef"),
            ],
        };

        let rendered = lockfile.to_string();
        assert!(rendered.contains("  Packagist: monolog/monolog@2.9.1"));
        assert!(rendered.contains("  Packagist: psr/log (deadbeef)"));
    }

    #[test]
    fn source_info_is_stable_grouping_key() {
        let a = SourceInfo::lockfile("a/composer.lock");
        let b = SourceInfo::lockfile("a/composer.lock");
        let c = SourceInfo::sbom("a/composer.lock");
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn line_span_single() {
        let span = LineSpan::single(42);
        assert_eq!(span.start, 42);
        assert_eq!(span.end, 42);
    }
}
