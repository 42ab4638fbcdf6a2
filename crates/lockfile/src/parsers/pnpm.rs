//! pnpm-lock.yaml 파서
//!
//! `lockfileVersion`은 v5에서 float, v6+에서 문자열이므로 둘 다 받습니다.
//! `packages` 맵의 키는 `/[@scope/]name/version[_suffix]` 형식의 의존성
//! 경로이며, 여기서 이름과 버전을 복원합니다. 숫자로 시작하지 않는 버전은
//! 거부하고, 첫 `_` 이후의 peer suffix는 제거합니다. 패키지에 명시적
//! `name`/`version` 필드가 있으면 경로에서 복원한 값보다 우선합니다.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;
use serde::Deserialize;

use vigil_core::error::ExtractError;
use vigil_core::types::{Ecosystem, LineSpan, PackageDetails};

use crate::extract::{DepFile, Extractor};
use crate::parsers::{base_name_is, extract_commit_hash};

/// pnpm-lock.yaml 추출기
pub struct PnpmLockExtractor;

#[derive(Deserialize)]
struct PnpmLockfile {
    // v5는 5.4 같은 float, v6+는 "6.0" 같은 문자열
    #[serde(default, rename = "lockfileVersion")]
    _version: Option<PnpmLockfileVersion>,
    #[serde(default)]
    packages: BTreeMap<String, PnpmLockPackage>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum PnpmLockfileVersion {
    Number(f64),
    Text(String),
}

#[derive(Deserialize, Default)]
struct PnpmLockPackage {
    #[serde(default)]
    resolution: PnpmResolution,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    version: Option<String>,
    #[serde(default)]
    dev: bool,
}

#[derive(Deserialize, Default)]
struct PnpmResolution {
    #[serde(default)]
    tarball: Option<String>,
    #[serde(default)]
    commit: Option<String>,
}

fn starts_with_number(s: &str) -> bool {
    s.chars().next().is_some_and(|c| c.is_ascii_digit())
}

/// `name@version` 패턴을 해석합니다. 이름에는 `@`가 더 포함될 수 있으므로
/// 마지막 `@`를 기준으로 나눕니다.
fn parse_name_at_version(value: &str) -> (String, String) {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| Regex::new(r"^(.+)@([\d.]+)$").expect("static regex"));

    match re.captures(value) {
        Some(captures) => (captures[1].to_owned(), captures[2].to_owned()),
        None => (value.to_owned(), String::new()),
    }
}

/// 의존성 경로에서 (name, version)을 복원합니다. 실패하면 둘 다 빈 문자열입니다.
fn extract_pnpm_name_and_version(dependency_path: &str) -> (String, String) {
    // file 의존성은 항상 name 필드를 가지며 경로에 버전이 없음
    if dependency_path.starts_with("file:") {
        return (String::new(), String::new());
    }

    let parts: Vec<&str> = dependency_path.split('/').collect();
    let parts = &parts[1..];

    let (mut name, rest) = if parts.len() >= 2 && parts[0].starts_with('@') {
        (parts[..2].join("/"), &parts[2..])
    } else {
        (parts.first().map(|s| (*s).to_owned()).unwrap_or_default(), &parts[1..])
    };

    let mut version = rest.first().map(|s| (*s).to_owned()).unwrap_or_default();

    if version.is_empty() {
        let (parsed_name, parsed_version) = parse_name_at_version(&name);
        name = parsed_name;
        version = parsed_version;
    }

    if version.is_empty() || !starts_with_number(&version) {
        return (String::new(), String::new());
    }

    // peer suffix 제거
    if let Some(idx) = version.find('_') {
        version.truncate(idx);
    }

    (name, version)
}

/// 의존성 경로 키가 등장하는 라인을 원문에서 찾습니다 (저렴한 best-effort).
fn find_key_line(content: &str, key: &str) -> Option<usize> {
    let quoted_single = format!("'{key}':");
    let quoted_double = format!("\"{key}\":");
    let bare = format!("{key}:");

    content.lines().position(|line| {
        let trimmed = line.trim_start();
        trimmed.starts_with(&bare)
            || trimmed.starts_with(&quoted_single)
            || trimmed.starts_with(&quoted_double)
    })
}

impl Extractor for PnpmLockExtractor {
    fn should_extract(&self, path: &Path) -> bool {
        base_name_is(path, "pnpm-lock.yaml")
    }

    fn extract(&self, f: &DepFile) -> Result<Vec<PackageDetails>, ExtractError> {
        // 빈 파일은 에러가 아니라 빈 결과
        if f.content().trim().is_empty() {
            return Ok(Vec::new());
        }

        let lockfile: PnpmLockfile =
            serde_yaml::from_str(f.content()).map_err(|e| ExtractError::ParseFailed {
                path: f.path().display().to_string(),
                parsed_as: "pnpm-lock.yaml".to_owned(),
                reason: e.to_string(),
            })?;

        let mut packages = Vec::new();

        for (dependency_path, pkg) in &lockfile.packages {
            let (mut name, mut version) = extract_pnpm_name_and_version(dependency_path);

            // 명시적 필드가 경로에서 복원한 값보다 우선
            if let Some(explicit) = &pkg.name {
                name = explicit.clone();
            }
            if let Some(explicit) = &pkg.version {
                version = explicit.clone();
            }

            if name.is_empty() || version.is_empty() {
                continue;
            }

            let mut commit = pkg.resolution.commit.clone().unwrap_or_default();
            if let Some(tarball) = &pkg.resolution.tarball {
                if tarball.starts_with("https://codeload.github.com") {
                    if let Some(hash) = extract_commit_hash(tarball) {
                        commit = hash;
                    }
                }
            }

            let dep_groups = if pkg.dev { vec!["dev".to_owned()] } else { Vec::new() };
            let line_span = find_key_line(f.content(), dependency_path)
                .map(|idx| LineSpan::single(idx + 1));

            packages.push(PackageDetails {
                line_span,
                ..PackageDetails::new(name, version, Ecosystem::Npm)
                    .with_commit(commit)
                    .with_dep_groups(dep_groups)
            });
        }

        Ok(packages)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_PNPM_V5: &str = "lockfileVersion: 5.4

packages:

  /ansi-html/0.0.1:
    resolution: {integrity: sha512-abc}
    dev: false

  /@babel/code-frame/7.18.6:
    resolution: {integrity: sha512-def}
    dev: true

  /ms/2.1.3_peerdep@1.0.0:
    resolution: {integrity: sha512-ghi}
";

    const SAMPLE_PNPM_V6: &str = "lockfileVersion: '6.0'

packages:

  /ansi-html@0.0.1:
    resolution: {integrity: sha512-abc}
";

    #[test]
    fn can_extract_pnpm_lock() {
        let extractor = PnpmLockExtractor;
        assert!(extractor.should_extract(Path::new("pnpm-lock.yaml")));
        assert!(!extractor.should_extract(Path::new("pnpm-lock.yml")));
    }

    #[test]
    fn extract_v5_float_version() {
        let f = DepFile::from_string("pnpm-lock.yaml", SAMPLE_PNPM_V5);
        let packages = PnpmLockExtractor.extract(&f).unwrap();

        assert_eq!(packages.len(), 3);

        let ansi = packages.iter().find(|p| p.name == "ansi-html").unwrap();
        assert_eq!(ansi.version, "0.0.1");
        assert_eq!(ansi.ecosystem, Ecosystem::Npm);
    }

    #[test]
    fn extract_v6_string_version() {
        let f = DepFile::from_string("pnpm-lock.yaml", SAMPLE_PNPM_V6);
        let packages = PnpmLockExtractor.extract(&f).unwrap();

        assert_eq!(packages.len(), 1);
        assert_eq!(packages[0].name, "ansi-html");
        assert_eq!(packages[0].version, "0.0.1");
    }

    #[test]
    fn scoped_package_name_joined() {
        let f = DepFile::from_string("pnpm-lock.yaml", SAMPLE_PNPM_V5);
        let packages = PnpmLockExtractor.extract(&f).unwrap();

        let babel = packages.iter().find(|p| p.name == "@babel/code-frame").unwrap();
        assert_eq!(babel.version, "7.18.6");
        assert_eq!(babel.dep_groups, vec!["dev"]);
    }

    #[test]
    fn peer_suffix_is_stripped() {
        let f = DepFile::from_string("pnpm-lock.yaml", SAMPLE_PNPM_V5);
        let packages = PnpmLockExtractor.extract(&f).unwrap();

        let ms = packages.iter().find(|p| p.name == "ms").unwrap();
        assert_eq!(ms.version, "2.1.3");
    }

    #[test]
    fn explicit_name_and_version_take_priority() {
        let content = "lockfileVersion: 5.4

packages:

  /some/weird/path:
    resolution: {integrity: sha512-abc}
    name: actual-name
    version: 3.2.1
";
        let f = DepFile::from_string("pnpm-lock.yaml", content);
        let packages = PnpmLockExtractor.extract(&f).unwrap();

        assert_eq!(packages.len(), 1);
        assert_eq!(packages[0].name, "actual-name");
        assert_eq!(packages[0].version, "3.2.1");
    }

    #[test]
    fn non_numeric_version_is_rejected() {
        let content = "lockfileVersion: 5.4

packages:

  /some-package/latest:
    resolution: {integrity: sha512-abc}
";
        let f = DepFile::from_string("pnpm-lock.yaml", content);
        assert!(PnpmLockExtractor.extract(&f).unwrap().is_empty());
    }

    #[test]
    fn codeload_tarball_yields_commit() {
        let content = "lockfileVersion: 5.4

packages:

  /bit/1.0.0:
    resolution: {tarball: https://codeload.github.com/ofek/bit/tar.gz/aad7a713b3a60712a16b13095962bb9dd7d98d5f}
";
        let f = DepFile::from_string("pnpm-lock.yaml", content);
        let packages = PnpmLockExtractor.extract(&f).unwrap();
        assert_eq!(packages[0].commit, "aad7a713b3a60712a16b13095962bb9dd7d98d5f");
    }

    #[test]
    fn empty_file_produces_zero_packages() {
        let f = DepFile::from_string("pnpm-lock.yaml", "");
        assert!(PnpmLockExtractor.extract(&f).unwrap().is_empty());
    }

    #[test]
    fn empty_v5_and_v6_shapes_produce_zero_packages() {
        let f = DepFile::from_string("pnpm-lock.yaml", "lockfileVersion: 5.4\n");
        assert!(PnpmLockExtractor.extract(&f).unwrap().is_empty());

        let f = DepFile::from_string("pnpm-lock.yaml", "lockfileVersion: '6.0'\n");
        assert!(PnpmLockExtractor.extract(&f).unwrap().is_empty());
    }

    #[test]
    fn line_span_points_at_dependency_path() {
        let f = DepFile::from_string("pnpm-lock.yaml", SAMPLE_PNPM_V5);
        let packages = PnpmLockExtractor.extract(&f).unwrap();

        let ansi = packages.iter().find(|p| p.name == "ansi-html").unwrap();
        assert_eq!(ansi.line_span, Some(LineSpan::single(5)));
    }

    #[test]
    fn file_dependency_path_without_name_is_skipped() {
        let content = "lockfileVersion: 5.4

packages:

  file:projects/local-dep:
    resolution: {integrity: sha512-abc}
";
        let f = DepFile::from_string("pnpm-lock.yaml", content);
        assert!(PnpmLockExtractor.extract(&f).unwrap().is_empty());
    }
}
