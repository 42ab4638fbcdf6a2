//! package-lock.json 파서
//!
//! v2/v3의 평탄한 `packages` 맵을 우선 사용하고, 없으면 v1의 중첩
//! `dependencies` 트리를 재귀적으로 읽습니다. git 의존성은 resolved/version
//! 필드의 URL fragment에서 커밋 해시를 추출합니다.

use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;

use vigil_core::error::ExtractError;
use vigil_core::types::{Ecosystem, PackageDetails};

use crate::extract::{DepFile, Extractor};
use crate::parsers::{base_name_is, extract_commit_hash};

/// package-lock.json 추출기
pub struct NpmLockExtractor;

#[derive(Deserialize)]
struct NpmLockFile {
    #[serde(default)]
    packages: Option<BTreeMap<String, NpmPackageEntry>>,
    #[serde(default)]
    dependencies: Option<BTreeMap<String, NpmDependencyEntry>>,
}

/// v2/v3 `packages` 맵 항목
#[derive(Deserialize)]
struct NpmPackageEntry {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    version: Option<String>,
    #[serde(default)]
    resolved: Option<String>,
    #[serde(default)]
    dev: bool,
    #[serde(default)]
    link: bool,
}

/// v1 `dependencies` 트리 항목
#[derive(Deserialize)]
struct NpmDependencyEntry {
    #[serde(default)]
    version: Option<String>,
    #[serde(default)]
    resolved: Option<String>,
    #[serde(default)]
    dev: bool,
    #[serde(default)]
    dependencies: Option<BTreeMap<String, NpmDependencyEntry>>,
}

/// "node_modules/@scope/name" 형식 키에서 패키지명을 추출합니다.
fn extract_package_name(key: &str) -> &str {
    match key.rfind("node_modules/") {
        Some(pos) => &key[pos + "node_modules/".len()..],
        None => key,
    }
}

fn dev_groups(dev: bool) -> Vec<String> {
    if dev { vec!["dev".to_owned()] } else { Vec::new() }
}

fn parse_v2_packages(entries: &BTreeMap<String, NpmPackageEntry>) -> Vec<PackageDetails> {
    let mut packages = Vec::new();

    for (key, entry) in entries {
        // 루트 프로젝트는 키가 빈 문자열, 워크스페이스 링크는 실체가 아님
        if key.is_empty() || entry.link {
            continue;
        }

        let name = match &entry.name {
            Some(name) => name.clone(),
            None => extract_package_name(key).to_owned(),
        };

        let Some(version) = entry.version.clone() else {
            continue;
        };

        let commit = entry
            .resolved
            .as_deref()
            .and_then(extract_commit_hash)
            .unwrap_or_default();

        packages.push(
            PackageDetails::new(name, version, Ecosystem::Npm)
                .with_commit(commit)
                .with_dep_groups(dev_groups(entry.dev)),
        );
    }

    packages
}

fn parse_v1_dependencies(
    entries: &BTreeMap<String, NpmDependencyEntry>,
    out: &mut Vec<PackageDetails>,
) {
    for (name, entry) in entries {
        let raw_version = entry.version.clone().unwrap_or_default();

        // git 의존성은 version 필드가 URL이고 fragment가 커밋
        let (version, mut commit) = if raw_version.contains("://") {
            (String::new(), extract_commit_hash(&raw_version).unwrap_or_default())
        } else {
            (raw_version, String::new())
        };

        if commit.is_empty() {
            if let Some(resolved) = entry.resolved.as_deref() {
                commit = extract_commit_hash(resolved).unwrap_or_default();
            }
        }

        out.push(
            PackageDetails::new(name.clone(), version, Ecosystem::Npm)
                .with_commit(commit)
                .with_dep_groups(dev_groups(entry.dev)),
        );

        if let Some(nested) = &entry.dependencies {
            parse_v1_dependencies(nested, out);
        }
    }
}

impl Extractor for NpmLockExtractor {
    fn should_extract(&self, path: &Path) -> bool {
        base_name_is(path, "package-lock.json")
    }

    fn extract(&self, f: &DepFile) -> Result<Vec<PackageDetails>, ExtractError> {
        let lockfile: NpmLockFile =
            serde_json::from_str(f.content()).map_err(|e| ExtractError::ParseFailed {
                path: f.path().display().to_string(),
                parsed_as: "package-lock.json".to_owned(),
                reason: e.to_string(),
            })?;

        if let Some(packages) = &lockfile.packages {
            if !packages.is_empty() {
                return Ok(parse_v2_packages(packages));
            }
        }

        let mut packages = Vec::new();
        if let Some(dependencies) = &lockfile.dependencies {
            parse_v1_dependencies(dependencies, &mut packages);
        }

        Ok(packages)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_V3_LOCK: &str = r#"{
  "name": "my-app",
  "version": "1.0.0",
  "lockfileVersion": 3,
  "packages": {
    "": { "name": "my-app", "version": "1.0.0" },
    "node_modules/ansi-html": {
      "version": "0.0.1",
      "resolved": "https://registry.npmjs.org/ansi-html/-/ansi-html-0.0.1.tgz"
    },
    "node_modules/@babel/code-frame": {
      "version": "7.18.6",
      "dev": true
    },
    "node_modules/my-tarball-dep": {
      "version": "1.0.0",
      "resolved": "https://codeload.github.com/ofek/bit/tar.gz/aad7a713b3a60712a16b13095962bb9dd7d98d5f"
    }
  }
}"#;

    const SAMPLE_V1_LOCK: &str = r#"{
  "name": "my-app",
  "version": "1.0.0",
  "lockfileVersion": 1,
  "dependencies": {
    "lodash": {
      "version": "4.17.21",
      "resolved": "https://registry.npmjs.org/lodash/-/lodash-4.17.21.tgz"
    },
    "left-pad-fork": {
      "version": "git+ssh://git@github.com/example/left-pad.git#1234567890abcdef1234567890abcdef12345678"
    },
    "express": {
      "version": "4.18.2",
      "dev": true,
      "dependencies": {
        "accepts": { "version": "1.3.8" }
      }
    }
  }
}"#;

    #[test]
    fn can_extract_package_lock() {
        let extractor = NpmLockExtractor;
        assert!(extractor.should_extract(Path::new("package-lock.json")));
        assert!(!extractor.should_extract(Path::new("package.json")));
        assert!(!extractor.should_extract(Path::new("packages.lock.json")));
    }

    #[test]
    fn extract_v3_lock() {
        let f = DepFile::from_string("package-lock.json", SAMPLE_V3_LOCK);
        let packages = NpmLockExtractor.extract(&f).unwrap();

        // 루트 항목 제외 3개
        assert_eq!(packages.len(), 3);

        let ansi = packages.iter().find(|p| p.name == "ansi-html").unwrap();
        assert_eq!(ansi.version, "0.0.1");
        assert_eq!(ansi.ecosystem, Ecosystem::Npm);

        let babel = packages.iter().find(|p| p.name == "@babel/code-frame").unwrap();
        assert_eq!(babel.dep_groups, vec!["dev"]);
    }

    #[test]
    fn v3_codeload_tarball_yields_commit() {
        let f = DepFile::from_string("package-lock.json", SAMPLE_V3_LOCK);
        let packages = NpmLockExtractor.extract(&f).unwrap();

        let dep = packages.iter().find(|p| p.name == "my-tarball-dep").unwrap();
        assert_eq!(dep.commit, "aad7a713b3a60712a16b13095962bb9dd7d98d5f");
    }

    #[test]
    fn extract_v1_lock_recurses() {
        let f = DepFile::from_string("package-lock.json", SAMPLE_V1_LOCK);
        let packages = NpmLockExtractor.extract(&f).unwrap();

        let names: Vec<&str> = packages.iter().map(|p| p.name.as_str()).collect();
        assert!(names.contains(&"lodash"));
        assert!(names.contains(&"express"));
        assert!(names.contains(&"accepts")); // nested dependency
    }

    #[test]
    fn v1_git_dependency_yields_commit_without_version() {
        let f = DepFile::from_string("package-lock.json", SAMPLE_V1_LOCK);
        let packages = NpmLockExtractor.extract(&f).unwrap();

        let fork = packages.iter().find(|p| p.name == "left-pad-fork").unwrap();
        assert!(fork.version.is_empty());
        assert_eq!(fork.commit, "1234567890abcdef1234567890abcdef12345678");
    }

    #[test]
    fn extract_empty_object() {
        let f = DepFile::from_string("package-lock.json", "{}");
        assert!(NpmLockExtractor.extract(&f).unwrap().is_empty());
    }

    #[test]
    fn extract_invalid_json_returns_error() {
        let f = DepFile::from_string("package-lock.json", "not json!");
        assert!(NpmLockExtractor.extract(&f).is_err());
    }
}
