//! gradle.lockfile / buildscript-gradle.lockfile 파서
//!
//! 한 줄에 `group:artifact:version=configuration,...` 형식입니다.
//! 두 파일명이 하나의 추출기를 공유하며, 매칭된 basename이
//! `parsed_as`로 보고됩니다 (extract 모듈의 안정화 규칙 참고).
//! gradle이 고정하는 좌표는 Maven 좌표이므로 생태계는 Maven입니다.

use std::path::Path;

use vigil_core::error::ExtractError;
use vigil_core::types::{Ecosystem, LineSpan, PackageDetails};

use crate::extract::{DepFile, Extractor};
use crate::parsers::base_name_is;

/// gradle lockfile 추출기 (두 파일명 공유)
pub struct GradleLockExtractor;

fn parse_dependency_line(line: &str) -> Option<(String, String)> {
    // "group:artifact:version" 좌변만 사용, 설정 목록은 무시
    let coordinate = line.split('=').next().unwrap_or_default();

    let parts: Vec<&str> = coordinate.split(':').collect();
    let [group, artifact, version] = parts.as_slice() else {
        return None;
    };

    if group.is_empty() || artifact.is_empty() || version.is_empty() {
        return None;
    }

    Some((format!("{group}:{artifact}"), (*version).to_owned()))
}

impl Extractor for GradleLockExtractor {
    fn should_extract(&self, path: &Path) -> bool {
        base_name_is(path, "gradle.lockfile") || base_name_is(path, "buildscript-gradle.lockfile")
    }

    fn extract(&self, f: &DepFile) -> Result<Vec<PackageDetails>, ExtractError> {
        let mut packages = Vec::new();

        for (idx, raw) in f.content().lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            if let Some((name, version)) = parse_dependency_line(line) {
                packages.push(PackageDetails {
                    line_span: Some(LineSpan::single(idx + 1)),
                    ..PackageDetails::new(name, version, Ecosystem::Maven)
                });
            }
        }

        Ok(packages)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_GRADLE_LOCKFILE: &str = "# This is a Gradle generated file for dependency locking.
# Manual edits can break the build and are not advised.
# This file is expected to be part of source control.
org.springframework.boot:spring-boot:2.7.8=compileClasspath,runtimeClasspath
org.slf4j:slf4j-api:1.7.36=compileClasspath
empty=
";

    #[test]
    fn can_extract_both_gradle_names() {
        let extractor = GradleLockExtractor;
        assert!(extractor.should_extract(Path::new("gradle.lockfile")));
        assert!(extractor.should_extract(Path::new("buildscript-gradle.lockfile")));
        assert!(!extractor.should_extract(Path::new("build.gradle")));
    }

    #[test]
    fn extract_sample() {
        let f = DepFile::from_string("gradle.lockfile", SAMPLE_GRADLE_LOCKFILE);
        let packages = GradleLockExtractor.extract(&f).unwrap();

        assert_eq!(packages.len(), 2);
        assert_eq!(packages[0].name, "org.springframework.boot:spring-boot");
        assert_eq!(packages[0].version, "2.7.8");
        assert_eq!(packages[0].ecosystem, Ecosystem::Maven);
        assert_eq!(packages[0].line_span, Some(LineSpan::single(4)));

        assert_eq!(packages[1].name, "org.slf4j:slf4j-api");
    }

    #[test]
    fn comments_and_malformed_lines_are_skipped() {
        let f = DepFile::from_string("gradle.lockfile", "# comment\nnot-a-coordinate\na:b=configs\n");
        let packages = GradleLockExtractor.extract(&f).unwrap();
        assert!(packages.is_empty());
    }

    #[test]
    fn extract_empty_file() {
        let f = DepFile::from_string("gradle.lockfile", "");
        assert!(GradleLockExtractor.extract(&f).unwrap().is_empty());
    }
}
