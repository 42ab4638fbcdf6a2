//! pom.xml 파서
//!
//! `<dependencies>`와 `<dependencyManagement>`의 의존성을 모두 수집합니다.
//! `${property}` 참조는 `<properties>`와 `<project.version>`으로 치환하며,
//! 끝내 해석되지 않은 버전은 결과에서 제외됩니다 (고정된 버전이 아님).

use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;

use vigil_core::error::ExtractError;
use vigil_core::types::{Ecosystem, PackageDetails};

use crate::extract::{DepFile, Extractor};
use crate::parsers::base_name_is;

/// pom.xml 추출기
pub struct MavenLockExtractor;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct MavenProject {
    #[serde(default)]
    version: Option<String>,
    #[serde(default)]
    properties: Option<BTreeMap<String, String>>,
    #[serde(default)]
    dependencies: Option<MavenDependencies>,
    #[serde(default)]
    dependency_management: Option<MavenDependencyManagement>,
}

#[derive(Deserialize)]
struct MavenDependencies {
    #[serde(default)]
    dependency: Vec<MavenDependency>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct MavenDependencyManagement {
    #[serde(default)]
    dependencies: Option<MavenDependencies>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct MavenDependency {
    group_id: String,
    artifact_id: String,
    #[serde(default)]
    version: Option<String>,
    #[serde(default)]
    scope: Option<String>,
}

/// `${name}` 프로퍼티 참조를 치환합니다. 중첩 참조는 깊이 8까지 따라갑니다.
fn interpolate(
    value: &str,
    properties: &BTreeMap<String, String>,
    project_version: Option<&str>,
) -> Option<String> {
    let mut current = value.to_owned();

    for _ in 0..8 {
        let Some(start) = current.find("${") else {
            return Some(current);
        };
        let end = current[start..].find('}')? + start;
        let key = &current[start + 2..end];

        let replacement = if key == "project.version" {
            project_version?
        } else {
            properties.get(key)?.as_str()
        };

        current = format!("{}{}{}", &current[..start], replacement, &current[end + 1..]);
    }

    None
}

impl Extractor for MavenLockExtractor {
    fn should_extract(&self, path: &Path) -> bool {
        base_name_is(path, "pom.xml")
    }

    fn extract(&self, f: &DepFile) -> Result<Vec<PackageDetails>, ExtractError> {
        let project: MavenProject =
            quick_xml::de::from_str(f.content()).map_err(|e| ExtractError::ParseFailed {
                path: f.path().display().to_string(),
                parsed_as: "pom.xml".to_owned(),
                reason: e.to_string(),
            })?;

        let properties = project.properties.unwrap_or_default();
        let project_version = project.version.as_deref();

        let direct = project.dependencies.map(|d| d.dependency).unwrap_or_default();
        let managed = project
            .dependency_management
            .and_then(|m| m.dependencies)
            .map(|d| d.dependency)
            .unwrap_or_default();

        let mut packages = Vec::new();

        for dep in direct.into_iter().chain(managed) {
            let Some(raw_version) = dep.version else {
                continue; // 부모 pom이 버전을 관리: 여기서는 고정 정보 없음
            };

            let Some(version) = interpolate(&raw_version, &properties, project_version) else {
                tracing::warn!(
                    group = %dep.group_id,
                    artifact = %dep.artifact_id,
                    version = %raw_version,
                    "unresolvable property reference in dependency version, skipping"
                );
                continue;
            };

            let dep_groups = match dep.scope.as_deref() {
                Some("test") => vec!["test".to_owned()],
                _ => Vec::new(),
            };

            packages.push(
                PackageDetails::new(
                    format!("{}:{}", dep.group_id, dep.artifact_id),
                    version,
                    Ecosystem::Maven,
                )
                .with_dep_groups(dep_groups),
            );
        }

        Ok(packages)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_POM: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<project xmlns="http://maven.apache.org/POM/4.0.0">
  <modelVersion>4.0.0</modelVersion>
  <groupId>com.example</groupId>
  <artifactId>demo</artifactId>
  <version>1.0.0</version>

  <properties>
    <jackson.version>2.14.2</jackson.version>
  </properties>

  <dependencies>
    <dependency>
      <groupId>org.apache.commons</groupId>
      <artifactId>commons-lang3</artifactId>
      <version>3.12.0</version>
    </dependency>
    <dependency>
      <groupId>com.fasterxml.jackson.core</groupId>
      <artifactId>jackson-databind</artifactId>
      <version>${jackson.version}</version>
    </dependency>
    <dependency>
      <groupId>junit</groupId>
      <artifactId>junit</artifactId>
      <version>4.13.2</version>
      <scope>test</scope>
    </dependency>
  </dependencies>

  <dependencyManagement>
    <dependencies>
      <dependency>
        <groupId>com.example</groupId>
        <artifactId>internal-bom</artifactId>
        <version>${project.version}</version>
      </dependency>
    </dependencies>
  </dependencyManagement>
</project>
"#;

    #[test]
    fn can_extract_pom_xml() {
        let extractor = MavenLockExtractor;
        assert!(extractor.should_extract(Path::new("pom.xml")));
        assert!(!extractor.should_extract(Path::new("pom.lock")));
    }

    #[test]
    fn extract_sample() {
        let f = DepFile::from_string("pom.xml", SAMPLE_POM);
        let packages = MavenLockExtractor.extract(&f).unwrap();

        assert_eq!(packages.len(), 4);
        assert_eq!(packages[0].name, "org.apache.commons:commons-lang3");
        assert_eq!(packages[0].version, "3.12.0");
        assert_eq!(packages[0].ecosystem, Ecosystem::Maven);
    }

    #[test]
    fn property_references_are_interpolated() {
        let f = DepFile::from_string("pom.xml", SAMPLE_POM);
        let packages = MavenLockExtractor.extract(&f).unwrap();

        let jackson = packages
            .iter()
            .find(|p| p.name == "com.fasterxml.jackson.core:jackson-databind")
            .unwrap();
        assert_eq!(jackson.version, "2.14.2");

        let bom = packages.iter().find(|p| p.name == "com.example:internal-bom").unwrap();
        assert_eq!(bom.version, "1.0.0");
    }

    #[test]
    fn test_scope_maps_to_dep_group() {
        let f = DepFile::from_string("pom.xml", SAMPLE_POM);
        let packages = MavenLockExtractor.extract(&f).unwrap();

        let junit = packages.iter().find(|p| p.name == "junit:junit").unwrap();
        assert_eq!(junit.dep_groups, vec!["test"]);
    }

    #[test]
    fn unresolved_property_is_skipped() {
        let pom = r#"<project>
  <dependencies>
    <dependency>
      <groupId>g</groupId>
      <artifactId>a</artifactId>
      <version>${missing.property}</version>
    </dependency>
  </dependencies>
</project>"#;
        let f = DepFile::from_string("pom.xml", pom);
        let packages = MavenLockExtractor.extract(&f).unwrap();
        assert!(packages.is_empty());
    }

    #[test]
    fn versionless_dependency_is_skipped() {
        let pom = r#"<project>
  <dependencies>
    <dependency>
      <groupId>g</groupId>
      <artifactId>a</artifactId>
    </dependency>
  </dependencies>
</project>"#;
        let f = DepFile::from_string("pom.xml", pom);
        assert!(MavenLockExtractor.extract(&f).unwrap().is_empty());
    }

    #[test]
    fn malformed_xml_returns_error() {
        let f = DepFile::from_string("pom.xml", "<project><dependencies>");
        assert!(MavenLockExtractor.extract(&f).is_err());
    }
}
