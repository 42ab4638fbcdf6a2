//! 쿼리 빌더 -- 패키지를 질의 좌표로 변환
//!
//! 좌표 결정 우선순위:
//!
//! 1. `commit`이 있으면 커밋 해시로 질의
//! 2. purl로 표현 가능한 생태계면 purl로 질의
//! 3. 그 외에는 이름+생태계 좌표로 질의

use vigil_core::types::{Ecosystem, PackageDetails, SourceInfo};

use crate::models::{Query, QueryPackage};

/// 패키지의 package-URL을 만듭니다.
///
/// Maven(`group:artifact`), Go(모듈 경로), Packagist(`vendor/name`)는
/// namespace 분리가 필요하고, 나머지 매핑 가능 생태계는 이름을 그대로
/// 사용합니다. 매핑 밖의 생태계는 `None`입니다.
pub fn make_purl(pkg: &PackageDetails) -> Option<String> {
    let purl_type = pkg.ecosystem.purl_type()?;

    let namespace_and_name = match pkg.ecosystem {
        Ecosystem::Maven => {
            let (group, artifact) = pkg.name.split_once(':')?;
            format!("{group}/{artifact}")
        }
        Ecosystem::Go | Ecosystem::Packagist => {
            // 경로 자체가 namespace/name 구조
            if !pkg.name.contains('/') {
                return None;
            }
            pkg.name.clone()
        }
        _ => pkg.name.clone(),
    };

    Some(format!("pkg:{purl_type}/{namespace_and_name}@{}", pkg.version))
}

/// 패키지 하나를 질의로 변환합니다.
pub fn make_query(source: &SourceInfo, pkg: &PackageDetails) -> Query {
    if !pkg.commit.is_empty() {
        return Query {
            commit: pkg.commit.clone(),
            version: String::new(),
            package: None,
            source: source.clone(),
        };
    }

    if let Some(purl) = make_purl(pkg) {
        return Query {
            commit: String::new(),
            version: String::new(),
            package: Some(QueryPackage {
                name: String::new(),
                ecosystem: String::new(),
                purl: Some(purl),
            }),
            source: source.clone(),
        };
    }

    Query {
        commit: String::new(),
        version: pkg.version.clone(),
        package: Some(QueryPackage {
            name: pkg.name.clone(),
            ecosystem: pkg.ecosystem.as_str().to_owned(),
            purl: None,
        }),
        source: source.clone(),
    }
}

/// purl 문자열 하나를 질의로 변환합니다 (SBOM 입력용).
pub fn make_purl_query(source: &SourceInfo, purl: &str) -> Query {
    Query {
        commit: String::new(),
        version: String::new(),
        package: Some(QueryPackage {
            name: String::new(),
            ecosystem: String::new(),
            purl: Some(purl.to_owned()),
        }),
        source: source.clone(),
    }
}
