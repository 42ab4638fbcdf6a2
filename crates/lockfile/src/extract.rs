//! 추출기 레지스트리와 디스패치
//!
//! [`Extractor`] trait은 각 lockfile 형식의 추출기가 구현해야 하는 인터페이스입니다.
//! 레지스트리는 프로세스 전역에서 단 한 번 초기화되며 이후 읽기 전용입니다.
//! 같은 이름으로 두 번 등록하는 것은 프로그래밍 오류이며 panic합니다.
//!
//! # 디스패치 규칙
//!
//! - `extract_as`가 비어있지 않으면 해당 이름으로 직접 조회합니다.
//! - 비어있으면 등록 순서(이름 오름차순)대로 `should_extract`를 시도합니다.
//! - `gradle.lockfile` / `buildscript-gradle.lockfile` 쌍은 하나의 추출기를
//!   공유하므로, 매칭된 파일의 basename을 `parsed_as`로 보고합니다.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use vigil_core::error::ExtractError;
use vigil_core::types::{Lockfile, PackageDetails};

use crate::parsers;

/// 추출 대상 의존성 파일
///
/// 경로와 내용을 함께 들고 다니므로 파서는 디스크를 직접 읽지 않습니다.
#[derive(Debug, Clone)]
pub struct DepFile {
    path: PathBuf,
    content: String,
}

impl DepFile {
    /// 파일을 읽어 `DepFile`을 생성합니다.
    pub fn open(path: &Path) -> Result<Self, ExtractError> {
        let content = std::fs::read_to_string(path).map_err(|e| ExtractError::Io {
            path: path.display().to_string(),
            source: e,
        })?;

        Ok(Self { path: path.to_path_buf(), content })
    }

    /// 메모리 내용으로 `DepFile`을 생성합니다 (테스트 및 재귀 포함용).
    pub fn from_string(path: impl Into<PathBuf>, content: impl Into<String>) -> Self {
        Self { path: path.into(), content: content.into() }
    }

    /// 원본 파일 경로를 반환합니다.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 파일 내용을 반환합니다.
    pub fn content(&self) -> &str {
        &self.content
    }
}

/// lockfile 추출기 capability
///
/// 경로 기반 판별(`should_extract`)과 내용 파싱(`extract`)의 쌍입니다.
/// 파서는 프로세스 상태에 대해 순수해야 하며 동시 호출에 안전해야 합니다.
pub trait Extractor: Send + Sync {
    /// 주어진 경로의 파일을 이 추출기가 처리할 수 있는지 확인합니다.
    fn should_extract(&self, path: &Path) -> bool;

    /// 파일 내용을 파싱하여 패키지 목록을 반환합니다.
    ///
    /// 이름을 결정할 수 없는 패키지는 결과에서 제외합니다.
    fn extract(&self, f: &DepFile) -> Result<Vec<PackageDetails>, ExtractError>;
}

type ExtractorMap = BTreeMap<&'static str, &'static (dyn Extractor + 'static)>;

static REGISTRY: OnceLock<ExtractorMap> = OnceLock::new();

fn register(map: &mut ExtractorMap, name: &'static str, extractor: &'static dyn Extractor) {
    if map.insert(name, extractor).is_some() {
        panic!("an extractor is already registered as {name}");
    }
}

/// 전역 추출기 레지스트리를 반환합니다 (최초 호출 시 1회 구축).
fn registry() -> &'static ExtractorMap {
    REGISTRY.get_or_init(|| {
        let mut m = ExtractorMap::new();
        register(&mut m, "buildscript-gradle.lockfile", &parsers::gradle::GradleLockExtractor);
        register(&mut m, "Cargo.lock", &parsers::cargo::CargoLockExtractor);
        register(&mut m, "composer.lock", &parsers::composer::ComposerLockExtractor);
        register(&mut m, "conan.lock", &parsers::conan::ConanLockExtractor);
        register(&mut m, "Gemfile.lock", &parsers::gemfile::GemfileLockExtractor);
        register(&mut m, "go.mod", &parsers::gomod::GoModExtractor);
        register(&mut m, "gradle.lockfile", &parsers::gradle::GradleLockExtractor);
        register(&mut m, "mix.lock", &parsers::mix::MixLockExtractor);
        register(&mut m, "Pipfile.lock", &parsers::pipenv::PipenvLockExtractor);
        register(&mut m, "package-lock.json", &parsers::npm::NpmLockExtractor);
        register(&mut m, "packages.lock.json", &parsers::nuget::NuGetLockExtractor);
        register(&mut m, "pnpm-lock.yaml", &parsers::pnpm::PnpmLockExtractor);
        register(&mut m, "poetry.lock", &parsers::poetry::PoetryLockExtractor);
        register(&mut m, "pom.xml", &parsers::maven::MavenLockExtractor);
        register(&mut m, "pubspec.lock", &parsers::pubspec::PubspecLockExtractor);
        register(&mut m, "requirements.txt", &parsers::requirements::RequirementsTxtExtractor);
        register(&mut m, "yarn.lock", &parsers::yarn::YarnLockExtractor);
        m
    })
}

/// gradle 추출기가 두 파일명을 지원하기 때문에 생기는 이름 불안정성을 보정합니다.
///
/// `should_extract`는 어떤 파일명에 매칭됐는지 되돌려줄 수 없으므로,
/// basename이 gradle 쌍에 속하면 basename을 보고 이름으로 사용합니다.
fn stabilize_extractor_name(path: &Path, name: &str) -> String {
    let base = path.file_name().and_then(|n| n.to_str()).unwrap_or_default();

    for lockfile in ["buildscript-gradle.lockfile", "gradle.lockfile"] {
        if lockfile == base {
            return base.to_owned();
        }
    }

    name.to_owned()
}

/// 경로(또는 명시적 이름)에 맞는 추출기를 찾습니다.
///
/// `extract_as`가 비어있지 않으면 레지스트리 직접 조회, 아니면
/// `should_extract` 순회로 결정합니다. 반환되는 문자열이 `parsed_as`가 됩니다.
pub fn find_extractor(
    path: &Path,
    extract_as: &str,
) -> Option<(&'static dyn Extractor, String)> {
    if !extract_as.is_empty() {
        return registry().get(extract_as).map(|e| (*e, extract_as.to_owned()));
    }

    for (name, extractor) in registry() {
        if extractor.should_extract(path) {
            return Some((*extractor, stabilize_extractor_name(path, name)));
        }
    }

    None
}

/// 등록된 추출기 이름 목록을 반환합니다.
///
/// 대소문자 구분 없는 알파벳순으로 정렬됩니다 (사용자 메시지용).
pub fn list_extractors() -> Vec<&'static str> {
    let mut names: Vec<&'static str> = registry().keys().copied().collect();
    names.sort_by_key(|n| n.to_lowercase());
    names
}

/// 의존성 파일에서 패키지 목록을 추출합니다.
///
/// 추출기를 찾지 못하면 `ExtractorNotFound`(자동 판별) 또는
/// `ExtractorNotRegistered`(명시적 `extract_as`)를 반환합니다.
/// 결과 패키지 목록은 (name, version) 기준 오름차순 정렬되고
/// 중복이 제거됩니다.
pub fn extract_deps(f: &DepFile, extract_as: &str) -> Result<Lockfile, ExtractError> {
    let Some((extractor, extracted_as)) = find_extractor(f.path(), extract_as) else {
        if !extract_as.is_empty() {
            return Err(ExtractError::ExtractorNotRegistered { requested: extract_as.to_owned() });
        }

        return Err(ExtractError::ExtractorNotFound { path: f.path().display().to_string() });
    };

    let mut packages = extractor.extract(f)?;

    // 이름∧버전 또는 커밋 불변 조건을 만족하지 못하는 항목 제거
    packages.retain(PackageDetails::is_identifiable);

    packages.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.version.cmp(&b.version)));
    packages.dedup_by(|a, b| a.name == b.name && a.version == b.version);

    Ok(Lockfile {
        file_path: f.path().display().to_string(),
        parsed_as: extracted_as,
        packages,
    })
}
