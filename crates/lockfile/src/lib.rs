#![doc = include_str!("../README.md")]
//!
//! # Module Structure
//!
//! - [`extract`]: 추출기 레지스트리와 디스패치 (`Extractor`, `DepFile`, `extract_deps`)
//! - [`parsers`]: 생태계별 lockfile 파서
//! - [`walker`]: 디렉토리 순회 및 lockfile / git 저장소 탐색
//! - [`sbom`]: CycloneDX / SPDX 문서에서 purl 추출

pub mod extract;
pub mod parsers;
pub mod sbom;
pub mod walker;

// --- Public API Re-exports ---

pub use extract::{extract_deps, find_extractor, list_extractors, DepFile, Extractor};
pub use walker::{find_git_repos, find_lockfiles, read_head_commit};
