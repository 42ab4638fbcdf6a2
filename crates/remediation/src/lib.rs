#![doc = include_str!("../README.md")]
//!
//! # Module Structure
//!
//! - [`model`]: 해결 그래프, 매니페스트, diff 타입
//! - [`client`]: 리졸버 클라이언트 seam (`ResolutionClient`)
//! - [`override_engine`]: 오버라이드 교정 엔진 (`OverrideRemediator`)

pub mod client;
pub mod model;
pub mod override_engine;

// --- Public API Re-exports ---

pub use client::ResolutionClient;
pub use model::{
    calculate_diff, DependencyChain, DependencyPatch, Manifest, PackageKey, RequirementVersion,
    ResolutionDiff, ResolutionResult, ResolutionVuln, VersionKey,
};
pub use override_engine::{patch_manifest, OverrideRemediator, RemediationOptions, VulnPredicate};
