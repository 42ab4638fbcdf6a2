//! 오버라이드 교정 엔진
//!
//! 매칭된 취약점마다 추측성 시도를 하나씩 띄우고(세마포어로 동시성 제한),
//! 각 시도는 내부 루프에서 패치 → 재해결 → 재필터를 진전이 없을 때까지
//! 반복합니다. 시도가 새 취약점을 유발하면 ID 집합을 넓힌 후속 시도를
//! 띄웁니다 (재귀 깊이는 전체 취약점 수로 유계). 완료된 diff는 전순서로
//! 정렬하고 중복을 제거합니다.
//!
//! # 상태 기계 (시도 하나)
//!
//! ```text
//! START → COLLECT_VKS → PICK_VERSIONS
//!           │               │
//!           │               ├── no picks ──→ DONE
//!           │               └── picks ────→ PATCH_MANIFEST → RESOLVE → FILTER ──→ COLLECT_VKS
//!           └── no vulns left ─────────────→ DONE
//! ```

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use tokio::sync::{mpsc, Semaphore};
use tracing::debug;

use vigil_advisory::affects::is_affected;
use vigil_advisory::version;
use vigil_core::error::RemediationError;
use vigil_core::types::{Ecosystem, PackageDetails};

use crate::client::ResolutionClient;
use crate::model::{
    calculate_diff, DependencyPatch, Manifest, RequirementVersion, ResolutionDiff,
    ResolutionResult, ResolutionVuln, VersionKey,
};

/// 취약점 매칭 술어
pub type VulnPredicate = Arc<dyn Fn(&ResolutionVuln) -> bool + Send + Sync>;

/// 엔진 정책 옵션
#[derive(Clone)]
pub struct RemediationOptions {
    /// 교정 대상 취약점을 고르는 술어
    pub match_vuln: VulnPredicate,
    /// 버전을 바꾸지 않을 패키지 이름 목록
    pub avoid_pkgs: Vec<String>,
    /// major 버전 변경 허용 여부
    pub allow_major: bool,
}

impl Default for RemediationOptions {
    fn default() -> Self {
        Self { match_vuln: Arc::new(|_| true), avoid_pkgs: Vec::new(), allow_major: false }
    }
}

/// 오버라이드 교정 엔진
pub struct OverrideRemediator {
    client: Arc<dyn ResolutionClient>,
    max_concurrency: usize,
}

type AttemptOutcome = Result<(ResolutionResult, Vec<DependencyPatch>), RemediationError>;

impl OverrideRemediator {
    /// 리졸버 클라이언트와 동시 시도 상한으로 엔진을 생성합니다.
    pub fn new(client: Arc<dyn ResolutionClient>, max_concurrency: usize) -> Self {
        Self { client, max_concurrency: max_concurrency.max(1) }
    }

    /// 매칭된 각 취약점에 대한 오버라이드 diff를 계산합니다.
    ///
    /// 원본 `result`는 변경되지 않습니다. 반환 목록은 전순서로 정렬되고
    /// 중복이 제거된 상태입니다.
    pub async fn compute_override_patches(
        &self,
        result: &ResolutionResult,
        opts: &RemediationOptions,
    ) -> Result<Vec<ResolutionDiff>, RemediationError> {
        let mut base = result.clone();
        let match_vuln = Arc::clone(&opts.match_vuln);
        base.filter_vulns(|v| match_vuln(v));

        let base = Arc::new(base);
        let opts = Arc::new(opts.clone());
        let semaphore = Arc::new(Semaphore::new(self.max_concurrency));
        let (tx, mut rx) = mpsc::unbounded_channel::<(Vec<String>, AttemptOutcome)>();

        let mut outstanding = 0usize;
        for vuln in &base.vulns {
            self.spawn_attempt(
                &base,
                &opts,
                &semaphore,
                &tx,
                vec![vuln.vulnerability.id.clone()],
            );
            outstanding += 1;
        }

        // 후속 시도가 늦게 도착할 수 있으므로 고정 크기 채널이 아니라
        // 미완료 카운터로 종료를 판단한다.
        let mut diffs: Vec<ResolutionDiff> = Vec::new();
        while outstanding > 0 {
            let Some((vuln_ids, outcome)) = rx.recv().await else {
                break;
            };
            outstanding -= 1;

            let (patched, patches) = match outcome {
                Ok(success) => success,
                Err(RemediationError::OverrideImpossible) => continue,
                // 잘못된 매니페스트 종류는 모든 시도가 똑같이 실패하므로 표면화
                Err(RemediationError::UnsupportedEcosystem) => {
                    return Err(RemediationError::UnsupportedEcosystem);
                }
                // 클라이언트 실패는 해당 시도만 버리고 나머지는 계속
                Err(e) => {
                    tracing::warn!(error = %e, "remediation attempt failed, skipping");
                    continue;
                }
            };

            let diff = calculate_diff(&base, &patched, &patches);

            // 패치가 새 취약점을 유발했으면 ID 집합을 넓혀 다시 시도
            let newly_added: Vec<String> = diff
                .added_vulns
                .iter()
                .filter(|id| !vuln_ids.contains(id))
                .cloned()
                .collect();

            diffs.push(diff);

            if !newly_added.is_empty() {
                debug!(count = newly_added.len(), "patch introduced new vulns, broadening attempt");
                let mut extended = vuln_ids;
                extended.extend(newly_added);
                self.spawn_attempt(&base, &opts, &semaphore, &tx, extended);
                outstanding += 1;
            }
        }

        diffs.sort_by(ResolutionDiff::total_cmp);
        diffs.dedup_by(|a, b| a.total_cmp(b) == Ordering::Equal);

        Ok(diffs)
    }

    fn spawn_attempt(
        &self,
        base: &Arc<ResolutionResult>,
        opts: &Arc<RemediationOptions>,
        semaphore: &Arc<Semaphore>,
        tx: &mpsc::UnboundedSender<(Vec<String>, AttemptOutcome)>,
        vuln_ids: Vec<String>,
    ) {
        let client = Arc::clone(&self.client);
        let base = Arc::clone(base);
        let opts = Arc::clone(opts);
        let semaphore = Arc::clone(semaphore);
        let tx = tx.clone();

        tokio::spawn(async move {
            let _permit = match semaphore.acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => {
                    let _ = tx.send((vuln_ids, Err(RemediationError::OverrideImpossible)));
                    return;
                }
            };

            let outcome = override_patch_vulns(&*client, &base, &vuln_ids, &opts).await;
            let _ = tx.send((vuln_ids, outcome));
        });
    }
}

/// `vuln_ids`에 속한 취약점을 가능한 한 많이 고치는 내부 고정점 루프.
///
/// 한 개도 고칠 수 없으면 `OverrideImpossible`을 반환합니다.
async fn override_patch_vulns(
    client: &dyn ResolutionClient,
    base: &ResolutionResult,
    vuln_ids: &[String],
    opts: &RemediationOptions,
) -> AttemptOutcome {
    let mut result = base.clone();
    let mut effective_patches: Vec<DependencyPatch> = Vec::new();

    loop {
        // COLLECT_VKS: 각 VersionKey에 걸린 취약점 인덱스 수집 (취약점당 중복 제거)
        let mut vk_vulns: BTreeMap<VersionKey, Vec<usize>> = BTreeMap::new();
        for (idx, vuln) in result.vulns.iter().enumerate() {
            if !vuln_ids.contains(&vuln.vulnerability.id) {
                continue;
            }

            let mut seen: BTreeSet<&VersionKey> = BTreeSet::new();
            for chain in vuln.problem_chains.iter().chain(&vuln.non_problem_chains) {
                let Some(vk) = chain.end() else {
                    continue;
                };
                if seen.insert(vk) {
                    vk_vulns.entry(vk.clone()).or_default().push(idx);
                }
            }
        }

        if vk_vulns.is_empty() {
            // 대상 취약점이 모두 사라짐
            break;
        }

        // PICK_VERSIONS
        let mut new_patches: Vec<DependencyPatch> = Vec::new();

        for (vk, vuln_indices) in &vk_vulns {
            if opts.avoid_pkgs.contains(&vk.package_key.name) {
                continue;
            }

            let compare_as = vk.package_key.ecosystem;
            let mut versions = client.versions(&vk.package_key).await?;
            versions.sort_by(|a, b| version::compare(compare_as, a, b));

            let start = match versions
                .binary_search_by(|candidate| version::compare(compare_as, candidate, &vk.version))
            {
                // 현재 버전 바로 다음부터 (순증가 보장)
                Ok(found) => found + 1,
                Err(insertion) => insertion,
            };

            let mut best_version = vk.version.clone();
            let mut best_count = vuln_indices.len();

            for candidate in &versions[start..] {
                if !opts.allow_major && version::is_major_bump(&vk.version, candidate) {
                    break;
                }

                let candidate_pkg = candidate_details(vk, candidate);
                let remaining = vuln_indices
                    .iter()
                    .filter(|&&i| is_affected(&result.vulns[i].vulnerability, &candidate_pkg))
                    .count();

                if remaining < best_count {
                    best_count = remaining;
                    best_version = candidate.clone();

                    if best_count == 0 {
                        break;
                    }
                }
            }

            if best_count < vuln_indices.len() {
                new_patches.push(DependencyPatch {
                    package_key: vk.package_key.clone(),
                    orig_version: vk.version.clone(),
                    new_version: best_version,
                });
            }
        }

        if new_patches.is_empty() {
            break;
        }

        // PATCH_MANIFEST → RESOLVE → FILTER
        let patched_manifest = patch_manifest(&new_patches, &result.manifest)?;
        result = client.resolve(&patched_manifest).await?;
        let match_vuln = Arc::clone(&opts.match_vuln);
        result.filter_vulns(|v| match_vuln(v));

        // 같은 PackageKey로 이어지는 패치는 누적하지 않고 버전을 갱신
        for patch in new_patches {
            let chained = effective_patches.iter_mut().find(|existing| {
                existing.package_key == patch.package_key
                    && existing.new_version == patch.orig_version
            });

            match chained {
                Some(existing) => existing.new_version = patch.new_version,
                None => effective_patches.push(patch),
            }
        }
    }

    if effective_patches.is_empty() {
        return Err(RemediationError::OverrideImpossible);
    }

    effective_patches.sort_by(|a, b| {
        a.package_key.cmp(&b.package_key).then_with(|| {
            version::compare(a.package_key.ecosystem, &a.orig_version, &b.orig_version)
        })
    });

    Ok((result, effective_patches))
}

fn candidate_details(vk: &VersionKey, candidate: &str) -> PackageDetails {
    PackageDetails::new(
        vk.package_key.name.clone(),
        candidate.to_owned(),
        vk.package_key.ecosystem,
    )
}

/// 패치를 매니페스트에 적용합니다 (현재 Maven 전용).
///
/// origin이 `management`(또는 미설정)인 일치 요구사항을 다시 쓰고,
/// 같은 PackageKey로 겹치는 다른 origin의 중복은 제거합니다.
/// 일치하는 요구사항이 없으면 `origin=management`로 새로 추가합니다.
pub fn patch_manifest(
    patches: &[DependencyPatch],
    manifest: &Manifest,
) -> Result<Manifest, RemediationError> {
    if manifest.ecosystem != Ecosystem::Maven {
        return Err(RemediationError::UnsupportedEcosystem);
    }

    let mut patched = manifest.clone();

    for patch in patches {
        let mut found = false;
        let mut kept: Vec<RequirementVersion> = Vec::with_capacity(patched.requirements.len());

        for mut requirement in patched.requirements {
            if requirement.version_key.package_key != patch.package_key {
                kept.push(requirement);
                continue;
            }

            match requirement.origin.as_deref() {
                None | Some("management") => {
                    found = true;
                    requirement.version_key.version = patch.new_version.clone();
                    kept.push(requirement);
                }
                // 같은 PackageKey에 겹치는 다른 origin의 요구사항은 제거
                Some(_) => {}
            }
        }

        if !found {
            kept.push(RequirementVersion {
                version_key: VersionKey {
                    package_key: patch.package_key.clone(),
                    version: patch.new_version.clone(),
                },
                origin: Some("management".to_owned()),
            });
        }

        patched.requirements = kept;
    }

    Ok(patched)
}
