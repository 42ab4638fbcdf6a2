//! SBOM 문서 읽기 -- CycloneDX / SPDX JSON에서 purl 추출
//!
//! SBOM 입력은 생태계 좌표 대신 purl로 질의합니다. `bomFormat` 필드가
//! 있으면 CycloneDX로, `spdxVersion` 필드가 있으면 SPDX로 해석하고,
//! 둘 다 아니면 파싱 실패로 처리합니다.

use serde::Deserialize;

use vigil_core::error::ExtractError;

use crate::extract::DepFile;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CycloneDxBom {
    bom_format: Option<String>,
    #[serde(default)]
    components: Vec<CycloneDxComponent>,
}

#[derive(Deserialize)]
struct CycloneDxComponent {
    #[serde(default)]
    purl: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SpdxDocument {
    spdx_version: Option<String>,
    #[serde(default)]
    packages: Vec<SpdxPackage>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SpdxPackage {
    #[serde(default)]
    external_refs: Vec<SpdxExternalRef>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SpdxExternalRef {
    #[serde(default)]
    reference_type: String,
    #[serde(default)]
    reference_locator: String,
}

/// SBOM 문서에서 purl 목록을 추출합니다.
pub fn extract_purls(f: &DepFile) -> Result<Vec<String>, ExtractError> {
    let parse_failed = |reason: String| ExtractError::ParseFailed {
        path: f.path().display().to_string(),
        parsed_as: "sbom".to_owned(),
        reason,
    };

    let value: serde_json::Value =
        serde_json::from_str(f.content()).map_err(|e| parse_failed(e.to_string()))?;

    if value.get("bomFormat").is_some() {
        let bom: CycloneDxBom =
            serde_json::from_value(value).map_err(|e| parse_failed(e.to_string()))?;

        if bom.bom_format.as_deref() != Some("CycloneDX") {
            return Err(parse_failed("unrecognised bomFormat".to_owned()));
        }

        return Ok(bom.components.into_iter().filter_map(|c| c.purl).collect());
    }

    if value.get("spdxVersion").is_some() {
        let doc: SpdxDocument =
            serde_json::from_value(value).map_err(|e| parse_failed(e.to_string()))?;

        if doc.spdx_version.is_none() {
            return Err(parse_failed("missing spdxVersion".to_owned()));
        }

        let purls = doc
            .packages
            .into_iter()
            .flat_map(|p| p.external_refs)
            .filter(|r| r.reference_type == "purl")
            .map(|r| r.reference_locator)
            .collect();

        return Ok(purls);
    }

    Err(parse_failed("not a CycloneDX or SPDX document".to_owned()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_CYCLONEDX: &str = r#"{
  "bomFormat": "CycloneDX",
  "specVersion": "1.4",
  "components": [
    { "type": "library", "name": "lodash", "purl": "pkg:npm/lodash@4.17.21" },
    { "type": "library", "name": "no-purl-component" }
  ]
}"#;

    const SAMPLE_SPDX: &str = r#"{
  "spdxVersion": "SPDX-2.3",
  "packages": [
    {
      "name": "requests",
      "externalRefs": [
        { "referenceCategory": "PACKAGE-MANAGER", "referenceType": "purl", "referenceLocator": "pkg:pypi/requests@2.28.0" },
        { "referenceCategory": "SECURITY", "referenceType": "cpe23Type", "referenceLocator": "cpe:2.3:a:x" }
      ]
    }
  ]
}"#;

    #[test]
    fn extract_cyclonedx_purls() {
        let f = DepFile::from_string("bom.json", SAMPLE_CYCLONEDX);
        let purls = extract_purls(&f).unwrap();
        assert_eq!(purls, vec!["pkg:npm/lodash@4.17.21"]);
    }

    #[test]
    fn extract_spdx_purls() {
        let f = DepFile::from_string("sbom.spdx.json", SAMPLE_SPDX);
        let purls = extract_purls(&f).unwrap();
        assert_eq!(purls, vec!["pkg:pypi/requests@2.28.0"]);
    }

    #[test]
    fn unknown_document_is_parse_failed() {
        let f = DepFile::from_string("random.json", r#"{"hello": "world"}"#);
        let err = extract_purls(&f).unwrap_err();
        assert!(matches!(err, ExtractError::ParseFailed { .. }));
    }

    #[test]
    fn invalid_json_is_parse_failed() {
        let f = DepFile::from_string("bom.json", "not json");
        assert!(extract_purls(&f).is_err());
    }
}
