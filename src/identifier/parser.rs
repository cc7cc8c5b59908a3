//! Parsers for the composite identifier syntaxes
//!
//! Supported forms:
//! - Module ID: `namespace/name/provider/version`
//! - Policy ID: `[policies/]namespace/name/version`
//! - Provider URI: `namespace/name`, `namespace/name/version`,
//!   `registry://namespace/name[/version]`,
//!   `providers/namespace/name[/versions/<version>]`
//!
//! Every parser either returns a fully validated value or a
//! [`ValidationError`] naming the offending field.

use regex::Regex;

use crate::error::{MultiError, RegistryError, ValidationError};
use crate::identifier::types::{Identity, ModuleId, PolicyId, ProviderUri};
use crate::version::semver::{VersionComparator, is_sentinel};

/// Namespaces and module/policy names
const NAME_PATTERN: &str = r"^[a-zA-Z0-9][a-zA-Z0-9\-_]*$";
/// Provider names: lowercase start, lowercase/digits/hyphen
const PROVIDER_PATTERN: &str = r"^[a-z][a-z0-9\-]*$";

const POLICY_MARKER: &str = "policies/";
const PROVIDER_URI_PREFIXES: &[&str] = &["registry://", "providers/"];
const COLLECTION_MARKERS: &[&str] = &["providers", "name"];
const VERSION_MARKERS: &[&str] = &["versions", "version"];

/// Owns the compiled identifier grammars and the version comparator
#[derive(Debug, Clone)]
pub struct IdentifierParser {
    name_re: Regex,
    provider_re: Regex,
    versions: VersionComparator,
}

impl IdentifierParser {
    pub fn new() -> Self {
        Self::with_comparator(VersionComparator::new())
    }

    pub fn with_comparator(versions: VersionComparator) -> Self {
        Self {
            name_re: Regex::new(NAME_PATTERN).expect("name pattern is a valid regex"),
            provider_re: Regex::new(PROVIDER_PATTERN).expect("provider pattern is a valid regex"),
            versions,
        }
    }

    pub fn versions(&self) -> &VersionComparator {
        &self.versions
    }

    pub fn is_valid_name(&self, value: &str) -> bool {
        self.name_re.is_match(value)
    }

    pub fn is_valid_provider(&self, value: &str) -> bool {
        self.provider_re.is_match(value)
    }

    /// Parse `namespace/name/provider/version`
    pub fn parse_module_id(&self, module_id: &str) -> Result<ModuleId, ValidationError> {
        if module_id.is_empty() {
            return Err(ValidationError::new(
                "module_id",
                module_id,
                "module ID cannot be empty",
            ));
        }

        let segments: Vec<&str> = module_id.split('/').map(str::trim).collect();
        let [namespace, name, provider, version] = segments.as_slice() else {
            return Err(ValidationError::new(
                "module_id",
                module_id,
                format!(
                    "invalid module ID format: {}, expected namespace/name/provider/version (got {} segments)",
                    module_id,
                    segments.len()
                ),
            ));
        };

        self.check_name("namespace", namespace)?;
        self.check_name("name", name)?;
        self.check_provider("provider", provider)?;
        self.check_version(version)?;

        Ok(ModuleId {
            namespace: namespace.to_string(),
            name: name.to_string(),
            provider: provider.to_string(),
            version: version.to_string(),
        })
    }

    /// Parse `[policies/]namespace/name/version`
    pub fn parse_policy_id(&self, policy_id: &str) -> Result<PolicyId, ValidationError> {
        if policy_id.is_empty() {
            return Err(ValidationError::new(
                "policy_id",
                policy_id,
                "policy ID cannot be empty",
            ));
        }

        let stripped = policy_id
            .strip_prefix(POLICY_MARKER)
            .unwrap_or(policy_id)
            .trim();

        let segments: Vec<&str> = stripped.split('/').map(str::trim).collect();
        let [namespace, name, version] = segments.as_slice() else {
            return Err(ValidationError::new(
                "policy_id",
                policy_id,
                format!(
                    "invalid policy ID format: {}, expected namespace/name/version (got {} segments)",
                    policy_id,
                    segments.len()
                ),
            ));
        };

        self.check_name("namespace", namespace)?;
        self.check_name("name", name)?;
        self.check_version(version)?;

        Ok(PolicyId {
            namespace: namespace.to_string(),
            name: name.to_string(),
            version: version.to_string(),
        })
    }

    /// Parse any of the accepted provider URI forms
    pub fn parse_provider_uri(&self, uri: &str) -> Result<ProviderUri, ValidationError> {
        let invalid_format = |detail: &str| {
            ValidationError::new(
                "provider_uri",
                uri,
                format!("invalid provider URI format: {}, {}", uri, detail),
            )
        };

        let mut normalized = uri.trim();
        if normalized.is_empty() {
            return Err(ValidationError::new(
                "provider_uri",
                uri,
                "provider URI cannot be empty",
            ));
        }
        for prefix in PROVIDER_URI_PREFIXES {
            normalized = normalized.strip_prefix(prefix).unwrap_or(normalized);
        }

        let segments: Vec<&str> = normalized.split('/').map(str::trim).collect();
        let (namespace, name, version) = match segments.as_slice() {
            [namespace, name] => (*namespace, *name, None),
            [namespace, name, version] if !COLLECTION_MARKERS.contains(name) => {
                (*namespace, *name, Some(*version))
            }
            [namespace, marker, name] if COLLECTION_MARKERS.contains(marker) => {
                (*namespace, *name, None)
            }
            [namespace, name, marker, version] if VERSION_MARKERS.contains(marker) => {
                (*namespace, *name, Some(*version))
            }
            [namespace, collection, name, marker, version]
                if COLLECTION_MARKERS.contains(collection) && VERSION_MARKERS.contains(marker) =>
            {
                (*namespace, *name, Some(*version))
            }
            [_] => return Err(invalid_format("expected at least namespace/name")),
            _ => {
                return Err(invalid_format(
                    "expected namespace/name[/version] or namespace/name/versions/<version>",
                ));
            }
        };

        self.check_name("namespace", namespace)?;
        self.check_provider("name", name)?;
        let version = match version {
            Some(v) if !is_sentinel(v) => {
                self.check_version(v)?;
                Some(v.to_string())
            }
            _ => None,
        };

        Ok(ProviderUri {
            namespace: namespace.to_string(),
            name: name.to_string(),
            version,
        })
    }

    /// Validate separately supplied module fields, collecting every violation.
    /// `version` is optional for lookups that resolve the latest version.
    pub fn validate_module_fields(
        &self,
        namespace: &str,
        name: &str,
        provider: &str,
        version: Option<&str>,
    ) -> Result<(), RegistryError> {
        let mut errors = MultiError::new();
        collect(&mut errors, self.check_name("namespace", namespace));
        collect(&mut errors, self.check_name("name", name));
        collect(&mut errors, self.check_provider("provider", provider));
        if let Some(version) = version {
            collect(&mut errors, self.check_version(version));
        }
        errors.into_result()
    }

    pub fn validate_provider_fields(&self, namespace: &str, name: &str) -> Result<(), RegistryError> {
        let mut errors = MultiError::new();
        collect(&mut errors, self.check_name("namespace", namespace));
        collect(&mut errors, self.check_provider("name", name));
        errors.into_result()
    }

    pub fn validate_policy_fields(
        &self,
        namespace: &str,
        name: &str,
        version: &str,
    ) -> Result<(), RegistryError> {
        let mut errors = MultiError::new();
        collect(&mut errors, self.check_name("namespace", namespace));
        collect(&mut errors, self.check_name("name", name));
        collect(&mut errors, self.check_version(version));
        errors.into_result()
    }

    /// Version-independent identity of a listed item's ID.
    ///
    /// Module and policy IDs collapse to their base; anything else is its
    /// own key.
    pub fn identity(&self, id: &str) -> Identity {
        if let Ok(module) = self.parse_module_id(id) {
            return Identity {
                key: module.base(),
                version: Some(module.version),
            };
        }
        if let Ok(policy) = self.parse_policy_id(id) {
            return Identity {
                key: policy.base(),
                version: Some(policy.version),
            };
        }
        Identity {
            key: id.to_string(),
            version: None,
        }
    }

    fn check_name(&self, field: &str, value: &str) -> Result<(), ValidationError> {
        if value.is_empty() {
            return Err(ValidationError::new(
                field,
                value,
                format!("{} cannot be empty", field),
            ));
        }
        if !self.is_valid_name(value) {
            return Err(ValidationError::new(
                field,
                value,
                format!(
                    "invalid {} format: {} (must start with a letter or digit and contain only letters, digits, '-' or '_')",
                    field, value
                ),
            ));
        }
        Ok(())
    }

    fn check_provider(&self, field: &str, value: &str) -> Result<(), ValidationError> {
        if value.is_empty() {
            return Err(ValidationError::new(
                field,
                value,
                format!("{} cannot be empty", field),
            ));
        }
        if !self.is_valid_provider(value) {
            return Err(ValidationError::new(
                field,
                value,
                format!(
                    "invalid provider name format: {} (must start with a lowercase letter and contain only lowercase letters, digits or '-')",
                    value
                ),
            ));
        }
        Ok(())
    }

    fn check_version(&self, value: &str) -> Result<(), ValidationError> {
        if value.is_empty() {
            return Err(ValidationError::new("version", value, "version cannot be empty"));
        }
        self.versions.validate(value)
    }
}

impl Default for IdentifierParser {
    fn default() -> Self {
        Self::new()
    }
}

fn collect(errors: &mut MultiError, result: Result<(), ValidationError>) {
    if let Err(error) = result {
        errors.add(error);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn parser() -> IdentifierParser {
        IdentifierParser::new()
    }

    #[test]
    fn parse_module_id_returns_all_fields() {
        let id = parser().parse_module_id("ns/name/prov/1.0.0").unwrap();

        assert_eq!(
            id,
            ModuleId {
                namespace: "ns".to_string(),
                name: "name".to_string(),
                provider: "prov".to_string(),
                version: "1.0.0".to_string(),
            }
        );
        assert_eq!(id.to_string(), "ns/name/prov/1.0.0");
    }

    #[test]
    fn parse_module_id_trims_segments() {
        let id = parser()
            .parse_module_id(" terraform-aws-modules / vpc / aws / v5.1.0 ")
            .unwrap();

        assert_eq!(id.base(), "terraform-aws-modules/vpc/aws");
        assert_eq!(id.version, "v5.1.0");
    }

    #[rstest]
    #[case("", "module_id", "cannot be empty")]
    #[case("ns/name/prov", "module_id", "expected namespace/name/provider/version")]
    #[case("ns/name/prov/1.0.0/extra", "module_id", "got 5 segments")]
    #[case("na@me/name/prov/1.0.0", "namespace", "invalid namespace format")]
    #[case("-ns/name/prov/1.0.0", "namespace", "invalid namespace format")]
    #[case("ns//prov/1.0.0", "name", "name cannot be empty")]
    #[case("ns/na.me/prov/1.0.0", "name", "invalid name format")]
    #[case("ns/name/AWS/1.0.0", "provider", "invalid provider name format")]
    #[case("ns/name/1aws/1.0.0", "provider", "invalid provider name format")]
    #[case("ns/name/prov/", "version", "version cannot be empty")]
    #[case("ns/name/prov/1.0", "version", "invalid semantic version format")]
    fn parse_module_id_rejects(
        #[case] input: &str,
        #[case] field: &str,
        #[case] message: &str,
    ) {
        let err = parser().parse_module_id(input).unwrap_err();

        assert_eq!(err.field, field);
        assert!(
            err.message.contains(message),
            "message {:?} should contain {:?}",
            err.message,
            message
        );
    }

    #[rstest]
    #[case("hashicorp/CIS-Policy-Set/1.0.1")]
    #[case("policies/hashicorp/CIS-Policy-Set/1.0.1")]
    fn parse_policy_id_accepts_optional_marker(#[case] input: &str) {
        let id = parser().parse_policy_id(input).unwrap();

        assert_eq!(
            id,
            PolicyId {
                namespace: "hashicorp".to_string(),
                name: "CIS-Policy-Set".to_string(),
                version: "1.0.1".to_string(),
            }
        );
    }

    #[rstest]
    #[case("", "policy_id")]
    #[case("hashicorp/cis", "policy_id")]
    #[case("policies/hashicorp/cis/1.0.0/extra", "policy_id")]
    #[case("hash!corp/cis/1.0.0", "namespace")]
    #[case("hashicorp/_cis/1.0.0", "name")]
    #[case("hashicorp/cis/one", "version")]
    fn parse_policy_id_rejects(#[case] input: &str, #[case] field: &str) {
        assert_eq!(parser().parse_policy_id(input).unwrap_err().field, field);
    }

    #[rstest]
    #[case("hashicorp/aws", "hashicorp", "aws", None)]
    #[case("hashicorp/aws/5.31.0", "hashicorp", "aws", Some("5.31.0"))]
    #[case("hashicorp/aws/latest", "hashicorp", "aws", None)]
    #[case("registry://hashicorp/aws", "hashicorp", "aws", None)]
    #[case("registry://hashicorp/aws/v4.0.0", "hashicorp", "aws", Some("v4.0.0"))]
    #[case("providers/hashicorp/aws", "hashicorp", "aws", None)]
    #[case("providers/hashicorp/aws/versions/5.0.0", "hashicorp", "aws", Some("5.0.0"))]
    #[case("hashicorp/providers/aws", "hashicorp", "aws", None)]
    #[case("hashicorp/providers/aws/versions/5.0.0", "hashicorp", "aws", Some("5.0.0"))]
    #[case("Azure/azapi/version/1.2.0", "Azure", "azapi", Some("1.2.0"))]
    fn parse_provider_uri_accepts(
        #[case] input: &str,
        #[case] namespace: &str,
        #[case] name: &str,
        #[case] version: Option<&str>,
    ) {
        let uri = parser().parse_provider_uri(input).unwrap();

        assert_eq!(
            uri,
            ProviderUri {
                namespace: namespace.to_string(),
                name: name.to_string(),
                version: version.map(str::to_string),
            }
        );
    }

    #[rstest]
    #[case("", "provider_uri")]
    #[case("hashicorp", "provider_uri")]
    #[case("hashicorp/aws/5.0.0/extra", "provider_uri")]
    #[case("/aws", "namespace")]
    #[case("hashicorp/", "name")]
    #[case("hashicorp/AWS", "name")]
    #[case("hashicorp/aws/5.0", "version")]
    #[case("providers/hashicorp/aws/versions/x", "version")]
    fn parse_provider_uri_rejects(#[case] input: &str, #[case] field: &str) {
        assert_eq!(parser().parse_provider_uri(input).unwrap_err().field, field);
    }

    #[test]
    fn validate_module_fields_collects_every_violation() {
        let err = parser()
            .validate_module_fields("", "bad name", "AWS", Some("1.0"))
            .unwrap_err();

        let RegistryError::Multi(multi) = err else {
            panic!("expected aggregated error");
        };
        let fields: Vec<&str> = multi.errors().iter().map(|e| e.field.as_str()).collect();
        assert_eq!(fields, vec!["namespace", "name", "provider", "version"]);
    }

    #[test]
    fn validate_module_fields_collapses_single_violation() {
        let err = parser()
            .validate_module_fields("ns", "name", "aws", Some("nope"))
            .unwrap_err();

        assert!(matches!(err, RegistryError::Validation(ref e) if e.field == "version"));
    }

    #[test]
    fn validate_module_fields_skips_missing_version() {
        assert!(parser().validate_module_fields("ns", "name", "aws", None).is_ok());
    }

    #[test]
    fn validate_policy_fields_requires_version() {
        let err = parser().validate_policy_fields("ns", "name", "").unwrap_err();
        assert!(matches!(err, RegistryError::Validation(ref e) if e.field == "version"));
    }

    #[rstest]
    #[case("ns/vpc/aws/1.2.0", "ns/vpc/aws", Some("1.2.0"))]
    #[case("hashicorp/cis/1.0.0", "hashicorp/cis", Some("1.0.0"))]
    #[case("opaque-id-42", "opaque-id-42", None)]
    fn identity_drops_version(
        #[case] id: &str,
        #[case] key: &str,
        #[case] version: Option<&str>,
    ) {
        assert_eq!(
            parser().identity(id),
            Identity {
                key: key.to_string(),
                version: version.map(str::to_string),
            }
        );
    }
}
