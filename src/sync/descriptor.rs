//! Static resource descriptors and typed attribute values.
//!
//! A descriptor is the per-kind metadata defined once at process start:
//! attribute names, value types, required/optional/computed modes and
//! sensitivity flags. Every reconciled attribute set is checked against its
//! descriptor before it is persisted.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The four manageable resource kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResourceKind {
    /// A Valohai project.
    Project,
    /// A team within an organization.
    Team,
    /// A storage backend.
    Store,
    /// Container registry credentials.
    RegistryCredentials,
}

impl ResourceKind {
    /// API collection segment for this kind.
    #[must_use]
    pub const fn collection(self) -> &'static str {
        match self {
            Self::Project => "projects",
            Self::Team => "teams",
            Self::Store => "stores",
            Self::RegistryCredentials => "registry-credentials",
        }
    }

    /// Static descriptor for this kind.
    #[must_use]
    pub const fn descriptor(self) -> &'static ResourceDescriptor {
        match self {
            Self::Project => &PROJECT,
            Self::Team => &TEAM,
            Self::Store => &STORE,
            Self::RegistryCredentials => &REGISTRY_CREDENTIALS,
        }
    }
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = match self {
            Self::Project => "project",
            Self::Team => "team",
            Self::Store => "store",
            Self::RegistryCredentials => "registry-credentials",
        };
        write!(f, "{kind}")
    }
}

/// Attribute value types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttrType {
    /// UTF-8 string.
    String,
    /// Signed integer.
    Int,
    /// Boolean.
    Bool,
    /// Ordered list of strings.
    StringList,
    /// String-keyed map of strings.
    StringMap,
}

/// Whether an attribute is caller-supplied or server-owned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttrMode {
    /// Must be declared by the caller.
    Required,
    /// May be declared; omitted from payloads when unset.
    Optional,
    /// Owned by the server; always reflects the remote record.
    Computed,
}

/// Static metadata for one attribute.
#[derive(Debug)]
pub struct AttrSpec {
    /// Attribute name.
    pub name: &'static str,
    /// Value type.
    pub ty: AttrType,
    /// Attribute mode.
    pub mode: AttrMode,
    /// Redacted in human-readable output.
    pub sensitive: bool,
}

impl AttrSpec {
    /// A required attribute.
    #[must_use]
    pub const fn required(name: &'static str, ty: AttrType) -> Self {
        Self {
            name,
            ty,
            mode: AttrMode::Required,
            sensitive: false,
        }
    }

    /// An optional attribute.
    #[must_use]
    pub const fn optional(name: &'static str, ty: AttrType) -> Self {
        Self {
            name,
            ty,
            mode: AttrMode::Optional,
            sensitive: false,
        }
    }

    /// A server-computed attribute.
    #[must_use]
    pub const fn computed(name: &'static str, ty: AttrType) -> Self {
        Self {
            name,
            ty,
            mode: AttrMode::Computed,
            sensitive: false,
        }
    }

    /// Marks the attribute as sensitive.
    #[must_use]
    pub const fn sensitive(mut self) -> Self {
        self.sensitive = true;
        self
    }
}

/// Static, per-kind resource metadata.
#[derive(Debug)]
pub struct ResourceDescriptor {
    /// The kind this descriptor describes.
    pub kind: ResourceKind,
    /// Attribute specifications.
    pub attributes: &'static [AttrSpec],
}

impl ResourceDescriptor {
    /// Looks up an attribute specification by name.
    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&AttrSpec> {
        self.attributes.iter().find(|spec| spec.name == name)
    }

    /// API collection segment for this kind.
    #[must_use]
    pub const fn collection(&self) -> &'static str {
        self.kind.collection()
    }

    /// Checks a reconciled attribute map against this descriptor:
    /// no unknown attributes, no type mismatches, no missing required
    /// attributes.
    ///
    /// # Errors
    ///
    /// Returns a description of the first violation found.
    pub fn check(
        &self,
        attributes: &BTreeMap<String, AttrValue>,
    ) -> std::result::Result<(), String> {
        for (name, value) in attributes {
            let Some(spec) = self.attribute(name) else {
                return Err(format!("unknown attribute '{name}'"));
            };
            if value.attr_type() != spec.ty {
                return Err(format!(
                    "attribute '{name}' has type {:?}, expected {:?}",
                    value.attr_type(),
                    spec.ty
                ));
            }
        }

        for spec in self.attributes {
            if spec.mode == AttrMode::Required && !attributes.contains_key(spec.name) {
                return Err(format!("missing required attribute '{}'", spec.name));
            }
        }

        Ok(())
    }
}

/// A typed attribute value in reconciled state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttrValue {
    /// Boolean value.
    Bool(bool),
    /// Integer value.
    Int(i64),
    /// String value.
    Str(String),
    /// Ordered list of strings.
    List(Vec<String>),
    /// String-keyed map of strings.
    Map(BTreeMap<String, String>),
}

impl AttrValue {
    /// Returns the type of this value.
    #[must_use]
    pub const fn attr_type(&self) -> AttrType {
        match self {
            Self::Bool(_) => AttrType::Bool,
            Self::Int(_) => AttrType::Int,
            Self::Str(_) => AttrType::String,
            Self::List(_) => AttrType::StringList,
            Self::Map(_) => AttrType::StringMap,
        }
    }
}

impl std::fmt::Display for AttrValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bool(value) => write!(f, "{value}"),
            Self::Int(value) => write!(f, "{value}"),
            Self::Str(value) => write!(f, "{value}"),
            Self::List(values) => write!(f, "{}", values.join(", ")),
            Self::Map(entries) => {
                let rendered: Vec<String> = entries
                    .iter()
                    .map(|(key, value)| format!("{key}={value}"))
                    .collect();
                write!(f, "{}", rendered.join(", "))
            }
        }
    }
}

/// Descriptor for `project` resources.
pub static PROJECT: ResourceDescriptor = ResourceDescriptor {
    kind: ResourceKind::Project,
    attributes: &[
        AttrSpec::required("name", AttrType::String),
        AttrSpec::required("owner", AttrType::String),
        AttrSpec::optional("description", AttrType::String),
        AttrSpec::optional("template_url", AttrType::String),
        AttrSpec::optional("default_notifications", AttrType::Bool),
        AttrSpec::computed("url", AttrType::String),
    ],
};

/// Descriptor for `team` resources.
pub static TEAM: ResourceDescriptor = ResourceDescriptor {
    kind: ResourceKind::Team,
    attributes: &[
        AttrSpec::required("name", AttrType::String),
        AttrSpec::required("organization", AttrType::Int),
        AttrSpec::computed("url", AttrType::String),
    ],
};

/// Descriptor for `store` resources.
pub static STORE: ResourceDescriptor = ResourceDescriptor {
    kind: ResourceKind::Store,
    attributes: &[
        AttrSpec::required("name", AttrType::String),
        AttrSpec::required("type", AttrType::String),
        AttrSpec::optional("access_mode", AttrType::String),
        AttrSpec::optional("allow_read", AttrType::Bool),
        AttrSpec::optional("allow_write", AttrType::Bool),
        AttrSpec::optional("allow_uri_download", AttrType::Bool),
        AttrSpec::optional("configuration", AttrType::StringMap).sensitive(),
        AttrSpec::optional("owner_id", AttrType::Int),
        AttrSpec::optional("project", AttrType::String),
        AttrSpec::optional("paths", AttrType::StringMap),
        AttrSpec::optional("teams", AttrType::StringList),
        AttrSpec::computed("url", AttrType::String),
    ],
};

/// Descriptor for `registry-credentials` resources.
pub static REGISTRY_CREDENTIALS: ResourceDescriptor = ResourceDescriptor {
    kind: ResourceKind::RegistryCredentials,
    attributes: &[
        AttrSpec::required("type", AttrType::String),
        AttrSpec::required("image_pattern", AttrType::String),
        AttrSpec::optional("owner", AttrType::Int),
        AttrSpec::optional("configuration", AttrType::StringMap).sensitive(),
    ],
};

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal_project_attrs() -> BTreeMap<String, AttrValue> {
        let mut attributes = BTreeMap::new();
        attributes.insert(String::from("name"), AttrValue::Str(String::from("demo")));
        attributes.insert(String::from("owner"), AttrValue::Str(String::from("acme")));
        attributes
    }

    #[test]
    fn test_check_accepts_minimal_required() {
        assert!(PROJECT.check(&minimal_project_attrs()).is_ok());
    }

    #[test]
    fn test_check_rejects_unknown_attribute() {
        let mut attributes = minimal_project_attrs();
        attributes.insert(String::from("color"), AttrValue::Str(String::from("red")));
        let err = PROJECT.check(&attributes).unwrap_err();
        assert!(err.contains("unknown attribute"));
    }

    #[test]
    fn test_check_rejects_type_mismatch() {
        let mut attributes = minimal_project_attrs();
        attributes.insert(String::from("default_notifications"), AttrValue::Int(1));
        let err = PROJECT.check(&attributes).unwrap_err();
        assert!(err.contains("default_notifications"));
    }

    #[test]
    fn test_check_rejects_missing_required() {
        let mut attributes = minimal_project_attrs();
        attributes.remove("owner");
        let err = PROJECT.check(&attributes).unwrap_err();
        assert!(err.contains("owner"));
    }

    #[test]
    fn test_sensitive_flags() {
        let spec = STORE.attribute("configuration").unwrap();
        assert!(spec.sensitive);
        let spec = STORE.attribute("name").unwrap();
        assert!(!spec.sensitive);
    }

    #[test]
    fn test_collections() {
        assert_eq!(ResourceKind::Project.collection(), "projects");
        assert_eq!(
            ResourceKind::RegistryCredentials.collection(),
            "registry-credentials"
        );
    }

    #[test]
    fn test_attr_value_roundtrip() {
        let value = AttrValue::Map(BTreeMap::from([(
            String::from("bucket"),
            String::from("b"),
        )]));
        let encoded = serde_json::to_string(&value).unwrap();
        let decoded: AttrValue = serde_json::from_str(&encoded).unwrap();
        assert_eq!(value, decoded);
    }
}
