use crate::auth::access::CheckMode;

/// Access requirements for one route, attached as a request extension at
/// registration time and read by the gates. This is the explicit
/// replacement for decorator metadata: a plain value, looked up directly.
#[derive(Debug, Clone, Default)]
pub struct AccessPolicy {
    /// Public routes skip authentication entirely; tenant resolution still
    /// runs so public handlers can be tenant-aware.
    pub public: bool,
    pub permissions: Option<Requirement>,
    pub roles: Option<Requirement>,
}

#[derive(Debug, Clone)]
pub struct Requirement {
    pub values: Vec<String>,
    pub mode: CheckMode,
}

impl Requirement {
    pub fn new(values: &[&str], mode: CheckMode) -> Self {
        Self {
            values: values.iter().map(|s| s.to_string()).collect(),
            mode,
        }
    }
}

impl AccessPolicy {
    /// No authentication required.
    pub fn public() -> Self {
        Self {
            public: true,
            ..Default::default()
        }
    }

    /// Authentication required, no role/permission requirements.
    pub fn authenticated() -> Self {
        Self::default()
    }

    pub fn with_roles(mut self, roles: &[&str], mode: CheckMode) -> Self {
        self.roles = Some(Requirement::new(roles, mode));
        self
    }

    pub fn with_permissions(mut self, permissions: &[&str], mode: CheckMode) -> Self {
        self.permissions = Some(Requirement::new(permissions, mode));
        self
    }

    /// True when the route only needs an authenticated caller.
    pub fn requires_only_authentication(&self) -> bool {
        self.required_roles().is_empty() && self.required_permissions().is_empty()
    }

    pub fn required_roles(&self) -> &[String] {
        self.roles.as_ref().map(|r| r.values.as_slice()).unwrap_or_default()
    }

    pub fn required_permissions(&self) -> &[String] {
        self.permissions
            .as_ref()
            .map(|r| r.values.as_slice())
            .unwrap_or_default()
    }
}
