use std::collections::BTreeMap;

/// Attributes of one inbound RPC, as seen by the rule matchers.
///
/// `CallInfo` holds simple owned data so any RPC framework can build one
/// without this crate depending on it. The principal is whatever the
/// transport's identity layer resolved (for example a SPIFFE URI); it is
/// empty for unauthenticated callers.
///
/// # Examples
///
/// ```
/// use rpc_authz::CallInfo;
///
/// let call = CallInfo::new("/pkg.Service/Method")
///     .with_principal("spiffe://foo.bar.com/client/workload/1")
///     .with_authority("api.example.com")
///     .with_header("X-Tenant", "acme");
///
/// assert_eq!(call.method(), "/pkg.Service/Method");
/// assert_eq!(call.header("x-tenant").collect::<Vec<_>>(), vec!["acme"]);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallInfo {
    /// Fully qualified method, e.g. `/pkg.Service/Method`
    method: String,
    /// Resolved caller identity, empty if unauthenticated
    principal: String,
    /// `:authority` of the call, if the transport reported one
    authority: Option<String>,
    /// Request metadata, keys lowercased
    headers: BTreeMap<String, Vec<String>>,
}

impl CallInfo {
    /// Creates call attributes for the given fully qualified method.
    pub fn new(method: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            ..Self::default()
        }
    }

    /// Sets the resolved principal.
    pub fn with_principal(mut self, principal: impl Into<String>) -> Self {
        self.principal = principal.into();
        self
    }

    /// Sets the call's authority (host).
    pub fn with_authority(mut self, authority: impl Into<String>) -> Self {
        self.authority = Some(authority.into());
        self
    }

    /// Adds one metadata value. Keys are case-insensitive.
    pub fn with_header(mut self, key: impl AsRef<str>, value: impl Into<String>) -> Self {
        self.add_header(key, value);
        self
    }

    /// Adds one metadata value in place.
    pub fn add_header(&mut self, key: impl AsRef<str>, value: impl Into<String>) {
        self.headers
            .entry(key.as_ref().to_ascii_lowercase())
            .or_default()
            .push(value.into());
    }

    /// Returns the fully qualified method name.
    pub fn method(&self) -> &str {
        &self.method
    }

    /// Returns the principal, empty if unauthenticated.
    pub fn principal(&self) -> &str {
        &self.principal
    }

    /// Returns the authority, if known.
    pub fn authority(&self) -> Option<&str> {
        self.authority.as_deref()
    }

    /// Returns every value recorded for `key` (case-insensitive).
    pub fn header<'a>(&'a self, key: &str) -> impl Iterator<Item = &'a str> + 'a {
        self.headers
            .get(&key.to_ascii_lowercase())
            .into_iter()
            .flatten()
            .map(String::as_str)
    }

    /// Copies the ASCII entries of a gRPC metadata map into the headers.
    ///
    /// Binary (`-bin`) entries and values that are not valid visible ASCII
    /// are skipped.
    #[cfg(feature = "tonic")]
    pub fn with_metadata(mut self, metadata: &tonic::metadata::MetadataMap) -> Self {
        use tonic::metadata::KeyAndValueRef;

        for entry in metadata.iter() {
            if let KeyAndValueRef::Ascii(key, value) = entry {
                if let Ok(value) = value.to_str() {
                    self.add_header(key.as_str(), value);
                }
            }
        }
        self
    }
}
