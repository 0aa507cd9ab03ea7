use std::fmt;

/// An opaque secret. Never printed, never serialized.
///
/// The raw value is reachable only inside this crate, which keeps the set of
/// routines that can touch it auditable (credential injection and script
/// materialization, nothing on the agent-facing side).
#[derive(Clone)]
pub struct SecretString(String);

impl SecretString {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub(crate) fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecretString(<redacted>)")
    }
}

/// Credentials and login URL for one application account.
///
/// Constructed once per run from configuration. The username doubles as the
/// stable handle whose one-way hash names the session cache file.
#[derive(Clone)]
pub struct Identity {
    username: String,
    password: SecretString,
    pub login_url: String,
}

impl Identity {
    pub fn new(
        username: impl Into<String>,
        password: SecretString,
        login_url: impl Into<String>,
    ) -> Self {
        Self { username: username.into(), password, login_url: login_url.into() }
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub(crate) fn password(&self) -> &SecretString {
        &self.password
    }

    /// Truncated one-way hash of the stable handle; used only for naming the
    /// per-identity session cache file.
    pub fn identity_hash(&self) -> String {
        let digest = blake3::hash(self.username.as_bytes());
        digest.to_hex().as_str()[..12].to_string()
    }
}

impl fmt::Debug for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Identity")
            .field("username", &self.username)
            .field("login_url", &self.login_url)
            .field("password", &self.password)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_is_stable_and_short() {
        let a = Identity::new("standard_user", SecretString::new("pw"), "https://x/login");
        let b = Identity::new("standard_user", SecretString::new("other"), "https://x/login");
        assert_eq!(a.identity_hash(), b.identity_hash());
        assert_eq!(a.identity_hash().len(), 12);
    }

    #[test]
    fn distinct_handles_get_distinct_hashes() {
        let a = Identity::new("alice", SecretString::new("pw"), "https://x/login");
        let b = Identity::new("bob", SecretString::new("pw"), "https://x/login");
        assert_ne!(a.identity_hash(), b.identity_hash());
    }

    #[test]
    fn debug_never_shows_the_secret() {
        let id = Identity::new("alice", SecretString::new("hunter2"), "https://x/login");
        let dump = format!("{id:?}");
        assert!(!dump.contains("hunter2"));
        assert!(dump.contains("redacted"));
    }
}
