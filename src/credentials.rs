/// Read-only lookup of provider secrets.
///
/// Implementations must not mutate process state; an empty value counts as
/// absent.
pub trait CredentialSource {
    fn get(&self, var: &str) -> Option<String>;
}

/// Reads credentials from the process environment.
#[derive(Debug, Default, Clone, Copy)]
pub struct EnvCredentials;

impl CredentialSource for EnvCredentials {
    fn get(&self, var: &str) -> Option<String> {
        std::env::var(var).ok().filter(|v| !v.trim().is_empty())
    }
}

/// Fixed credential map, used in place of the environment in tests.
#[cfg(test)]
#[derive(Debug, Default, Clone)]
pub struct StaticCredentials(std::collections::HashMap<String, String>);

#[cfg(test)]
impl StaticCredentials {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, var: impl Into<String>, value: impl Into<String>) -> Self {
        self.0.insert(var.into(), value.into());
        self
    }
}

#[cfg(test)]
impl CredentialSource for StaticCredentials {
    fn get(&self, var: &str) -> Option<String> {
        self.0.get(var).filter(|v| !v.trim().is_empty()).cloned()
    }
}
