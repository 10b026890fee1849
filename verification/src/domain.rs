//! Accepted institutional email domains.

use kahukura_types::Email;

use crate::VerificationError;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DomainPolicy {
    domains: Vec<String>,
}

impl DomainPolicy {
    /// Build a policy from configured domains. Domains are lower-cased;
    /// a leading `@` is tolerated.
    pub fn new<I, S>(domains: I) -> Result<Self, VerificationError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut normalized = Vec::new();
        for domain in domains {
            let raw = domain.as_ref().trim();
            let domain = raw.strip_prefix('@').unwrap_or(raw).to_ascii_lowercase();
            if domain.is_empty()
                || !domain.contains('.')
                || domain.split('.').any(str::is_empty)
                || domain.chars().any(|c| c.is_whitespace() || c == '@')
            {
                return Err(VerificationError::InvalidDomain(raw.to_string()));
            }
            if !normalized.contains(&domain) {
                normalized.push(domain);
            }
        }
        if normalized.is_empty() {
            return Err(VerificationError::NoAcceptedDomains);
        }
        Ok(Self { domains: normalized })
    }

    /// Exact domain match. Subdomains are not accepted implicitly.
    pub fn accepts(&self, email: &Email) -> bool {
        let domain = email.domain();
        self.domains.iter().any(|d| d == domain)
    }

    pub fn domains(&self) -> &[String] {
        &self.domains
    }
}
