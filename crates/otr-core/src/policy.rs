//! Client-configurable policy flags. The original source packs these
//! into a bitmask (`c.has(allowV2)`/`c.has(allowV3)`); reworked here as a
//! plain struct of bools since nothing in scope needs a serialized
//! policy wire form.

/// What this side of a conversation is willing to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Policy {
    pub allow_v2: bool,
    pub allow_v3: bool,
    pub require_encryption: bool,
    pub whitespace_start_ake: bool,
    pub error_start_ake: bool,
}

impl Default for Policy {
    /// A typical client: v3 only, nothing forced, no automatic AKE
    /// triggers.
    fn default() -> Self {
        Self {
            allow_v2: false,
            allow_v3: true,
            require_encryption: false,
            whitespace_start_ake: false,
            error_start_ake: false,
        }
    }
}

impl Policy {
    /// The versions this policy is willing to advertise/accept, highest
    /// preference first.
    pub fn advertised_versions(&self) -> Vec<u8> {
        let mut versions = Vec::new();
        if self.allow_v3 {
            versions.push(3);
        }
        if self.allow_v2 {
            versions.push(2);
        }
        versions
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_policy_is_v3_only() {
        let policy = Policy::default();
        assert!(policy.allow_v3);
        assert!(!policy.allow_v2);
        assert_eq!(policy.advertised_versions(), vec![3]);
    }
}
