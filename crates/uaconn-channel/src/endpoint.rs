//! Endpoint, security and identity settings handed to channels.
//!
//! These are plain configuration values. The client never performs the
//! security handshake itself; it only passes these through to the
//! [`ChannelFactory`](crate::ChannelFactory) and the session calls.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

// ============================================================================
// Security
// ============================================================================

/// Security policy negotiated for the secure channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SecurityPolicy {
    #[default]
    None,
    Basic128Rsa15,
    Basic256,
    Basic256Sha256,
    Aes128Sha256RsaOaep,
    Aes256Sha256RsaPss,
}

impl SecurityPolicy {
    /// Policy URI as advertised by servers.
    pub fn uri(self) -> &'static str {
        match self {
            Self::None => "http://opcfoundation.org/UA/SecurityPolicy#None",
            Self::Basic128Rsa15 => "http://opcfoundation.org/UA/SecurityPolicy#Basic128Rsa15",
            Self::Basic256 => "http://opcfoundation.org/UA/SecurityPolicy#Basic256",
            Self::Basic256Sha256 => "http://opcfoundation.org/UA/SecurityPolicy#Basic256Sha256",
            Self::Aes128Sha256RsaOaep => {
                "http://opcfoundation.org/UA/SecurityPolicy#Aes128_Sha256_RsaOaep"
            }
            Self::Aes256Sha256RsaPss => {
                "http://opcfoundation.org/UA/SecurityPolicy#Aes256_Sha256_RsaPss"
            }
        }
    }

    /// Deprecated policies still accepted by older devices.
    pub fn is_deprecated(self) -> bool {
        matches!(self, Self::Basic128Rsa15 | Self::Basic256)
    }
}

/// Message security mode for the secure channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum MessageSecurityMode {
    #[default]
    None,
    Sign,
    SignAndEncrypt,
}

// ============================================================================
// Endpoint
// ============================================================================

/// Where and how to connect.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EndpointConfig {
    /// Endpoint URL, e.g. `opc.tcp://plc-01:4840`.
    pub url: String,

    /// Security policy for the secure channel.
    pub security_policy: SecurityPolicy,

    /// Message security mode for the secure channel.
    pub security_mode: MessageSecurityMode,

    /// Application name presented to the server.
    pub application_name: String,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            url: "opc.tcp://localhost:4840".to_string(),
            security_policy: SecurityPolicy::None,
            security_mode: MessageSecurityMode::None,
            application_name: "uaconn".to_string(),
        }
    }
}

impl EndpointConfig {
    /// Creates an unsecured endpoint for `url`.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    /// Policy `None` pairs only with mode `None`, and vice versa.
    pub fn is_security_consistent(&self) -> bool {
        (self.security_policy == SecurityPolicy::None)
            == (self.security_mode == MessageSecurityMode::None)
    }
}

// ============================================================================
// Identity
// ============================================================================

/// User identity presented on ActivateSession.
#[derive(Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum UserIdentity {
    #[default]
    Anonymous,
    UserName {
        user: String,
        password: String,
    },
    Certificate {
        certificate: PathBuf,
        private_key: PathBuf,
    },
}

impl UserIdentity {
    pub fn user_name(user: impl Into<String>, password: impl Into<String>) -> Self {
        Self::UserName {
            user: user.into(),
            password: password.into(),
        }
    }

    /// Token type name used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Anonymous => "anonymous",
            Self::UserName { .. } => "user_name",
            Self::Certificate { .. } => "certificate",
        }
    }
}

// Passwords must never reach logs.
impl fmt::Debug for UserIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Anonymous => f.write_str("Anonymous"),
            Self::UserName { user, .. } => f
                .debug_struct("UserName")
                .field("user", user)
                .field("password", &"<redacted>")
                .finish(),
            Self::Certificate {
                certificate,
                private_key,
            } => f
                .debug_struct("Certificate")
                .field("certificate", certificate)
                .field("private_key", private_key)
                .finish(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_default() {
        let endpoint = EndpointConfig::default();
        assert_eq!(endpoint.url, "opc.tcp://localhost:4840");
        assert!(endpoint.is_security_consistent());
    }

    #[test]
    fn test_security_consistency() {
        let mut endpoint = EndpointConfig::new("opc.tcp://plc:4840");
        endpoint.security_policy = SecurityPolicy::Basic256Sha256;
        assert!(!endpoint.is_security_consistent());

        endpoint.security_mode = MessageSecurityMode::SignAndEncrypt;
        assert!(endpoint.is_security_consistent());
    }

    #[test]
    fn test_policy_uri() {
        assert!(SecurityPolicy::Basic256Sha256.uri().ends_with("#Basic256Sha256"));
        assert!(SecurityPolicy::Basic256.is_deprecated());
        assert!(!SecurityPolicy::Aes256Sha256RsaPss.is_deprecated());
    }

    #[test]
    fn test_password_redacted_in_debug() {
        let identity = UserIdentity::user_name("operator", "hunter2");
        let debug = format!("{identity:?}");
        assert!(debug.contains("operator"));
        assert!(!debug.contains("hunter2"));
        assert_eq!(identity.kind(), "user_name");
    }

    #[test]
    fn test_identity_from_toml() {
        let identity: UserIdentity =
            toml::from_str("kind = \"user_name\"\nuser = \"op\"\npassword = \"pw\"").unwrap();
        assert_eq!(identity, UserIdentity::user_name("op", "pw"));

        let anonymous: UserIdentity = toml::from_str("kind = \"anonymous\"").unwrap();
        assert_eq!(anonymous, UserIdentity::Anonymous);
    }
}
