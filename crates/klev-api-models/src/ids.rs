//! Typed resource identifiers.
//!
//! Every identifier is an opaque string assigned by the service. The
//! validated constructor (`FromStr`) checks the resource prefix; `from_raw`
//! forwards user input verbatim and leaves validation to the server.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ModelError;

macro_rules! resource_id {
    ($(#[$meta:meta])* $name:ident, $kind:literal, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Prefix the service assigns to identifiers of this kind.
            pub const PREFIX: &'static str = $prefix;

            /// Wrap an identifier without checking its shape.
            #[must_use]
            pub fn from_raw(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            /// Borrow the identifier text.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl FromStr for $name {
            type Err = ModelError;

            fn from_str(value: &str) -> Result<Self, Self::Err> {
                validate_id(value, $kind, $prefix)?;
                Ok(Self(value.to_string()))
            }
        }

        impl Display for $name {
            fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
                formatter.write_str(&self.0)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

resource_id!(
    /// Identifier of a log.
    LogId,
    "log",
    "log_"
);
resource_id!(
    /// Identifier of a named offset resource.
    OffsetId,
    "offset",
    "off_"
);
resource_id!(
    /// Identifier of an access token.
    TokenId,
    "token",
    "tok_"
);
resource_id!(
    /// Identifier of an ingress webhook.
    IngressWebhookId,
    "ingress webhook",
    "iwh_"
);
resource_id!(
    /// Identifier of an egress webhook.
    EgressWebhookId,
    "egress webhook",
    "ewh_"
);
resource_id!(
    /// Identifier of a filter.
    FilterId,
    "filter",
    "flt_"
);

fn validate_id(value: &str, kind: &'static str, prefix: &'static str) -> Result<(), ModelError> {
    let valid = value
        .strip_prefix(prefix)
        .is_some_and(|body| !body.is_empty() && body.chars().all(|ch| ch.is_ascii_alphanumeric()));
    if valid {
        Ok(())
    } else {
        Err(ModelError::InvalidId {
            kind,
            prefix,
            value: value.to_string(),
        })
    }
}
