use serde::{Deserialize, Serialize};

/// A request header attached by the [`Request`](crate::Request) orchestrator.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct Header {
    /// The name of the header.
    pub name: HeaderName,

    /// The value of the header.
    pub value: String,
}

impl Header {
    /// Create a header, based on a name and value string.
    pub fn new(name: HeaderName, value: &str) -> Self {
        Self {
            name,
            value: value.to_owned(),
        }
    }

    /// The `Authorization` header carrying an OAuth2 bearer token.
    pub fn bearer(token: &str) -> Self {
        Self::new(HeaderName::AUTHORIZATION, &format!("Bearer {}", token))
    }

    /// The `Content-Type` header of a JSON:API document.
    pub fn json_api() -> Self {
        Self::new(HeaderName::CONTENT_TYPE, crate::JSON_API_MEDIA_TYPE)
    }
}

macro_rules! headers {
    ($(($const:ident, $name:expr);)+) => {
        /// The names of the headers the processor knows how to send.
        #[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
        #[allow(non_camel_case_types, clippy::upper_case_acronyms)]
        pub enum HeaderName {
            $(
                #[doc = $name]
                $const,
            )+
        }

        impl HeaderName {
            /// The lowercase wire name of the header.
            pub const fn as_str(self) -> &'static str {
                match self {
                    $(HeaderName::$const => $name,)+
                }
            }
        }

        impl From<HeaderName> for reqwest::header::HeaderName {
            fn from(name: HeaderName) -> Self {
                match name {
                    $(HeaderName::$const => Self::from_static($name),)+
                }
            }
        }
    };
}

headers! {
    (ACCEPT, "accept");
    (AUTHORIZATION, "authorization");
    (CONTENT_TYPE, "content-type");
}
