//! Request and response shapes of the query service.

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::common::errors::SidekickError;

/// How the backend should treat the submitted snippet.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryMode {
    /// Explain what was just heard.
    #[default]
    Explain,
    /// Suggest a follow-up question.
    Followup,
}

impl QueryMode {
    /// Wire name of the mode.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Explain => "explain",
            Self::Followup => "followup",
        }
    }
}

impl fmt::Display for QueryMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QueryMode {
    type Err = SidekickError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "explain" => Ok(Self::Explain),
            "followup" | "follow-up" => Ok(Self::Followup),
            other => Err(SidekickError::InvalidQuery(format!("unknown mode: {other}"))),
        }
    }
}

/// Body of `POST /query`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct QueryRequest {
    /// Snippet the user heard or typed.
    pub text: String,
    /// Requested mode.
    pub mode: QueryMode,
}

/// Answer and its citations.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct QueryAnswer {
    /// Answer text.
    pub response: String,
    /// Opaque source identifiers.
    pub sources: Vec<String>,
}

/// `response` is either plain text or an `{answer, sources}` object.
#[derive(Deserialize)]
#[serde(untagged)]
enum ResponseBody {
    Text(String),
    Detailed {
        answer: String,
        #[serde(default)]
        sources: Option<Vec<String>>,
    },
}

#[derive(Deserialize)]
struct QueryEnvelope {
    response: ResponseBody,
    #[serde(default)]
    sources: Option<Vec<String>>,
}

impl QueryEnvelope {
    fn into_answer(self) -> QueryAnswer {
        match self.response {
            ResponseBody::Text(response) => QueryAnswer {
                response,
                sources: self.sources.unwrap_or_default(),
            },
            ResponseBody::Detailed { answer, sources } => QueryAnswer {
                response: answer,
                sources: sources.or(self.sources).unwrap_or_default(),
            },
        }
    }
}

impl QueryAnswer {
    /// Decode a query service response body.
    ///
    /// # Errors
    /// Returns an error if the body matches neither accepted shape.
    pub fn from_json(body: &str) -> Result<Self, SidekickError> {
        let envelope: QueryEnvelope = serde_json::from_str(body)?;
        Ok(envelope.into_answer())
    }
}
