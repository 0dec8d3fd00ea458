//! Corpus and interview-preparation endpoints of the backend.
//!
//! The backend owns these records; this module only reads and edits them
//! over HTTP:
//! - `GET /corpus`, `DELETE /corpus/{id}`
//! - `GET /interviews`, `POST /interviews`, `GET /interviews/{id}`
//! - `POST /interviews/{id}/documents`, `DELETE /interviews/{id}/documents/{doc}`
//! - `POST /interviews/{id}/suggest-papers`

use reqwest::Method;
use reqwest::blocking::RequestBuilder;
use serde::de::{self, DeserializeOwned};
use serde::{Deserialize, Deserializer, Serialize};
use tracing::{debug, info};

use crate::common::config::BackendConfig;
use crate::common::errors::{SidekickError, SidekickResult};

use super::client::BackendHttp;

/// A document in the corpus or attached to an interview.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct Document {
    /// Backend identifier.
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    /// Display title.
    pub title: String,
    /// Full text.
    #[serde(default)]
    pub content: String,
    /// Where the document came from, if recorded.
    #[serde(default)]
    pub source: Option<String>,
    /// Word count computed by the backend.
    #[serde(default)]
    pub word_count: u64,
}

/// Totals reported alongside the corpus listing.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct CorpusInfo {
    /// Number of documents.
    #[serde(default)]
    pub total_documents: u64,
    /// Number of words across all documents.
    #[serde(default)]
    pub total_words: u64,
}

/// Body of `GET /corpus`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct CorpusListing {
    /// Corpus totals.
    #[serde(default, deserialize_with = "null_as_default")]
    pub corpus_info: CorpusInfo,
    /// Every corpus document.
    #[serde(default, deserialize_with = "null_as_default")]
    pub documents: Vec<Document>,
}

/// An interview being prepared for, with its reading list.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct Interview {
    /// Backend identifier.
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    /// Display title.
    pub title: String,
    /// Company, if given.
    #[serde(default)]
    pub company: Option<String>,
    /// Role, if given.
    #[serde(default)]
    pub role: Option<String>,
    /// Free-form topics.
    #[serde(default)]
    pub topics: Option<String>,
    /// Free-form description.
    #[serde(default)]
    pub description: Option<String>,
    /// Attached documents.
    #[serde(default, deserialize_with = "null_as_default")]
    pub documents: Vec<Document>,
}

impl Interview {
    /// `role at company`, whichever parts are present.
    #[must_use]
    pub fn position(&self) -> Option<String> {
        let role = self.role.as_deref().map(str::trim).filter(|r| !r.is_empty());
        let company = self.company.as_deref().map(str::trim).filter(|c| !c.is_empty());
        match (role, company) {
            (Some(role), Some(company)) => Some(format!("{role} at {company}")),
            (Some(only), None) | (None, Some(only)) => Some(only.to_string()),
            (None, None) => None,
        }
    }
}

/// Body of `POST /interviews`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct NewInterview {
    /// Required title.
    pub title: String,
    /// Company, may be empty.
    pub company: String,
    /// Role, may be empty.
    pub role: String,
    /// Topics, may be empty.
    pub topics: String,
    /// Description, may be empty.
    pub description: String,
}

impl NewInterview {
    /// Check the fields the backend requires.
    ///
    /// # Errors
    /// Returns an error if the title is blank.
    pub fn validate(&self) -> SidekickResult<()> {
        require("interview title", &self.title)
    }
}

/// Body of `POST /interviews/{id}/documents`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct NewDocument {
    /// Required title.
    pub title: String,
    /// Required text.
    pub content: String,
    /// Where it came from, may be empty.
    pub source: String,
}

impl NewDocument {
    /// Source label for documents created from a paper suggestion.
    pub const SUGGESTION_SOURCE: &'static str = "AI Suggestion";

    /// Draft a document from a suggested paper, ready for the user's notes.
    #[must_use]
    pub fn from_suggestion(suggestion: &PaperSuggestion) -> Self {
        Self {
            title: suggestion.title.clone(),
            content: format!(
                "AI-suggested paper: {}\n\nReason for relevance: {}\n\n[Add your notes and content about this paper here]",
                suggestion.title, suggestion.reason
            ),
            source: Self::SUGGESTION_SOURCE.to_string(),
        }
    }

    /// Check the fields the backend requires.
    ///
    /// # Errors
    /// Returns an error if the title or content is blank.
    pub fn validate(&self) -> SidekickResult<()> {
        require("document title", &self.title)?;
        require("document content", &self.content)
    }
}

/// A paper the backend thinks is worth reading for an interview.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct PaperSuggestion {
    /// Paper title.
    pub title: String,
    /// Why it is relevant.
    #[serde(default)]
    pub reason: String,
}

/// Read and edit access to the backend's corpus and interview records.
pub trait LibraryService: Send + Sync {
    /// List the corpus with its totals.
    ///
    /// # Errors
    /// Returns an error if the request fails or the body cannot be decoded.
    fn corpus(&self) -> SidekickResult<CorpusListing>;

    /// Remove a corpus document.
    ///
    /// # Errors
    /// Returns an error if the id is blank or the request fails.
    fn delete_corpus_document(&self, id: &str) -> SidekickResult<()>;

    /// List interviews.
    ///
    /// # Errors
    /// Returns an error if the request fails or the body cannot be decoded.
    fn interviews(&self) -> SidekickResult<Vec<Interview>>;

    /// Fetch one interview with its documents.
    ///
    /// # Errors
    /// Returns an error if the id is blank, the request fails, or the body cannot be decoded.
    fn interview(&self, id: &str) -> SidekickResult<Interview>;

    /// Create an interview and return it as stored.
    ///
    /// # Errors
    /// Returns an error if the title is blank, the request fails, or the body cannot be decoded.
    fn create_interview(&self, interview: &NewInterview) -> SidekickResult<Interview>;

    /// Attach a document to an interview and return it as stored.
    ///
    /// # Errors
    /// Returns an error if a required field is blank, the request fails, or the body cannot be decoded.
    fn add_document(&self, interview_id: &str, document: &NewDocument) -> SidekickResult<Document>;

    /// Detach a document from an interview.
    ///
    /// # Errors
    /// Returns an error if an id is blank or the request fails.
    fn delete_interview_document(&self, interview_id: &str, document_id: &str) -> SidekickResult<()>;

    /// Ask the backend which papers to read for an interview.
    ///
    /// # Errors
    /// Returns an error if the id is blank, the request fails, or the body cannot be decoded.
    fn suggest_papers(&self, interview_id: &str) -> SidekickResult<Vec<PaperSuggestion>>;
}

/// [`LibraryService`] over HTTP.
pub struct HttpLibraryService {
    http: BackendHttp,
}

impl HttpLibraryService {
    /// Build a client for the backend at `config.base_url`.
    ///
    /// # Errors
    /// Returns an error if the URL is invalid or the HTTP client cannot be built.
    pub fn new(config: &BackendConfig) -> SidekickResult<Self> {
        Ok(Self {
            http: BackendHttp::new(config)?,
        })
    }
}

#[derive(Deserialize)]
struct InterviewsEnvelope {
    #[serde(default, deserialize_with = "null_as_default")]
    interviews: Vec<Interview>,
}

#[derive(Deserialize)]
struct InterviewEnvelope {
    interview: Interview,
}

#[derive(Deserialize)]
struct DocumentEnvelope {
    document: Document,
}

#[derive(Deserialize)]
struct SuggestionsEnvelope {
    #[serde(default, deserialize_with = "null_as_default")]
    suggestions: Vec<PaperSuggestion>,
}

impl LibraryService for HttpLibraryService {
    fn corpus(&self) -> SidekickResult<CorpusListing> {
        fetch(self.http.request(Method::GET, &["corpus"])?)
    }

    fn delete_corpus_document(&self, id: &str) -> SidekickResult<()> {
        require("document id", id)?;
        BackendHttp::send(self.http.request(Method::DELETE, &["corpus", id])?)?;
        info!("Deleted corpus document {id}");
        Ok(())
    }

    fn interviews(&self) -> SidekickResult<Vec<Interview>> {
        let envelope: InterviewsEnvelope = fetch(self.http.request(Method::GET, &["interviews"])?)?;
        Ok(envelope.interviews)
    }

    fn interview(&self, id: &str) -> SidekickResult<Interview> {
        require("interview id", id)?;
        let envelope: InterviewEnvelope = fetch(self.http.request(Method::GET, &["interviews", id])?)?;
        Ok(envelope.interview)
    }

    fn create_interview(&self, interview: &NewInterview) -> SidekickResult<Interview> {
        interview.validate()?;
        let request = self.http.request(Method::POST, &["interviews"])?.json(interview);
        let envelope: InterviewEnvelope = fetch(request)?;
        info!("Created interview {}", envelope.interview.id);
        Ok(envelope.interview)
    }

    fn add_document(&self, interview_id: &str, document: &NewDocument) -> SidekickResult<Document> {
        require("interview id", interview_id)?;
        document.validate()?;
        let request = self
            .http
            .request(Method::POST, &["interviews", interview_id, "documents"])?
            .json(document);
        let envelope: DocumentEnvelope = fetch(request)?;
        debug!(interview = interview_id, document = %envelope.document.id, "Added document");
        Ok(envelope.document)
    }

    fn delete_interview_document(&self, interview_id: &str, document_id: &str) -> SidekickResult<()> {
        require("interview id", interview_id)?;
        require("document id", document_id)?;
        let request = self.http.request(
            Method::DELETE,
            &["interviews", interview_id, "documents", document_id],
        )?;
        BackendHttp::send(request)?;
        info!("Removed document {document_id} from interview {interview_id}");
        Ok(())
    }

    fn suggest_papers(&self, interview_id: &str) -> SidekickResult<Vec<PaperSuggestion>> {
        require("interview id", interview_id)?;
        let request = self
            .http
            .request(Method::POST, &["interviews", interview_id, "suggest-papers"])?;
        let envelope: SuggestionsEnvelope = fetch(request)?;
        Ok(envelope.suggestions)
    }
}

fn fetch<T: DeserializeOwned>(request: RequestBuilder) -> SidekickResult<T> {
    let body = BackendHttp::send(request)?;
    Ok(serde_json::from_str(&body)?)
}

fn require(what: &str, value: &str) -> SidekickResult<()> {
    if value.trim().is_empty() {
        return Err(SidekickError::InvalidRequest(format!("{what} must not be empty")));
    }
    Ok(())
}

/// Ids arrive as strings from some endpoints and as numbers from others.
fn string_or_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(id) => Ok(id),
        serde_json::Value::Number(id) => Ok(id.to_string()),
        other => Err(de::Error::custom(format!("expected string or number id, got {other}"))),
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
