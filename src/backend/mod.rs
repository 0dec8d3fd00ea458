//! Client side of the backend: the query service plus the corpus and
//! interview-preparation endpoints.

pub mod client;
pub mod library;
#[cfg(test)]
mod test_server;
pub mod types;

pub use client::{HttpQueryService, QueryService};
pub use library::{
    CorpusInfo, CorpusListing, Document, HttpLibraryService, Interview, LibraryService,
    NewDocument, NewInterview, PaperSuggestion,
};
pub use types::{QueryAnswer, QueryMode, QueryRequest};
