//! Command-line surface over the conversation store.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::backend::{
    Document, Interview, LibraryService, NewDocument, NewInterview, PaperSuggestion, QueryMode,
    QueryService,
};
use crate::common::errors::SidekickResult;
use crate::companion;
use crate::conversations::{ConversationId, ConversationStore, Turn};

/// Meeting companion: ask about what you just heard and keep the history.
#[derive(Debug, Parser)]
#[command(name = "sidekick")]
#[command(version)]
#[command(about = "Understand more. Ask better.", long_about = None)]
pub struct Cli {
    /// State file or database path, overriding `SIDEKICK_STATE_PATH`.
    #[arg(long, global = true)]
    pub state: Option<PathBuf>,

    /// Operation to run.
    #[command(subcommand)]
    pub command: Command,
}

/// Store operations exposed on the command line.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// List conversations, most recently updated first
    List,
    /// Start a new conversation and make it active
    New,
    /// Make a conversation active
    Select {
        /// Conversation id
        id: ConversationId,
    },
    /// Rename a conversation
    Rename {
        /// Conversation id
        id: ConversationId,
        /// New display name
        name: String,
    },
    /// Delete a conversation
    Delete {
        /// Conversation id
        id: ConversationId,
    },
    /// Print the active conversation
    History,
    /// Ask the backend and record the answer
    Ask {
        /// explain or followup
        #[arg(long, short, default_value = "explain")]
        mode: QueryMode,
        /// What you just heard
        #[arg(required = true, num_args = 1..)]
        text: Vec<String>,
    },
    /// Browse the backend's document corpus
    Corpus {
        /// Corpus operation
        #[command(subcommand)]
        action: CorpusCommand,
    },
    /// Prepare for upcoming interviews
    Interviews {
        /// Interview operation
        #[command(subcommand)]
        action: InterviewCommand,
    },
}

/// Corpus operations.
#[derive(Debug, Subcommand)]
pub enum CorpusCommand {
    /// List corpus documents with totals
    List {
        /// Only documents whose title or content contains this text
        #[arg(long, short)]
        search: Option<String>,
    },
    /// Delete a corpus document
    Delete {
        /// Document id
        id: String,
    },
}

/// Interview preparation operations.
#[derive(Debug, Subcommand)]
pub enum InterviewCommand {
    /// List interviews
    List,
    /// Show an interview and its documents
    Show {
        /// Interview id
        id: String,
    },
    /// Create an interview
    Create {
        /// Interview title
        title: String,
        /// Company
        #[arg(long, default_value = "")]
        company: String,
        /// Role
        #[arg(long, default_value = "")]
        role: String,
        /// Topics to cover
        #[arg(long, default_value = "")]
        topics: String,
        /// Notes about the interview
        #[arg(long, default_value = "")]
        description: String,
    },
    /// Attach a document to an interview
    AddDoc {
        /// Interview id
        id: String,
        /// Document title
        #[arg(long)]
        title: String,
        /// Document text
        #[arg(long)]
        content: String,
        /// Where the document came from
        #[arg(long, default_value = "")]
        source: String,
    },
    /// Remove a document from an interview
    RemoveDoc {
        /// Interview id
        id: String,
        /// Document id
        document_id: String,
    },
    /// Ask for papers worth reading, optionally attaching them as drafts
    Suggest {
        /// Interview id
        id: String,
        /// Attach every suggestion as a draft document
        #[arg(long)]
        add: bool,
    },
}

/// Run `command` against `store` and the backend, returning the text to print.
///
/// # Errors
/// Returns an error if a backend call fails or its input is rejected.
pub fn execute(
    command: Command,
    store: &mut ConversationStore,
    service: &dyn QueryService,
    library: &dyn LibraryService,
) -> SidekickResult<String> {
    let output = match command {
        Command::List => render_list(store),
        Command::New => {
            let id = store.create_conversation();
            format!("Started conversation {id}")
        }
        Command::Select { id } => {
            store.select_conversation(&id);
            active_line(store)
        }
        Command::Rename { id, name } => {
            store.rename_conversation(&id, &name);
            store
                .conversation(&id)
                .map_or_else(|| format!("No conversation {id}"), |c| format!("{id}: {}", c.name))
        }
        Command::Delete { id } => {
            store.delete_conversation(&id);
            active_line(store)
        }
        Command::History => render_history(store),
        Command::Ask { mode, text } => {
            let turn = companion::ask(store, service, &text.join(" "), mode)?;
            render_turn(&turn)
        }
        Command::Corpus { action } => execute_corpus(action, library)?,
        Command::Interviews { action } => execute_interview(action, library)?,
    };
    Ok(output)
}

fn execute_corpus(action: CorpusCommand, library: &dyn LibraryService) -> SidekickResult<String> {
    match action {
        CorpusCommand::List { search } => {
            let listing = library.corpus()?;
            let needle = search.map(|s| s.to_lowercase());
            let keep = |doc: &&Document| {
                needle.as_deref().is_none_or(|n| {
                    doc.title.to_lowercase().contains(n) || doc.content.to_lowercase().contains(n)
                })
            };

            let mut lines = vec![format!(
                "{} documents, {} words",
                listing.corpus_info.total_documents, listing.corpus_info.total_words
            )];
            lines.extend(listing.documents.iter().filter(keep).map(render_document));
            Ok(lines.join("\n"))
        }
        CorpusCommand::Delete { id } => {
            library.delete_corpus_document(&id)?;
            Ok(format!("Deleted corpus document {id}"))
        }
    }
}

fn execute_interview(
    action: InterviewCommand,
    library: &dyn LibraryService,
) -> SidekickResult<String> {
    let output = match action {
        InterviewCommand::List => {
            let interviews = library.interviews()?;
            if interviews.is_empty() {
                "No interviews yet".to_string()
            } else {
                interviews
                    .iter()
                    .map(interview_heading)
                    .collect::<Vec<_>>()
                    .join("\n")
            }
        }
        InterviewCommand::Show { id } => render_interview(&library.interview(&id)?),
        InterviewCommand::Create {
            title,
            company,
            role,
            topics,
            description,
        } => {
            let interview = library.create_interview(&NewInterview {
                title,
                company,
                role,
                topics,
                description,
            })?;
            format!("Created {}", interview_heading(&interview))
        }
        InterviewCommand::AddDoc {
            id,
            title,
            content,
            source,
        } => {
            let document = library.add_document(
                &id,
                &NewDocument {
                    title,
                    content,
                    source,
                },
            )?;
            format!("Added to interview {id}: {}", render_document(&document))
        }
        InterviewCommand::RemoveDoc { id, document_id } => {
            library.delete_interview_document(&id, &document_id)?;
            format!("Removed document {document_id} from interview {id}")
        }
        InterviewCommand::Suggest { id, add } => {
            let suggestions = library.suggest_papers(&id)?;
            if suggestions.is_empty() {
                return Ok("No suggestions".to_string());
            }
            let mut lines: Vec<String> = suggestions.iter().map(render_suggestion).collect();
            if add {
                for suggestion in &suggestions {
                    let document =
                        library.add_document(&id, &NewDocument::from_suggestion(suggestion))?;
                    lines.push(format!("Added draft {}", document.id));
                }
            }
            lines.join("\n")
        }
    };
    Ok(output)
}

fn active_line(store: &ConversationStore) -> String {
    store.active_conversation().map_or_else(
        || "No active conversation".to_string(),
        |c| format!("Active: {} ({})", c.name, c.id),
    )
}

fn render_list(store: &ConversationStore) -> String {
    let active = store.active_id();
    store
        .summaries()
        .iter()
        .map(|s| {
            let marker = if Some(&s.id) == active { '*' } else { ' ' };
            let noun = if s.turn_count == 1 { "message" } else { "messages" };
            format!(
                "{marker} {}  {}  ({} {noun} • {})",
                s.id,
                s.name,
                s.turn_count,
                s.last_updated.format("%Y-%m-%d %H:%M")
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn render_history(store: &ConversationStore) -> String {
    let Some(conv) = store.active_conversation() else {
        return "No active conversation".to_string();
    };
    if conv.history.is_empty() {
        return format!("{}\n(no messages yet)", conv.name);
    }

    let turns: Vec<String> = conv.history.iter().map(render_turn).collect();
    format!("{}\n\n{}", conv.name, turns.join("\n\n"))
}

fn interview_heading(interview: &Interview) -> String {
    match interview.position() {
        Some(position) => format!("{}  {}  ({position})", interview.id, interview.title),
        None => format!("{}  {}", interview.id, interview.title),
    }
}

fn render_interview(interview: &Interview) -> String {
    let mut lines = vec![interview_heading(interview)];
    for (label, value) in [("Topics", &interview.topics), ("Notes", &interview.description)] {
        if let Some(value) = value.as_deref().filter(|v| !v.trim().is_empty()) {
            lines.push(format!("{label}: {value}"));
        }
    }
    lines.push(format!("Documents ({})", interview.documents.len()));
    lines.extend(interview.documents.iter().map(render_document));
    lines.join("\n")
}

fn render_document(document: &Document) -> String {
    let source = document
        .source
        .as_deref()
        .filter(|s| !s.is_empty())
        .map(|s| format!(" • {s}"))
        .unwrap_or_default();
    format!(
        "  {}  {}  ({} words){source}",
        document.id, document.title, document.word_count
    )
}

fn render_suggestion(suggestion: &PaperSuggestion) -> String {
    format!("- {}: {}", suggestion.title, suggestion.reason)
}

fn render_turn(turn: &Turn) -> String {
    let mut out = format!("> {}\n{}", turn.prompt, turn.response);
    if !turn.sources.is_empty() {
        out.push_str("\nSources: ");
        out.push_str(&turn.sources.join(", "));
    }
    out
}
