//! Command-line interface definition for NoteMind
//!
//! This module defines the CLI structure using clap's derive API,
//! providing commands for listing subjects, uploading documents, and
//! asking questions.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// NoteMind - study notes knowledge base client
///
/// Upload documents into subjects and ask questions answered from them.
#[derive(Parser, Debug, Clone)]
#[command(name = "notemind")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true, default_value = "config/config.yaml")]
    pub config: Option<String>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Override the knowledge service base URL
    #[arg(long, global = true)]
    pub api_base: Option<String>,

    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands for NoteMind
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// List the subjects that have documents
    Subjects,

    /// Upload documents into a subject, one file at a time
    Upload {
        /// Subject the documents belong to
        #[arg(short, long)]
        subject: String,

        /// Treat the documents as handwritten notes (OCR)
        #[arg(long)]
        handwritten: bool,

        /// Files to upload, in order
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// Ask a single question about a subject
    Ask {
        /// Subject to ask about
        #[arg(short, long)]
        subject: String,

        /// The question
        question: String,
    },

    /// Start an interactive chat session
    Chat {
        /// Subject to start with; switch later with /subject
        #[arg(short, long)]
        subject: Option<String>,
    },
}

impl Cli {
    /// Parse command line arguments
    ///
    /// # Returns
    ///
    /// Returns the parsed CLI structure
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

impl Default for Cli {
    fn default() -> Self {
        Self {
            config: Some("config/config.yaml".to_string()),
            verbose: false,
            api_base: None,
            command: Commands::Subjects,
        }
    }
}
