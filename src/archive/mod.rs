//! Archival of finished requisitions: render, upload, record URL, delete.

pub mod document;
pub mod job;
pub mod uploader;

pub use document::{DocumentRenderer, HtmlDocumentRenderer, RequisitionDocument};
pub use job::{ArchivalJob, ArchiveReport};
pub use uploader::{ArchiveUploader, DisabledUploader, HttpArchiveUploader, uploader_from_config};
