//! Document folder and index commands.

use clap::Args;
use strictqa_core::AppResult;
use strictqa_router::{Router, RouterStatus};

/// Show indexed documents and cache size
#[derive(Args, Debug)]
pub struct StatusCommand {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl StatusCommand {
    pub async fn execute(&self, router: &Router) -> AppResult<()> {
        let status = router.status()?;
        if self.json {
            println!("{}", serde_json::to_string_pretty(&status)?);
        } else {
            print!("{}", render_status(&status));
        }
        Ok(())
    }
}

pub(crate) fn render_status(status: &RouterStatus) -> String {
    let mut out = format!(
        "Documents folder: {}\nDocuments loaded: {}\nCached answers: {}\n",
        status.documents_dir.display(),
        status.documents,
        status.cache_size
    );
    for name in &status.document_names {
        out.push_str(&format!("  - {}\n", name));
    }
    out
}

/// List indexed documents
#[derive(Args, Debug)]
pub struct DocsCommand {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl DocsCommand {
    pub async fn execute(&self, router: &Router) -> AppResult<()> {
        let documents = router.list_documents()?;
        if self.json {
            println!("{}", serde_json::to_string_pretty(&documents)?);
            return Ok(());
        }

        if documents.is_empty() {
            println!("No documents indexed");
        }
        for doc in documents {
            println!(
                "{}  {}  {} chunks  {}",
                doc.name,
                doc.doc_type,
                doc.chunks,
                doc.added_at.format("%Y-%m-%d %H:%M")
            );
        }
        Ok(())
    }
}

/// Index new files in the documents folder
#[derive(Args, Debug)]
pub struct ScanCommand {}

impl ScanCommand {
    pub async fn execute(&self, router: &Router) -> AppResult<()> {
        let added = router.scan_documents().await?;
        println!("Added {} new document(s)", added);
        Ok(())
    }
}
