//! Submits a handful of documents through the default 10-per-second client.
//!
//! Usage: cargo run --example submit_documents -- <token> [base-url]
use windowgate::{Document, DocumentClient, DocumentFormat, DocumentType, ProductGroup};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt().with_max_level(tracing::Level::DEBUG).init();

    let mut args = std::env::args().skip(1);
    let token = args.next().ok_or("usage: submit_documents <token> [base-url]")?;
    let mut client = DocumentClient::new(token)?;
    if let Some(base_url) = args.next() {
        client = client.base_url(base_url);
    }

    let document = Document::new(
        ProductGroup::SHOES,
        DocumentFormat::Manual,
        "eyJkZXNjcmlwdGlvbiI6IHt9fQ==",
        DocumentType::LpIntroduceGoods,
    );
    for attempt in 0..3 {
        match client.create_document(&document, "c2lnbmF0dXJl") {
            Ok(body) => println!("#{attempt}: {body}"),
            Err(err) => println!("#{attempt}: {err}"),
        }
    }
    Ok(())
}
