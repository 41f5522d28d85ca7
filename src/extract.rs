use scraper::{Html, Selector};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("failed to parse HTML into a document tree")]
    NoDocumentTree,
}

/// Collects the bodies of inline `<script>` elements in document order.
/// Scripts loaded via a `src` attribute have no text content and are skipped.
pub fn extract_inline_scripts(markup: &str) -> Result<Vec<String>, ExtractError> {
    let document = Html::parse_document(markup);

    // html5ever recovers from arbitrary tag soup; a tree without a root
    // element is the only unparseable shape.
    let has_root = document
        .tree
        .root()
        .children()
        .any(|node| node.value().is_element());
    if !has_root {
        return Err(ExtractError::NoDocumentTree);
    }

    let selector = Selector::parse("script").expect("script selector must compile");
    let mut scripts = Vec::new();
    for element in document.select(&selector) {
        if let Some(body) = element.text().next() {
            scripts.push(body.to_string());
        }
    }

    Ok(scripts)
}
