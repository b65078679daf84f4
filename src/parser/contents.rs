use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use crate::document::Document;
use crate::error::{ExtractError, Result};
use crate::patterns::PatternRegistry;

/// Strip page-leader dots and embedded line breaks out of an entry label.
static LABEL_CLEAN_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[\n\.]").unwrap());

/// One line of the table of contents: a question label and the page its
/// dotted leader links to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentEntry {
    pub question: String,
    pub target_page: usize,
}

/// Locate the contents block and return its entries in document order.
///
/// The contents block is the maximal contiguous run of pages whose text
/// matches the entry pattern; front-matter pages before the first match are
/// skipped, and the scan stops at the first non-matching page after the block
/// started (a contents section never resumes once body text begins).
pub fn locate_contents(
    doc: &dyn Document,
    patterns: &PatternRegistry,
) -> Result<Vec<ContentEntry>> {
    let mut toc_pages: Vec<(usize, String)> = Vec::new();
    for page in 0..doc.page_count() {
        let text = doc.page_text(page)?;
        if patterns.toc_entry.is_match(&text) {
            toc_pages.push((page, text));
        } else if !toc_pages.is_empty() {
            break;
        }
    }

    let mut entries = Vec::new();
    for (page, text) in &toc_pages {
        let labels: Vec<String> = patterns
            .toc_entry
            .find_iter(text)
            .map(|m| clean_label(m.as_str()))
            .collect();

        let mut links: Vec<usize> = doc
            .page_links(*page)?
            .into_iter()
            .filter(|l| l.is_page_link())
            .filter_map(|l| l.target_page)
            .collect();

        // Some filings put a self-referential bookmark back to the contents
        // section as the first link on each contents page; it has no label.
        if let Some(&first) = links.first() {
            if is_contents_page(doc, first, patterns)? {
                links.remove(0);
            }
        }

        if labels.len() != links.len() {
            return Err(ExtractError::TocLinkMismatch {
                page: *page,
                labels: labels.len(),
                links: links.len(),
            });
        }

        for (question, target_page) in labels.into_iter().zip(links) {
            entries.push(ContentEntry {
                question,
                target_page,
            });
        }
    }

    if entries.is_empty() {
        return Err(ExtractError::TocNotFound);
    }
    debug!(
        "contents: {} entries on pages {:?}",
        entries.len(),
        toc_pages.iter().map(|(p, _)| *p).collect::<Vec<_>>()
    );
    Ok(entries)
}

fn clean_label(raw: &str) -> String {
    LABEL_CLEAN_RE.replace_all(raw, "").trim().to_string()
}

fn is_contents_page(
    doc: &dyn Document,
    page: usize,
    patterns: &PatternRegistry,
) -> Result<bool> {
    if page >= doc.page_count() {
        return Ok(false);
    }
    let text = doc.page_text(page)?;
    Ok(patterns.toc_entry.is_match(&text) || patterns.toc_header.is_match(&text))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{FakeDocument, LinkKind, PageLink};

    const TOC_PAGE: &str = "目录 \n一、关于营业收入.............3\n二、关于毛利率.............7\n";
    const BODY: &str = "正文内容。\n";

    fn registry() -> PatternRegistry {
        PatternRegistry::default_dialect()
    }

    #[test]
    fn pairs_labels_with_links() {
        let doc = FakeDocument::new(vec!["封面\n", TOC_PAGE, BODY, BODY])
            .with_links(1, vec![PageLink::goto(2), PageLink::goto(3)]);
        let entries = locate_contents(&doc, &registry()).unwrap();
        assert_eq!(
            entries,
            vec![
                ContentEntry {
                    question: "一、关于营业收入".into(),
                    target_page: 2
                },
                ContentEntry {
                    question: "二、关于毛利率".into(),
                    target_page: 3
                },
            ]
        );
    }

    #[test]
    fn contents_block_is_contiguous() {
        // A dotted-leader lookalike after the body must not reopen the block.
        let toc2 = "三、关于存货.............9\n";
        let doc = FakeDocument::new(vec![TOC_PAGE, BODY, toc2, BODY])
            .with_links(0, vec![PageLink::goto(1), PageLink::goto(1)])
            .with_links(2, vec![PageLink::goto(3)]);
        let entries = locate_contents(&doc, &registry()).unwrap();
        assert_eq!(entries.len(), 2);
        assert!(entries.iter().all(|e| e.target_page == 1));
    }

    #[test]
    fn front_matter_before_contents_is_skipped() {
        let doc = FakeDocument::new(vec!["封面\n", "声明页\n", TOC_PAGE, BODY])
            .with_links(2, vec![PageLink::goto(3), PageLink::goto(3)]);
        let entries = locate_contents(&doc, &registry()).unwrap();
        assert_eq!(entries.len(), 2);
    }

    #[test]
    fn non_page_links_do_not_consume_labels() {
        let uri = PageLink {
            kind: LinkKind::Uri,
            target_page: None,
        };
        let doc = FakeDocument::new(vec![TOC_PAGE, BODY, BODY]).with_links(
            0,
            vec![PageLink::goto(1), uri, PageLink::goto(2)],
        );
        let entries = locate_contents(&doc, &registry()).unwrap();
        assert_eq!(entries[0].target_page, 1);
        assert_eq!(entries[1].target_page, 2);
    }

    #[test]
    fn leading_self_link_is_discarded() {
        // First link points back at the contents page itself.
        let doc = FakeDocument::new(vec![TOC_PAGE, BODY, BODY]).with_links(
            0,
            vec![PageLink::goto(0), PageLink::goto(1), PageLink::goto(2)],
        );
        let entries = locate_contents(&doc, &registry()).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].target_page, 1);
    }

    #[test]
    fn label_link_count_mismatch_is_an_error() {
        let doc =
            FakeDocument::new(vec![TOC_PAGE, BODY]).with_links(0, vec![PageLink::goto(1)]);
        assert!(matches!(
            locate_contents(&doc, &registry()),
            Err(ExtractError::TocLinkMismatch {
                page: 0,
                labels: 2,
                links: 1
            })
        ));
    }

    #[test]
    fn no_contents_anywhere() {
        let doc = FakeDocument::new(vec![BODY, BODY]);
        assert!(matches!(
            locate_contents(&doc, &registry()),
            Err(ExtractError::TocNotFound)
        ));
    }

    #[test]
    fn labels_are_cleaned() {
        // Leader dots wrapped onto the next line: the break and the dots are
        // stripped out of the stored label.
        let page = "一、关于营业收入\n.............3\n";
        let doc = FakeDocument::new(vec![page, BODY]).with_links(0, vec![PageLink::goto(1)]);
        let entries = locate_contents(&doc, &registry()).unwrap();
        assert_eq!(entries[0].question, "一、关于营业收入");
    }
}
