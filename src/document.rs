use std::collections::HashMap;
use std::path::Path;

use lopdf::{Dictionary, Object, ObjectId};

use crate::error::{ExtractError, Result};

/// What an outgoing link on a page points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkKind {
    /// Jump to another page of the same document.
    GotoPage,
    /// External URI.
    Uri,
    /// Anything else (launch actions, named destinations, malformed links).
    Other,
}

/// One outgoing link of a page, in page annotation order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageLink {
    pub kind: LinkKind,
    /// Zero-based destination page; only set for `GotoPage` links.
    pub target_page: Option<usize>,
}

impl PageLink {
    pub fn goto(page: usize) -> Self {
        PageLink {
            kind: LinkKind::GotoPage,
            target_page: Some(page),
        }
    }

    /// True page-destination links are the only ones the contents locator
    /// pairs with entry labels.
    pub fn is_page_link(&self) -> bool {
        self.kind == LinkKind::GotoPage && self.target_page.is_some()
    }
}

/// Read-only view of a paginated document. Pages are zero-indexed.
pub trait Document {
    fn page_count(&self) -> usize;
    fn page_text(&self, page: usize) -> Result<String>;
    fn page_links(&self, page: usize) -> Result<Vec<PageLink>>;
}

/// lopdf-backed accessor for inquiry-letter PDFs.
pub struct PdfDocument {
    doc: lopdf::Document,
    /// Page object ids in document order.
    pages: Vec<ObjectId>,
    /// Reverse map from page object id to zero-based index.
    page_index: HashMap<ObjectId, usize>,
}

impl PdfDocument {
    pub fn open(path: &Path) -> Result<Self> {
        let doc = lopdf::Document::load(path)?;
        let mut pages = Vec::new();
        let mut page_index = HashMap::new();
        for (i, (_, id)) in doc.get_pages().into_iter().enumerate() {
            pages.push(id);
            page_index.insert(id, i);
        }
        Ok(PdfDocument {
            doc,
            pages,
            page_index,
        })
    }

    fn page_id(&self, page: usize) -> Result<ObjectId> {
        self.pages
            .get(page)
            .copied()
            .ok_or(ExtractError::PageOutOfRange {
                page,
                count: self.pages.len(),
            })
    }

    /// Follow one level of indirection; non-references pass through.
    fn resolve<'a>(&'a self, obj: &'a Object) -> &'a Object {
        match obj.as_reference() {
            Ok(id) => self.doc.get_object(id).unwrap_or(obj),
            Err(_) => obj,
        }
    }

    fn link_of(&self, annot: &Dictionary) -> PageLink {
        if let Ok(dest) = annot.get(b"Dest") {
            return self.dest_link(dest);
        }
        if let Ok(action) = annot.get(b"A") {
            if let Ok(action) = self.resolve(action).as_dict() {
                match action.get(b"S").and_then(Object::as_name) {
                    Ok(b"GoTo") => {
                        if let Ok(dest) = action.get(b"D") {
                            return self.dest_link(dest);
                        }
                    }
                    Ok(b"URI") => {
                        return PageLink {
                            kind: LinkKind::Uri,
                            target_page: None,
                        }
                    }
                    _ => {}
                }
            }
        }
        PageLink {
            kind: LinkKind::Other,
            target_page: None,
        }
    }

    /// Resolve an explicit destination array `[page /XYZ ...]` to a page
    /// index. Named destinations are not chased and come back as `Other`.
    fn dest_link(&self, dest: &Object) -> PageLink {
        if let Ok(arr) = self.resolve(dest).as_array() {
            if let Some(first) = arr.first() {
                if let Ok(id) = first.as_reference() {
                    if let Some(&idx) = self.page_index.get(&id) {
                        return PageLink::goto(idx);
                    }
                }
            }
        }
        PageLink {
            kind: LinkKind::Other,
            target_page: None,
        }
    }
}

impl Document for PdfDocument {
    fn page_count(&self) -> usize {
        self.pages.len()
    }

    fn page_text(&self, page: usize) -> Result<String> {
        self.page_id(page)?;
        // extract_text takes one-based page numbers.
        Ok(self.doc.extract_text(&[page as u32 + 1])?)
    }

    fn page_links(&self, page: usize) -> Result<Vec<PageLink>> {
        let page_id = self.page_id(page)?;
        let page_dict = self.doc.get_dictionary(page_id)?;
        let annots = match page_dict.get(b"Annots") {
            Ok(obj) => obj,
            Err(_) => return Ok(Vec::new()),
        };
        let annots = match self.resolve(annots).as_array() {
            Ok(arr) => arr,
            Err(_) => return Ok(Vec::new()),
        };

        let mut links = Vec::new();
        for annot in annots {
            let Ok(dict) = self.resolve(annot).as_dict() else {
                continue;
            };
            if !matches!(dict.get(b"Subtype").and_then(Object::as_name), Ok(b"Link")) {
                continue;
            }
            links.push(self.link_of(dict));
        }
        Ok(links)
    }
}

/// In-memory document for pipeline tests.
#[cfg(test)]
pub struct FakeDocument {
    pages: Vec<String>,
    links: Vec<Vec<PageLink>>,
}

#[cfg(test)]
impl FakeDocument {
    pub fn new<S: Into<String>>(pages: Vec<S>) -> Self {
        let pages: Vec<String> = pages.into_iter().map(Into::into).collect();
        let links = vec![Vec::new(); pages.len()];
        FakeDocument { pages, links }
    }

    pub fn with_links(mut self, page: usize, links: Vec<PageLink>) -> Self {
        self.links[page] = links;
        self
    }
}

#[cfg(test)]
impl Document for FakeDocument {
    fn page_count(&self) -> usize {
        self.pages.len()
    }

    fn page_text(&self, page: usize) -> Result<String> {
        self.pages
            .get(page)
            .cloned()
            .ok_or(ExtractError::PageOutOfRange {
                page,
                count: self.pages.len(),
            })
    }

    fn page_links(&self, page: usize) -> Result<Vec<PageLink>> {
        self.links
            .get(page)
            .cloned()
            .ok_or(ExtractError::PageOutOfRange {
                page,
                count: self.pages.len(),
            })
    }
}
