#![deny(dead_code)]
#![deny(unreachable_patterns)]
#![deny(unused_extern_crates)]
#![deny(unused_imports)]
#![deny(unused_qualifications)]
#![deny(clippy::all)]
#![deny(missing_debug_implementations)]
#![deny(variant_size_differences)]

//! Assemble xhtml fragments, resources and navigation data into a
//! structurally valid epub container: `mimetype` first and uncompressed,
//! then the OCF container descriptor, the OPF package document, the
//! EPUB3 navigation document, the legacy NCX map, and the content.

use pagecut_common::{GuessMimeType, MimeType};
use std::path::Path;

mod builder;
pub mod toc;
use builder::EpubPackager;
pub use builder::EpubPackingError;
pub use toc::{TocEntry, TocNode};

/// The fixed name of the pre-rendered cover image within the images
/// set; the manifest item for this file carries `properties="cover-image"`.
pub static COVER_IMAGE_NAME: &str = "cover.jpg";

/// A resource of some kind, i.e. something other than textual content,
/// such as an image, css or a font
#[derive(Debug, Clone, PartialEq, Hash, Eq)]
pub struct EpubResource {
    /// the bare filename the resource is written under
    pub name: String,
    /// the raw bytes
    pub data: Vec<u8>,
    /// the mimetype recorded in the manifest
    pub mimetype: MimeType,
}

impl EpubResource {
    /// Read a resource from a file, guessing its mimetype from the
    /// extension
    pub fn from_file<P: AsRef<Path>>(p: P) -> Result<Self, String> {
        let p = p.as_ref();
        let mimetype = p
            .guess_mime()
            .ok_or_else(|| format!("Unsupported resource type: {}", p.display()))?;
        let name = p
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| format!("No file name: {}", p.display()))?
            .to_string();
        let data = std::fs::read(p).map_err(|e| format!("{}: [{}]", e, p.display()))?;
        Ok(EpubResource {
            name,
            data,
            mimetype,
        })
    }
}

/// A single piece of textual content, written under `OEBPS/text/`
#[derive(Debug, Clone)]
pub struct TextDocument {
    /// the bare filename, e.g. `BOOK_0001.xhtml`
    pub name: String,
    /// the serialized xhtml
    pub data: Vec<u8>,
}

/// The source from which an epub is packed.
///
/// Documents are added in spine (reading) order; the document whose
/// name matches the cover filename `{prefix}_{start:04}.xhtml` is
/// marked `linear="no"` in the spine.
#[derive(Debug, Default)]
pub struct PackageSource {
    pub(crate) title: String,
    pub(crate) author: String,
    pub(crate) language: String,
    pub(crate) book_id: Option<String>,
    pub(crate) prefix: String,
    pub(crate) start_index: usize,
    pub(crate) documents: Vec<TextDocument>,
    pub(crate) images: Vec<EpubResource>,
    pub(crate) styles: Vec<EpubResource>,
    pub(crate) fonts: Vec<EpubResource>,
    pub(crate) toc_entries: Vec<TocEntry>,
}

impl PackageSource {
    /// a new source for fragments named with `prefix`
    pub fn new<S: ToString>(prefix: S) -> Self {
        PackageSource {
            title: "Untitled Book".to_string(),
            language: "en".to_string(),
            prefix: prefix.to_string(),
            start_index: 1,
            ..Default::default()
        }
    }

    /// Set the book title
    pub fn set_title<S: ToString>(&mut self, title: S) -> &mut Self {
        self.title = title.to_string();
        self
    }

    /// Set the book author
    pub fn set_author<S: ToString>(&mut self, author: S) -> &mut Self {
        self.author = author.to_string();
        self
    }

    /// Set the language recorded in `dc:language`
    pub fn set_language<S: ToString>(&mut self, language: S) -> &mut Self {
        self.language = language.to_string();
        self
    }

    /// Set a stable identifier; without one a fresh `urn:uuid` is
    /// generated at packing time
    pub fn set_book_id<S: ToString>(&mut self, book_id: S) -> &mut Self {
        self.book_id = Some(book_id.to_string());
        self
    }

    /// Set the index of the first (cover) fragment
    pub fn set_start_index(&mut self, start_index: usize) -> &mut Self {
        self.start_index = start_index;
        self
    }

    /// Add a content document, in reading order
    pub fn add_document<S: ToString>(&mut self, name: S, data: Vec<u8>) -> &mut Self {
        self.documents.push(TextDocument {
            name: name.to_string(),
            data,
        });
        self
    }

    /// Add an image resource
    pub fn add_image(&mut self, resource: EpubResource) -> &mut Self {
        self.images.push(resource);
        self
    }

    /// Add a stylesheet resource
    pub fn add_style(&mut self, resource: EpubResource) -> &mut Self {
        self.styles.push(resource);
        self
    }

    /// Add a font resource
    pub fn add_font(&mut self, resource: EpubResource) -> &mut Self {
        self.fonts.push(resource);
        self
    }

    /// Provide the flat toc-entry list collected during emission
    pub fn set_toc_entries(&mut self, entries: Vec<TocEntry>) -> &mut Self {
        self.toc_entries = entries;
        self
    }

    /// whether any style resource was supplied; when none is, packing
    /// substitutes a built-in placeholder stylesheet
    pub fn has_styles(&self) -> bool {
        !self.styles.is_empty()
    }

    /// Pack everything into epub archive bytes
    pub fn pack(&self) -> Result<Vec<u8>, EpubPackingError> {
        self.pack_epub()
    }
}
