use crate::toc;
use crate::{EpubResource, PackageSource, TocEntry, COVER_IMAGE_NAME};
use pagecut_common::{escape_to_xhtml, MimeType};
use std::borrow::Cow;
use std::error::Error;
use std::fmt;
use std::io::{Cursor, Write};
use uuid::Uuid;
use zip::ZipWriter;

static CONTAINER_PATH: &str = "META-INF/container.xml";
static OPF_PATH: &str = "OEBPS/content.opf";
static NAV_PATH: &str = "OEBPS/nav.xhtml";
static NCX_PATH: &str = "OEBPS/toc.ncx";
static COVER_IMAGE_ID: &str = "cover_img";
static PLACEHOLDER_CSS_NAME: &str = "placeholder.css";

static PLACEHOLDER_CSS: &str = include_str!("placeholder.css");

static CONTAINER_XML: &str = concat!(
    r#"<?xml version="1.0" encoding="UTF-8"?>"#,
    "\n",
    r#"<container version="1.0" xmlns="urn:oasis:names:tc:opendocument:xmlns:container">"#,
    "\n  <rootfiles>",
    "\n    <rootfile full-path=\"OEBPS/content.opf\" media-type=\"application/oebps-package+xml\"/>",
    "\n  </rootfiles>",
    "\n</container>"
);

#[derive(Debug)]
pub enum EpubPackingError {
    Zip(zip::result::ZipError),
    Io(std::io::Error),
    EmptySpine,
    EmptyManifest,
}

impl fmt::Display for EpubPackingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

impl Error for EpubPackingError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            EpubPackingError::Zip(e) => Some(e),
            EpubPackingError::Io(e) => Some(e),
            _ => None,
        }
    }
}

macro_rules! error_conv {
    ($from:ty, $to:ident) => {
        impl From<$from> for EpubPackingError {
            fn from(src: $from) -> Self {
                EpubPackingError::$to(src)
            }
        }
    };
}

error_conv!(zip::result::ZipError, Zip);
error_conv!(std::io::Error, Io);

// an entry in the manifest
#[derive(Debug)]
pub(crate) struct ManifestItem {
    href: String,
    id: String,
    media_type: &'static str,
    properties: Option<&'static str>,
}

impl ManifestItem {
    fn from_resource(src: &EpubResource, dir: &str) -> Self {
        let is_cover = dir == "Images" && src.name == COVER_IMAGE_NAME;
        ManifestItem {
            href: format!("{}/{}", dir, src.name),
            id: if is_cover {
                COVER_IMAGE_ID.to_string()
            } else {
                src.name.replace('.', "_")
            },
            media_type: src.mimetype.to_str(),
            properties: if is_cover { Some("cover-image") } else { None },
        }
    }

    fn render(&self) -> String {
        let mut out = format!(
            "\n    <item id=\"{}\" href=\"{}\" media-type=\"{}\"",
            self.id, self.href, self.media_type
        );
        if let Some(properties) = self.properties {
            out.push_str(&format!(" properties=\"{}\"", properties));
        }
        out.push_str("/>");
        out
    }
}

fn document_stem(name: &str) -> &str {
    name.trim_end_matches(".xhtml")
}

pub(crate) trait EpubPackager {
    fn pack_epub(&self) -> Result<Vec<u8>, EpubPackingError>;
    fn effective_styles(&self) -> Cow<'_, [EpubResource]>;
    fn resolve_book_id(&self) -> String;
    fn toc_with_stats(&self) -> Vec<TocEntry>;
    fn fragment_filename(&self, offset: usize) -> String;
    fn get_manifest_items(&self, styles: &[EpubResource]) -> Result<Vec<ManifestItem>, EpubPackingError>;
    fn generate_opf(&self, styles: &[EpubResource], book_id: &str) -> Result<String, EpubPackingError>;
    fn generate_nav(&self, styles: &[EpubResource]) -> String;
    fn generate_ncx(&self, book_id: &str) -> String;
}

impl EpubPackager for PackageSource {
    fn pack_epub(&self) -> Result<Vec<u8>, EpubPackingError> {
        if self.documents.is_empty() {
            return Err(EpubPackingError::EmptySpine);
        }

        let styles = self.effective_styles();
        let book_id = self.resolve_book_id();
        let opf = self.generate_opf(&styles, &book_id)?;
        let nav = self.generate_nav(&styles);
        let ncx = self.generate_ncx(&book_id);

        let buf = Vec::new();
        let w = Cursor::new(buf);
        let mut zipper = ZipWriter::new(w);
        let uncompressed =
            zip::write::FileOptions::default().compression_method(zip::CompressionMethod::Stored);
        let compressed = zip::write::FileOptions::default();

        // first an uncompressed mimetype file so readers can recognise
        // the container
        zipper.start_file("mimetype", uncompressed)?;
        zipper.write_all(b"application/epub+zip")?;

        zipper.add_directory("META-INF", compressed)?;
        zipper.start_file(CONTAINER_PATH, compressed)?;
        zipper.write_all(CONTAINER_XML.as_bytes())?;

        zipper.start_file(OPF_PATH, compressed)?;
        zipper.write_all(opf.as_bytes())?;
        zipper.start_file(NAV_PATH, compressed)?;
        zipper.write_all(nav.as_bytes())?;
        zipper.start_file(NCX_PATH, compressed)?;
        zipper.write_all(ncx.as_bytes())?;

        for document in self.documents.iter() {
            zipper.start_file(format!("OEBPS/text/{}", document.name), compressed)?;
            zipper.write_all(&document.data)?;
        }
        for image in self.images.iter() {
            zipper.start_file(format!("OEBPS/Images/{}", image.name), compressed)?;
            zipper.write_all(&image.data)?;
        }
        for style in styles.iter() {
            zipper.start_file(format!("OEBPS/Styles/{}", style.name), compressed)?;
            zipper.write_all(&style.data)?;
        }
        for font in self.fonts.iter() {
            zipper.start_file(format!("OEBPS/Fonts/{}", font.name), compressed)?;
            zipper.write_all(&font.data)?;
        }

        let result = zipper.finish().map(|cursor| cursor.into_inner())?;
        Ok(result)
    }

    fn effective_styles(&self) -> Cow<'_, [EpubResource]> {
        if self.styles.is_empty() {
            Cow::Owned(vec![EpubResource {
                name: PLACEHOLDER_CSS_NAME.to_string(),
                data: PLACEHOLDER_CSS.as_bytes().to_vec(),
                mimetype: MimeType::Css,
            }])
        } else {
            Cow::Borrowed(&self.styles)
        }
    }

    fn resolve_book_id(&self) -> String {
        match self.book_id {
            Some(ref id) => id.clone(),
            None => Uuid::new_v4().to_urn().to_string(),
        }
    }

    fn toc_with_stats(&self) -> Vec<TocEntry> {
        let stats = TocEntry::new(vec!["Text Stats"], self.fragment_filename(1));
        std::iter::once(stats)
            .chain(self.toc_entries.iter().cloned())
            .collect()
    }

    fn fragment_filename(&self, offset: usize) -> String {
        format!("{}_{:04}.xhtml", self.prefix, self.start_index + offset)
    }

    fn get_manifest_items(&self, styles: &[EpubResource]) -> Result<Vec<ManifestItem>, EpubPackingError> {
        let mut items = Vec::new();
        for style in styles.iter() {
            items.push(ManifestItem::from_resource(style, "Styles"));
        }
        for font in self.fonts.iter() {
            items.push(ManifestItem::from_resource(font, "Fonts"));
        }
        for image in self.images.iter() {
            items.push(ManifestItem::from_resource(image, "Images"));
        }
        for document in self.documents.iter() {
            items.push(ManifestItem {
                href: format!("text/{}", document.name),
                id: document_stem(&document.name).to_string(),
                media_type: MimeType::Xhtml.to_str(),
                properties: None,
            });
        }

        if items.is_empty() {
            return Err(EpubPackingError::EmptyManifest);
        }

        items.push(ManifestItem {
            href: "toc.ncx".to_string(),
            id: "ncx".to_string(),
            media_type: "application/x-dtbncx+xml",
            properties: None,
        });
        items.push(ManifestItem {
            href: "nav.xhtml".to_string(),
            id: "nav".to_string(),
            media_type: MimeType::Xhtml.to_str(),
            properties: Some("nav"),
        });
        Ok(items)
    }

    fn generate_opf(&self, styles: &[EpubResource], book_id: &str) -> Result<String, EpubPackingError> {
        let manifest_items = self.get_manifest_items(styles)?;
        let cover_document = self.fragment_filename(0);
        let modified = time::now_utc().strftime("%FT%TZ").unwrap().to_string();
        let has_cover_image = self.images.iter().any(|i| i.name == COVER_IMAGE_NAME);

        let mut opf = String::new();
        opf.push_str(r#"<?xml version="1.0" encoding="utf-8"?>"#);
        opf.push('\n');
        opf.push_str(r#"<package xmlns="http://www.idpf.org/2007/opf" unique-identifier="bookid" version="3.0">"#);
        opf.push_str("\n  <metadata xmlns:dc=\"http://purl.org/dc/elements/1.1/\" xmlns:opf=\"http://www.idpf.org/2007/opf\">\n");
        opf.push_str(&format!(
            "    <dc:identifier id=\"bookid\">{}</dc:identifier>\n",
            book_id
        ));
        opf.push_str(&format!(
            "    <dc:title>{}</dc:title>\n",
            escape_to_xhtml(self.title.as_str())
        ));
        if !self.author.is_empty() {
            opf.push_str(&format!(
                "    <dc:creator id=\"creator\">{}</dc:creator>\n",
                escape_to_xhtml(self.author.as_str())
            ));
            opf.push_str(
                "    <meta refines=\"#creator\" property=\"role\" scheme=\"marc:relators\">aut</meta>\n",
            );
        }
        opf.push_str(&format!(
            "    <dc:language>{}</dc:language>\n",
            self.language
        ));
        opf.push_str(&format!(
            "    <meta property=\"dcterms:modified\">{}</meta>\n",
            modified
        ));
        if has_cover_image {
            opf.push_str(&format!(
                "    <meta name=\"cover\" content=\"{}\"/>\n",
                COVER_IMAGE_ID
            ));
        }
        opf.push_str("  </metadata>\n");

        opf.push_str("  <manifest>");
        for item in manifest_items.iter() {
            opf.push_str(&item.render());
        }
        opf.push_str("\n  </manifest>\n");

        opf.push_str("  <spine toc=\"ncx\">");
        for document in self.documents.iter() {
            if document.name == cover_document {
                opf.push_str(&format!(
                    "\n    <itemref idref=\"{}\" linear=\"no\"/>",
                    document_stem(&document.name)
                ));
            } else {
                opf.push_str(&format!(
                    "\n    <itemref idref=\"{}\"/>",
                    document_stem(&document.name)
                ));
            }
        }
        opf.push_str("\n  </spine>\n");

        opf.push_str("  <guide>\n");
        opf.push_str(&format!(
            "    <reference type=\"cover\" title=\"Cover\" href=\"text/{}\"/>\n",
            cover_document
        ));
        opf.push_str("  </guide>\n");
        opf.push_str("</package>");
        Ok(opf)
    }

    fn generate_nav(&self, styles: &[EpubResource]) -> String {
        let entries = self.toc_with_stats();
        let tree = toc::build_tree(&entries);
        let nav_list = toc::render_nav_list(&tree);

        let cover_document = self.fragment_filename(0);
        let first_content = entries
            .iter()
            .find(|e| e.levels.first().map(|l| l != "Text Stats").unwrap_or(false))
            .map(|e| e.file.clone())
            .unwrap_or_else(|| cover_document.clone());
        let style_name = styles
            .first()
            .map(|s| s.name.as_str())
            .unwrap_or(PLACEHOLDER_CSS_NAME);

        let mut nav = String::new();
        nav.push_str(r#"<?xml version="1.0" encoding="utf-8"?>"#);
        nav.push_str("\n<!DOCTYPE html>\n");
        nav.push_str(r#"<html xmlns="http://www.w3.org/1999/xhtml" xmlns:epub="http://www.idpf.org/2007/ops">"#);
        nav.push_str("\n  <head>\n    <title>Table of Contents</title>\n");
        nav.push_str(&format!(
            "    <link href=\"Styles/{}\" rel=\"stylesheet\" type=\"text/css\"/>\n",
            style_name
        ));
        nav.push_str("  </head>\n  <body epub:type=\"bodymatter\">\n");
        nav.push_str("    <nav epub:type=\"toc\" id=\"toc\">\n      <h1>Table of Contents</h1>");
        nav.push_str(&nav_list);
        nav.push_str("\n    </nav>\n");
        nav.push_str("    <nav epub:type=\"landmarks\" hidden=\"hidden\">\n      <ol>\n");
        nav.push_str(&format!(
            "        <li><a epub:type=\"cover\" href=\"text/{}\">Cover</a></li>\n",
            cover_document
        ));
        nav.push_str(&format!(
            "        <li><a epub:type=\"bodymatter\" href=\"text/{}\">Beginning</a></li>\n",
            first_content
        ));
        nav.push_str("      </ol>\n    </nav>\n  </body>\n</html>");
        nav
    }

    fn generate_ncx(&self, book_id: &str) -> String {
        let entries = self.toc_with_stats();
        let tree = toc::build_tree(&entries);
        let mut play_order = 2;
        let nav_points = toc::render_nav_points(&tree, &mut play_order);
        let cover_document = self.fragment_filename(0);

        let mut ncx = String::new();
        ncx.push_str(r#"<?xml version="1.0" encoding="UTF-8"?>"#);
        ncx.push('\n');
        ncx.push_str(r#"<ncx xmlns="http://www.daisy.org/z3986/2005/ncx/" version="2005-1" xml:lang="en">"#);
        ncx.push_str("\n  <head>\n");
        ncx.push_str(&format!(
            "    <meta name=\"dtb:uid\" content=\"{}\"/>\n",
            book_id
        ));
        ncx.push_str("    <meta name=\"dtb:depth\" content=\"2\"/>\n");
        ncx.push_str("    <meta name=\"dtb:totalPageCount\" content=\"0\"/>\n");
        ncx.push_str("    <meta name=\"dtb:maxPageNumber\" content=\"0\"/>\n");
        ncx.push_str("  </head>\n");
        ncx.push_str(&format!(
            "  <docTitle>\n    <text>{}</text>\n  </docTitle>\n",
            escape_to_xhtml(self.title.as_str())
        ));
        ncx.push_str("  <navMap>");
        ncx.push_str(&format!(
            "\n    <navPoint id=\"navpoint-1\" playOrder=\"1\">\n      <navLabel>\n        <text>Cover</text>\n      </navLabel>\n      <content src=\"text/{}\"/>\n    </navPoint>",
            cover_document
        ));
        ncx.push_str(&nav_points);
        ncx.push_str("\n  </navMap>\n</ncx>");
        ncx
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;

    fn minimal_source() -> PackageSource {
        let mut source = PackageSource::new("BOOK");
        source
            .set_title("A Test Book")
            .set_author("A. Author")
            .set_language("en")
            .set_book_id("urn:isbn:123456789");
        source.add_document("BOOK_0001.xhtml", b"<html/>".to_vec());
        source.add_document("BOOK_0002.xhtml", b"<html/>".to_vec());
        source.add_document("index.xhtml", b"<html/>".to_vec());
        source.add_document("BOOK_0003.xhtml", b"<html/>".to_vec());
        source.add_image(EpubResource {
            name: COVER_IMAGE_NAME.to_string(),
            data: vec![0xff, 0xd8],
            mimetype: MimeType::Jpeg,
        });
        source.set_toc_entries(vec![TocEntry::new(vec!["One"], "BOOK_0003.xhtml")]);
        source
    }

    #[test]
    fn test_opf() {
        let source = minimal_source();
        let styles = source.effective_styles();
        let opf = source.generate_opf(&styles, "urn:isbn:123456789").unwrap();

        // drop the timestamp line before comparing anything stable
        let opf_lines: Vec<&str> = opf
            .lines()
            .filter(|l| !l.trim().starts_with("<meta property=\"dcterms:modified\""))
            .collect();
        let opf = opf_lines.join("\n");

        assert!(opf.contains("<dc:identifier id=\"bookid\">urn:isbn:123456789</dc:identifier>"));
        assert!(opf.contains("<dc:title>A Test Book</dc:title>"));
        assert!(opf.contains("<dc:creator id=\"creator\">A. Author</dc:creator>"));
        assert!(opf.contains(
            "<item id=\"cover_img\" href=\"Images/cover.jpg\" media-type=\"image/jpeg\" properties=\"cover-image\"/>"
        ));
        assert!(opf.contains("<meta name=\"cover\" content=\"cover_img\"/>"));
        assert!(opf.contains("<item id=\"nav\" href=\"nav.xhtml\" media-type=\"application/xhtml+xml\" properties=\"nav\"/>"));
        assert!(opf.contains("<itemref idref=\"BOOK_0001\" linear=\"no\"/>"));
        assert!(opf.contains("<itemref idref=\"BOOK_0002\"/>"));
        assert!(opf.contains("<itemref idref=\"index\"/>"));
        assert!(opf.contains("<reference type=\"cover\" title=\"Cover\" href=\"text/BOOK_0001.xhtml\"/>"));
    }

    #[test]
    fn spine_ids_match_manifest_ids() {
        let source = minimal_source();
        let styles = source.effective_styles();
        let opf = source.generate_opf(&styles, "x").unwrap();
        let manifest_ids: Vec<&str> = opf
            .match_indices("<item id=\"")
            .map(|(at, _)| {
                let rest = &opf[at + 10..];
                &rest[..rest.find('"').unwrap()]
            })
            .collect();
        for (at, _) in opf.match_indices("<itemref idref=\"") {
            let rest = &opf[at + 16..];
            let idref = &rest[..rest.find('"').unwrap()];
            assert!(manifest_ids.contains(&idref), "unmatched idref {}", idref);
        }
    }

    #[test]
    fn missing_styles_get_a_placeholder() {
        let source = minimal_source();
        assert!(!source.has_styles());
        let styles = source.effective_styles();
        assert_eq!(styles.len(), 1);
        assert_eq!(styles[0].name, "placeholder.css");
        let opf = source.generate_opf(&styles, "x").unwrap();
        assert!(opf.contains("href=\"Styles/placeholder.css\""));
    }

    #[test]
    fn nav_and_ncx_share_grouping() {
        let source = minimal_source();
        let styles = source.effective_styles();
        let nav = source.generate_nav(&styles);
        let ncx = source.generate_ncx("x");
        assert!(nav.contains("<a href=\"text/BOOK_0002.xhtml\">Text Stats</a>"));
        assert!(nav.contains("<a href=\"text/BOOK_0003.xhtml\">One</a>"));
        // cover is playOrder 1, stats 2, first section 3
        assert!(ncx.contains("playOrder=\"1\""));
        assert!(ncx.contains("<content src=\"text/BOOK_0002.xhtml\"/>"));
        assert!(ncx.contains("<content src=\"text/BOOK_0003.xhtml\"/>"));
        assert!(ncx.contains("playOrder=\"3\""));
    }

    #[test]
    fn empty_spine_is_fatal() {
        let source = PackageSource::new("BOOK");
        match source.pack() {
            Err(EpubPackingError::EmptySpine) => {}
            other => panic!("expected EmptySpine, got {:?}", other),
        }
    }

    #[test]
    fn archive_starts_with_stored_mimetype() {
        let source = minimal_source();
        let bytes = source.pack().unwrap();
        let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        {
            let mut first = archive.by_index(0).unwrap();
            assert_eq!(first.name(), "mimetype");
            assert_eq!(first.compression(), zip::CompressionMethod::Stored);
            let mut contents = String::new();
            first.read_to_string(&mut contents).unwrap();
            assert_eq!(contents, "application/epub+zip");
        }
        let names: Vec<String> = (0..archive.len())
            .map(|i| archive.by_index(i).unwrap().name().to_string())
            .collect();
        assert!(names.contains(&"META-INF/container.xml".to_string()));
        assert!(names.contains(&"OEBPS/content.opf".to_string()));
        assert!(names.contains(&"OEBPS/nav.xhtml".to_string()));
        assert!(names.contains(&"OEBPS/toc.ncx".to_string()));
        assert!(names.contains(&"OEBPS/text/BOOK_0001.xhtml".to_string()));
        assert!(names.contains(&"OEBPS/Images/cover.jpg".to_string()));
        assert!(names.contains(&"OEBPS/Styles/placeholder.css".to_string()));
    }
}
