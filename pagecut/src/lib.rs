//! Turn a plain-text manuscript into a one-sentence-per-page epub.
//!
//! A manuscript is a metadata header (`KEY: value` lines closed by the
//! literal line `=== START OF CONTENT ===`) followed by body text
//! interleaved with three line-level directives: `[A > B]` section
//! headings, `@img: file | caption` images and `===` paragraph breaks.
//! The pipeline splits paragraphs into sentences, writes every
//! heading, image and sentence as its own xhtml fragment, builds a
//! table of contents from the heading hierarchy, and packs the lot
//! into a valid epub container.
//!
//! The two halves of the pipeline can run independently: fragment
//! generation persists the collected toc entries as `toc_data.json`
//! next to the fragments, and packaging reads them back, so a run can
//! stop between the stages (for instance to hand-tune a fragment)
//! and resume with `-pack` later.
//!
//! # Example
//!
//! ```no_run
//! use pagecut::{build, BuildOptions};
//!
//! let options = BuildOptions::new("manuscript.txt");
//! let (fragments, packed) = build(&options).expect("Error building epub");
//! println!(
//!     "{} fragments -> {}",
//!     fragments.content_fragments,
//!     packed.output.display()
//! );
//! ```

#![deny(dead_code)]
#![deny(unreachable_patterns)]
#![deny(unused_extern_crates)]
#![deny(unused_imports)]
#![deny(unused_qualifications)]
#![deny(clippy::all)]
#![deny(missing_docs)]

use epub_packer::toc;
use epub_packer::{EpubPackingError, EpubResource, PackageSource};
use pagecut_manuscript::{Manuscript, ManuscriptError, StructuralParser};
use pagecut_xhtml::{EmitError, FragmentEmitter, Metrics};
use sentence_segmenter::Segmenter;
use std::error::Error;
use std::fmt;
use std::path::{Path, PathBuf};

/// Where the pipeline reads its inputs and writes its outputs
#[derive(Debug, Clone)]
pub struct BuildOptions {
    /// the manuscript file
    pub manuscript: PathBuf,
    /// directory the xhtml fragments and `toc_data.json` go to
    pub fragments_dir: PathBuf,
    /// directory holding `cover.jpg` and referenced images
    pub images_dir: PathBuf,
    /// directory holding stylesheets
    pub styles_dir: PathBuf,
    /// directory holding fonts
    pub fonts_dir: PathBuf,
    /// index of the first (cover) fragment
    pub start_index: usize,
    /// where to write the epub; defaults to `{prefix}.epub`
    pub output: Option<PathBuf>,
}

impl BuildOptions {
    /// options with the conventional directory layout
    pub fn new<P: Into<PathBuf>>(manuscript: P) -> Self {
        BuildOptions {
            manuscript: manuscript.into(),
            fragments_dir: PathBuf::from("epub_parts"),
            images_dir: PathBuf::from("Images"),
            styles_dir: PathBuf::from("Styles"),
            fonts_dir: PathBuf::from("Fonts"),
            start_index: 1,
            output: None,
        }
    }

    fn toc_data_path(&self) -> PathBuf {
        self.fragments_dir.join("toc_data.json")
    }
}

/// Errors possible while building an epub
#[derive(Debug)]
pub enum BuildError {
    /// the manuscript could not be loaded
    Manuscript(ManuscriptError),
    /// a fragment could not be emitted, or there was nothing to emit
    Emit(EmitError),
    /// the archive could not be packed
    Packing(EpubPackingError),
    /// the persisted toc entries could not be written or read back
    TocData(String),
    /// some other file operation failed
    Io(PathBuf, std::io::Error),
}

impl fmt::Display for BuildError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

impl Error for BuildError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            BuildError::Manuscript(e) => Some(e),
            BuildError::Emit(e) => Some(e),
            BuildError::Packing(e) => Some(e),
            BuildError::Io(_, e) => Some(e),
            BuildError::TocData(_) => None,
        }
    }
}

macro_rules! error_conv {
    ($from:ty, $to:ident) => {
        impl From<$from> for BuildError {
            fn from(src: $from) -> Self {
                BuildError::$to(src)
            }
        }
    };
}

error_conv!(ManuscriptError, Manuscript);
error_conv!(EmitError, Emit);
error_conv!(EpubPackingError, Packing);

/// What fragment generation found and produced
#[derive(Debug)]
pub struct FragmentReport {
    /// the fragment filename prefix, from manuscript metadata
    pub prefix: String,
    /// content fragments written, excluding cover and stats
    pub content_fragments: usize,
    /// document length metrics, as shown on the stats page
    pub metrics: Metrics,
    /// whether the header delimiter was found
    pub had_header: bool,
    /// referenced images absent from the images directory
    pub missing_images: Vec<String>,
    /// malformed directive lines that were skipped during parsing
    pub skipped_lines: Vec<String>,
    /// units that failed to render and were skipped
    pub render_errors: Vec<String>,
}

/// What packaging produced
#[derive(Debug)]
pub struct PackReport {
    /// the epub file written
    pub output: PathBuf,
    /// degraded-mode notes: placeholder styles, unreadable assets
    pub warnings: Vec<String>,
}

/// Run the first pipeline stage: split the manuscript, segment its
/// paragraphs, and write the cover, stats, content fragments,
/// `index.xhtml` and `toc_data.json` into the fragments directory.
pub fn generate_fragments(options: &BuildOptions) -> Result<FragmentReport, BuildError> {
    let manuscript = Manuscript::load(&options.manuscript)?;
    let metadata = &manuscript.metadata;

    let segmenter = Segmenter::default();
    let outcome = StructuralParser::new(&segmenter)
        .images_dir(&options.images_dir)
        .parse(&manuscript.lines);
    let metrics = Metrics::from_units(&outcome.units);

    std::fs::create_dir_all(&options.fragments_dir)
        .map_err(|e| BuildError::Io(options.fragments_dir.clone(), e))?;

    let mut emitter = FragmentEmitter::new(
        &options.fragments_dir,
        metadata.prefix(),
        metadata.language(),
    )
    .with_start_index(options.start_index);

    emitter.write_cover(metadata.title())?;
    emitter.write_stats(&metrics)?;

    let mut render_errors = Vec::new();
    for unit in outcome.units.iter() {
        // one bad unit must not abort the batch
        if let Err(e) = emitter.emit(unit) {
            render_errors.push(format!("{:?}: {}", unit, e));
        }
    }

    let summary = emitter.finish()?;
    toc::save_entries(options.toc_data_path(), &summary.toc_entries)
        .map_err(BuildError::TocData)?;

    Ok(FragmentReport {
        prefix: metadata.prefix().to_string(),
        content_fragments: summary.content_fragments,
        metrics,
        had_header: manuscript.has_header,
        missing_images: outcome.missing_images,
        skipped_lines: outcome.skipped_lines,
        render_errors,
    })
}

/// Run the second pipeline stage: read the fragments, assets and
/// persisted toc entries back from disk, pack the archive and write
/// `{prefix}.epub`.
pub fn pack_epub(options: &BuildOptions) -> Result<PackReport, BuildError> {
    let manuscript = Manuscript::load(&options.manuscript)?;
    let metadata = &manuscript.metadata;
    let prefix = metadata.prefix();
    let mut warnings = Vec::new();

    let mut source = PackageSource::new(prefix);
    source
        .set_title(metadata.title())
        .set_author(metadata.author())
        .set_language(metadata.language())
        .set_start_index(options.start_index);
    if let Some(book_id) = metadata.book_id() {
        source.set_book_id(book_id);
    }

    for name in spine_order(options, prefix) {
        let path = options.fragments_dir.join(&name);
        let data = std::fs::read(&path).map_err(|e| BuildError::Io(path, e))?;
        source.add_document(name, data);
    }

    for path in list_dir(&options.images_dir) {
        match EpubResource::from_file(&path) {
            Ok(resource) => {
                source.add_image(resource);
            }
            Err(e) => warnings.push(e),
        }
    }
    for path in list_dir(&options.styles_dir) {
        match EpubResource::from_file(&path) {
            Ok(resource) => {
                source.add_style(resource);
            }
            Err(e) => warnings.push(e),
        }
    }
    for path in list_dir(&options.fonts_dir) {
        match EpubResource::from_file(&path) {
            Ok(resource) => {
                source.add_font(resource);
            }
            Err(e) => warnings.push(e),
        }
    }
    if !source.has_styles() {
        warnings.push("No stylesheets found; packaging a placeholder stylesheet".to_string());
    }

    let toc_data = options.toc_data_path();
    if toc_data.is_file() {
        source.set_toc_entries(toc::load_entries(&toc_data).map_err(BuildError::TocData)?);
    } else {
        warnings.push(format!(
            "No toc data at {}; the navigation documents will be flat",
            toc_data.display()
        ));
    }

    let bytes = source.pack()?;
    let output = options
        .output
        .clone()
        .unwrap_or_else(|| PathBuf::from(format!("{}.epub", prefix)));
    std::fs::write(&output, bytes).map_err(|e| BuildError::Io(output.clone(), e))?;

    Ok(PackReport { output, warnings })
}

/// Run both stages in sequence
pub fn build(options: &BuildOptions) -> Result<(FragmentReport, PackReport), BuildError> {
    let fragments = generate_fragments(options)?;
    let packed = pack_epub(options)?;
    Ok((fragments, packed))
}

// reading order: cover, stats, visual index, then the remaining
// numbered fragments sorted by name
fn spine_order(options: &BuildOptions, prefix: &str) -> Vec<String> {
    let cover = format!("{}_{:04}.xhtml", prefix, options.start_index);
    let stats = format!("{}_{:04}.xhtml", prefix, options.start_index + 1);

    let mut numbered: Vec<String> = list_dir(&options.fragments_dir)
        .into_iter()
        .filter_map(|p| p.file_name().and_then(|n| n.to_str()).map(|n| n.to_string()))
        .filter(|name| name.starts_with(&format!("{}_", prefix)) && name.ends_with(".xhtml"))
        .collect();
    numbered.sort();

    let mut ordered = Vec::with_capacity(numbered.len() + 1);
    if numbered.contains(&cover) {
        ordered.push(cover.clone());
    }
    if numbered.contains(&stats) {
        ordered.push(stats.clone());
    }
    if options.fragments_dir.join("index.xhtml").is_file() {
        ordered.push("index.xhtml".to_string());
    }
    for name in numbered.into_iter() {
        if name != cover && name != stats {
            ordered.push(name);
        }
    }
    ordered
}

// all files in a directory, sorted by name; a missing directory is an
// empty list, not an error
fn list_dir(dir: &Path) -> Vec<PathBuf> {
    let mut paths: Vec<PathBuf> = match std::fs::read_dir(dir) {
        Ok(entries) => entries
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.is_file())
            .collect(),
        Err(_) => Vec::new(),
    };
    paths.sort();
    paths
}
