use std::path::Path;

/// A mimetype relevant to epub packaging
#[derive(Debug, Hash, PartialEq, Eq, Clone, Copy)]
pub enum MimeType {
    /// A jpeg file
    Jpeg,
    /// A png file
    Png,
    /// A gif file
    Gif,
    /// A svg file
    Svg,
    /// A css file
    Css,
    /// An xhtml file
    Xhtml,
    /// An opentype or truetype font file
    OpenType,
    /// A woff font file
    Woff,
}

impl MimeType {
    /// Guess a mimetype from an extension
    pub fn new_from_extension(ext: &str) -> Option<Self> {
        use MimeType::*;
        match ext {
            "jpg" | "jpeg" => Some(Jpeg),
            "png" => Some(Png),
            "gif" => Some(Gif),
            "svg" => Some(Svg),
            "css" => Some(Css),
            "otf" | "ttf" => Some(OpenType),
            "woff" => Some(Woff),
            "xhtml" => Some(Xhtml),
            _ => None,
        }
    }

    /// return the canonical str representation of this mimetype
    pub const fn to_str(&self) -> &'static str {
        use MimeType::*;
        match self {
            Jpeg => "image/jpeg",
            Png => "image/png",
            Gif => "image/gif",
            Svg => "image/svg+xml",
            Css => "text/css",
            Xhtml => "application/xhtml+xml",
            OpenType => "application/vnd.ms-opentype",
            Woff => "application/font-woff",
        }
    }
}

/// Helper to guess the mimetype of paths
pub trait GuessMimeType {
    /// guess the mimetype of this object
    fn guess_mime(&self) -> Option<MimeType>;
}

impl<T> GuessMimeType for T
where
    T: AsRef<Path>,
{
    /// guess the mimetype of this path-like object
    fn guess_mime(&self) -> Option<MimeType> {
        match self.as_ref().extension() {
            Some(ext) => match ext.to_str() {
                Some(ext) => MimeType::new_from_extension(ext),
                None => None,
            },
            None => None,
        }
    }
}

/// Various helpful functions for analysing filepaths
pub trait MimeTypeHelper {
    /// Is this likely to represent a css file?
    fn is_css(&self) -> bool;
    /// is this an image in a format epub readers support?
    fn is_epub_supported_image(&self) -> bool;
    /// is this a font in a format epub readers support?
    fn is_epub_supported_font(&self) -> bool;
}

impl<T> MimeTypeHelper for T
where
    T: AsRef<Path>,
{
    fn is_css(&self) -> bool {
        self.guess_mime() == Some(MimeType::Css)
    }

    fn is_epub_supported_image(&self) -> bool {
        matches!(
            self.guess_mime(),
            Some(MimeType::Jpeg) | Some(MimeType::Png) | Some(MimeType::Gif) | Some(MimeType::Svg)
        )
    }

    fn is_epub_supported_font(&self) -> bool {
        matches!(
            self.guess_mime(),
            Some(MimeType::OpenType) | Some(MimeType::Woff)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guessing() {
        assert_eq!(Path::new("cover.jpg").guess_mime(), Some(MimeType::Jpeg));
        assert_eq!(Path::new("Style001.css").guess_mime(), Some(MimeType::Css));
        assert_eq!(Path::new("roboto.ttf").guess_mime(), Some(MimeType::OpenType));
        assert_eq!(Path::new("unknown.dat").guess_mime(), None);
    }

    #[test]
    fn test_helpers() {
        assert!(Path::new("a.png").is_epub_supported_image());
        assert!(!Path::new("a.tiff").is_epub_supported_image());
        assert!(Path::new("a.woff").is_epub_supported_font());
        assert!(Path::new("a.css").is_css());
    }
}
