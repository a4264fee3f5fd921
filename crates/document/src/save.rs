//! Options for the host's generic save command

/// How the host treats alpha when the target format has none
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatteType {
    White,
    Black,
    SemiGray,
    None,
    Background,
    Foreground,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JpegFormatOptions {
    StandardBaseline,
    OptimizedBaseline,
    Progressive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargaBitsPerPixel {
    Sixteen,
    TwentyFour,
    ThirtyTwo,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JpegSaveOptions {
    /// 0..=12
    pub quality: u8,
    pub matte: MatteType,
    pub embed_color_profile: bool,
    pub format_options: JpegFormatOptions,
    /// Only meaningful for progressive output
    pub scans: Option<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargaSaveOptions {
    pub resolution: TargaBitsPerPixel,
    pub alpha_channels: bool,
    pub rle_compression: bool,
}

/// Format options accepted by [`LayerHost::save_as`](crate::LayerHost::save_as)
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOptions {
    Jpeg(JpegSaveOptions),
    Targa(TargaSaveOptions),
}

/// Case the host applies to the file extension when saving
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtensionCase {
    Lowercase,
    Uppercase,
}

impl ExtensionCase {
    /// Rewrite the extension of `path` in this case.
    pub fn apply(self, path: &std::path::Path) -> std::path::PathBuf {
        let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
            return path.to_path_buf();
        };
        let ext = match self {
            ExtensionCase::Lowercase => ext.to_lowercase(),
            ExtensionCase::Uppercase => ext.to_uppercase(),
        };
        path.with_extension(ext)
    }
}

#[cfg(test)]
mod test {
    use super::ExtensionCase;
    use std::path::Path;

    #[test]
    fn extension_case() {
        let path = Path::new("out/Layer_1.JPG");
        assert_eq!(ExtensionCase::Lowercase.apply(path), Path::new("out/Layer_1.jpg"));
        assert_eq!(
            ExtensionCase::Uppercase.apply(Path::new("a.tga")),
            Path::new("a.TGA")
        );
        assert_eq!(ExtensionCase::Lowercase.apply(Path::new("noext")), Path::new("noext"));
    }
}
