//! Shader stages.

use std::path::Path;

gl_enum! {
    pub enum ShaderKind {
        Vertex = 0x8B31,
        Fragment = 0x8B30,
        Geometry = 0x8DD9,
        TessControl = 0x8E88,
        TessEvaluation = 0x8E87,
        Compute = 0x91B9,
    }
}

/// File-name suffixes recognized for each stage.
const SUFFIXES: &[(&str, ShaderKind)] = &[
    (".vs", ShaderKind::Vertex),
    (".vert", ShaderKind::Vertex),
    (".vert.glsl", ShaderKind::Vertex),
    (".fs", ShaderKind::Fragment),
    (".frag", ShaderKind::Fragment),
    (".frag.glsl", ShaderKind::Fragment),
    (".gs", ShaderKind::Geometry),
    (".geom", ShaderKind::Geometry),
    (".geom.glsl", ShaderKind::Geometry),
    (".tc", ShaderKind::TessControl),
    (".tessc", ShaderKind::TessControl),
    (".tessc.glsl", ShaderKind::TessControl),
    (".te", ShaderKind::TessEvaluation),
    (".tesse", ShaderKind::TessEvaluation),
    (".tesse.glsl", ShaderKind::TessEvaluation),
    (".cs", ShaderKind::Compute),
    (".comp", ShaderKind::Compute),
    (".comp.glsl", ShaderKind::Compute),
];

impl ShaderKind {
    /// Guesses the stage from a file name such as `blur.frag` or `sky.vert.glsl`.
    #[must_use]
    pub fn from_path(path: &Path) -> Option<Self> {
        let name = path.file_name()?.to_str()?.to_ascii_lowercase();
        SUFFIXES
            .iter()
            .find(|(suffix, _)| name.ends_with(suffix))
            .map(|&(_, kind)| kind)
    }

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Vertex => "vertex",
            Self::Fragment => "fragment",
            Self::Geometry => "geometry",
            Self::TessControl => "tessellation control",
            Self::TessEvaluation => "tessellation evaluation",
            Self::Compute => "compute",
        }
    }
}

impl std::fmt::Display for ShaderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guesses_stage_from_extension() {
        let cases = [
            ("shaders/basic.vs", Some(ShaderKind::Vertex)),
            ("basic.vert.glsl", Some(ShaderKind::Vertex)),
            ("BLUR.FRAG", Some(ShaderKind::Fragment)),
            ("hair.geom", Some(ShaderKind::Geometry)),
            ("patch.tessc", Some(ShaderKind::TessControl)),
            ("patch.te", Some(ShaderKind::TessEvaluation)),
            ("cull.comp.glsl", Some(ShaderKind::Compute)),
            ("common.glsl", None),
            ("README", None),
        ];
        for (path, expected) in cases {
            assert_eq!(ShaderKind::from_path(Path::new(path)), expected, "{path}");
        }
    }
}
