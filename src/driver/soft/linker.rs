//! Compile, link and program-binary rules of the software driver.

use rustc_hash::FxHashSet;

use super::BINARY_FORMAT;
use super::glsl::{self, Declarations, Variable};
use super::objects::Interface;
use crate::driver::RawHandle;
use crate::types::ShaderKind;

/// First word of every SPIR-V module, little endian.
pub const SPIRV_MAGIC: u32 = 0x0723_0203;

const BINARY_HEADER: &str = "SOFTBIN 1";

/// Checks a GLSL source string and scans its interface.
pub fn compile_glsl(source: &str) -> Result<Declarations, String> {
    if source.trim().is_empty() {
        return Err("0:0(0): error: shader source is empty".to_owned());
    }

    for (number, line) in source.lines().enumerate() {
        if let Some(rest) = line.trim_start().strip_prefix("#error") {
            return Err(format!("0:{}(0): error: #error{rest}", number + 1));
        }
    }

    if !source.contains("void main") {
        return Err("0:0(0): error: entry point `main` is not defined".to_owned());
    }

    Ok(glsl::scan(source))
}

/// Checks the SPIR-V header.
pub fn is_spirv(binary: &[u8]) -> bool {
    binary.len() >= 20
        && binary.len() % 4 == 0
        && binary
            .first_chunk::<4>()
            .is_some_and(|word| u32::from_le_bytes(*word) == SPIRV_MAGIC)
}

/// Whether the module declares an entry point named `name`.
///
/// Entry point names are stored as nul-terminated literals, so a byte search
/// is enough.
pub fn has_entry_point(module: &[u8], name: &str) -> bool {
    if name.is_empty() {
        return false;
    }
    let mut needle = name.as_bytes().to_vec();
    needle.push(0);
    module.windows(needle.len()).any(|window| window == needle)
}

/// One attached shader as seen by the linker.
pub struct Stage<'a> {
    pub handle: RawHandle,
    pub kind: ShaderKind,
    pub compiled: bool,
    pub decls: &'a Declarations,
}

/// Links the interface of a set of stages.
pub fn link(stages: &[Stage<'_>]) -> Result<Interface, String> {
    if stages.is_empty() {
        return Err("error: no shaders attached".to_owned());
    }

    for stage in stages {
        if !stage.compiled {
            return Err(format!(
                "error: {} shader {} is not compiled",
                stage.kind, stage.handle
            ));
        }
    }

    if stages.len() > 1 && stages.iter().any(|s| s.kind == ShaderKind::Compute) {
        return Err("error: compute shaders cannot be linked with other stages".to_owned());
    }

    let mut interface = Interface::default();

    for stage in stages {
        for uniform in &stage.decls.uniforms {
            match interface.uniforms.iter().find(|u| u.name == uniform.name) {
                Some(existing) if existing.ty != uniform.ty => {
                    return Err(format!(
                        "error: uniform `{}` declared as both {} and {}",
                        uniform.name, existing.ty, uniform.ty
                    ));
                }
                Some(_) => {}
                None => interface.uniforms.push(Variable {
                    location: None,
                    ..uniform.clone()
                }),
            }
        }

        for block in &stage.decls.blocks {
            if !interface.blocks.contains(block) {
                interface.blocks.push(block.clone());
            }
        }
    }

    interface.attributes = assign_attribute_locations(
        stages
            .iter()
            .filter(|s| s.kind == ShaderKind::Vertex)
            .flat_map(|s| s.decls.inputs.iter()),
    )?;

    Ok(interface)
}

/// Keeps explicit locations and gives the remaining attributes the lowest
/// free ones.
fn assign_attribute_locations<'a>(
    inputs: impl Iterator<Item = &'a Variable>,
) -> Result<Vec<Variable>, String> {
    let inputs: Vec<&Variable> = inputs.collect();
    let mut used = FxHashSet::default();
    let mut attributes = Vec::with_capacity(inputs.len());

    for input in inputs.iter().filter(|v| v.location.is_some()) {
        let location = input.location.unwrap_or_default();
        if !used.insert(location) {
            return Err(format!(
                "error: attribute `{}` reuses location {location}",
                input.name
            ));
        }
        attributes.push((*input).clone());
    }

    let mut next = 0;
    for input in inputs.iter().filter(|v| v.location.is_none()) {
        while used.contains(&next) {
            next += 1;
        }
        used.insert(next);
        attributes.push(Variable {
            location: Some(next),
            ..(*input).clone()
        });
    }

    attributes.sort_by_key(|a| a.location);
    Ok(attributes)
}

/// Serializes a linked interface.
pub fn encode_binary(interface: &Interface) -> Vec<u8> {
    let mut out = String::from(BINARY_HEADER);
    out.push('\n');
    for u in &interface.uniforms {
        out.push_str(&format!("u {} {}\n", u.ty, u.name));
    }
    for a in &interface.attributes {
        out.push_str(&format!(
            "a {} {} {}\n",
            a.location.unwrap_or_default(),
            a.ty,
            a.name
        ));
    }
    for b in &interface.blocks {
        out.push_str(&format!("b {b}\n"));
    }
    out.into_bytes()
}

pub fn decode_binary(format: u32, data: &[u8]) -> Result<Interface, String> {
    if format != BINARY_FORMAT {
        return Err(format!("unknown binary format 0x{format:08X}"));
    }
    let text = std::str::from_utf8(data).map_err(|_| "binary is not readable".to_owned())?;
    let mut lines = text.lines();
    if lines.next() != Some(BINARY_HEADER) {
        return Err("binary header mismatch".to_owned());
    }

    let mut interface = Interface::default();
    for line in lines {
        let fields: Vec<&str> = line.split(' ').collect();
        match fields.as_slice() {
            ["u", ty, name] => interface.uniforms.push(Variable {
                location: None,
                ty: (*ty).to_owned(),
                name: (*name).to_owned(),
            }),
            ["a", location, ty, name] => interface.attributes.push(Variable {
                location: Some(
                    location
                        .parse()
                        .map_err(|_| format!("corrupt attribute record `{line}`"))?,
                ),
                ty: (*ty).to_owned(),
                name: (*name).to_owned(),
            }),
            ["b", name] => interface.blocks.push((*name).to_owned()),
            _ => return Err(format!("corrupt binary record `{line}`")),
        }
    }
    Ok(interface)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decls(source: &str) -> Declarations {
        compile_glsl(source).unwrap()
    }

    #[test]
    fn compile_reports_error_directive_line() {
        let log = compile_glsl("#version 450\n#error unsupported\nvoid main() {}").unwrap_err();
        assert_eq!(log, "0:2(0): error: #error unsupported");
        assert!(compile_glsl("   ").is_err());
        assert!(compile_glsl("#version 450\nuniform float x;").is_err());
    }

    #[test]
    fn link_merges_stages() {
        let vs = decls(
            "layout(location = 1) in vec2 uv;\nin vec3 position;\nuniform mat4 mvp;\nvoid main() {}",
        );
        let fs = decls("uniform mat4 mvp;\nuniform sampler2D albedo;\nvoid main() {}");
        let interface = link(&[
            Stage { handle: 1, kind: ShaderKind::Vertex, compiled: true, decls: &vs },
            Stage { handle: 2, kind: ShaderKind::Fragment, compiled: true, decls: &fs },
        ])
        .unwrap();

        let names: Vec<_> = interface.uniforms.iter().map(|u| u.name.as_str()).collect();
        assert_eq!(names, vec!["mvp", "albedo"]);

        let attributes: Vec<_> = interface
            .attributes
            .iter()
            .map(|a| (a.location, a.name.as_str()))
            .collect();
        assert_eq!(attributes, vec![(Some(0), "position"), (Some(1), "uv")]);
    }

    #[test]
    fn link_rejects_conflicting_uniform_types() {
        let vs = decls("uniform vec3 tint;\nvoid main() {}");
        let fs = decls("uniform vec4 tint;\nvoid main() {}");
        let err = link(&[
            Stage { handle: 1, kind: ShaderKind::Vertex, compiled: true, decls: &vs },
            Stage { handle: 2, kind: ShaderKind::Fragment, compiled: true, decls: &fs },
        ])
        .unwrap_err();
        assert!(err.contains("tint"), "{err}");
    }

    #[test]
    fn binary_restores_interface() {
        let vs = decls(
            "in vec3 position;\nuniform Camera {\n mat4 vp;\n};\nuniform float t;\nvoid main() {}",
        );
        let interface = link(&[Stage {
            handle: 1,
            kind: ShaderKind::Vertex,
            compiled: true,
            decls: &vs,
        }])
        .unwrap();

        let decoded = decode_binary(BINARY_FORMAT, &encode_binary(&interface)).unwrap();
        assert_eq!(decoded, interface);
        assert!(decode_binary(BINARY_FORMAT + 1, b"").is_err());
        assert!(decode_binary(BINARY_FORMAT, b"SOFTBIN 1\nx y").is_err());
    }

    #[test]
    fn spirv_header_and_entry_points() {
        let mut module = SPIRV_MAGIC.to_le_bytes().to_vec();
        module.extend_from_slice(&[0; 12]);
        module.extend_from_slice(b"main\0\0\0\0");
        assert!(is_spirv(&module));
        assert!(has_entry_point(&module, "main"));
        assert!(!has_entry_point(&module, "ma"));
        assert!(!is_spirv(&module[..18]));
    }
}
