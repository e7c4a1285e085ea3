//! Global-scope GLSL declaration scanner.
//!
//! Finds `uniform` variables, uniform blocks and `in` variables declared at
//! file scope. It is line based and only understands the declaration forms a
//! program interface is built from; anything else is skipped.

/// A `uniform` or `in` variable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Variable {
    pub location: Option<u32>,
    pub ty: String,
    pub name: String,
}

/// Interface declarations found in one source string.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Declarations {
    pub uniforms: Vec<Variable>,
    pub inputs: Vec<Variable>,
    pub blocks: Vec<String>,
}

const QUALIFIERS: &[&str] = &[
    "flat",
    "smooth",
    "noperspective",
    "centroid",
    "sample",
    "highp",
    "mediump",
    "lowp",
    "invariant",
    "precise",
    "readonly",
    "writeonly",
    "coherent",
    "volatile",
    "restrict",
];

pub fn scan(source: &str) -> Declarations {
    let mut decls = Declarations::default();
    let mut depth = 0usize;

    for raw in source.lines() {
        let line = raw.split("//").next().unwrap_or_default().trim();
        if depth == 0 && !line.is_empty() && !line.starts_with('#') {
            scan_line(line, &mut decls);
        }
        depth += line.matches('{').count();
        depth = depth.saturating_sub(line.matches('}').count());
    }

    decls
}

fn scan_line(line: &str, decls: &mut Declarations) {
    let (location, rest) = split_layout(line);
    let mut tokens = rest
        .split_whitespace()
        .filter(|token| !QUALIFIERS.contains(token));

    let storage = tokens.next();
    let body: Vec<&str> = tokens.collect();
    let body = body.join(" ");

    match storage {
        Some("uniform") => {
            if body.contains('{') || !body.contains(';') {
                let name = body.split(['{', ' ']).next().unwrap_or_default().trim();
                if !name.is_empty() {
                    decls.blocks.push(name.to_owned());
                }
            } else {
                decls.uniforms.extend(variables(&body, location));
            }
        }
        Some("in" | "attribute") => decls.inputs.extend(variables(&body, location)),
        _ => {}
    }
}

/// Splits a leading `layout(...)` qualifier off, returning its location.
fn split_layout(line: &str) -> (Option<u32>, &str) {
    let Some(after) = line.strip_prefix("layout") else {
        return (None, line);
    };
    let after = after.trim_start();
    let (Some(open), Some(close)) = (after.find('('), after.find(')')) else {
        return (None, line);
    };
    if open != 0 || close < open {
        return (None, line);
    }

    let location = after[open + 1..close].split(',').find_map(|item| {
        let (key, value) = item.split_once('=')?;
        (key.trim() == "location")
            .then(|| value.trim().parse().ok())
            .flatten()
    });
    (location, after[close + 1..].trim_start())
}

/// Parses `type a, b[4], c = 1.0;` into variables of `type`.
fn variables(body: &str, location: Option<u32>) -> Vec<Variable> {
    let body = body.split(';').next().unwrap_or_default().trim();
    let Some((ty, names)) = body.split_once(char::is_whitespace) else {
        return Vec::new();
    };

    names
        .split(',')
        .filter_map(|name| {
            let name = name.split('=').next()?.split('[').next()?.trim();
            (!name.is_empty()).then(|| name.to_owned())
        })
        .enumerate()
        .map(|(i, name)| Variable {
            location: location.map(|l| l + i as u32),
            ty: ty.trim().to_owned(),
            name,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const VERTEX: &str = r"
        #version 450 core
        layout(location = 0) in vec3 position;
        layout(location = 2) in vec2 uv;
        in flat int material;   // trailing comment

        layout(std140, binding = 0) uniform Camera {
            mat4 view;
            mat4 projection;
        };

        uniform mat4 model;
        uniform highp float time, fade = 1.0;
        uniform sampler2D textures[4];

        out vec2 v_uv;

        void main() {
            in_scope_is_ignored();
            gl_Position = vec4(position, 1.0);
        }
    ";

    #[test]
    fn finds_global_declarations() {
        let decls = scan(VERTEX);

        let inputs: Vec<_> = decls
            .inputs
            .iter()
            .map(|v| (v.location, v.ty.as_str(), v.name.as_str()))
            .collect();
        assert_eq!(
            inputs,
            vec![
                (Some(0), "vec3", "position"),
                (Some(2), "vec2", "uv"),
                (None, "int", "material"),
            ]
        );

        let uniforms: Vec<_> = decls
            .uniforms
            .iter()
            .map(|v| (v.ty.as_str(), v.name.as_str()))
            .collect();
        assert_eq!(
            uniforms,
            vec![
                ("mat4", "model"),
                ("float", "time"),
                ("float", "fade"),
                ("sampler2D", "textures"),
            ]
        );

        assert_eq!(decls.blocks, vec!["Camera".to_owned()]);
    }

    #[test]
    fn block_opened_on_next_line() {
        let decls = scan("uniform Lights\n{\n    vec4 color;\n};\nuniform int count;");
        assert_eq!(decls.blocks, vec!["Lights".to_owned()]);
        assert_eq!(decls.uniforms.len(), 1);
        assert_eq!(decls.uniforms[0].name, "count");
    }
}
