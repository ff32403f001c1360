//! Best-effort lexical scan of GLSL sources for attribute and uniform
//! declarations.
//!
//! The grammar is deliberately small: `keyword [precision] type name[, name]*;`
//! on a single line, where keyword is `attribute`/`in` (vertex stage only) or
//! `uniform` (either stage). `layout(...)` prefixes, array suffixes and
//! precision qualifiers are tolerated. Comments are stripped, preprocessor
//! lines are ignored, and anything that does not fit the grammar is skipped.
//! Introspection never fails; an unparseable attribute surfaces later as an
//! unknown-type error during layout planning.

use serde::Serialize;

/// Whether a declaration is a per-vertex input or a per-draw uniform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DeclarationKind {
    Attribute,
    Uniform,
}

/// One declared shader input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParsedDeclaration {
    pub name: String,
    /// The GLSL type as written, e.g. `vec3` or `sampler2D`.
    pub ty: String,
    pub kind: DeclarationKind,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Stage {
    Vertex,
    Fragment,
}

const PRECISION: &[&str] = &["lowp", "mediump", "highp"];
const INTERPOLATION: &[&str] = &["invariant", "flat", "smooth", "centroid", "noperspective"];

/// Extracts attribute and uniform declarations from a vertex/fragment pair.
///
/// Attributes come only from the vertex source; uniforms from both. The result
/// keeps first-seen order and drops repeated `(kind, name)` pairs, so a uniform
/// declared in both stages appears once.
pub fn introspect(vertex: &str, fragment: &str) -> Vec<ParsedDeclaration> {
    let mut out = Vec::new();
    scan(vertex, Stage::Vertex, &mut out);
    scan(fragment, Stage::Fragment, &mut out);
    out
}

/// Attribute declarations of a vertex source, in declaration order.
pub fn attributes(declarations: &[ParsedDeclaration]) -> impl Iterator<Item = &ParsedDeclaration> {
    declarations
        .iter()
        .filter(|d| d.kind == DeclarationKind::Attribute)
}

/// Uniform declarations, in first-seen order.
pub fn uniforms(declarations: &[ParsedDeclaration]) -> impl Iterator<Item = &ParsedDeclaration> {
    declarations
        .iter()
        .filter(|d| d.kind == DeclarationKind::Uniform)
}

fn scan(source: &str, stage: Stage, out: &mut Vec<ParsedDeclaration>) {
    let stripped = strip_comments(source);
    for line in stripped.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        // Only segments terminated by ';' are complete declarations.
        let mut segments: Vec<&str> = line.split(';').collect();
        segments.pop();
        for segment in segments {
            parse_statement(segment, stage, out);
        }
    }
}

fn parse_statement(statement: &str, stage: Stage, out: &mut Vec<ParsedDeclaration>) {
    let statement = skip_layout(statement.trim());
    if statement.contains('{') || statement.contains('(') {
        return;
    }

    let (head, names) = match statement.find(',') {
        Some(comma) => {
            // "vec3 a, b": the first name lives in the head's last token.
            let (head, rest) = statement.split_at(comma);
            let mut tokens: Vec<&str> = head.split_whitespace().collect();
            let Some(first) = tokens.pop() else { return };
            let mut names = vec![first];
            names.extend(rest[1..].split(',').map(str::trim));
            (tokens, names)
        }
        None => {
            let mut tokens: Vec<&str> = statement.split_whitespace().collect();
            let Some(name) = tokens.pop() else { return };
            (tokens, vec![name])
        }
    };

    let mut tokens = head
        .into_iter()
        .filter(|t| !INTERPOLATION.contains(t));

    let kind = match (tokens.next(), stage) {
        (Some("uniform"), _) => DeclarationKind::Uniform,
        (Some("attribute") | Some("in"), Stage::Vertex) => DeclarationKind::Attribute,
        _ => return,
    };

    let mut rest = tokens.filter(|t| !PRECISION.contains(t));
    let (Some(ty), None) = (rest.next(), rest.next()) else {
        return;
    };

    for name in names {
        let name = strip_array_suffix(name);
        if !is_identifier(name) {
            continue;
        }
        let exists = out.iter().any(|d| d.kind == kind && d.name == name);
        if !exists {
            out.push(ParsedDeclaration {
                name: name.to_string(),
                ty: ty.to_string(),
                kind,
            });
        }
    }
}

/// Drops a leading `layout(...)` qualifier.
fn skip_layout(statement: &str) -> &str {
    if let Some(rest) = statement.strip_prefix("layout") {
        if let Some(close) = rest.find(')') {
            return rest[close + 1..].trim_start();
        }
    }
    statement
}

fn strip_array_suffix(name: &str) -> &str {
    match name.find('[') {
        Some(bracket) => name[..bracket].trim_end(),
        None => name,
    }
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Removes `//` and `/* */` comments, keeping line breaks so that line-based
/// scanning still sees one source line per output line.
fn strip_comments(source: &str) -> String {
    let mut out = String::with_capacity(source.len());
    let mut chars = source.chars().peekable();
    let mut in_block = false;

    while let Some(c) = chars.next() {
        if in_block {
            if c == '*' && chars.peek() == Some(&'/') {
                chars.next();
                in_block = false;
            } else if c == '\n' {
                out.push('\n');
            }
            continue;
        }
        match (c, chars.peek()) {
            ('/', Some('/')) => {
                for rest in chars.by_ref() {
                    if rest == '\n' {
                        out.push('\n');
                        break;
                    }
                }
            }
            ('/', Some('*')) => {
                chars.next();
                in_block = true;
            }
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(decls: &[ParsedDeclaration], kind: DeclarationKind) -> Vec<&str> {
        decls
            .iter()
            .filter(|d| d.kind == kind)
            .map(|d| d.name.as_str())
            .collect()
    }

    #[test]
    fn finds_webgl1_attributes_and_uniforms() {
        let vs = "attribute vec3 position;\nattribute vec4 color;\nuniform mat4 modelViewProjection;\n";
        let decls = introspect(vs, "");
        assert_eq!(names(&decls, DeclarationKind::Attribute), ["position", "color"]);
        assert_eq!(names(&decls, DeclarationKind::Uniform), ["modelViewProjection"]);
        assert_eq!(decls[0].ty, "vec3");
        assert_eq!(decls[1].ty, "vec4");
        assert_eq!(decls[2].ty, "mat4");
    }

    #[test]
    fn finds_glsl3_inputs_with_layout_and_precision() {
        let vs = "#version 300 es\nlayout(location = 0) in highp vec2 uv;\nin float size;\n";
        let decls = introspect(vs, "");
        assert_eq!(names(&decls, DeclarationKind::Attribute), ["uv", "size"]);
        assert_eq!(decls[0].ty, "vec2");
    }

    #[test]
    fn multi_name_line_declares_each_name_with_shared_type() {
        let decls = introspect("attribute vec2 a, b ,c;", "");
        assert_eq!(names(&decls, DeclarationKind::Attribute), ["a", "b", "c"]);
        assert!(decls.iter().all(|d| d.ty == "vec2"));
    }

    #[test]
    fn several_statements_on_one_line_are_all_found() {
        let decls = introspect("attribute float a; attribute vec3 b;", "");
        assert_eq!(names(&decls, DeclarationKind::Attribute), ["a", "b"]);
    }

    #[test]
    fn commented_out_lines_are_skipped() {
        let vs = "// attribute vec3 ghost;\nattribute vec3 real; // attribute vec2 trailing;\n/* attribute float block;\nattribute float alsoBlock; */\n";
        let decls = introspect(vs, "");
        assert_eq!(names(&decls, DeclarationKind::Attribute), ["real"]);
    }

    #[test]
    fn fragment_inputs_are_not_attributes() {
        let fs = "in vec4 vColor;\nuniform sampler2D atlas;\n";
        let decls = introspect("", fs);
        assert!(names(&decls, DeclarationKind::Attribute).is_empty());
        assert_eq!(names(&decls, DeclarationKind::Uniform), ["atlas"]);
        assert_eq!(decls[0].ty, "sampler2D");
    }

    #[test]
    fn uniform_in_both_stages_is_deduplicated() {
        let vs = "uniform float time;\n";
        let fs = "uniform float time;\nuniform vec2 viewport;\n";
        let decls = introspect(vs, fs);
        assert_eq!(names(&decls, DeclarationKind::Uniform), ["time", "viewport"]);
    }

    #[test]
    fn array_suffix_is_dropped_from_name() {
        let decls = introspect("uniform float weights[4];", "");
        assert_eq!(decls[0].name, "weights");
    }

    #[test]
    fn function_bodies_and_blocks_are_ignored() {
        let vs = "void main() { gl_Position = vec4(position, 1.0); }\nuniform Lights { vec3 dir; };\n}\n";
        assert!(introspect(vs, "").is_empty());
    }

    #[test]
    fn unterminated_declaration_is_ignored() {
        assert!(introspect("attribute vec3 position", "").is_empty());
    }

    #[test]
    fn unknown_types_are_still_reported() {
        let decls = introspect("attribute dvec3 weird;", "");
        assert_eq!(decls.len(), 1);
        assert_eq!(decls[0].ty, "dvec3");
    }

    #[test]
    fn garbage_input_never_panics() {
        for src in [";;;", "attribute;", "uniform ;", "in , ;", "layout(", "/*", "attribute vec3 ,;"] {
            let _ = introspect(src, src);
        }
    }
}
