#![deny(unsafe_code)]
//! CLI for inspecting how scenegl reads shaders and lays out vertices.
//!
//! Subcommands:
//! - `declarations <vertex> [fragment]`: list parsed attributes and uniforms
//! - `layout <vertex> <fragment>`: print the planned vertex layout
//!
//! Set `RUST_LOG` (e.g. `RUST_LOG=debug`) to see planning logs.

mod error;

use clap::{Parser, Subcommand};
use error::CliError;
use scenegl_core::{introspect, DeclarationKind, ParsedDeclaration, ProgramDefinition, ProgramInfo};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::process;

#[derive(Parser)]
#[command(name = "scenegl", about = "Shader layout inspector")]
struct Cli {
    /// Output as JSON instead of human-readable text.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List the attributes and uniforms declared by the shaders.
    Declarations {
        /// Vertex shader source file.
        vertex: PathBuf,
        /// Fragment shader source file.
        fragment: Option<PathBuf>,
    },
    /// Compile the shaders and print the planned vertex layout.
    Layout {
        /// Vertex shader source file.
        vertex: PathBuf,
        /// Fragment shader source file.
        fragment: PathBuf,
        /// Program definition JSON (overrides, order, instanced data). Its
        /// shader sources are replaced by the files given above.
        #[arg(short, long)]
        definition: Option<PathBuf>,
    },
}

fn read_source(path: &Path) -> Result<String, CliError> {
    std::fs::read_to_string(path)
        .map_err(|e| CliError::Io(format!("cannot read {}: {e}", path.display())))
}

fn format_declarations(declarations: &[ParsedDeclaration]) -> String {
    let mut out = String::new();
    for decl in declarations {
        let kind = match decl.kind {
            DeclarationKind::Attribute => "attribute",
            DeclarationKind::Uniform => "uniform",
        };
        let _ = writeln!(out, "{kind:<9} {:<10} {}", decl.ty, decl.name);
    }
    out
}

fn format_layout(info: &ProgramInfo) -> String {
    let report = info.describe();
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{} bytes per vertex, {} items per vertex, primitive {}",
        info.byte_per_vertex,
        info.item_per_vertex,
        report["primitive"].as_str().unwrap_or("?")
    );
    let _ = writeln!(out, "{:>6}  {:>5}  {:<12}  name", "offset", "bytes", "codec");
    for slot in &info.attributes {
        let _ = writeln!(
            out,
            "{:>6}  {:>5}  {:<12}  {}",
            slot.offset,
            slot.codec.byte_width(),
            slot.codec.kind().to_string(),
            slot.name
        );
    }
    if !info.instanced.is_empty() {
        let _ = writeln!(out, "instanced:");
        for attribute in &info.instanced {
            let _ = writeln!(
                out,
                "  {} ({}, {} vertices)",
                attribute.name,
                attribute.codec.kind(),
                attribute.vertex_count
            );
        }
    }
    if !info.uniforms.is_empty() {
        let _ = writeln!(out, "uniforms:");
        for binder in &info.uniforms {
            let _ = match binder {
                scenegl_core::UniformBinder::Typed { name, kind } => {
                    writeln!(out, "  {:<9} {name}", kind.to_string())
                }
                scenegl_core::UniformBinder::Sampler { name, unit } => {
                    writeln!(out, "  {:<9} {name} (unit {unit})", "sampler2D")
                }
            };
        }
    }
    out
}

fn run(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        Command::Declarations { vertex, fragment } => {
            let vertex = read_source(&vertex)?;
            let fragment = match fragment {
                Some(path) => read_source(&path)?,
                None => String::new(),
            };
            let declarations = introspect(&vertex, &fragment);
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&declarations)?);
            } else {
                print!("{}", format_declarations(&declarations));
            }
        }
        Command::Layout {
            vertex,
            fragment,
            definition,
        } => {
            let mut def = match definition {
                Some(path) => ProgramDefinition::from_json(&read_source(&path)?)?,
                None => ProgramDefinition::new("", ""),
            };
            def.vertex = read_source(&vertex)?;
            def.fragment = read_source(&fragment)?;

            let info = ProgramInfo::compile(&def)?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&info.describe())?);
            } else {
                print!("{}", format_layout(&info));
            }
        }
    }

    Ok(())
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();
    let json_mode = cli.json;
    if let Err(e) = run(cli) {
        log::debug!("exiting with code {}", e.exit_code());
        if json_mode {
            let j = serde_json::json!({"error": e.to_string(), "exit_code": e.exit_code()});
            eprintln!("{}", serde_json::to_string_pretty(&j).unwrap_or_default());
        } else {
            eprintln!("error: {e}");
        }
        process::exit(e.exit_code());
    }
}
