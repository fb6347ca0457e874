use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use env_logger::Env;
use log::{debug, info};
use serde::Deserialize;
use std::fs;
use std::path::Path;

use svc_openapi::{
    Config, ServiceDescriptor, ServiceOptions, SpecGenerator, SwaggerUiPage, UiContext, UiProvider,
};

/// Generates OpenAPI (Swagger 2.0 / OpenAPI 3) documents from a service manifest
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Generate OpenAPI documentation
    Generate {
        /// Service manifest file (JSON or YAML)
        #[arg(short, long)]
        manifest: String,

        /// Output directory for generated files
        #[arg(short, long, default_value = "./docs")]
        output: String,

        /// Output types to generate (json,yaml,ui)
        #[arg(long = "ot", default_value = "json,yaml")]
        output_types: String,
    },
}

/// A manifest bundles the plugin configuration with the services an
/// application registers, in registration order.
#[derive(Debug, Deserialize)]
struct Manifest {
    #[serde(default)]
    config: Config,
    #[serde(default)]
    services: Vec<ManifestService>,
}

#[derive(Debug, Deserialize)]
struct ManifestService {
    path: String,
    #[serde(flatten)]
    service: ServiceDescriptor,
    #[serde(default)]
    options: Option<ServiceOptions>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let env = Env::default().filter_or("RUST_LOG", if cli.verbose { "debug" } else { "info" });
    env_logger::init_from_env(env);

    match &cli.command {
        Commands::Generate { manifest, output, output_types } => {
            let output_types: Vec<String> =
                output_types.split(',').map(|s| s.trim().to_string()).collect();
            generate(Path::new(manifest), Path::new(output), &output_types)?;
            info!("OpenAPI documentation generated successfully");
        }
    }

    Ok(())
}

fn generate(manifest_path: &Path, output_dir: &Path, output_types: &[String]) -> Result<()> {
    info!("Generating OpenAPI documentation from {:?}", manifest_path);
    let manifest = load_manifest(manifest_path)?;
    debug!("Manifest declares {} services", manifest.services.len());

    let mut generator = SpecGenerator::new(manifest.config)?;
    for entry in &manifest.services {
        generator.add_service_with_options(&entry.service, &entry.path, entry.options.as_ref())?;
    }

    fs::create_dir_all(output_dir)
        .context(format!("Failed to create output directory: {:?}", output_dir))?;

    for output_type in output_types {
        match output_type.as_str() {
            "json" => {
                let file_path = output_dir.join("openapi.json");
                fs::write(&file_path, generator.document_json()?)
                    .context(format!("Failed to write file: {:?}", file_path))?;
                info!("Generated file: {:?}", file_path);
            }
            "yaml" => {
                let file_path = output_dir.join("openapi.yaml");
                fs::write(&file_path, generator.document_yaml()?)
                    .context(format!("Failed to write file: {:?}", file_path))?;
                info!("Generated file: {:?}", file_path);
            }
            "ui" => {
                let ctx = UiContext {
                    docs_json_path: generator.config().docs_json_path.as_str(),
                    open_api_version: generator.config().open_api_version,
                    specs: generator.document(),
                };
                if let Some(html) = SwaggerUiPage.index_html(&ctx) {
                    let file_path = output_dir.join("swagger-ui.html");
                    fs::write(&file_path, html)
                        .context(format!("Failed to write file: {:?}", file_path))?;
                    info!("Generated Swagger UI HTML: {:?}", file_path);
                }
            }
            other => debug!("Unknown output type: {}", other),
        }
    }

    Ok(())
}

fn load_manifest(path: &Path) -> Result<Manifest> {
    let raw = fs::read_to_string(path).context(format!("Failed to read manifest: {:?}", path))?;
    let manifest = match path.extension().and_then(|ext| ext.to_str()) {
        Some("yaml") | Some("yml") => {
            serde_yaml::from_str(&raw).context("Failed to parse YAML manifest")?
        }
        _ => serde_json::from_str(&raw).context("Failed to parse JSON manifest")?,
    };
    Ok(manifest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;
    use tempfile::tempdir;

    #[test]
    fn test_generate_from_json_manifest() {
        let dir = tempdir().unwrap();
        let manifest_path = dir.path().join("services.json");

        let mut file = File::create(&manifest_path).unwrap();
        write!(
            file,
            r#"{{
                "config": {{
                    "specs": {{ "info.title": "Message API", "info.version": "1.0.0" }}
                }},
                "services": [
                    {{
                        "path": "message",
                        "methods": ["find", "get"],
                        "docs": {{
                            "definition": {{
                                "type": "object",
                                "properties": {{ "content": {{ "type": "string" }} }}
                            }}
                        }}
                    }}
                ]
            }}"#
        )
        .unwrap();

        let output_dir = dir.path().join("docs");
        generate(
            &manifest_path,
            &output_dir,
            &["json".to_string(), "ui".to_string()],
        )
        .unwrap();

        let raw = fs::read_to_string(output_dir.join("openapi.json")).unwrap();
        let tree: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(tree["info"]["title"], "Message API");
        assert!(tree["paths"]["/message"]["get"].is_object());
        assert!(tree["paths"]["/message/{id}"]["get"].is_object());
        assert!(tree["components"]["schemas"]["messageList"].is_object());

        let html = fs::read_to_string(output_dir.join("swagger-ui.html")).unwrap();
        assert!(html.contains("/swagger.json"));
    }

    #[test]
    fn test_generate_from_yaml_manifest() {
        let dir = tempdir().unwrap();
        let manifest_path = dir.path().join("services.yaml");

        let mut file = File::create(&manifest_path).unwrap();
        write!(
            file,
            r#"
config:
  openApiVersion: 2
services:
  - path: message
    methods: [find]
"#
        )
        .unwrap();

        let output_dir = dir.path().join("docs");
        generate(&manifest_path, &output_dir, &["yaml".to_string()]).unwrap();

        let raw = fs::read_to_string(output_dir.join("openapi.yaml")).unwrap();
        let tree: serde_json::Value = serde_yaml::from_str(&raw).unwrap();
        assert_eq!(tree["swagger"], "2.0");
        assert!(tree["paths"]["/message"]["get"].is_object());
    }
}
