//! Config command implementation.
//!
//! Generates configuration files in various formats.

use std::fs;
use std::path::PathBuf;

use crate::cli::ConfigFormat;
use crate::config::{render_config, Config};

/// Generates configuration files.
pub fn command_config(
    output: Option<PathBuf>,
    format: ConfigFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let content = generate_config(&format)?;
    let output = output.unwrap_or_else(|| PathBuf::from("herakles-process-info.yaml"));

    if output.to_string_lossy() == "-" {
        print!("{}", content);
    } else {
        fs::write(&output, content)?;
        println!("✅ Configuration written to: {}", output.display());
    }

    Ok(())
}

/// Renders the default configuration, with a comment header for YAML.
pub fn generate_config(format: &ConfigFormat) -> Result<String, Box<dyn std::error::Error>> {
    let content = render_config(&Config::default(), format)?;
    Ok(match format {
        ConfigFormat::Yaml => add_config_comments(content),
        _ => content,
    })
}

/// Adds comments to YAML configuration.
fn add_config_comments(yaml: String) -> String {
    let comments = r#"# Herakles Process Info Configuration
# ===================================
#
# Server Configuration
# --------------------
# bind: "127.0.0.1"            # Bind IP (0.0.0.0 = all interfaces)
# port: 9216                   # HTTP port
#
# Query Behaviour
# ---------------
# proc_root: "/proc"           # procfs mount to resolve PIDs against
# command_line_mode: placeholder # placeholder (size only) or argv
#
# Feature Flags
# -------------
# enable_metrics: true         # Enable /metrics endpoint
# enable_health: true          # Enable /health endpoint
#
# Logging
# -------
# log_level: "info"            # off, error, warn, info, debug, trace

"#;
    format!("{}{}", comments, yaml)
}
