//! The `pixshift formats` command.

use pixshift_core::TargetFormat;

/// Print the supported target formats and their traits.
pub fn execute() -> anyhow::Result<()> {
    print!("{}", format_table());
    Ok(())
}

fn format_table() -> String {
    let mut out = format!(
        "{:<8} {:<10} {:<8} {:<8} {:<8}\n",
        "FORMAT", "EXTENSION", "ALIASES", "QUALITY", "ALPHA"
    );
    for format in TargetFormat::ALL {
        let spec = format.spec();
        let aliases = if spec.aliases.is_empty() {
            "-".to_string()
        } else {
            spec.aliases.join(",")
        };
        let alpha = if spec.requires_opaque {
            "flatten"
        } else {
            "keep"
        };
        let mut line = format!(
            "{:<8} {:<10} {:<8} {:<8} {:<8}",
            spec.name,
            spec.extension,
            aliases,
            if spec.supports_quality { "yes" } else { "no" },
            alpha
        );
        if spec.codec_format.is_none() {
            line.push_str(" (no encoder available)");
        }
        out.push_str(line.trim_end());
        out.push('\n');
    }
    out
}
