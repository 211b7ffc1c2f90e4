// classdex_cli - CLI functionality (library interface for testing)
use anyhow::{Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use classdex_index::{
    AnchorStyle, DuplicateClassPolicy, IndexConfig, JavaIndex, JavaIndexBuilder, JavadocLinker,
    Resolved, SymbolReference, CONFIG_FILE_NAME,
};
use serde::Serialize;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

#[derive(Parser, Debug)]
#[command(name = "classdex")]
#[command(about = "Resolve Java classes and methods from compiled classpaths")]
#[command(version)]
pub struct Cli {
    #[command(flatten)]
    pub options: IndexOptions,
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Resolve class and method references such as `Alpha#run(int)`
    Resolve {
        /// References to resolve
        #[arg(required = true)]
        references: Vec<String>,
        /// Print results as a JSON array
        #[arg(long)]
        json: bool,
    },
    /// List every indexed class
    List,
}

/// Flags that override values read from the configuration file.
#[derive(Args, Debug, Default)]
pub struct IndexOptions {
    /// Configuration file (defaults to ./classdex.toml when present)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
    /// Dotted namespace to index
    #[arg(long, global = true)]
    pub base_package: Option<String>,
    /// Directory or archive to scan; may be repeated
    #[arg(long = "classpath", global = true)]
    pub classpath: Vec<String>,
    /// Base URL of the published Javadoc
    #[arg(long, global = true)]
    pub javadoc_url: Option<String>,
    /// Anchor format used in method links
    #[arg(long, value_enum, global = true)]
    pub anchor_style: Option<AnchorStyleArg>,
    /// Abort when two roots define the same class
    #[arg(long, global = true)]
    pub fail_on_duplicates: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum AnchorStyleArg {
    Legacy,
    Modern,
}

impl From<AnchorStyleArg> for AnchorStyle {
    fn from(value: AnchorStyleArg) -> Self {
        match value {
            AnchorStyleArg::Legacy => AnchorStyle::Legacy,
            AnchorStyleArg::Modern => AnchorStyle::Modern,
        }
    }
}

impl IndexOptions {
    /// Loads the configuration file, if any, and applies command-line overrides.
    pub fn resolve_config(&self) -> Result<IndexConfig> {
        let mut config = match self.config_path() {
            Some(path) => {
                info!(path = %path.display(), "loading configuration");
                IndexConfig::load(&path)
                    .with_context(|| format!("failed to load '{}'", path.display()))?
            }
            None => IndexConfig::default(),
        };

        if let Some(base_package) = &self.base_package {
            config.base_package = base_package.clone();
        }
        if !self.classpath.is_empty() {
            config.classpath = self.classpath.clone();
        }
        if let Some(url) = &self.javadoc_url {
            config.javadoc_url = Some(url.clone());
        }
        if let Some(style) = self.anchor_style {
            config.anchor_style = style.into();
        }
        if self.fail_on_duplicates {
            config.duplicate_classes = DuplicateClassPolicy::Fail;
        }
        Ok(config)
    }

    fn config_path(&self) -> Option<PathBuf> {
        if let Some(path) = &self.config {
            return Some(path.clone());
        }
        let fallback = Path::new(CONFIG_FILE_NAME);
        fallback.is_file().then(|| fallback.to_path_buf())
    }
}

/// One successfully resolved reference, as printed by `resolve --json`.
#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct ResolvedEntry {
    pub reference: String,
    pub class: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    pub deprecated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl ResolvedEntry {
    fn new(reference: &str, resolved: Resolved<'_>, linker: Option<&JavadocLinker>) -> Self {
        let class = resolved.class();
        let method = resolved.method();
        let url = linker.map(|linker| match method {
            Some(method) => linker.method_url(class, method),
            None => linker.class_url(class),
        });
        Self {
            reference: reference.to_string(),
            class: class.name().to_string(),
            method: method.map(|method| method.signature()),
            deprecated: method.is_some_and(|method| method.is_deprecated()),
            url,
        }
    }

    fn render(&self) -> String {
        let mut line = self.class.clone();
        if let Some(method) = &self.method {
            line.push('#');
            line.push_str(method);
        }
        if self.deprecated {
            line.push_str(" [deprecated]");
        }
        if let Some(url) = &self.url {
            line.push('\t');
            line.push_str(url);
        }
        line
    }
}

pub fn run(cli: &Cli, out: &mut dyn Write) -> Result<()> {
    let config = cli.options.resolve_config()?;
    debug!(
        base_package = %config.base_package,
        roots = config.classpath.len(),
        duplicates = %config.duplicate_classes,
        "resolved configuration"
    );
    let index = JavaIndexBuilder::from_config(&config)
        .build()
        .context("failed to build the class index")?;

    match &cli.command {
        Commands::Resolve { references, json } => {
            let linker = config
                .javadoc_url
                .as_deref()
                .map(|url| JavadocLinker::new(url, config.anchor_style));
            resolve_references(&index, references, linker.as_ref(), *json, out)
        }
        Commands::List => list_classes(&index, out),
    }
}

fn resolve_references(
    index: &JavaIndex,
    references: &[String],
    linker: Option<&JavadocLinker>,
    json: bool,
    out: &mut dyn Write,
) -> Result<()> {
    let mut entries = Vec::new();
    let mut failures = Vec::new();
    for text in references {
        let outcome = SymbolReference::parse(text)
            .map_err(anyhow::Error::from)
            .and_then(|reference| index.lookup(&reference).map_err(anyhow::Error::from));
        match outcome {
            Ok(resolved) => entries.push(ResolvedEntry::new(text, resolved, linker)),
            Err(error) => failures.push(format!("{text}: {error}")),
        }
    }

    if json {
        serde_json::to_writer_pretty(&mut *out, &entries)?;
        writeln!(out)?;
    } else {
        for entry in &entries {
            writeln!(out, "{}", entry.render())?;
        }
    }

    if !failures.is_empty() {
        anyhow::bail!(
            "{} of {} reference(s) could not be resolved\n\n{}",
            failures.len(),
            references.len(),
            failures.join("\n\n")
        );
    }
    Ok(())
}

fn list_classes(index: &JavaIndex, out: &mut dyn Write) -> Result<()> {
    let mut classes: Vec<_> = index.classes().collect();
    classes.sort_by(|left, right| left.name().cmp(right.name()));
    for class in classes {
        writeln!(out, "{} ({} methods)", class.name(), class.methods().len())?;
    }

    let report = index.report();
    if !report.skipped.is_empty() {
        info!(skipped = report.skipped.len(), "some classpath entries were not indexed");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_cli_parsing() {
        let cli = Cli::try_parse_from([
            "classdex",
            "resolve",
            "Alpha#run",
            "Bravo",
            "--json",
            "--classpath",
            "a.jar",
            "--classpath",
            "classes",
            "-vv",
        ])
        .unwrap();
        match &cli.command {
            Commands::Resolve { references, json } => {
                assert_eq!(references, &["Alpha#run", "Bravo"]);
                assert!(*json);
            }
            _ => panic!("Expected Resolve command"),
        }
        assert_eq!(cli.options.classpath, vec!["a.jar", "classes"]);
        assert_eq!(cli.verbose, 2);

        let cli = Cli::try_parse_from(["classdex", "--anchor-style", "modern", "list"]).unwrap();
        assert!(matches!(cli.command, Commands::List));
        assert_eq!(cli.options.anchor_style, Some(AnchorStyleArg::Modern));

        assert!(Cli::try_parse_from(["classdex", "resolve"]).is_err());
    }

    #[test]
    fn command_line_overrides_configuration_file() {
        let dir = TempDir::new().unwrap();
        let config_path = dir.path().join("classdex.toml");
        fs::write(
            &config_path,
            r#"
base-package = "com.example"
classpath = ["from-config"]
javadoc-url = "https://docs.example.com/api"
"#,
        )
        .unwrap();

        let options = IndexOptions {
            config: Some(config_path),
            classpath: vec!["override".into()],
            anchor_style: Some(AnchorStyleArg::Modern),
            fail_on_duplicates: true,
            ..IndexOptions::default()
        };
        let config = options.resolve_config().unwrap();
        assert_eq!(config.base_package, "com.example");
        assert_eq!(config.classpath, vec!["override"]);
        assert_eq!(config.javadoc_url.as_deref(), Some("https://docs.example.com/api"));
        assert_eq!(config.anchor_style, AnchorStyle::Modern);
        assert_eq!(config.duplicate_classes, DuplicateClassPolicy::Fail);
    }

    #[test]
    fn missing_configuration_file_is_an_error() {
        let options = IndexOptions {
            config: Some(PathBuf::from("/definitely/missing/classdex.toml")),
            ..IndexOptions::default()
        };
        assert!(options.resolve_config().is_err());
    }

    #[test]
    fn entry_rendering() {
        let entry = ResolvedEntry {
            reference: "Alpha#deprecated".into(),
            class: "com.example.Alpha".into(),
            method: Some("deprecated()".into()),
            deprecated: true,
            url: Some("https://docs/com/example/Alpha.html#deprecated--".into()),
        };
        assert_eq!(
            entry.render(),
            "com.example.Alpha#deprecated() [deprecated]\thttps://docs/com/example/Alpha.html#deprecated--"
        );
    }
}
