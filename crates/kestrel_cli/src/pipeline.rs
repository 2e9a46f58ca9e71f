//! Shared helpers for CLI commands: locating and loading `kestrel.toml`,
//! reading JSON netlists and printing diagnostics.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use kestrel_config::{load_config_from_str, ProjectConfig, CONFIG_FILE_NAME};
use kestrel_diagnostics::{DiagnosticRenderer, DiagnosticSink, TerminalRenderer};
use kestrel_netlist::Netlist;

use crate::GlobalArgs;

/// Walks up from `start` looking for the nearest directory containing `kestrel.toml`.
pub fn find_project_root(start: &Path) -> Option<PathBuf> {
    let mut current = start.to_path_buf();
    loop {
        if current.join(CONFIG_FILE_NAME).is_file() {
            return Some(current);
        }
        if !current.pop() {
            return None;
        }
    }
}

/// Locates the configuration file named by `--config`, or the nearest
/// `kestrel.toml` above the current directory.
///
/// `--config` may name the file itself or the directory holding it.
/// Returns `None` when no configuration file applies.
pub fn resolve_config_path(global: &GlobalArgs) -> Result<Option<PathBuf>, Box<dyn std::error::Error>> {
    match &global.config {
        Some(config_path) => {
            let p = PathBuf::from(config_path);
            let file = if p.is_dir() { p.join(CONFIG_FILE_NAME) } else { p };
            if file.is_file() {
                Ok(Some(file))
            } else {
                Err(format!("configuration file not found: {}", file.display()).into())
            }
        }
        None => Ok(find_project_root(&std::env::current_dir()?)
            .map(|root| root.join(CONFIG_FILE_NAME))),
    }
}

/// Loads the project configuration, returning defaults when there is no file.
///
/// Relative paths in the `[simulation]` table are resolved against the
/// directory holding the file.
pub fn load_project_config(global: &GlobalArgs) -> Result<ProjectConfig, Box<dyn std::error::Error>> {
    let Some(path) = resolve_config_path(global)? else {
        return Ok(ProjectConfig::default());
    };
    let content = std::fs::read_to_string(&path)?;
    let mut config = load_config_from_str(&content)?;

    let base = path.parent().unwrap_or(Path::new("."));
    let sim = &mut config.simulation;
    for p in [&mut sim.input_vectors, &mut sim.expected_outputs, &mut sim.mif_dir]
        .into_iter()
        .flatten()
    {
        *p = base.join(&*p);
    }
    sim.output_dir = base.join(&sim.output_dir);
    Ok(config)
}

/// Reads a JSON netlist and checks its internal references.
pub fn load_netlist(path: &Path) -> Result<Netlist, Box<dyn std::error::Error>> {
    let file = File::open(path).map_err(|e| format!("cannot open netlist {}: {e}", path.display()))?;
    let netlist: Netlist = serde_json::from_reader(BufReader::new(file))
        .map_err(|e| format!("invalid netlist {}: {e}", path.display()))?;
    netlist.check_references()?;
    Ok(netlist)
}

/// Renders every collected diagnostic to stderr and returns the count.
///
/// With `quiet`, only errors are shown.
pub fn render_diagnostics(sink: &DiagnosticSink, color: bool, quiet: bool) -> usize {
    let diagnostics = sink.take_all();
    let renderer = TerminalRenderer::new(color);
    let mut shown = 0;
    for diag in diagnostics.iter().filter(|d| !quiet || d.severity.is_error()) {
        eprintln!("{}", renderer.render(diag));
        shown += 1;
    }
    shown
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn global(config: Option<&Path>) -> GlobalArgs {
        GlobalArgs {
            quiet: false,
            verbose: false,
            color: false,
            config: config.map(|p| p.to_str().unwrap().to_string()),
        }
    }

    #[test]
    fn find_project_root_in_parent() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join(CONFIG_FILE_NAME), "").unwrap();
        let nested = tmp.path().join("a").join("b");
        fs::create_dir_all(&nested).unwrap();
        assert_eq!(find_project_root(&nested).unwrap(), tmp.path());
    }

    #[test]
    fn config_dir_resolves_to_file() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join(CONFIG_FILE_NAME), "").unwrap();
        let path = resolve_config_path(&global(Some(tmp.path()))).unwrap();
        assert_eq!(path.unwrap(), tmp.path().join(CONFIG_FILE_NAME));
    }

    #[test]
    fn missing_config_file_is_an_error() {
        let tmp = TempDir::new().unwrap();
        let missing = tmp.path().join("other.toml");
        assert!(resolve_config_path(&global(Some(&missing))).is_err());
    }

    #[test]
    fn config_paths_are_relative_to_the_file() {
        let tmp = TempDir::new().unwrap();
        let file = tmp.path().join(CONFIG_FILE_NAME);
        fs::write(
            &file,
            "[simulation]\ninput_vectors = \"stim/in.vec\"\noutput_dir = \"out\"\n",
        )
        .unwrap();
        let config = load_project_config(&global(Some(&file))).unwrap();
        assert_eq!(
            config.simulation.input_vectors.unwrap(),
            tmp.path().join("stim/in.vec")
        );
        assert_eq!(config.simulation.output_dir, tmp.path().join("out"));
    }

    #[test]
    fn load_netlist_rejects_bad_json() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("top.json");
        fs::write(&path, "{ not json").unwrap();
        let err = load_netlist(&path).unwrap_err();
        assert!(err.to_string().starts_with("invalid netlist"));
    }

    #[test]
    fn load_netlist_reads_builder_output() {
        let mut b = kestrel_netlist::NetlistBuilder::new();
        let a = b.add_top_input("top^a");
        let y = b.add_top_output("top^y");
        b.connect(b.output_pin(a, 0), b.input_pin(y, 0));
        let nl = b.build();

        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("top.json");
        fs::write(&path, serde_json::to_string(&nl).unwrap()).unwrap();
        let loaded = load_netlist(&path).unwrap();
        assert_eq!(loaded.stats(), nl.stats());
    }
}
