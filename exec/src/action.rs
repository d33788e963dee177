//! Assembles the Command and Action protos for one parsed command,
//! Merkleizing its inputs along the way.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::{Path, PathBuf};

use bytes::Bytes;
use prost::Message;
use tracing::debug;

use offload_castore::merkle::NestedDirectory;
use offload_castore::{compute_message, proto, Error, FileData, InputFile};

use crate::command::ParsedCommand;
use crate::paths;

/// The environment-derived knobs the action builder consumes; loaded by
/// the caller, read-only here.
#[derive(Debug, Default, Clone)]
pub struct ActionOptions {
    /// Execute remotely even when the command was not recognized as a
    /// compile. Non-compile commands then never fall back to local runs.
    pub force_remote: bool,
    /// Mark the action as never cacheable.
    pub do_not_cache: bool,
    /// Merkleize this directory tree instead of the parsed dependencies.
    pub deps_directory: Option<PathBuf>,
    /// Request these output files instead of the parsed ones.
    pub output_files: BTreeSet<String>,
    /// Request these output directories.
    pub output_directories: BTreeSet<String>,
    /// Environment variables for the remote command.
    pub remote_env: BTreeMap<String, String>,
    /// Platform properties the scheduler matches workers against.
    pub platform: BTreeMap<String, String>,
}

/// An action ready for upload and execution.
#[derive(Debug)]
pub struct BuiltAction {
    pub action_digest: proto::Digest,
    /// Serialized protos by digest: every input Directory, the Command and
    /// the Action itself.
    pub blobs: HashMap<proto::Digest, Bytes>,
    /// Input file contents by digest, inline or path-backed.
    pub files: HashMap<proto::Digest, FileData>,
}

/// Builds the Action describing `command` run in `cwd`.
///
/// Returns `Ok(None)` when the command should run locally instead: it was
/// not recognized as a compile (and remoting is not forced), or it writes
/// outputs outside the directory tree we can mirror remotely.
pub fn build_action(
    command: &ParsedCommand,
    cwd: &Path,
    options: &ActionOptions,
) -> Result<Option<BuiltAction>, Error> {
    if !command.is_compiler_command && !options.force_remote {
        debug!("not a compiler command, running locally");
        return Ok(None);
    }

    let products: BTreeSet<String> =
        if options.output_files.is_empty() && options.output_directories.is_empty() {
            command.output_paths.clone()
        } else {
            options.output_files.clone()
        };

    // A command that writes outside the tree rooted at the working
    // directory cannot have its outputs mirrored back.
    if let Some(absolute) = products.iter().find(|p| p.starts_with('/')) {
        debug!(
            product = %absolute,
            "command produces a file outside the project tree, running locally"
        );
        return Ok(None);
    }

    let mut working_directory = String::new();
    let mut nested;
    let mut files;

    match &options.deps_directory {
        Some(directory) => {
            debug!(directory = %directory.display(), "building input tree from directory override");
            (nested, files) = NestedDirectory::from_path(directory)?;
        }
        None => {
            nested = NestedDirectory::new();
            files = HashMap::new();

            // Deep enough a working directory that every ../ in the
            // dependency and product paths still lands inside the tree.
            let parents_needed = command
                .input_paths
                .iter()
                .chain(products.iter())
                .map(|p| paths::parent_directory_levels(p))
                .max()
                .unwrap_or(0);
            working_directory = paths::last_n_segments(
                cwd.to_str().ok_or_else(|| {
                    Error::Precondition(format!("working directory {:?} is not UTF-8", cwd))
                })?,
                parents_needed,
            )
            .ok_or_else(|| {
                Error::Precondition(format!(
                    "dependencies reach {} levels above the working directory {:?}",
                    parents_needed, cwd
                ))
            })?;

            for dep in &command.input_paths {
                let tree_path = if dep.starts_with('/') {
                    dep.clone()
                } else {
                    format!("{}/{}", working_directory, dep)
                };
                let tree_path = paths::normalize_path(&tree_path);

                let file = InputFile::open(cwd.join(dep))?;
                if let InputFile::Regular { digest, data, .. } = &file {
                    files.insert(digest.clone(), data.clone());
                }
                nested.add(&file, &tree_path)?;
            }
        }
    }

    if !working_directory.is_empty() {
        nested.add_directory(&working_directory)?;
    }

    let mut blobs = HashMap::new();
    let input_root_digest = nested.to_digest(&mut blobs);

    let command_proto = proto::Command {
        arguments: command.arguments.clone(),
        environment_variables: options
            .remote_env
            .iter()
            .map(|(name, value)| proto::command::EnvironmentVariable {
                name: name.clone(),
                value: value.clone(),
            })
            .collect(),
        output_files: products.into_iter().collect(),
        output_directories: options.output_directories.iter().cloned().collect(),
        platform: if options.platform.is_empty() {
            None
        } else {
            Some(proto::Platform {
                properties: options
                    .platform
                    .iter()
                    .map(|(name, value)| proto::platform::Property {
                        name: name.clone(),
                        value: value.clone(),
                    })
                    .collect(),
            })
        },
        working_directory,
    };

    let command_digest = compute_message(&command_proto);
    blobs.insert(command_digest.clone(), command_proto.encode_to_vec().into());

    let action = proto::Action {
        command_digest: Some(command_digest),
        input_root_digest: Some(input_root_digest),
        timeout: None,
        do_not_cache: options.do_not_cache,
    };
    let action_digest = compute_message(&action);
    blobs.insert(action_digest.clone(), action.encode_to_vec().into());

    debug!(action = %action_digest, "built action");
    Ok(Some(BuiltAction {
        action_digest,
        blobs,
        files,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use offload_castore::compute;

    fn parsed(arguments: &[&str], inputs: &[&str], outputs: &[&str]) -> ParsedCommand {
        ParsedCommand {
            arguments: arguments.iter().map(|s| s.to_string()).collect(),
            is_compiler_command: true,
            input_paths: inputs.iter().map(|s| s.to_string()).collect(),
            output_paths: outputs.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn decode_command(built: &BuiltAction) -> proto::Command {
        let action = proto::Action::decode(
            &built.blobs[&built.action_digest][..],
        )
        .unwrap();
        let command_digest = action.command_digest.unwrap();
        proto::Command::decode(&built.blobs[&command_digest][..]).unwrap()
    }

    #[test]
    fn non_compiler_commands_run_locally() {
        let command = ParsedCommand {
            arguments: vec!["ls".into()],
            ..Default::default()
        };
        let built = build_action(&command, Path::new("/tmp"), &ActionOptions::default()).unwrap();
        assert!(built.is_none());
    }

    #[test]
    fn force_remote_overrides_the_parser() {
        let dir = tempfile::tempdir().unwrap();
        let command = ParsedCommand {
            arguments: vec!["ls".into()],
            ..Default::default()
        };
        let options = ActionOptions {
            force_remote: true,
            ..Default::default()
        };
        let built = build_action(&command, dir.path(), &options).unwrap();
        assert!(built.is_some());
    }

    #[test]
    fn absolute_products_run_locally() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("main.c"), b"x").unwrap();
        let command = parsed(
            &["cc", "-c", "main.c", "-o", "/tmp/out.o"],
            &["main.c"],
            &["/tmp/out.o"],
        );
        let built = build_action(&command, dir.path(), &ActionOptions::default()).unwrap();
        assert!(built.is_none());
    }

    #[test]
    fn simple_compile() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("main.c"), b"int main;").unwrap();

        let command = parsed(&["cc", "-c", "main.c", "-o", "main.o"], &["main.c"], &["main.o"]);
        let options = ActionOptions {
            remote_env: [("PATH".to_string(), "/usr/bin".to_string())].into(),
            platform: [("ISA".to_string(), "x86-64".to_string())].into(),
            ..Default::default()
        };
        let built = build_action(&command, dir.path(), &options)
            .unwrap()
            .expect("command is remote-eligible");

        // input file contents are offered for upload
        assert!(built.files.contains_key(&compute(b"int main;")));

        let command_proto = decode_command(&built);
        assert_eq!(command_proto.arguments, vec!["cc", "-c", "main.c", "-o", "main.o"]);
        assert_eq!(command_proto.output_files, vec!["main.o"]);
        assert_eq!(command_proto.working_directory, "");
        assert_eq!(command_proto.environment_variables.len(), 1);
        assert_eq!(command_proto.environment_variables[0].name, "PATH");
        let platform = command_proto.platform.unwrap();
        assert_eq!(platform.properties[0].name, "ISA");

        // the root Directory blob holds the single input file
        let action = proto::Action::decode(&built.blobs[&built.action_digest][..]).unwrap();
        let root_digest = action.input_root_digest.unwrap();
        let root = proto::Directory::decode(&built.blobs[&root_digest][..]).unwrap();
        assert_eq!(root.files.len(), 1);
        assert_eq!(root.files[0].name, "main.c");
    }

    #[test]
    fn action_digest_is_deterministic() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("main.c"), b"x").unwrap();
        let command = parsed(&["cc", "-c", "main.c"], &["main.c"], &["main.o"]);

        let first = build_action(&command, dir.path(), &ActionOptions::default())
            .unwrap()
            .unwrap();
        let second = build_action(&command, dir.path(), &ActionOptions::default())
            .unwrap()
            .unwrap();
        assert_eq!(first.action_digest, second.action_digest);
    }

    #[test]
    fn parent_relative_deps_get_a_working_directory() {
        let root = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(root.path().join("build")).unwrap();
        std::fs::create_dir_all(root.path().join("include")).unwrap();
        std::fs::write(root.path().join("include/x.h"), b"#define X").unwrap();

        let cwd = root.path().join("build");
        let command = parsed(&["cc", "-c", "../include/x.h"], &["../include/x.h"], &["x.o"]);
        let built = build_action(&command, &cwd, &ActionOptions::default())
            .unwrap()
            .unwrap();

        let command_proto = decode_command(&built);
        assert_eq!(command_proto.working_directory, "build");

        // the tree has include/x.h next to the working directory
        let action = proto::Action::decode(&built.blobs[&built.action_digest][..]).unwrap();
        let root_dir =
            proto::Directory::decode(&built.blobs[&action.input_root_digest.unwrap()][..])
                .unwrap();
        let names: Vec<_> = root_dir
            .directories
            .iter()
            .map(|d| d.name.as_str())
            .collect();
        assert_eq!(names, vec!["build", "include"]);
    }

    #[test]
    fn deps_directory_override() {
        let deps = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(deps.path().join("src")).unwrap();
        std::fs::write(deps.path().join("src/a.c"), b"a").unwrap();

        let command = parsed(&["cc", "-c", "src/a.c"], &[], &["a.o"]);
        let options = ActionOptions {
            deps_directory: Some(deps.path().to_path_buf()),
            ..Default::default()
        };
        let built = build_action(&command, Path::new("/nonexistent"), &options)
            .unwrap()
            .unwrap();

        assert!(built.files.contains_key(&compute(b"a")));
        let command_proto = decode_command(&built);
        assert_eq!(command_proto.working_directory, "");
    }

    #[test]
    fn output_file_override_replaces_parsed_products() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("main.c"), b"x").unwrap();
        let command = parsed(&["cc", "-c", "main.c"], &["main.c"], &["guessed.o"]);
        let options = ActionOptions {
            output_files: ["real.o".to_string()].into(),
            ..Default::default()
        };
        let built = build_action(&command, dir.path(), &options).unwrap().unwrap();
        assert_eq!(decode_command(&built).output_files, vec!["real.o"]);
    }
}
