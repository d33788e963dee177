use std::collections::BTreeSet;

/// What the compiler-command parser and dependency scanner hand over: the
/// argv to run remotely (with paths rewritten relative to the project
/// root), whether it was recognized as a compile at all, and the input and
/// output paths it touches. How these are obtained (parsing `-M` output,
/// reading a depfile, explicit flags) is entirely the caller's business.
#[derive(Debug, Clone, Default)]
pub struct ParsedCommand {
    /// The command to execute, first element being the program.
    pub arguments: Vec<String>,
    /// Whether the parser recognized this as a compiler invocation.
    /// Unrecognized commands run locally unless remoting is forced.
    pub is_compiler_command: bool,
    /// Input files the command reads, relative to the working directory
    /// (absolute paths are taken as-is).
    pub input_paths: BTreeSet<String>,
    /// Files the command produces, relative to the working directory.
    pub output_paths: BTreeSet<String>,
}
