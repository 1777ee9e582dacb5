mod output;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use flux_core::{Algorithm, CommitDiff, Hash, ObjectEnvelope, ObjectType, Repository};
use output::{
    AddOutput, CatOutput, CommitInfo, CommitOutput, DiffOutput, FileDiffInfo, InitOutput,
    LogOutput, OutputWriter, ShowOutput, StatusOutput, codes,
};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

/// Flux - a minimal content-addressed version control engine
#[derive(Parser)]
#[command(name = "flux")]
#[command(about = "Minimal content-addressed version control", long_about = None)]
#[command(version)]
struct Cli {
    /// Working directory of the repository (defaults to FLUX_ROOT env var, else
    /// discovered from the current directory)
    #[arg(short = 'C', long = "repo", global = true)]
    repo: Option<PathBuf>,

    /// Output results as JSON
    #[arg(long, global = true)]
    json: bool,

    /// When to color output
    #[arg(long, global = true, value_enum, default_value_t = ColorChoice::Auto)]
    color: ColorChoice,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ColorChoice {
    Auto,
    Always,
    Never,
}

impl ColorChoice {
    fn enabled(self) -> bool {
        match self {
            ColorChoice::Always => true,
            ColorChoice::Never => false,
            ColorChoice::Auto => atty::is(atty::Stream::Stdout),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum AlgoChoice {
    Sha1,
    #[value(name = "blake3-160", alias = "blake3")]
    Blake3,
}

impl From<AlgoChoice> for Algorithm {
    fn from(choice: AlgoChoice) -> Self {
        match choice {
            AlgoChoice::Sha1 => Algorithm::Sha1,
            AlgoChoice::Blake3 => Algorithm::Blake3,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize a repository (safe to re-run)
    Init {
        /// Hash algorithm to use
        #[arg(long, value_enum, default_value_t = AlgoChoice::Sha1)]
        algo: AlgoChoice,
    },

    /// Stage files or directories
    Add {
        /// Paths to add
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },

    /// Record the staged files as a new commit
    Commit {
        /// Commit message
        message: String,
    },

    /// List commits from head back to the first commit
    Log {
        /// Show at most this many commits
        #[arg(short = 'n', long)]
        limit: Option<usize>,
    },

    /// Show a commit's changes against its parent
    Show {
        /// Commit hash, or HEAD
        commit: String,
    },

    /// List staged entries
    Status,

    /// Output blob content to stdout
    Cat {
        /// Hash of the blob
        hash: String,
    },

    /// Diff a working file against its content at head
    Diff {
        /// File to diff
        path: PathBuf,
    },
}

fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();

    let out = OutputWriter::new(cli.json, cli.color.enabled());

    // Repository location: CLI arg > FLUX_ROOT env var > discovery from cwd
    let root = cli
        .repo
        .or_else(|| std::env::var("FLUX_ROOT").ok().map(PathBuf::from));

    let result = match cli.command {
        Commands::Init { algo } => cmd_init(&out, root.as_deref(), algo.into()),
        Commands::Add { paths } => cmd_add(&out, root.as_deref(), paths),
        Commands::Commit { message } => cmd_commit(&out, root.as_deref(), &message),
        Commands::Log { limit } => cmd_log(&out, root.as_deref(), limit),
        Commands::Show { commit } => cmd_show(&out, root.as_deref(), &commit),
        Commands::Status => cmd_status(&out, root.as_deref()),
        Commands::Cat { hash } => cmd_cat(&out, root.as_deref(), &hash),
        Commands::Diff { path } => cmd_diff(&out, root.as_deref(), &path),
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(err) => {
            let code = codes::for_error(&err);
            out.write_error(&err, code);
            ExitCode::from(code)
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("error"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn open_repo(root: Option<&Path>) -> Result<Repository> {
    match root {
        Some(root) => Repository::open(root)
            .with_context(|| format!("Failed to open repository at {}", root.display())),
        None => {
            let cwd = std::env::current_dir()?;
            Repository::discover(&cwd)
                .with_context(|| format!("Not inside a flux repository: {}", cwd.display()))
        }
    }
}

/// Paths are relative to the repository when one is named explicitly,
/// otherwise to the current directory.
fn user_path(root: Option<&Path>, path: &Path) -> Result<PathBuf> {
    if root.is_some() || path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        Ok(std::env::current_dir()?.join(path))
    }
}

fn parse_hash(hash_str: &str) -> Result<Hash> {
    Hash::from_hex(&hash_str.to_ascii_lowercase())
        .with_context(|| format!("Invalid hash: {}", hash_str))
}

fn cmd_init(out: &OutputWriter, root: Option<&Path>, algorithm: Algorithm) -> Result<u8> {
    let workdir = match root {
        Some(root) => root.to_path_buf(),
        None => std::env::current_dir()?,
    };

    let existed = Repository::exists(&workdir);
    let repo = Repository::init(&workdir, algorithm)
        .with_context(|| format!("Failed to initialize repository at {}", workdir.display()))?;

    let data = InitOutput {
        success: true,
        result_code: codes::SUCCESS,
        root: repo.repo_dir().display().to_string(),
        algorithm: repo.algorithm().as_str().to_string(),
        reinitialized: existed,
    };

    out.write(&data, || {
        if existed {
            format!(
                "Reinitialized existing flux repository in {}\n",
                repo.repo_dir().display()
            )
        } else {
            format!(
                "Initialized empty flux repository in {}\nAlgorithm: {}\n",
                repo.repo_dir().display(),
                repo.algorithm().as_str()
            )
        }
    })?;

    Ok(codes::SUCCESS)
}

fn cmd_add(out: &OutputWriter, root: Option<&Path>, paths: Vec<PathBuf>) -> Result<u8> {
    let repo = open_repo(root)?;

    let mut entries = Vec::new();
    for path in paths {
        let target = user_path(root, &path)?;
        let added = repo
            .add(&target)
            .with_context(|| format!("Failed to add path: {}", path.display()))?;
        entries.extend(added);
    }

    let data = AddOutput {
        success: true,
        result_code: codes::SUCCESS,
        entries,
    };

    out.write(&data, || {
        data.entries
            .iter()
            .map(|e| format!("{} {}\n", e.hash, e.path))
            .collect()
    })?;

    Ok(codes::SUCCESS)
}

fn cmd_commit(out: &OutputWriter, root: Option<&Path>, message: &str) -> Result<u8> {
    let repo = open_repo(root)?;

    let files = repo.status()?.len();
    let hash = repo
        .commit(message)
        .with_context(|| "Failed to create commit")?;
    let commit = repo.find_commit(&hash)?;

    let data = CommitOutput {
        success: true,
        result_code: codes::SUCCESS,
        hash,
        parent: commit.parent,
        message: commit.message.clone(),
        files,
    };

    out.write(&data, || {
        let root_marker = if commit.is_root() { " (root-commit)" } else { "" };
        format!(
            "[{}{}] {}\n {} file(s) committed\n",
            hash.short(),
            root_marker,
            commit.message,
            files
        )
    })?;

    Ok(codes::SUCCESS)
}

fn cmd_log(out: &OutputWriter, root: Option<&Path>, limit: Option<usize>) -> Result<u8> {
    let repo = open_repo(root)?;

    let mut commits = Vec::new();
    let mut error = None;
    for item in repo.log()?.take(limit.unwrap_or(usize::MAX)) {
        match item {
            Ok((hash, commit)) => commits.push(CommitInfo::new(hash, &commit)),
            Err(err) => {
                error = Some(err);
                break;
            }
        }
    }

    let result_code = if error.is_some() {
        codes::CORRUPT
    } else {
        codes::SUCCESS
    };

    let data = LogOutput {
        success: error.is_none(),
        result_code,
        commits,
        error: error.as_ref().map(|e| e.to_string()),
    };

    out.write(&data, || {
        let mut text = String::new();
        for info in &data.commits {
            text.push_str(&format!(
                "commit {}\nDate:   {}\n\n    {}\n\n",
                out.hash(&info.hash),
                info.timestamp.format("%a %b %e %H:%M:%S %Y %z"),
                info.message
            ));
        }
        text
    })?;

    if let Some(err) = error {
        out.warn(format!("history is incomplete: {}", err));
    }

    Ok(result_code)
}

fn cmd_show(out: &OutputWriter, root: Option<&Path>, rev: &str) -> Result<u8> {
    let repo = open_repo(root)?;

    let hash = repo
        .resolve(rev)
        .with_context(|| format!("Invalid commit: {}", rev))?;
    let diff = repo
        .show(&hash)
        .with_context(|| format!("Failed to show commit {}", rev))?;

    let failed = diff.failures().count();
    let result_code = if failed > 0 {
        codes::CORRUPT
    } else {
        codes::SUCCESS
    };

    let data = match &diff {
        CommitDiff::FirstCommit { commit } => ShowOutput {
            success: true,
            result_code,
            commit: *commit,
            parent: None,
            first_commit: true,
            files: Vec::new(),
        },
        CommitDiff::Changes {
            commit,
            parent,
            files,
        } => ShowOutput {
            success: failed == 0,
            result_code,
            commit: *commit,
            parent: Some(*parent),
            first_commit: false,
            files: files.iter().map(FileDiffInfo::from).collect(),
        },
    };

    out.write(&data, || match &diff {
        CommitDiff::FirstCommit { commit } => format!(
            "commit {}\nFirst commit, nothing to diff\n",
            out.hash(commit)
        ),
        CommitDiff::Changes {
            commit,
            parent,
            files,
        } => {
            let mut text = format!("commit {}\nparent {}\n\n", out.hash(commit), parent);
            for file in files {
                text.push_str(&out.render_file_diff(file));
            }
            text
        }
    })?;

    for file in diff.failures() {
        if let flux_core::FileChange::Failed { error } = &file.change {
            out.warn(format!("could not diff {}: {}", file.path, error));
        }
    }

    Ok(result_code)
}

fn cmd_status(out: &OutputWriter, root: Option<&Path>) -> Result<u8> {
    let repo = open_repo(root)?;

    let data = StatusOutput {
        success: true,
        result_code: codes::SUCCESS,
        head: repo.head()?,
        staged: repo.status()?,
    };

    out.write(&data, || {
        let mut text = match &data.head {
            Some(head) => format!("On commit {}\n", head.short()),
            None => "No commits yet\n".to_string(),
        };
        if data.staged.is_empty() {
            text.push_str("Nothing staged\n");
        } else {
            text.push_str("Staged:\n");
            for entry in &data.staged {
                text.push_str(&format!("  {}  {}\n", entry.hash.short(), entry.path));
            }
        }
        text
    })?;

    Ok(codes::SUCCESS)
}

fn cmd_cat(out: &OutputWriter, root: Option<&Path>, hash_str: &str) -> Result<u8> {
    let repo = open_repo(root)?;
    let hash = parse_hash(hash_str)?;

    let data = repo
        .cat(&hash)
        .with_context(|| format!("Failed to output blob {}", hash))?;

    if out.is_json() {
        let envelope = ObjectEnvelope::new(ObjectType::Blob, &data);
        let output = CatOutput {
            success: true,
            result_code: codes::SUCCESS,
            hash,
            size: data.len(),
            encoding: envelope.encoding,
            content: envelope.content,
        };
        out.write(&output, String::new)?;
    } else {
        out.write_raw(&data)?;
    }

    Ok(codes::SUCCESS)
}

fn cmd_diff(out: &OutputWriter, root: Option<&Path>, path: &Path) -> Result<u8> {
    let repo = open_repo(root)?;
    let target = user_path(root, path)?;

    let file = repo
        .diff_working(&target)
        .with_context(|| format!("Failed to diff {}", path.display()))?;

    let data = DiffOutput {
        success: true,
        result_code: codes::SUCCESS,
        file: FileDiffInfo::from(&file),
    };

    out.write(&data, || out.render_file_diff(&file))?;

    Ok(codes::SUCCESS)
}
