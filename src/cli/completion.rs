//! Completion tree for the tabhook binary itself
//!
//! Unless the configuration supplies a `[tree]` table, the binary completes
//! its own subcommands. The tree is derived from the clap definition so it
//! follows the argument structure without a second listing.

use clap::{Command, CommandFactory};
use std::path::PathBuf;

use crate::cli::CliArgs;
use crate::completion::{CompletionTree, Reply, TreeNode};
use crate::config::Config;
use crate::error::Result;

/// Build the tree used to answer completion requests
///
/// # Arguments
/// * `config` - Loaded configuration
///
/// # Returns
/// * `Result<CompletionTree>` - The configured tree, or the built-in one
pub fn completion_tree(config: &Config) -> Result<CompletionTree> {
    match &config.tree {
        Some(table) => CompletionTree::from_toml(table),
        None => Ok(builtin_tree()),
    }
}

/// Tree of the binary's own subcommands
pub fn builtin_tree() -> CompletionTree {
    command_tree(&CliArgs::command()).producer("strip", || {
        let mut words: Vec<String> = rc_files()
            .into_iter()
            .filter(|path| path.exists())
            .map(|path| path.display().to_string())
            .collect();
        words.push("--in-place".to_string());
        Reply::Candidates(words)
    })
}

/// Map a clap command to a tree
///
/// Subcommands with their own subcommands become nested levels. Other
/// subcommands become a level keyed by their long flags.
pub fn command_tree(command: &Command) -> CompletionTree {
    let mut tree = CompletionTree::new();
    for subcommand in command.get_subcommands() {
        let node = if subcommand.has_subcommands() {
            TreeNode::Subtree(command_tree(subcommand))
        } else {
            let flags = subcommand
                .get_arguments()
                .filter_map(|arg| arg.get_long())
                .fold(CompletionTree::new(), |flags, long| {
                    flags.leaf(format!("--{long}"), Vec::<String>::new())
                });
            TreeNode::Subtree(flags)
        };
        tree.insert(subcommand.get_name(), node);
    }
    tree
}

/// Shell rc files a hook is usually installed into
pub fn rc_files() -> Vec<PathBuf> {
    let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
    let fish = dirs::config_dir()
        .unwrap_or_else(|| home.join(".config"))
        .join("fish")
        .join("config.fish");

    vec![home.join(".bashrc"), home.join(".zshrc"), fish]
}
