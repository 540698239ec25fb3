//! Split raw arguments into the ones a command recognises and the leftovers.
//!
//! clap rejects unknown arguments. Resolution needs two things it does not
//! offer directly: a first pass that looks only at `--conf_file`, and a final
//! pass that hands unrecognised arguments back to the caller instead of
//! failing. Both are done by partitioning the argument list against the
//! command's declared flags before clap sees it.
//!
//! Recognised forms: `--long`, `--long=value`, `--long value`, `-s`, `-svalue`,
//! `-s value`, clustered short flags (`-ab`), positionals (only when the command
//! declares any), subcommands (everything after one is passed through), and
//! `--`. A token is left over when any part of it is unknown. The value of an
//! unknown option cannot be told apart from a positional, so it is judged on
//! its own.

use std::collections::{HashMap, HashSet};

use clap::{Arg, Command};

#[derive(Debug, Clone, Copy, PartialEq)]
enum Arity {
    Flag,
    /// Takes between `min` and `max` values.
    Values { min: usize, max: usize },
}

fn arity(arg: &Arg) -> Arity {
    if !arg.get_action().takes_values() {
        return Arity::Flag;
    }
    match arg.get_num_args() {
        Some(range) => Arity::Values {
            min: range.min_values(),
            max: range.max_values(),
        },
        None => Arity::Values { min: 1, max: 1 },
    }
}

struct KnownArgs {
    longs: HashMap<String, Arity>,
    shorts: HashMap<char, Arity>,
    positionals: bool,
    subcommands: HashSet<String>,
}

impl KnownArgs {
    fn from_command(command: &Command) -> Self {
        let mut known = KnownArgs {
            longs: HashMap::new(),
            shorts: HashMap::new(),
            positionals: false,
            subcommands: HashSet::new(),
        };

        for arg in command.get_arguments() {
            if arg.is_positional() {
                known.positionals = true;
                continue;
            }
            let a = arity(arg);
            if let Some(long) = arg.get_long() {
                known.longs.insert(long.to_string(), a);
            }
            for alias in arg.get_all_aliases().unwrap_or_default() {
                known.longs.insert(alias.to_string(), a);
            }
            if let Some(short) = arg.get_short() {
                known.shorts.insert(short, a);
            }
            for alias in arg.get_all_short_aliases().unwrap_or_default() {
                known.shorts.insert(alias, a);
            }
        }

        for sub in command.get_subcommands() {
            known.subcommands.insert(sub.get_name().to_string());
            known
                .subcommands
                .extend(sub.get_all_aliases().map(str::to_string));
        }

        known
    }

    /// Number of tokens from `rest` an option of `arity` consumes.
    ///
    /// Required values are taken whatever they look like; optional ones stop
    /// at the next token starting with `-`.
    fn consumes(arity: Arity, rest: &[String]) -> usize {
        let Arity::Values { min, max } = arity else {
            return 0;
        };
        let mut take = min.min(rest.len());
        while take < max && take < rest.len() && !rest[take].starts_with('-') {
            take += 1;
        }
        take
    }

    /// Check a short cluster like `-abc` or `-ofile`. Returns the arity of the
    /// last flag when it ends the cluster, or `None` if any flag is unknown.
    fn short_cluster(&self, cluster: &str) -> Option<Arity> {
        for (i, c) in cluster.char_indices() {
            let a = *self.shorts.get(&c)?;
            if a != Arity::Flag {
                let rest = &cluster[i + c.len_utf8()..];
                return Some(if rest.is_empty() { a } else { Arity::Flag });
            }
        }
        Some(Arity::Flag)
    }
}

/// Partition `args` (without the program name) into `(known, leftover)`.
///
/// The command is built first so generated arguments such as `--help` are
/// recognised.
pub fn split_known_args(command: &mut Command, args: &[String]) -> (Vec<String>, Vec<String>) {
    command.build();
    let known_args = KnownArgs::from_command(command);

    let mut known = Vec::new();
    let mut leftover = Vec::new();
    let mut i = 0;

    while i < args.len() {
        let token = &args[i];
        let rest = &args[i + 1..];

        if token == "--" {
            if known_args.positionals {
                known.extend(args[i..].iter().cloned());
            } else {
                leftover.extend(args[i + 1..].iter().cloned());
            }
            break;
        }

        if let Some(long) = token.strip_prefix("--") {
            let (name, inline_value) = match long.split_once('=') {
                Some((n, _)) => (n, true),
                None => (long, false),
            };
            match known_args.longs.get(name) {
                Some(&a) => {
                    let take = if inline_value { 0 } else { KnownArgs::consumes(a, rest) };
                    known.extend(args[i..=i + take].iter().cloned());
                    i += take;
                }
                None => leftover.push(token.clone()),
            }
        } else if let Some(cluster) = token.strip_prefix('-')
            && !cluster.is_empty()
        {
            match known_args.short_cluster(cluster) {
                Some(a) => {
                    let take = KnownArgs::consumes(a, rest);
                    known.extend(args[i..=i + take].iter().cloned());
                    i += take;
                }
                None => leftover.push(token.clone()),
            }
        } else if known_args.subcommands.contains(token.as_str()) {
            known.extend(args[i..].iter().cloned());
            break;
        } else if known_args.positionals {
            known.push(token.clone());
        } else {
            leftover.push(token.clone());
        }

        i += 1;
    }

    (known, leftover)
}
