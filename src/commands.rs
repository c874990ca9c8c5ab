/// Available commands and autocomplete logic

#[derive(Debug, Clone)]
pub struct Command {
  pub name: &'static str,
  pub aliases: &'static [&'static str],
  pub description: &'static str,
}

/// All available commands
pub const COMMANDS: &[Command] = &[
  Command {
    name: "incidents",
    aliases: &["i", "inc"],
    description: "Browse incidents",
  },
  Command {
    name: "incident",
    aliases: &["open"],
    description: "Open incident <id>",
  },
  Command {
    name: "documents",
    aliases: &["d", "docs", "doc"],
    description: "Tenant documents",
  },
  Command {
    name: "status",
    aliases: &["s", "health"],
    description: "Backend status",
  },
  Command {
    name: "reset",
    aliases: &["clear"],
    description: "Drop all cached data",
  },
  Command {
    name: "quit",
    aliases: &["q", "exit"],
    description: "Exit inc9s",
  },
];

/// A submitted command line split into the resolved command and its
/// argument text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
  pub name: String,
  pub args: String,
}

/// Split `line` on the first whitespace.
pub fn split_command(line: &str) -> (&str, &str) {
  let line = line.trim();
  match line.split_once(char::is_whitespace) {
    Some((name, args)) => (name, args.trim()),
    None => (line, ""),
  }
}

/// Get autocomplete suggestions for a given input. Only the command word
/// is matched; arguments are ignored.
pub fn get_suggestions(input: &str) -> Vec<&'static Command> {
  let (word, _) = split_command(input);
  let input_lower = word.to_lowercase();

  if input_lower.is_empty() {
    return COMMANDS.iter().collect();
  }

  let mut matches: Vec<(&Command, u32)> = Vec::new();

  for cmd in COMMANDS {
    // Exact match on name
    if cmd.name == input_lower {
      matches.push((cmd, 0)); // Highest priority
      continue;
    }

    // Exact match on alias
    if cmd.aliases.contains(&input_lower.as_str()) {
      matches.push((cmd, 1));
      continue;
    }

    // Prefix match on name
    if cmd.name.starts_with(&input_lower) {
      matches.push((cmd, 2));
      continue;
    }

    // Prefix match on alias
    if cmd.aliases.iter().any(|a| a.starts_with(&input_lower)) {
      matches.push((cmd, 3));
      continue;
    }

    // Fuzzy match (contains)
    if cmd.name.contains(&input_lower) {
      matches.push((cmd, 4));
      continue;
    }

    // Fuzzy match on alias
    if cmd.aliases.iter().any(|a| a.contains(&input_lower)) {
      matches.push((cmd, 5));
    }
  }

  // Sort by priority
  matches.sort_by_key(|(_, priority)| *priority);

  matches.into_iter().map(|(cmd, _)| cmd).collect()
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_empty_input_returns_all() {
    let suggestions = get_suggestions("");
    assert_eq!(suggestions.len(), COMMANDS.len());
  }

  #[test]
  fn test_exact_match() {
    let suggestions = get_suggestions("incident");
    assert_eq!(suggestions[0].name, "incident");
    assert_eq!(suggestions[1].name, "incidents");
  }

  #[test]
  fn test_alias_match() {
    assert_eq!(get_suggestions("i")[0].name, "incidents");
    assert_eq!(get_suggestions("docs")[0].name, "documents");
  }

  #[test]
  fn test_prefix_match() {
    let suggestions = get_suggestions("stat");
    assert_eq!(suggestions[0].name, "status");
  }

  #[test]
  fn test_fuzzy_match() {
    let suggestions = get_suggestions("ument");
    assert!(!suggestions.is_empty());
    assert_eq!(suggestions[0].name, "documents");
  }

  #[test]
  fn test_arguments_are_ignored_for_matching() {
    let suggestions = get_suggestions("open 42");
    assert_eq!(suggestions[0].name, "incident");
  }

  #[test]
  fn test_split_command() {
    assert_eq!(split_command("  incident   42 "), ("incident", "42"));
    assert_eq!(split_command("quit"), ("quit", ""));
    assert_eq!(split_command(""), ("", ""));
  }
}
