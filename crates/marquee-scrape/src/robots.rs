//! A small robots.txt parser and matcher.
//!
//! Group selection follows the product token of our user agent: groups naming
//! it apply, otherwise the `*` groups do. Within the chosen rules the longest
//! matching pattern decides, with `Allow` winning ties. Patterns support `*`
//! wildcards and a trailing `$` anchor.

#[derive(Debug, Clone, PartialEq, Eq)]
struct Rule {
  allow:   bool,
  pattern: String,
}

#[derive(Debug, Clone, Default)]
struct Group {
  agents: Vec<String>,
  rules:  Vec<Rule>,
}

/// A parsed robots.txt file.
#[derive(Debug, Clone, Default)]
pub struct RobotsTxt {
  groups: Vec<Group>,
}

impl RobotsTxt {
  /// Permits everything. Used when robots.txt is missing or unreadable.
  pub fn allow_all() -> Self { Self::default() }

  /// Forbids everything. Used when robots.txt itself is access-controlled.
  pub fn disallow_all() -> Self {
    Self {
      groups: vec![Group {
        agents: vec!["*".into()],
        rules:  vec![Rule { allow: false, pattern: "/".into() }],
      }],
    }
  }

  pub fn parse(body: &str) -> Self {
    let mut groups: Vec<Group> = Vec::new();
    // A user-agent line after rules opens a new group.
    let mut in_rules = true;

    for line in body.lines() {
      let line = line.split('#').next().unwrap_or_default().trim();
      let Some((key, value)) = line.split_once(':') else {
        continue;
      };
      let key = key.trim().to_ascii_lowercase();
      let value = value.trim();

      match key.as_str() {
        "user-agent" => {
          if in_rules || groups.is_empty() {
            groups.push(Group::default());
            in_rules = false;
          }
          if let Some(group) = groups.last_mut() {
            group.agents.push(value.to_ascii_lowercase());
          }
        }
        "allow" | "disallow" => {
          in_rules = true;
          // An empty Disallow allows everything; it adds no rule.
          if value.is_empty() {
            continue;
          }
          if let Some(group) = groups.last_mut() {
            group.rules.push(Rule {
              allow:   key == "allow",
              pattern: value.to_owned(),
            });
          }
        }
        _ => {}
      }
    }

    Self { groups }
  }

  /// Whether `user_agent` may fetch `path` (path plus optional query).
  pub fn is_allowed(&self, user_agent: &str, path: &str) -> bool {
    let token = product_token(user_agent);

    let specific: Vec<&Group> = self
      .groups
      .iter()
      .filter(|g| g.agents.iter().any(|a| a != "*" && token.starts_with(a.as_str())))
      .collect();
    let chosen = if specific.is_empty() {
      self
        .groups
        .iter()
        .filter(|g| g.agents.iter().any(|a| a == "*"))
        .collect()
    } else {
      specific
    };

    let best = chosen
      .iter()
      .flat_map(|g| g.rules.iter())
      .filter(|r| pattern_matches(&r.pattern, path))
      .max_by(|a, b| {
        a.pattern
          .len()
          .cmp(&b.pattern.len())
          .then(a.allow.cmp(&b.allow))
      });

    best.is_none_or(|r| r.allow)
  }
}

/// `"MarqueeBot/1.0 (+https://…)"` → `"marqueebot"`.
fn product_token(user_agent: &str) -> String {
  user_agent
    .split(['/', ' '])
    .next()
    .unwrap_or_default()
    .to_ascii_lowercase()
}

fn pattern_matches(pattern: &str, path: &str) -> bool {
  let (pattern, anchored) = match pattern.strip_suffix('$') {
    Some(p) => (p, true),
    None => (pattern, false),
  };

  let parts: Vec<&str> = pattern.split('*').collect();
  let Some(mut rest) = path.strip_prefix(parts[0]) else {
    return false;
  };
  if parts.len() == 1 {
    return !anchored || rest.is_empty();
  }

  let last = parts.len() - 1;
  for part in &parts[1..last] {
    match rest.find(part) {
      Some(i) => rest = &rest[i + part.len()..],
      None => return false,
    }
  }

  let tail = parts[last];
  if anchored { rest.ends_with(tail) } else { rest.contains(tail) }
}

#[cfg(test)]
mod tests {
  use super::*;

  const UA: &str = "MarqueeBot/1.0 (+https://example.com)";

  #[test]
  fn empty_file_allows_everything() {
    let robots = RobotsTxt::parse("");
    assert!(robots.is_allowed(UA, "/anything"));
  }

  #[test]
  fn wildcard_group_applies_when_no_specific_group() {
    let robots = RobotsTxt::parse(
      "User-agent: *\nDisallow: /private\n\nUser-agent: OtherBot\nDisallow: /",
    );
    assert!(!robots.is_allowed(UA, "/private/page"));
    assert!(robots.is_allowed(UA, "/events"));
  }

  #[test]
  fn specific_group_overrides_wildcard() {
    let robots = RobotsTxt::parse(
      "User-agent: *\nDisallow: /\n\nUser-agent: marqueebot\nDisallow: /admin",
    );
    assert!(robots.is_allowed(UA, "/events"));
    assert!(!robots.is_allowed(UA, "/admin"));
  }

  #[test]
  fn consecutive_agents_share_a_group() {
    let robots = RobotsTxt::parse("User-agent: a\nUser-agent: MarqueeBot\nDisallow: /x");
    assert!(!robots.is_allowed(UA, "/x"));
  }

  #[test]
  fn longest_match_wins_and_allow_wins_ties() {
    let robots = RobotsTxt::parse(
      "User-agent: *\nDisallow: /events\nAllow: /events/public\nDisallow: /tie\nAllow: /tie",
    );
    assert!(!robots.is_allowed(UA, "/events/secret"));
    assert!(robots.is_allowed(UA, "/events/public/1"));
    assert!(robots.is_allowed(UA, "/tie"));
  }

  #[test]
  fn wildcards_and_anchors() {
    let robots = RobotsTxt::parse("User-agent: *\nDisallow: /*.pdf$\nDisallow: /search*q=");
    assert!(!robots.is_allowed(UA, "/files/a.pdf"));
    assert!(robots.is_allowed(UA, "/files/a.pdf.html"));
    assert!(!robots.is_allowed(UA, "/search?q=Sydney"));
    assert!(robots.is_allowed(UA, "/search"));
  }

  #[test]
  fn empty_disallow_and_comments() {
    let robots = RobotsTxt::parse("# hello\nUser-agent: * # everyone\nDisallow:\n");
    assert!(robots.is_allowed(UA, "/"));
  }

  #[test]
  fn blanket_policies() {
    assert!(RobotsTxt::allow_all().is_allowed(UA, "/"));
    assert!(!RobotsTxt::disallow_all().is_allowed(UA, "/"));
    assert!(!RobotsTxt::disallow_all().is_allowed(UA, "/events?q=1"));
  }
}
