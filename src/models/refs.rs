//! Repository and issue/PR references as typed on the command line.

use std::fmt;

use serde::Serialize;

/// `owner/repo`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct RepoRef {
    pub owner: String,
    pub repo: String,
}

impl RepoRef {
    pub fn new(owner: impl Into<String>, repo: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            repo: repo.into(),
        }
    }

    /// Parse `https://host/owner/repo[/...]`, `owner/repo`, or `owner repo`.
    pub fn parse_args(args: &[String]) -> Result<Self, String> {
        match args {
            [single] => {
                if let Some((owner, repo, _)) = split_url(single) {
                    return Ok(Self::new(owner, repo));
                }
                match single.split_once('/') {
                    Some((owner, repo)) if valid_segment(owner) && valid_segment(repo) => {
                        Ok(Self::new(owner, repo))
                    }
                    _ => Err(format!("expected owner/repo, got '{single}'")),
                }
            }
            [owner, repo] if valid_segment(owner) && valid_segment(repo) => {
                Ok(Self::new(owner.as_str(), repo.as_str()))
            }
            _ => Err(format!(
                "expected a repository URL, owner/repo, or owner repo, got '{}'",
                args.join(" ")
            )),
        }
    }
}

impl fmt::Display for RepoRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.repo)
    }
}

/// A numbered issue or pull request in a repository.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct IssueRef {
    #[serde(flatten)]
    pub repo: RepoRef,
    pub number: u64,
}

impl IssueRef {
    pub fn new(owner: impl Into<String>, repo: impl Into<String>, number: u64) -> Self {
        Self {
            repo: RepoRef::new(owner, repo),
            number,
        }
    }

    /// Parse `https://host/owner/repo/pull/N`, `owner/repo N`, or
    /// `owner repo N`.
    pub fn parse_args(args: &[String]) -> Result<Self, String> {
        match args {
            [single] => {
                let (owner, repo, rest) = split_url(single)
                    .ok_or_else(|| format!("expected an issue or pull request URL, got '{single}'"))?;
                let number = rest
                    .iter()
                    .rev()
                    .find_map(|segment| segment.parse::<u64>().ok())
                    .ok_or_else(|| format!("no issue or pull request number in '{single}'"))?;
                Ok(Self::new(owner, repo, number))
            }
            [repo, number] => {
                let repo = RepoRef::parse_args(std::slice::from_ref(repo))?;
                Ok(Self {
                    repo,
                    number: parse_number(number)?,
                })
            }
            [owner, repo, number] => {
                let repo = RepoRef::parse_args(&[owner.clone(), repo.clone()])?;
                Ok(Self {
                    repo,
                    number: parse_number(number)?,
                })
            }
            _ => Err(format!(
                "expected a URL, owner/repo N, or owner repo N, got '{}'",
                args.join(" ")
            )),
        }
    }
}

impl fmt::Display for IssueRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.repo, self.number)
    }
}

fn parse_number(s: &str) -> Result<u64, String> {
    s.trim_start_matches('#')
        .parse()
        .map_err(|_| format!("'{s}' is not a valid issue or pull request number"))
}

fn valid_segment(s: &str) -> bool {
    !s.is_empty() && !s.contains('/') && !s.contains(char::is_whitespace)
}

/// Split `scheme://host/owner/repo/rest..` into its path parts.
fn split_url(s: &str) -> Option<(&str, &str, Vec<&str>)> {
    let s = s.split(['#', '?']).next().unwrap_or(s);
    let (_, after_scheme) = s.split_once("://")?;
    let mut segments = after_scheme
        .split('/')
        .skip(1)
        .filter(|segment| !segment.is_empty());
    let owner = segments.next()?;
    let repo = segments.next()?.trim_end_matches(".git");
    Some((owner, repo, segments.collect()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(parts: &[&str]) -> Vec<String> {
        parts.iter().map(|p| p.to_string()).collect()
    }

    #[test]
    fn issue_ref_from_url() {
        let r = IssueRef::parse_args(&args(&["https://github.com/acme/widget/pull/42"])).unwrap();
        assert_eq!(r, IssueRef::new("acme", "widget", 42));
        let r = IssueRef::parse_args(&args(&["https://github.com/acme/widget/issues/7#issuecomment-1"]))
            .unwrap();
        assert_eq!(r, IssueRef::new("acme", "widget", 7));
    }

    #[test]
    fn issue_ref_from_slash_form() {
        let r = IssueRef::parse_args(&args(&["acme/widget", "42"])).unwrap();
        assert_eq!(r.to_string(), "acme/widget#42");
    }

    #[test]
    fn issue_ref_from_three_args() {
        let r = IssueRef::parse_args(&args(&["acme", "widget", "#42"])).unwrap();
        assert_eq!(r, IssueRef::new("acme", "widget", 42));
    }

    #[test]
    fn issue_ref_rejects_bad_number() {
        assert!(IssueRef::parse_args(&args(&["acme/widget", "forty-two"])).is_err());
        assert!(IssueRef::parse_args(&args(&["acme/widget"])).is_err());
    }

    #[test]
    fn repo_ref_forms() {
        let expected = RepoRef::new("acme", "widget");
        assert_eq!(RepoRef::parse_args(&args(&["acme/widget"])).unwrap(), expected);
        assert_eq!(RepoRef::parse_args(&args(&["acme", "widget"])).unwrap(), expected);
        assert_eq!(
            RepoRef::parse_args(&args(&["https://github.com/acme/widget.git"])).unwrap(),
            expected
        );
        assert!(RepoRef::parse_args(&args(&["acme"])).is_err());
    }
}
