//! Parser for `/proc/<pid>/cgroup` membership records.
//!
//! Each line has the form `<hierarchy-id>:<controller-list>:<cgroup-path>`:
//!
//! - `<hierarchy-id>`: a number, `0` for the v2 unified hierarchy.
//! - `<controller-list>`: comma-separated controllers bound to the hierarchy,
//!   empty for v2.
//! - `<cgroup-path>`: absolute path of the process's cgroup, relative to the
//!   hierarchy root as seen from the process's cgroup namespace.

/// A parsed membership line.
#[derive(Debug, PartialEq, Eq)]
pub struct MembershipEntry<'a> {
    pub hierarchy_id: u32,
    pub controllers: &'a str,
    pub cgroup_path: &'a str,
}

impl MembershipEntry<'_> {
    /// Returns true if `name` is one of the hierarchy's controllers.
    pub fn has_controller(&self, name: &str) -> bool {
        !name.is_empty() && self.controllers.split(',').any(|c| c == name)
    }

    /// Last segment of the cgroup path, or `None` for the hierarchy root.
    ///
    /// Ancestors are dropped because they depend on the cgroup namespace of
    /// the process: inside a privileged container the record may read
    /// `/docker/<id>/hadoop-yarn/<container>` while the agent sees
    /// `/hadoop-yarn/<container>`. The leaf is always the directory the
    /// agent created.
    pub fn leaf(&self) -> Option<&str> {
        self.cgroup_path
            .rsplit('/')
            .find(|segment| !segment.is_empty())
    }
}

/// Errors that may occur when parsing a membership line.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("expected `<hierarchy-id>:<controllers>:<path>`, got `{0}`")]
    Format(String),
    #[error("invalid hierarchy id in line `{0}`")]
    HierarchyId(String),
    #[error("cgroup path is not absolute in line `{0}`")]
    RelativePath(String),
}

/// Parses a single membership line.
///
/// Lines of the v2 unified hierarchy parse with an empty controller list and
/// never match a controller.
///
/// # Errors
///
/// Returns [`ParseError`] if the line does not have the expected shape.
pub fn parse_membership_line(line: &str) -> Result<MembershipEntry<'_>, ParseError> {
    let mut parts = line.splitn(3, ':');
    let (Some(id), Some(controllers), Some(cgroup_path)) =
        (parts.next(), parts.next(), parts.next())
    else {
        return Err(ParseError::Format(line.to_owned()));
    };

    let hierarchy_id = id
        .parse::<u32>()
        .map_err(|_| ParseError::HierarchyId(line.to_owned()))?;
    if !cgroup_path.starts_with('/') {
        return Err(ParseError::RelativePath(line.to_owned()));
    }

    Ok(MembershipEntry {
        hierarchy_id,
        controllers,
        cgroup_path,
    })
}
