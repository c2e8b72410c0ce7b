// Tabletkbd Policy Layer - Policy State and Planning
// Pure mapping from a directory listing to the renames of a transition

use std::collections::HashSet;
use std::fmt;

use smallvec::SmallVec;

use crate::input::SwitchPosition;

/// Naming scheme of a policy directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyLayout {
    /// Base name of the keyboard-blocking policy (e.g. "off")
    pub blocking_name: String,
    /// Extension the policy engine loads, without the dot
    pub active_ext: String,
    /// Extension of parked files, without the dot
    pub inactive_ext: String,
}

impl Default for PolicyLayout {
    fn default() -> Self {
        Self {
            blocking_name: "off".to_string(),
            active_ext: "conf".to_string(),
            inactive_ext: "nope".to_string(),
        }
    }
}

impl PolicyLayout {
    pub fn blocking_active(&self) -> String {
        format!("{}.{}", self.blocking_name, self.active_ext)
    }

    pub fn blocking_inactive(&self) -> String {
        format!("{}.{}", self.blocking_name, self.inactive_ext)
    }

    /// Base name of a "normal" keymap carrying `ext`, or `None` if `name`
    /// is not one (other extension, empty stem, or the blocking policy).
    fn normal_stem<'a>(&self, name: &'a str, ext: &str) -> Option<&'a str> {
        let stem = name.strip_suffix(ext)?.strip_suffix('.')?;
        if stem.is_empty() || stem == self.blocking_name {
            None
        } else {
            Some(stem)
        }
    }

    /// Inspect a listing and report what the blocking policy looks like
    pub fn state_of(&self, listing: &[String]) -> PolicyState {
        let active = self.blocking_active();
        let inactive = self.blocking_inactive();
        let has_active = listing.iter().any(|n| *n == active);
        let has_inactive = listing.iter().any(|n| *n == inactive);

        match (has_active, has_inactive) {
            (true, true) => PolicyState::Conflicted,
            (true, false) => PolicyState::Disabled,
            (false, true) => PolicyState::Enabled,
            (false, false) => PolicyState::Missing,
        }
    }
}

/// Keyboard state as encoded by the blocking policy file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PolicyState {
    /// Blocking policy parked; keyboard usable
    Enabled,
    /// Blocking policy loaded; keyboard blocked
    Disabled,
    /// No blocking policy file in either state
    Missing,
    /// Blocking policy present in both states at once
    Conflicted,
}

impl fmt::Display for PolicyState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PolicyState::Enabled => write!(f, "enabled"),
            PolicyState::Disabled => write!(f, "disabled"),
            PolicyState::Missing => write!(f, "missing"),
            PolicyState::Conflicted => write!(f, "conflicted"),
        }
    }
}

/// Requested keyboard transition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Transition {
    /// Park the blocking policy, load the normal keymaps
    Enable,
    /// Load the blocking policy, park the normal keymaps
    Disable,
}

impl Transition {
    pub fn for_position(position: SwitchPosition) -> Self {
        match position {
            SwitchPosition::Tablet => Transition::Disable,
            SwitchPosition::Laptop => Transition::Enable,
        }
    }

    pub fn target_state(self) -> PolicyState {
        match self {
            Transition::Enable => PolicyState::Enabled,
            Transition::Disable => PolicyState::Disabled,
        }
    }
}

impl fmt::Display for Transition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Transition::Enable => write!(f, "enable"),
            Transition::Disable => write!(f, "disable"),
        }
    }
}

/// A single file rename inside the policy directory
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RenameOp {
    pub from: String,
    pub to: String,
}

impl RenameOp {
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
        }
    }
}

impl fmt::Display for RenameOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.from, self.to)
    }
}

/// Renames needed to reach a transition's target from a given listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Plan {
    pub transition: Transition,
    /// State observed before planning
    pub before: PolicyState,
    /// Blocking policy rename, when its destination is free
    pub blocking: Option<RenameOp>,
    /// Normal keymap renames, sorted by name
    pub ops: SmallVec<[RenameOp; 8]>,
    /// Renames whose destination already exists; never executed
    pub conflicts: Vec<RenameOp>,
}

impl Plan {
    /// Compute the plan for `transition` against `listing`.
    ///
    /// The blocking rename is omitted when the file is already at its
    /// target. Normal keymaps are every `*.ext` file other than the blocking
    /// policy, recomputed from the listing each call.
    pub fn compute(layout: &PolicyLayout, listing: &[String], transition: Transition) -> Self {
        let (blocking_from, blocking_to, normal_from, normal_to) = match transition {
            Transition::Enable => (
                layout.blocking_active(),
                layout.blocking_inactive(),
                &layout.inactive_ext,
                &layout.active_ext,
            ),
            Transition::Disable => (
                layout.blocking_inactive(),
                layout.blocking_active(),
                &layout.active_ext,
                &layout.inactive_ext,
            ),
        };

        let present: HashSet<&str> = listing.iter().map(String::as_str).collect();
        let mut blocking = None;
        let mut ops: SmallVec<[RenameOp; 8]> = SmallVec::new();
        let mut conflicts: Vec<RenameOp> = Vec::new();

        if present.contains(blocking_from.as_str()) {
            let op = RenameOp::new(blocking_from, blocking_to);
            if present.contains(op.to.as_str()) {
                conflicts.push(op);
            } else {
                blocking = Some(op);
            }
        }

        let mut normals: Vec<&String> = listing
            .iter()
            .filter(|name| layout.normal_stem(name, normal_from).is_some())
            .collect();
        normals.sort();

        for name in normals {
            if let Some(stem) = layout.normal_stem(name, normal_from) {
                let op = RenameOp::new(name.as_str(), format!("{}.{}", stem, normal_to));
                if present.contains(op.to.as_str()) {
                    conflicts.push(op);
                } else {
                    ops.push(op);
                }
            }
        }

        Self {
            transition,
            before: layout.state_of(listing),
            blocking,
            ops,
            conflicts,
        }
    }
}
