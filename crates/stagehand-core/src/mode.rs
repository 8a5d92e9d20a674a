//! Mode context and table routing
//!
//! A [`ModeContext`] travels by value with every store handle; nothing about
//! routing lives in shared state. [`route`] is the single place that turns a
//! canonical table name into the physical table an operation touches.

use serde::{Deserialize, Serialize};
use std::borrow::Cow;

/// Suffix appended to a canonical table name to form its draft table
pub const DRAFT_SUFFIX: &str = "_draft";

/// Physical table selection for an operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Mode {
    /// Published content (canonical table)
    #[default]
    Production,
    /// Work-in-progress content (draft table)
    Draft,
    /// Draft table regardless of what the caller requested
    ForcedDraft,
}

impl Mode {
    /// Whether this mode targets the draft table
    pub fn is_draft(&self) -> bool {
        matches!(self, Mode::Draft | Mode::ForcedDraft)
    }
}

/// Per-call routing state carried by a store handle
///
/// `requested` is `None` until a caller explicitly picks production or draft;
/// the query hook uses that to default reads to draft.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct ModeContext {
    requested: Option<Mode>,
    force_draft: bool,
}

impl ModeContext {
    /// No explicit mode
    pub fn unset() -> Self {
        Self::default()
    }

    /// Explicit production mode
    pub fn production() -> Self {
        Self {
            requested: Some(Mode::Production),
            force_draft: false,
        }
    }

    /// Explicit draft mode
    pub fn draft() -> Self {
        Self {
            requested: Some(Mode::Draft),
            force_draft: false,
        }
    }

    /// Same context with draft routing forced on
    pub fn forced(self) -> Self {
        Self {
            force_draft: true,
            ..self
        }
    }

    /// Same context with an explicit requested mode
    pub fn with_mode(self, mode: Mode) -> Self {
        match mode {
            Mode::ForcedDraft => self.forced(),
            mode => Self {
                requested: Some(mode),
                ..self
            },
        }
    }

    /// The mode the caller asked for, if any
    pub fn requested(&self) -> Option<Mode> {
        self.requested
    }

    /// Whether draft routing is forced
    pub fn is_forced(&self) -> bool {
        self.force_draft
    }

    /// Resolve precedence: ForcedDraft > Draft > Production
    pub fn effective(&self) -> Mode {
        if self.force_draft {
            Mode::ForcedDraft
        } else if self.requested == Some(Mode::Draft) {
            Mode::Draft
        } else {
            Mode::Production
        }
    }
}

/// Draft table name for a table (idempotent on draft names)
pub fn draft_table_name(table: &str) -> String {
    format!("{}{}", original_table_name(table), DRAFT_SUFFIX)
}

/// Canonical table name, stripping the draft suffix if present
pub fn original_table_name(table: &str) -> &str {
    table.strip_suffix(DRAFT_SUFFIX).unwrap_or(table)
}

/// Whether a physical table name is a draft table
pub fn is_draft_table(table: &str) -> bool {
    table.ends_with(DRAFT_SUFFIX)
}

/// Physical table for a canonical table under the given context
pub fn route<'a>(table: &'a str, ctx: &ModeContext) -> Cow<'a, str> {
    if ctx.effective().is_draft() {
        Cow::Owned(draft_table_name(table))
    } else {
        Cow::Borrowed(table)
    }
}
