//! Repository record model.
//!
//! # Responsibility
//! - Define the canonical persisted shape of a versioned repository.
//! - Validate names, owners, and descriptions before they reach storage.
//!
//! # Invariants
//! - `name` is trimmed, non-empty, and unique per workspace among active rows.
//! - `version_number` starts at 1 and grows by one per applied mutation.
//! - `date_updated` is never earlier than `date_created`.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Maximum repository name length in characters.
pub const MAX_NAME_CHARS: usize = 256;
/// Maximum repository description length in characters.
pub const MAX_DESCRIPTION_CHARS: usize = 4096;

static FORBIDDEN_NAME_CHARS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[/\\\p{Cc}]").expect("valid forbidden-name regex"));

/// Storage-assigned repository identifier.
pub type RepositoryId = i64;

/// Who may read a repository.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RepositoryVisibility {
    /// Owner and explicit collaborators only.
    #[default]
    Private,
    /// Readable by everyone.
    Public,
    /// Readable inside the owning organization.
    OrgScoped,
}

impl RepositoryVisibility {
    /// Stable storage label.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Private => "private",
            Self::Public => "public",
            Self::OrgScoped => "org_scoped",
        }
    }

    /// Parses a storage label.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "private" => Some(Self::Private),
            "public" => Some(Self::Public),
            "org_scoped" => Some(Self::OrgScoped),
            _ => None,
        }
    }
}

/// Persisted state of one versioned repository.
///
/// Returned by commands as the authoritative post-transaction view; every
/// field is loaded from storage, so no value is ever partially initialized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryRecord {
    pub id: RepositoryId,
    /// Namespace the name is unique within.
    pub workspace: String,
    pub name: String,
    pub owner: String,
    pub description: String,
    pub visibility: RepositoryVisibility,
    /// Optimistic-lock counter.
    pub version_number: u64,
    /// Soft delete tombstone.
    pub is_deleted: bool,
    /// Unix epoch milliseconds.
    pub date_created: i64,
    /// Unix epoch milliseconds.
    pub date_updated: i64,
}

impl RepositoryRecord {
    /// Returns whether this repository is visible to lookups.
    pub fn is_active(&self) -> bool {
        !self.is_deleted
    }

    /// Checks field rules on a record loaded from storage.
    pub fn validate(&self) -> Result<(), RepositoryValidationError> {
        validate_workspace(&self.workspace)?;
        validate_name(&self.name)?;
        validate_owner(&self.owner)?;
        validate_description(&self.description)?;
        if self.version_number == 0 {
            return Err(RepositoryValidationError::InvalidVersionNumber);
        }
        if self.date_updated < self.date_created {
            return Err(RepositoryValidationError::InvalidTimestamps {
                date_created: self.date_created,
                date_updated: self.date_updated,
            });
        }
        Ok(())
    }
}

/// Lookup key for one active repository.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RepositoryRef {
    Id(RepositoryId),
    Name { workspace: String, name: String },
}

impl RepositoryRef {
    /// Builds a by-name reference; both parts are trimmed.
    pub fn by_name(workspace: impl Into<String>, name: impl Into<String>) -> Self {
        Self::Name {
            workspace: workspace.into().trim().to_string(),
            name: name.into().trim().to_string(),
        }
    }
}

impl From<RepositoryId> for RepositoryRef {
    fn from(value: RepositoryId) -> Self {
        Self::Id(value)
    }
}

impl Display for RepositoryRef {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Id(id) => write!(f, "id={id}"),
            Self::Name { workspace, name } => write!(f, "{workspace}/{name}"),
        }
    }
}

/// Insert payload for a repository that does not exist yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRepository {
    pub workspace: String,
    pub name: String,
    pub owner: String,
    pub description: String,
    pub visibility: RepositoryVisibility,
}

impl NewRepository {
    /// Builds a private repository with an empty description.
    ///
    /// Workspace, name, and owner are trimmed here; nothing is validated
    /// until [`NewRepository::validate`].
    pub fn new(
        workspace: impl Into<String>,
        name: impl Into<String>,
        owner: impl Into<String>,
    ) -> Self {
        Self {
            workspace: workspace.into().trim().to_string(),
            name: name.into().trim().to_string(),
            owner: owner.into().trim().to_string(),
            description: String::new(),
            visibility: RepositoryVisibility::default(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_visibility(mut self, visibility: RepositoryVisibility) -> Self {
        self.visibility = visibility;
        self
    }

    pub fn validate(&self) -> Result<(), RepositoryValidationError> {
        validate_workspace(&self.workspace)?;
        validate_name(&self.name)?;
        validate_owner(&self.owner)?;
        validate_description(&self.description)
    }
}

/// Field rule violations for repository records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RepositoryValidationError {
    EmptyWorkspace,
    EmptyName,
    /// Workspace or name carries leading or trailing whitespace.
    UntrimmedIdentity { field: &'static str },
    NameTooLong { chars: usize },
    /// Name contains a path separator or control character.
    InvalidNameCharacter(String),
    EmptyOwner,
    DescriptionTooLong { chars: usize },
    InvalidVersionNumber,
    InvalidTimestamps { date_created: i64, date_updated: i64 },
}

impl Display for RepositoryValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyWorkspace => write!(f, "workspace must not be blank"),
            Self::EmptyName => write!(f, "repository name must not be blank"),
            Self::UntrimmedIdentity { field } => {
                write!(f, "{field} must not have leading or trailing whitespace")
            }
            Self::NameTooLong { chars } => write!(
                f,
                "repository name has {chars} characters; at most {MAX_NAME_CHARS} allowed"
            ),
            Self::InvalidNameCharacter(name) => write!(
                f,
                "repository name `{}` contains a path separator or control character",
                name.escape_debug()
            ),
            Self::EmptyOwner => write!(f, "repository owner must not be blank"),
            Self::DescriptionTooLong { chars } => write!(
                f,
                "repository description has {chars} characters; at most {MAX_DESCRIPTION_CHARS} allowed"
            ),
            Self::InvalidVersionNumber => write!(f, "version_number must be at least 1"),
            Self::InvalidTimestamps {
                date_created,
                date_updated,
            } => write!(
                f,
                "date_updated {date_updated} is earlier than date_created {date_created}"
            ),
        }
    }
}

impl Error for RepositoryValidationError {}

/// Trims and validates a repository name.
pub fn normalize_name(value: &str) -> Result<String, RepositoryValidationError> {
    let trimmed = value.trim();
    validate_name(trimmed)?;
    Ok(trimmed.to_string())
}

fn validate_name(name: &str) -> Result<(), RepositoryValidationError> {
    if name.trim().is_empty() {
        return Err(RepositoryValidationError::EmptyName);
    }
    ensure_trimmed("name", name)?;
    let chars = name.chars().count();
    if chars > MAX_NAME_CHARS {
        return Err(RepositoryValidationError::NameTooLong { chars });
    }
    if FORBIDDEN_NAME_CHARS.is_match(name) {
        return Err(RepositoryValidationError::InvalidNameCharacter(
            name.to_string(),
        ));
    }
    Ok(())
}

fn validate_workspace(workspace: &str) -> Result<(), RepositoryValidationError> {
    if workspace.trim().is_empty() {
        return Err(RepositoryValidationError::EmptyWorkspace);
    }
    ensure_trimmed("workspace", workspace)
}

// Lookups trim their input, so a stored identity must already be trimmed.
fn ensure_trimmed(field: &'static str, value: &str) -> Result<(), RepositoryValidationError> {
    if value.trim() != value {
        return Err(RepositoryValidationError::UntrimmedIdentity { field });
    }
    Ok(())
}

fn validate_owner(owner: &str) -> Result<(), RepositoryValidationError> {
    if owner.trim().is_empty() {
        return Err(RepositoryValidationError::EmptyOwner);
    }
    Ok(())
}

pub(crate) fn validate_description(description: &str) -> Result<(), RepositoryValidationError> {
    let chars = description.chars().count();
    if chars > MAX_DESCRIPTION_CHARS {
        return Err(RepositoryValidationError::DescriptionTooLong { chars });
    }
    Ok(())
}
