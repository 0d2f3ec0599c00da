use thiserror::Error;

use crate::plugin::descriptor::{MenuPosition, PluginCandidate, PluginDescriptor, PluginKind};

/// Reasons a plugin candidate is refused by the registry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("plugin name must not be empty")]
    MissingName,
    #[error("plugin source `{src}` is not an absolute URL ({reason})")]
    InvalidSourceUrl { src: String, reason: String },
    #[error("plugin kind must be one of editor, menu, validator")]
    MissingKind,
    #[error("menu position `{0}` must be one of top, middle, bottom")]
    InvalidPosition(String),
    #[error("a plugin with source `{0}` is already registered")]
    DuplicateSource(String),
}

/// Checks a candidate and builds the descriptor it describes.
///
/// Rules are checked in order and the first failure is returned. Checks are
/// purely syntactic: the source URL is parsed, never fetched. The returned
/// descriptor is neither installed nor official; callers decide both.
pub fn validate(candidate: &PluginCandidate) -> Result<PluginDescriptor, ValidationError> {
    let name = candidate.name.trim();
    if name.is_empty() {
        return Err(ValidationError::MissingName);
    }

    let src = candidate.src.trim();
    validate_source(src)?;

    let kind = parse_kind(candidate)?;

    Ok(PluginDescriptor {
        name: name.to_string(),
        src: src.to_string(),
        kind,
        installed: false,
        official: false,
        icon: candidate
            .icon
            .as_deref()
            .map(str::trim)
            .filter(|icon| !icon.is_empty())
            .map(str::to_string),
    })
}

fn validate_source(src: &str) -> Result<(), ValidationError> {
    url::Url::parse(src)
        .map(|_| ())
        .map_err(|err| ValidationError::InvalidSourceUrl {
            src: src.to_string(),
            reason: err.to_string(),
        })
}

fn parse_kind(candidate: &PluginCandidate) -> Result<PluginKind, ValidationError> {
    let Some(kind) = candidate.kind.as_deref() else {
        return Err(ValidationError::MissingKind);
    };

    match kind.trim() {
        "editor" => Ok(PluginKind::Editor),
        "validator" => Ok(PluginKind::Validator),
        "menu" => {
            let position = match candidate.position.as_deref() {
                None => MenuPosition::default(),
                Some(raw) => raw
                    .parse()
                    .map_err(|_| ValidationError::InvalidPosition(raw.to_string()))?,
            };

            Ok(PluginKind::Menu {
                position,
                require_doc: candidate.require_doc.unwrap_or(true),
            })
        }
        _ => Err(ValidationError::MissingKind),
    }
}
