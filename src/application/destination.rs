//! Destination resolution.
//!
//! Turns the user's destination choice into a `DestinationDescriptor`.
//! Pure data lookup: no filesystem or network access.

use std::path::PathBuf;

use crate::domain::{
    DestinationDescriptor, FileFormat, NotionDestinationRecord, NotionMode, ValidationError,
};

/// Kind of destination the user picked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DestinationKind {
    Folder,
    Notion,
}

impl DestinationKind {
    /// Label used in the saved settings document.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Folder => "Folder (local)",
            Self::Notion => "Notion (saved destination)",
        }
    }
}

impl std::str::FromStr for DestinationKind {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase();
        match normalized.as_str() {
            "folder" | "folder (local)" => Ok(Self::Folder),
            "notion" | "notion (saved destination)" => Ok(Self::Notion),
            _ => Err(ValidationError::UnknownDestinationKind { kind: s.to_string() }),
        }
    }
}

/// Raw destination parameters. Which fields matter depends on the kind.
#[derive(Debug, Clone, Default)]
pub struct DestinationParams {
    /// Output folder (folder kind).
    pub folder: String,
    /// Output filename (folder kind).
    pub filename: String,
    /// Explicit format; inferred from the filename when absent.
    pub format: Option<FileFormat>,
    /// Format used when neither explicit nor inferable.
    pub fallback_format: FileFormat,
    /// Saved Notion destination name (Notion kind).
    pub notion_name: String,
    pub notion_mode: NotionMode,
}

/// Resolves a destination choice against the saved Notion destinations.
///
/// # Errors
/// `EmptyPath` for a folder destination without folder or filename,
/// `UnknownDestination` for a Notion name that is not saved or incomplete.
pub fn resolve(
    kind: DestinationKind,
    params: &DestinationParams,
    saved: &[NotionDestinationRecord],
) -> Result<DestinationDescriptor, ValidationError> {
    match kind {
        DestinationKind::Folder => resolve_folder(params),
        DestinationKind::Notion => resolve_notion(params, saved),
    }
}

fn resolve_folder(params: &DestinationParams) -> Result<DestinationDescriptor, ValidationError> {
    let folder = params.folder.trim();
    let filename = params.filename.trim();
    if folder.is_empty() || filename.is_empty() {
        return Err(ValidationError::EmptyPath);
    }

    let path = join_output_path(folder, filename);
    let format = params
        .format
        .or_else(|| FileFormat::from_path(&path))
        .unwrap_or(params.fallback_format);

    Ok(DestinationDescriptor::Folder { path, format })
}

fn resolve_notion(
    params: &DestinationParams,
    saved: &[NotionDestinationRecord],
) -> Result<DestinationDescriptor, ValidationError> {
    if params.notion_name.trim().is_empty() {
        return Err(ValidationError::UnknownDestination {
            name: String::new(),
        });
    }

    let record = saved
        .iter()
        .find(|d| d.name == params.notion_name)
        .filter(|d| !d.api_key.trim().is_empty() && !d.parent_id.trim().is_empty())
        .ok_or_else(|| ValidationError::UnknownDestination {
            name: params.notion_name.clone(),
        })?;

    Ok(DestinationDescriptor::Notion {
        api_key: record.api_key.clone(),
        parent_type: record.parent_type,
        parent_id: record.parent_id.clone(),
        mode: params.notion_mode,
    })
}

/// Joins folder and filename, ignoring trailing separators on the folder.
fn join_output_path(folder: &str, filename: &str) -> PathBuf {
    let folder = folder.trim_end_matches(['/', '\\']);
    PathBuf::from(format!("{folder}/{filename}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::NotionParentType;

    fn folder_params(folder: &str, filename: &str) -> DestinationParams {
        DestinationParams {
            folder: folder.into(),
            filename: filename.into(),
            ..Default::default()
        }
    }

    fn saved() -> Vec<NotionDestinationRecord> {
        vec![
            NotionDestinationRecord {
                name: "Team Log".into(),
                parent_type: NotionParentType::Database,
                api_key: "secret_abc".into(),
                parent_id: "db-1".into(),
            },
            NotionDestinationRecord {
                name: "Half Done".into(),
                parent_type: NotionParentType::Page,
                api_key: "secret_abc".into(),
                parent_id: String::new(),
            },
        ]
    }

    #[test]
    fn test_folder_path_joined() {
        let dest = resolve(
            DestinationKind::Folder,
            &folder_params("/tmp/out", "messages.jsonl"),
            &[],
        )
        .unwrap();
        assert_eq!(
            dest,
            DestinationDescriptor::Folder {
                path: PathBuf::from("/tmp/out/messages.jsonl"),
                format: FileFormat::Jsonl,
            }
        );
    }

    #[test]
    fn test_trailing_separators_ignored() {
        let expected = resolve(DestinationKind::Folder, &folder_params("/out", "m.csv"), &[]);
        for folder in ["/out/", "/out//", "/out\\", "/out\\\\"] {
            let got = resolve(DestinationKind::Folder, &folder_params(folder, "m.csv"), &[]);
            assert_eq!(got, expected, "folder {folder:?}");
        }
    }

    #[test]
    fn test_root_folder() {
        let dest = resolve(DestinationKind::Folder, &folder_params("/", "m.jsonl"), &[]).unwrap();
        assert!(matches!(dest, DestinationDescriptor::Folder { path, .. } if path == PathBuf::from("/m.jsonl")));
    }

    #[test]
    fn test_empty_path() {
        for (folder, filename) in [("", "m.jsonl"), ("/out", ""), ("  ", " ")] {
            assert_eq!(
                resolve(DestinationKind::Folder, &folder_params(folder, filename), &[]),
                Err(ValidationError::EmptyPath)
            );
        }
    }

    #[test]
    fn test_format_precedence() {
        let mut params = folder_params("/out", "m.csv");
        let dest = resolve(DestinationKind::Folder, &params, &[]).unwrap();
        assert!(matches!(dest, DestinationDescriptor::Folder { format: FileFormat::Csv, .. }));

        params.format = Some(FileFormat::Jsonl);
        let dest = resolve(DestinationKind::Folder, &params, &[]).unwrap();
        assert!(matches!(dest, DestinationDescriptor::Folder { format: FileFormat::Jsonl, .. }));

        let mut params = folder_params("/out", "export.txt");
        params.fallback_format = FileFormat::Csv;
        let dest = resolve(DestinationKind::Folder, &params, &[]).unwrap();
        assert!(matches!(dest, DestinationDescriptor::Folder { format: FileFormat::Csv, .. }));
    }

    #[test]
    fn test_notion_resolves_saved_record() {
        let params = DestinationParams {
            notion_name: "Team Log".into(),
            notion_mode: NotionMode::GroupByDay,
            ..Default::default()
        };
        let dest = resolve(DestinationKind::Notion, &params, &saved()).unwrap();
        assert_eq!(
            dest,
            DestinationDescriptor::Notion {
                api_key: "secret_abc".into(),
                parent_type: NotionParentType::Database,
                parent_id: "db-1".into(),
                mode: NotionMode::GroupByDay,
            }
        );
    }

    #[test]
    fn test_notion_unknown_name() {
        let params = DestinationParams {
            notion_name: "MyDB".into(),
            ..Default::default()
        };
        assert_eq!(
            resolve(DestinationKind::Notion, &params, &saved()),
            Err(ValidationError::UnknownDestination { name: "MyDB".into() })
        );
    }

    #[test]
    fn test_notion_empty_name_rejected() {
        let mut saved = saved();
        saved.push(NotionDestinationRecord {
            name: String::new(),
            ..saved[0].clone()
        });
        for name in ["", "  "] {
            let params = DestinationParams {
                notion_name: name.into(),
                ..Default::default()
            };
            assert_eq!(
                resolve(DestinationKind::Notion, &params, &saved),
                Err(ValidationError::UnknownDestination { name: String::new() })
            );
        }
    }

    #[test]
    fn test_notion_match_is_exact() {
        let params = DestinationParams {
            notion_name: "team log".into(),
            ..Default::default()
        };
        assert!(resolve(DestinationKind::Notion, &params, &saved()).is_err());
    }

    #[test]
    fn test_notion_incomplete_record_rejected() {
        let params = DestinationParams {
            notion_name: "Half Done".into(),
            ..Default::default()
        };
        assert!(matches!(
            resolve(DestinationKind::Notion, &params, &saved()),
            Err(ValidationError::UnknownDestination { .. })
        ));
    }

    #[test]
    fn test_kind_parsing() {
        assert_eq!("Folder (local)".parse::<DestinationKind>(), Ok(DestinationKind::Folder));
        assert_eq!("notion".parse::<DestinationKind>(), Ok(DestinationKind::Notion));
        assert_eq!(
            DestinationKind::Notion.label().parse::<DestinationKind>(),
            Ok(DestinationKind::Notion)
        );
        assert!(matches!(
            "S3 bucket".parse::<DestinationKind>(),
            Err(ValidationError::UnknownDestinationKind { .. })
        ));
    }
}
