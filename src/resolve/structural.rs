//! Expansion of structural groups over disk labels × filesystems.

use super::Overrides;
use crate::catalog::StructuralGroup;
use crate::error::CatalogError;
use crate::image::naming::structural_filename;
use crate::image::{ConcreteImage, StructuralImage};

const DEFAULT_LABEL: &str = "mbr";
const DEFAULT_FILESYSTEM: &str = "ext4";

/// Picks the values to iterate for one dimension: the override alone if
/// given (it must be one of the group's values), otherwise the group's
/// declared values, otherwise the default.
fn dimension<'g>(
    group: &'g StructuralGroup,
    dimension: &'static str,
    declared: &'g [String],
    default: &'static str,
    requested: Option<&'g str>,
) -> Result<Vec<&'g str>, CatalogError> {
    let available: Vec<&str> = if declared.is_empty() {
        vec![default]
    } else {
        declared.iter().map(String::as_str).collect()
    };
    match requested {
        None => Ok(available),
        Some(value) if available.contains(&value) => Ok(vec![value]),
        Some(value) => Err(CatalogError::InvalidOverride {
            group: group.name.clone(),
            dimension,
            value: value.to_string(),
            choices: available.join(", "),
        }),
    }
}

/// Expands a structural group. Extras are appended to the filename for a
/// dimension whenever the group itself declares more than one value for
/// it, so narrowing with an override never changes a filename.
pub(super) fn expand(
    group: &StructuralGroup,
    overrides: &Overrides,
) -> Result<Vec<ConcreteImage>, CatalogError> {
    let labels =
        dimension(group, "label", &group.labels, DEFAULT_LABEL, overrides.label.as_deref())?;
    let filesystems = dimension(
        group,
        "filesystem",
        &group.filesystems,
        DEFAULT_FILESYSTEM,
        overrides.filesystem.as_deref(),
    )?;

    let label_in_name = group.labels.len() > 1;
    let filesystem_in_name = group.filesystems.len() > 1;

    let mut images = Vec::with_capacity(labels.len() * filesystems.len());
    for label in &labels {
        for filesystem in &filesystems {
            let mut extras = Vec::with_capacity(2);
            if filesystem_in_name {
                extras.push(*filesystem);
            }
            if label_in_name {
                extras.push(*label);
            }
            images.push(ConcreteImage::Structural(StructuralImage {
                group: group.name.clone(),
                filename: structural_filename(&group.name, group.imgver.as_deref(), &extras),
                size: group.size,
                label: (*label).to_string(),
                filesystem: (*filesystem).to_string(),
                parts: group.parts.clone(),
                writes: group.writes.clone(),
                uploads: group.uploads.clone(),
            }));
        }
    }
    Ok(images)
}
